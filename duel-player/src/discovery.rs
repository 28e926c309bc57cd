//! Role negotiation between two instances with no coordinator.
//!
//! Each round an instance first listens for an announcement. Hearing one makes it
//! the guest, which dials the announced port. Hearing nothing makes it a
//! candidate host: it announces a random port and waits for a guest. If nobody
//! comes, the datagram endpoint is recreated and the round starts over.

use crate::protocol::{Announcement, AnnouncementError, GAME_PORTS};
use crate::transport::DiscoveryTransport;
use async_std::io;
use async_std::net::IpAddr;
use derive_more::Display;
use duel_othello::Color;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Which side of the table an instance ended up on.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Role {
    #[display(fmt = "host")]
    Host,
    #[display(fmt = "guest")]
    Guest,
}

impl Role {
    /// Host plays dark, guest plays light.
    pub fn color(self) -> Color {
        match self {
            Role::Host => Color::Dark,
            Role::Guest => Color::Light,
        }
    }

    /// Whether this role makes the first move.
    pub fn moves_first(self) -> bool {
        self == Role::Host
    }
}

/// Timing and retry policy for discovery.
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// How long to wait for an announcement before becoming a candidate host.
    pub listen_timeout: Duration,
    /// How long a candidate host waits for a guest.
    pub accept_timeout: Duration,
    /// How long a guest waits for the host's listener before dialing.
    pub join_delay: Duration,
    /// Upper bound of a random pause before each retry. Zero disables it.
    pub retry_jitter: Duration,
    /// Give up after this many rounds. None retries forever.
    pub max_rounds: Option<u32>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listen_timeout: Duration::from_secs(5),
            accept_timeout: Duration::from_secs(5),
            join_delay: Duration::from_millis(500),
            retry_jitter: Duration::ZERO,
            max_rounds: None,
        }
    }
}

/// The result of a successful negotiation: a role and a connected stream.
pub struct Negotiated<C> {
    pub role: Role,
    pub channel: C,
}

#[derive(Debug, Display)]
pub enum DiscoveryError {
    #[display(fmt = "discovery transport failed: {}", _0)]
    Transport(io::Error),
    #[display(fmt = "cannot announce game: {}", _0)]
    Announcement(AnnouncementError),
    #[display(fmt = "no opponent found after {} rounds", rounds)]
    Exhausted { rounds: u32 },
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Transport(err) => Some(err),
            DiscoveryError::Announcement(err) => Some(err),
            DiscoveryError::Exhausted { .. } => None,
        }
    }
}

impl From<io::Error> for DiscoveryError {
    fn from(err: io::Error) -> Self {
        DiscoveryError::Transport(err)
    }
}

impl From<AnnouncementError> for DiscoveryError {
    fn from(err: AnnouncementError) -> Self {
        DiscoveryError::Announcement(err)
    }
}

/// Where a negotiation currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Listening,
    Joining { sender: IpAddr, port: u16 },
    Hosting { port: u16 },
    Resetting,
}

/// Drives discovery to a [`Negotiated`] connection.
pub struct Negotiator<T, R> {
    transport: T,
    rng: R,
    config: DiscoveryConfig,
}

impl<T, R> Negotiator<T, R>
where
    T: DiscoveryTransport,
    R: Rng + Send,
{
    pub fn new(transport: T, rng: R, config: DiscoveryConfig) -> Self {
        Self {
            transport,
            rng,
            config,
        }
    }

    /// Run rounds until a role is settled. The transport is dropped on return.
    pub async fn run(mut self) -> Result<Negotiated<T::Channel>, DiscoveryError> {
        let mut phase = Phase::Listening;
        let mut round = 1;

        loop {
            phase = match phase {
                Phase::Listening => self.listen(round).await?,

                Phase::Joining { sender, port } => {
                    self.transport.pause(self.config.join_delay).await;
                    let channel = self.transport.connect(sender, port).await?;
                    info!(role = %Role::Guest, port, round, "joined game");
                    return Ok(Negotiated {
                        role: Role::Guest,
                        channel,
                    });
                }

                Phase::Hosting { port } => {
                    match self
                        .transport
                        .accept(port, self.config.accept_timeout)
                        .await?
                    {
                        Some(channel) => {
                            info!(role = %Role::Host, port, round, "hosting game");
                            return Ok(Negotiated {
                                role: Role::Host,
                                channel,
                            });
                        }
                        None => {
                            debug!(port, round, "nobody answered the announcement");
                            Phase::Resetting
                        }
                    }
                }

                Phase::Resetting => {
                    if let Some(max_rounds) = self.config.max_rounds {
                        if round >= max_rounds {
                            return Err(DiscoveryError::Exhausted { rounds: round });
                        }
                    }

                    self.transport.reset().await?;
                    let backoff = self.backoff();
                    if backoff > Duration::ZERO {
                        self.transport.pause(backoff).await;
                    }

                    round += 1;
                    Phase::Listening
                }
            };
        }
    }

    /// Wait for an announcement; announce our own game if none arrives.
    async fn listen(&mut self, round: u32) -> Result<Phase, DiscoveryError> {
        loop {
            match self.transport.listen(self.config.listen_timeout).await? {
                Some((payload, sender)) => match Announcement::decode(&payload) {
                    Ok(announcement) => {
                        debug!(%sender, port = announcement.port, "heard announcement");
                        return Ok(Phase::Joining {
                            sender: sender.ip(),
                            port: announcement.port,
                        });
                    }
                    Err(err) => debug!(%sender, %err, "ignoring malformed announcement"),
                },
                None => {
                    let port = self.rng.gen_range(GAME_PORTS);
                    let payload = Announcement::new(port)?.encode()?;
                    self.transport.announce(&payload).await?;
                    debug!(port, round, "announced game");
                    return Ok(Phase::Hosting { port });
                }
            }
        }
    }

    fn backoff(&mut self) -> Duration {
        let jitter = self.config.retry_jitter.as_millis() as u64;
        if jitter == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(0..=jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{memory_pair, MemoryChannel};
    use async_std::net::{Ipv4Addr, SocketAddr};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// What the negotiator did to the transport.
    #[derive(Debug, Default)]
    struct Record {
        announced: Vec<Vec<u8>>,
        accepted_on: Vec<u16>,
        connected_to: Vec<u16>,
        pauses: Vec<Duration>,
        resets: u32,
    }

    /// Replays canned datagrams and accept results.
    struct ScriptedTransport {
        heard: VecDeque<Option<&'static [u8]>>,
        accepts: VecDeque<bool>,
        record: Arc<Mutex<Record>>,
    }

    impl ScriptedTransport {
        fn new(heard: Vec<Option<&'static [u8]>>, accepts: Vec<bool>) -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record::default()));
            let transport = Self {
                heard: heard.into(),
                accepts: accepts.into(),
                record: Arc::clone(&record),
            };
            (transport, record)
        }
    }

    fn heard(payload: &'static str) -> Option<&'static [u8]> {
        Some(payload.as_bytes())
    }

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 4444)
    }

    #[async_trait]
    impl DiscoveryTransport for ScriptedTransport {
        type Channel = MemoryChannel;

        async fn listen(&mut self, _timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
            match self.heard.pop_front() {
                Some(heard) => Ok(heard.map(|payload| (payload.to_vec(), peer()))),
                None => Err(io::Error::new(io::ErrorKind::Other, "script exhausted")),
            }
        }

        async fn announce(&mut self, payload: &[u8]) -> io::Result<()> {
            self.record.lock().unwrap().announced.push(payload.to_vec());
            Ok(())
        }

        async fn reset(&mut self) -> io::Result<()> {
            self.record.lock().unwrap().resets += 1;
            Ok(())
        }

        async fn accept(&mut self, port: u16, _timeout: Duration) -> io::Result<Option<MemoryChannel>> {
            self.record.lock().unwrap().accepted_on.push(port);
            Ok(match self.accepts.pop_front() {
                Some(true) => Some(memory_pair().0),
                _ => None,
            })
        }

        async fn connect(&mut self, _sender: IpAddr, port: u16) -> io::Result<MemoryChannel> {
            self.record.lock().unwrap().connected_to.push(port);
            Ok(memory_pair().0)
        }

        async fn pause(&mut self, duration: Duration) {
            self.record.lock().unwrap().pauses.push(duration);
        }
    }

    fn negotiator(
        transport: ScriptedTransport,
        config: DiscoveryConfig,
    ) -> Negotiator<ScriptedTransport, StdRng> {
        Negotiator::new(transport, StdRng::seed_from_u64(7), config)
    }

    #[test]
    fn roles_map_to_colors() {
        assert_eq!(Role::Host.color(), Color::Dark);
        assert_eq!(Role::Guest.color(), Color::Light);
        assert!(Role::Host.moves_first());
        assert!(!Role::Guest.moves_first());
    }

    #[async_std::test]
    async fn announcement_makes_us_guest() {
        let (transport, record) = ScriptedTransport::new(vec![heard("NEW GAME:9050\n")], vec![]);

        let negotiated = negotiator(transport, DiscoveryConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(negotiated.role, Role::Guest);
        let record = record.lock().unwrap();
        assert_eq!(record.connected_to, vec![9050]);
        assert_eq!(record.pauses, vec![Duration::from_millis(500)]);
        assert!(record.announced.is_empty());
    }

    #[async_std::test]
    async fn silence_makes_us_host() {
        let (transport, record) = ScriptedTransport::new(vec![None], vec![true]);

        let negotiated = negotiator(transport, DiscoveryConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(negotiated.role, Role::Host);
        let record = record.lock().unwrap();
        assert_eq!(record.announced.len(), 1);
        let announced = Announcement::decode(&record.announced[0]).unwrap();
        assert!(GAME_PORTS.contains(&announced.port));
        assert_eq!(record.accepted_on, vec![announced.port]);
        assert!(record.connected_to.is_empty());
    }

    #[async_std::test]
    async fn malformed_announcements_are_ignored() {
        let (transport, record) = ScriptedTransport::new(
            vec![heard("NEW GAME:9999\n"), heard("garbage"), heard("NEW GAME:x\n"), None],
            vec![true],
        );

        let negotiated = negotiator(transport, DiscoveryConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(negotiated.role, Role::Host);
        assert!(record.lock().unwrap().connected_to.is_empty());
    }

    #[async_std::test]
    async fn unanswered_host_resets_and_retries() {
        let (transport, record) =
            ScriptedTransport::new(vec![None, heard("NEW GAME:9001\n")], vec![false]);

        let negotiated = negotiator(transport, DiscoveryConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(negotiated.role, Role::Guest);
        let record = record.lock().unwrap();
        assert_eq!(record.resets, 1);
        assert_eq!(record.announced.len(), 1);
        assert_eq!(record.connected_to, vec![9001]);
        // No jitter by default: the only pause is the guest's join delay.
        assert_eq!(record.pauses, vec![Duration::from_millis(500)]);
    }

    #[async_std::test]
    async fn retry_jitter_is_bounded() {
        let (transport, record) =
            ScriptedTransport::new(vec![None, None, None, heard("NEW GAME:9100\n")], vec![]);
        let config = DiscoveryConfig {
            retry_jitter: Duration::from_millis(250),
            ..DiscoveryConfig::default()
        };

        negotiator(transport, config).run().await.unwrap();

        let record = record.lock().unwrap();
        assert_eq!(record.resets, 3);
        let (join, backoffs) = record.pauses.split_last().unwrap();
        assert_eq!(*join, Duration::from_millis(500));
        assert!(backoffs.len() <= 3);
        assert!(backoffs.iter().all(|pause| *pause <= Duration::from_millis(250)));
    }

    #[async_std::test]
    async fn gives_up_after_max_rounds() {
        let (transport, record) = ScriptedTransport::new(vec![None, None, None], vec![]);
        let config = DiscoveryConfig {
            max_rounds: Some(2),
            ..DiscoveryConfig::default()
        };

        match negotiator(transport, config).run().await {
            Err(DiscoveryError::Exhausted { rounds }) => assert_eq!(rounds, 2),
            Err(err) => panic!("unexpected error: {}", err),
            Ok(negotiated) => panic!("unexpectedly negotiated {}", negotiated.role),
        }
        assert_eq!(record.lock().unwrap().resets, 1);
    }

    #[async_std::test]
    async fn transport_failures_are_fatal() {
        let (transport, _record) = ScriptedTransport::new(vec![], vec![]);

        let result = negotiator(transport, DiscoveryConfig::default()).run().await;

        assert!(matches!(result, Err(DiscoveryError::Transport(_))));
    }
}
