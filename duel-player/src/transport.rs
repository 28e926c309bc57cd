//! Transports for discovery and play.
//!
//! [`DiscoveryTransport`] and [`LineChannel`] are the seams the negotiator and the
//! session are written against; [`LanTransport`] and [`TcpLineChannel`] are the
//! real network implementations and [`memory_pair`] connects two sessions
//! in-process.

use crate::protocol::DATAGRAM_BUDGET;
use async_std::channel::{self, Receiver, Sender};
use async_std::io::{self, BufReader};
use async_std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use async_std::prelude::*;
use async_std::task;
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::time::Duration;
use tracing::{debug, info};

/// A reliable, ordered, line-delimited connection to the peer.
#[async_trait]
pub trait LineChannel: Send {
    /// Send one line. The newline is added here.
    async fn send_line(&mut self, line: &str) -> io::Result<()>;

    /// Receive one line without its terminator, or None once the peer has closed.
    async fn recv_line(&mut self) -> io::Result<Option<String>>;
}

/// Everything discovery needs from the network, so negotiation can be driven
/// without real sockets.
#[async_trait]
pub trait DiscoveryTransport: Send {
    type Channel: LineChannel + 'static;

    /// Wait up to `timeout` for one datagram. None means the wait timed out.
    async fn listen(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>>;

    /// Broadcast a datagram to the shared discovery port.
    async fn announce(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Discard the datagram endpoint, and anything queued on it, and open a fresh one.
    async fn reset(&mut self) -> io::Result<()>;

    /// Listen on `port` and wait up to `timeout` for one peer. None means the wait timed out.
    async fn accept(&mut self, port: u16, timeout: Duration) -> io::Result<Option<Self::Channel>>;

    /// Open a stream to a host that announced `port` from `sender`.
    async fn connect(&mut self, sender: IpAddr, port: u16) -> io::Result<Self::Channel>;

    /// Sleep between protocol steps.
    async fn pause(&mut self, duration: Duration) {
        task::sleep(duration).await
    }
}

/// A [`LineChannel`] over TCP.
pub struct TcpLineChannel {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TcpLineChannel {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            reader: BufReader::new(stream.clone()),
            writer: stream,
        }
    }
}

#[async_trait]
impl LineChannel for TcpLineChannel {
    async fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.writer.write_all(framed.as_bytes()).await?;
        self.writer.flush().await
    }

    async fn recv_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
}

/// Which address a guest dials after hearing an announcement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DialTarget {
    /// The configured broadcast address.
    BroadcastAddress,
    /// The address the announcement came from.
    Sender,
}

impl Default for DialTarget {
    fn default() -> Self {
        Self::BroadcastAddress
    }
}

/// Discovery over a real LAN: UDP broadcast plus TCP listen/connect.
pub struct LanTransport {
    bind_addr: SocketAddr,
    dial: DialTarget,
    socket: Option<UdpSocket>,
}

impl LanTransport {
    /// Bind the discovery endpoint to `bind_addr` (broadcast address and shared port).
    pub async fn bind(bind_addr: SocketAddr, dial: DialTarget) -> io::Result<Self> {
        let socket = Self::open(bind_addr)?;
        Ok(Self {
            bind_addr,
            dial,
            socket: Some(socket),
        })
    }

    /// A broadcast-capable datagram endpoint that other instances on this host can share.
    fn open(bind_addr: SocketAddr) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::for_address(bind_addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_broadcast(true)?;
        socket.bind(&bind_addr.into())?;

        let socket = UdpSocket::from(std::net::UdpSocket::from(socket));
        debug!(addr = %bind_addr, "opened discovery endpoint");
        Ok(socket)
    }

    fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "discovery endpoint closed"))
    }
}

#[async_trait]
impl DiscoveryTransport for LanTransport {
    type Channel = TcpLineChannel;

    async fn listen(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        let socket = self.socket()?;
        let mut buf = [0u8; DATAGRAM_BUDGET];
        match io::timeout(timeout, socket.recv_from(&mut buf)).await {
            Ok((len, sender)) => Ok(Some((buf[..len].to_vec(), sender))),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn announce(&mut self, payload: &[u8]) -> io::Result<()> {
        let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), self.bind_addr.port());
        self.socket()?.send_to(payload, target).await?;
        Ok(())
    }

    async fn reset(&mut self) -> io::Result<()> {
        // The old endpoint must be closed before the port can be bound again.
        self.socket = None;
        self.socket = Some(Self::open(self.bind_addr)?);
        Ok(())
    }

    async fn accept(&mut self, port: u16, timeout: Duration) -> io::Result<Option<TcpLineChannel>> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        match io::timeout(timeout, listener.accept()).await {
            Ok((stream, peer)) => {
                info!(%peer, port, "accepted game connection");
                Ok(Some(TcpLineChannel::new(stream)))
            }
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn connect(&mut self, sender: IpAddr, port: u16) -> io::Result<TcpLineChannel> {
        let host = match self.dial {
            DialTarget::BroadcastAddress => self.bind_addr.ip(),
            DialTarget::Sender => sender,
        };
        let stream = TcpStream::connect((host, port)).await?;
        info!(%host, port, "connected to game host");
        Ok(TcpLineChannel::new(stream))
    }
}

/// One end of an in-process [`LineChannel`] pair.
pub struct MemoryChannel {
    tx: Sender<String>,
    rx: Receiver<String>,
}

/// Two connected in-process channels: what one sends, the other receives.
pub fn memory_pair() -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = channel::unbounded();
    let (b_tx, a_rx) = channel::unbounded();
    (
        MemoryChannel { tx: a_tx, rx: a_rx },
        MemoryChannel { tx: b_tx, rx: b_rx },
    )
}

#[async_trait]
impl LineChannel for MemoryChannel {
    async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.tx
            .send(line.to_string())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer channel closed"))
    }

    async fn recv_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.rx.recv().await.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn memory_pair_is_ordered_and_reports_close() {
        let (mut a, mut b) = memory_pair();
        a.send_line("MOVE:4,3").await.unwrap();
        a.send_line("PASS").await.unwrap();
        assert_eq!(b.recv_line().await.unwrap(), Some("MOVE:4,3".to_string()));
        assert_eq!(b.recv_line().await.unwrap(), Some("PASS".to_string()));

        drop(a);
        assert_eq!(b.recv_line().await.unwrap(), None);
        assert!(b.send_line("PASS").await.is_err());
    }

    #[async_std::test]
    async fn tcp_channel_frames_lines() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = task::spawn(async move {
            let mut channel = TcpLineChannel::new(TcpStream::connect(addr).await.unwrap());
            channel.send_line("MOVE:4,3").await.unwrap();
            channel.send_line("PASS").await.unwrap();
            channel.recv_line().await.unwrap()
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut server = TcpLineChannel::new(stream);
        assert_eq!(server.recv_line().await.unwrap(), Some("MOVE:4,3".to_string()));
        assert_eq!(server.recv_line().await.unwrap(), Some("PASS".to_string()));
        server.send_line("DRAW").await.unwrap();

        assert_eq!(client.await, Some("DRAW".to_string()));

        drop(server);
    }

    fn discovery_addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
    }

    #[async_std::test]
    async fn discovery_port_is_shared_between_instances() {
        let addr = discovery_addr(47123);
        let mut first = LanTransport::bind(addr, DialTarget::default()).await.unwrap();
        let mut second = LanTransport::bind(addr, DialTarget::default()).await.unwrap();

        let payload = crate::protocol::Announcement::new(9042).unwrap().encode().unwrap();
        first.announce(&payload).await.unwrap();

        let (heard, _sender) = second
            .listen(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("announcement should arrive");
        assert_eq!(heard, b"NEW GAME:9042\n".to_vec());
        assert_eq!(
            crate::protocol::Announcement::decode(&heard).unwrap().port,
            9042
        );
    }

    #[async_std::test]
    async fn listen_times_out_quietly() {
        let mut transport = LanTransport::bind(discovery_addr(47124), DialTarget::default())
            .await
            .unwrap();
        let heard = transport.listen(Duration::from_millis(50)).await.unwrap();
        assert_eq!(heard, None);
    }

    #[async_std::test]
    async fn reset_discards_queued_datagrams() {
        let port = 47125;
        let mut transport = LanTransport::bind(discovery_addr(port), DialTarget::default())
            .await
            .unwrap();

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        sender
            .send_to(b"NEW GAME:9000\n", (Ipv4Addr::LOCALHOST, port))
            .await
            .unwrap();
        task::sleep(Duration::from_millis(50)).await;

        transport.reset().await.unwrap();
        let heard = transport.listen(Duration::from_millis(100)).await.unwrap();
        assert_eq!(heard, None);
    }
}
