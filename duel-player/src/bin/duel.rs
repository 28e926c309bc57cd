use anyhow::Context;
use async_std::net::ToSocketAddrs;
use clap::{Parser, ValueEnum};
use duel_othello::Outcome;
use duel_player::connectors::{ConsoleConnector, FirstLegalConnector, RandomConnector};
use duel_player::discovery::{DiscoveryConfig, Negotiated, Negotiator};
use duel_player::session::GameSession;
use duel_player::transport::{DialTarget, LanTransport};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "duel", about = "Play Othello against another instance on the LAN")]
struct Cli {
    /// Broadcast address shared by both players.
    broadcast_address: String,

    /// Broadcast port shared by both players.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    broadcast_port: u16,

    /// Let an agent play instead of reading moves from the console.
    #[arg(long, value_enum)]
    auto: Option<Agent>,

    /// Dial the address an announcement came from instead of the broadcast address.
    #[arg(long)]
    dial_sender: bool,

    /// Random pause of up to this many milliseconds before each discovery retry.
    #[arg(long, default_value_t = 0)]
    retry_jitter_ms: u64,

    /// Give up discovery after this many rounds.
    #[arg(long)]
    max_rounds: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Agent {
    First,
    Random,
}

async fn play(cli: Cli) -> anyhow::Result<Outcome> {
    let bind_addr = (cli.broadcast_address.as_str(), cli.broadcast_port)
        .to_socket_addrs()
        .await
        .with_context(|| format!("no IP address found for {}", cli.broadcast_address))?
        .next()
        .with_context(|| format!("no IP address found for {}", cli.broadcast_address))?;

    let dial = if cli.dial_sender {
        DialTarget::Sender
    } else {
        DialTarget::BroadcastAddress
    };
    let transport = LanTransport::bind(bind_addr, dial)
        .await
        .with_context(|| format!("socket unable to bind to {}", bind_addr))?;

    let config = DiscoveryConfig {
        retry_jitter: Duration::from_millis(cli.retry_jitter_ms),
        max_rounds: cli.max_rounds,
        ..DiscoveryConfig::default()
    };
    let Negotiated { role, channel } = Negotiator::new(transport, StdRng::from_entropy(), config)
        .run()
        .await
        .context("game discovery failed")?;

    info!(%role, "negotiated");
    println!("Game initialised, you are {}", role.color());

    let outcome = match cli.auto {
        None => GameSession::new(channel, role, ConsoleConnector::new()).run().await,
        Some(Agent::First) => GameSession::new(channel, role, FirstLegalConnector).run().await,
        Some(Agent::Random) => {
            let source = RandomConnector::new(StdRng::from_entropy());
            GameSession::new(channel, role, source).run().await
        }
    };
    outcome.context("game aborted")
}

#[async_std::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match play(Cli::parse()).await {
        Ok(outcome) => println!("{}", outcome),
        Err(err) => {
            eprintln!("ERROR: {:#}", err);
            println!("Terminated Game");
            process::exit(1);
        }
    }
}
