//! # FastEvent Command-Line Client
//!
//! Purpose: Toggle the event server's states from a shell, fire random
//! commands for smoke tests, or profile the server with a paced run.
//!
//! ## Design Principles
//! 1. **Thin Front End**: Parsing and printing only; all protocol work lives in
//!    `fev-client`.
//! 2. **One Code Path per Transport**: `run` is generic over `Transport`, so
//!    the datagram and stream dialects share every subcommand.
//! 3. **Reproducible When Asked**: `--seed` makes random workloads repeatable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fev_client::{ClientOptions, CommandClient, DatagramTransport, PacedRun, StreamTransport, Transport};
use fev_common::{ServiceConfig, DEFAULT_CONFIG_FILE};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Send sync/event toggles to a FastEvent server.
#[derive(Parser)]
#[command(name = "fev", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file (must contain "port").
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Host name of the server.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Socket type used to reach the server.
    #[arg(short, long, value_enum, default_value_t = TransportArg::Datagram)]
    transport: TransportArg,

    /// Print a description of every command issued.
    #[arg(short, long)]
    interactive: bool,

    /// Print the byte the server answered with.
    #[arg(long)]
    show_response: bool,

    /// Measure round-trip latency and print a summary at exit.
    #[arg(long)]
    timed: bool,

    /// Give up waiting for an acknowledgment after this many milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    ack_timeout_ms: Option<u64>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    /// UDP, single-byte opcodes, quit opcode on exit.
    Datagram,
    /// TCP, CRLF-terminated opcodes, 'Y' acknowledgment.
    Stream,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Turn the sync state on or off.
    Sync {
        #[arg(value_enum)]
        value: Switch,
    },

    /// Turn the event state on or off.
    Event {
        #[arg(value_enum)]
        value: Switch,
    },

    /// Send randomly chosen commands.
    Random {
        /// Number of commands to send.
        count: usize,

        /// Seed for a reproducible sequence.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Send random commands at a fixed rate and report timing.
    Bench {
        /// Commands per second (defaults to the config's "rate").
        #[arg(long)]
        rate: Option<u32>,

        /// Number of commands (defaults to the config's "num").
        #[arg(long)]
        num: Option<usize>,

        /// Seed for a reproducible sequence.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.transport {
        TransportArg::Datagram => run::<DatagramTransport>(&cli, &config),
        TransportArg::Stream => run::<StreamTransport>(&cli, &config),
    }
}

fn run<T: Transport>(cli: &Cli, config: &ServiceConfig) -> Result<()> {
    let options = ClientOptions {
        interactive: cli.interactive,
        show_response: cli.show_response,
        timed: cli.timed,
        ack_timeout: cli.ack_timeout_ms.map(Duration::from_millis),
        connect_timeout: None,
    };
    let mut client = CommandClient::<T>::connect(config, &cli.host, options)
        .with_context(|| format!("connecting to {}:{}", cli.host, config.port))?;

    match &cli.command {
        Commands::Sync { value } => {
            client.sync(value.is_on()).context("sending sync")?;
        }
        Commands::Event { value } => {
            client.event(value.is_on()).context("sending event")?;
        }
        Commands::Random { count, seed } => {
            let issued = client
                .random_with(*count, &mut seeded_rng(*seed))
                .context("sending random commands")?;
            info!(count = issued.len(), "random commands acknowledged");
        }
        Commands::Bench { rate, num, seed } => {
            let rate = rate
                .or(config.rate)
                .context("no rate given on the command line or in the config")?;
            let num = num
                .or(config.num)
                .context("no command count given on the command line or in the config")?;
            let paced = PacedRun::new(rate, num)?;
            println!("rate={rate}Hz, num={num}, interval={:?}", paced.interval());

            let mut report = paced.run(&mut client, &mut seeded_rng(*seed));
            println!("{report}");
            if let Some(err) = report.error.take() {
                return Err(err).context("paced run aborted");
            }
        }
    }

    client.close().context("closing connection")?;
    Ok(())
}

fn seeded_rng(seed: Option<u64>) -> Box<dyn RngCore> {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(rand::thread_rng()),
    }
}
