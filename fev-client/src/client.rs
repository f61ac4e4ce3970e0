//! # Command Client API
//!
//! Purpose: Expose a compact, blocking API for toggling the event server's
//! sync and event states and timing each round trip.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `CommandClient` hides transport and framing details.
//! 2. **Strategy Pattern**: The transport is a type parameter, so datagram and
//!    stream clients share one implementation.
//! 3. **RAII Teardown**: The socket is released by `close` or, failing that,
//!    by `Drop`; closing twice is a no-op.
//! 4. **Fail Fast**: Config, resolution and connect errors surface from the
//!    constructor; I/O errors mid-session propagate without reconnecting.

use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};

use fev_common::{Command, ConfigError, ServiceConfig, Target};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::latency::{LatencyLog, LatencySummary};
use crate::transport::{Ack, DatagramTransport, StreamTransport, Transport, TransportSettings};

/// Result type for the command client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the command client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration file missing, malformed, or incomplete.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Host name did not resolve to a socket address.
    #[error("could not resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: io::Error,
    },
    /// Socket could not be connected to the peer.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// Peer did not acknowledge within the configured bound.
    #[error("no acknowledgment after {waited:?}")]
    AckTimeout { waited: Duration },
    /// Stream ended before the acknowledgment byte arrived.
    #[error("peer closed the connection before acknowledging")]
    PeerClosed,
    /// The client was already closed.
    #[error("client is closed")]
    Closed,
}

/// Behavior switches for a client session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Print a description of every command issued.
    pub interactive: bool,
    /// Print the byte that acknowledged every command.
    pub show_response: bool,
    /// Record round-trip latency and print a summary on close.
    pub timed: bool,
    /// Overrides the config's `ack_timeout_ms`.
    pub ack_timeout: Option<Duration>,
    /// Overrides the config's `connect_timeout_ms`.
    pub connect_timeout: Option<Duration>,
}

/// Client over UDP.
pub type DatagramClient = CommandClient<DatagramTransport>;
/// Client over TCP.
pub type StreamClient = CommandClient<StreamTransport>;

/// Blocking client that sends one command at a time and waits for its
/// acknowledgment before returning.
pub struct CommandClient<T: Transport> {
    // `None` once closed, or once a command went unacknowledged.
    transport: Option<T>,
    // Set by the first `close`; later calls are no-ops.
    finished: bool,
    peer: SocketAddr,
    options: ClientOptions,
    latency: LatencyLog,
    console: Box<dyn Write + Send>,
}

impl<T: Transport> CommandClient<T> {
    /// Loads the config file at `path` and connects to `host` on its port.
    pub fn from_config_file(
        path: impl AsRef<Path>,
        host: &str,
        options: ClientOptions,
    ) -> ClientResult<Self> {
        let config = ServiceConfig::load(path)?;
        Self::connect(&config, host, options)
    }

    /// Connects to `(host, config.port)`, printing to stdout.
    pub fn connect(config: &ServiceConfig, host: &str, options: ClientOptions) -> ClientResult<Self> {
        Self::with_console(config, host, options, Box::new(io::stdout()))
    }

    /// Connects to `(host, config.port)`, printing to `console`.
    pub fn with_console(
        config: &ServiceConfig,
        host: &str,
        options: ClientOptions,
        mut console: Box<dyn Write + Send>,
    ) -> ClientResult<Self> {
        if options.ack_timeout == Some(Duration::ZERO)
            || options.connect_timeout == Some(Duration::ZERO)
        {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()).into());
        }
        let addr = resolve(host, config.port)?;
        let settings = TransportSettings {
            ack_timeout: options.ack_timeout.or(config.ack_timeout()),
            connect_timeout: options.connect_timeout.or(config.connect_timeout()),
        };
        let transport = T::connect(addr, &settings)?;
        let peer = transport.peer_addr();
        info!(%peer, dialect = ?T::DIALECT, "connected");
        writeln!(console, "connected to: {peer}")?;

        Ok(CommandClient {
            transport: Some(transport),
            finished: false,
            peer,
            options,
            latency: LatencyLog::new(),
            console,
        })
    }

    /// Turns the sync state on or off.
    pub fn sync(&mut self, value: bool) -> ClientResult<Ack> {
        self.send(Command::new(Target::Sync, value))
    }

    /// Turns the event state on or off.
    pub fn event(&mut self, value: bool) -> ClientResult<Ack> {
        self.send(Command::new(Target::Event, value))
    }

    /// Sends `command` and blocks until it is acknowledged.
    ///
    /// An acknowledgment timeout drops the connection: a late reply would
    /// otherwise be taken as the acknowledgment of the next command. Later
    /// sends fail with `ClientError::Closed`.
    pub fn send(&mut self, command: Command) -> ClientResult<Ack> {
        let transport = self.transport.as_mut().ok_or(ClientError::Closed)?;

        let started = self.options.timed.then(Instant::now);
        transport.send_command(command)?;
        let ack = match transport.await_ack() {
            Ok(ack) => ack,
            Err(err @ ClientError::AckTimeout { .. }) => {
                self.abandon_transport(command, &err);
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        if let Some(started) = started {
            self.latency.record(started.elapsed());
        }
        debug!(%command, %ack, discarded = ack.discarded, "command acknowledged");

        if self.options.show_response {
            writeln!(self.console, "{ack}")?;
        }
        if self.options.interactive {
            writeln!(self.console, "{command}")?;
        }
        Ok(ack)
    }

    /// Issues `count` commands picked uniformly with the thread RNG.
    pub fn random(&mut self, count: usize) -> ClientResult<Vec<Command>> {
        self.random_with(count, &mut rand::thread_rng())
    }

    /// Issues `count` commands picked uniformly with `rng`.
    ///
    /// Returns the commands in the order they were acknowledged.
    pub fn random_with<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> ClientResult<Vec<Command>> {
        let mut issued = Vec::with_capacity(count);
        for _ in 0..count {
            let command = random_command(rng);
            self.send(command)?;
            issued.push(command);
        }
        Ok(issued)
    }

    /// Releases the socket and prints the latency summary when timed.
    ///
    /// The first call shuts the transport down; later calls return `Ok(None)`
    /// without touching the network. The summary is `None` when untimed or
    /// when no round trip was recorded.
    pub fn close(&mut self) -> ClientResult<Option<LatencySummary>> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;

        let shutdown = match self.transport.take() {
            Some(transport) => transport.shutdown(),
            None => Ok(()),
        };
        info!(peer = %self.peer, samples = self.latency.len(), "connection closed");

        let summary = if self.options.timed {
            let summary = self.latency.summary();
            self.print_summary(summary.as_ref())?;
            summary
        } else {
            None
        };
        shutdown?;
        Ok(summary)
    }

    fn abandon_transport(&mut self, command: Command, reason: &ClientError) {
        if let Some(transport) = self.transport.take() {
            warn!(peer = %self.peer, %command, error = %reason, "dropping connection after missed acknowledgment");
            if let Err(err) = transport.shutdown() {
                debug!(error = %err, "shutdown after missed acknowledgment failed");
            }
        }
    }

    fn print_summary(&mut self, summary: Option<&LatencySummary>) -> io::Result<()> {
        let rule = "-".repeat(30);
        writeln!(self.console, "{rule}")?;
        match summary {
            Some(summary) => writeln!(self.console, "latency: {summary}")?,
            None => writeln!(self.console, "latency: no samples")?,
        }
        writeln!(self.console, "{rule}")?;
        self.console.flush()
    }

    /// True once closed, or once a missed acknowledgment dropped the socket.
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Recorded round trips, in microseconds.
    pub fn latencies(&self) -> &[f64] {
        self.latency.samples()
    }

    pub fn latency_log(&self) -> &LatencyLog {
        &self.latency
    }

    /// The open transport, or `None` after close.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }
}

impl<T: Transport> Drop for CommandClient<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(peer = %self.peer, error = %err, "close on drop failed");
        }
    }
}

/// Picks one of the four commands uniformly.
pub fn random_command<R: Rng + ?Sized>(rng: &mut R) -> Command {
    Command::ALL[rng.gen_range(0..Command::ALL.len())]
}

fn resolve(host: &str, port: u16) -> ClientResult<SocketAddr> {
    let target = format!("{host}:{port}");
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| ClientError::Resolve {
            target: target.clone(),
            source,
        })?
        .collect();

    // The server listens on IPv4, so prefer it when a name has both families.
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ClientError::Resolve {
            target,
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        })
}
