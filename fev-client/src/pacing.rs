//! # Paced Runs
//!
//! Purpose: Drive a client at a fixed command rate to profile the server's
//! response time under a steady load.
//!
//! ## Design Principles
//! 1. **Pre-Generated Workload**: Commands are drawn before the first send so
//!    random selection stays off the timed path.
//! 2. **Absolute Ticks**: Each send waits for `origin + k * interval`, so a
//!    slow round trip does not shift every later tick.
//! 3. **Partial Results**: A transport error stops the run but the report
//!    still covers what was sent.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use fev_common::{Command, ConfigError};
use rand::Rng;
use tracing::{debug, warn};

use crate::client::{random_command, ClientError, ClientResult, CommandClient};
use crate::transport::Transport;

/// A fixed-rate sequence of random commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedRun {
    interval: Duration,
    count: usize,
}

impl PacedRun {
    /// Plans `count` commands at `rate_hz` commands per second.
    pub fn new(rate_hz: u32, count: usize) -> ClientResult<Self> {
        if rate_hz == 0 {
            return Err(ClientError::Config(ConfigError::Invalid(
                "rate must be non-zero".to_string(),
            )));
        }
        Ok(PacedRun {
            interval: Duration::from_nanos(1_000_000_000 / u64::from(rate_hz)),
            count,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Sends the planned commands through `client`, one per tick.
    ///
    /// **Input**: an open client and the randomness source for the workload.
    /// **Output**: timing report; `report.error` holds the failure, if any.
    ///
    /// **Logic**:
    /// 1. Draw all commands up front.
    /// 2. For each: sleep until the next tick, then send and await the ack.
    /// 3. Accumulate time slept and time between consecutive wake-ups.
    pub fn run<T: Transport, R: Rng + ?Sized>(
        &self,
        client: &mut CommandClient<T>,
        rng: &mut R,
    ) -> PacedReport {
        let commands: Vec<Command> = (0..self.count).map(|_| random_command(rng)).collect();
        let progress_step = (self.count / 10).max(1);

        let mut slept = Duration::ZERO;
        let mut between = Duration::ZERO;
        let mut ticks = 0usize;
        let mut sent = 0usize;
        let mut error = None;

        let mut next_tick = Instant::now();
        let mut woke = next_tick;
        for (idx, command) in commands.into_iter().enumerate() {
            let previous_wake = woke;
            let before_sleep = Instant::now();
            next_tick += self.interval;
            thread::sleep(next_tick.saturating_duration_since(before_sleep));
            woke = Instant::now();

            slept += woke - before_sleep;
            between += woke - previous_wake;
            ticks += 1;

            if let Err(err) = client.send(command) {
                warn!(sent, error = %err, "paced run aborted");
                error = Some(err);
                break;
            }
            sent += 1;

            if idx % progress_step == progress_step - 1 {
                debug!(sent, planned = self.count, "paced run progress");
            }
        }

        PacedReport::new(self.count, sent, ticks, slept, between, error)
    }
}

/// Timing results of a paced run.
#[derive(Debug)]
pub struct PacedReport {
    /// Commands planned.
    pub planned: usize,
    /// Commands acknowledged.
    pub sent: usize,
    /// Mean time spent sleeping before each send.
    pub avg_sleep_us: f64,
    /// Mean time between consecutive wake-ups.
    pub avg_interval_us: f64,
    /// Achieved command rate, derived from `avg_interval_us`.
    pub response_rate_hz: f64,
    /// Error that ended the run early.
    pub error: Option<ClientError>,
}

impl PacedReport {
    fn new(
        planned: usize,
        sent: usize,
        ticks: usize,
        slept: Duration,
        between: Duration,
        error: Option<ClientError>,
    ) -> Self {
        let (avg_sleep_us, avg_interval_us) = if ticks == 0 {
            (0.0, 0.0)
        } else {
            (
                slept.as_nanos() as f64 / 1e3 / ticks as f64,
                between.as_nanos() as f64 / 1e3 / ticks as f64,
            )
        };
        let response_rate_hz = if avg_interval_us > 0.0 {
            1e6 / avg_interval_us
        } else {
            0.0
        };
        PacedReport {
            planned,
            sent,
            avg_sleep_us,
            avg_interval_us,
            response_rate_hz,
            error,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.sent == self.planned
    }
}

impl fmt::Display for PacedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            sent: {}/{}", self.sent, self.planned)?;
        writeln!(f, "   average sleep: {:.1} us", self.avg_sleep_us)?;
        writeln!(f, "average interval: {:.1} us", self.avg_interval_us)?;
        write!(f, "   response rate: {:.1} Hz", self.response_rate_hz)
    }
}
