//! # FastEvent Command Client
//!
//! Purpose: Provide a lightweight, synchronous client that toggles the event
//! server's sync and event states and measures each round trip.
//!
//! ## Design Principles
//! 1. **One Client, Two Transports**: Datagram and stream variants differ only
//!    in the `Transport` they plug in.
//! 2. **No Pipelining**: Every command waits for its acknowledgment before the
//!    call returns.
//! 3. **Scoped Sockets**: Sockets are released on close, error, or drop.
//! 4. **Protocol Clarity**: Opcodes live in `fev-common`, not in the client.

mod client;
mod latency;
mod pacing;
mod transport;

pub use client::{
    random_command, ClientError, ClientOptions, ClientResult, CommandClient, DatagramClient,
    StreamClient,
};
pub use latency::{LatencyLog, LatencySummary};
pub use pacing::{PacedReport, PacedRun};
pub use transport::{Ack, DatagramTransport, StreamTransport, Transport, TransportSettings};
