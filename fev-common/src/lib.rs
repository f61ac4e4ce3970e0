// fev-common - Shared protocol and configuration definitions for FastEvent
//
// This crate defines the toggle opcodes and the JSON configuration format

pub mod config;
pub mod error;
pub mod protocol;

// Re-export for convenience
pub use config::*;
pub use error::*;
pub use protocol::*;
