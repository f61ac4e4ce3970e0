//! # Wire Protocol
//!
//! Purpose: Define the four toggle commands and the byte sequences each
//! transport dialect puts on the wire for them.
//!
//! ## Design Principles
//!
//! 1. **Closed Command Set**: `Command` is a four-variant enum, so an invalid
//!    opcode cannot be constructed by callers.
//! 2. **Dialect Table**: Encoding differences between transports live in one
//!    `match`, not in duplicated client code.
//! 3. **Allocation-Free Encoding**: Callers pass a reusable output buffer.
//!
//! ## Wire Layout
//!
//! ```text
//! Datagram (one byte per datagram):
//! +--------+          SyncOn='1' SyncOff='2' EventOn='A' EventOff='D'
//! | op:1B  |          Quit='X' (sent once, before close)
//! +--------+          reply: any single byte
//!
//! Stream (CRLF terminated):
//! +--------+--------+--------+   SyncOn='1' SyncOff='2' EventOn='A' EventOff='B'
//! | op:1B  |  '\r'  |  '\n'  |   reply: bytes up to and including 'Y'
//! +--------+--------+--------+
//! ```

use std::fmt;

/// Datagram opcode: sync on.
pub const DATAGRAM_SYNC_ON: u8 = b'1';
/// Datagram opcode: sync off.
pub const DATAGRAM_SYNC_OFF: u8 = b'2';
/// Datagram opcode: event on.
pub const DATAGRAM_EVENT_ON: u8 = b'A';
/// Datagram opcode: event off.
pub const DATAGRAM_EVENT_OFF: u8 = b'D';
/// Datagram opcode telling the peer this client is going away.
pub const DATAGRAM_QUIT: u8 = b'X';

/// Stream opcode: sync on.
pub const STREAM_SYNC_ON: u8 = b'1';
/// Stream opcode: sync off.
pub const STREAM_SYNC_OFF: u8 = b'2';
/// Stream opcode: event on.
pub const STREAM_EVENT_ON: u8 = b'A';
/// Stream opcode: event off.
pub const STREAM_EVENT_OFF: u8 = b'B';
/// Line ending appended to every stream opcode.
pub const STREAM_LINE_END: &[u8; 2] = b"\r\n";
/// Byte the stream peer sends once a command has been processed.
pub const STREAM_ACK: u8 = b'Y';

/// Server-side state a command toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Sync,
    Event,
}

impl Target {
    /// Lower-case name used in console output.
    pub fn name(self) -> &'static str {
        match self {
            Target::Sync => "sync",
            Target::Event => "event",
        }
    }
}

/// One of the four toggle commands: {sync, event} x {on, off}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SyncOn,
    SyncOff,
    EventOn,
    EventOff,
}

impl Command {
    /// Every command, in opcode order.
    pub const ALL: [Command; 4] = [
        Command::SyncOn,
        Command::SyncOff,
        Command::EventOn,
        Command::EventOff,
    ];

    /// Builds the command that sets `target` to `on`.
    pub fn new(target: Target, on: bool) -> Self {
        match (target, on) {
            (Target::Sync, true) => Command::SyncOn,
            (Target::Sync, false) => Command::SyncOff,
            (Target::Event, true) => Command::EventOn,
            (Target::Event, false) => Command::EventOff,
        }
    }

    pub fn target(self) -> Target {
        match self {
            Command::SyncOn | Command::SyncOff => Target::Sync,
            Command::EventOn | Command::EventOff => Target::Event,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Command::SyncOn | Command::EventOn)
    }
}

impl fmt::Display for Command {
    /// Formats as `sync=ON`, `event=OFF`, ...
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_on() { "ON" } else { "OFF" };
        write!(f, "{}={}", self.target().name(), state)
    }
}

/// Byte encoding used by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Connectionless, one bare byte per datagram.
    Datagram,
    /// Connection-oriented, opcode followed by CRLF.
    Stream,
}

impl Dialect {
    /// Returns the opcode byte for `command` in this dialect.
    ///
    /// The two dialects disagree on event-off (`'D'` vs `'B'`); both values
    /// are kept as the respective servers expect them.
    pub fn opcode(self, command: Command) -> u8 {
        match (self, command) {
            (Dialect::Datagram, Command::SyncOn) => DATAGRAM_SYNC_ON,
            (Dialect::Datagram, Command::SyncOff) => DATAGRAM_SYNC_OFF,
            (Dialect::Datagram, Command::EventOn) => DATAGRAM_EVENT_ON,
            (Dialect::Datagram, Command::EventOff) => DATAGRAM_EVENT_OFF,
            (Dialect::Stream, Command::SyncOn) => STREAM_SYNC_ON,
            (Dialect::Stream, Command::SyncOff) => STREAM_SYNC_OFF,
            (Dialect::Stream, Command::EventOn) => STREAM_EVENT_ON,
            (Dialect::Stream, Command::EventOff) => STREAM_EVENT_OFF,
        }
    }

    /// Appends the full wire form of `command` to `out`.
    pub fn encode(self, command: Command, out: &mut Vec<u8>) {
        out.push(self.opcode(command));
        if self == Dialect::Stream {
            out.extend_from_slice(STREAM_LINE_END);
        }
    }

    /// Opcode sent just before closing, if the dialect has one.
    pub fn quit_opcode(self) -> Option<u8> {
        match self {
            Dialect::Datagram => Some(DATAGRAM_QUIT),
            Dialect::Stream => None,
        }
    }

    /// Maps a received opcode back to its command. Used by test peers.
    pub fn decode(self, opcode: u8) -> Option<Command> {
        Command::ALL
            .into_iter()
            .find(|command| self.opcode(*command) == opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datagram_opcodes_are_single_bytes() {
        let expected: [(Command, &[u8]); 4] = [
            (Command::SyncOn, b"1"),
            (Command::SyncOff, b"2"),
            (Command::EventOn, b"A"),
            (Command::EventOff, b"D"),
        ];
        for (command, bytes) in expected {
            let mut buf = Vec::new();
            Dialect::Datagram.encode(command, &mut buf);
            assert_eq!(buf, bytes, "{command}");
        }
    }

    #[test]
    fn stream_opcodes_carry_line_ending() {
        let expected: [(Command, &[u8]); 4] = [
            (Command::SyncOn, b"1\r\n"),
            (Command::SyncOff, b"2\r\n"),
            (Command::EventOn, b"A\r\n"),
            (Command::EventOff, b"B\r\n"),
        ];
        for (command, bytes) in expected {
            let mut buf = Vec::new();
            Dialect::Stream.encode(command, &mut buf);
            assert_eq!(buf, bytes, "{command}");
        }
    }

    #[test]
    fn only_datagram_has_quit() {
        assert_eq!(Dialect::Datagram.quit_opcode(), Some(b'X'));
        assert_eq!(Dialect::Stream.quit_opcode(), None);
    }

    #[test]
    fn command_from_target_and_value() {
        assert_eq!(Command::new(Target::Sync, true), Command::SyncOn);
        assert_eq!(Command::new(Target::Event, false), Command::EventOff);
        assert_eq!(Command::EventOn.target(), Target::Event);
        assert!(!Command::SyncOff.is_on());
    }

    #[test]
    fn display_matches_console_description() {
        assert_eq!(Command::SyncOn.to_string(), "sync=ON");
        assert_eq!(Command::EventOff.to_string(), "event=OFF");
    }

    #[test]
    fn decode_rejects_foreign_opcodes() {
        assert_eq!(Dialect::Stream.decode(b'B'), Some(Command::EventOff));
        assert_eq!(Dialect::Datagram.decode(b'B'), None);
        assert_eq!(Dialect::Datagram.decode(b'X'), None);
    }
}
