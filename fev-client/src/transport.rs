//! # Transports
//!
//! Purpose: Move one command to the peer and wait for its acknowledgment,
//! over either a UDP socket or a TCP stream.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `Transport` is the seam; `CommandClient` is generic
//!    over it, so framing and acknowledgment policy never leak into the client.
//! 2. **Exclusive Ownership**: Each transport owns its socket; `shutdown`
//!    consumes the transport, so a closed socket cannot be used again.
//! 3. **Opt-In Deadlines**: Without an acknowledgment timeout every wait blocks,
//!    with one the wait fails as `ClientError::AckTimeout`.
//! 4. **Performance First**: Nagle is disabled on streams and write buffers are
//!    reused across commands.

use std::fmt;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use fev_common::{Command, Dialect, DATAGRAM_QUIT, STREAM_ACK};
use tracing::debug;

use crate::client::{ClientError, ClientResult};

/// Socket-level settings applied when a transport connects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportSettings {
    /// Upper bound on one acknowledgment wait. `None` blocks forever.
    pub ack_timeout: Option<Duration>,
    /// Upper bound on the TCP handshake. Ignored by datagram transports.
    pub connect_timeout: Option<Duration>,
}

/// Acknowledgment observed for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Byte that completed the wait; `None` for an empty datagram.
    pub byte: Option<u8>,
    /// Bytes read and dropped before the acknowledgment.
    pub discarded: usize,
}

impl fmt::Display for Ack {
    /// Formats like a byte literal, e.g. `b'Y'`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.byte {
            Some(byte) => write!(f, "b'{}'", std::ascii::escape_default(byte)),
            None => write!(f, "b''"),
        }
    }
}

/// A connected channel that can carry toggle commands.
pub trait Transport: Sized {
    /// Wire encoding used by this transport.
    const DIALECT: Dialect;

    /// Opens a socket to `addr`.
    fn connect(addr: SocketAddr, settings: &TransportSettings) -> ClientResult<Self>;

    /// Address of the connected peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Writes the wire form of `command`.
    fn send_command(&mut self, command: Command) -> ClientResult<()>;

    /// Blocks until the peer acknowledges the last command.
    fn await_ack(&mut self) -> ClientResult<Ack>;

    /// Says goodbye if the dialect has a quit opcode, then releases the socket.
    fn shutdown(self) -> ClientResult<()>;
}

/// Connectionless transport: one byte out, one datagram back.
pub struct DatagramTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    ack_timeout: Option<Duration>,
}

impl Transport for DatagramTransport {
    const DIALECT: Dialect = Dialect::Datagram;

    fn connect(addr: SocketAddr, settings: &TransportSettings) -> ClientResult<Self> {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket
            .connect(addr)
            .map_err(|source| ClientError::Connect { addr, source })?;
        socket.set_read_timeout(settings.ack_timeout)?;
        Ok(DatagramTransport {
            socket,
            peer: addr,
            ack_timeout: settings.ack_timeout,
        })
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn send_command(&mut self, command: Command) -> ClientResult<()> {
        self.socket.send(&[Self::DIALECT.opcode(command)])?;
        Ok(())
    }

    fn await_ack(&mut self) -> ClientResult<Ack> {
        // Any single datagram counts; its content is not inspected.
        let mut buf = [0u8; 1];
        let started = Instant::now();
        let len = self
            .socket
            .recv(&mut buf)
            .map_err(|err| read_error(err, self.ack_timeout, started))?;
        Ok(Ack {
            byte: (len > 0).then_some(buf[0]),
            discarded: 0,
        })
    }

    fn shutdown(self) -> ClientResult<()> {
        self.socket.send(&[DATAGRAM_QUIT])?;
        debug!(peer = %self.peer, "sent quit opcode");
        Ok(())
    }
}

/// Connection-oriented transport: CRLF-framed opcodes, `'Y'`-terminated replies.
pub struct StreamTransport {
    // Buffered reader keeps the byte-at-a-time sentinel scan off the syscall path.
    reader: BufReader<TcpStream>,
    write_buf: Vec<u8>,
    peer: SocketAddr,
    ack_timeout: Option<Duration>,
}

impl StreamTransport {
    /// Reports whether Nagle's algorithm is disabled on the socket.
    pub fn nodelay(&self) -> io::Result<bool> {
        self.reader.get_ref().nodelay()
    }
}

impl Transport for StreamTransport {
    const DIALECT: Dialect = Dialect::Stream;

    fn connect(addr: SocketAddr, settings: &TransportSettings) -> ClientResult<Self> {
        let stream = match settings.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|source| ClientError::Connect { addr, source })?;
        // Every command is a few bytes; coalescing would only add latency.
        stream.set_nodelay(true)?;
        stream.set_read_timeout(settings.ack_timeout)?;

        Ok(StreamTransport {
            reader: BufReader::new(stream),
            write_buf: Vec::with_capacity(4),
            peer: addr,
            ack_timeout: settings.ack_timeout,
        })
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn send_command(&mut self, command: Command) -> ClientResult<()> {
        self.write_buf.clear();
        Self::DIALECT.encode(command, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;
        Ok(())
    }

    fn await_ack(&mut self) -> ClientResult<Ack> {
        let started = Instant::now();
        let mut discarded = 0;
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Err(ClientError::PeerClosed),
                Ok(_) if byte[0] == STREAM_ACK => {
                    return Ok(Ack {
                        byte: Some(STREAM_ACK),
                        discarded,
                    })
                }
                Ok(_) => discarded += 1,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(read_error(err, self.ack_timeout, started)),
            }

            // The socket timeout bounds each read; this bounds the whole scan.
            if let Some(limit) = self.ack_timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(ClientError::AckTimeout { waited });
                }
            }
        }
    }

    fn shutdown(self) -> ClientResult<()> {
        match self.reader.get_ref().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already hung up; the handle is released on drop either way.
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn read_error(err: io::Error, ack_timeout: Option<Duration>, started: Instant) -> ClientError {
    let timed_out = matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut);
    if timed_out && ack_timeout.is_some() {
        ClientError::AckTimeout {
            waited: started.elapsed(),
        }
    } else {
        ClientError::Io(err)
    }
}
