#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fev_client::ClientOptions;
use fev_common::{ServiceConfig, DATAGRAM_QUIT};

/// How long a datagram peer waits for the next packet before it stops.
const DATAGRAM_IDLE: Duration = Duration::from_millis(500);

/// Spawns a UDP peer that answers every command with `reply` and stops after
/// a quiet period. Joins to every byte received, quit opcode included.
pub fn spawn_datagram_peer(reply: u8) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind");
    let addr = socket.local_addr().expect("addr");
    socket.set_read_timeout(Some(DATAGRAM_IDLE)).expect("timeout");

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 16];
        while let Ok((len, from)) = socket.recv_from(&mut buf) {
            seen.extend_from_slice(&buf[..len]);
            if buf[..len] != [DATAGRAM_QUIT] {
                let _ = socket.send_to(&[reply], from);
            }
        }
        seen
    });

    (addr, handle)
}

/// Spawns a TCP peer that reads three-byte commands and answers each with
/// `reply` until the client disconnects. Joins to the commands received.
pub fn spawn_stream_peer(reply: &'static [u8]) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let mut seen = Vec::new();
        let mut command = [0u8; 3];
        while stream.read_exact(&mut command).is_ok() {
            seen.push(command.to_vec());
            let _ = stream.write_all(reply);
            let _ = stream.flush();
        }
        seen
    });

    (addr, handle)
}

/// Spawns a TCP peer that reads everything and never answers.
pub fn spawn_silent_stream_peer() -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let mut seen = Vec::new();
        let _ = stream.read_to_end(&mut seen);
        seen
    });

    (addr, handle)
}

/// Spawns a TCP peer that answers the first command with `'Y'` only after
/// `delay`, then never answers again. Joins to the bytes read after the first
/// command.
pub fn spawn_late_stream_peer(delay: Duration) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let mut command = [0u8; 3];
        if stream.read_exact(&mut command).is_err() {
            return Vec::new();
        }
        thread::sleep(delay);
        let _ = stream.write_all(b"Y");
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        rest
    });

    (addr, handle)
}

/// Binds a UDP socket that never replies. Keep it alive for the test.
pub fn bind_silent_datagram_peer() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("timeout");
    socket
}

/// Spawns a TCP peer that reads one command and hangs up without replying.
pub fn spawn_hangup_stream_peer() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut command = [0u8; 3];
        let _ = stream.read_exact(&mut command);
    });

    addr
}

pub fn config_for(addr: SocketAddr) -> ServiceConfig {
    ServiceConfig::with_port(addr.port())
}

pub fn timed() -> ClientOptions {
    ClientOptions {
        timed: true,
        ..ClientOptions::default()
    }
}

/// Console sink the test can read back after handing a clone to the client.
#[derive(Clone, Default)]
pub struct SharedConsole(Arc<Mutex<Vec<u8>>>);

impl SharedConsole {
    pub fn boxed(&self) -> Box<dyn Write + Send> {
        Box::new(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("console lock")).into_owned()
    }
}

impl Write for SharedConsole {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("console lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
