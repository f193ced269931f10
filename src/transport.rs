//! Transport adapter: blocking serial I/O, since a session has exactly one owner and
//! one peer.

use std::collections::VecDeque;
use std::io::Read as _;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::SessionError;

/// The three operations the framing layer and session lifecycle need from a byte
/// channel. `write` must report the actual number of bytes written (short writes are
/// surfaced, not silently retried); `read_exact` blocks until either `n` bytes have
/// arrived or the channel times out / closes.
pub trait Transport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, SessionError>;
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, SessionError>;
    fn close(&mut self);
}

/// Real hardware, via the `serialport` crate.
pub struct SerialTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    pub fn open(port_name: &str, baud: u32, timeout: Duration) -> Result<Self, SessionError> {
        let port = serialport::new(port_name, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| SessionError::Transport(format!("failed to open {port_name}: {e}")))?;
        Ok(Self { port: Some(port) })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, SessionError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| SessionError::Transport("port already closed".into()))?;
        std::io::Write::write(port, buf)
            .map_err(|e| SessionError::Transport(format!("write failed: {e}")))
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, SessionError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| SessionError::Transport("port already closed".into()))?;
        let mut buf = vec![0u8; n];
        port.read_exact(&mut buf)
            .map_err(|e| SessionError::Transport(format!("short read (wanted {n} bytes): {e}")))?;
        Ok(buf)
    }

    fn close(&mut self) {
        self.port = None;
    }
}

/// Enumerate serial devices for the CLI's `list` subcommand. Not used by the core
/// protocol logic.
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}

type Channel = Arc<(Mutex<VecDeque<u8>>, Condvar)>;

/// In-memory duplex pipe for tests: `pair()` returns two ends, each other's peer.
/// `read_exact` genuinely blocks until enough bytes have arrived (or the pipe is
/// closed), so a test can run the client handshake and a scripted "server" on real
/// threads, same as the blocking serial transport they stand in for.
#[derive(Clone)]
pub struct LoopbackTransport {
    outgoing: Channel,
    incoming: Channel,
    closed: Arc<Mutex<bool>>,
}

impl LoopbackTransport {
    pub fn pair() -> (Self, Self) {
        let a_to_b: Channel = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let b_to_a: Channel = Arc::new((Mutex::new(VecDeque::new()), Condvar::new()));
        let closed = Arc::new(Mutex::new(false));
        let client = LoopbackTransport {
            outgoing: a_to_b.clone(),
            incoming: b_to_a.clone(),
            closed: closed.clone(),
        };
        let server = LoopbackTransport {
            outgoing: b_to_a,
            incoming: a_to_b,
            closed,
        };
        (client, server)
    }
}

impl Transport for LoopbackTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, SessionError> {
        if *self.closed.lock().unwrap() {
            return Err(SessionError::Transport("loopback closed".into()));
        }
        let (queue, ready) = &*self.outgoing;
        let mut queue = queue.lock().unwrap();
        queue.extend(buf.iter().copied());
        ready.notify_all();
        Ok(buf.len())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, SessionError> {
        let (queue, ready) = &*self.incoming;
        let mut queue = queue.lock().unwrap();
        while queue.len() < n {
            if *self.closed.lock().unwrap() {
                return Err(SessionError::Transport("loopback closed".into()));
            }
            queue = ready.wait(queue).unwrap();
        }
        Ok(queue.drain(..n).collect())
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
        self.incoming.1.notify_all();
        self.outgoing.1.notify_all();
    }
}
