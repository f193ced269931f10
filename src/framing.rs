//! Framing layer: a keyed-hash accumulator over the session transcript.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SessionError;
use crate::transport::Transport;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 run as a single long-lived accumulator. Never re-keyed, never reset:
/// every `update` absorbs into the same running state for the life of the session.
struct FrameHasher {
    mac: HmacSha256,
}

impl FrameHasher {
    fn new(key: &[u8]) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length"),
        }
    }

    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.mac, data);
    }

    /// Digest of everything absorbed so far, without consuming the accumulator.
    fn digest(&self) -> [u8; 32] {
        self.mac.clone().finalize().into_bytes().into()
    }
}

/// Wraps a transport with the keyed-hash chain. `send`/`recv` are the only operations
/// the handshake and request engine use to move bytes.
pub struct Framing<T: Transport> {
    transport: T,
    hasher: FrameHasher,
}

impl<T: Transport> Framing<T> {
    pub fn new(transport: T, hmac_key: &[u8]) -> Self {
        Self {
            transport,
            hasher: FrameHasher::new(hmac_key),
        }
    }

    /// Absorbs `payload` into the hasher, then writes `payload || digest` in one call.
    /// A short write is fatal: the transport is closed and `Transport` is returned.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), SessionError> {
        self.hasher.update(payload);
        let digest = self.hasher.digest();

        let mut frame = Vec::with_capacity(payload.len() + digest.len());
        frame.extend_from_slice(payload);
        frame.extend_from_slice(&digest);

        let written = self.transport.write(&frame)?;
        if written != frame.len() {
            self.transport.close();
            return Err(SessionError::Transport(format!(
                "short write: wrote {written} of {} bytes",
                frame.len()
            )));
        }
        Ok(())
    }

    /// Reads exactly `n + 32` bytes, absorbs the first `n` into the hasher, and checks
    /// the trailing 32 bytes against the resulting digest. A mismatch is fatal:
    /// `Integrity`, transport closed.
    pub fn recv(&mut self, n: usize) -> Result<Vec<u8>, SessionError> {
        let frame = self.transport.read_exact(n + 32)?;
        let (payload, digest_bytes) = frame.split_at(n);

        self.hasher.update(payload);
        let expected = self.hasher.digest();

        if expected.as_slice() != digest_bytes {
            self.transport.close();
            return Err(SessionError::Integrity);
        }
        Ok(payload.to_vec())
    }

    pub fn close(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;

    const KEY: &[u8] = b"test-hmac-key";

    #[test]
    fn round_trip_preserves_payload_and_hasher_state() {
        let (client_t, server_t) = LoopbackTransport::pair();
        let mut client = Framing::new(client_t, KEY);
        let mut server = Framing::new(server_t, KEY);

        client.send(b"hello").unwrap();
        let got = server.recv(5).unwrap();
        assert_eq!(got, b"hello");
        assert_eq!(client.hasher.digest(), server.hasher.digest());

        server.send(b"world!").unwrap();
        let got = client.recv(6).unwrap();
        assert_eq!(got, b"world!");
        assert_eq!(client.hasher.digest(), server.hasher.digest());
    }

    #[test]
    fn corrupted_digest_byte_is_fatal() {
        let (mut client_t, server_t) = LoopbackTransport::pair();
        let mut server = Framing::new(server_t, KEY);

        // Hand-build a frame with a flipped digest bit, bypassing Framing::send so we
        // can corrupt exactly one byte after the digest is computed.
        let mut hasher = FrameHasher::new(KEY);
        hasher.update(b"payload!");
        let mut digest = hasher.digest();
        digest[0] ^= 0x01;

        let mut frame = b"payload!".to_vec();
        frame.extend_from_slice(&digest);
        client_t.write(&frame).unwrap();

        let err = server.recv(8).unwrap_err();
        assert!(matches!(err, SessionError::Integrity));
    }

    #[test]
    fn short_read_is_a_transport_error() {
        let (client_t, server_t) = LoopbackTransport::pair();
        let mut client = Framing::new(client_t, KEY);
        let mut server = Framing::new(server_t, KEY);

        client.send(b"ab").unwrap();
        let err = server.recv(9001).unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }
}
