//! `Session`: aggregates transport, framing, and crypto state behind a small,
//! state-checked API. The session exclusively owns its transport and framing hasher,
//! rather than threading itself back into helper objects.

use crate::constants::SESSION_ID_LEN;
use crate::crypto::ChannelCipher;
use crate::error::{SessionError, SessionState};
use crate::framing::Framing;
use crate::handshake;
use crate::request::{self, Response};
use crate::transport::Transport;

pub struct Session<T: Transport> {
    framing: Framing<T>,
    state: SessionState,
    session_id: Option<[u8; SESSION_ID_LEN]>,
    cipher: Option<ChannelCipher>,
}

impl<T: Transport> Session<T> {
    /// Opens a session over an already-connected transport: builds the framing layer
    /// and drives the handshake to completion. Returns an `Established` session, or a
    /// typed error with the transport already closed.
    pub fn open(transport: T) -> Result<Self, SessionError> {
        let hmac_key = handshake::hmac_key();
        let framing = Framing::new(transport, &hmac_key);

        let mut session = Session {
            framing,
            state: SessionState::AwaitingServerKey,
            session_id: None,
            cipher: None,
        };

        match handshake::run(&mut session.framing) {
            Ok(output) => {
                session.session_id = Some(output.session_id);
                session.cipher = Some(output.cipher);
                session.state = SessionState::Established;
                Ok(session)
            }
            Err(e) => {
                session.framing.close();
                session.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Issues one command/response exchange. Only legal in `Established`; any
    /// transport or integrity failure drops the session to `Failed`. A non-OKAY
    /// status or a decode failure leaves the session usable.
    pub fn request(&mut self, command: u8) -> Result<Response, SessionError> {
        if self.state != SessionState::Established {
            return Err(SessionError::ProtocolState {
                expected: SessionState::Established,
                actual: self.state,
            });
        }

        let session_id = self
            .session_id
            .expect("Established session always carries a SessionId");
        let cipher = self
            .cipher
            .as_mut()
            .expect("Established session always carries a ChannelCipher");

        match request::request(&mut self.framing, cipher, &session_id, command) {
            Ok(resp) => Ok(resp),
            Err(e @ SessionError::Command { .. }) => Err(e),
            Err(e @ SessionError::Decode(_)) => Err(e),
            Err(e) => {
                self.framing.close();
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Closes the transport and drops all crypto material. Idempotent: calling this
    /// again is a no-op. Sends no close frame.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.framing.close();
        self.session_id = None;
        self.cipher = None;
        self.state = SessionState::Closed;
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}
