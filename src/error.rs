use thiserror::Error;

/// Which leg of the handshake a failure happened on. Carried on `SessionError::Handshake`
/// so a caller (and the CLI's logging) can tell "server never answered" apart from
/// "server answered with garbage" without parsing the message string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    ClientKeyOffer,
    ServerKey,
    ClientAuth,
    Ack,
    SessionMaterial,
}

impl std::fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandshakeStage::ClientKeyOffer => "client_key_offer",
            HandshakeStage::ServerKey => "server_key",
            HandshakeStage::ClientAuth => "client_auth",
            HandshakeStage::Ack => "ack",
            HandshakeStage::SessionMaterial => "session_material",
        };
        f.write_str(s)
    }
}

/// Client-side view of session lifecycle. `Session` only ever moves forward through
/// this chain, except that any handshake or transport failure drops straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingServerKey,
    AwaitingServerAck,
    AwaitingSessionMaterial,
    Established,
    Failed,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingServerKey => "awaiting_server_key",
            SessionState::AwaitingServerAck => "awaiting_server_ack",
            SessionState::AwaitingSessionMaterial => "awaiting_session_material",
            SessionState::Established => "established",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("framing integrity check failed")]
    Integrity,

    #[error("handshake failed at {stage}: {detail}")]
    Handshake {
        stage: HandshakeStage,
        detail: String,
    },

    #[error("invalid session state: expected {expected}, was {actual}")]
    ProtocolState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("server returned non-okay status 0x{status:02x}")]
    Command { status: u8 },

    #[error("failed to decode response payload: {0}")]
    Decode(String),
}

impl SessionError {
    pub fn handshake(stage: HandshakeStage, detail: impl Into<String>) -> Self {
        SessionError::Handshake {
            stage,
            detail: detail.into(),
        }
    }
}
