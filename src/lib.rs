//! Secure session client for a point-to-point serial link to an embedded peer.
//!
//! [`Session`] is the entry point: open a [`transport::Transport`] (or use
//! [`transport::SerialTransport`] for real hardware), call [`Session::open`] to run the
//! handshake, then [`Session::request`] to exchange commands.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod request;
pub mod session;
pub mod transport;

pub use error::{HandshakeStage, SessionError, SessionState};
pub use request::{Response, CMD_READ_TEMPERATURE, CMD_TOGGLE_INDICATOR};
pub use session::Session;
pub use transport::{available_ports, LoopbackTransport, SerialTransport, Transport};
