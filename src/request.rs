//! Command/response wire encode/decode, riding the session's `ChannelCipher`.

use crate::constants::{
    AES_BLOCK_LEN, SESSION_ID_LEN, STATUS_BAD_REQUEST, STATUS_ERROR, STATUS_EXPIRED,
    STATUS_HASH_ERROR, STATUS_INVALID_SESSION, STATUS_OKAY,
};
pub use crate::constants::{CMD_READ_TEMPERATURE, CMD_TOGGLE_INDICATOR};
use crate::crypto::ChannelCipher;
use crate::error::SessionError;
use crate::framing::Framing;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Okay,
    Error,
    Expired,
    HashError,
    BadRequest,
    InvalidSession,
    Unknown(u8),
}

impl Status {
    fn from_byte(b: u8) -> Self {
        match b {
            STATUS_OKAY => Status::Okay,
            STATUS_ERROR => Status::Error,
            STATUS_EXPIRED => Status::Expired,
            STATUS_HASH_ERROR => Status::HashError,
            STATUS_BAD_REQUEST => Status::BadRequest,
            STATUS_INVALID_SESSION => Status::InvalidSession,
            other => Status::Unknown(other),
        }
    }

    fn code(self) -> u8 {
        match self {
            Status::Okay => STATUS_OKAY,
            Status::Error => STATUS_ERROR,
            Status::Expired => STATUS_EXPIRED,
            Status::HashError => STATUS_HASH_ERROR,
            Status::BadRequest => STATUS_BAD_REQUEST,
            Status::InvalidSession => STATUS_INVALID_SESSION,
            Status::Unknown(b) => b,
        }
    }
}

/// A decoded `STATUS_OKAY` response. Holds the raw 5-byte payload; typed accessors
/// interpret it for the two known command shapes.
#[derive(Debug, Clone)]
pub struct Response {
    raw: [u8; 5],
}

impl Response {
    pub fn raw(&self) -> &[u8; 5] {
        &self.raw
    }

    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.raw)
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()
    }

    pub fn as_led(&self) -> Result<bool, SessionError> {
        match self.as_text().as_str() {
            "ON" => Ok(true),
            "OFF" => Ok(false),
            other => Err(SessionError::Decode(format!("not a recognized LED value: {other:?}"))),
        }
    }

    pub fn as_temperature_celsius(&self) -> Result<f32, SessionError> {
        self.as_text()
            .parse::<f32>()
            .map_err(|e| SessionError::Decode(format!("not a temperature: {e}")))
    }
}

/// Builds the 16-byte plaintext block: `command || SessionId || pad`, where each pad
/// byte equals the *unpadded* length (9), not the pad length (7).
fn build_plaintext(command: u8, session_id: &[u8; SESSION_ID_LEN]) -> [u8; AES_BLOCK_LEN] {
    let mut buf = [0u8; AES_BLOCK_LEN];
    buf[0] = command;
    buf[1..1 + SESSION_ID_LEN].copy_from_slice(session_id);

    let unpadded_len = (1 + SESSION_ID_LEN) as u8;
    for b in &mut buf[1 + SESSION_ID_LEN..] {
        *b = unpadded_len;
    }
    buf
}

pub(crate) fn request<T: Transport>(
    framing: &mut Framing<T>,
    cipher: &mut ChannelCipher,
    session_id: &[u8; SESSION_ID_LEN],
    command: u8,
) -> Result<Response, SessionError> {
    let plaintext = build_plaintext(command, session_id);
    let ciphertext = cipher.encrypt_block(&plaintext);
    framing.send(&ciphertext)?;

    let reply_ct = framing.recv(AES_BLOCK_LEN)?;
    let mut reply_block = [0u8; AES_BLOCK_LEN];
    reply_block.copy_from_slice(&reply_ct);
    let reply_pt = cipher.decrypt_block(&reply_block);

    let status = Status::from_byte(reply_pt[0]);
    if status != Status::Okay {
        return Err(SessionError::Command { status: status.code() });
    }

    let mut raw = [0u8; 5];
    raw.copy_from_slice(&reply_pt[1..6]);
    Ok(Response { raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_uses_prepad_length_as_fill_byte() {
        let block = build_plaintext(CMD_TOGGLE_INDICATOR, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(block[0], CMD_TOGGLE_INDICATOR);
        assert_eq!(&block[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&block[9..16], &[9u8; 7]);
    }

    #[test]
    fn response_trims_nuls_and_whitespace() {
        let resp = Response { raw: *b"ON\0\0\0" };
        assert_eq!(resp.as_text(), "ON");
        assert!(resp.as_led().unwrap());
    }

    #[test]
    fn unrecognized_led_text_is_a_decode_error() {
        let resp = Response { raw: *b"MAYBE" };
        assert!(resp.as_led().is_err());
    }
}
