//! The five-step client handshake.

use sha2::{Digest, Sha256};

use crate::constants::{
    CHANNEL_AUTH_SPLIT, CLIENT_AUTH_PAYLOAD_LEN, CLIENT_AUTH_SPLIT, PRE_SHARED_SECRET, RSA_SIZE,
    SESSION_ID_LEN, SESSION_MATERIAL_LEN, SESSION_OKAY,
};
use crate::crypto::{ChannelCipher, ClientKeypair, ServerPublicKey};
use crate::error::{HandshakeStage, SessionError};
use crate::framing::Framing;
use crate::transport::Transport;

/// The material a successful handshake hands back to `Session`.
pub struct HandshakeOutput {
    pub session_id: [u8; SESSION_ID_LEN],
    pub cipher: ChannelCipher,
}

/// `SHA-256(PreSharedSecret)`. Used both as the framing HMAC key and as the digest
/// signed in steps 3 and 5 — it never leaves the process as anything but this hash.
pub fn hmac_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PRE_SHARED_SECRET);
    hasher.finalize().into()
}

/// Drives the five-step exchange over an already-keyed `Framing`. On any failure the
/// caller is responsible for closing the framing/transport and marking the session
/// `Failed`; this function only reports what went wrong.
pub fn run<T: Transport>(framing: &mut Framing<T>) -> Result<HandshakeOutput, SessionError> {
    let psk_digest = hmac_key();

    // Step 1: offer a transient public key.
    let keypair1 = ClientKeypair::generate(HandshakeStage::ClientKeyOffer)?;
    let der1 = keypair1.public_key_der(HandshakeStage::ClientKeyOffer)?;
    if der1.len() != crate::constants::DER_PUBLIC_KEY_LEN {
        return Err(SessionError::handshake(
            HandshakeStage::ClientKeyOffer,
            format!(
                "RSA public key DER is {} bytes, expected {}",
                der1.len(),
                crate::constants::DER_PUBLIC_KEY_LEN
            ),
        ));
    }
    framing.send(&der1)?;

    // Step 2: receive the server's public key as two RSA ciphertext halves.
    let server_key_ct = framing.recv(2 * RSA_SIZE)?;
    let mut server_der = Vec::with_capacity(2 * (RSA_SIZE - 11));
    server_der.extend(keypair1.decrypt(HandshakeStage::ServerKey, &server_key_ct[0..RSA_SIZE])?);
    server_der.extend(keypair1.decrypt(HandshakeStage::ServerKey, &server_key_ct[RSA_SIZE..2 * RSA_SIZE])?);
    let server_key = ServerPublicKey::from_der(HandshakeStage::ServerKey, &server_der)?;

    // Step 3: rotate the client key and authenticate with a signature over the
    // pre-shared secret's digest.
    drop(keypair1);
    let keypair2 = ClientKeypair::generate(HandshakeStage::ClientAuth)?;
    let der2 = keypair2.public_key_der(HandshakeStage::ClientAuth)?;
    let signature = keypair2.sign(HandshakeStage::ClientAuth, &psk_digest)?;

    let mut auth_payload = Vec::with_capacity(CLIENT_AUTH_PAYLOAD_LEN);
    auth_payload.extend_from_slice(&der2);
    auth_payload.extend_from_slice(&signature);
    if auth_payload.len() != CLIENT_AUTH_PAYLOAD_LEN {
        return Err(SessionError::handshake(
            HandshakeStage::ClientAuth,
            format!(
                "client auth payload is {} bytes, expected {CLIENT_AUTH_PAYLOAD_LEN}",
                auth_payload.len()
            ),
        ));
    }

    let mut auth_wire = Vec::with_capacity(3 * RSA_SIZE);
    for (start, end) in CLIENT_AUTH_SPLIT {
        auth_wire.extend(server_key.encrypt(HandshakeStage::ClientAuth, &auth_payload[start..end])?);
    }
    framing.send(&auth_wire)?;

    // Step 4: acknowledgement.
    let ack_ct = framing.recv(RSA_SIZE)?;
    let ack_pt = keypair2.decrypt(HandshakeStage::Ack, &ack_ct)?;
    if !ack_pt.starts_with(SESSION_OKAY) {
        return Err(SessionError::handshake(
            HandshakeStage::Ack,
            "acknowledgement did not match SESSION_OKAY",
        ));
    }

    // Step 5: re-authenticate and receive session material.
    let signature2 = keypair2.sign(HandshakeStage::SessionMaterial, &psk_digest)?;
    let mut material_wire = Vec::with_capacity(2 * RSA_SIZE);
    for (start, end) in CHANNEL_AUTH_SPLIT {
        material_wire.extend(server_key.encrypt(HandshakeStage::SessionMaterial, &signature2[start..end])?);
    }
    framing.send(&material_wire)?;

    let material_ct = framing.recv(RSA_SIZE)?;
    let material = keypair2.decrypt(HandshakeStage::SessionMaterial, &material_ct)?;
    if material.len() != SESSION_MATERIAL_LEN {
        return Err(SessionError::handshake(
            HandshakeStage::SessionMaterial,
            format!(
                "session material is {} bytes, expected {SESSION_MATERIAL_LEN}",
                material.len()
            ),
        ));
    }

    let mut session_id = [0u8; SESSION_ID_LEN];
    session_id.copy_from_slice(&material[0..8]);
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&material[8..24]);
    let mut key = [0u8; 32];
    key.copy_from_slice(&material[24..56]);

    Ok(HandshakeOutput {
        session_id,
        cipher: ChannelCipher::new(key, iv),
    })
}
