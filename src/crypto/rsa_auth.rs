//! RSA keypair handling for the handshake: keygen, DER export/import, and the
//! PKCS#1v1.5 encrypt/decrypt/sign/verify primitives it rides on.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::constants::RSA_BITS;
use crate::error::{HandshakeStage, SessionError};

/// An ephemeral RSA keypair generated fresh for one leg of the handshake. `rsa`'s
/// `RsaPrivateKey` zeroizes its own key material on drop, so there is nothing extra to
/// do here.
pub struct ClientKeypair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl ClientKeypair {
    pub fn generate(stage: HandshakeStage) -> Result<Self, SessionError> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
            .map_err(|e| SessionError::handshake(stage, format!("RSA keygen failed: {e}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    pub fn public_key_der(&self, stage: HandshakeStage) -> Result<Vec<u8>, SessionError> {
        self.public
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| SessionError::handshake(stage, format!("DER encode failed: {e}")))
    }

    pub fn decrypt(&self, stage: HandshakeStage, ciphertext: &[u8]) -> Result<Vec<u8>, SessionError> {
        self.private
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|e| SessionError::handshake(stage, format!("RSA decrypt failed: {e}")))
    }

    /// Signs a pre-hashed (SHA-256) digest, matching `session.py`'s
    /// `rsa.sign(HMAC_KEY, "SHA256")` where `HMAC_KEY` is already `SHA-256(PreSharedSecret)`.
    pub fn sign(&self, stage: HandshakeStage, hashed: &[u8]) -> Result<Vec<u8>, SessionError> {
        self.private
            .sign(Pkcs1v15Sign::new::<Sha256>(), hashed)
            .map_err(|e| SessionError::handshake(stage, format!("RSA sign failed: {e}")))
    }
}

/// The peer's public key, reconstructed from the DER blob it sends during step 2.
pub struct ServerPublicKey(RsaPublicKey);

impl ServerPublicKey {
    pub fn from_der(stage: HandshakeStage, der: &[u8]) -> Result<Self, SessionError> {
        RsaPublicKey::from_public_key_der(der)
            .map(ServerPublicKey)
            .map_err(|e| SessionError::handshake(stage, format!("invalid server public key DER: {e}")))
    }

    pub fn encrypt(&self, stage: HandshakeStage, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        self.0
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| SessionError::handshake(stage, format!("RSA encrypt failed: {e}")))
    }

    /// Verifies a PKCS#1v1.5 signature over a pre-hashed (SHA-256) digest. The client
    /// side of this crate never calls this (it only signs); it exists for the
    /// symmetric peer and for test harnesses that stand in for one.
    pub fn verify(&self, hashed: &[u8], signature: &[u8]) -> bool {
        self.0
            .verify(Pkcs1v15Sign::new::<Sha256>(), hashed, signature)
            .is_ok()
    }
}
