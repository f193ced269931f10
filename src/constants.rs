//! Wire constants. Every value here is load-bearing: it's either a literal the embedded
//! peer expects verbatim, or a byte-range split that only works because both sides agree
//! on it out of band. Do not derive these from anything at runtime.

/// Serial line speed (bits/s) the embedded peer is configured for.
pub const BAUDRATE: u32 = 115_200;

/// RSA modulus size in bits for both ephemeral client keys and the server key.
pub const RSA_BITS: usize = 2048;

/// RSA modulus size in bytes. Every PKCS#1v1.5 ciphertext on the wire is exactly this long.
pub const RSA_SIZE: usize = 256;

/// Public exponent for every RSA keypair in this protocol. `rsa::RsaPrivateKey::new`
/// already defaults to this; named here because the peer assumes it too.
pub const RSA_EXPONENT: u64 = 65_537;

pub const AES_BLOCK_LEN: usize = 16;
pub const AES_KEY_LEN: usize = 32;
pub const AES_IV_LEN: usize = 16;

pub const SESSION_ID_LEN: usize = 8;

/// Output size of SHA-256, also the HMAC key/digest length used for framing.
pub const DIGEST_LEN: usize = 32;

/// Pre-shared secret baked into both client and peer. Never sent on the wire in the
/// clear: only `SHA-256(PRE_SHARED_SECRET)` ever appears, as the framing HMAC key and
/// as the digest that gets RSA-signed during authentication.
pub const PRE_SHARED_SECRET: &[u8; 32] = b"Fj2-;wu3Ur=ARl2!Tqi6IuKM3nG]8z1+";

/// DER-encoded RSA public key length the handshake assumes for a 2048-bit key: the
/// SubjectPublicKeyInfo encoding (AlgorithmIdentifier + BIT STRING wrapper around the
/// 270-byte RSAPublicKey) that `to_public_key_der()` emits, not the bare PKCS#1 length.
pub const DER_PUBLIC_KEY_LEN: usize = 294;

/// `client_auth` plaintext is `der_public_key || pkcs1v15_signature`, split into three
/// RSA-sized segments before encryption: 184 + 184 + 182 bytes.
pub const CLIENT_AUTH_PAYLOAD_LEN: usize = 550;
pub const CLIENT_AUTH_SPLIT: [(usize, usize); 3] = [(0, 184), (184, 368), (368, 550)];

/// The re-authentication signature sent alongside the session-material request is split
/// into two 128-byte segments before encryption.
pub const CHANNEL_AUTH_SPLIT: [(usize, usize); 2] = [(0, 128), (128, 256)];

/// Literal the peer's acknowledgement plaintext must start with.
pub const SESSION_OKAY: &[u8] = b"SESSION_OKAY";

/// Session-material plaintext layout: 8-byte SessionId + 16-byte IV + 32-byte AES key.
pub const SESSION_MATERIAL_LEN: usize = SESSION_ID_LEN + AES_IV_LEN + AES_KEY_LEN;

pub const CMD_TOGGLE_INDICATOR: u8 = 0x02;
pub const CMD_READ_TEMPERATURE: u8 = 0x03;

pub const STATUS_OKAY: u8 = 0x00;
pub const STATUS_ERROR: u8 = 0x01;
pub const STATUS_EXPIRED: u8 = 0x02;
pub const STATUS_HASH_ERROR: u8 = 0x03;
pub const STATUS_BAD_REQUEST: u8 = 0x04;
pub const STATUS_INVALID_SESSION: u8 = 0x05;
