// src/crypto/mod.rs

pub mod cipher;
pub mod rsa_auth;

pub use cipher::ChannelCipher;
pub use rsa_auth::{ClientKeypair, ServerPublicKey};
