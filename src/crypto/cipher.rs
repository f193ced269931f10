//! The post-handshake channel cipher: AES-256-CBC, with a non-standard padding quirk
//! (pad byte = unpadded length, not the pad length). A stateful cipher wrapped in a
//! struct that carries its own running IV across calls, rather than re-initializing
//! per message.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use zeroize::Zeroize;

use crate::constants::AES_BLOCK_LEN;

/// AES-256 in CBC mode, rolled by hand rather than via a block-mode crate: the session
/// cipher's IV is *not* re-initialized per message, it simply advances as consecutive
/// blocks are encrypted/decrypted, exactly like a continuing CBC stream.
pub struct ChannelCipher {
    cipher: Aes256,
    iv: [u8; AES_BLOCK_LEN],
    key: [u8; 32],
}

impl ChannelCipher {
    pub fn new(key: [u8; 32], iv: [u8; AES_BLOCK_LEN]) -> Self {
        let cipher = Aes256::new(GenericArray::from_slice(&key));
        Self { cipher, iv, key }
    }

    /// Encrypts one 16-byte block, chaining it against the stored IV and leaving the
    /// resulting ciphertext as the IV for the next call.
    pub fn encrypt_block(&mut self, block: &[u8; AES_BLOCK_LEN]) -> [u8; AES_BLOCK_LEN] {
        let mut xored = *block;
        for i in 0..AES_BLOCK_LEN {
            xored[i] ^= self.iv[i];
        }
        let mut ga = GenericArray::clone_from_slice(&xored);
        self.cipher.encrypt_block(&mut ga);
        let ciphertext: [u8; AES_BLOCK_LEN] = ga.into();
        self.iv = ciphertext;
        ciphertext
    }

    /// Decrypts one 16-byte block, then chains against the stored IV (i.e. the previous
    /// ciphertext block) the same way `encrypt_block` does.
    pub fn decrypt_block(&mut self, block: &[u8; AES_BLOCK_LEN]) -> [u8; AES_BLOCK_LEN] {
        let mut ga = GenericArray::clone_from_slice(block);
        self.cipher.decrypt_block(&mut ga);
        let mut plaintext: [u8; AES_BLOCK_LEN] = ga.into();
        for i in 0..AES_BLOCK_LEN {
            plaintext[i] ^= self.iv[i];
        }
        self.iv = *block;
        plaintext
    }
}

impl Drop for ChannelCipher {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}
