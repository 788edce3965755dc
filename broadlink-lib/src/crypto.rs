//! Payload encryption for Broadlink command packets
//!
//! Every command payload travels AES-128-CBC encrypted with a fixed IV. Before
//! authorization the protocol-wide default key is used; afterwards the
//! 16-byte session key handed out by the device.
//!
//! Payloads are zero-padded up to the AES block size. There is no padding
//! marker, so decrypted payloads may carry trailing zeros that the
//! per-command parsers have to ignore.

use crate::constants::BLOCK_SIZE;
use crate::error::BLError;
use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

/// Length of `len` bytes once padded to the block size
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// AES-128-CBC encrypt `plaintext`, zero-padding it to a whole number of blocks
pub fn encrypt(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let cipher = Aes128::new(key.into());

    let mut output = plaintext.to_vec();
    output.resize(padded_len(plaintext.len()), 0);

    let mut prev = *iv;
    for chunk in output.chunks_mut(BLOCK_SIZE) {
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(chunk.into());
        prev.copy_from_slice(chunk);
    }

    output
}

/// AES-128-CBC decrypt `ciphertext`
///
/// The ciphertext must be a whole number of blocks.
pub fn decrypt(ciphertext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Result<Vec<u8>, BLError> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(BLError::InvalidPacket(format!(
            "encrypted payload of {} bytes is not a multiple of {BLOCK_SIZE}",
            ciphertext.len()
        )));
    }

    let cipher = Aes128::new(key.into());
    let mut output = ciphertext.to_vec();

    let mut prev = *iv;
    for chunk in output.chunks_mut(BLOCK_SIZE) {
        let mut saved = [0u8; BLOCK_SIZE];
        saved.copy_from_slice(chunk);
        cipher.decrypt_block(chunk.into());
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        prev = saved;
    }

    Ok(output)
}
