//! Sealed-box encryption compatible with libsodium's `crypto_box_seal`.
//!
//! GitHub decrypts submitted secrets with `crypto_box_seal_open`, so the
//! bytes produced here must match that construction exactly:
//!
//! ```text
//! [ephemeral public key (32)] || [XSalsa20-Poly1305 ciphertext || tag (16)]
//! ```
//!
//! The nonce is never transmitted. Both sides derive it as
//! `BLAKE2b-24(ephemeral_pk || recipient_pk)`, with BLAKE2b configured for a
//! 24-byte digest. A BLAKE2b digest parameterized to 24 bytes is a different
//! function from a longer digest truncated to 24 bytes, and only the former
//! interoperates with the recipient's decryption.
//!
//! No state is shared between calls; `seal` is safe to invoke from any number
//! of concurrent workers.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use crypto_box::aead::Aead;
use crypto_box::{Nonce, PublicKey, SalsaBox, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;

/// Length of an X25519 public key.
pub const KEY_LEN: usize = 32;

/// Length of the derived nonce.
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

/// Total overhead added to the plaintext: ephemeral public key plus tag.
pub const OVERHEAD: usize = KEY_LEN + TAG_LEN;

/// Encrypt `plaintext` for the holder of `recipient_pk`.
///
/// Generates a fresh ephemeral keypair per call, so sealing the same
/// plaintext twice yields different output. The result is
/// `plaintext.len() + OVERHEAD` bytes.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyLength` if `recipient_pk` is not exactly
/// 32 bytes (checked before any cryptographic operation), `CryptoError::Rng`
/// if the OS random source fails, and `CryptoError::EncryptionFailed` if the
/// underlying box encryption fails.
pub fn seal(plaintext: &[u8], recipient_pk: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let recipient: [u8; KEY_LEN] = recipient_pk
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength(recipient_pk.len()))?;
    let recipient = PublicKey::from(recipient);

    let mut ephemeral_bytes = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut ephemeral_bytes)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    let ephemeral_sk = SecretKey::from(ephemeral_bytes);
    let ephemeral_pk = ephemeral_sk.public_key();

    let nonce = derive_nonce(ephemeral_pk.as_bytes(), recipient.as_bytes());

    let ciphertext = SalsaBox::new(&recipient, &ephemeral_sk)
        .encrypt(&Nonce::from(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut sealed = Vec::with_capacity(KEY_LEN + ciphertext.len());
    sealed.extend_from_slice(ephemeral_pk.as_bytes());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Derive the sealed-box nonce from the two public keys.
///
/// `BLAKE2b-24(ephemeral_pk || recipient_pk)` with a natively 24-byte
/// digest, never a truncation of a longer one.
pub fn derive_nonce(ephemeral_pk: &[u8; KEY_LEN], recipient_pk: &[u8; KEY_LEN]) -> [u8; NONCE_LEN] {
    let mut hasher =
        Blake2bVar::new(NONCE_LEN).expect("24 is a valid BLAKE2b output length");
    hasher.update(ephemeral_pk);
    hasher.update(recipient_pk);

    let mut nonce = [0u8; NONCE_LEN];
    hasher
        .finalize_variable(&mut nonce)
        .expect("output buffer matches configured length");
    nonce
}
