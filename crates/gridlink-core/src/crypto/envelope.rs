// ============================================
// File: crates/gridlink-core/src/crypto/envelope.rs
// ============================================
//! # Envelope Encryption
//!
//! ## Creation Reason
//! Packages a plaintext into an `EncryptedEnvelope` under a channel key and
//! reverses the process on receipt.
//!
//! ## Main Functionality
//! - `EnvelopeCrypto`: Trait for the envelope cipher
//! - `Aes256CbcEnvelope`: AES-256-CBC implementation
//! - `pkcs7_pad` / `pkcs7_unpad`: block padding
//! - `seal` / `open`: envelope-level convenience functions
//!
//! ## Envelope Construction
//! ```text
//! iv         = 16 random bytes (fresh per call)
//! padded     = plaintext || N * [N]      N = 16 - (len % 16), so 1..=16
//! ciphertext = AES-256-CBC(channel_key, iv, padded)
//! ```
//! A plaintext that is already block aligned gets a full block of padding.
//!
//! ## Decryption Failures
//! | Condition                                | Error              |
//! |------------------------------------------|--------------------|
//! | ciphertext empty or not a block multiple | `CiphertextLength` |
//! | last byte 0 or > 16, or pad bytes differ | `Padding`          |
//! | remaining bytes not UTF-8                | `Decode`           |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never reuse an IV under the same channel key
//! - CBC is unauthenticated and the padding check is not constant-time;
//!   integrity comes only from the separate signed statement
//!
//! ## Last Modified
//! v0.1.0 - Initial envelope implementation

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroize;

use gridlink_common::time::Timestamp;
use gridlink_common::types::NodeId;

use super::keys::ChannelKey;
use super::{AES_BLOCK_SIZE, ENVELOPE_ALGORITHM, IV_SIZE};
use crate::error::{CoreError, Result};
use crate::protocol::messages::EncryptedEnvelope;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

// ============================================
// EnvelopeCrypto Trait
// ============================================

/// Trait for the symmetric cipher behind envelopes.
///
/// # Purpose
/// Lets sessions be tested with alternative implementations while the
/// wire format stays fixed.
pub trait EnvelopeCrypto: Send + Sync {
    /// Pads and encrypts `plaintext`.
    ///
    /// # Errors
    /// - `Encryption`: if the cipher cannot be initialized
    fn encrypt(&self, key: &ChannelKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts `ciphertext` and strips its padding.
    ///
    /// # Errors
    /// - `CiphertextLength`: empty or not a whole number of blocks
    /// - `Padding`: wrong key, corruption or tampering
    fn decrypt(&self, key: &ChannelKey, iv: &[u8; IV_SIZE], ciphertext: &[u8])
        -> Result<Vec<u8>>;

    /// Algorithm tag written into envelopes.
    fn algorithm(&self) -> &'static str;
}

// ============================================
// Aes256CbcEnvelope
// ============================================

/// AES-256-CBC with PKCS#7 padding.
#[derive(Debug, Default, Clone)]
pub struct Aes256CbcEnvelope;

impl Aes256CbcEnvelope {
    /// Creates a new instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EnvelopeCrypto for Aes256CbcEnvelope {
    fn encrypt(&self, key: &ChannelKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CoreError::encryption("invalid key or IV length"))?;

        let mut padded = pkcs7_pad(plaintext);
        let ciphertext = cipher.encrypt_padded_vec_mut::<NoPadding>(&padded);
        padded.zeroize();

        Ok(ciphertext)
    }

    fn decrypt(
        &self,
        key: &ChannelKey,
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        check_ciphertext_length(ciphertext)?;

        let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CoreError::encryption("invalid key or IV length"))?;

        let mut padded = cipher
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(|_| CoreError::CiphertextLength {
                len: ciphertext.len(),
                block_size: AES_BLOCK_SIZE,
            })?;

        let result = pkcs7_unpad(&padded).map(<[u8]>::to_vec);
        padded.zeroize();
        result
    }

    fn algorithm(&self) -> &'static str {
        ENVELOPE_ALGORITHM
    }
}

// ============================================
// Padding
// ============================================

/// Appends PKCS#7 padding; always adds between 1 and 16 bytes.
#[must_use]
pub fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad_len = AES_BLOCK_SIZE - (data.len() % AES_BLOCK_SIZE);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    // pad_len is in 1..=16
    #[allow(clippy::cast_possible_truncation)]
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strips PKCS#7 padding.
///
/// # Errors
/// Returns `Padding` if the buffer is empty, the pad length is 0 or
/// greater than the block size, or the pad bytes are inconsistent.
pub fn pkcs7_unpad(data: &[u8]) -> Result<&[u8]> {
    let &last = data.last().ok_or(CoreError::Padding)?;
    let pad_len = usize::from(last);

    if pad_len == 0 || pad_len > AES_BLOCK_SIZE || pad_len > data.len() {
        return Err(CoreError::Padding);
    }

    let (body, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| b != last) {
        return Err(CoreError::Padding);
    }
    Ok(body)
}

fn check_ciphertext_length(ciphertext: &[u8]) -> Result<()> {
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CoreError::CiphertextLength {
            len: ciphertext.len(),
            block_size: AES_BLOCK_SIZE,
        });
    }
    Ok(())
}

// ============================================
// IV Generation
// ============================================

/// Draws a fresh IV from the operating system's CSPRNG.
///
/// # Errors
/// Returns `Encryption` if the entropy source fails.
pub fn generate_iv() -> Result<[u8; IV_SIZE]> {
    let mut iv = [0u8; IV_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CoreError::encryption(format!("IV generation failed: {e}")))?;
    Ok(iv)
}

// ============================================
// Convenience Functions
// ============================================

/// Seals `plaintext` into an envelope with a fresh IV.
///
/// # Errors
/// Returns `Encryption` if IV generation or the cipher fails.
pub fn seal(
    crypto: &dyn EnvelopeCrypto,
    key: &ChannelKey,
    plaintext: &str,
    sender: &NodeId,
) -> Result<EncryptedEnvelope> {
    let iv = generate_iv()?;
    let ciphertext = crypto.encrypt(key, &iv, plaintext.as_bytes())?;

    debug!(
        sender = %sender,
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "Sealed envelope"
    );

    Ok(EncryptedEnvelope {
        ciphertext,
        iv,
        timestamp: Timestamp::now(),
        algorithm: crypto.algorithm().to_string(),
        sender: sender.clone(),
    })
}

/// Opens an envelope and returns the plaintext text.
///
/// # Errors
/// - `UnsupportedAlgorithm`: envelope tag does not match `crypto`
/// - `CiphertextLength` / `Padding`: wrong key, corruption or tampering
/// - `Decode`: plaintext is not valid UTF-8
pub fn open(
    crypto: &dyn EnvelopeCrypto,
    key: &ChannelKey,
    envelope: &EncryptedEnvelope,
) -> Result<String> {
    if envelope.algorithm != crypto.algorithm() {
        return Err(CoreError::UnsupportedAlgorithm {
            field: "envelope",
            got: envelope.algorithm.chars().take(32).collect(),
            expected: crypto.algorithm(),
        });
    }

    let plaintext = crypto.decrypt(key, &envelope.iv, &envelope.ciphertext)?;
    String::from_utf8(plaintext).map_err(|e| {
        e.into_bytes().zeroize();
        CoreError::Decode
    })
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> ChannelKey {
        ChannelKey::from_bytes([byte; 32])
    }

    fn sender() -> NodeId {
        NodeId::new("security_controller").unwrap()
    }

    #[test]
    fn test_roundtrip_across_block_boundaries() {
        let crypto = Aes256CbcEnvelope::new();
        let key = key(0x42);

        for len in [0usize, 1, 15, 16, 17, 1000] {
            let plaintext = "x".repeat(len);
            let envelope = seal(&crypto, &key, &plaintext, &sender()).unwrap();

            assert_eq!(envelope.ciphertext.len(), (len / 16 + 1) * 16, "len {len}");
            assert_eq!(open(&crypto, &key, &envelope).unwrap(), plaintext, "len {len}");
        }
    }

    #[test]
    fn test_roundtrip_multibyte_text() {
        let crypto = Aes256CbcEnvelope::new();
        let plaintext = "Spannung: 230 V ⚡ Frequenz: 50 Hz";

        let envelope = seal(&crypto, &key(1), plaintext, &sender()).unwrap();
        assert_eq!(open(&crypto, &key(1), &envelope).unwrap(), plaintext);
    }

    #[test]
    fn test_fresh_iv_per_seal() {
        let crypto = Aes256CbcEnvelope::new();
        let a = seal(&crypto, &key(3), "same", &sender()).unwrap();
        let b = seal(&crypto, &key(3), "same", &sender()).unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(a.algorithm, ENVELOPE_ALGORITHM);
    }

    #[test]
    fn test_pkcs7_full_block_padding() {
        let padded = pkcs7_pad(&[0u8; 16]);
        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == 16));

        let padded = pkcs7_pad(b"abc");
        assert_eq!(padded.len(), 16);
        assert_eq!(padded[15], 13);
        assert_eq!(pkcs7_unpad(&padded).unwrap(), b"abc");
    }

    #[test]
    fn test_pkcs7_unpad_rejects_bad_padding() {
        let mut block = [5u8; 16];

        block[15] = 0;
        assert!(matches!(pkcs7_unpad(&block), Err(CoreError::Padding)));

        block[15] = 17;
        assert!(matches!(pkcs7_unpad(&block), Err(CoreError::Padding)));

        let mut inconsistent = [4u8; 16];
        inconsistent[13] = 9;
        assert!(matches!(pkcs7_unpad(&inconsistent), Err(CoreError::Padding)));

        assert!(matches!(pkcs7_unpad(&[]), Err(CoreError::Padding)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let crypto = Aes256CbcEnvelope::new();
        let plaintext = r#"{"command":"SET_VOLTAGE","value":"230V","target":"inverter_7"}"#;
        let envelope = seal(&crypto, &key(1), plaintext, &sender()).unwrap();

        let err = open(&crypto, &key(2), &envelope).unwrap_err();
        assert!(err.is_decryption_failure());
    }

    #[test]
    fn test_tampered_padding_block_detected() {
        let crypto = Aes256CbcEnvelope::new();
        let mut envelope = seal(&crypto, &key(9), &"y".repeat(16), &sender()).unwrap();

        // Last byte of the first block XORs into the final padding byte
        envelope.ciphertext[15] ^= 0xFF;
        assert!(matches!(open(&crypto, &key(9), &envelope), Err(CoreError::Padding)));
    }

    #[test]
    fn test_ciphertext_length_checked() {
        let crypto = Aes256CbcEnvelope::new();
        let mut envelope = seal(&crypto, &key(4), "hello", &sender()).unwrap();

        envelope.ciphertext.pop();
        assert!(matches!(
            open(&crypto, &key(4), &envelope),
            Err(CoreError::CiphertextLength { len: 15, .. })
        ));

        envelope.ciphertext.clear();
        assert!(matches!(
            open(&crypto, &key(4), &envelope),
            Err(CoreError::CiphertextLength { len: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let crypto = Aes256CbcEnvelope::new();
        let iv = [0u8; IV_SIZE];
        let ciphertext = crypto.encrypt(&key(5), &iv, &[0xFF, 0xFE, 0xFD]).unwrap();

        let envelope = EncryptedEnvelope {
            ciphertext,
            iv,
            timestamp: Timestamp::now(),
            algorithm: ENVELOPE_ALGORITHM.into(),
            sender: sender(),
        };
        assert!(matches!(open(&crypto, &key(5), &envelope), Err(CoreError::Decode)));
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let crypto = Aes256CbcEnvelope::new();
        let mut envelope = seal(&crypto, &key(6), "hello", &sender()).unwrap();
        envelope.algorithm = "ChaCha20-Poly1305".into();

        assert!(matches!(
            open(&crypto, &key(6), &envelope),
            Err(CoreError::UnsupportedAlgorithm { .. })
        ));
    }
}
