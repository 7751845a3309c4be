// ============================================
// File: crates/gridlink-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Main Functionality
//! - `derive_channel_key`: Expands raw ECDH output into a `ChannelKey`
//! - `hkdf_expand`: General HKDF-SHA256 for arbitrary output lengths
//!
//! Raw ECDH output is not uniformly random; it is only ever used as HKDF
//! input keying material.
//!
//! ## Last Modified
//! v0.1.0 - Initial KDF implementation

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::ChannelKey;
use super::CHANNEL_KEY_SIZE;
use crate::error::{CoreError, Result};

// ============================================
// Key Derivation
// ============================================

/// Derives a channel key from a raw ECDH shared secret.
///
/// # Arguments
/// * `shared_secret` - Raw ECDH output (input keying material)
/// * `salt` - Optional HKDF salt; `None` uses the all-zero salt
/// * `info` - Domain separation string
///
/// # Errors
/// Returns `KeyDerivation` if the HKDF expansion fails.
pub fn derive_channel_key(
    shared_secret: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
) -> Result<ChannelKey> {
    let hk = Hkdf::<Sha256>::new(salt, shared_secret);

    let mut key_bytes = [0u8; CHANNEL_KEY_SIZE];
    hk.expand(info, &mut key_bytes)
        .map_err(|_| CoreError::KeyDerivation {
            reason: "HKDF expansion failed".into(),
        })?;

    let key = ChannelKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Derives `output_len` bytes of key material.
///
/// # Errors
/// Returns `KeyDerivation` if `output_len` exceeds the HKDF-SHA256 limit
/// (255 * 32 bytes).
pub fn hkdf_expand(
    input_key_material: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output_len: usize,
) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(salt, input_key_material);

    let mut output = vec![0u8; output_len];
    hk.expand(info, &mut output)
        .map_err(|_| CoreError::KeyDerivation {
            reason: format!("HKDF expansion failed for {output_len} bytes"),
        })?;

    Ok(output)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc5869_case_1() {
        let ikm = [0x0b_u8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let okm = hkdf_expand(&ikm, Some(&salt), &info, 42).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_derive_channel_key_deterministic() {
        let secret = [0x42_u8; 32];

        let k1 = derive_channel_key(&secret, None, b"microgrid-secure-channel").unwrap();
        let k2 = derive_channel_key(&secret, None, b"microgrid-secure-channel").unwrap();
        let k3 = derive_channel_key(&secret, None, b"another-grid").unwrap();

        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert_ne!(k1.as_bytes(), &secret);
    }

    #[test]
    fn test_channel_key_matches_general_expand() {
        let secret = [9u8; 32];
        let key = derive_channel_key(&secret, None, b"ctx").unwrap();
        let raw = hkdf_expand(&secret, None, b"ctx", CHANNEL_KEY_SIZE).unwrap();

        assert_eq!(key.as_bytes().as_slice(), raw.as_slice());
    }

    #[test]
    fn test_hkdf_output_limit() {
        assert!(hkdf_expand(&[1u8; 32], None, b"", 255 * 32).is_ok());
        assert!(matches!(
            hkdf_expand(&[1u8; 32], None, b"", 255 * 32 + 1),
            Err(CoreError::KeyDerivation { .. })
        ));
    }
}
