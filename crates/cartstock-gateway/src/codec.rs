//! # Device Transport Codec
//!
//! Encrypts and decrypts the scan protocol spoken by the handheld
//! terminals. The wire format is fixed by the terminal firmware and must
//! stay bit-exact:
//!
//! ```text
//! base64( IV (16 bytes) || AES-128-CBC-encrypt( PKCS7-pad(plaintext) ) )
//! ```
//!
//! The 16-byte key is pre-shared with the terminal out of band and
//! injected through configuration; there is no process-wide key constant.
//!
//! A decode failure (bad base64, bad length, bad padding, wrong key) is a
//! transport error, never an inventory event: it stops here and the
//! ledger never sees the request.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

use crate::error::CodecError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Pre-shared key length in bytes (AES-128).
pub const KEY_LEN: usize = 16;

const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// Codec for the encrypted scan channel.
#[derive(Clone)]
pub struct ScanCodec {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for ScanCodec {
    // The key never appears in logs or debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCodec").finish_non_exhaustive()
    }
}

impl ScanCodec {
    /// Creates a codec with the given pre-shared key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        ScanCodec { key }
    }

    /// Encrypts a plaintext for the terminal.
    ///
    /// A fresh random IV is drawn per message and prepended to the
    /// ciphertext before base64 encoding.
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut raw = Vec::with_capacity(IV_LEN + ciphertext.len());
        raw.extend_from_slice(&iv);
        raw.extend_from_slice(&ciphertext);
        BASE64.encode(raw)
    }

    /// Decrypts a message from the terminal.
    ///
    /// ## Errors
    /// * [`CodecError::Base64`] - body is not base64
    /// * [`CodecError::BadLength`] - shorter than IV + one block, or not
    ///   block-aligned
    /// * [`CodecError::Decrypt`] - padding check failed (wrong key or
    ///   tampered ciphertext)
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CodecError> {
        let raw = BASE64.decode(encoded.trim())?;

        // PKCS7 always pads, so a valid message carries at least one full
        // cipher block after the IV.
        if raw.len() < IV_LEN + BLOCK_LEN || (raw.len() - IV_LEN) % BLOCK_LEN != 0 {
            return Err(CodecError::BadLength(raw.len()));
        }

        let (iv, ciphertext) = raw.split_at(IV_LEN);

        let cipher = Aes128CbcDec::new_from_slices(&self.key, iv)
            .map_err(|_| CodecError::BadLength(raw.len()))?;

        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CodecError::Decrypt)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = *b"0123456789abcdef";

    fn codec() -> ScanCodec {
        ScanCodec::new(KEY)
    }

    #[test]
    fn round_trip() {
        let codec = codec();
        let plaintext = br#"{"barcode": "4606224236582", "action": "add"}"#;

        let encoded = codec.encrypt(plaintext);
        let decoded = codec.decrypt(&encoded).unwrap();
        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn round_trip_16kb_payload() {
        let codec = codec();
        let plaintext: Vec<u8> = (0..16 * 1024).map(|i| (i % 251) as u8).collect();

        let decoded = codec.decrypt(&codec.encrypt(&plaintext)).unwrap();
        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn round_trip_empty_payload() {
        let codec = codec();
        let decoded = codec.decrypt(&codec.encrypt(b"")).unwrap();
        assert_eq!(decoded, b"");
    }

    #[test]
    fn ivs_are_unique_per_message() {
        let codec = codec();
        // Same plaintext, different ciphertext every time.
        assert_ne!(codec.encrypt(b"same"), codec.encrypt(b"same"));
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            codec().decrypt("not@valid@base64!"),
            Err(CodecError::Base64(_))
        ));
    }

    #[test]
    fn rejects_short_and_misaligned_payloads() {
        let codec = codec();

        // Shorter than IV + one block.
        let short = BASE64.encode([0u8; 20]);
        assert!(matches!(codec.decrypt(&short), Err(CodecError::BadLength(20))));

        // Not block-aligned after the IV.
        let misaligned = BASE64.encode([0u8; 16 + 17]);
        assert!(matches!(
            codec.decrypt(&misaligned),
            Err(CodecError::BadLength(33))
        ));
    }

    #[test]
    fn corruption_never_yields_the_original_plaintext() {
        let codec = codec();
        let plaintext = br#"{"barcode": "4606224236582", "action": "red"}"#.to_vec();

        let encoded = codec.encrypt(&plaintext);
        let mut raw = BASE64.decode(&encoded).unwrap();

        for position in 0..raw.len() {
            raw[position] ^= 0x01;
            let tampered = BASE64.encode(&raw);

            // Either the padding check rejects it outright, or the
            // corrupted block garbles the plaintext; the original bytes
            // must never come back.
            match codec.decrypt(&tampered) {
                Err(CodecError::Decrypt) => {}
                Ok(decoded) => assert_ne!(decoded, plaintext, "byte {}", position),
                Err(other) => panic!("unexpected error at byte {}: {:?}", position, other),
            }

            raw[position] ^= 0x01;
        }
    }

    #[test]
    fn wrong_key_never_yields_the_plaintext() {
        let codec = codec();
        let other = ScanCodec::new(*b"fedcba9876543210");
        let plaintext = b"pre-shared keys must match".to_vec();

        let encoded = codec.encrypt(&plaintext);
        match other.decrypt(&encoded) {
            Err(CodecError::Decrypt) => {}
            Ok(decoded) => assert_ne!(decoded, plaintext),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
}
