//! Passphrase-based authenticated encryption of stored targets.
//!
//! Targets are sealed with AES-256-GCM. The key is the SHA-256 digest of the
//! passphrase, so passphrases of any length map onto a valid key, and every
//! call draws a fresh random nonce.

use crate::error::CipherError;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::str::FromStr;

/// AES-GCM nonce size (96 bits).
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size (128 bits).
pub const TAG_SIZE: usize = 16;

const SEPARATOR: char = ':';

type Result<T> = std::result::Result<T, CipherError>;

/// A sealed target URL: nonce, authentication tag and ciphertext.
///
/// The text form is `base64(nonce):base64(tag):base64(ciphertext)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncryptedPayload {
    nonce: [u8; NONCE_SIZE],
    tag: [u8; TAG_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Encrypts `plaintext` under a key derived from `passphrase`.
    pub fn seal(plaintext: &str, passphrase: &str) -> Result<Self> {
        let cipher = cipher_for(passphrase)?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
            .map_err(|e| CipherError::Encryption(format!("AES-256-GCM encryption failed: {e}")))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(Self {
            nonce,
            tag: tag_bytes,
            ciphertext: buffer,
        })
    }

    /// Decrypts the payload, verifying the tag first.
    ///
    /// Any mismatch yields [`CipherError::AuthenticationFailed`]; no plaintext
    /// is ever returned for a payload that fails verification.
    pub fn open(&self, passphrase: &str) -> Result<String> {
        let cipher = cipher_for(passphrase)?;

        let mut buffer = self.ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&self.nonce),
                b"",
                &mut buffer,
                GenericArray::from_slice(&self.tag),
            )
            .map_err(|_| CipherError::AuthenticationFailed)?;

        String::from_utf8(buffer)
            .map_err(|e| CipherError::MalformedPayload(format!("plaintext is not utf-8: {e}")))
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    pub fn tag(&self) -> &[u8; TAG_SIZE] {
        &self.tag
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

fn cipher_for(passphrase: &str) -> Result<Aes256Gcm> {
    let key = Sha256::digest(passphrase.as_bytes());
    Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| CipherError::Encryption(format!("invalid derived key: {e}")))
}

fn decode_part<const N: usize>(name: &str, part: &str) -> Result<[u8; N]> {
    let bytes = STANDARD
        .decode(part)
        .map_err(|e| CipherError::MalformedPayload(format!("invalid base64 in {name}: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CipherError::MalformedPayload(format!(
            "{} must be {} bytes, got {}",
            name,
            N,
            bytes.len()
        ))
    })
}

impl FromStr for EncryptedPayload {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(SEPARATOR);
        let (Some(nonce), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CipherError::MalformedPayload(
                "expected nonce:tag:ciphertext".to_string(),
            ));
        };

        Ok(Self {
            nonce: decode_part::<NONCE_SIZE>("nonce", nonce)?,
            tag: decode_part::<TAG_SIZE>("tag", tag)?,
            ciphertext: STANDARD.decode(ciphertext).map_err(|e| {
                CipherError::MalformedPayload(format!("invalid base64 in ciphertext: {e}"))
            })?,
        })
    }
}

impl Display for EncryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            STANDARD.encode(self.nonce),
            SEPARATOR,
            STANDARD.encode(self.tag),
            SEPARATOR,
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl std::fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

impl TryFrom<String> for EncryptedPayload {
    type Error = CipherError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EncryptedPayload> for String {
    fn from(value: EncryptedPayload) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_with_same_passphrase() {
        let payload = EncryptedPayload::seal("https://example.com", "hunter2").unwrap();
        assert_eq!(payload.open("hunter2").unwrap(), "https://example.com");
    }

    #[test]
    fn wrong_passphrase_fails_authentication() {
        let payload = EncryptedPayload::seal("https://example.com", "hunter2").unwrap();
        assert_eq!(payload.open("wrong"), Err(CipherError::AuthenticationFailed));
    }

    #[test]
    fn passphrase_length_does_not_matter() {
        let long = "long passphrase ".repeat(40);
        for passphrase in ["", "x", long.as_str()] {
            let payload = EncryptedPayload::seal("https://example.com", passphrase).unwrap();
            assert_eq!(payload.open(passphrase).unwrap(), "https://example.com");
        }
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let first = EncryptedPayload::seal("https://example.com", "key").unwrap();
        let second = EncryptedPayload::seal("https://example.com", "key").unwrap();
        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.ciphertext(), second.ciphertext());
    }

    #[test]
    fn tampering_is_detected() {
        let payload = EncryptedPayload::seal("https://example.com", "key").unwrap();

        let mut flipped_ciphertext = payload.clone();
        flipped_ciphertext.ciphertext[0] ^= 0x01;
        assert_eq!(
            flipped_ciphertext.open("key"),
            Err(CipherError::AuthenticationFailed)
        );

        let mut flipped_tag = payload.clone();
        flipped_tag.tag[3] ^= 0x80;
        assert_eq!(flipped_tag.open("key"), Err(CipherError::AuthenticationFailed));

        let mut flipped_nonce = payload;
        flipped_nonce.nonce[0] ^= 0x01;
        assert_eq!(
            flipped_nonce.open("key"),
            Err(CipherError::AuthenticationFailed)
        );
    }

    #[test]
    fn text_form_parses_back() {
        let payload = EncryptedPayload::seal("https://example.com/a?b=c", "key").unwrap();
        let text = payload.to_string();
        assert_eq!(text.matches(SEPARATOR).count(), 2);

        let parsed: EncryptedPayload = text.parse().unwrap();
        assert_eq!(parsed, payload);
        assert_eq!(parsed.open("key").unwrap(), "https://example.com/a?b=c");
    }

    #[test]
    fn malformed_text_is_rejected() {
        let short_nonce = format!(
            "{}:{}:{}",
            STANDARD.encode([0u8; 4]),
            STANDARD.encode([0u8; TAG_SIZE]),
            STANDARD.encode(b"x")
        );

        for text in ["", "a:b", "a:b:c:d", "!!:AA==:AA==", short_nonce.as_str()] {
            assert!(
                matches!(
                    text.parse::<EncryptedPayload>(),
                    Err(CipherError::MalformedPayload(_))
                ),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn debug_does_not_leak_material() {
        let payload = EncryptedPayload::seal("https://secret.example", "key").unwrap();
        let debug = format!("{payload:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("ciphertext_len"));
    }
}
