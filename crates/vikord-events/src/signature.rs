//! HMAC-SHA256 authentication of inbound webhook bodies.
//!
//! The MAC is always computed over the raw request bytes exactly as received.
//! Re-serialising the parsed JSON would reorder keys or change whitespace and
//! break the signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

pub struct SignatureValidator {
    secret: Vec<u8>,
}

impl SignatureValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Check `signature` (lowercase hex HMAC-SHA256) against `raw_body`.
    ///
    /// Returns a verdict only; the caller decides how to reject.
    pub fn validate(&self, raw_body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let sig_hex = signature.map(str::trim).ok_or(SignatureError::Missing)?;
        if sig_hex.is_empty() {
            return Err(SignatureError::Missing);
        }

        if sig_hex.len() != DIGEST_HEX_LEN {
            return Err(SignatureError::LengthMismatch {
                expected: DIGEST_HEX_LEN,
                actual: sig_hex.len(),
            });
        }

        // Uppercase is rejected so that every single-character change to the
        // header yields a different verdict.
        if !sig_hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(SignatureError::Malformed);
        }
        let expected = hex::decode(sig_hex).map_err(|_| SignatureError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(raw_body);
        // verify_slice compares in constant time.
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Hex signature for `raw_body`. Used by tests and local tooling.
    pub fn sign(&self, raw_body: &[u8]) -> Result<String, SignatureError> {
        let mut mac = self.mac()?;
        mac.update(raw_body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event_name":"task.created","time":"2026-10-19T10:00:00Z","data":{}}"#;

    #[test]
    fn valid_signature_passes() {
        let v = SignatureValidator::new("s3cret");
        let sig = v.sign(BODY).unwrap();
        assert_eq!(v.validate(BODY, Some(&sig)), Ok(()));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let v = SignatureValidator::new("Jefe");
        assert_eq!(
            v.sign(b"what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn missing_header_fails() {
        let v = SignatureValidator::new("s3cret");
        assert_eq!(v.validate(BODY, None), Err(SignatureError::Missing));
        assert_eq!(v.validate(BODY, Some("  ")), Err(SignatureError::Missing));
    }

    #[test]
    fn wrong_length_fails() {
        let v = SignatureValidator::new("s3cret");
        assert_eq!(
            v.validate(BODY, Some("abcd")),
            Err(SignatureError::LengthMismatch {
                expected: 64,
                actual: 4
            })
        );
    }

    #[test]
    fn every_body_byte_mutation_fails() {
        let v = SignatureValidator::new("s3cret");
        let sig = v.sign(BODY).unwrap();
        for i in 0..BODY.len() {
            let mut body = BODY.to_vec();
            body[i] ^= 0x01;
            assert_eq!(
                v.validate(&body, Some(&sig)),
                Err(SignatureError::Mismatch),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn every_signature_char_mutation_fails() {
        let v = SignatureValidator::new("s3cret");
        let sig = v.sign(BODY).unwrap();
        for i in 0..sig.len() {
            for replacement in [b'0', b'f', b'F', b'x'] {
                let mut mutated = sig.clone().into_bytes();
                if mutated[i] == replacement {
                    continue;
                }
                mutated[i] = replacement;
                let mutated = String::from_utf8(mutated).unwrap();
                assert!(
                    v.validate(BODY, Some(&mutated)).is_err(),
                    "mutation at char {i} to {} was accepted",
                    replacement as char
                );
            }
        }
    }

    #[test]
    fn reserialised_json_fails() {
        // Same JSON value, different bytes.
        let v = SignatureValidator::new("s3cret");
        let sig = v.sign(BODY).unwrap();
        let value: serde_json::Value = serde_json::from_slice(BODY).unwrap();
        let pretty = serde_json::to_vec_pretty(&value).unwrap();
        assert_eq!(
            v.validate(&pretty, Some(&sig)),
            Err(SignatureError::Mismatch)
        );
    }
}
