//! HMAC-SHA-256 signing and verification with a derived single-show key.
//!
//! The signature is computed over whatever bytes the caller passes in; the
//! envelope those bytes travel in (a compact token, a header and claims) is
//! not this module's concern.

use core::fmt;

use hkdf::hmac::{Hmac, Mac};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    encoding::{bytes_to_hex, hex_to_bytes},
    error::Result,
    kdf::{KdfDigest, Okm, HASH_LEN},
};

type HmacSha256 = Hmac<KdfDigest>;

/// An HMAC-SHA-256 tag.
pub type Tag = [u8; HASH_LEN];

/// A symmetric key meant to sign and verify exactly one payload.
///
/// Producer and validator each derive one independently; the exchange
/// succeeded when the two compare equal.
#[derive(Clone)]
pub struct SingleShowKey(Zeroizing<Vec<u8>>);

impl SingleShowKey {
    /// Takes the bytes of an HKDF output as the key.
    pub fn from_okm(okm: &Okm) -> Self {
        Self(Zeroizing::new(okm.as_bytes().to_vec()))
    }

    /// Uses raw bytes as the key.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }

    /// The key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `0x`-prefixed hex, for display.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    /// `HMAC(key, payload)`.
    pub fn sign(&self, payload: &[u8]) -> Tag {
        hmac_sign(&self.0, payload)
    }

    /// Checks a tag in constant time.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        hmac_verify(&self.0, payload, signature)
    }
}

impl ConstantTimeEq for SingleShowKey {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.as_slice().ct_eq(other.0.as_slice())
    }
}

impl PartialEq for SingleShowKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SingleShowKey {}

impl fmt::Debug for SingleShowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SingleShowKey(..)")
    }
}

fn keyed_mac(key: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// `HMAC-SHA-256(key, payload)`.
pub fn hmac_sign(key: &[u8], payload: &[u8]) -> Tag {
    let mut mac = keyed_mac(key);
    mac.update(payload);
    let mut tag = [0u8; HASH_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Recomputes the HMAC of `payload` and compares it to `signature` in
/// constant time.
///
/// A wrong tag, including one of the wrong length, gives `false`.
pub fn hmac_verify(key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
    let mut mac = keyed_mac(key);
    mac.update(payload);
    mac.verify_slice(signature).is_ok()
}

/// [hmac_verify] for a signature in `0x`-prefixed hex.
///
/// # Errors
/// [MalformedEncoding](crate::ProtocolError::MalformedEncoding) if the
/// signature is not valid hex. That is reported separately from `Ok(false)`,
/// which means the signature decoded but does not match.
pub fn hmac_verify_hex(key: &[u8], payload: &[u8], signature: &str) -> Result<bool> {
    let signature = hex_to_bytes(signature)?;
    Ok(hmac_verify(key, payload, &signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;
    use hex_literal::hex;

    #[test]
    fn rfc4231_case_2() {
        assert_eq!(
            hmac_sign(b"Jefe", b"what do ya want for nothing?"),
            hex!("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
        );
    }

    #[test]
    fn sign_then_verify() {
        let key = SingleShowKey::from_bytes(&[7u8; 32]);
        let payload = br#"{"sub":"validator","nonce":1}"#;
        let tag = key.sign(payload);
        assert!(key.verify(payload, &tag));
        assert!(!key.verify(b"another payload", &tag));
        assert!(!SingleShowKey::from_bytes(&[8u8; 32]).verify(payload, &tag));
    }

    #[test]
    fn every_flipped_byte_fails() {
        let key = [3u8; 32];
        let tag = hmac_sign(&key, b"payload");
        for i in 0..tag.len() {
            let mut tampered = tag;
            tampered[i] ^= 0x01;
            assert!(!hmac_verify(&key, b"payload", &tampered));
        }
        assert!(!hmac_verify(&key, b"payload", &tag[..31]));
        assert!(!hmac_verify(&key, b"payload", &[]));
    }

    #[test]
    fn hex_signatures() {
        let key = [3u8; 32];
        let tag = hmac_sign(&key, b"payload");
        assert_eq!(
            hmac_verify_hex(&key, b"payload", &bytes_to_hex(&tag)),
            Ok(true)
        );
        assert_eq!(
            hmac_verify_hex(&key, b"payload", &bytes_to_hex(&[0u8; 32])),
            Ok(false)
        );
        assert_eq!(
            hmac_verify_hex(&key, b"payload", "not hex"),
            Err(ProtocolError::MalformedEncoding)
        );
    }

    #[test]
    fn key_comparison_and_debug() {
        let a = SingleShowKey::from_bytes(&[1u8; 32]);
        assert_eq!(a, SingleShowKey::from_bytes(&[1u8; 32]));
        assert_ne!(a, SingleShowKey::from_bytes(&[2u8; 32]));
        assert_ne!(a, SingleShowKey::from_bytes(&[1u8; 16]));
        assert_eq!(format!("{a:?}"), "SingleShowKey(..)");
    }
}
