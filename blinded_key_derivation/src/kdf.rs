//! HKDF-SHA-256 (RFC 5869): extract a pseudorandom key from input keying
//! material, then expand it into as many output bytes as requested.
//!
//! This is a thin layer over [Hkdf](hkdf::Hkdf) that keeps the intermediate
//! PRK visible, because the exchange displays it alongside the final key.
//!
//! An empty salt is replaced by `HashLen` (32) zero bytes, which is what RFC
//! 5869 prescribes. HMAC pads short keys with zeros up to the block size, so
//! this gives the same PRK as using the empty string as the key. That
//! coincidence holds for SHA-256's HMAC and must be re-checked before the
//! digest is swapped.

use core::fmt;

use hkdf::{
    hmac::digest::{typenum::Unsigned, OutputSizeUser},
    Hkdf,
};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    encoding::bytes_to_hex,
    error::{ProtocolError, Result},
};

/// The digest used inside HKDF and for signing.
pub type KdfDigest = Sha256;

/// Output length of [KdfDigest] in bytes.
pub const HASH_LEN: usize = <KdfDigest as OutputSizeUser>::OutputSize::USIZE;

/// The largest output HKDF can produce: `255 * HashLen`.
pub const MAX_OKM_LEN: usize = 255 * HASH_LEN;

/// Length of the single-show key the exchange derives by default.
pub const DEFAULT_KEY_LEN: usize = 32;

/// Default HKDF `info` for the single-show key.
pub const DEFAULT_INFO: &[u8] = b"blinded-ecdh-hmac-key";

/// A pseudorandom key, the output of [extract].
#[derive(Clone, PartialEq, Eq)]
pub struct Prk([u8; HASH_LEN]);

impl Prk {
    /// Wraps an existing PRK, e.g. one computed elsewhere.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw PRK.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// `0x`-prefixed hex, for display.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }
}

impl fmt::Debug for Prk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Prk(..)")
    }
}

impl Drop for Prk {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl ZeroizeOnDrop for Prk {}

/// Output keying material, the output of [expand].
#[derive(Clone, PartialEq, Eq)]
pub struct Okm(Zeroizing<Vec<u8>>);

impl Okm {
    /// The derived bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of derived bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether zero bytes were requested.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `0x`-prefixed hex, for display.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }
}

impl fmt::Debug for Okm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Okm({} bytes)", self.0.len())
    }
}

/// HKDF-Extract: `PRK = HMAC(salt, ikm)`, with an empty salt meaning
/// 32 zero bytes.
pub fn extract(salt: &[u8], ikm: &[u8]) -> Prk {
    let salt = (!salt.is_empty()).then_some(salt);
    let (prk, _) = Hkdf::<KdfDigest>::extract(salt, ikm);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&prk);
    Prk(out)
}

/// HKDF-Expand: `T(i) = HMAC(prk, T(i-1) || info || i)` for as many blocks as
/// `length` needs, concatenated and truncated to `length` bytes.
///
/// # Errors
/// [InvalidLength](ProtocolError::InvalidLength) if `length` exceeds
/// [MAX_OKM_LEN].
pub fn expand(prk: &Prk, info: &[u8], length: usize) -> Result<Okm> {
    expand_multi_info(prk, &[info], length)
}

/// [expand] with an `info` given as several pieces that are concatenated.
pub fn expand_multi_info(prk: &Prk, info_components: &[&[u8]], length: usize) -> Result<Okm> {
    if length > MAX_OKM_LEN {
        crate::error_log!("requested {length} bytes of HKDF output, limit is {MAX_OKM_LEN}");
        return Err(ProtocolError::InvalidLength);
    }
    let hkdf =
        Hkdf::<KdfDigest>::from_prk(prk.as_bytes()).map_err(|_| ProtocolError::InvalidLength)?;
    let mut okm = Zeroizing::new(vec![0u8; length]);
    hkdf.expand_multi_info(info_components, &mut okm)?;
    Ok(Okm(okm))
}

/// Extract then expand, returning the intermediate PRK as well as the OKM.
///
/// A pure function of its inputs.
pub fn derive(ikm: &[u8], salt: &[u8], info: &[u8], length: usize) -> Result<(Prk, Okm)> {
    let prk = extract(salt, ikm);
    let okm = expand(&prk, info, length)?;
    Ok((prk, okm))
}

/// The salt, info and output length used to turn a shared secret into a
/// single-show key. Producer and validator must use equal parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    salt: Vec<u8>,
    info: Vec<u8>,
    key_len: usize,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt: Vec::new(),
            info: DEFAULT_INFO.to_vec(),
            key_len: DEFAULT_KEY_LEN,
        }
    }
}

impl KdfParams {
    /// Replaces the salt.
    pub fn with_salt(mut self, salt: impl Into<Vec<u8>>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Replaces the info.
    pub fn with_info(mut self, info: impl Into<Vec<u8>>) -> Self {
        self.info = info.into();
        self
    }

    /// Replaces the output length. Lengths above [MAX_OKM_LEN] are rejected
    /// when a key is derived.
    pub fn with_key_len(mut self, key_len: usize) -> Self {
        self.key_len = key_len;
        self
    }

    /// The salt.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The info.
    pub fn info(&self) -> &[u8] {
        &self.info
    }

    /// The output length.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Runs [derive] with these parameters.
    pub fn derive(&self, ikm: &[u8]) -> Result<(Prk, Okm)> {
        derive(ikm, &self.salt, &self.info, self.key_len)
    }
}
