//! Single-show HMAC keys derived through a blinded elliptic-curve
//! Diffie-Hellman exchange on P-256.
//!
//! <div class="warning">
//! Security notice: the HSM here is simulated, and this crate has not been
//! independently audited or reviewed. </div>
//!
//! A producer whose private scalar lives in an HSM and a validator with its
//! own key pair arrive at the same symmetric key without either side learning
//! the other's secret. A fresh blind scalar per exchange makes every key
//! single-show: it signs one payload, the validator checks that one signature,
//! and the key is thrown away.
//!
//! The pieces, bottom up:
//! * [curve]: scalars and points on P-256, scalar multiplication and ECDH,
//! * [kdf]: HKDF-SHA-256 extract and expand,
//! * [exchange]: the blinding protocol and its immutable step-by-step state,
//! * [signing]: HMAC-SHA-256 with the derived key,
//! * [encoding]: the `0x`-prefixed hex used for every value on the wire.
//!
//! # Example
//! ```
//! use blinded_key_derivation::{
//!     BlindedExchangeState, KdfParams, ProtocolError, SimulatedHsm, Validator,
//! };
//! use rand_core::OsRng;
//!
//! let hsm = SimulatedHsm::generate(&mut OsRng)?;
//! let validator = Validator::generate(&mut OsRng)?;
//!
//! let state = BlindedExchangeState::new(validator.public_point().clone(), KdfParams::default())
//!     .with_random_blind(&mut OsRng)?
//!     .producer_step(&hsm)?
//!     .validator_step(&validator)?;
//! assert!(state.keys_match()?);
//!
//! let token = br#"{"sub":"device-7"}"#;
//! let signature = state.producer().unwrap().key().sign(token);
//! assert!(state.validator().unwrap().key().verify(token, &signature));
//! # Ok::<(), ProtocolError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub use elliptic_curve;
pub use hkdf;
pub use p256;

mod macros;

pub mod curve;
pub mod encoding;
pub mod exchange;
pub mod kdf;
pub mod signing;

mod error;
mod traits;

pub use curve::{
    decode_point, ecdh, ecdh_shared_secret, encode_point, scalar_mul, scalar_to_public_point,
    KeyPair, Point, Scalar,
};
#[cfg(feature = "std")]
pub use curve::{generate_key_pair, generate_scalar};
pub use encoding::{bytes_to_hex, hex_to_bytes};
pub use error::{ProtocolError, Result};
pub use exchange::{
    blind_generator, blind_validator_key, derive_single_show_key, run_exchange,
    BlindedExchangeState, DerivedKey, ExchangeStage, SimulatedHsm, Validator,
};
pub use kdf::{KdfParams, Okm, Prk};
pub use signing::{hmac_sign, hmac_verify, hmac_verify_hex, SingleShowKey, Tag};
pub use traits::RandomSource;

/// `s*G`.
pub use curve::scalar_to_public_point as public_point;
/// `s*P`.
pub use curve::scalar_mul as scalar_multiply;
/// HKDF extract then expand, returning the PRK and OKM.
pub use kdf::derive as hkdf_derive;
