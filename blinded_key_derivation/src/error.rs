//! The error type returned by this library.
//!
//! Every arithmetic, decoding and derivation failure surfaces as a
//! [ProtocolError]. A signature that fails to verify is *not* an error: the
//! verification functions return `false` for that case, so callers can tell
//! "the computation broke" apart from "the token was not signed with this key".

use crate::exchange::ExchangeStage;

/// A failure of one of the protocol's computations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// The scalar was zero, not less than the group order, or not 32 bytes.
    #[error("the scalar was zero or out of range for the curve")]
    InvalidScalar,
    /// The point was off the curve, or an operation produced the point at
    /// infinity.
    #[error("the point was not a valid curve point")]
    InvalidPoint,
    /// A hex string or byte buffer could not be decoded: a missing `0x`
    /// prefix, a bad digit, the wrong length, or a SEC1 tag other than `0x04`.
    #[error("malformed encoding")]
    MalformedEncoding,
    /// The requested HKDF output was longer than `255 * HashLen` bytes.
    #[error("requested output length exceeds the HKDF limit")]
    InvalidLength,
    /// A step of a [BlindedExchangeState](crate::BlindedExchangeState) was run
    /// before the step that produces its input.
    #[error("the exchange has not reached the {0} stage")]
    StepOutOfOrder(ExchangeStage),
}

/// A `Result` defaulting to [ProtocolError].
pub type Result<T, E = ProtocolError> = core::result::Result<T, E>;

impl From<hkdf::InvalidLength> for ProtocolError {
    fn from(_: hkdf::InvalidLength) -> Self {
        Self::InvalidLength
    }
}

impl From<hex::FromHexError> for ProtocolError {
    fn from(_: hex::FromHexError) -> Self {
        Self::MalformedEncoding
    }
}

impl From<elliptic_curve::Error> for ProtocolError {
    fn from(_: elliptic_curve::Error) -> Self {
        Self::InvalidPoint
    }
}
