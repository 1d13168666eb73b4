//! Scalar and point arithmetic on NIST P-256.
//!
//! Scalars are always in `[1, n-1]` and points are never the identity; both
//! invariants are checked when a value is constructed, so the arithmetic
//! below only has to reject results, never inputs.
//!
//! The protocol in [exchange](crate::exchange) relies on scalar
//! multiplication commuting: `d * (b * V) == b * (d * V) == (d * b) * V`.

use core::fmt;

use elliptic_curve::{
    ecdh::diffie_hellman,
    ff::PrimeField,
    group::Group,
    sec1::ToEncodedPoint,
};
use p256::{FieldBytes, NonZeroScalar, ProjectivePoint, PublicKey};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    encoding::{bytes_to_hex, hex_to_be32, hex_to_bytes},
    error::{ProtocolError, Result},
    traits::RandomSource,
};

/// Length of a big-endian scalar.
pub const SCALAR_LEN: usize = 32;
/// Length of one big-endian affine coordinate.
pub const COORDINATE_LEN: usize = 32;
/// Length of an uncompressed SEC1 point: the tag byte followed by `x || y`.
pub const ENCODED_POINT_LEN: usize = 1 + 2 * COORDINATE_LEN;
/// SEC1 tag of an uncompressed point.
pub const UNCOMPRESSED_TAG: u8 = 0x04;

/// Out-of-range draws happen with probability below 2^-32 on P-256, so a
/// source that keeps producing them is broken rather than unlucky.
const MAX_SAMPLING_ATTEMPTS: usize = 64;

/// A nonzero scalar modulo the P-256 group order `n`.
///
/// Used both as a private key and as a blinding factor. The value is erased
/// when dropped.
#[derive(Clone)]
pub struct Scalar(NonZeroScalar);

impl Scalar {
    /// Reads a 32-byte big-endian scalar.
    ///
    /// # Errors
    /// [InvalidScalar](ProtocolError::InvalidScalar) if `bytes` is not 32
    /// bytes long, is zero, or is not less than `n`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SCALAR_LEN {
            return Err(ProtocolError::InvalidScalar);
        }
        let mut repr = FieldBytes::clone_from_slice(bytes);
        let scalar = Option::<NonZeroScalar>::from(NonZeroScalar::from_repr(repr));
        repr.as_mut_slice().zeroize();
        scalar.map(Self).ok_or(ProtocolError::InvalidScalar)
    }

    /// Reads a `0x`-prefixed hex scalar. Values shorter than 32 bytes are
    /// left-padded, so `"0x03"` is the scalar three.
    ///
    /// # Errors
    /// [MalformedEncoding](ProtocolError::MalformedEncoding) for bad hex,
    /// [InvalidScalar](ProtocolError::InvalidScalar) for zero or `>= n`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = Zeroizing::new(hex_to_be32(s)?);
        Self::from_bytes(&bytes[..])
    }

    /// Draws a uniformly random scalar in `[1, n-1]`.
    ///
    /// 32 bytes are read from `rng` and the draw is discarded and repeated
    /// whenever it is zero or not less than `n`.
    ///
    /// # Errors
    /// [InvalidScalar](ProtocolError::InvalidScalar) if `rng` produced
    /// nothing but out-of-range values for 64 consecutive draws.
    pub fn random(rng: &mut (impl RandomSource + ?Sized)) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; SCALAR_LEN]);
        for _ in 0..MAX_SAMPLING_ATTEMPTS {
            rng.fill_random(&mut bytes[..]);
            if let Ok(scalar) = Self::from_bytes(&bytes[..]) {
                return Ok(scalar);
            }
        }
        crate::error_log!("random source produced {MAX_SAMPLING_ATTEMPTS} out-of-range scalars");
        Err(ProtocolError::InvalidScalar)
    }

    /// The big-endian encoding.
    pub fn to_bytes(&self) -> Zeroizing<[u8; SCALAR_LEN]> {
        let mut repr = self.0.to_repr();
        let mut out = Zeroizing::new([0u8; SCALAR_LEN]);
        out.copy_from_slice(&repr);
        repr.as_mut_slice().zeroize();
        out
    }

    /// `0x` followed by 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.to_bytes()[..])
    }

    /// Multiplies two scalars modulo `n`.
    ///
    /// The product of two nonzero scalars modulo a prime is nonzero, so this
    /// only fails if that arithmetic invariant is somehow broken.
    pub fn mul(&self, other: &Scalar) -> Result<Scalar> {
        let product = *self.0 * *other.0;
        Option::<NonZeroScalar>::from(NonZeroScalar::new(product))
            .map(Self)
            .ok_or(ProtocolError::InvalidScalar)
    }

    pub(crate) fn as_nonzero(&self) -> &NonZeroScalar {
        &self.0
    }
}

impl ConstantTimeEq for Scalar {
    fn ct_eq(&self, other: &Self) -> Choice {
        (*self.0).ct_eq(&*other.0)
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Scalar {}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Scalar(..)")
    }
}

impl Drop for Scalar {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl ZeroizeOnDrop for Scalar {}

/// A P-256 point other than the identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Point(PublicKey);

impl Point {
    /// The curve's base point `G`.
    pub fn generator() -> Self {
        Self::from_projective(ProjectivePoint::generator())
            .expect("the generator is not the identity")
    }

    fn from_projective(point: ProjectivePoint) -> Result<Self> {
        // `from_affine` refuses the identity
        PublicKey::from_affine(point.to_affine())
            .map(Self)
            .map_err(|_| ProtocolError::InvalidPoint)
    }

    /// Builds a point from big-endian affine coordinates.
    ///
    /// # Errors
    /// [InvalidPoint](ProtocolError::InvalidPoint) if `(x, y)` does not
    /// satisfy the curve equation.
    pub fn from_coordinates(x: &[u8; COORDINATE_LEN], y: &[u8; COORDINATE_LEN]) -> Result<Self> {
        let mut encoded = [0u8; ENCODED_POINT_LEN];
        encoded[0] = UNCOMPRESSED_TAG;
        encoded[1..1 + COORDINATE_LEN].copy_from_slice(x);
        encoded[1 + COORDINATE_LEN..].copy_from_slice(y);
        Ok(Self(PublicKey::from_sec1_bytes(&encoded)?))
    }

    /// Builds a point from `0x`-prefixed hex coordinates.
    pub fn from_hex_coordinates(x: &str, y: &str) -> Result<Self> {
        Self::from_coordinates(&hex_to_be32(x)?, &hex_to_be32(y)?)
    }

    /// Decodes a 65-byte uncompressed SEC1 point.
    ///
    /// # Errors
    /// [MalformedEncoding](ProtocolError::MalformedEncoding) if the length is
    /// not 65, the tag is not `0x04`, or the coordinates are not on the curve.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENCODED_POINT_LEN || bytes[0] != UNCOMPRESSED_TAG {
            return Err(ProtocolError::MalformedEncoding);
        }
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| ProtocolError::MalformedEncoding)
    }

    /// Decodes `0x04...` hex, see [from_encoded](Point::from_encoded).
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_encoded(&hex_to_bytes(s)?)
    }

    /// The 65-byte uncompressed SEC1 encoding `0x04 || x || y`.
    pub fn to_encoded(&self) -> [u8; ENCODED_POINT_LEN] {
        let encoded = self.0.to_encoded_point(false);
        let mut out = [0u8; ENCODED_POINT_LEN];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Hex of [to_encoded](Point::to_encoded).
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.to_encoded())
    }

    /// The big-endian x-coordinate.
    pub fn x(&self) -> [u8; COORDINATE_LEN] {
        let mut out = [0u8; COORDINATE_LEN];
        out.copy_from_slice(&self.to_encoded()[1..1 + COORDINATE_LEN]);
        out
    }

    /// The big-endian y-coordinate.
    pub fn y(&self) -> [u8; COORDINATE_LEN] {
        let mut out = [0u8; COORDINATE_LEN];
        out.copy_from_slice(&self.to_encoded()[1 + COORDINATE_LEN..]);
        out
    }

    /// Hex of the x-coordinate, zero-padded to 32 bytes.
    pub fn x_hex(&self) -> String {
        bytes_to_hex(&self.x())
    }

    /// Hex of the y-coordinate, zero-padded to 32 bytes.
    pub fn y_hex(&self) -> String {
        bytes_to_hex(&self.y())
    }

    /// Computes `scalar * self`.
    pub fn mul(&self, scalar: &Scalar) -> Result<Point> {
        Self::from_projective(self.0.to_projective() * *scalar.0)
    }

    pub(crate) fn as_public_key(&self) -> &PublicKey {
        &self.0
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Point").field(&self.to_hex()).finish()
    }
}

/// A scalar together with its public point `scalar * G`.
///
/// The point is computed once, from the scalar, when the pair is built.
#[derive(Clone, Debug)]
pub struct KeyPair {
    scalar: Scalar,
    public: Point,
}

impl KeyPair {
    /// Uses a caller-chosen scalar as the private key.
    pub fn from_scalar(scalar: Scalar) -> Self {
        let public = scalar_to_public_point(&scalar);
        Self { scalar, public }
    }

    /// Generates a fresh key pair from `rng`.
    pub fn generate(rng: &mut (impl RandomSource + ?Sized)) -> Result<Self> {
        Ok(Self::from_scalar(Scalar::random(rng)?))
    }

    /// The private scalar.
    pub fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// The public point.
    pub fn public(&self) -> &Point {
        &self.public
    }
}

/// Draws a scalar from the operating system's CSPRNG.
#[cfg(feature = "std")]
pub fn generate_scalar() -> Result<Scalar> {
    Scalar::random(&mut rand_core::OsRng)
}

/// Generates a key pair from the operating system's CSPRNG.
#[cfg(feature = "std")]
pub fn generate_key_pair() -> Result<KeyPair> {
    KeyPair::generate(&mut rand_core::OsRng)
}

/// Computes `s * G`.
///
/// A zero scalar cannot reach this function: [Scalar] construction rejects it
/// with [InvalidScalar](ProtocolError::InvalidScalar).
pub fn scalar_to_public_point(s: &Scalar) -> Point {
    Point(PublicKey::from_secret_scalar(&s.0))
}

/// Computes `s * p`.
///
/// # Errors
/// [InvalidPoint](ProtocolError::InvalidPoint) if the product is the identity.
pub fn scalar_mul(s: &Scalar, p: &Point) -> Result<Point> {
    p.mul(s)
}

/// Elliptic-curve Diffie-Hellman: the shared point `private * peer`.
///
/// The same computation as [scalar_mul], named for its role in the protocol.
pub fn ecdh(private: &Scalar, peer: &Point) -> Result<Point> {
    scalar_mul(private, peer)
}

/// The raw ECDH shared secret, the x-coordinate of [ecdh]'s result, computed
/// through `elliptic_curve`'s `diffie_hellman`.
pub fn ecdh_shared_secret(private: &Scalar, peer: &Point) -> Zeroizing<[u8; COORDINATE_LEN]> {
    let shared = diffie_hellman(private.as_nonzero(), peer.as_public_key().as_affine());
    let mut out = Zeroizing::new([0u8; COORDINATE_LEN]);
    out.copy_from_slice(shared.raw_secret_bytes());
    out
}

/// Uncompressed SEC1 encoding of `p`.
pub fn encode_point(p: &Point) -> [u8; ENCODED_POINT_LEN] {
    p.to_encoded()
}

/// Decodes an uncompressed SEC1 point, see [Point::from_encoded].
pub fn decode_point(bytes: &[u8]) -> Result<Point> {
    Point::from_encoded(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand::{rngs::StdRng, SeedableRng};

    /// Using a seeded RNG to prevent chanced errors
    macro_rules! rng {
        () => {
            StdRng::from_seed([15u8; 32])
        };
    }

    const ORDER: [u8; 32] =
        hex!("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551");
    const GX: [u8; 32] = hex!("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296");
    const GY: [u8; 32] = hex!("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5");

    fn small(n: u8) -> Scalar {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        Scalar::from_bytes(&bytes).unwrap()
    }

    /// Always yields zero, which is never a valid scalar.
    struct ZeroRng;

    impl rand_core::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0)
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    impl rand_core::CryptoRng for ZeroRng {}

    mod scalars {
        use super::*;

        #[test]
        fn range_checks() {
            assert_eq!(
                Scalar::from_bytes(&[0u8; 32]).unwrap_err(),
                ProtocolError::InvalidScalar
            );
            assert_eq!(
                Scalar::from_bytes(&ORDER).unwrap_err(),
                ProtocolError::InvalidScalar
            );
            assert_eq!(
                Scalar::from_bytes(&[0xff; 32]).unwrap_err(),
                ProtocolError::InvalidScalar
            );
            assert_eq!(
                Scalar::from_bytes(&[1u8; 31]).unwrap_err(),
                ProtocolError::InvalidScalar
            );

            let mut n_minus_one = ORDER;
            n_minus_one[31] -= 1;
            assert!(Scalar::from_bytes(&n_minus_one).is_ok());
        }

        #[test]
        fn hex_forms() {
            assert_eq!(Scalar::from_hex("0x03").unwrap(), small(3));
            assert_eq!(
                small(3).to_hex(),
                "0x0000000000000000000000000000000000000000000000000000000000000003"
            );
            assert_eq!(
                Scalar::from_hex("0x00").unwrap_err(),
                ProtocolError::InvalidScalar
            );
            assert_eq!(
                Scalar::from_hex("03").unwrap_err(),
                ProtocolError::MalformedEncoding
            );
        }

        #[test]
        fn random_scalars_differ() {
            let mut rng = rng!();
            let a = Scalar::random(&mut rng).unwrap();
            let b = Scalar::random(&mut rng).unwrap();
            assert_ne!(a, b);
            assert_eq!(Scalar::from_bytes(&a.to_bytes()[..]).unwrap(), a);
        }

        #[test]
        fn broken_source_is_reported() {
            assert_eq!(
                Scalar::random(&mut ZeroRng).unwrap_err(),
                ProtocolError::InvalidScalar
            );
        }

        #[test]
        fn multiplication_is_mod_n() {
            assert_eq!(small(2).mul(&small(3)).unwrap(), small(6));

            // (n - 1)^2 = 1 mod n
            let mut n_minus_one = ORDER;
            n_minus_one[31] -= 1;
            let minus_one = Scalar::from_bytes(&n_minus_one).unwrap();
            assert_eq!(minus_one.mul(&minus_one).unwrap(), small(1));
        }

        #[test]
        fn debug_is_redacted() {
            assert_eq!(format!("{:?}", small(9)), "Scalar(..)");
        }
    }

    mod points {
        use super::*;

        #[test]
        fn generator_coordinates() {
            let g = Point::generator();
            assert_eq!(g.x(), GX);
            assert_eq!(g.y(), GY);
            assert_eq!(scalar_to_public_point(&small(1)), g);
        }

        #[test]
        fn doubling_vector() {
            let two_g = scalar_to_public_point(&small(2));
            assert_eq!(
                two_g.x(),
                hex!("7cf27b188d034f7e8a52380304b51ac3c08969e277f21b35a60b48fc47669978")
            );
            assert_eq!(
                two_g.y(),
                hex!("07775510db8ed040293d9ac69f7430dbba7dade63ce982299e04b79d227873d1")
            );
        }

        #[test]
        fn encoding_round_trip() {
            let mut rng = rng!();
            for _ in 0..32 {
                let p = scalar_to_public_point(&Scalar::random(&mut rng).unwrap());
                let encoded = encode_point(&p);
                assert_eq!(encoded.len(), ENCODED_POINT_LEN);
                assert_eq!(encoded[0], UNCOMPRESSED_TAG);
                assert_eq!(decode_point(&encoded).unwrap(), p);
                assert_eq!(Point::from_hex(&p.to_hex()).unwrap(), p);
                assert_eq!(
                    Point::from_hex_coordinates(&p.x_hex(), &p.y_hex()).unwrap(),
                    p
                );
            }
        }

        #[test]
        fn malformed_encodings() {
            let encoded = encode_point(&Point::generator());

            assert_eq!(
                decode_point(&encoded[..64]).unwrap_err(),
                ProtocolError::MalformedEncoding
            );

            let mut wrong_tag = encoded;
            wrong_tag[0] = 0x02;
            assert_eq!(
                decode_point(&wrong_tag).unwrap_err(),
                ProtocolError::MalformedEncoding
            );

            let mut off_curve = encoded;
            off_curve[64] ^= 1;
            assert_eq!(
                decode_point(&off_curve).unwrap_err(),
                ProtocolError::MalformedEncoding
            );

            assert_eq!(
                decode_point(&[0u8]).unwrap_err(),
                ProtocolError::MalformedEncoding
            );
        }

        #[test]
        fn identity_is_rejected() {
            assert_eq!(
                Point::from_projective(ProjectivePoint::IDENTITY).unwrap_err(),
                ProtocolError::InvalidPoint
            );
            // n * G lands on the identity
            let g = ProjectivePoint::generator();
            let n_minus_one = Scalar::from_hex(
                "0xffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632550",
            )
            .unwrap();
            assert_eq!(
                Point::from_projective(g * **n_minus_one.as_nonzero() + g).unwrap_err(),
                ProtocolError::InvalidPoint
            );
        }

        #[test]
        fn off_curve_coordinates() {
            let mut y = GY;
            y[0] ^= 0x80;
            assert_eq!(
                Point::from_coordinates(&GX, &y).unwrap_err(),
                ProtocolError::InvalidPoint
            );
        }

        #[test]
        fn multiplication_commutes() {
            let mut rng = rng!();
            for _ in 0..16 {
                let d = Scalar::random(&mut rng).unwrap();
                let b = Scalar::random(&mut rng).unwrap();
                let v = KeyPair::generate(&mut rng).unwrap();
                let big_v = v.public();

                let d_b_v = scalar_mul(&d, &scalar_mul(&b, big_v).unwrap()).unwrap();
                let b_d_v = scalar_mul(&b, &scalar_mul(&d, big_v).unwrap()).unwrap();
                let db_v = scalar_mul(&d.mul(&b).unwrap(), big_v).unwrap();

                assert_eq!(d_b_v, b_d_v);
                assert_eq!(d_b_v, db_v);
            }
        }

        #[test]
        fn ecdh_matches_diffie_hellman() {
            let mut rng = rng!();
            let alice = KeyPair::generate(&mut rng).unwrap();
            let bob = KeyPair::generate(&mut rng).unwrap();

            let alice_shared = ecdh(alice.scalar(), bob.public()).unwrap();
            let bob_shared = ecdh(bob.scalar(), alice.public()).unwrap();
            assert_eq!(alice_shared, bob_shared);
            assert_eq!(
                *ecdh_shared_secret(alice.scalar(), bob.public()),
                alice_shared.x()
            );
        }

        #[test]
        fn key_pair_from_explicit_scalar() {
            let pair = KeyPair::from_scalar(small(2));
            assert_eq!(pair.scalar(), &small(2));
            assert_eq!(pair.public(), &scalar_to_public_point(&small(2)));
        }
    }
}
