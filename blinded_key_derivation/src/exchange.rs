//! The blinded producer/validator exchange.
//!
//! The producer's private scalar `d` lives in a [SimulatedHsm] and is only
//! ever used through its [ecdh](SimulatedHsm::ecdh) method. The validator owns
//! `v` and publishes `V = v*G`. For each single-show key:
//!
//! 1. a fresh blind `b` is drawn and `B = b*V` is computed,
//! 2. the HSM computes `S_p = d*B` and `D = d*(b*G)`,
//! 3. the validator computes `S_v = v*D`,
//! 4. both sides run HKDF over the x-coordinate of their shared point.
//!
//! `S_p = d*b*v*G = v*d*b*G = S_v`, so both sides end up with the same key
//! while the HSM never sees `v` and the validator never sees `d` or `b`.
//!
//! A blind must never be reused across exchanges: a repeated `b` gives the
//! same key twice. This module keeps no session store and cannot detect
//! reuse; drawing a fresh blind per key is the caller's job, which
//! [with_random_blind](BlindedExchangeState::with_random_blind) does.

use core::fmt;

use subtle::ConstantTimeEq;

use crate::{
    curve::{ecdh, scalar_mul, scalar_to_public_point, KeyPair, Point, Scalar},
    debug_log, error_log,
    error::{ProtocolError, Result},
    kdf::{KdfParams, Prk},
    signing::SingleShowKey,
    traits::RandomSource,
};

/// How far a [BlindedExchangeState] has progressed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ExchangeStage {
    /// The validator's public point is known.
    Published,
    /// A blind was drawn and the validator's key was blinded.
    Blinded,
    /// The producer derived its key and the blinded producer point.
    ProducerDerived,
    /// The validator derived its key.
    ValidatorDerived,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Published => "published",
            Self::Blinded => "blinded",
            Self::ProducerDerived => "producer derived",
            Self::ValidatorDerived => "validator derived",
        })
    }
}

/// A shared point and the key one side derived from it.
#[derive(Clone, Debug)]
pub struct DerivedKey {
    shared_point: Point,
    prk: Prk,
    key: SingleShowKey,
}

impl DerivedKey {
    /// The ECDH result the key was derived from.
    pub fn shared_point(&self) -> &Point {
        &self.shared_point
    }

    /// The HKDF pseudorandom key.
    pub fn prk(&self) -> &Prk {
        &self.prk
    }

    /// The single-show key.
    pub fn key(&self) -> &SingleShowKey {
        &self.key
    }
}

/// Runs HKDF over the x-coordinate of `shared`.
pub fn derive_single_show_key(shared: &Point, params: &KdfParams) -> Result<DerivedKey> {
    let (prk, okm) = params.derive(&shared.x())?;
    Ok(DerivedKey {
        shared_point: shared.clone(),
        prk,
        key: SingleShowKey::from_okm(&okm),
    })
}

/// `B = b*V`: the validator's public point masked by the blind.
pub fn blind_validator_key(blind: &Scalar, validator_public: &Point) -> Result<Point> {
    scalar_mul(blind, validator_public)
}

/// `b*G`, the blind's own public point. The HSM multiplies it by `d` to get
/// the `[db]G` point sent to the validator.
pub fn blind_generator(blind: &Scalar) -> Point {
    scalar_to_public_point(blind)
}

/// A stand-in for a hardware security module holding the producer's scalar.
///
/// The scalar can be imported but never read back out; every use goes
/// through [ecdh](SimulatedHsm::ecdh).
pub struct SimulatedHsm {
    key: KeyPair,
}

impl SimulatedHsm {
    /// Generates a new producer key inside the HSM.
    pub fn generate(rng: &mut (impl RandomSource + ?Sized)) -> Result<Self> {
        Ok(Self {
            key: KeyPair::generate(rng)?,
        })
    }

    /// Imports an existing producer scalar.
    pub fn import(scalar: Scalar) -> Self {
        Self {
            key: KeyPair::from_scalar(scalar),
        }
    }

    /// The producer's public point `d*G`.
    pub fn public_point(&self) -> &Point {
        self.key.public()
    }

    /// `d * peer`.
    pub fn ecdh(&self, peer: &Point) -> Result<Point> {
        ecdh(self.key.scalar(), peer)
    }

    /// `S_p = d*B`, then HKDF over its x-coordinate.
    pub fn derive_key(&self, blinded_validator_key: &Point, params: &KdfParams) -> Result<DerivedKey> {
        derive_single_show_key(&self.ecdh(blinded_validator_key)?, params)
    }
}

impl fmt::Debug for SimulatedHsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedHsm")
            .field("public", self.public_point())
            .finish_non_exhaustive()
    }
}

/// The validating side of the exchange.
#[derive(Debug)]
pub struct Validator {
    key: KeyPair,
}

impl Validator {
    /// Generates a new validator key.
    pub fn generate(rng: &mut (impl RandomSource + ?Sized)) -> Result<Self> {
        Ok(Self {
            key: KeyPair::generate(rng)?,
        })
    }

    /// Uses an existing validator scalar.
    pub fn import(scalar: Scalar) -> Self {
        Self {
            key: KeyPair::from_scalar(scalar),
        }
    }

    /// `V = v*G`, the point the validator publishes.
    pub fn public_point(&self) -> &Point {
        self.key.public()
    }

    /// `S_v = v*D`, then HKDF over its x-coordinate.
    pub fn derive_key(&self, blinded_producer_key: &Point, params: &KdfParams) -> Result<DerivedKey> {
        derive_single_show_key(&ecdh(self.key.scalar(), blinded_producer_key)?, params)
    }
}

/// Every artifact of one exchange, as an immutable value.
///
/// Each step borrows the current state and returns the next one, leaving the
/// input untouched, so a caller can keep any earlier state around to show or
/// to replay from. Dropping the value resets the exchange.
///
/// # Examples
/// ```rust
/// # use blinded_key_derivation::{BlindedExchangeState, KdfParams, ProtocolError, SimulatedHsm, Validator};
/// # use rand_core::OsRng;
/// # let hsm = SimulatedHsm::generate(&mut OsRng)?;
/// # let validator = Validator::generate(&mut OsRng)?;
/// let state = BlindedExchangeState::new(validator.public_point().clone(), KdfParams::default())
///     .with_random_blind(&mut OsRng)?
///     .producer_step(&hsm)?
///     .validator_step(&validator)?;
/// assert!(state.keys_match()?);
/// # Ok::<(), ProtocolError>(())
/// ```
#[derive(Clone, Debug)]
pub struct BlindedExchangeState {
    params: KdfParams,
    validator_public: Point,
    blind: Option<Scalar>,
    blinded_validator_key: Option<Point>,
    producer_public: Option<Point>,
    producer: Option<DerivedKey>,
    blinded_producer_key: Option<Point>,
    validator: Option<DerivedKey>,
}

impl BlindedExchangeState {
    /// Starts an exchange from the validator's published point.
    ///
    /// Both sides derive with `params`.
    pub fn new(validator_public: Point, params: KdfParams) -> Self {
        debug_log!("exchange published, V = {}", validator_public.to_hex());
        Self {
            params,
            validator_public,
            blind: None,
            blinded_validator_key: None,
            producer_public: None,
            producer: None,
            blinded_producer_key: None,
            validator: None,
        }
    }

    /// Blinds the validator's point with `blind`, discarding anything derived
    /// under a previous blind.
    ///
    /// Passing a blind that was already used repeats that exchange's key.
    pub fn with_blind(&self, blind: Scalar) -> Result<Self> {
        let blinded = blind_validator_key(&blind, &self.validator_public).map_err(|e| {
            error_log!("blinding the validator key failed: {e}");
            e
        })?;
        debug_log!("exchange blinded, B = {}", blinded.to_hex());
        Ok(Self {
            params: self.params.clone(),
            validator_public: self.validator_public.clone(),
            blind: Some(blind),
            blinded_validator_key: Some(blinded),
            producer_public: None,
            producer: None,
            blinded_producer_key: None,
            validator: None,
        })
    }

    /// [with_blind](Self::with_blind) using a blind freshly drawn from `rng`.
    pub fn with_random_blind(&self, rng: &mut (impl RandomSource + ?Sized)) -> Result<Self> {
        self.with_blind(Scalar::random(rng)?)
    }

    /// The producer's half: `S_p = d*B`, its key, and `D = d*(b*G)`.
    ///
    /// # Errors
    /// [StepOutOfOrder](ProtocolError::StepOutOfOrder) if no blind has been
    /// drawn yet; arithmetic errors from the HSM otherwise.
    pub fn producer_step(&self, hsm: &SimulatedHsm) -> Result<Self> {
        let (Some(blind), Some(blinded_validator_key)) =
            (self.blind.as_ref(), self.blinded_validator_key.as_ref())
        else {
            error_log!("producer step attempted before blinding");
            return Err(ProtocolError::StepOutOfOrder(ExchangeStage::Blinded));
        };

        let producer = hsm.derive_key(blinded_validator_key, &self.params).map_err(|e| {
            error_log!("producer key derivation failed: {e}");
            e
        })?;
        let blinded_producer_key = hsm.ecdh(&blind_generator(blind)).map_err(|e| {
            error_log!("computing [db]G failed: {e}");
            e
        })?;
        debug_log!("producer derived, D = {}", blinded_producer_key.to_hex());

        Ok(Self {
            producer_public: Some(hsm.public_point().clone()),
            producer: Some(producer),
            blinded_producer_key: Some(blinded_producer_key),
            validator: None,
            ..self.clone()
        })
    }

    /// The validator's half: `S_v = v*D` and its key.
    ///
    /// # Errors
    /// [StepOutOfOrder](ProtocolError::StepOutOfOrder) if the producer step
    /// has not run; arithmetic errors otherwise.
    pub fn validator_step(&self, validator: &Validator) -> Result<Self> {
        let Some(blinded_producer_key) = self.blinded_producer_key.as_ref() else {
            error_log!("validator step attempted before the producer step");
            return Err(ProtocolError::StepOutOfOrder(ExchangeStage::ProducerDerived));
        };

        let derived = validator.derive_key(blinded_producer_key, &self.params).map_err(|e| {
            error_log!("validator key derivation failed: {e}");
            e
        })?;
        debug_log!("validator derived");

        Ok(Self {
            validator: Some(derived),
            ..self.clone()
        })
    }

    /// Whether both sides derived the same key, compared in constant time.
    ///
    /// # Errors
    /// [StepOutOfOrder](ProtocolError::StepOutOfOrder) until the validator
    /// step has run.
    pub fn keys_match(&self) -> Result<bool> {
        match (self.producer.as_ref(), self.validator.as_ref()) {
            (Some(producer), Some(validator)) => Ok(producer.key.ct_eq(&validator.key).into()),
            _ => Err(ProtocolError::StepOutOfOrder(ExchangeStage::ValidatorDerived)),
        }
    }

    /// How far the exchange has progressed.
    pub fn stage(&self) -> ExchangeStage {
        if self.validator.is_some() {
            ExchangeStage::ValidatorDerived
        } else if self.producer.is_some() {
            ExchangeStage::ProducerDerived
        } else if self.blind.is_some() {
            ExchangeStage::Blinded
        } else {
            ExchangeStage::Published
        }
    }

    /// The HKDF parameters both sides use.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// `V`.
    pub fn validator_public(&self) -> &Point {
        &self.validator_public
    }

    /// `b`.
    pub fn blind(&self) -> Option<&Scalar> {
        self.blind.as_ref()
    }

    /// `B = b*V`.
    pub fn blinded_validator_key(&self) -> Option<&Point> {
        self.blinded_validator_key.as_ref()
    }

    /// `d*G`, recorded by the producer step.
    pub fn producer_public(&self) -> Option<&Point> {
        self.producer_public.as_ref()
    }

    /// `S_p`, its PRK and `K_p`.
    pub fn producer(&self) -> Option<&DerivedKey> {
        self.producer.as_ref()
    }

    /// `D = d*b*G`.
    pub fn blinded_producer_key(&self) -> Option<&Point> {
        self.blinded_producer_key.as_ref()
    }

    /// `S_v`, its PRK and `K_v`.
    pub fn validator(&self) -> Option<&DerivedKey> {
        self.validator.as_ref()
    }
}

/// Runs every step of one exchange with a fresh blind from `rng`.
pub fn run_exchange(
    hsm: &SimulatedHsm,
    validator: &Validator,
    params: KdfParams,
    rng: &mut (impl RandomSource + ?Sized),
) -> Result<BlindedExchangeState> {
    BlindedExchangeState::new(validator.public_point().clone(), params)
        .with_random_blind(rng)?
        .producer_step(hsm)?
        .validator_step(validator)
}
