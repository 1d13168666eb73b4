//! Replays the blinded exchange in the terminal, one step at a time.
//!
//! Every public value and, since this is a demonstration, every secret is
//! printed in the same `0x` hex the library uses on the wire.

use std::process::ExitCode;

use blinded_key_derivation::{
    bytes_to_hex, hex_to_bytes, BlindedExchangeState, KdfParams, ProtocolError, Scalar,
    SimulatedHsm, Validator,
};
use clap::Parser;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRngCore, OsRng, SeedableRng};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "blinded-key-walkthrough",
    version,
    about = "Replays a blinded ECDH exchange and the single-show HMAC key it yields"
)]
struct Args {
    /// HKDF salt as 0x-prefixed hex. Empty by default.
    #[arg(long)]
    salt: Option<String>,

    /// HKDF info string.
    #[arg(long, default_value = "blinded-ecdh-hmac-key")]
    info: String,

    /// The payload the producer signs, e.g. a token's signing input.
    #[arg(long, default_value = r#"{"sub":"device-7","scope":"unlock"}"#)]
    payload: String,

    /// Seed a ChaCha20 generator instead of using OS randomness.
    #[arg(long)]
    seed: Option<u64>,

    /// Import this producer scalar into the HSM instead of generating one.
    #[arg(long, value_parser = Scalar::from_hex)]
    producer_scalar: Option<Scalar>,

    /// Use this validator scalar instead of generating one.
    #[arg(long, value_parser = Scalar::from_hex)]
    validator_scalar: Option<Scalar>,

    /// Number of exchanges to run, each with a fresh blind.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    rounds: u32,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn random_source(seed: Option<u64>) -> Box<dyn CryptoRngCore> {
    match seed {
        Some(seed) => {
            warn!(seed, "using a seeded generator, keys are reproducible");
            Box::new(ChaCha20Rng::seed_from_u64(seed))
        }
        None => Box::new(OsRng),
    }
}

/// Runs one exchange, narrating each step. Returns whether both sides
/// derived the same key and the signature verified.
fn round(
    number: u32,
    hsm: &SimulatedHsm,
    validator: &Validator,
    params: &KdfParams,
    payload: &[u8],
    rng: &mut dyn CryptoRngCore,
) -> Result<bool, ProtocolError> {
    info!("round {number}");

    let state = BlindedExchangeState::new(validator.public_point().clone(), params.clone());
    info!(stage = %state.stage(), "V = {}", state.validator_public().to_hex());

    let state = state.with_random_blind(rng)?;
    if let (Some(blind), Some(blinded)) = (state.blind(), state.blinded_validator_key()) {
        info!(stage = %state.stage(), "b = {}", blind.to_hex());
        info!(stage = %state.stage(), "B = b*V = {}", blinded.to_hex());
    }

    let state = state.producer_step(hsm)?;
    if let (Some(producer), Some(d_point)) = (state.producer(), state.blinded_producer_key()) {
        info!(stage = %state.stage(), "S_p = d*B, x = {}", producer.shared_point().x_hex());
        info!(stage = %state.stage(), "PRK_p = {}", producer.prk().to_hex());
        info!(stage = %state.stage(), "K_p = {}", producer.key().to_hex());
        info!(stage = %state.stage(), "D = d*(b*G) = {}", d_point.to_hex());
    }

    let state = state.validator_step(validator)?;
    let matched = state.keys_match()?;
    let (Some(producer), Some(validated)) = (state.producer(), state.validator()) else {
        return Err(ProtocolError::StepOutOfOrder(state.stage()));
    };
    info!(stage = %state.stage(), "S_v = v*D, x = {}", validated.shared_point().x_hex());
    info!(stage = %state.stage(), "K_v = {}", validated.key().to_hex());

    let signature = producer.key().sign(payload);
    let verified = validated.key().verify(payload, &signature);
    info!("HMAC(K_p, payload) = {}", bytes_to_hex(&signature));
    info!(matched, verified, "round {number} done");

    Ok(matched && verified)
}

fn run(args: Args) -> Result<bool, ProtocolError> {
    let mut rng = random_source(args.seed);

    let hsm = match args.producer_scalar {
        Some(scalar) => SimulatedHsm::import(scalar),
        None => SimulatedHsm::generate(&mut *rng)?,
    };
    let validator = match args.validator_scalar {
        Some(scalar) => Validator::import(scalar),
        None => Validator::generate(&mut *rng)?,
    };
    info!("producer public key (held by the HSM) = {}", hsm.public_point().to_hex());
    info!("validator public key = {}", validator.public_point().to_hex());

    let salt = match args.salt.as_deref() {
        Some(hex) => hex_to_bytes(hex)?,
        None => Vec::new(),
    };
    let params = KdfParams::default()
        .with_salt(salt)
        .with_info(args.info);

    let mut all_ok = true;
    for number in 1..=args.rounds {
        all_ok &= round(number, &hsm, &validator, &params, args.payload.as_bytes(), &mut *rng)?;
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    init_logging();
    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("the two sides disagreed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("exchange failed: {e}");
            ExitCode::FAILURE
        }
    }
}
