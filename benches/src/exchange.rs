use blinded_key_derivation::{
    hkdf_derive, hmac_sign, hmac_verify, public_point, run_exchange, scalar_multiply,
    BlindedExchangeState, KdfParams, Scalar, SimulatedHsm, Validator,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

type Benchmarker = Criterion;

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::from_seed([7u8; 32])
}

fn bench_curve(c: &mut Benchmarker) {
    let mut rng = rng();
    let s = Scalar::random(&mut rng).unwrap();
    let p = public_point(&Scalar::random(&mut rng).unwrap());

    let mut group = c.benchmark_group("curve");
    group.bench_function("random_scalar", |b| b.iter(|| Scalar::random(&mut rng).unwrap()));
    group.bench_function("public_point", |b| b.iter(|| public_point(&s)));
    group.bench_function("scalar_multiply", |b| b.iter(|| scalar_multiply(&s, &p).unwrap()));
    group.bench_function("point_from_hex", |b| {
        let hex = p.to_hex();
        b.iter(|| blinded_key_derivation::Point::from_hex(&hex).unwrap())
    });
    group.finish();
}

fn bench_kdf(c: &mut Benchmarker) {
    let mut group = c.benchmark_group("hkdf");
    for len in [32usize, 64, 255 * 32] {
        group.bench_with_input(BenchmarkId::new("derive", len), &len, |b, &len| {
            b.iter(|| hkdf_derive(&[0x42; 32], b"", b"blinded-ecdh-hmac-key", len).unwrap())
        });
    }
    group.finish();
}

fn bench_exchange(c: &mut Benchmarker) {
    let mut rng = rng();
    let hsm = SimulatedHsm::generate(&mut rng).unwrap();
    let validator = Validator::generate(&mut rng).unwrap();
    let params = KdfParams::default();

    let mut group = c.benchmark_group("exchange");
    group.bench_function("full", |b| {
        b.iter(|| run_exchange(&hsm, &validator, params.clone(), &mut rng).unwrap())
    });

    let blinded = BlindedExchangeState::new(validator.public_point().clone(), params.clone())
        .with_random_blind(&mut rng)
        .unwrap();
    group.bench_function("producer_step", |b| b.iter(|| blinded.producer_step(&hsm).unwrap()));

    let produced = blinded.producer_step(&hsm).unwrap();
    group.bench_function("validator_step", |b| {
        b.iter(|| produced.validator_step(&validator).unwrap())
    });
    group.finish();
}

fn bench_signing(c: &mut Benchmarker) {
    let key = [3u8; 32];
    let payload = [0u8; 256];
    let tag = hmac_sign(&key, &payload);

    let mut group = c.benchmark_group("hmac");
    group.bench_function("sign", |b| b.iter(|| hmac_sign(&key, &payload)));
    group.bench_function("verify", |b| b.iter(|| hmac_verify(&key, &payload, &tag)));
    group.finish();
}

criterion_group!(benches, bench_curve, bench_kdf, bench_exchange, bench_signing);
criterion_main!(benches);
