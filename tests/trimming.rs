use num::bigint::BigUint;
use num::Zero;

use bleichenbacher::bigint::to_block;
use bleichenbacher::oracle::{Oracle, OracleType, QueryLimit};
use bleichenbacher::Bleichenbacher;

mod common;

use common::{modulus_512, plaintext_oracle, to_hex, PLAIN_VALID_PKCS};

// 3^2 * 5 * 7 * 11
const DIVISOR: u32 = 3465;

// the fixture with its payload tail adjusted to a multiple of DIVISOR
fn divisible_target() -> BigUint {
    let m = BigUint::from_bytes_be(PLAIN_VALID_PKCS.as_ref());
    let rem = &m % DIVISOR;
    m - rem
}

#[test]
fn trimmed_interval_contains_target() {
    // a prefix-only oracle answers every fraction exactly
    let mut oracle = plaintext_oracle(modulus_512(), OracleType::Ttt);
    let m = divisible_target();
    let msg = to_block(&m, 64);
    // only the last two payload bytes moved
    assert_eq!(msg[..62], PLAIN_VALID_PKCS[..62]);

    let mut engine = Bleichenbacher::new(&msg, &mut oracle, true).unwrap().with_trimming(101);
    let bounds = engine.bounds().clone();
    let session = engine.blind().unwrap();

    assert!(session.trimmed);
    let trimmed = session.intervals.as_single().unwrap();
    assert!(trimmed.contains(&m));
    assert!(trimmed.width() < bounds.b);
    assert!(trimmed.lower() >= &bounds.two_b);
    assert!(trimmed.upper() <= &bounds.three_b_minus_one);
    assert!((trimmed.lower() % 5_u32).is_zero());
}

#[test]
fn trimmed_attack_recovers_target() {
    let mut oracle = QueryLimit::new(plaintext_oracle(modulus_512(), OracleType::Fft), 5_000_000);
    let msg = to_block(&divisible_target(), 64);

    let recovered = Bleichenbacher::new(&msg, &mut oracle, true)
        .unwrap()
        .with_trimming(1500)
        .attack()
        .unwrap();

    assert_eq!(to_hex(&recovered), to_hex(&msg));
}

#[test]
fn untrimmable_input_still_recovers() {
    let mut oracle = QueryLimit::new(plaintext_oracle(modulus_512(), OracleType::Fft), 5_000_000);

    // no trimmer below 5 can be found, the attack falls back to the plain interval
    let recovered = Bleichenbacher::new(PLAIN_VALID_PKCS.as_ref(), &mut oracle, true)
        .unwrap()
        .with_trimming(4)
        .attack()
        .unwrap();

    assert_eq!(to_hex(&recovered), to_hex(PLAIN_VALID_PKCS.as_ref()));
    assert!(oracle.number_of_queries() < 5_000_000);
}

#[test]
fn strict_oracle_starts_from_its_conforming_range() {
    let mut oracle = plaintext_oracle(modulus_512(), OracleType::Fft);
    let m = BigUint::from_bytes_be(PLAIN_VALID_PKCS.as_ref());

    let mut engine = Bleichenbacher::new(PLAIN_VALID_PKCS.as_ref(), &mut oracle, true)
        .unwrap()
        .with_trimming(4);
    let bounds = engine.bounds().clone();
    let session = engine.blind().unwrap();

    assert!(!session.trimmed);
    assert_eq!(session.intervals, bounds.initial_intervals(OracleType::Fft));
    let initial = session.intervals.as_single().unwrap();
    assert!(initial.lower() > &bounds.two_b);
    assert!(initial.upper() < &bounds.three_b_minus_one);
    assert!(initial.contains(&m));
}
