use num::bigint::BigUint;
use num::One;

use bleichenbacher::oracle::{OracleType, PlaintextOracle, PublicKeyInfo};

/// PKCS#1 v1.5 block for a 512-bit modulus wrapping a TLS 1.0 premaster secret
#[allow(dead_code)]
pub const PLAIN_VALID_PKCS: [u8; 64] = [
    0x00, 0x02, 0x01, 0x01, 0xc0, 0xff, 0xee, 0xba, 0xbe, 0xc0, 0xff, 0xee, 0xba, 0xbe, 0xc0, 0x00,
    0x03, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e,
    0x1f, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x2b, 0x2c, 0x2d, 0x2e,
];

#[allow(dead_code)]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|x| format!("{:02x}", x)).collect()
}

/// 2^512 - 569, the largest 512-bit prime
#[allow(dead_code)]
pub fn modulus_512() -> BigUint {
    (BigUint::one() << 512_usize) - 569_u32
}

/// 2^255 - 19
#[allow(dead_code)]
pub fn modulus_255() -> BigUint {
    (BigUint::one() << 255_usize) - 19_u32
}

#[allow(dead_code)]
pub fn plaintext_oracle(n: BigUint, oracle_type: OracleType) -> PlaintextOracle {
    PlaintextOracle::new(PublicKeyInfo::new(n, BigUint::from(65537_u32)), oracle_type)
}
