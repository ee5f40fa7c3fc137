use num::bigint::{BigInt, BigUint};
use num::{Integer, One, Zero};

/// Greatest common divisor using the Euclidean algorithm
///
/// gcd(a, 0) == a
pub fn gcd<T: Integer + Clone>(a: T, b: T) -> T {
    let mut a = a;
    let mut b = b;
    while !b.is_zero() {
        let r = a.mod_floor(&b);
        a = b;
        b = r;
    }
    a
}

/// Least common multiple
///
/// Returns zero if either argument is zero, so gcd(a, b) * lcm(a, b) == a * b always holds
pub fn lcm<T: Integer + Clone>(a: T, b: T) -> T {
    if a.is_zero() || b.is_zero() {
        return T::zero();
    }
    let g = gcd(a.clone(), b.clone());
    a / g * b
}

/// Least common multiple of a list, folded pairwise
///
/// Returns None for an empty list
pub fn lcm_all<T: Integer + Clone>(values: &[T]) -> Option<T> {
    let (first, rest) = values.split_first()?;
    Some(rest.iter().fold(first.clone(), |acc, v| lcm(acc, v.clone())))
}

/// Normalize the length of a big-endian byte array to a multiple of the block size
///
/// If `strip_sign_byte` is set and the length is not already a block multiple,
/// a single leading 0x00 (two's-complement sign byte) is dropped first.
/// The result is then left-padded with zeros to the next multiple of `block_size`.
///
/// The represented unsigned value never changes.
pub fn correct_size(bytes: &[u8], block_size: usize, strip_sign_byte: bool) -> Vec<u8> {
    if block_size == 0 {
        return bytes.to_vec();
    }

    let mut res = bytes;
    let mut remainder = res.len() % block_size;

    if strip_sign_byte && remainder > 0 && res[0] == 0x00 {
        res = &res[1..];
        remainder = res.len() % block_size;
    }

    if remainder == 0 {
        return res.to_vec();
    }

    let mut padded = vec![0_u8; block_size - remainder];
    padded.extend_from_slice(res);
    padded
}

/// Encode a big integer as exactly one block (or a block multiple) of big-endian bytes
///
/// Zero encodes to a full block of zeros rather than an empty array
pub fn to_block(value: &BigUint, block_size: usize) -> Vec<u8> {
    let res = correct_size(&value.to_bytes_be(), block_size, true);
    if res.is_empty() {
        vec![0_u8; block_size]
    } else {
        res
    }
}

/// Modular inverse of `a` modulo `n` via the extended Euclidean algorithm
///
/// Returns None when gcd(a, n) != 1
pub fn mod_inverse(a: &BigUint, n: &BigUint) -> Option<BigUint> {
    if n.is_zero() {
        return None;
    }

    let modulus = BigInt::from(n.clone());
    // invariants: old_r == old_s * a (mod n), r == s * a (mod n)
    let mut old_r = BigInt::from(a.mod_floor(n));
    let mut r = modulus.clone();
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let q = old_r.div_floor(&r);

        let next_r = &old_r - &q * &r;
        old_r = core::mem::replace(&mut r, next_r);

        let next_s = &old_s - &q * &s;
        old_s = core::mem::replace(&mut s, next_s);
    }

    if old_r != BigInt::one() {
        return None;
    }

    let (_, inv) = old_s.mod_floor(&modulus).into_parts();
    Some(inv)
}
