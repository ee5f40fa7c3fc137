use std::io;

use num::bigint::BigUint;
use thiserror::Error;

mod command;
mod guard;
mod plaintext;
mod rsa;

pub use command::*;
pub use guard::*;
pub use plaintext::*;
pub use rsa::*;

pub use crate::pkcs1::OracleType;

/// Errors raised while querying an oracle
///
/// Always fatal to the attack that issued the query
#[derive(Debug, Error)]
pub enum Error {
    #[error("oracle transport failed: {0}")]
    Io(#[from] io::Error),
    #[error("oracle command exited with {status:?}: {stderr}")]
    CommandFailed { status: Option<i32>, stderr: String },
    #[error("oracle query limit of {limit} reached")]
    QueryLimit { limit: u64 },
    #[error("oracle aborted")]
    Aborted,
    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),
    #[error("RSA encryption failed: {0}")]
    Encryption(String),
}

/// RSA public key of the oracle's target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub n: BigUint,
    pub e: BigUint,
}

impl PublicKeyInfo {
    pub fn new(n: BigUint, e: BigUint) -> Self {
        Self { n, e }
    }

    /// Byte length of the modulus
    pub fn block_size(&self) -> usize {
        ((self.n.bits() + 7) / 8) as usize
    }
}

/// PKCS#1 v1.5 padding oracle
///
/// Each call to `check_pkcs_conformity` may block for as long as the
/// underlying transport needs, e.g. a full TLS handshake.
pub trait Oracle {
    /// Whether the RSA decryption of `ciphertext` is PKCS#1 conforming
    ///
    /// Increments the query counter exactly once, whatever the outcome
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error>;

    /// Byte length of the modulus
    fn block_size(&self) -> usize {
        self.public_key().block_size()
    }

    /// Total number of queries issued so far
    fn number_of_queries(&self) -> u64;

    fn public_key(&self) -> &PublicKeyInfo;

    /// Plaintext oracles take `m * si mod n` directly instead of `c * si^e mod n`
    fn is_plaintext_oracle(&self) -> bool {
        false
    }

    /// Strictness the oracle is known to enforce, used to tighten the initial interval
    ///
    /// Defaults to `Ttt`, which assumes nothing beyond the 0x00 0x02 prefix
    fn oracle_type(&self) -> OracleType {
        OracleType::Ttt
    }
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error> {
        (**self).check_pkcs_conformity(ciphertext)
    }

    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn number_of_queries(&self) -> u64 {
        (**self).number_of_queries()
    }

    fn public_key(&self) -> &PublicKeyInfo {
        (**self).public_key()
    }

    fn is_plaintext_oracle(&self) -> bool {
        (**self).is_plaintext_oracle()
    }

    fn oracle_type(&self) -> OracleType {
        (**self).oracle_type()
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error> {
        (**self).check_pkcs_conformity(ciphertext)
    }

    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn number_of_queries(&self) -> u64 {
        (**self).number_of_queries()
    }

    fn public_key(&self) -> &PublicKeyInfo {
        (**self).public_key()
    }

    fn is_plaintext_oracle(&self) -> bool {
        (**self).is_plaintext_oracle()
    }

    fn oracle_type(&self) -> OracleType {
        (**self).oracle_type()
    }
}
