use num::bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bigint::to_block;
use crate::pkcs1;

use super::{Error, Oracle, OracleType, PublicKeyInfo};

/// RSA key used by the reference oracle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "profile", rename_all = "kebab-case")]
pub enum KeyProfile {
    /// Exponent 3 and an arbitrary modulus size, fast enough for tests
    Small { bits: usize },
    /// 1024-bit modulus with the default public exponent
    Standard,
}

impl Default for KeyProfile {
    fn default() -> Self {
        Self::Small { bits: 512 }
    }
}

/// Reference oracle holding the RSA private key
///
/// Decrypts every query and reports whether the result is PKCS#1 conforming
pub struct RsaOracle {
    private_key: irsa::RsaPrivateKey,
    rsa_public_key: irsa::RsaPublicKey,
    public_key: PublicKeyInfo,
    oracle_type: OracleType,
    block_size: usize,
    queries: u64,
}

impl RsaOracle {
    /// Generate a fresh key pair for the given profile
    pub fn generate(profile: KeyProfile, oracle_type: OracleType) -> Result<Self, Error> {
        let (private_key, rsa_public_key) = match profile {
            KeyProfile::Small { bits } => {
                let sk = irsa::RsaPrivateKey::from_exponent_insecure(3, bits).map_err(keygen_err)?;
                let pk = irsa::RsaPublicKey::from_private_key_insecure(&sk);
                (sk, pk)
            }
            KeyProfile::Standard => {
                let sk = irsa::RsaPrivateKey::new(irsa::RSA_1024_LEN).map_err(keygen_err)?;
                let pk = irsa::RsaPublicKey::new(&sk).map_err(keygen_err)?;
                (sk, pk)
            }
        };

        let public_key = PublicKeyInfo::new(rsa_public_key.n.clone(), rsa_public_key.e.clone());
        let block_size = public_key.block_size();

        debug!(bits = public_key.n.bits(), ?oracle_type, "generated RSA oracle key");

        Ok(Self {
            private_key,
            rsa_public_key,
            public_key,
            oracle_type,
            block_size,
            queries: 0,
        })
    }

    /// Raw RSA encryption (no padding) of a block under the oracle's public key
    ///
    /// The ciphertext is left-padded to the block size
    pub fn encrypt(&self, block: &[u8]) -> Result<Vec<u8>, Error> {
        let ciphertext = self
            .rsa_public_key
            .encrypt(block)
            .map_err(|e| Error::Encryption(format!("{:?}", e)))?;
        Ok(to_block(&BigUint::from_bytes_be(&ciphertext), self.block_size))
    }
}

fn keygen_err<E: core::fmt::Debug>(err: E) -> Error {
    Error::KeyGeneration(format!("{:?}", err))
}

impl Oracle for RsaOracle {
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error> {
        self.queries += 1;

        let normalized = BigUint::from_bytes_be(ciphertext).to_bytes_be();
        // a failed decryption is just a non-conforming answer
        let conforming = match self.private_key.decrypt(&normalized) {
            Ok(plain) => pkcs1::is_conforming(&plain, self.oracle_type, self.block_size),
            Err(_) => false,
        };
        trace!(query = self.queries, conforming, "rsa oracle query");

        Ok(conforming)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn number_of_queries(&self) -> u64 {
        self.queries
    }

    fn public_key(&self) -> &PublicKeyInfo {
        &self.public_key
    }

    fn oracle_type(&self) -> OracleType {
        self.oracle_type
    }
}
