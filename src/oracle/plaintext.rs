use num::bigint::BigUint;
use tracing::trace;

use crate::pkcs1;

use super::{Error, Oracle, OracleType, PublicKeyInfo};

/// Test oracle that checks the multiplied plaintext directly
///
/// The "ciphertext" handed to the attack is the plaintext block itself, and
/// every query is `m * si mod n`, so no RSA operation is needed.
pub struct PlaintextOracle {
    public_key: PublicKeyInfo,
    oracle_type: OracleType,
    block_size: usize,
    queries: u64,
}

impl PlaintextOracle {
    /// Create a new plaintext oracle for the public key
    pub fn new(public_key: PublicKeyInfo, oracle_type: OracleType) -> Self {
        let block_size = public_key.block_size();
        Self {
            public_key,
            oracle_type,
            block_size,
            queries: 0,
        }
    }
}

impl Oracle for PlaintextOracle {
    fn check_pkcs_conformity(&mut self, msg: &[u8]) -> Result<bool, Error> {
        self.queries += 1;

        // normalize to a minimal big-endian encoding before padding to the block
        let value = BigUint::from_bytes_be(msg).to_bytes_be();
        let conforming = pkcs1::is_conforming(&value, self.oracle_type, self.block_size);
        trace!(query = self.queries, conforming, "plaintext oracle query");

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

    fn is_plaintext_oracle(&self) -> bool {
        true
    }

    fn oracle_type(&self) -> OracleType {
        self.oracle_type
    }
}
