use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::{Error, Oracle, OracleType, PublicKeyInfo};

/// Oracle wrapper failing once a fixed number of queries has been issued
///
/// Bounds the otherwise unbounded search loops of the attack
pub struct QueryLimit<O> {
    inner: O,
    limit: u64,
}

impl<O: Oracle> QueryLimit<O> {
    pub fn new(inner: O, limit: u64) -> Self {
        Self { inner, limit }
    }
}

impl<O: Oracle> Oracle for QueryLimit<O> {
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error> {
        if self.inner.number_of_queries() >= self.limit {
            warn!(limit = self.limit, "oracle query limit reached");
            return Err(Error::QueryLimit { limit: self.limit });
        }
        self.inner.check_pkcs_conformity(ciphertext)
    }

    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    fn number_of_queries(&self) -> u64 {
        self.inner.number_of_queries()
    }

    fn public_key(&self) -> &PublicKeyInfo {
        self.inner.public_key()
    }

    fn is_plaintext_oracle(&self) -> bool {
        self.inner.is_plaintext_oracle()
    }

    fn oracle_type(&self) -> OracleType {
        self.inner.oracle_type()
    }
}

/// Oracle wrapper that can be cancelled from another thread
pub struct Abortable<O> {
    inner: O,
    abort: Arc<AtomicBool>,
}

impl<O: Oracle> Abortable<O> {
    /// Wrap the oracle, returning it with the flag that aborts it
    pub fn new(inner: O) -> (Self, Arc<AtomicBool>) {
        let abort = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                abort: Arc::clone(&abort),
            },
            abort,
        )
    }
}

impl<O: Oracle> Oracle for Abortable<O> {
    fn check_pkcs_conformity(&mut self, ciphertext: &[u8]) -> Result<bool, Error> {
        if self.abort.load(Ordering::SeqCst) {
            return Err(Error::Aborted);
        }
        self.inner.check_pkcs_conformity(ciphertext)
    }

    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    fn number_of_queries(&self) -> u64 {
        self.inner.number_of_queries()
    }

    fn public_key(&self) -> &PublicKeyInfo {
        self.inner.public_key()
    }

    fn is_plaintext_oracle(&self) -> bool {
        self.inner.is_plaintext_oracle()
    }

    fn oracle_type(&self) -> OracleType {
        self.inner.oracle_type()
    }
}
