//! Step 1b: trimming the initial interval with small fractions u/t
//!
//! If t divides the (blinded) plaintext m, then m * u / t is an exact integer,
//! and the oracle tells whether it still lies in [2B, 3B) for u close to t.
//! Conforming fractions bound m from both sides before step 2 starts.
//! See Bardou et al., "Efficient Padding Oracle Attacks on Cryptographic Hardware".

use core::cmp;

use num::bigint::BigUint;
use num::{Integer, One};
use tracing::{debug, info, warn};

use crate::bigint::{lcm_all, mod_inverse};
use crate::interval::{Interval, IntervalSet};
use crate::oracle::Oracle;

use super::{Bleichenbacher, Error, Session};

/// Smallest trimmer tried
const MIN_TRIMMER: u64 = 5;

impl<'a, O: Oracle + ?Sized> Bleichenbacher<'a, O> {
    /// Shrink the initial interval of the session using trimmers t <= max_t
    pub(super) fn trim(&mut self, session: &mut Session, max_t: u64) -> Result<(), Error> {
        let c0 = session.c0.clone();
        let divisors = self.find_divisors(&c0, max_t)?;

        let lcm = match lcm_all(&divisors) {
            Some(lcm) if !lcm.is_one() => lcm,
            _ => {
                info!(max_t, "no trimmers found, keeping the initial interval");
                return Ok(());
            }
        };
        debug!(trimmers = divisors.len(), lcm = %lcm, "found trimmers");

        let factor = self.fraction_factor(&lcm)?;
        let u_min = self.find_min_numerator(&c0, &lcm, &factor)?;
        let u_max = self.find_max_numerator(&c0, &lcm, &factor)?;

        // E <= m * u_min / t and m * u_max / t <= F
        let (e, f) = self.bounds.conforming_range(self.oracle.oracle_type());
        let lower = cmp::max((&e * &lcm).div_ceil(&u_min), e);
        let upper = cmp::min(&f * &lcm / &u_max, f);

        // m is a multiple of lcm
        let lower = lower.div_ceil(&lcm) * &lcm;
        let upper = upper / &lcm * &lcm;

        match Interval::new(lower, upper) {
            Some(trimmed) => {
                info!(
                    lcm = %lcm,
                    u_min = %u_min,
                    u_max = %u_max,
                    queries = self.oracle.number_of_queries(),
                    "trimmed the initial interval"
                );
                session.intervals = IntervalSet::single(trimmed);
                session.trimmed = true;
            }
            None => warn!(lcm = %lcm, "trimming produced an empty interval, keeping the initial one"),
        }

        Ok(())
    }

    /// Step 2a on a trimmed interval [a, b]
    ///
    /// Only si with si * m in [2B + j*n, 3B + j*n) for some j can conform, so each
    /// window [ceil((2B + j*n) / b), floor((3B + j*n) / a)] is scanned in turn and
    /// the holes between them are skipped. No si is queried twice.
    pub(super) fn step_two_a_skipping_holes(&mut self, session: &Session) -> Result<BigUint, Error> {
        let interval = match session.intervals.as_single() {
            Some(interval) => interval.clone(),
            None => return self.step_two_a(session),
        };
        let (a, b) = (interval.lower(), interval.upper());

        let mut next = self.bounds.n.div_ceil(&self.bounds.three_b);
        let mut j = BigUint::one();
        debug!(start = %next, "step 2a: searching with skipped holes");

        loop {
            let jn = &j * &self.bounds.n;
            let lower = cmp::max((&self.bounds.two_b + &jn).div_ceil(b), next.clone());
            let upper = (&self.bounds.three_b + &jn) / a;

            if lower <= upper {
                if let Some(si) = self.scan_window(&session.c0, lower, &upper)? {
                    return Ok(si);
                }
                next = upper + 1_u32;
            }
            j += 1_u32;
        }
    }

    // odd t in [5, max_t] with a conforming u in {t - 1, t + 1}
    fn find_divisors(&mut self, c0: &BigUint, max_t: u64) -> Result<Vec<BigUint>, Error> {
        let mut divisors = Vec::new();

        for t in (MIN_TRIMMER..=max_t).step_by(2) {
            let t = BigUint::from(t);
            let factor = self.fraction_factor(&t)?;

            for u in [&t - 1_u32, &t + 1_u32].iter() {
                if self.query_fraction(c0, u, &factor)? {
                    debug!(t = %t, u = %u, "found trimmer");
                    divisors.push(t.clone());
                    break;
                }
            }
        }

        Ok(divisors)
    }

    // smallest conforming u in [ceil(2t / 3), t], u = t is c0 itself
    fn find_min_numerator(&mut self, c0: &BigUint, t: &BigUint, factor: &BigUint) -> Result<BigUint, Error> {
        let mut lo = (t * 2_u32).div_ceil(&BigUint::from(3_u32));
        let mut hi = t.clone();

        while lo < hi {
            let mid = (&lo + &hi) / 2_u32;
            if self.query_fraction(c0, &mid, factor)? {
                hi = mid;
            } else {
                lo = mid + 1_u32;
            }
        }

        Ok(hi)
    }

    // largest conforming u in [t, floor(3t / 2)]
    fn find_max_numerator(&mut self, c0: &BigUint, t: &BigUint, factor: &BigUint) -> Result<BigUint, Error> {
        let mut lo = t.clone();
        let mut hi = t * 3_u32 / 2_u32;

        while lo < hi {
            let mid = (&lo + &hi + 1_u32) / 2_u32;
            if self.query_fraction(c0, &mid, factor)? {
                lo = mid;
            } else {
                hi = mid - 1_u32;
            }
        }

        Ok(lo)
    }

    // t^-1 mod n, raised to e unless the oracle takes plaintexts
    fn fraction_factor(&self, t: &BigUint) -> Result<BigUint, Error> {
        let n = &self.bounds.n;
        let t_inv = mod_inverse(t, n).ok_or_else(|| Error::NotInvertible { value: t.clone() })?;
        if self.oracle.is_plaintext_oracle() {
            Ok(t_inv)
        } else {
            Ok(t_inv.modpow(&self.bounds.e, n))
        }
    }

    // c0 * u * t^-1 mod n (or its encryption)
    fn query_fraction(&mut self, c0: &BigUint, u: &BigUint, factor: &BigUint) -> Result<bool, Error> {
        let value = self.multiply(c0, u) * factor % &self.bounds.n;
        self.query_value(&value)
    }
}
