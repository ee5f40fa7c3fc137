use core::fmt;

use num::bigint::BigUint;

/// Closed range [lower, upper] of candidate plaintext values
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    lower: BigUint,
    upper: BigUint,
}

impl Interval {
    /// Create a new interval
    ///
    /// Returns None if lower > upper
    pub fn new(lower: BigUint, upper: BigUint) -> Option<Self> {
        if lower > upper {
            None
        } else {
            Some(Self { lower, upper })
        }
    }

    pub fn lower(&self) -> &BigUint {
        &self.lower
    }

    pub fn upper(&self) -> &BigUint {
        &self.upper
    }

    /// upper - lower, zero once the interval is a single point
    pub fn width(&self) -> BigUint {
        &self.upper - &self.lower
    }

    /// Whether the interval has collapsed to a single value
    pub fn is_point(&self) -> bool {
        self.lower == self.upper
    }

    pub fn contains(&self, value: &BigUint) -> bool {
        &self.lower <= value && value <= &self.upper
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:x}, {:x}]", self.lower, self.upper)
    }
}

/// Ordered collection of disjoint intervals (the set M_i)
///
/// Overlapping or adjacent intervals are merged on construction,
/// so the union is unchanged and the members stay disjoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    /// Build a set from arbitrary intervals, sorting and merging them
    pub fn new(mut intervals: Vec<Interval>) -> Self {
        intervals.sort();

        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for next in intervals.into_iter() {
            match merged.last_mut() {
                Some(last) if next.lower <= &last.upper + 1_u32 => {
                    if next.upper > last.upper {
                        last.upper = next.upper;
                    }
                }
                _ => merged.push(next),
            }
        }

        Self { intervals: merged }
    }

    pub fn single(interval: Interval) -> Self {
        Self {
            intervals: vec![interval],
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    /// The only member of the set, if there is exactly one
    pub fn as_single(&self) -> Option<&Interval> {
        match self.intervals.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Whether any member contains the value
    pub fn contains(&self, value: &BigUint) -> bool {
        self.intervals.iter().any(|i| i.contains(value))
    }

    /// Sum of the widths of all members
    pub fn total_width(&self) -> BigUint {
        self.intervals.iter().map(|i| i.width()).sum()
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = core::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
