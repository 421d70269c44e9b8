//! The cyclic daily horizon and the periods within it.
//!
//! Dispatch runs over a fixed ring of equal-length periods. The period before the first is the
//! last one, so constraints that look back one period wrap around the end of the ring instead of
//! being truncated.
use anyhow::{Result, ensure};
use std::fmt;

/// A cyclic sequence of equal-length periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    num_periods: usize,
}

impl Horizon {
    /// Create a horizon with the given number of periods.
    ///
    /// A horizon must contain at least one period.
    pub fn new(num_periods: usize) -> Result<Self> {
        ensure!(num_periods > 0, "A horizon must contain at least one period");

        Ok(Self { num_periods })
    }

    /// The number of periods in the horizon
    pub fn num_periods(&self) -> usize {
        self.num_periods
    }

    /// Iterate over the periods of the horizon in ring order
    pub fn iter(&self) -> impl Iterator<Item = TimePeriod> {
        (0..self.num_periods).map(TimePeriod)
    }

    /// The last period of the horizon
    pub fn last_period(&self) -> TimePeriod {
        TimePeriod(self.num_periods - 1)
    }
}

/// One period of the horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePeriod(usize);

impl TimePeriod {
    /// The position of the period within the horizon
    pub fn index(&self) -> usize {
        self.0
    }

    /// The period preceding this one in the given horizon.
    ///
    /// The ring is closed: the predecessor of the first period is the last period.
    pub fn predecessor(&self, horizon: &Horizon) -> TimePeriod {
        TimePeriod((self.0 + horizon.num_periods() - 1) % horizon.num_periods())
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[test]
    fn test_horizon_new() {
        assert_eq!(Horizon::new(24).unwrap().num_periods(), 24);
        assert_error!(Horizon::new(0), "A horizon must contain at least one period");
    }

    #[test]
    fn test_horizon_iter() {
        let horizon = Horizon::new(3).unwrap();
        let indices: Vec<_> = horizon.iter().map(|period| period.index()).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(horizon.last_period().index(), 2);
    }

    #[rstest]
    #[case(0, 23)]
    #[case(1, 0)]
    #[case(23, 22)]
    fn test_predecessor_wraps(#[case] index: usize, #[case] expected: usize) {
        let horizon = Horizon::new(24).unwrap();
        let period = horizon.iter().nth(index).unwrap();
        assert_eq!(period.predecessor(&horizon).index(), expected);
    }

    #[test]
    fn test_predecessor_single_period() {
        let horizon = Horizon::new(1).unwrap();
        let period = horizon.iter().next().unwrap();
        assert_eq!(period.predecessor(&horizon), period);
    }
}
