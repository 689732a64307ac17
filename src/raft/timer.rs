use std::ops::RangeInclusive;

use rand::Rng;

/// Samples randomized election deadlines, in whole seconds.
#[derive(Debug, Clone)]
pub struct ElectionTimer {
    range: RangeInclusive<u64>,
}

impl ElectionTimer {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            range: min_secs..=max_secs,
        }
    }

    pub fn sample(&self) -> u64 {
        let mut rng = rand::rng();
        rng.random_range(self.range.clone())
    }

    pub fn range(&self) -> &RangeInclusive<u64> {
        &self.range
    }
}

impl Default for ElectionTimer {
    fn default() -> Self {
        Self::new(3, 10)
    }
}
