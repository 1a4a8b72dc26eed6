//! Seeded train/val/test partitioning.

use std::fmt;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::error::PrepError;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 1337;

/// Slack allowed when checking that train + val fit into the whole.
const RATIO_EPSILON: f64 = 1e-9;

/// One of the three output partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitName {
    Train,
    Val,
    Test,
}

impl SplitName {
    /// All splits in processing order.
    pub const ALL: [SplitName; 3] = [SplitName::Train, SplitName::Val, SplitName::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            SplitName::Train => "train",
            SplitName::Val => "val",
            SplitName::Test => "test",
        }
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested split fractions.
///
/// `test` is informational: the test split always receives whatever train
/// and val leave over.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Self {
        Self { train, val, test }
    }

    /// Checks that every ratio is a finite fraction and that train and val
    /// together do not exceed the whole dataset.
    pub fn validate(&self) -> Result<(), PrepError> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PrepError::InvalidSplitRatios {
                    message: format!("{name} ratio {value} must be within [0, 1]"),
                });
            }
        }

        if self.train + self.val > 1.0 + RATIO_EPSILON {
            return Err(PrepError::InvalidSplitRatios {
                message: format!(
                    "train + val = {} exceeds 1; nothing would be left for test",
                    self.train + self.val
                ),
            });
        }

        Ok(())
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self::new(0.7, 0.2, 0.1)
    }
}

/// The three partitions of an item list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPlan<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T> SplitPlan<T> {
    pub fn get(&self, split: SplitName) -> &[T] {
        match split {
            SplitName::Train => &self.train,
            SplitName::Val => &self.val,
            SplitName::Test => &self.test,
        }
    }

    /// Iterates the splits in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (SplitName, &[T])> + '_ {
        SplitName::ALL
            .into_iter()
            .map(move |split| (split, self.get(split)))
    }

    pub fn total_len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

/// Partition sizes for `n` items: `floor(n * train)`, `floor(n * val)` and
/// the remainder.
pub fn split_sizes(n: usize, ratios: &SplitRatios) -> (usize, usize, usize) {
    let n_train = ((n as f64 * ratios.train).floor() as usize).min(n);
    let n_val = ((n as f64 * ratios.val).floor() as usize).min(n - n_train);
    (n_train, n_val, n - n_train - n_val)
}

/// Shuffles `items` with a generator seeded from `seed` and cuts the result
/// into train, val and test.
///
/// The same input order and seed always produce the same plan.
pub fn split_items<T>(
    mut items: Vec<T>,
    ratios: &SplitRatios,
    seed: u64,
) -> Result<SplitPlan<T>, PrepError> {
    ratios.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let (n_train, n_val, _) = split_sizes(items.len(), ratios);
    let test = items.split_off(n_train + n_val);
    let val = items.split_off(n_train);

    Ok(SplitPlan {
        train: items,
        val,
        test,
    })
}
