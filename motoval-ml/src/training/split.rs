//! Seeded train/test partitioning.

use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Row indices of the two partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_fraction * n_rows)` rows.
///
/// When the held-out share would leave nothing to train on, every row goes
/// to training and the test partition is empty.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, MlError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::Config(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    if n_test >= n_rows {
        return Ok(TrainTestSplit {
            train: indices,
            test: Vec::new(),
        });
    }

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);

        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn test_split_is_partition() {
        let split = train_test_split(50, 0.2, 7).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(
            train_test_split(30, 0.2, 42).unwrap(),
            train_test_split(30, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(30, 0.2, 42).unwrap(),
            train_test_split(30, 0.2, 43).unwrap()
        );
    }

    #[test]
    fn test_single_row_trains_on_everything() {
        let split = train_test_split(1, 0.2, 42).unwrap();
        assert_eq!(split.train, vec![0]);
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(train_test_split(10, 0.0, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
        assert!(train_test_split(10, f64::NAN, 42).is_err());
    }
}
