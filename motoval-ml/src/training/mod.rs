//! Training: seeded split, forest fitting and held-out evaluation.

pub mod metrics;
pub mod runner;
pub mod split;

pub use metrics::RegressionMetrics;
pub use runner::{Trainer, TrainingOutcome};
pub use split::{TrainTestSplit, train_test_split};
