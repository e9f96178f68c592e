//! Regression algorithms — CART trees and the random forest built on them.

pub mod forest;
pub mod tree;

pub use forest::{ForestParams, RandomForestRegressor};
pub use tree::{RegressionTree, TreeParams};
