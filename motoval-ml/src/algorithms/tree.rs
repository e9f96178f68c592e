//! CART regression tree with a variance-reduction split criterion.
//!
//! Nodes live in a flat arena; children are referenced by index. Building is
//! iterative so deep trees on sorted data cannot overflow the stack.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// A tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left.
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `samples` (duplicates act as weights).
    ///
    /// `rng` only decides the order in which features are scanned, which breaks
    /// ties between equally good splits.
    pub fn fit<R: Rng>(
        x: &[Vec<f64>],
        y: &[f64],
        samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut features: Vec<usize> = (0..n_features).collect();
        let mut nodes = vec![Node::Leaf {
            value: 0.0,
            samples: 0,
        }];
        let mut pending = vec![(0usize, samples, 0usize)];

        while let Some((node, rows, depth)) = pending.pop() {
            let value = mean_target(y, &rows);
            let splittable = rows.len() >= params.min_samples_split.max(2)
                && rows.len() >= 2 * params.min_samples_leaf.max(1)
                && params.max_depth.is_none_or(|max| depth < max);

            let split = if splittable {
                features.shuffle(rng);
                best_split(x, y, &rows, value, &features, params.min_samples_leaf.max(1))
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                        .iter()
                        .partition(|&&r| x[r][split.feature] <= split.threshold);
                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf {
                        value: 0.0,
                        samples: 0,
                    });
                    nodes.push(Node::Leaf {
                        value: 0.0,
                        samples: 0,
                    });
                    nodes[node] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    pending.push((right, right_rows, depth + 1));
                    pending.push((left, left_rows, depth + 1));
                }
                None => {
                    nodes[node] = Node::Leaf {
                        value,
                        samples: rows.len(),
                    };
                }
            }
        }

        Self { nodes }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Largest feature index referenced by a split.
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }
}

fn mean_target(y: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64
}

/// Best variance-reducing split over `features`, or `None` if nothing improves the node.
///
/// Targets are centered on the node mean, so the gain of a split with left sum
/// `s` over `n_l` rows is `s²/n_l + s²/n_r`: the drop in squared error.
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    node_mean: f64,
    features: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let node_sse: f64 = rows.iter().map(|&r| (y[r] - node_mean).powi(2)).sum();
    if node_sse <= 0.0 {
        return None;
    }
    let min_gain = node_sse * 1e-12;

    let mut best: Option<SplitCandidate> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for &feature in features {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (x[r][feature], y[r] - node_mean)));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let (current, next) = (pairs[i].0, pairs[i + 1].0);
            if current >= next {
                continue;
            }
            let gain = left_sum * left_sum * (1.0 / n_left as f64 + 1.0 / n_right as f64);
            if gain > min_gain && best.is_none_or(|b| gain > b.gain) {
                let mid = current + (next - current) / 2.0;
                let threshold = if mid < next { mid } else { current };
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fit(x: &[Vec<f64>], y: &[f64], params: TreeParams) -> RegressionTree {
        let mut rng = StdRng::seed_from_u64(7);
        RegressionTree::fit(x, y, (0..y.len()).collect(), &params, &mut rng)
    }

    #[test]
    fn test_single_row_is_leaf() {
        let tree = fit(&[vec![1.0, 2.0]], &[60000.0], TreeParams::default());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(&[9.0, 9.0]), 60000.0);
    }

    #[test]
    fn test_fits_step_function_exactly() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 10.0 } else { 20.0 }).collect();
        let tree = fit(&x, &y, TreeParams::default());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[2.0, 0.0]), 10.0);
        assert_eq!(tree.predict_row(&[4.5, 0.0]), 10.0);
        assert_eq!(tree.predict_row(&[4.6, 0.0]), 20.0);
        assert_eq!(tree.max_feature_index(), Some(0));
    }

    #[test]
    fn test_memorizes_distinct_rows() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![(i * 3 % 8) as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| (i * i) as f64).collect();
        let tree = fit(&x, &y, TreeParams::default());
        for (row, target) in x.iter().zip(&y) {
            assert_eq!(tree.predict_row(row), *target);
        }
    }

    #[test]
    fn test_constant_target_does_not_split() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let tree = fit(&x, &[3.0; 6], TreeParams::default());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_identical_features_do_not_split() {
        let x = vec![vec![1.0]; 4];
        let tree = fit(&x, &[1.0, 2.0, 3.0, 4.0], TreeParams::default());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(&[1.0]), 2.5);
    }

    #[test]
    fn test_max_depth_and_min_leaf() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..16).map(|i| i as f64).collect();

        let shallow = fit(
            &x,
            &y,
            TreeParams {
                max_depth: Some(2),
                ..Default::default()
            },
        );
        assert!(shallow.depth() <= 2);

        let coarse = fit(
            &x,
            &y,
            TreeParams {
                min_samples_leaf: 4,
                ..Default::default()
            },
        );
        assert!(coarse.node_count() <= 7);
    }
}
