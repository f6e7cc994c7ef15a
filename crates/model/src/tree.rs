//! Second-order regression trees over pre-binned features.
//!
//! Each tree is grown on gradients and hessians of the loss. A split is kept
//! only if it lowers the regularized objective by more than `gamma`, and both
//! children carry at least `min_child_weight` hessian mass.

use serde::{Deserialize, Serialize};

/// Maximum number of histogram bins per feature.
pub const MAX_BINS: usize = 256;

/// Regularization and shape limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub gamma: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    /// Multiplier applied to every leaf weight.
    pub learning_rate: f64,
}

impl TreeParams {
    /// L1 soft threshold of a gradient sum.
    fn threshold(&self, g: f64) -> f64 {
        if g > self.reg_alpha {
            g - self.reg_alpha
        } else if g < -self.reg_alpha {
            g + self.reg_alpha
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let t = self.threshold(g);
        t * t / (h + self.reg_lambda)
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -self.threshold(g) / denom
    }
}

/// Feature values mapped to histogram bins, column-major.
///
/// For feature `f`, `cuts[f]` is ascending and a value `v` falls in bin
/// `cuts[f].partition_point(|c| *c <= v)`. Splitting after bin `b` sends
/// values `< cuts[f][b]` left.
#[derive(Debug, Clone)]
pub struct BinnedFeatures {
    cuts: Vec<Vec<f64>>,
    bins: Vec<Vec<u16>>,
}

impl BinnedFeatures {
    /// Bins a row-major matrix. Features with at most [`MAX_BINS`] distinct
    /// values get one cut between each pair of neighbours; others are cut at
    /// evenly spaced ranks.
    #[must_use]
    pub fn new(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut cuts = Vec::with_capacity(n_features);
        let mut bins = Vec::with_capacity(n_features);

        for f in 0..n_features {
            let mut distinct: Vec<f64> = rows.iter().map(|r| r[f]).collect();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());

            let feature_cuts = if distinct.len() <= MAX_BINS {
                distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect::<Vec<_>>()
            } else {
                let mut picked: Vec<f64> = (1..MAX_BINS)
                    .map(|i| {
                        let idx = i * distinct.len() / MAX_BINS;
                        (distinct[idx - 1] + distinct[idx]) / 2.0
                    })
                    .collect();
                picked.dedup_by(|a, b| a.total_cmp(b).is_eq());
                picked
            };

            let feature_bins = rows
                .iter()
                .map(|r| {
                    let bin = feature_cuts.partition_point(|c| *c <= r[f]);
                    u16::try_from(bin).unwrap_or(u16::MAX)
                })
                .collect();

            cuts.push(feature_cuts);
            bins.push(feature_bins);
        }

        Self { cuts, bins }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct SplitCandidate {
    gain: f64,
    feature: usize,
    bin: usize,
}

/// A fitted regression tree. Leaf values already include the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Grows a tree on `rows` using only `features`.
    #[must_use]
    pub fn fit(
        data: &BinnedFeatures,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        features: &[usize],
        params: &TreeParams,
    ) -> Self {
        let grower = Grower {
            data,
            grad,
            hess,
            features,
            params,
        };
        Self {
            root: grower.grow(rows, 0),
        }
    }

    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                }
            }
        }
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        fn count(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 1,
                Node::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }
}

struct Grower<'a> {
    data: &'a BinnedFeatures,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a TreeParams,
}

impl Grower<'_> {
    fn grow(&self, rows: Vec<usize>, depth: usize) -> Node {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let leaf = Node::Leaf(self.params.learning_rate * self.params.leaf_weight(g, h));

        if depth >= self.params.max_depth || rows.len() < 2 {
            return leaf;
        }
        let Some(best) = self.best_split(&rows, g, h) else {
            return leaf;
        };

        let bins = &self.data.bins[best.feature];
        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| usize::from(bins[i]) <= best.bin);

        Node::Split {
            feature: best.feature,
            threshold: self.data.cuts[best.feature][best.bin],
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let params = self.params;
        let parent = params.score(g, h);
        let mut best: Option<SplitCandidate> = None;

        for &feature in self.features {
            let cuts = &self.data.cuts[feature];
            if cuts.is_empty() {
                continue;
            }
            let bins = &self.data.bins[feature];
            let mut hist = vec![(0.0_f64, 0.0_f64); cuts.len() + 1];
            for &i in rows {
                let slot = &mut hist[usize::from(bins[i])];
                slot.0 += self.grad[i];
                slot.1 += self.hess[i];
            }

            let (mut gl, mut hl) = (0.0, 0.0);
            for (bin, (bg, bh)) in hist.iter().take(cuts.len()).enumerate() {
                gl += bg;
                hl += bh;
                let (gr, hr) = (g - gl, h - hl);
                if hl < params.min_child_weight || hr < params.min_child_weight {
                    continue;
                }
                let gain =
                    0.5 * (params.score(gl, hl) + params.score(gr, hr) - parent) - params.gamma;
                if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate { gain, feature, bin });
                }
            }
        }
        best
    }
}
