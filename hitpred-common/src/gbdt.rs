//! Gradient-boosted decision trees for binary classification
//!
//! Trees are fitted on the logistic loss with second-order (Newton) leaf
//! values. Feature values are bucketed into at most `max_bin` histogram
//! bins before training; trees grow leaf-wise, always splitting the leaf
//! with the largest loss reduction until `num_leaves` is reached.
//!
//! Fitted trees store real-valued thresholds, so inference needs no bins:
//! a row goes left when `x[feature] <= threshold`.

use crate::features::FeatureMatrix;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Probability at or above which a row is labelled positive
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Hessian sums below this produce a zero leaf value
const MIN_LEAF_DENOMINATOR: f64 = 1e-12;

/// Boosting hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoostingParams {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf value
    pub learning_rate: f64,
    /// Maximum leaves per tree
    pub num_leaves: usize,
    /// Optional depth limit; `None` means limited by `num_leaves` only
    pub max_depth: Option<usize>,
    /// Minimum rows in each child of a split
    pub min_child_samples: usize,
    /// Minimum hessian sum in each child of a split
    pub min_child_weight: f64,
    /// L2 regularization on leaf values
    pub reg_lambda: f64,
    /// Minimum loss reduction required to split
    pub min_split_gain: f64,
    /// Maximum histogram bins per feature (2..=256)
    pub max_bin: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.05,
            num_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            min_child_weight: 1e-3,
            reg_lambda: 0.0,
            min_split_gain: 0.0,
            max_bin: 255,
        }
    }
}

impl BoostingParams {
    /// Reject parameter combinations the trainer cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::Config("n_estimators must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(Error::Config("num_leaves must be at least 2".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        if self.min_child_samples == 0 {
            return Err(Error::Config("min_child_samples must be at least 1".to_string()));
        }
        if self.min_child_weight < 0.0 || self.reg_lambda < 0.0 || self.min_split_gain < 0.0 {
            return Err(Error::Config(
                "min_child_weight, reg_lambda and min_split_gain must be non-negative".to_string(),
            ));
        }
        if !(2..=256).contains(&self.max_bin) {
            return Err(Error::Config(format!(
                "max_bin must be within 2..=256, got {}",
                self.max_bin
            )));
        }
        Ok(())
    }
}

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Tree node; children always have larger indices than their parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        gain: f64,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `x`
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!("node {} uses unknown feature {}", idx, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", idx));
                    }
                    if left <= idx || right <= idx || left >= self.nodes.len() || right >= self.nodes.len() {
                        return Err(format!("node {} has invalid children", idx));
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has a non-finite value", idx));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Which quantity feature importance sums up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportanceKind {
    /// Number of splits using the feature
    Split,
    /// Total loss reduction of splits using the feature
    Gain,
}

/// Fitted boosted-tree binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    pub params: BoostingParams,
    pub n_features: usize,
    /// Initial raw score (log-odds of the training positive rate)
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl GradientBoostedClassifier {
    /// Fit on `x` with binary labels `y`
    pub fn fit(x: &FeatureMatrix, y: &[u8], params: &BoostingParams) -> Result<Self> {
        params.validate()?;

        let n = x.n_rows();
        if n == 0 {
            return Err(Error::Training("no training rows".to_string()));
        }
        if n != y.len() {
            return Err(Error::Training(format!(
                "{} feature rows but {} labels",
                n,
                y.len()
            )));
        }
        if y.iter().any(|&label| label > 1) {
            return Err(Error::Training("labels must be 0 or 1".to_string()));
        }

        let positives = y.iter().filter(|&&label| label == 1).count();
        if positives == 0 || positives == n {
            return Err(Error::Training(
                "training labels contain a single class".to_string(),
            ));
        }

        let rate = positives as f64 / n as f64;
        let base_score = (rate / (1.0 - rate)).ln();

        let binned = BinnedData::new(x, params.max_bin);
        debug!(
            features = x.n_cols(),
            rows = n,
            max_bins = binned.bins.iter().map(|b| b.n_bins()).max().unwrap_or(0),
            "Binned training features"
        );

        let mut scores = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let all_rows: Vec<u32> = (0..n as u32).collect();
        let mut trees = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(scores[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = p * (1.0 - p);
            }

            let (tree, leaves) = grow_tree(&binned, &grad, &hess, all_rows.clone(), params);
            if tree.n_leaves() < 2 {
                info!(
                    "Stopped boosting after {} rounds: no split meets the requirements",
                    round
                );
                break;
            }

            for (rows, value) in leaves {
                for r in rows {
                    scores[r as usize] += value;
                }
            }
            trees.push(tree);

            if (round + 1) % 50 == 0 {
                let loss = crate::metrics::log_loss(
                    y,
                    &scores.iter().map(|&s| sigmoid(s)).collect::<Vec<_>>(),
                )?;
                debug!(round = round + 1, train_log_loss = loss, "Boosting progress");
            }
        }

        Ok(Self {
            params: params.clone(),
            n_features: x.n_cols(),
            base_score,
            trees,
        })
    }

    /// Raw additive score (log-odds)
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.decision_function(x))
    }

    /// Hard label at [`DECISION_THRESHOLD`]
    pub fn predict(&self, x: &[f64]) -> u8 {
        u8::from(self.predict_proba(x) >= DECISION_THRESHOLD)
    }

    /// Per-feature importance summed over every tree
    pub fn feature_importance(&self, kind: ImportanceKind) -> Vec<f64> {
        let mut importance = vec![0.0; self.n_features];
        for node in self.trees.iter().flat_map(|t| &t.nodes) {
            if let Node::Split { feature, gain, .. } = *node {
                importance[feature] += match kind {
                    ImportanceKind::Split => 1.0,
                    ImportanceKind::Gain => gain,
                };
            }
        }
        importance
    }

    /// Structural check for deserialized models
    pub fn validate(&self) -> Result<()> {
        if !self.base_score.is_finite() {
            return Err(Error::Artifact("non-finite base score".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| Error::Artifact(format!("tree {}: {}", i, e)))?;
        }
        Ok(())
    }
}

/// Bin upper bounds of one feature; the last bound is +inf
#[derive(Debug, Clone)]
struct FeatureBins {
    upper_bounds: Vec<f64>,
}

impl FeatureBins {
    fn fit(values: &[f64], max_bin: usize) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mut distinct = sorted.clone();
        distinct.dedup();

        let mut upper_bounds = Vec::new();
        if distinct.len() <= max_bin {
            upper_bounds.extend(distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0));
        } else {
            // quantile bounds over all values
            let n = sorted.len();
            for k in 1..max_bin {
                let idx = k * n / max_bin;
                let (lo, hi) = (sorted[idx - 1], sorted[idx]);
                let bound = if lo < hi { (lo + hi) / 2.0 } else { lo };
                if upper_bounds.last().map_or(true, |&last| bound > last) {
                    upper_bounds.push(bound);
                }
            }
        }
        upper_bounds.push(f64::INFINITY);
        Self { upper_bounds }
    }

    fn n_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    fn bin(&self, value: f64) -> u8 {
        self.upper_bounds.partition_point(|&ub| ub < value) as u8
    }
}

/// Column-major bin indices of the training matrix
struct BinnedData {
    bins: Vec<FeatureBins>,
    columns: Vec<Vec<u8>>,
}

impl BinnedData {
    fn new(x: &FeatureMatrix, max_bin: usize) -> Self {
        let mut bins = Vec::with_capacity(x.n_cols());
        let mut columns = Vec::with_capacity(x.n_cols());
        for f in 0..x.n_cols() {
            let values = x.column(f);
            let feature_bins = FeatureBins::fit(&values, max_bin);
            columns.push(values.iter().map(|&v| feature_bins.bin(v)).collect());
            bins.push(feature_bins);
        }
        Self { bins, columns }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    grad: f64,
    hess: f64,
    count: u32,
}

/// Per-feature gradient histograms of one leaf
type Histogram = Vec<Vec<BinStats>>;

fn build_histogram(data: &BinnedData, rows: &[u32], grad: &[f64], hess: &[f64]) -> Histogram {
    data.columns
        .iter()
        .zip(&data.bins)
        .map(|(column, bins)| {
            let mut hist = vec![BinStats::default(); bins.n_bins()];
            for &r in rows {
                let r = r as usize;
                let stats = &mut hist[column[r] as usize];
                stats.grad += grad[r];
                stats.hess += hess[r];
                stats.count += 1;
            }
            hist
        })
        .collect()
}

fn subtract_histogram(parent: &Histogram, child: &Histogram) -> Histogram {
    parent
        .iter()
        .zip(child)
        .map(|(p, c)| {
            p.iter()
                .zip(c)
                .map(|(p, c)| BinStats {
                    grad: p.grad - c.grad,
                    hess: p.hess - c.hess,
                    count: p.count - c.count,
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: u8,
    threshold: f64,
    gain: f64,
}

struct LeafState {
    node: usize,
    rows: Vec<u32>,
    hist: Histogram,
    sum_grad: f64,
    sum_hess: f64,
    depth: usize,
    split: Option<SplitCandidate>,
}

impl LeafState {
    fn new(
        node: usize,
        rows: Vec<u32>,
        hist: Histogram,
        depth: usize,
        data: &BinnedData,
        params: &BoostingParams,
    ) -> Self {
        // every row lands in exactly one bin of feature 0
        let (sum_grad, sum_hess) = hist
            .first()
            .map(|h| h.iter().fold((0.0, 0.0), |(g, s), b| (g + b.grad, s + b.hess)))
            .unwrap_or((0.0, 0.0));

        let mut leaf = Self {
            node,
            rows,
            hist,
            sum_grad,
            sum_hess,
            depth,
            split: None,
        };

        let depth_ok = params.max_depth.map_or(true, |max| depth < max);
        if depth_ok && leaf.rows.len() >= 2 * params.min_child_samples {
            leaf.split = find_best_split(&leaf, data, params);
        }
        leaf
    }

    fn output(&self, params: &BoostingParams) -> f64 {
        let denominator = self.sum_hess + params.reg_lambda;
        if denominator < MIN_LEAF_DENOMINATOR {
            0.0
        } else {
            -self.sum_grad / denominator * params.learning_rate
        }
    }
}

fn leaf_score(grad: f64, hess: f64, lambda: f64) -> f64 {
    let denominator = hess + lambda;
    if denominator < MIN_LEAF_DENOMINATOR {
        0.0
    } else {
        grad * grad / denominator
    }
}

fn find_best_split(leaf: &LeafState, data: &BinnedData, params: &BoostingParams) -> Option<SplitCandidate> {
    let count = leaf.rows.len();
    let parent_score = leaf_score(leaf.sum_grad, leaf.sum_hess, params.reg_lambda);
    let mut best: Option<SplitCandidate> = None;
    let mut best_gain = params.min_split_gain;

    for (feature, hist) in leaf.hist.iter().enumerate() {
        let (mut left_grad, mut left_hess, mut left_count) = (0.0, 0.0, 0usize);

        // the last bin can never be a split point
        for (bin, stats) in hist.iter().enumerate().take(hist.len().saturating_sub(1)) {
            left_grad += stats.grad;
            left_hess += stats.hess;
            left_count += stats.count as usize;

            if left_count < params.min_child_samples {
                continue;
            }
            let right_count = count - left_count;
            if right_count < params.min_child_samples {
                break;
            }

            let right_grad = leaf.sum_grad - left_grad;
            let right_hess = leaf.sum_hess - left_hess;
            if left_hess < params.min_child_weight || right_hess < params.min_child_weight {
                continue;
            }

            let gain = leaf_score(left_grad, left_hess, params.reg_lambda)
                + leaf_score(right_grad, right_hess, params.reg_lambda)
                - parent_score;
            if gain > best_gain {
                best_gain = gain;
                best = Some(SplitCandidate {
                    feature,
                    bin: bin as u8,
                    threshold: data.bins[feature].upper_bounds[bin],
                    gain,
                });
            }
        }
    }
    best
}

/// Grow one tree; returns it with the rows and value of every leaf
fn grow_tree(
    data: &BinnedData,
    grad: &[f64],
    hess: &[f64],
    rows: Vec<u32>,
    params: &BoostingParams,
) -> (Tree, Vec<(Vec<u32>, f64)>) {
    let hist = build_histogram(data, &rows, grad, hess);
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut leaves = vec![LeafState::new(0, rows, hist, 0, data, params)];

    while leaves.len() < params.num_leaves {
        let mut chosen: Option<(usize, f64)> = None;
        for (i, leaf) in leaves.iter().enumerate() {
            if let Some(split) = &leaf.split {
                if chosen.map_or(true, |(_, gain)| split.gain > gain) {
                    chosen = Some((i, split.gain));
                }
            }
        }
        let Some((idx, _)) = chosen else { break };

        let leaf = leaves.remove(idx);
        let Some(split) = leaf.split else { break };

        let column = &data.columns[split.feature];
        let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = leaf
            .rows
            .iter()
            .partition(|&&r| column[r as usize] <= split.bin);

        let left_node = nodes.len();
        let right_node = left_node + 1;
        nodes.push(Node::Leaf { value: 0.0 });
        nodes.push(Node::Leaf { value: 0.0 });
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_node,
            right: right_node,
            gain: split.gain,
        };

        // build the smaller child, derive the larger one from the parent
        let (left_hist, right_hist) = if left_rows.len() <= right_rows.len() {
            let small = build_histogram(data, &left_rows, grad, hess);
            let large = subtract_histogram(&leaf.hist, &small);
            (small, large)
        } else {
            let small = build_histogram(data, &right_rows, grad, hess);
            let large = subtract_histogram(&leaf.hist, &small);
            (large, small)
        };

        let depth = leaf.depth + 1;
        leaves.push(LeafState::new(left_node, left_rows, left_hist, depth, data, params));
        leaves.push(LeafState::new(right_node, right_rows, right_hist, depth, data, params));
    }

    let mut assignments = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let value = leaf.output(params);
        nodes[leaf.node] = Node::Leaf { value };
        assignments.push((leaf.rows, value));
    }
    (Tree { nodes }, assignments)
}
