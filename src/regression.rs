//! Single-feature demand regressors: unit price in, quantity out.
//!
//! The boosted-tree model follows the usual second-order boosting recipe for
//! squared error (gradient `pred - y`, unit hessian), which makes every tree a
//! piecewise-constant step function of price. Outside the observed prices the
//! prediction is flat at the outermost leaves.

use crate::config::{BoostingParams, RegressorKind};
use std::cmp::Ordering;

pub trait DemandRegressor {
    /// Train on paired observations. Callers guarantee equal lengths and at
    /// least two distinct prices.
    fn fit(&mut self, prices: &[f64], quantities: &[f64]);

    fn predict(&self, price: f64) -> f64;

    fn predict_many(&self, prices: &[f64]) -> Vec<f64> {
        prices.iter().map(|&p| self.predict(p)).collect()
    }
}

pub fn build_regressor(kind: &RegressorKind) -> Box<dyn DemandRegressor> {
    match kind {
        RegressorKind::GradientBoosting(params) => {
            Box::new(GradientBoostedTrees::new(params.clone()))
        }
        RegressorKind::Linear => Box::new(LinearDemand::default()),
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Node::Leaf(w) => *w,
            Node::Split {
                threshold,
                left,
                right,
            } => {
                if x < *threshold {
                    left.eval(x)
                } else {
                    right.eval(x)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    params: BoostingParams,
    base_score: f64,
    trees: Vec<Node>,
}

impl GradientBoostedTrees {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Grow one tree over `idx`, which is sorted by price.
    fn grow(&self, x: &[f64], grad: &[f64], idx: &[usize], depth: usize) -> Node {
        let lambda = self.params.lambda;
        let g_sum: f64 = idx.iter().map(|&i| grad[i]).sum();
        let h_sum = idx.len() as f64;
        let leaf = Node::Leaf(-g_sum / (h_sum + lambda) * self.params.learning_rate);

        if depth >= self.params.max_depth || idx.len() < 2 {
            return leaf;
        }

        let parent_score = g_sum * g_sum / (h_sum + lambda);
        let mut best: Option<(usize, f64)> = None;
        let mut g_left = 0.0;
        for split in 1..idx.len() {
            g_left += grad[idx[split - 1]];
            if x[idx[split - 1]] == x[idx[split]] {
                continue;
            }
            let h_left = split as f64;
            let h_right = h_sum - h_left;
            if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                continue;
            }
            let g_right = g_sum - g_left;
            let gain = g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                - parent_score;
            if gain > best.map_or(0.0, |(_, g)| g) {
                best = Some((split, gain));
            }
        }

        match best {
            Some((split, _)) => {
                let threshold = (x[idx[split - 1]] + x[idx[split]]) / 2.0;
                Node::Split {
                    threshold,
                    left: Box::new(self.grow(x, grad, &idx[..split], depth + 1)),
                    right: Box::new(self.grow(x, grad, &idx[split..], depth + 1)),
                }
            }
            None => leaf,
        }
    }
}

impl DemandRegressor for GradientBoostedTrees {
    fn fit(&mut self, prices: &[f64], quantities: &[f64]) {
        let n = prices.len().min(quantities.len());
        self.trees.clear();
        if n == 0 {
            self.base_score = 0.0;
            return;
        }
        let x = &prices[..n];
        let y = &quantities[..n];
        self.base_score = y.iter().sum::<f64>() / n as f64;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal));

        let mut preds = vec![self.base_score; n];
        let mut grad = vec![0.0; n];
        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                grad[i] = preds[i] - y[i];
            }
            let tree = self.grow(x, &grad, &order, 0);
            for i in 0..n {
                preds[i] += tree.eval(x[i]);
            }
            self.trees.push(tree);
        }
    }

    fn predict(&self, price: f64) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.eval(price)).sum::<f64>()
    }
}

/// Ordinary least squares line, predictions floored at zero demand.
#[derive(Debug, Clone, Default)]
pub struct LinearDemand {
    intercept: f64,
    slope: f64,
}

impl LinearDemand {
    pub fn coefficients(&self) -> (f64, f64) {
        (self.intercept, self.slope)
    }
}

impl DemandRegressor for LinearDemand {
    fn fit(&mut self, prices: &[f64], quantities: &[f64]) {
        let n = prices.len().min(quantities.len());
        if n == 0 {
            *self = Self::default();
            return;
        }
        let mean_x = prices[..n].iter().sum::<f64>() / n as f64;
        let mean_y = quantities[..n].iter().sum::<f64>() / n as f64;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in prices.iter().zip(quantities) {
            sxy += (x - mean_x) * (y - mean_y);
            sxx += (x - mean_x).powi(2);
        }
        self.slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
        self.intercept = mean_y - self.slope * mean_x;
    }

    fn predict(&self, price: f64) -> f64 {
        (self.intercept + self.slope * price).max(0.0)
    }
}
