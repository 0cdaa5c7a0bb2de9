//! Seeded isolation forest.
//!
//! Each tree is grown on a random subsample by picking a random non-constant
//! feature and a uniform split point inside that feature's range, until a
//! node holds a single sample or the height limit `ceil(log2(psi))` is hit.
//! A point's score is `-2^(-E[h(x)] / c(psi))`, where `h` is the path length
//! (plus the expected remaining depth of the leaf it lands in).

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use super::features::FEATURE_COUNT;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

type Point = [f64; FEATURE_COUNT];

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// Arena-allocated tree; node 0 is the root.
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(data: &[Point], sample: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(data, sample, 0, height_limit, rng);
        tree
    }

    fn grow_node(
        &mut self,
        data: &[Point],
        sample: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { size: sample.len() });

        if depth >= height_limit || sample.len() <= 1 {
            return idx;
        }

        let mut ranges: Vec<(usize, f64, f64)> = Vec::with_capacity(FEATURE_COUNT);
        for feature in 0..FEATURE_COUNT {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in &sample {
                let v = data[i][feature];
                lo = lo.min(v);
                hi = hi.max(v);
            }
            // A width that overflows f64 cannot be sampled uniformly.
            if lo < hi && (hi - lo).is_finite() {
                ranges.push((feature, lo, hi));
            }
        }

        // All remaining points are identical: nothing left to isolate.
        if ranges.is_empty() {
            return idx;
        }

        let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
        let threshold = rng.gen_range(lo..hi);
        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) =
            sample.into_iter().partition(|&i| data[i][feature] <= threshold);

        let left = self.grow_node(data, left_sample, depth + 1, height_limit, rng);
        let right = self.grow_node(data, right_sample, depth + 1, height_limit, rng);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn path_length(&self, point: &Point) -> f64 {
        let mut node = 0;
        let mut depth = 0usize;
        loop {
            match &self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1;
                }
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit on the full batch. Trees are grown sequentially from one seeded
    /// generator, so identical inputs and parameters give identical forests.
    pub fn fit(data: &[Point], params: &ForestParams) -> Self {
        let sample_size = params.max_samples.min(data.len());
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let sample = index::sample(&mut rng, data.len(), sample_size).into_vec();
                IsolationTree::grow(data, sample, height_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Score in `[-1, 0)`; lower is more anomalous. A forest fit on a single
    /// point has no depth to normalise by and scores everything `-0.5`.
    pub fn score(&self, point: &Point) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm == 0.0 {
            return -0.5;
        }
        -(2f64.powf(-mean_path / norm))
    }
}
