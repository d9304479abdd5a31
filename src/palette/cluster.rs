use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::audio::features::FeatureMatrix;
use crate::config::PaletteConfig;

/// Result of partitioning feature frames.
#[derive(Clone, Debug)]
pub struct Clustering {
    pub centroids: Vec<Vec<f32>>,
    /// Cluster id for every frame, in frame order.
    pub assignments: Vec<usize>,
    pub iterations: usize,
    /// False when the iteration cap was hit first; centroids are then best effort.
    pub converged: bool,
    /// Sum of squared distances from frames to their centroids.
    pub inertia: f32,
}

impl Clustering {
    fn empty() -> Self {
        Self {
            centroids: Vec::new(),
            assignments: Vec::new(),
            iterations: 0,
            converged: true,
            inertia: 0.0,
        }
    }

    pub fn effective_k(&self) -> usize {
        self.centroids.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }
}

/// Iterative relocation (Lloyd) clustering with k-means++ seeding.
pub struct FrameClusterer {
    k: usize,
    max_iterations: usize,
    tolerance: f32,
    seed: u64,
}

impl FrameClusterer {
    pub fn new(k: usize) -> Self {
        Self::from_config(&PaletteConfig {
            clusters: k,
            ..PaletteConfig::default()
        })
    }

    pub fn from_config(config: &PaletteConfig) -> Self {
        Self {
            k: config.clusters,
            max_iterations: config.max_iterations.max(1),
            tolerance: config.tolerance,
            seed: config.cluster_seed,
        }
    }

    pub fn fit(&self, matrix: &FeatureMatrix) -> Clustering {
        let frames = matrix.frames();
        let k = self.k.min(frames.len());
        if k == 0 {
            return Clustering::empty();
        }
        if k < self.k {
            log::warn!(
                "Only {} feature frames for {} clusters; clustering with k = {}",
                frames.len(),
                self.k,
                k
            );
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = seed_centroids(frames, k, &mut rng);
        let shift_limit = self.tolerance * mean_variance(frames);

        let mut assignments = vec![usize::MAX; frames.len()];
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let next: Vec<usize> = frames
                .par_iter()
                .map(|f| nearest(f, &centroids).0)
                .collect();
            let changed = next.iter().zip(&assignments).filter(|(a, b)| a != b).count();
            assignments = next;

            reseed_empty(frames, &mut centroids, &mut assignments);

            let updated = recompute(frames, &assignments, &centroids);
            let shift: f32 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| sq_dist(old, new))
                .sum();
            centroids = updated;

            if changed == 0 || shift <= shift_limit {
                converged = true;
                break;
            }
        }

        // Final assignment against the final centroids.
        let mut inertia = 0.0;
        for (frame, slot) in frames.iter().zip(assignments.iter_mut()) {
            let (idx, d) = nearest(frame, &centroids);
            *slot = idx;
            inertia += d;
        }

        if !converged {
            log::warn!(
                "Clustering stopped at the {}-iteration cap without converging",
                self.max_iterations
            );
        }

        Clustering {
            centroids,
            assignments,
            iterations,
            converged,
            inertia,
        }
    }
}

fn sq_dist(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(frame: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, sq_dist(frame, c)))
        .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn mean_variance(frames: &[Vec<f32>]) -> f32 {
    let n = frames.len() as f32;
    let dims = frames[0].len();
    if dims == 0 {
        return 0.0;
    }
    let total: f32 = (0..dims)
        .map(|d| {
            let mean = frames.iter().map(|f| f[d]).sum::<f32>() / n;
            frames.iter().map(|f| (f[d] - mean).powi(2)).sum::<f32>() / n
        })
        .sum();
    total / dims as f32
}

/// k-means++: each new centroid is drawn with probability proportional to its
/// squared distance from the closest centroid chosen so far.
fn seed_centroids(frames: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = vec![frames[rng.random_range(0..frames.len())].clone()];
    let mut dists: Vec<f32> = frames.iter().map(|f| sq_dist(f, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f32 = dists.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.random::<f32>() * total;
            let mut chosen = frames.len() - 1;
            for (i, &d) in dists.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.random_range(0..frames.len())
        };

        let centroid = frames[pick].clone();
        for (d, f) in dists.iter_mut().zip(frames) {
            *d = d.min(sq_dist(f, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Give every empty cluster the frame farthest from its own centroid, taken
/// from a cluster that can spare it.
fn reseed_empty(frames: &[Vec<f32>], centroids: &mut [Vec<f32>], assignments: &mut [usize]) {
    let mut sizes = vec![0usize; centroids.len()];
    for &a in assignments.iter() {
        sizes[a] += 1;
    }

    for empty in 0..centroids.len() {
        if sizes[empty] > 0 {
            continue;
        }
        let donor = (0..frames.len())
            .filter(|&i| sizes[assignments[i]] > 1)
            .max_by(|&a, &b| {
                let da = sq_dist(&frames[a], &centroids[assignments[a]]);
                let db = sq_dist(&frames[b], &centroids[assignments[b]]);
                da.total_cmp(&db)
            });
        if let Some(i) = donor {
            sizes[assignments[i]] -= 1;
            sizes[empty] = 1;
            assignments[i] = empty;
            centroids[empty] = frames[i].clone();
        }
    }
}

fn recompute(frames: &[Vec<f32>], assignments: &[usize], previous: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let dims = previous[0].len();
    let mut sums = vec![vec![0.0f32; dims]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (frame, &a) in frames.iter().zip(assignments) {
        counts[a] += 1;
        for (s, v) in sums[a].iter_mut().zip(frame) {
            *s += v;
        }
    }
    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| s / count as f32).collect()
            }
        })
        .collect()
}
