use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

/// Parameters for one k-means fit
#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iterations: usize,
    /// Seeded restarts; the lowest-inertia run is kept
    pub n_init: usize,
    pub tolerance: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centroids: Vec<Vec<f32>>,
    /// Cluster index per input point
    pub assignments: Vec<usize>,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Euclidean k-means with k-means++ seeding
///
/// Restart `r` draws from `StdRng::seed_from_u64(seed + r)`, so the result
/// is a pure function of the points and the parameters. Callers must pass
/// at least one point and `1 <= k <= points.len()`, all points sharing one
/// dimension.
pub fn fit(points: &[Vec<f32>], params: &KMeansParams) -> KMeansResult {
    let mut best = restart(points, params, 0);

    for run in 1..params.n_init {
        let result = restart(points, params, run);
        if result.inertia < best.inertia {
            best = result;
        }
    }

    best
}

fn restart(points: &[Vec<f32>], params: &KMeansParams, run: usize) -> KMeansResult {
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(run as u64));
    let result = fit_once(points, params, &mut rng);
    debug!(
        "k-means restart {}: inertia {:.4} after {} iterations (converged: {})",
        run, result.inertia, result.iterations, result.converged
    );
    result
}

fn fit_once(points: &[Vec<f32>], params: &KMeansParams, rng: &mut StdRng) -> KMeansResult {
    let dim = points[0].len();
    let mut centroids = kmeans_plusplus_init(points, params.k, rng);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        let nearest = assign(points, &centroids);
        iterations += 1;

        let mut sums = vec![vec![0.0f64; dim]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (point, &(cluster, _)) in points.iter().zip(&nearest) {
            for (sum, &x) in sums[cluster].iter_mut().zip(point) {
                *sum += f64::from(x);
            }
            counts[cluster] += 1;
        }

        let mut new_centroids: Vec<Vec<f32>> = sums
            .iter()
            .zip(&counts)
            .zip(&centroids)
            .map(|((sum, &count), old)| {
                if count == 0 {
                    old.clone()
                } else {
                    sum.iter().map(|s| (s / count as f64) as f32).collect()
                }
            })
            .collect();

        // An empty cluster takes over the point worst served by its centroid
        let mut distances: Vec<f64> = nearest.iter().map(|&(_, d)| d).collect();
        for (cluster, &count) in counts.iter().enumerate() {
            if count > 0 {
                continue;
            }
            let farthest = farthest_point(&distances);
            new_centroids[cluster] = points[farthest].clone();
            distances[farthest] = 0.0;
        }

        let shift = centroids
            .iter()
            .zip(&new_centroids)
            .map(|(a, b)| squared_distance(a, b).sqrt())
            .fold(0.0f64, f64::max);
        centroids = new_centroids;

        if shift <= params.tolerance {
            converged = true;
            break;
        }
    }

    let nearest = assign(points, &centroids);
    let inertia = nearest.iter().map(|&(_, d)| d).sum();

    KMeansResult {
        centroids,
        assignments: nearest.into_iter().map(|(cluster, _)| cluster).collect(),
        inertia,
        iterations,
        converged,
    }
}

fn kmeans_plusplus_init(points: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .par_iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative > target
                })
                .unwrap_or_else(|| farthest_point(&distances))
        } else {
            // Every point coincides with a centroid already
            rng.gen_range(0..points.len())
        };
        centroids.push(points[next].clone());
    }

    centroids
}

/// Nearest centroid and squared distance for every point, in input order
fn assign(points: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<(usize, f64)> {
    points
        .par_iter()
        .map(|p| nearest_centroid(p, centroids))
        .collect()
}

/// Ties go to the lowest cluster index
fn nearest_centroid(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn farthest_point(distances: &[f64]) -> usize {
    let mut best = 0;
    for (i, &d) in distances.iter().enumerate() {
        if d > distances[best] {
            best = i;
        }
    }
    best
}

#[inline]
fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}
