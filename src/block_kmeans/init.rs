use super::backend::update_min_dists;
use super::errors::InitError;
use crate::dataset::Float;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// Specifies centroid initialization algorithm for the block k-means driver.
///
/// The seeds are always drawn from the first block of the dataset, the only block available when
/// the run starts.
pub enum InitMethod<F: Float> {
    /// Pick `n_clusters` distinct observations of the first block uniformly at random and use
    /// them as initial centroids. Every coordinate of a centroid comes from the same donor
    /// observation.
    Random,
    /// K-means++ algorithm. The first centroid is drawn uniformly from the block, every further
    /// one with probability proportional to its squared distance to the closest centroid chosen
    /// so far.
    KMeansPlusPlus,
    /// Use a precomputed set of centroids, with shape `(n_clusters, n_coords)`, as initial
    /// centroids.
    Precomputed(Array2<F>),
}

impl<F: Float> InitMethod<F> {
    /// Parses an initialization method name.
    ///
    /// `random` (or `0`) and `kpp`, `k++`, `kmeans++` (or `1`) are recognised, ignoring case.
    pub fn from_name(name: &str) -> Result<Self, InitError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "random" | "0" => Ok(InitMethod::Random),
            "kpp" | "k++" | "kmeans++" | "k-means++" | "1" => Ok(InitMethod::KMeansPlusPlus),
            _ => Err(InitError::UnknownMethod(name.to_string())),
        }
    }

    /// Runs the chosen initialization routine on the first block, returning centroids with
    /// shape `(n_clusters, n_coords)`.
    pub fn run(
        &self,
        n_clusters: usize,
        observations: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
        rng: &mut impl Rng,
    ) -> Result<Array2<F>, InitError> {
        match self {
            Self::Precomputed(centroids) => {
                let expected = (n_clusters, observations.ncols());
                if centroids.dim() != expected {
                    return Err(InitError::PrecomputedShape {
                        expected,
                        found: centroids.dim(),
                    });
                }
                Ok(centroids.clone())
            }
            method => {
                let n_points = observations.nrows();
                if n_clusters > n_points {
                    return Err(InitError::TooManyClusters {
                        n_clusters,
                        n_points,
                    });
                }
                Ok(match method {
                    Self::KMeansPlusPlus => k_means_pp(n_clusters, observations, rng),
                    _ => random_init(n_clusters, observations, rng),
                })
            }
        }
    }
}

fn random_init<F: Float>(
    n_clusters: usize,
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rng: &mut impl Rng,
) -> Array2<F> {
    let indices = rand::seq::index::sample(rng, observations.nrows(), n_clusters).into_vec();
    observations.select(Axis(0), &indices)
}

fn k_means_pp<F: Float>(
    n_clusters: usize,
    observations: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    rng: &mut impl Rng,
) -> Array2<F> {
    let (n_samples, n_coords) = observations.dim();
    let mut centroids = Array2::zeros((n_clusters, n_coords));
    let n = rng.gen_range(0..n_samples);
    centroids.row_mut(0).assign(&observations.row(n));

    let mut dists = Array1::zeros(n_samples);
    for c_cnt in 1..n_clusters {
        update_min_dists(&centroids.slice(s![0..c_cnt, ..]), observations, &mut dists);
        // All weights vanish once every observation coincides with a chosen centroid
        let centroid_idx = match WeightedIndex::new(dists.iter()) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.gen_range(0..n_samples),
        };
        centroids
            .row_mut(c_cnt)
            .assign(&observations.row(centroid_idx));
    }
    centroids
}
