//! Refinement of a centroid set on a single block
//!
//! Every backend runs the same Lloyd iteration and differs only in where the work happens:
//!
//! 1. each observation is assigned to its nearest centroid by Euclidean distance, ties going to
//!    the lowest centroid index;
//! 2. each centroid moves to the mean of the observations assigned to it. A centroid without
//!    observations keeps its position;
//! 3. both steps repeat until the fraction of observations that changed cluster is at most the
//!    tolerance, or the iteration cap is reached.
//!
//! The returned centroids are always the means of the returned memberships: if the final
//! assignment still moved observations, the centroids are updated once more.
//!
//! The seed centroids are used for an initial assignment that the first iteration compares
//! against, so a block whose seeds already sit at a fixed point converges after one iteration.
//!
//! The backends produce the same memberships and centroids up to the order of floating point
//! accumulation: [`Sequential`] uses a single thread, [`ThreadParallel`] splits the assignment
//! and the reduction across the rayon thread pool and [`Accelerator`] expresses both steps as
//! kernels of a [`ComputeDevice`].
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, DataMut, Ix1, Ix2, Zip};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use crate::dataset::Float;

mod accelerator;
mod parallel;
mod sequential;

pub use accelerator::{Accelerator, ComputeDevice, DeviceBuffer, HostDevice, THREADS_PER_BLOCK};
pub use parallel::ThreadParallel;
pub use sequential::Sequential;

/// When a block's refinement stops
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence<F> {
    /// Largest fraction of reassigned observations still considered stable
    pub tolerance: F,
    pub max_n_iterations: u64,
}

impl<F: Float> Convergence<F> {
    pub fn new(tolerance: F, max_n_iterations: u64) -> Self {
        Convergence {
            tolerance,
            max_n_iterations,
        }
    }

    /// Whether an iteration reassigning `n_changed` of `n_points` observations is stable
    pub fn is_converged(&self, n_changed: usize, n_points: usize) -> bool {
        n_points == 0 || F::from_count(n_changed) / F::from_count(n_points) <= self.tolerance
    }
}

/// Outcome of refining a centroid set on one block
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Refinement<F> {
    /// Mean of the observations of every cluster under `memberships`, shape
    /// `(n_clusters, n_coords)`. Clusters without observations keep their previous position.
    pub centroids: Array2<F>,
    /// Cluster of every observation of the block, with respect to `centroids`
    pub memberships: Array1<usize>,
    pub n_iterations: u64,
    /// Sum of squared distances of the observations to their centroid: first for the seed
    /// centroids, then after the assignment step of every iteration. Never increases.
    pub inertia_history: Vec<F>,
}

impl<F: Float> Refinement<F> {
    /// Sum of squared distances after the last iteration
    pub fn inertia(&self) -> F {
        self.inertia_history.last().copied().unwrap_or_else(F::zero)
    }
}

/// A strategy for refining centroids on a block of observations
pub trait ClusteringBackend<F: Float> {
    /// Refines `centroids`, with shape `(n_clusters, n_coords)`, on `observations`, with shape
    /// `(n_observations, n_coords)`.
    ///
    /// The centroid set is taken by value and a new one is returned.
    ///
    /// # Panics
    ///
    /// If centroids and observations disagree on the number of coordinates.
    fn refine(
        &self,
        observations: ArrayView2<'_, F>,
        centroids: Array2<F>,
        convergence: &Convergence<F>,
    ) -> Refinement<F>;
}

/// The two steps a backend has to provide to run the Lloyd iteration
pub(crate) trait Kernels<'a, F: Float> {
    /// Block specific state, e.g. a copy of the observations on a device
    type Prepared;

    fn prepare(&self, observations: ArrayView2<'a, F>) -> Self::Prepared;

    /// Reassigns every observation to its closest centroid, writing the squared distance to it
    /// in `dists`, and returns how many observations changed cluster.
    fn assign(
        &self,
        prepared: &Self::Prepared,
        centroids: &Array2<F>,
        memberships: &mut Array1<usize>,
        dists: &mut Array1<F>,
    ) -> usize;

    /// Per cluster sums of the assigned observations and their counts
    fn accumulate(
        &self,
        prepared: &Self::Prepared,
        memberships: &Array1<usize>,
        n_clusters: usize,
    ) -> (Array2<F>, Array1<usize>);
}

/// Lloyd iteration on top of a set of kernels
pub(crate) fn lloyd<'a, F: Float, K: Kernels<'a, F>>(
    kernels: &K,
    observations: ArrayView2<'a, F>,
    mut centroids: Array2<F>,
    convergence: &Convergence<F>,
) -> Refinement<F> {
    assert_eq!(
        observations.ncols(),
        centroids.ncols(),
        "Centroids and observations must have the same number of coordinates."
    );
    let n_points = observations.nrows();
    let n_clusters = centroids.nrows();
    let prepared = kernels.prepare(observations);

    let mut memberships = Array1::zeros(n_points);
    let mut dists = Array1::zeros(n_points);
    kernels.assign(&prepared, &centroids, &mut memberships, &mut dists);
    let mut inertia_history = vec![dists.sum()];

    let mut n_iterations = 0;
    let mut n_changed = 0;
    while n_iterations < convergence.max_n_iterations {
        n_iterations += 1;
        let (sums, counts) = kernels.accumulate(&prepared, &memberships, n_clusters);
        centroids = compute_centroids(&centroids, sums, &counts);
        n_changed = kernels.assign(&prepared, &centroids, &mut memberships, &mut dists);
        inertia_history.push(dists.sum());
        if convergence.is_converged(n_changed, n_points) {
            break;
        }
    }
    // the last assignment moved observations: bring the centroids back to their means
    if n_changed > 0 {
        let (sums, counts) = kernels.accumulate(&prepared, &memberships, n_clusters);
        centroids = compute_centroids(&centroids, sums, &counts);
    }

    Refinement {
        centroids,
        memberships,
        n_iterations,
        inertia_history,
    }
}

/// Turns per cluster sums into means. Clusters without observations keep their old centroid.
pub(crate) fn compute_centroids<F: Float>(
    old_centroids: &Array2<F>,
    mut sums: Array2<F>,
    counts: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Array2<F> {
    Zip::from(sums.rows_mut())
        .and(old_centroids.rows())
        .and(counts)
        .for_each(|mut centroid, old, &cnt| {
            if cnt == 0 {
                centroid.assign(&old);
            } else {
                centroid /= F::from_count(cnt);
            }
        });
    sums
}

/// Adds every observation to the row of its cluster in `sums` and counts it
pub(crate) fn accumulate_into<F: Float>(
    observations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
    sums: &mut Array2<F>,
    counts: &mut Array1<usize>,
) {
    Zip::from(observations.rows())
        .and(memberships)
        .for_each(|observation, &cluster| {
            let mut sum = sums.row_mut(cluster);
            sum += &observation;
            counts[cluster] += 1;
        });
}

/// Squared Euclidean distance. Clustering is Euclidean only, so there is no pluggable metric to
/// dispatch on.
pub(crate) fn sq_l2_dist<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix1>,
    b: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> F {
    a.iter().zip(b.iter()).fold(F::zero(), |acc, (&a, &b)| {
        let d = a - b;
        acc + d * d
    })
}

/// Given a matrix of centroids with shape (n_centroids, n_coords) and an observation,
/// return the index of the closest centroid (the index of the corresponding row in `centroids`)
/// and the squared distance to it. Ties go to the lowest index.
pub(crate) fn closest_centroid<F: Float>(
    // (n_centroids, n_coords)
    centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    // (n_coords)
    observation: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> (usize, F) {
    let mut iterator = centroids.rows().into_iter().enumerate();
    let (mut closest_index, mut minimum_distance) = match iterator.next() {
        Some((_, first)) => (0, sq_l2_dist(&first, observation)),
        None => return (0, F::infinity()),
    };

    for (centroid_index, centroid) in iterator {
        let distance = sq_l2_dist(&centroid, observation);
        if distance < minimum_distance {
            closest_index = centroid_index;
            minimum_distance = distance;
        }
    }
    (closest_index, minimum_distance)
}

// Updates `dists` with the squared distance of each observation from its closest centroid.
pub(crate) fn update_min_dists<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    dists: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>,
) {
    Zip::from(observations.axis_iter(Axis(0)))
        .and(dists)
        .par_for_each(|observation, dist| *dist = closest_centroid(centroids, &observation).1);
}

/// Update `memberships` with the index of the cluster each observation belongs to.
pub(crate) fn update_cluster_memberships<F: Float>(
    centroids: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    observations: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    memberships: &mut ArrayBase<impl DataMut<Elem = usize>, Ix1>,
) {
    Zip::from(observations.axis_iter(Axis(0)))
        .and(memberships)
        .par_for_each(|observation, membership| {
            *membership = closest_centroid(centroids, &observation).0
        });
}

/// The backends shipped with the crate, selected once when the driver is configured
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Backend {
    /// Single threaded
    Sequential,
    /// Data parallel on the rayon thread pool
    ThreadParallel,
    /// Kernels on a compute device, the host device unless configured otherwise
    AcceleratorOffload,
}

impl<F: Float> ClusteringBackend<F> for Backend {
    fn refine(
        &self,
        observations: ArrayView2<'_, F>,
        centroids: Array2<F>,
        convergence: &Convergence<F>,
    ) -> Refinement<F> {
        match self {
            Backend::Sequential => Sequential.refine(observations, centroids, convergence),
            Backend::ThreadParallel => {
                ThreadParallel::default().refine(observations, centroids, convergence)
            }
            Backend::AcceleratorOffload => {
                Accelerator::new(HostDevice).refine(observations, centroids, convergence)
            }
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Sequential => "sequential",
            Backend::ThreadParallel => "thread-parallel",
            Backend::AcceleratorOffload => "accelerator",
        };
        f.write_str(name)
    }
}

/// A backend name that matches none of the known backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown backend `{}`, expected one of seq, omp, cuda (or 0, 1, 2)",
            self.0
        )
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for Backend {
    type Err = UnknownBackend;

    /// Accepts the historical names (`seq`, `omp`, `cuda`), the numeric codes `0`, `1`, `2` and
    /// the descriptive names used by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "seq" | "sequential" => Ok(Backend::Sequential),
            "1" | "omp" | "parallel" | "thread-parallel" | "threads" => Ok(Backend::ThreadParallel),
            "2" | "cuda" | "gpu" | "accelerator" => Ok(Backend::AcceleratorOffload),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_isaac::Isaac64Rng;

    #[test]
    fn test_min_dists() {
        let centroids = array![[0.0, 1.0], [40.0, 10.0]];
        let observations = array![[3.0, 4.0], [1.0, 3.0], [25.0, 15.0]];
        let mut dists = Array1::zeros(observations.nrows());

        update_min_dists(&centroids, &observations, &mut dists);
        assert_abs_diff_eq!(dists, array![18.0, 5.0, 250.0]);
    }

    #[test]
    // An observation is closest to itself.
    fn nothing_is_closer_than_self() {
        let n_centroids = 20;
        let n_coords = 5;
        let mut rng = Isaac64Rng::seed_from_u64(42);
        let centroids: Array2<f64> = Array::random_using(
            (n_centroids, n_coords),
            Uniform::new(-100., 100.),
            &mut rng,
        );

        let mut memberships = Array1::zeros(n_centroids);
        update_cluster_memberships(&centroids, &centroids, &mut memberships);
        let expected_memberships = (0..n_centroids).collect::<Array1<_>>();
        assert_eq!(memberships, expected_memberships);
    }

    #[test]
    fn oracle_test_for_closest_centroid() {
        let centroids = array![[0., 0.], [1., 2.], [20., 0.], [0., 20.],];
        let observations = array![[1., 0.6], [20., 2.], [20., 0.], [7., 20.],];
        let mut memberships = Array1::zeros(observations.nrows());
        update_cluster_memberships(&centroids, &observations, &mut memberships);
        assert_eq!(memberships, array![0, 2, 2, 3]);
    }

    #[test]
    fn ties_go_to_the_lowest_index() {
        let centroids = array![[0., 0.], [10., 10.], [0., 0.]];
        assert_eq!(closest_centroid(&centroids, &array![5., 5.]).0, 0);
        assert_eq!(closest_centroid(&centroids, &array![-1., 0.]).0, 0);
    }

    #[test]
    fn empty_clusters_keep_their_centroid() {
        let observations = array![[1.0, 2.0], [3.0, 4.0]];
        let memberships = array![0, 0];
        let old_centroids: Array2<f64> = array![[0.0, 0.0], [7.0, 7.0]];
        let mut sums = Array2::zeros((2, 2));
        let mut counts = Array1::zeros(2);
        accumulate_into(&observations, &memberships, &mut sums, &mut counts);
        let centroids = compute_centroids(&old_centroids, sums, &counts);
        assert_abs_diff_eq!(centroids, array![[2.0, 3.0], [7.0, 7.0]]);
        assert!(centroids.iter().all(|v| v.is_finite()));
    }

    fn assert_centroids_are_means(refinement: &Refinement<f64>, observations: &Array2<f64>) {
        for (cluster, centroid) in refinement.centroids.rows().into_iter().enumerate() {
            let members: Vec<usize> = refinement
                .memberships
                .iter()
                .enumerate()
                .filter(|(_, m)| **m == cluster)
                .map(|(i, _)| i)
                .collect();
            if !members.is_empty() {
                let mean = observations
                    .select(Axis(0), &members)
                    .mean_axis(Axis(0))
                    .unwrap();
                assert_abs_diff_eq!(centroid, mean.view(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn centroids_follow_a_converged_reassignment() {
        let observations: Array2<f64> = array![[0.], [1.], [2.], [10.]];
        let seeds = array![[0.], [1.]];
        // two of four observations move in the first iteration, within the tolerance
        let convergence = Convergence::new(0.5, 50);
        for backend in &[
            Backend::Sequential,
            Backend::ThreadParallel,
            Backend::AcceleratorOffload,
        ] {
            let refinement = backend.refine(observations.view(), seeds.clone(), &convergence);
            assert_eq!(refinement.n_iterations, 1);
            assert_eq!(refinement.memberships, array![0, 0, 0, 1]);
            assert_abs_diff_eq!(refinement.centroids, array![[1.], [10.]], epsilon = 1e-12);
            assert_centroids_are_means(&refinement, &observations);
        }
    }

    #[test]
    fn centroids_follow_the_assignment_at_the_iteration_cap() {
        let observations: Array2<f64> = array![[0.], [1.], [2.], [10.]];
        let refinement =
            Sequential.refine(observations.view(), array![[0.], [1.]], &Convergence::new(0., 1));
        assert_eq!(refinement.n_iterations, 1);
        assert_eq!(refinement.memberships, array![0, 0, 0, 1]);
        assert_abs_diff_eq!(refinement.centroids, array![[1.], [10.]], epsilon = 1e-12);

        let mut rng = Isaac64Rng::seed_from_u64(7);
        let observations: Array2<f64> =
            Array::random_using((200, 3), Uniform::new(-10., 10.), &mut rng);
        let seeds = observations.select(Axis(0), &[0, 1, 2, 3, 4]);
        for max_n_iterations in 1..4 {
            let refinement = ThreadParallel::default().refine(
                observations.view(),
                seeds.clone(),
                &Convergence::new(0., max_n_iterations),
            );
            assert_centroids_are_means(&refinement, &observations);
        }
    }

    #[test]
    fn convergence_is_a_fraction_of_the_block() {
        let convergence = Convergence::new(0.1, 50);
        assert!(convergence.is_converged(1, 10));
        assert!(!convergence.is_converged(2, 10));
        assert!(Convergence::new(0.0, 50).is_converged(0, 10));
        assert!(!Convergence::new(0.0, 50).is_converged(1, 1000));
    }

    #[test]
    fn backend_names() {
        assert_eq!("seq".parse::<Backend>(), Ok(Backend::Sequential));
        assert_eq!("OMP".parse::<Backend>(), Ok(Backend::ThreadParallel));
        assert_eq!("2".parse::<Backend>(), Ok(Backend::AcceleratorOffload));
        assert_eq!(
            "thread-parallel".parse::<Backend>(),
            Ok(Backend::ThreadParallel)
        );
        assert!("opencl".parse::<Backend>().is_err());
        for backend in &[
            Backend::Sequential,
            Backend::ThreadParallel,
            Backend::AcceleratorOffload,
        ] {
            assert_eq!(backend.to_string().parse::<Backend>().as_ref(), Ok(backend));
        }
    }
}
