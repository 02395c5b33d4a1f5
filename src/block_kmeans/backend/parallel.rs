use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use rayon::prelude::*;

use super::{
    accumulate_into, closest_centroid, lloyd, ClusteringBackend, Convergence, Kernels, Refinement,
};
use crate::dataset::Float;

/// Observations summed by one task of the centroid reduction
const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Refines every block on the rayon thread pool
///
/// Assignment runs one task per observation. The centroid update sums fixed size chunks of the
/// block in parallel and combines the partial sums in chunk order, so that a run is reproducible
/// whatever the number of threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadParallel {
    chunk_size: usize,
}

impl ThreadParallel {
    /// # Panics
    ///
    /// If `chunk_size` is zero.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        ThreadParallel { chunk_size }
    }
}

impl Default for ThreadParallel {
    fn default() -> Self {
        ThreadParallel {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl<'a, F: Float> Kernels<'a, F> for ThreadParallel {
    type Prepared = ArrayView2<'a, F>;

    fn prepare(&self, observations: ArrayView2<'a, F>) -> Self::Prepared {
        observations
    }

    fn assign(
        &self,
        observations: &Self::Prepared,
        centroids: &Array2<F>,
        memberships: &mut Array1<usize>,
        dists: &mut Array1<F>,
    ) -> usize {
        let n_changed = AtomicUsize::new(0);
        Zip::from(observations.axis_iter(Axis(0)))
            .and(memberships)
            .and(dists)
            .par_for_each(|observation, membership, dist| {
                let (closest, distance) = closest_centroid(centroids, &observation);
                if *membership != closest {
                    n_changed.fetch_add(1, Ordering::Relaxed);
                }
                *membership = closest;
                *dist = distance;
            });
        n_changed.into_inner()
    }

    fn accumulate(
        &self,
        observations: &Self::Prepared,
        memberships: &Array1<usize>,
        n_clusters: usize,
    ) -> (Array2<F>, Array1<usize>) {
        let n_coords = observations.ncols();
        let partials: Vec<(Array2<F>, Array1<usize>)> = observations
            .axis_chunks_iter(Axis(0), self.chunk_size)
            .into_par_iter()
            .zip(
                memberships
                    .axis_chunks_iter(Axis(0), self.chunk_size)
                    .into_par_iter(),
            )
            .map(|(chunk, chunk_memberships)| {
                let mut sums = Array2::zeros((n_clusters, n_coords));
                let mut counts = Array1::zeros(n_clusters);
                accumulate_into(&chunk, &chunk_memberships, &mut sums, &mut counts);
                (sums, counts)
            })
            .collect();

        partials.into_iter().fold(
            (
                Array2::zeros((n_clusters, n_coords)),
                Array1::zeros(n_clusters),
            ),
            |(mut sums, mut counts), (partial_sums, partial_counts)| {
                sums += &partial_sums;
                counts += &partial_counts;
                (sums, counts)
            },
        )
    }
}

impl<F: Float> ClusteringBackend<F> for ThreadParallel {
    fn refine(
        &self,
        observations: ArrayView2<'_, F>,
        centroids: Array2<F>,
        convergence: &Convergence<F>,
    ) -> Refinement<F> {
        lloyd(self, observations, centroids, convergence)
    }
}
