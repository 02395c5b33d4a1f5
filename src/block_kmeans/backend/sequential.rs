use ndarray::{Array1, Array2, ArrayView2, Zip};

use super::{
    accumulate_into, closest_centroid, lloyd, ClusteringBackend, Convergence, Kernels, Refinement,
};
use crate::dataset::Float;

/// Refines every block on the calling thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sequential;

impl<'a, F: Float> Kernels<'a, F> for Sequential {
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
        let mut n_changed = 0;
        Zip::from(observations.rows())
            .and(memberships)
            .and(dists)
            .for_each(|observation, membership, dist| {
                let (closest, distance) = closest_centroid(centroids, &observation);
                if *membership != closest {
                    n_changed += 1;
                }
                *membership = closest;
                *dist = distance;
            });
        n_changed
    }

    fn accumulate(
        &self,
        observations: &Self::Prepared,
        memberships: &Array1<usize>,
        n_clusters: usize,
    ) -> (Array2<F>, Array1<usize>) {
        let mut sums = Array2::zeros((n_clusters, observations.ncols()));
        let mut counts = Array1::zeros(n_clusters);
        accumulate_into(observations, memberships, &mut sums, &mut counts);
        (sums, counts)
    }
}

impl<F: Float> ClusteringBackend<F> for Sequential {
    fn refine(
        &self,
        observations: ArrayView2<'_, F>,
        centroids: Array2<F>,
        convergence: &Convergence<F>,
    ) -> Refinement<F> {
        lloyd(self, observations, centroids, convergence)
    }
}
