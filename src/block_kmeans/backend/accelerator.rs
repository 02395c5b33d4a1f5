use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use rayon::prelude::*;

use super::{
    accumulate_into, closest_centroid, lloyd, ClusteringBackend, Convergence, Kernels, Refinement,
};
use crate::dataset::Float;

/// Observations handled by one work group
pub const THREADS_PER_BLOCK: usize = 512;

/// A block of observations resident in device memory, in row major order
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceBuffer<F> {
    records: Array2<F>,
}

impl<F: Float> DeviceBuffer<F> {
    pub fn records(&self) -> ArrayView2<'_, F> {
        self.records.view()
    }

    pub fn len(&self) -> usize {
        self.records.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A device running the two kernels of a Lloyd iteration
///
/// Kernels work on groups of [`work_group_size`](ComputeDevice::work_group_size) consecutive
/// observations. The assignment kernel reports the reassignments of each group and the reduction
/// kernel the per cluster sums of each group. Partial results are combined on the host, in group
/// order.
pub trait ComputeDevice<F: Float>: Sync {
    fn work_group_size(&self) -> usize {
        THREADS_PER_BLOCK
    }

    /// Copies a block to device memory. The copy lives as long as the block is being refined.
    fn upload(&self, observations: ArrayView2<'_, F>) -> DeviceBuffer<F> {
        DeviceBuffer {
            records: observations.as_standard_layout().into_owned(),
        }
    }

    /// Writes the closest centroid of every observation and its squared distance, returning the
    /// number of reassignments of every work group
    fn assign_kernel(
        &self,
        buffer: &DeviceBuffer<F>,
        centroids: ArrayView2<'_, F>,
        memberships: ArrayViewMut1<'_, usize>,
        dists: ArrayViewMut1<'_, F>,
    ) -> Vec<usize>;

    /// Per cluster sums and counts of every work group
    fn reduce_kernel(
        &self,
        buffer: &DeviceBuffer<F>,
        memberships: ArrayView1<'_, usize>,
        n_clusters: usize,
    ) -> Vec<(Array2<F>, Array1<usize>)>;
}

/// Runs the kernels on the host, one rayon task per work group
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostDevice;

impl<F: Float> ComputeDevice<F> for HostDevice {
    fn assign_kernel(
        &self,
        buffer: &DeviceBuffer<F>,
        centroids: ArrayView2<'_, F>,
        mut memberships: ArrayViewMut1<'_, usize>,
        mut dists: ArrayViewMut1<'_, F>,
    ) -> Vec<usize> {
        let group = <Self as ComputeDevice<F>>::work_group_size(self);
        buffer
            .records()
            .axis_chunks_iter(Axis(0), group)
            .into_par_iter()
            .zip(memberships.axis_chunks_iter_mut(Axis(0), group).into_par_iter())
            .zip(dists.axis_chunks_iter_mut(Axis(0), group).into_par_iter())
            .map(|((observations, mut memberships), mut dists)| {
                let mut n_changed = 0;
                for (i, observation) in observations.rows().into_iter().enumerate() {
                    let (closest, distance) = closest_centroid(&centroids, &observation);
                    if memberships[i] != closest {
                        n_changed += 1;
                    }
                    memberships[i] = closest;
                    dists[i] = distance;
                }
                n_changed
            })
            .collect()
    }

    fn reduce_kernel(
        &self,
        buffer: &DeviceBuffer<F>,
        memberships: ArrayView1<'_, usize>,
        n_clusters: usize,
    ) -> Vec<(Array2<F>, Array1<usize>)> {
        let group = <Self as ComputeDevice<F>>::work_group_size(self);
        let n_coords = buffer.records.ncols();
        buffer
            .records()
            .axis_chunks_iter(Axis(0), group)
            .into_par_iter()
            .zip(memberships.axis_chunks_iter(Axis(0), group).into_par_iter())
            .map(|(observations, memberships)| {
                let mut sums = Array2::zeros((n_clusters, n_coords));
                let mut counts = Array1::zeros(n_clusters);
                accumulate_into(&observations, &memberships, &mut sums, &mut counts);
                (sums, counts)
            })
            .collect()
    }
}

/// Offloads the refinement of every block to a [`ComputeDevice`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Accelerator<D> {
    device: D,
}

impl<D> Accelerator<D> {
    pub fn new(device: D) -> Self {
        Accelerator { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<'a, F: Float, D: ComputeDevice<F>> Kernels<'a, F> for Accelerator<D> {
    type Prepared = DeviceBuffer<F>;

    fn prepare(&self, observations: ArrayView2<'a, F>) -> Self::Prepared {
        self.device.upload(observations)
    }

    fn assign(
        &self,
        buffer: &Self::Prepared,
        centroids: &Array2<F>,
        memberships: &mut Array1<usize>,
        dists: &mut Array1<F>,
    ) -> usize {
        self.device
            .assign_kernel(
                buffer,
                centroids.view(),
                memberships.view_mut(),
                dists.view_mut(),
            )
            .into_iter()
            .sum()
    }

    fn accumulate(
        &self,
        buffer: &Self::Prepared,
        memberships: &Array1<usize>,
        n_clusters: usize,
    ) -> (Array2<F>, Array1<usize>) {
        let mut sums = Array2::zeros((n_clusters, buffer.records.ncols()));
        let mut counts = Array1::zeros(n_clusters);
        for (partial_sums, partial_counts) in
            self.device
                .reduce_kernel(buffer, memberships.view(), n_clusters)
        {
            sums += &partial_sums;
            counts += &partial_counts;
        }
        (sums, counts)
    }
}

impl<F: Float, D: ComputeDevice<F>> ClusteringBackend<F> for Accelerator<D> {
    fn refine(
        &self,
        observations: ArrayView2<'_, F>,
        centroids: Array2<F>,
        convergence: &Convergence<F>,
    ) -> Refinement<F> {
        lloyd(self, observations, centroids, convergence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s, Array};

    /// A device with tiny work groups, so that small blocks span several of them
    struct TinyGroups;

    impl ComputeDevice<f64> for TinyGroups {
        fn work_group_size(&self) -> usize {
            2
        }

        fn assign_kernel(
            &self,
            buffer: &DeviceBuffer<f64>,
            centroids: ArrayView2<'_, f64>,
            memberships: ArrayViewMut1<'_, usize>,
            dists: ArrayViewMut1<'_, f64>,
        ) -> Vec<usize> {
            HostDevice.assign_kernel(buffer, centroids, memberships, dists)
        }

        fn reduce_kernel(
            &self,
            buffer: &DeviceBuffer<f64>,
            memberships: ArrayView1<'_, usize>,
            n_clusters: usize,
        ) -> Vec<(Array2<f64>, Array1<usize>)> {
            let records = buffer.records();
            (0..buffer.len())
                .step_by(2)
                .map(|start| {
                    let end = (start + 2).min(buffer.len());
                    let mut sums = Array2::zeros((n_clusters, records.ncols()));
                    let mut counts = Array1::zeros(n_clusters);
                    accumulate_into(
                        &records.slice(s![start..end, ..]),
                        &memberships.slice(s![start..end]),
                        &mut sums,
                        &mut counts,
                    );
                    (sums, counts)
                })
                .collect()
        }
    }

    #[test]
    fn upload_keeps_rows_in_order() {
        let observations = Array::from_shape_vec((3, 2), vec![1., 2., 3., 4., 5., 6.]).unwrap();
        let buffer = ComputeDevice::<f64>::upload(&HostDevice, observations.t());
        assert_eq!(buffer.records(), observations.t());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn one_partial_result_per_work_group() {
        let observations = Array2::<f64>::zeros((THREADS_PER_BLOCK * 2 + 1, 2));
        let buffer = HostDevice.upload(observations.view());
        let memberships = Array1::zeros(observations.nrows());
        let partials = HostDevice.reduce_kernel(&buffer, memberships.view(), 3);
        assert_eq!(partials.len(), 3);
        assert_eq!(partials[2].1, array![1, 0, 0]);
    }

    #[test]
    fn custom_devices_refine_like_the_host() {
        let observations = array![[0., 0.], [0., 1.], [1., 0.], [9., 9.], [9., 8.]];
        let seeds = array![[0., 0.], [1., 0.]];
        let convergence = Convergence::new(0., 50);

        let host = Accelerator::new(HostDevice).refine(
            observations.view(),
            seeds.clone(),
            &convergence,
        );
        let tiny = Accelerator::new(TinyGroups).refine(observations.view(), seeds, &convergence);
        assert_eq!(host.memberships, tiny.memberships);
        assert_eq!(host.centroids, tiny.centroids);
        assert_eq!(host.memberships, array![0, 0, 0, 1, 1]);
    }
}
