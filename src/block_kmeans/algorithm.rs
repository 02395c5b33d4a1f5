use std::path::Path;
use std::time::{Duration, Instant};

use crate::block_kmeans::backend::{update_cluster_memberships, ClusteringBackend, Convergence};
use crate::block_kmeans::errors::BlockKMeansError;
use crate::block_kmeans::hyperparams::{BlockKMeansParams, BlockKMeansValidParams, Verbosity};
use crate::dataset::{BlockPlan, Float, Memberships, Shape};
use crate::io::writer::ResultWriter;
use crate::io::BlockSource;
use crate::traits::{FitBlocks, Predict};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use rand::{Rng, SeedableRng};
use rand_isaac::Isaac64Rng;
use tracing::{debug, info, trace, warn};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// K-means clustering of a dataset streamed from disk one block at a time.
///
/// K-means partitions a set of unlabeled observations into clusters, each observation belonging
/// to the cluster with the nearest mean. The mean of the observations within a cluster is called
/// *centroid*.
///
/// ## Streaming
///
/// The dataset is cut into `split` contiguous blocks of `n_objs / split` observations, the final
/// block taking whatever is left. Only one block is held in memory at a time:
///
/// - the first block seeds the initial centroids, using one of the
///   [initialization methods](crate::block_kmeans::InitMethod);
/// - every block is then refined with Lloyd's algorithm, starting from the centroids the previous
///   block converged to;
/// - the memberships of each block are merged into a global membership array at the block's
///   offset.
///
/// The centroids returned are those of the final block, the memberships those computed by each
/// block when it was processed.
///
/// This design trades final-result precision for bounded memory: centroids converge per block,
/// not globally, so results depend on block ordering and block size. Larger/fewer blocks approach
/// the accuracy of a non-streaming k-means run; more/smaller blocks reduce memory and I/O cost
/// but increase sensitivity to the input's ordering.
///
/// ## Refinement
///
/// Within a block, observations are assigned to their closest centroid and centroids are moved to
/// the mean of their observations until at most a `tolerance` fraction of the observations changed
/// cluster during an iteration, or `max_n_iterations` is reached. Where this work happens is up to
/// the [backend](crate::block_kmeans::Backend).
///
/// ## Tutorial
///
/// ```
/// use blockmeans::block_kmeans::{BlockKMeans, InitMethod};
/// use blockmeans::io::ArraySource;
/// use blockmeans::prelude::*;
/// use ndarray::array;
///
/// let observations = array![
///     [0., 0.], [0., 1.], [1., 0.], [1., 1.], [10., 10.],
///     [10., 11.], [11., 10.], [11., 11.], [5., 5.], [5., 6.],
/// ];
///
/// let model = BlockKMeans::params(2)
///     .init_method(InitMethod::Precomputed(array![[0., 0.], [10., 10.]]))
///     .split(2)
///     .fit_blocks(&mut ArraySource::new(&observations))
///     .expect("the dataset can be clustered");
///
/// assert_eq!(model.n_blocks(), 2);
/// assert_eq!(model.memberships().len(), 10);
/// assert_eq!(model.predict(&array![[0.5, 0.5]]), array![0]);
/// ```
pub struct BlockKMeans<F: Float> {
    centroids: Array2<F>,
    memberships: Array1<usize>,
    cluster_count: Array1<usize>,
    block_reports: Vec<BlockReport<F>>,
    timings: Timings,
    inertia: F,
}

/// What happened to a single block
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct BlockReport<F> {
    pub index: usize,
    /// Global index of the block's first observation
    pub offset: usize,
    pub len: usize,
    pub n_iterations: u64,
    /// Sum of squared distances of the block's observations to their centroid
    pub inertia: F,
}

/// Wall clock time spent reading blocks and refining them
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    pub io: Duration,
    pub compute: Duration,
}

impl<F: Float> BlockKMeans<F> {
    pub fn params(n_clusters: usize) -> BlockKMeansParams<F, Isaac64Rng> {
        BlockKMeansParams::new(n_clusters, Isaac64Rng::seed_from_u64(42))
    }

    pub fn params_with_rng<R: Rng>(n_clusters: usize, rng: R) -> BlockKMeansParams<F, R> {
        BlockKMeansParams::new(n_clusters, rng)
    }

    /// Return the set of centroids as a 2-dimensional matrix with shape
    /// `(n_clusters, n_coords)`.
    pub fn centroids(&self) -> &Array2<F> {
        &self.centroids
    }

    /// Cluster of every observation of the dataset, in file order
    pub fn memberships(&self) -> &Array1<usize> {
        &self.memberships
    }

    /// Return the number of observations belonging to each cluster
    pub fn cluster_count(&self) -> &Array1<usize> {
        &self.cluster_count
    }

    pub fn n_blocks(&self) -> usize {
        self.block_reports.len()
    }

    pub fn block_reports(&self) -> &[BlockReport<F>] {
        &self.block_reports
    }

    /// Iterations performed on the final block
    pub fn n_iterations(&self) -> u64 {
        self.block_reports
            .last()
            .map(|report| report.n_iterations)
            .unwrap_or(0)
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    /// Return the squared distance between each observation of the final block and its closest
    /// centroid, averaged across the block.
    pub fn inertia(&self) -> F {
        self.inertia
    }
}

impl<F: Float, R: Rng + Clone> BlockKMeansValidParams<F, R> {
    /// Fits `source` with a backend other than the configured one, e.g. an
    /// [`Accelerator`](crate::block_kmeans::Accelerator) over a custom device.
    pub fn fit_blocks_with<S, B>(
        &self,
        source: &mut S,
        backend: &B,
    ) -> Result<BlockKMeans<F>, BlockKMeansError>
    where
        S: BlockSource<F>,
        B: ClusteringBackend<F>,
    {
        let mut rng = self.rng().clone();
        let mut timings = Timings::default();
        let verbosity = self.verbosity();

        let start = Instant::now();
        let Shape { n_objs, n_coords } = source.read_head()?;
        timings.io += start.elapsed();
        if n_objs == 0 {
            return Err(BlockKMeansError::EmptyDataset);
        }
        if n_coords == 0 {
            return Err(BlockKMeansError::NoFeatures);
        }
        let plan = BlockPlan::new(n_objs, self.split()).ok_or(BlockKMeansError::SplitTooLarge {
            split: self.split(),
            n_objs,
        })?;
        let n_blocks = plan.n_blocks();
        let mut memberships = Memberships::unassigned(n_objs)?;
        let convergence = Convergence::new(self.tolerance(), self.max_n_iterations());

        let mut centroids: Option<Array2<F>> = None;
        let mut block_reports = Vec::with_capacity(n_blocks);
        let mut mean_inertia = F::zero();

        for span in plan.spans() {
            let start = Instant::now();
            let block = source.read_block(span.len)?;
            timings.io += start.elapsed();
            if block.offset() != span.offset || block.len() != span.len {
                return Err(BlockKMeansError::MisplacedBlock {
                    expected_offset: span.offset,
                    expected_len: span.len,
                    offset: block.offset(),
                    len: block.len(),
                });
            }
            if verbosity >= Verbosity::Basic {
                info!(
                    "data block {} of {} - number of objects {}",
                    span.index + 1,
                    n_blocks,
                    span.len
                );
            }

            let start = Instant::now();
            let seeds = match centroids.take() {
                Some(centroids) => centroids,
                None => self
                    .init_method()
                    .run(self.n_clusters(), &block.records(), &mut rng)?,
            };
            let refinement = backend.refine(block.records(), seeds, &convergence);
            timings.compute += start.elapsed();

            let inertia = refinement.inertia();
            if verbosity >= Verbosity::Debug {
                for (iteration, inertia) in refinement.inertia_history.iter().enumerate().skip(1) {
                    trace!(
                        "block {} iteration {}: inertia {}",
                        span.index + 1,
                        iteration,
                        inertia
                    );
                }
                debug!(
                    "block {} converged after {} iterations, inertia {}",
                    span.index + 1,
                    refinement.n_iterations,
                    inertia
                );
            }
            memberships.write_block(span.offset, &refinement.memberships);
            block_reports.push(BlockReport {
                index: span.index,
                offset: span.offset,
                len: span.len,
                n_iterations: refinement.n_iterations,
                inertia,
            });
            mean_inertia = inertia / F::from_count(span.len);

            if let (Some(base), false) = (self.checkpoint(), span.is_final) {
                write_checkpoint(
                    base,
                    span.index + 1,
                    &refinement.centroids,
                    &memberships,
                    verbosity,
                );
            }
            centroids = Some(refinement.centroids);
        }

        let centroids = centroids.ok_or(BlockKMeansError::EmptyDataset)?;
        let memberships = memberships
            .finish()
            .map_err(|index| BlockKMeansError::Unassigned { index })?;
        let mut cluster_count = Array1::zeros(self.n_clusters());
        memberships.iter().for_each(|&c| cluster_count[c] += 1);

        Ok(BlockKMeans {
            centroids,
            memberships,
            cluster_count,
            block_reports,
            timings,
            inertia: mean_inertia,
        })
    }
}

/// Best effort: a checkpoint that cannot be written is reported and skipped.
fn write_checkpoint<F: Float>(
    base: &Path,
    block_number: usize,
    centroids: &Array2<F>,
    memberships: &Memberships,
    verbosity: Verbosity,
) {
    let writer = ResultWriter::checkpoint(base, block_number);
    match writer.write_partial(centroids, memberships) {
        Ok(()) if verbosity >= Verbosity::Debug => {
            debug!("checkpoint written to {}", writer.base().display())
        }
        Ok(()) => {}
        Err(err) => warn!(
            "cannot write checkpoint {}: {}",
            writer.base().display(),
            err
        ),
    }
}

impl<F: Float, R: Rng + Clone, S: BlockSource<F>> FitBlocks<S, BlockKMeansError>
    for BlockKMeansValidParams<F, R>
{
    type Object = BlockKMeans<F>;

    /// Reads `source` block by block and clusters it with the configured backend.
    ///
    /// Fails if the dataset is empty, if it cannot be split into the requested number of blocks,
    /// if the first block cannot seed `n_clusters` centroids or if the source fails.
    fn fit_blocks(&self, source: &mut S) -> Result<Self::Object, BlockKMeansError> {
        self.fit_blocks_with(source, &self.backend())
    }
}

impl<F: Float, DA: Data<Elem = F>> Predict<&ArrayBase<DA, Ix2>, Array1<usize>> for BlockKMeans<F> {
    /// Given an input matrix `observations`, with shape `(n_observations, n_coords)`,
    /// `predict` returns, for each observation, the index of the closest cluster/centroid.
    ///
    /// You can retrieve the centroid associated to an index using the
    /// [`centroids` method](BlockKMeans::centroids).
    fn predict(&self, observations: &ArrayBase<DA, Ix2>) -> Array1<usize> {
        assert_eq!(
            observations.ncols(),
            self.centroids.ncols(),
            "The number of data points must match the number of centroid coordinates."
        );
        let mut memberships = Array1::zeros(observations.nrows());
        update_cluster_memberships(&self.centroids, &observations.view(), &mut memberships);
        memberships
    }
}

impl<F: Float, DA: Data<Elem = F>> Predict<&ArrayBase<DA, Ix1>, usize> for BlockKMeans<F> {
    /// Index of the centroid closest to `observation`
    fn predict(&self, observation: &ArrayBase<DA, Ix1>) -> usize {
        crate::block_kmeans::backend::closest_centroid(&self.centroids, observation).0
    }
}
