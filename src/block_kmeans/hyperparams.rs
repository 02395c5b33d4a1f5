use std::path::{Path, PathBuf};

use crate::block_kmeans::{Backend, BlockKMeansParamsError, InitMethod};
use crate::dataset::Float;
use crate::param_guard::ParamGuard;
use rand::Rng;
use tracing::warn;

/// Maximum number of refinement iterations per block when nothing else is configured
pub const MAX_ITER: u64 = 50;

/// How chatty the driver is about its progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Nothing but warnings
    Quiet,
    /// One message per block
    Basic,
    /// Per block messages plus convergence details and checkpoint notices
    Debug,
}

impl Verbosity {
    /// Maps the numeric levels `0`, `1` and `2` (and anything above) to a verbosity
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Quiet,
            1 => Verbosity::Basic,
            _ => Verbosity::Debug,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Quiet
    }
}

#[derive(Clone, Debug, PartialEq)]
/// The set of hyperparameters that can be specified for the execution of
/// the [block k-means driver](crate::block_kmeans::BlockKMeans).
pub struct BlockKMeansValidParams<F: Float, R: Rng> {
    /// The number of clusters we will be looking for in the dataset.
    n_clusters: usize,
    /// A block's refinement stops once the fraction of observations that changed cluster during
    /// an iteration is lower or equal than `tolerance`.
    tolerance: F,
    /// A block's refinement also stops after `max_n_iterations` iterations, converged or not.
    max_n_iterations: u64,
    /// The number of blocks the dataset is split into.
    split: usize,
    /// The initialization strategy used to seed the centroids from the first block.
    init: InitMethod<F>,
    /// Where the refinement of each block runs.
    backend: Backend,
    verbosity: Verbosity,
    /// Base path of the per block checkpoints, `None` disables them.
    checkpoint: Option<PathBuf>,
    /// The random number generator
    rng: R,
}

#[derive(Clone, Debug, PartialEq)]
/// An helper struct used to construct a set of [valid hyperparameters](BlockKMeansValidParams)
/// for the [block k-means driver](crate::block_kmeans::BlockKMeans) (using the builder pattern).
pub struct BlockKMeansParams<F: Float, R: Rng>(BlockKMeansValidParams<F, R>);

impl<F: Float, R: Rng> BlockKMeansParams<F, R> {
    /// `new` lets us configure our clustering parameters:
    /// * we will be looking for `n_clusters` in the dataset;
    /// * each block is refined until at most a `tolerance` fraction of its observations change
    ///   cluster in one iteration;
    /// * we exit a block's refinement when the number of iterations exceeds
    ///   `max_n_iterations` even if the `tolerance` condition has not been met;
    /// * the dataset is read in `split` blocks, the centroids found on one block seeding the
    ///   refinement of the next.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `tolerance = 0.001`
    /// * `max_n_iterations = 50`
    /// * `split = 1`
    /// * `init = Random`
    /// * `backend = Sequential`
    /// * `verbosity = Quiet`, no checkpoints
    pub fn new(n_clusters: usize, rng: R) -> Self {
        Self(BlockKMeansValidParams {
            n_clusters,
            tolerance: F::from_f64(1e-3),
            max_n_iterations: MAX_ITER,
            split: 1,
            init: InitMethod::Random,
            backend: Backend::Sequential,
            verbosity: Verbosity::Quiet,
            checkpoint: None,
            rng,
        })
    }

    /// Change the value of `tolerance`
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Change the value of `max_n_iterations`
    pub fn max_n_iterations(mut self, max_n_iterations: u64) -> Self {
        self.0.max_n_iterations = max_n_iterations;
        self
    }

    /// Change the number of blocks the dataset is split into
    pub fn split(mut self, split: usize) -> Self {
        self.0.split = split;
        self
    }

    /// Change the value of `init`
    pub fn init_method(mut self, init: InitMethod<F>) -> Self {
        self.0.init = init;
        self
    }

    /// Selects the initialization method by name, see [`InitMethod::from_name`].
    ///
    /// Unknown names do not fail: a warning is emitted and random initialization is used
    /// instead, which is what existing callers of the command line tool rely on.
    pub fn init_method_named(mut self, name: &str) -> Self {
        self.0.init = InitMethod::from_name(name).unwrap_or_else(|err| {
            warn!("{}, using random initialization", err);
            InitMethod::Random
        });
        self
    }

    /// Change the backend refining each block
    pub fn backend(mut self, backend: Backend) -> Self {
        self.0.backend = backend;
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.0.verbosity = verbosity;
        self
    }

    /// Enable checkpoints: after every block but the last, centroids and the memberships found
    /// so far are written below `<base>.tmp-<block>`
    pub fn checkpoint(mut self, base: impl Into<PathBuf>) -> Self {
        self.0.checkpoint = Some(base.into());
        self
    }
}

impl<F: Float, R: Rng> ParamGuard for BlockKMeansParams<F, R> {
    type Checked = BlockKMeansValidParams<F, R>;
    type Error = BlockKMeansParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.n_clusters <= 1 {
            Err(BlockKMeansParamsError::NClusters)
        } else if !self.0.tolerance.is_finite() || self.0.tolerance < F::zero() {
            Err(BlockKMeansParamsError::Tolerance)
        } else if self.0.max_n_iterations == 0 {
            Err(BlockKMeansParamsError::MaxIterations)
        } else if self.0.split == 0 {
            Err(BlockKMeansParamsError::Split)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, R: Rng> BlockKMeansValidParams<F, R> {
    /// The number of clusters we will be looking for in the dataset.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Largest fraction of reassigned observations for which a block counts as converged.
    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    /// Cap on the refinement iterations of a single block.
    pub fn max_n_iterations(&self) -> u64 {
        self.max_n_iterations
    }

    pub fn split(&self) -> usize {
        self.split
    }

    /// Cluster initialization strategy
    pub fn init_method(&self) -> &InitMethod<F> {
        &self.init
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn checkpoint(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }

    /// Returns the random generator
    pub fn rng(&self) -> &R {
        &self.rng
    }
}

#[cfg(test)]
mod tests {
    use crate::block_kmeans::{
        Backend, BlockKMeans, BlockKMeansParams, BlockKMeansParamsError, BlockKMeansValidParams,
        InitMethod, Verbosity,
    };
    use crate::param_guard::ParamGuard;
    use rand_isaac::Isaac64Rng;

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<BlockKMeansParams<f64, Isaac64Rng>>();
        has_autotraits::<BlockKMeansValidParams<f64, Isaac64Rng>>();
    }

    #[test]
    fn defaults() {
        let params = BlockKMeans::<f64>::params(3).check().unwrap();
        assert_eq!(params.n_clusters(), 3);
        assert_eq!(params.tolerance(), 1e-3);
        assert_eq!(params.max_n_iterations(), 50);
        assert_eq!(params.split(), 1);
        assert_eq!(params.init_method(), &InitMethod::Random);
        assert_eq!(params.backend(), Backend::Sequential);
        assert_eq!(params.verbosity(), Verbosity::Quiet);
        assert!(params.checkpoint().is_none());
    }

    #[test]
    fn n_clusters_must_exceed_one() {
        let res = BlockKMeans::<f32>::params(0).check();
        assert!(matches!(res, Err(BlockKMeansParamsError::NClusters)));
        let res = BlockKMeans::<f32>::params(1).check();
        assert!(matches!(res, Err(BlockKMeansParamsError::NClusters)));
    }

    #[test]
    fn tolerance_cannot_be_negative() {
        let res = BlockKMeans::params(2).tolerance(-1.).check();
        assert!(matches!(res, Err(BlockKMeansParamsError::Tolerance)));
        let res = BlockKMeans::params(2).tolerance(f64::NAN).check();
        assert!(matches!(res, Err(BlockKMeansParamsError::Tolerance)));
    }

    #[test]
    fn tolerance_can_be_zero() {
        assert!(BlockKMeans::params(2).tolerance(0.).check().is_ok());
    }

    #[test]
    fn max_n_iterations_cannot_be_zero() {
        let res = BlockKMeans::params(2).tolerance(1.).max_n_iterations(0).check();
        assert!(matches!(res, Err(BlockKMeansParamsError::MaxIterations)));
    }

    #[test]
    fn split_cannot_be_zero() {
        let res = BlockKMeans::<f64>::params(2).split(0).check();
        assert!(matches!(res, Err(BlockKMeansParamsError::Split)));
    }

    #[test]
    fn unknown_init_method_falls_back_to_random() {
        let params = BlockKMeans::<f64>::params(2)
            .init_method_named("kpp")
            .init_method_named("farthest-first")
            .check_unwrap();
        assert_eq!(params.init_method(), &InitMethod::Random);

        let params = BlockKMeans::<f64>::params(2)
            .init_method_named("k++")
            .check_unwrap();
        assert_eq!(params.init_method(), &InitMethod::KMeansPlusPlus);
    }
}
