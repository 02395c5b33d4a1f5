use std::collections::TryReserveError;

use thiserror::Error;

/// An error when fitting with an invalid hyperparameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockKMeansParamsError {
    #[error("n_clusters must be larger than 1")]
    NClusters,
    #[error("tolerance must be a finite, non-negative fraction")]
    Tolerance,
    #[error("max_n_iterations cannot be 0")]
    MaxIterations,
    #[error("split cannot be 0")]
    Split,
}

/// An error when seeding the initial centroids
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    /// More centroids requested than there are observations to seed them from
    #[error("cannot seed {n_clusters} centroids from a block of {n_points} observations")]
    TooManyClusters { n_clusters: usize, n_points: usize },
    #[error("unknown initialization method `{0}`")]
    UnknownMethod(String),
    #[error("precomputed centroids have shape {found:?}, expected {expected:?}")]
    PrecomputedShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// An error when running the block k-means driver
#[derive(Error, Debug)]
pub enum BlockKMeansError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] BlockKMeansParamsError),
    #[error("Initialization failed: {0}")]
    Init(#[from] InitError),
    #[error("the dataset contains no observations")]
    EmptyDataset,
    #[error("observations have no coordinates")]
    NoFeatures,
    #[error("cannot split {n_objs} observations into {split} blocks")]
    SplitTooLarge { split: usize, n_objs: usize },
    #[error("cannot allocate the membership buffer: {0}")]
    Allocation(#[from] TryReserveError),
    /// A block source handed out a block other than the one requested
    #[error(
        "expected {expected_len} observations at offset {expected_offset}, got {len} at {offset}"
    )]
    MisplacedBlock {
        expected_offset: usize,
        expected_len: usize,
        offset: usize,
        len: usize,
    },
    /// A slot of the global membership array was never written. Indicates a broken block source.
    #[error("observation {index} has not been assigned to any cluster")]
    Unassigned { index: usize },
    #[error(transparent)]
    BlockmeansError(#[from] crate::error::Error),
}

impl BlockKMeansError {
    /// Whether the error stems from the configuration rather than the data or the environment
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BlockKMeansError::InvalidParams(_)
                | BlockKMeansError::Init(_)
                | BlockKMeansError::EmptyDataset
                | BlockKMeansError::NoFeatures
                | BlockKMeansError::SplitTooLarge { .. }
        )
    }
}
