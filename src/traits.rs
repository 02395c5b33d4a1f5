//! Provide traits for the streaming clustering pipeline
//!
//! The pipeline is assembled from three seams:
//! * `BlockSource` hands out consecutive blocks of a dataset, see [`crate::io`]
//! * `ClusteringBackend` refines a centroid set on one block, see [`crate::block_kmeans`]
//! * `FitBlocks` drives a source to completion and returns the fitted model
//!

/// Fittable algorithms consuming a block source
///
/// The source is consumed sequentially: once `fit_blocks` returns it has been read to its end
/// (or to the point of failure) and has to be reopened before it can be fitted again.
pub trait FitBlocks<S, E: std::error::Error> {
    type Object;

    fn fit_blocks(&self, source: &mut S) -> Result<Self::Object, E>;
}

/// Assign observations to the nearest entity of a fitted model
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}
