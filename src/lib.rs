//! `blockmeans` clusters datasets that do not fit in memory with k-means.
//!
//! ## The big picture
//!
//! The dataset is read from disk in contiguous blocks. The first block seeds the centroids, every
//! block refines the centroids handed over by the previous one and writes the memberships of its
//! observations into a global membership array. At most one block is resident at a time.
//!
//! This design trades final-result precision for bounded memory: centroids converge per block,
//! not globally, so results depend on block ordering and block size. Larger/fewer blocks approach
//! the accuracy of a non-streaming k-means run; more/smaller blocks reduce memory and I/O cost
//! but increase sensitivity to the input's ordering.
//!
//! ## Current state
//!
//! * [block k-means](block_kmeans::BlockKMeans), with random and k-means++ seeding
//! * three interchangeable refinement [backends](block_kmeans::Backend): single threaded, data
//!   parallel on rayon and kernels on a [compute device](block_kmeans::ComputeDevice)
//! * [block sources](io::BlockSource) for in-memory arrays, whitespace separated text files and
//!   the binary format, plus the [result files](io::writer::ResultWriter)
//! * [plot data](plot::ScatterPlot) for an external renderer
//!
//! The `blockmeans` binary wraps all of the above in a command line tool.

pub mod block_kmeans;
pub mod dataset;
pub mod error;
pub mod io;
mod param_guard;
pub mod plot;
pub mod prelude;
pub mod traits;
pub mod utils;

pub use dataset::{DataBlock, Float};
pub use param_guard::ParamGuard;
