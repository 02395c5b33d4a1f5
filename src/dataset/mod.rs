//! Blocks of observations
//!
//! A dataset too large for memory is consumed as a sequence of non-overlapping [`DataBlock`]s.
//! This module holds the floating point bound shared by every algorithm in the crate, the block
//! type handed to the clustering backends, the [`BlockPlan`] deciding how a dataset is cut into
//! blocks and the global [`Memberships`] buffer the blocks are merged into.
use ndarray::{Array2, ArrayView2, NdFloat};

use num_traits::NumAssignOps;
use rand::distributions::uniform::SampleUniform;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;
use std::str::FromStr;

mod memberships;
mod plan;

pub use memberships::Memberships;
pub use plan::{BlockPlan, BlockSpan};

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. Records, centroids and distances all share
/// the same float type.
pub trait Float:
    NdFloat
    + NumAssignOps
    + Default
    + Sum
    + FromStr
    + SampleUniform
    + for<'a> AddAssign<&'a Self>
    + fmt::Display
    + fmt::Debug
{
    /// Lossless for counts below the mantissa width, which covers every block we can hold
    fn from_count(n: usize) -> Self;

    /// Conversion from the on-disk representation of the binary format
    fn from_f32(v: f32) -> Self;

    /// Conversion of constants, rounding to the nearest `f32` where needed
    fn from_f64(v: f64) -> Self;
}

impl Float for f32 {
    fn from_count(n: usize) -> Self {
        n as f32
    }

    fn from_f32(v: f32) -> Self {
        v
    }

    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Float for f64 {
    fn from_count(n: usize) -> Self {
        n as f64
    }

    fn from_f32(v: f32) -> Self {
        f64::from(v)
    }

    fn from_f64(v: f64) -> Self {
        v
    }
}

/// Number of observations and coordinates of a dataset, as announced by its header
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub n_objs: usize,
    pub n_coords: usize,
}

/// A contiguous run of observations
///
/// The block owns its records, with shape `(n_observations, n_coords)`, and remembers where its
/// first observation sits in the global dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBlock<F> {
    offset: usize,
    records: Array2<F>,
}

impl<F: Float> DataBlock<F> {
    pub fn new(offset: usize, records: Array2<F>) -> Self {
        DataBlock { offset, records }
    }

    /// Global index of the first observation of the block
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of observations in the block
    pub fn len(&self) -> usize {
        self.records.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.records.nrows() == 0
    }

    pub fn n_coords(&self) -> usize {
        self.records.ncols()
    }

    pub fn records(&self) -> ArrayView2<'_, F> {
        self.records.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn block_reports_its_extent() {
        let block = DataBlock::new(5, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(block.offset(), 5);
        assert_eq!(block.len(), 3);
        assert_eq!(block.n_coords(), 2);
        assert!(!block.is_empty());
        assert_eq!(block.records().row(2).to_vec(), vec![5.0, 6.0]);
    }

    #[test]
    fn counts_convert_exactly() {
        assert_eq!(f32::from_count(12), 12.0);
        assert_eq!(f64::from_count(1 << 40), (1u64 << 40) as f64);
        assert_eq!(f64::from_f32(0.5), 0.5);
    }
}
