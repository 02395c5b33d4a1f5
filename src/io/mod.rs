//! Reading datasets block by block and writing clustering results
//!
//! A [`BlockSource`] is a sequential cursor over a dataset. After announcing the dataset's
//! [`Shape`] it hands out consecutive, non-overlapping [`DataBlock`]s; there is no random access
//! and no way to re-read a block short of opening the source again. Three sources are provided:
//!
//! * [`ArraySource`] streams an array that is already in memory,
//! * [`TextSource`] reads one observation per line, coordinates separated by whitespace,
//! * [`BinarySource`] reads a little-endian `i32` observation count, an `i32` coordinate count
//!   and then the `f32` coordinates in row-major order.
//!
//! The files produced at the end of a run are handled by [`writer`].
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::dataset::{DataBlock, Float, Shape};
use crate::error::Result;

mod array;
mod binary;
mod text;
pub mod writer;

pub use array::ArraySource;
pub use binary::BinarySource;
pub use text::TextSource;

/// Sequential supplier of dataset blocks
pub trait BlockSource<F: Float> {
    /// Number of observations and coordinates of the whole dataset
    fn read_head(&mut self) -> Result<Shape>;

    /// Returns the next `n` observations in file order.
    ///
    /// Fails with [`Error::NotEnoughRecords`](crate::error::Error::NotEnoughRecords) if fewer
    /// than `n` observations remain; callers have to ask for exactly the remainder on the final
    /// call.
    fn read_block(&mut self, n: usize) -> Result<DataBlock<F>>;
}

impl<F: Float, S: BlockSource<F> + ?Sized> BlockSource<F> for &mut S {
    fn read_head(&mut self) -> Result<Shape> {
        (**self).read_head()
    }

    fn read_block(&mut self, n: usize) -> Result<DataBlock<F>> {
        (**self).read_block(n)
    }
}

impl<F: Float, S: BlockSource<F> + ?Sized> BlockSource<F> for Box<S> {
    fn read_head(&mut self) -> Result<Shape> {
        (**self).read_head()
    }

    fn read_block(&mut self, n: usize) -> Result<DataBlock<F>> {
        (**self).read_block(n)
    }
}

/// On-disk layout of an input file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Binary,
}

/// Opens `path` as a source of the given format
pub fn open<F: Float + 'static>(
    path: impl AsRef<Path>,
    format: Format,
) -> Result<Box<dyn BlockSource<F>>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(match format {
        Format::Text => Box::new(TextSource::new(reader)),
        Format::Binary => Box::new(BinarySource::new(reader)),
    })
}

/// Checks a block request against the observations left in a source
pub(crate) fn ensure_remaining(requested: usize, remaining: usize) -> Result<()> {
    if requested > remaining {
        Err(crate::error::Error::NotEnoughRecords {
            requested,
            remaining,
        })
    } else {
        Ok(())
    }
}

/// Buffer for `n` observations of `n_coords` coordinates, reporting allocation failure
pub(crate) fn block_buffer<F>(n: usize, n_coords: usize) -> Result<Vec<F>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(n * n_coords)?;
    Ok(buffer)
}
