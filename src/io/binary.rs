use std::convert::TryFrom;
use std::io::Read;

use ndarray::Array2;

use super::{block_buffer, ensure_remaining, BlockSource};
use crate::dataset::{DataBlock, Float, Shape};
use crate::error::{Error, Result};

/// Reads the binary layout: `i32` observation count, `i32` coordinate count, then the `f32`
/// coordinates of every observation in row-major order. All values are little-endian.
#[derive(Debug)]
pub struct BinarySource<R> {
    reader: R,
    shape: Option<Shape>,
    cursor: usize,
}

impl<R: Read> BinarySource<R> {
    pub fn new(reader: R) -> Self {
        BinarySource {
            reader,
            shape: None,
            cursor: 0,
        }
    }

    fn read_count(&mut self, what: &str) -> Result<usize> {
        let mut bytes = [0u8; 4];
        self.reader.read_exact(&mut bytes)?;
        let count = i32::from_le_bytes(bytes);
        match usize::try_from(count) {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(Error::InvalidHeader(format!(
                "{} must be positive, found {}",
                what, count
            ))),
        }
    }

    /// The header can only be consumed once, later calls return the cached shape
    fn header(&mut self) -> Result<Shape> {
        if let Some(shape) = self.shape {
            return Ok(shape);
        }
        let n_objs = self.read_count("observation count")?;
        let n_coords = self.read_count("coordinate count")?;
        let shape = Shape { n_objs, n_coords };
        self.shape = Some(shape);
        Ok(shape)
    }
}

impl<F: Float, R: Read> BlockSource<F> for BinarySource<R> {
    fn read_head(&mut self) -> Result<Shape> {
        self.header()
    }

    fn read_block(&mut self, n: usize) -> Result<DataBlock<F>> {
        let Shape { n_objs, n_coords } = self.header()?;
        ensure_remaining(n, n_objs - self.cursor)?;

        let mut raw = block_buffer::<u8>(n, n_coords * 4)?;
        raw.resize(n * n_coords * 4, 0);
        self.reader.read_exact(&mut raw)?;

        let mut values = block_buffer(n, n_coords)?;
        values.extend(raw.chunks_exact(4).map(|chunk| {
            F::from_f32(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        }));

        let offset = self.cursor;
        self.cursor += n;
        let records = Array2::from_shape_vec((n, n_coords), values)?;
        Ok(DataBlock::new(offset, records))
    }
}
