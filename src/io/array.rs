use ndarray::{s, ArrayBase, ArrayView2, Data, Ix2};

use super::{ensure_remaining, BlockSource};
use crate::dataset::{DataBlock, Float, Shape};
use crate::error::Result;

/// Streams the rows of an in-memory array as blocks.
///
/// Mostly useful to run the block driver on data that does fit in memory, for example to compare
/// a streamed run against a single-block run of the same observations.
#[derive(Clone, Debug)]
pub struct ArraySource<'a, F> {
    records: ArrayView2<'a, F>,
    cursor: usize,
}

impl<'a, F: Float> ArraySource<'a, F> {
    pub fn new(records: &'a ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        ArraySource {
            records: records.view(),
            cursor: 0,
        }
    }

    /// Number of observations not handed out yet
    pub fn remaining(&self) -> usize {
        self.records.nrows() - self.cursor
    }
}

impl<'a, F: Float> BlockSource<F> for ArraySource<'a, F> {
    fn read_head(&mut self) -> Result<Shape> {
        Ok(Shape {
            n_objs: self.records.nrows(),
            n_coords: self.records.ncols(),
        })
    }

    fn read_block(&mut self, n: usize) -> Result<DataBlock<F>> {
        ensure_remaining(n, self.remaining())?;
        let offset = self.cursor;
        let records = self.records.slice(s![offset..offset + n, ..]).to_owned();
        self.cursor += n;
        Ok(DataBlock::new(offset, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::array;

    #[test]
    fn blocks_follow_each_other() {
        let data = array![[0., 0.], [1., 1.], [2., 2.], [3., 3.], [4., 4.]];
        let mut source = ArraySource::new(&data);
        assert_eq!(
            source.read_head().unwrap(),
            Shape {
                n_objs: 5,
                n_coords: 2
            }
        );

        let first = source.read_block(2).unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(first.records(), data.slice(s![0..2, ..]));

        let second = source.read_block(3).unwrap();
        assert_eq!(second.offset(), 2);
        assert_eq!(second.records(), data.slice(s![2..5, ..]));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn reading_past_the_end_fails() {
        let data = array![[0.], [1.], [2.]];
        let mut source = ArraySource::new(&data);
        source.read_block(2).unwrap();
        match source.read_block(2) {
            Err(Error::NotEnoughRecords {
                requested,
                remaining,
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(remaining, 1);
            }
            other => panic!("expected a short read, got {:?}", other),
        }
    }
}
