use std::io::{BufRead, Seek, SeekFrom};

use ndarray::Array2;

use super::{block_buffer, ensure_remaining, BlockSource};
use crate::dataset::{DataBlock, Float, Shape};
use crate::error::{Error, Result};

/// Reads observations stored one per line, coordinates separated by whitespace.
///
/// Blank lines are skipped. Every observation must have the same number of coordinates as the
/// first one.
#[derive(Debug)]
pub struct TextSource<R> {
    reader: R,
    shape: Option<Shape>,
    /// Observations handed out so far
    cursor: usize,
    /// Physical line number of the last line read, for error messages
    line: usize,
    buf: String,
}

impl<R: BufRead + Seek> TextSource<R> {
    pub fn new(reader: R) -> Self {
        TextSource {
            reader,
            shape: None,
            cursor: 0,
            line: 0,
            buf: String::new(),
        }
    }

    /// Advances to the next non-blank line, returns `false` at the end of the input
    fn next_line(&mut self) -> Result<bool> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(false);
            }
            self.line += 1;
            if !self.buf.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    /// Counts the observations of the whole input, then rewinds to its start
    fn scan(&mut self) -> Result<Shape> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.line = 0;

        let mut n_objs = 0;
        let mut n_coords = None;
        while self.next_line()? {
            let found = self.buf.split_whitespace().count();
            match n_coords {
                None => n_coords = Some(found),
                Some(expected) if expected != found => {
                    return Err(Error::Parse {
                        line: self.line,
                        msg: format!("expected {} coordinates, found {}", expected, found),
                    })
                }
                Some(_) => {}
            }
            n_objs += 1;
        }

        self.reader.seek(SeekFrom::Start(0))?;
        self.line = 0;
        self.cursor = 0;
        let shape = Shape {
            n_objs,
            n_coords: n_coords.unwrap_or(0),
        };
        self.shape = Some(shape);
        Ok(shape)
    }

    fn shape(&mut self) -> Result<Shape> {
        match self.shape {
            Some(shape) => Ok(shape),
            None => self.scan(),
        }
    }
}

impl<F: Float, R: BufRead + Seek> BlockSource<F> for TextSource<R> {
    fn read_head(&mut self) -> Result<Shape> {
        self.scan()
    }

    fn read_block(&mut self, n: usize) -> Result<DataBlock<F>> {
        let Shape { n_objs, n_coords } = self.shape()?;
        ensure_remaining(n, n_objs - self.cursor)?;

        let mut values = block_buffer(n, n_coords)?;
        for _ in 0..n {
            if !self.next_line()? {
                return Err(Error::NotEnoughRecords {
                    requested: n,
                    remaining: values.len() / n_coords.max(1),
                });
            }
            let before = values.len();
            for token in self.buf.split_whitespace() {
                let value = token.parse::<F>().map_err(|_| Error::Parse {
                    line: self.line,
                    msg: format!("`{}` is not a number", token),
                })?;
                values.push(value);
            }
            if values.len() - before != n_coords {
                return Err(Error::Parse {
                    line: self.line,
                    msg: format!(
                        "expected {} coordinates, found {}",
                        n_coords,
                        values.len() - before
                    ),
                });
            }
        }

        let offset = self.cursor;
        self.cursor += n;
        let records = Array2::from_shape_vec((n, n_coords), values)?;
        Ok(DataBlock::new(offset, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Cursor;

    fn source(text: &str) -> TextSource<Cursor<Vec<u8>>> {
        TextSource::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn head_counts_points_and_coordinates() {
        let mut source = source("0 0\n0 1\n\n1 0\n1.5 -2e1\n");
        let shape = BlockSource::<f64>::read_head(&mut source).unwrap();
        assert_eq!(
            shape,
            Shape {
                n_objs: 4,
                n_coords: 2
            }
        );
    }

    #[test]
    fn blocks_are_read_in_file_order() {
        let mut source = source("0 0\n0 1\n\n1 0\n1.5 -2e1\n");
        BlockSource::<f64>::read_head(&mut source).unwrap();

        let first: DataBlock<f64> = source.read_block(3).unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(first.records(), array![[0., 0.], [0., 1.], [1., 0.]]);

        let second: DataBlock<f64> = source.read_block(1).unwrap();
        assert_eq!(second.offset(), 3);
        assert_eq!(second.records(), array![[1.5, -20.]]);

        assert!(matches!(
            BlockSource::<f64>::read_block(&mut source, 1),
            Err(Error::NotEnoughRecords {
                requested: 1,
                remaining: 0
            })
        ));
    }

    #[test]
    fn ragged_lines_are_rejected() {
        let mut source = source("0 0\n0 1 2\n");
        assert!(matches!(
            BlockSource::<f32>::read_head(&mut source),
            Err(Error::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn garbage_is_reported_with_its_line() {
        let mut source = source("0 0\n\n0 x\n");
        BlockSource::<f32>::read_head(&mut source).unwrap();
        assert!(matches!(
            BlockSource::<f32>::read_block(&mut source, 2),
            Err(Error::Parse { line: 3, .. })
        ));
    }
}
