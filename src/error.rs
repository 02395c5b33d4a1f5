//! Error types in blockmeans
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("requested {requested} records but only {remaining} remain")]
    NotEnoughRecords { requested: usize, remaining: usize },
    #[error("cannot allocate memory for a block: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
