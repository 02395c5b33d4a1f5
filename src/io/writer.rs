//! Result files
//!
//! A run produces two text files next to a base path:
//! * `<base>.cluster_centres`, one line `index c1 c2 ...` per cluster
//! * `<base>.membership`, one line `index cluster` per observation
//!
//! Checkpoints use the same layout under `<base>.tmp-<block>`; observations that no block has
//! reached yet are written with cluster `-1`.
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Data, Ix2};

use crate::dataset::{Float, Memberships};
use crate::error::Result;
use crate::plot::ScatterPlot;

/// Appends `suffix` to the file name of `base`
pub fn with_suffix(base: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_ref().as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes the files of a run below a common base path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultWriter {
    base: PathBuf,
}

impl ResultWriter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        ResultWriter { base: base.into() }
    }

    /// Writer for the checkpoint taken after block `block_number` (1-based)
    pub fn checkpoint(base: impl AsRef<Path>, block_number: usize) -> Self {
        ResultWriter::new(with_suffix(base, &format!(".tmp-{}", block_number)))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn centroids_path(&self) -> PathBuf {
        with_suffix(&self.base, ".cluster_centres")
    }

    pub fn memberships_path(&self) -> PathBuf {
        with_suffix(&self.base, ".membership")
    }

    pub fn plot_path(&self) -> PathBuf {
        with_suffix(&self.base, ".plot")
    }

    pub fn write_centroids<F: Float>(
        &self,
        centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<()> {
        let mut out = BufWriter::new(File::create(self.centroids_path())?);
        for (index, centroid) in centroids.rows().into_iter().enumerate() {
            write!(out, "{}", index)?;
            for value in centroid.iter() {
                write!(out, " {}", value)?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Writes memberships given as `Option`s, `None` being an observation not assigned yet
    pub fn write_memberships(
        &self,
        memberships: impl Iterator<Item = Option<usize>>,
    ) -> Result<()> {
        let mut out = BufWriter::new(File::create(self.memberships_path())?);
        for (index, membership) in memberships.enumerate() {
            match membership {
                Some(cluster) => writeln!(out, "{} {}", index, cluster)?,
                None => writeln!(out, "{} -1", index)?,
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Writes both the centroid and the membership file
    pub fn write<F: Float>(
        &self,
        centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
        memberships: impl Iterator<Item = Option<usize>>,
    ) -> Result<()> {
        self.write_centroids(centroids)?;
        self.write_memberships(memberships)
    }

    /// Writes a snapshot of a run still in progress
    pub fn write_partial<F: Float>(
        &self,
        centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
        memberships: &Memberships,
    ) -> Result<()> {
        self.write(centroids, memberships.iter())
    }

    /// Writes `x y cluster` lines for every observation followed by `x y centroid` lines for the
    /// centroids, separated by a blank line, as consumed by plotting tools like gnuplot.
    pub fn write_plot_data<F: Float>(&self, plot: &ScatterPlot<F>) -> Result<()> {
        let mut out = BufWriter::new(File::create(self.plot_path())?);
        for ((x, y), cluster) in plot.points().zip(plot.memberships().iter()) {
            writeln!(out, "{} {} {}", x, y, cluster)?;
        }
        writeln!(out)?;
        for (index, (x, y)) in plot.centroids().enumerate() {
            writeln!(out, "{} {} {}", x, y, index)?;
        }
        out.flush()?;
        Ok(())
    }
}
