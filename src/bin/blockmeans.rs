use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use anyhow::Context;
use blockmeans::block_kmeans::{Backend, BlockKMeans, Verbosity};
use blockmeans::dataset::BlockPlan;
use blockmeans::io::writer::ResultWriter;
use blockmeans::io::{self as block_io, Format};
use blockmeans::plot::ScatterPlot;
use blockmeans::prelude::*;
use ndarray::{s, Array2};
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;
use structopt::StructOpt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Block-streaming k-means clustering
///
/// Results are written next to the input file, to `<input>.cluster_centres` and
/// `<input>.membership`.
#[derive(Debug, StructOpt)]
#[structopt(name = "blockmeans")]
struct Options {
    #[structopt(short = "i", long = "input", parse(from_os_str))]
    /// File containing the observations
    input: PathBuf,
    #[structopt(short = "b", long = "binary")]
    /// Input file is in binary format (default: text)
    binary: bool,
    #[structopt(short = "n", long = "clusters")]
    /// Number of clusters, larger than 1
    n_clusters: usize,
    #[structopt(short = "t", long = "threshold", default_value = "0.001")]
    /// Largest fraction of reassigned observations for which a block counts as converged
    threshold: f32,
    #[structopt(short = "s", long = "split", default_value = "1")]
    /// Split the data into s blocks
    split: usize,
    #[structopt(short = "o", long = "timing")]
    /// Output timing performance
    timing: bool,
    #[structopt(short = "d", long = "debug")]
    /// Enable debug messages
    debug: bool,
    #[structopt(short = "g", long = "graph")]
    /// Write `<input>.plot` for an external renderer
    graph: bool,
    #[structopt(short = "m", long = "init", default_value = "random")]
    /// Seeding method: random or kpp
    init: String,
    #[structopt(short = "p", long = "backend", default_value = "sequential")]
    /// Where blocks are refined: seq, omp or cuda
    backend: Backend,
    #[structopt(short = "c", long = "checkpoint")]
    /// Save centroids and memberships after every block to `<input>.tmp-<block>`
    checkpoint: bool,
    #[structopt(long = "seed", default_value = "42")]
    /// Seed of the random number generator
    seed: u64,
    #[structopt(long = "max-iter", default_value = "50")]
    /// Maximum number of iterations per block
    max_iter: u64,
}

/// Prints the error and the usage, then exits with a non-zero status
fn usage_error(err: &dyn Display) -> ! {
    eprintln!("error: {}\n", err);
    // Nothing left to report if stderr is gone
    let _ = Options::clap().write_help(&mut io::stderr());
    eprintln!();
    process::exit(1)
}

/// Streams the dataset again and keeps only the first two coordinates of every observation
fn read_projection(path: &Path, format: Format, split: usize) -> anyhow::Result<Array2<f32>> {
    let mut source = block_io::open::<f32>(path, format)?;
    let Shape { n_objs, n_coords } = source.read_head()?;
    let width = n_coords.min(2);
    let plan = BlockPlan::new(n_objs, split).context("dataset cannot be split")?;

    let mut projection = Vec::with_capacity(n_objs * width);
    for span in plan.spans() {
        let block = source.read_block(span.len)?;
        projection.extend(block.records().slice(s![.., ..width]).iter().cloned());
    }
    Ok(Array2::from_shape_vec((n_objs, width), projection)?)
}

fn main() -> anyhow::Result<()> {
    let opt = Options::from_args();

    let log_level = if opt.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let verbosity = if opt.debug {
        Verbosity::Debug
    } else {
        Verbosity::Basic
    };
    let mut params =
        BlockKMeans::<f32>::params_with_rng(opt.n_clusters, Isaac64Rng::seed_from_u64(opt.seed))
            .tolerance(opt.threshold)
            .max_n_iterations(opt.max_iter)
            .split(opt.split)
            .init_method_named(&opt.init)
            .backend(opt.backend)
            .verbosity(verbosity);
    if opt.checkpoint {
        params = params.checkpoint(&opt.input);
    }
    let params = params.check().unwrap_or_else(|err| usage_error(&err));

    let format = if opt.binary {
        Format::Binary
    } else {
        Format::Text
    };
    let start = Instant::now();
    let mut source = block_io::open::<f32>(&opt.input, format)
        .with_context(|| format!("cannot open {}", opt.input.display()))?;
    let open_time = start.elapsed();

    info!("clustering {} with the {} backend", opt.input.display(), opt.backend);
    let model = match params.fit_blocks(&mut source) {
        Ok(model) => model,
        Err(err) if err.is_configuration() => usage_error(&err),
        Err(err) => {
            return Err(err).with_context(|| format!("cannot cluster {}", opt.input.display()))
        }
    };
    drop(source);

    let start = Instant::now();
    let writer = ResultWriter::new(&opt.input);
    writer.write(
        model.centroids(),
        model.memberships().iter().map(|&m| Some(m)),
    )?;
    if opt.graph {
        let projection = read_projection(&opt.input, format, opt.split)?;
        let plot = ScatterPlot::new(&projection, model.centroids(), model.memberships());
        writer.write_plot_data(&plot)?;
        let (x_min, x_max, y_min, y_max) = plot.bounds();
        info!(
            "plot data written to {}, x in [{}, {}], y in [{}, {}]",
            writer.plot_path().display(),
            x_min,
            x_max,
            y_min,
            y_max
        );
    }
    let write_time = start.elapsed();

    if opt.timing {
        let (n_objs, n_coords) = (model.memberships().len(), model.centroids().ncols());
        let io_time: Duration = open_time + model.timings().io + write_time;
        println!();
        println!("Performance results for block k-means");
        println!("------------------------------------------");
        println!("input file:     {}", opt.input.display());
        println!("numObjs       = {}", n_objs);
        println!("numCoords     = {}", n_coords);
        println!("numClusters   = {}", opt.n_clusters);
        println!("threshold     = {:.4}", opt.threshold);
        println!("number of blocks    = {}", model.n_blocks());
        println!("Loop iterations     = {}", model.n_iterations());
        println!("I/O time           = {:10.4} sec", io_time.as_secs_f64());
        println!(
            "Computation timing = {:10.4} sec",
            model.timings().compute.as_secs_f64()
        );
    }

    Ok(())
}
