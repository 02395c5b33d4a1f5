use blockmeans::block_kmeans::{Backend, BlockKMeans, InitMethod};
use blockmeans::io::ArraySource;
use blockmeans::prelude::*;
use blockmeans::utils::{generate_blobs, interleave_blobs};
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_isaac::Isaac64Rng;

fn backends_bench(c: &mut Criterion) {
    let mut rng = Isaac64Rng::seed_from_u64(40);
    let cluster_sizes = vec![(100, 4), (400, 10), (3000, 10)];

    let mut benchmark = c.benchmark_group("block_k_means_backends");
    benchmark.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    for (cluster_size, n_clusters) in cluster_sizes {
        let rng = &mut rng;
        let n_coords = 3;
        let centroids = Array2::random_using((n_clusters, n_coords), Uniform::new(-30., 30.), rng);
        let observations =
            interleave_blobs(&generate_blobs(cluster_size, &centroids, rng), n_clusters);

        for backend in &[
            Backend::Sequential,
            Backend::ThreadParallel,
            Backend::AcceleratorOffload,
        ] {
            benchmark.bench_function(
                BenchmarkId::new(backend.to_string(), cluster_size),
                |bencher| {
                    bencher.iter(|| {
                        BlockKMeans::params_with_rng(black_box(n_clusters), black_box(rng.clone()))
                            .init_method(InitMethod::KMeansPlusPlus)
                            .tolerance(black_box(1e-3))
                            .backend(*backend)
                            .fit_blocks(&mut ArraySource::new(&observations))
                            .unwrap()
                    });
                },
            );
        }
    }

    benchmark.finish();
}

fn split_bench(c: &mut Criterion) {
    let mut rng = Isaac64Rng::seed_from_u64(40);
    let n_clusters = 10;
    let centroids = Array2::random_using((n_clusters, 3), Uniform::new(-30., 30.), &mut rng);
    let observations =
        interleave_blobs(&generate_blobs(2000, &centroids, &mut rng), n_clusters);

    let mut benchmark = c.benchmark_group("block_k_means_split");
    for split in &[1, 4, 16] {
        benchmark.bench_with_input(BenchmarkId::from_parameter(split), split, |bencher, &split| {
            bencher.iter(|| {
                BlockKMeans::params_with_rng(n_clusters, rng.clone())
                    .init_method(InitMethod::KMeansPlusPlus)
                    .split(black_box(split))
                    .fit_blocks(&mut ArraySource::new(&observations))
                    .unwrap()
            });
        });
    }

    benchmark.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = backends_bench, split_bench
}
criterion_main!(benches);
