use ndarray::{s, Array, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

/// Given an input matrix `blob_centroids`, with shape `(n_blobs, n_coords)`,
/// generate `blob_size` data points (a "blob") around each of the blob centroids.
///
/// More specifically, each blob is formed by `blob_size` points sampled from a normal
/// distribution centered in the blob centroid with unit variance. Blobs are laid out one after
/// the other, which is the worst case for a streamed run: early blocks only ever see the first
/// blobs. See [`interleave_blobs`] for the opposite layout.
///
/// `generate_blobs` can be used to quickly assemble a synthetic dataset to test or
/// benchmark the block driver on a best-case scenario input.
pub fn generate_blobs(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let (n_centroids, n_coords) = blob_centroids.dim();
    let mut blobs: Array2<f64> = Array2::zeros((n_centroids * blob_size, n_coords));

    for (blob_index, blob_centroid) in blob_centroids.rows().into_iter().enumerate() {
        let blob = generate_blob(blob_size, &blob_centroid, rng);

        let indexes = s![blob_index * blob_size..(blob_index + 1) * blob_size, ..];
        blobs.slice_mut(indexes).assign(&blob);
    }
    blobs
}

/// Generate `blob_size` data points (a "blob") around `blob_centroid`.
pub fn generate_blob(
    blob_size: usize,
    blob_centroid: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let shape = (blob_size, blob_centroid.len());
    let origin_blob: Array2<f64> = Array::random_using(shape, StandardNormal, rng);
    origin_blob + blob_centroid
}

/// Reorders the output of [`generate_blobs`] so that consecutive rows cycle through the blobs,
/// every block of a streamed run then holding observations of every blob.
///
/// # Panics
///
/// If the number of rows is not a multiple of `n_blobs`.
pub fn interleave_blobs<F: Clone>(
    blobs: &ArrayBase<impl Data<Elem = F>, Ix2>,
    n_blobs: usize,
) -> Array2<F> {
    assert!(n_blobs > 0 && blobs.nrows() % n_blobs == 0);
    let blob_size = blobs.nrows() / n_blobs;
    let order: Vec<usize> = (0..blob_size)
        .flat_map(|i| (0..n_blobs).map(move |blob| blob * blob_size + i))
        .collect();
    blobs.select(Axis(0), &order)
}
