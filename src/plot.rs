//! Data handed to an external renderer
//!
//! Nothing in this crate opens a display. A [`ScatterPlot`] projects observations and centroids
//! onto their first two coordinates and keeps the memberships alongside, which is all a scatter
//! plot of the clustering needs. One-dimensional data is drawn on the line `y = 0`.
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Ix1, Ix2};

use crate::dataset::Float;

#[derive(Clone, Debug, PartialEq)]
pub struct ScatterPlot<F> {
    xs: Array1<F>,
    ys: Array1<F>,
    centroid_xs: Array1<F>,
    centroid_ys: Array1<F>,
    memberships: Array1<usize>,
}

fn project<F: Float>(records: &ArrayBase<impl Data<Elem = F>, Ix2>) -> (Array1<F>, Array1<F>) {
    let xs = records.column(0).to_owned();
    let ys = if records.ncols() > 1 {
        records.column(1).to_owned()
    } else {
        Array1::zeros(records.nrows())
    };
    (xs, ys)
}

impl<F: Float> ScatterPlot<F> {
    /// # Panics
    ///
    /// If `records` and `memberships` disagree on the number of observations, or if either
    /// array has no coordinates.
    pub fn new(
        records: &ArrayBase<impl Data<Elem = F>, Ix2>,
        centroids: &ArrayBase<impl Data<Elem = F>, Ix2>,
        memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
    ) -> Self {
        assert_eq!(
            records.nrows(),
            memberships.len(),
            "The number of data points must match the number of memberships."
        );
        assert!(records.ncols() > 0 && centroids.ncols() > 0);

        let (xs, ys) = project(records);
        let (centroid_xs, centroid_ys) = project(centroids);
        ScatterPlot {
            xs,
            ys,
            centroid_xs,
            centroid_ys,
            memberships: memberships.to_owned(),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (F, F)> + '_ {
        self.xs.iter().cloned().zip(self.ys.iter().cloned())
    }

    pub fn centroids(&self) -> impl Iterator<Item = (F, F)> + '_ {
        self.centroid_xs
            .iter()
            .cloned()
            .zip(self.centroid_ys.iter().cloned())
    }

    pub fn memberships(&self) -> ArrayView1<'_, usize> {
        self.memberships.view()
    }

    /// Bounding box `(x_min, x_max, y_min, y_max)` of points and centroids together, used by
    /// renderers to rescale to their canvas
    pub fn bounds(&self) -> (F, F, F, F) {
        let fold = |values: &[&Array1<F>]| {
            values
                .iter()
                .flat_map(|v| v.iter())
                .fold((F::infinity(), F::neg_infinity()), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        };
        let (x_min, x_max) = fold(&[&self.xs, &self.centroid_xs]);
        let (y_min, y_max) = fold(&[&self.ys, &self.centroid_ys]);
        (x_min, x_max, y_min, y_max)
    }
}
