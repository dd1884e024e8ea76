//! Separable 2-D discrete cosine transform (type II).
//!
//! Rows and then columns go through a planned `rustdct` DCT-II, which uses
//! the unnormalized convention `X[k] = Σ x[n] · cos(π · k · (2n + 1) / 2N)`.
//! Only the lowest `keep` coefficients per axis are needed for hashing, so
//! the column pass runs on just the first `keep` columns of the row pass.

use std::fmt;
use std::sync::Arc;

use rustdct::{Dct2, DctPlanner, RequiredScratch, TransformType2And3};

/// Low-frequency 2-D DCT for square samples of a fixed side.
#[derive(Clone)]
pub struct Dct2d {
    size: usize,
    keep: usize,
    dct: Arc<dyn TransformType2And3<f64>>,
}

impl fmt::Debug for Dct2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dct2d")
            .field("size", &self.size)
            .field("keep", &self.keep)
            .finish_non_exhaustive()
    }
}

impl Dct2d {
    /// Plan the transform for `size × size` samples, keeping the top-left
    /// `keep × keep` coefficients.
    ///
    /// `keep` is clamped to `size`.
    #[must_use]
    pub fn new(size: usize, keep: usize) -> Self {
        let dct = DctPlanner::new().plan_dct2(size);
        Self {
            size,
            keep: keep.min(size),
            dct,
        }
    }

    /// Side of the input sample.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Side of the returned coefficient block.
    #[must_use]
    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Transform a row-major `size × size` sample and return the row-major
    /// `keep × keep` block of lowest-frequency coefficients.
    ///
    /// Row `u` of the block is the vertical frequency, column `v` the
    /// horizontal one.
    ///
    /// # Panics
    ///
    /// Panics if `sample.len() != size * size`.
    #[must_use]
    pub fn low_frequency(&self, sample: &[f64]) -> Vec<f64> {
        assert_eq!(
            sample.len(),
            self.size * self.size,
            "sample must be {0}×{0}",
            self.size
        );
        let (size, keep) = (self.size, self.keep);
        let mut scratch = vec![0.0; self.dct.get_scratch_len()];

        let mut rows = sample.to_vec();
        for row in rows.chunks_exact_mut(size) {
            self.dct.process_dct2_with_scratch(row, &mut scratch);
        }

        // Transposed: one contiguous column per kept horizontal frequency
        let mut columns = vec![0.0; keep * size];
        for (y, row) in rows.chunks_exact(size).enumerate() {
            for v in 0..keep {
                columns[v * size + y] = row[v];
            }
        }
        for column in columns.chunks_exact_mut(size) {
            self.dct.process_dct2_with_scratch(column, &mut scratch);
        }

        let mut block = vec![0.0; keep * keep];
        for u in 0..keep {
            for v in 0..keep {
                block[u * keep + v] = columns[v * size + u];
            }
        }
        block
    }
}
