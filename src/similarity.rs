//! Similarity and temporal penalty matrices.
//!
//! Both matrices are `n × n` over the candidate pool and stored flat in
//! row-major order; they live only for the duration of one selection.

use std::f64::consts::FRAC_PI_2;
use std::ops::Index;

#[cfg(feature = "rayon")]
use ::rayon::prelude::*;

use crate::error::SamplingError;

/// A dense square matrix of `f64`, stored row-major in one allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SquareMatrix {
    /// An `size × size` matrix of zeros.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Build a matrix by evaluating `cell(row, column)` for every cell.
    pub fn from_fn(size: usize, cell: impl Fn(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(size * size);
        for row in 0..size {
            values.extend((0..size).map(|column| cell(row, column)));
        }
        Self { size, values }
    }

    /// Wrap row-major `values`.
    ///
    /// # Errors
    ///
    /// [`SamplingError::Config`] if `values.len() != size * size`.
    pub fn from_row_major(size: usize, values: Vec<f64>) -> Result<Self, SamplingError> {
        if values.len() != size * size {
            return Err(SamplingError::Config(format!(
                "matrix of size {size} needs {} values, got {}",
                size * size,
                values.len()
            )));
        }
        Ok(Self { size, values })
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// The cell at `(row, column)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row < self.size && column < self.size {
            Some(self.values[row * self.size + column])
        } else {
            None
        }
    }

    /// One row as a slice.
    ///
    /// # Panics
    ///
    /// If `row >= size`.
    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.size, "row {row} out of bounds for size {}", self.size);
        &self.values[row * self.size..(row + 1) * self.size]
    }

    /// All values, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

impl Index<(usize, usize)> for SquareMatrix {
    type Output = f64;

    fn index(&self, (row, column): (usize, usize)) -> &f64 {
        assert!(
            row < self.size && column < self.size,
            "index ({row}, {column}) out of bounds for size {}",
            self.size
        );
        &self.values[row * self.size + column]
    }
}

/// Scale `vector` to unit length. Zero vectors are left untouched.
pub fn l2_normalize(vector: &[f32]) -> Vec<f64> {
    let norm = vector
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt();
    if norm > 0.0 {
        vector.iter().map(|&v| f64::from(v) / norm).collect()
    } else {
        vector.iter().map(|&v| f64::from(v)).collect()
    }
}

fn dot(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

/// Pairwise cosine similarity of `embeddings`.
///
/// Each embedding is L2-normalised first, so cells lie in `[-1, 1]`, the
/// matrix is symmetric and the diagonal is 1 for every non-zero embedding.
///
/// # Errors
///
/// [`SamplingError::Encoding`] if the embeddings differ in width.
pub fn cosine_similarity_matrix(embeddings: &[Vec<f32>]) -> Result<SquareMatrix, SamplingError> {
    let width = embeddings.first().map_or(0, Vec::len);
    if let Some(position) = embeddings.iter().position(|e| e.len() != width) {
        return Err(SamplingError::Encoding {
            batch_start: position,
            reason: format!(
                "embedding width {} differs from expected {width}",
                embeddings[position].len()
            ),
        });
    }

    let normalized: Vec<Vec<f64>> = embeddings.iter().map(|e| l2_normalize(e)).collect();
    let size = normalized.len();

    #[cfg(feature = "rayon")]
    let values: Vec<f64> = (0..size)
        .into_par_iter()
        .flat_map_iter(|row| {
            let normalized = &normalized;
            (0..size).map(move |column| dot(&normalized[row], &normalized[column]))
        })
        .collect();

    #[cfg(not(feature = "rayon"))]
    let values: Vec<f64> = (0..size)
        .flat_map(|row| {
            let normalized = &normalized;
            (0..size).map(move |column| dot(&normalized[row], &normalized[column]))
        })
        .collect();

    SquareMatrix::from_row_major(size, values)
}

/// The temporal term for two pool positions `distance` apart in a pool of
/// `pool_size`.
///
/// `(1 / (sin(π/2 · distance / pool_size) + 1) − 1) · length_penalty`. The
/// value is 0 at distance 0 and falls towards `−length_penalty / 2` as the
/// distance approaches the pool size, so added to a cost it rewards spreading
/// picks apart.
pub fn length_penalty(distance: usize, pool_size: usize, length_penalty: f64) -> f64 {
    if pool_size == 0 {
        return 0.0;
    }
    let angle = FRAC_PI_2 * distance as f64 / pool_size as f64;
    (1.0 / (angle.sin() + 1.0) - 1.0) * length_penalty
}

/// The penalty matrix `P[i][j] = length_penalty(|i − j|, size, weight)`.
pub fn penalty_matrix(size: usize, weight: f64) -> SquareMatrix {
    if weight == 0.0 {
        return SquareMatrix::zeros(size);
    }
    SquareMatrix::from_fn(size, |row, column| {
        length_penalty(row.abs_diff(column), size, weight)
    })
}
