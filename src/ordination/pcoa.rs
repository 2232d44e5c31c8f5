//! Principal Coordinates Analysis (classical multidimensional scaling).
//!
//! 1. Square the distances element-wise: A = -½ D²
//! 2. Gower double-centering: B = A − row means − column means + grand mean
//! 3. Symmetric eigendecomposition of B
//! 4. Sort eigenvalues descending, keep the first k axes
//! 5. Coordinates: X[i, j] = v[i, j] × √max(λ_j, 0)
//!
//! Eigenvector signs are fixed so the largest-magnitude loading of every axis
//! is positive, which makes the output reproducible across runs.

use super::distance::Distance;
use crate::data::Metadata;
use crate::error::{Result, TidyError};
use nalgebra::{DMatrix, SymmetricEigen};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Per-sample ordination coordinates.
#[derive(Debug, Clone)]
pub struct Ordination {
    pub sample_ids: Vec<String>,
    /// samples × axes
    pub coordinates: DMatrix<f64>,
    /// Eigenvalues of the retained axes, descending.
    pub eigenvalues: Vec<f64>,
    /// Share of the positive eigenvalue sum carried by each retained axis.
    pub proportion_explained: Vec<f64>,
    pub distance: Distance,
}

impl Ordination {
    pub fn n_axes(&self) -> usize {
        self.coordinates.ncols()
    }

    /// Coordinates of one sample on every retained axis.
    pub fn sample(&self, sample_id: &str) -> Option<Vec<f64>> {
        let row = self.sample_ids.iter().position(|s| s == sample_id)?;
        Some(self.coordinates.row(row).iter().copied().collect())
    }

    /// All samples' coordinates on one axis (0-based).
    pub fn axis(&self, axis: usize) -> Option<Vec<f64>> {
        (axis < self.n_axes()).then(|| self.coordinates.column(axis).iter().copied().collect())
    }

    /// Write `SampleID`, optional metadata columns, then `PCoA1..PCoAk`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, metadata: Option<&Metadata>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        write!(writer, "SampleID")?;
        if let Some(meta) = metadata {
            for col in meta.column_names() {
                write!(writer, "\t{}", col)?;
            }
        }
        for axis in 0..self.n_axes() {
            write!(writer, "\tPCoA{}", axis + 1)?;
        }
        writeln!(writer)?;

        for (i, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            if let Some(meta) = metadata {
                match meta.row(sample_id) {
                    Some(values) => {
                        for v in values {
                            write!(writer, "\t{}", v)?;
                        }
                    }
                    None => {
                        for _ in meta.column_names() {
                            write!(writer, "\tNA")?;
                        }
                    }
                }
            }
            for axis in 0..self.n_axes() {
                write!(writer, "\t{}", self.coordinates[(i, axis)])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Run PCoA on a full symmetric distance matrix.
///
/// `n_axes` is capped at `n − 1`.
pub fn pcoa(
    distances: &DMatrix<f64>,
    sample_ids: Vec<String>,
    n_axes: usize,
    distance: Distance,
) -> Result<Ordination> {
    let n = distances.nrows();
    if distances.ncols() != n {
        return Err(TidyError::InvalidParameter(format!(
            "distance matrix must be square, got {}x{}",
            n,
            distances.ncols()
        )));
    }
    if sample_ids.len() != n {
        return Err(TidyError::InvalidParameter(format!(
            "{} sample ids for a {}x{} distance matrix",
            sample_ids.len(),
            n,
            n
        )));
    }
    if n < 2 {
        return Err(TidyError::InvalidParameter(
            "PCoA requires at least 2 samples".to_string(),
        ));
    }
    if n_axes == 0 {
        return Err(TidyError::InvalidParameter(
            "PCoA needs at least one axis".to_string(),
        ));
    }
    if distances.iter().any(|d| !d.is_finite()) {
        return Err(TidyError::Numerical(
            "distance matrix contains non-finite values".to_string(),
        ));
    }
    let k = n_axes.min(n - 1);

    let a = distances.map(|d| -0.5 * d * d);
    let n_f = n as f64;
    let row_means: Vec<f64> = (0..n).map(|i| a.row(i).sum() / n_f).collect();
    let grand_mean = row_means.iter().sum::<f64>() / n_f;
    // A is symmetric, so column means equal row means
    let centered = DMatrix::from_fn(n, n, |i, j| a[(i, j)] - row_means[i] - row_means[j] + grand_mean);

    let eigen = SymmetricEigen::new(centered);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&x, &y| {
        eigen.eigenvalues[y]
            .partial_cmp(&eigen.eigenvalues[x])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let positive_sum: f64 = eigen.eigenvalues.iter().filter(|&&v| v > 0.0).sum();
    let mut coordinates = DMatrix::zeros(n, k);
    let mut eigenvalues = Vec::with_capacity(k);
    let mut proportion_explained = Vec::with_capacity(k);

    for (axis, &col) in order.iter().take(k).enumerate() {
        let value = eigen.eigenvalues[col];
        let vector = eigen.eigenvectors.column(col);

        let pivot = vector
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        let scale = value.max(0.0).sqrt();

        for sample in 0..n {
            coordinates[(sample, axis)] = sign * vector[sample] * scale;
        }
        eigenvalues.push(value);
        proportion_explained.push(if positive_sum > 0.0 {
            value.max(0.0) / positive_sum
        } else {
            0.0
        });
    }

    Ok(Ordination {
        sample_ids,
        coordinates,
        eigenvalues,
        proportion_explained,
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordination::distance::distance_matrix;
    use approx::assert_relative_eq;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{}", i)).collect()
    }

    fn embedded_distance(ord: &Ordination, i: usize, j: usize) -> f64 {
        (0..ord.n_axes())
            .map(|a| (ord.coordinates[(i, a)] - ord.coordinates[(j, a)]).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_identical_samples_give_zero_coordinates() {
        let d = DMatrix::zeros(3, 3);
        let ord = pcoa(&d, ids(3), 2, Distance::BrayCurtis).unwrap();
        assert!(ord.coordinates.iter().all(|v| v.abs() < 1e-10));
        assert!(ord.proportion_explained.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_two_samples_single_axis() {
        let d = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let ord = pcoa(&d, ids(2), 3, Distance::BrayCurtis).unwrap();
        assert_eq!(ord.n_axes(), 1);
        assert_relative_eq!(embedded_distance(&ord, 0, 1), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_equilateral_triangle() {
        let d = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        let ord = pcoa(&d, ids(3), 2, Distance::BrayCurtis).unwrap();
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert_relative_eq!(embedded_distance(&ord, i, j), 1.0, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_euclidean_input_is_reconstructed_exactly() {
        let samples = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 2.0, 0.5, 3.0, 0.0, 1.0, 0.0, 4.0, 2.0, 2.5, 2.5, 0.0],
        );
        let d = distance_matrix(&samples, Distance::Euclidean);
        let ord = pcoa(&d, ids(4), 3, Distance::Euclidean).unwrap();

        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_relative_eq!(embedded_distance(&ord, i, j), d[(i, j)], epsilon = 1e-8);
            }
        }
        let total: f64 = ord.proportion_explained.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-10);
        assert!(ord.eigenvalues.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_axes_capped_and_signs_fixed() {
        let d = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.5, 1.0, 0.0, 0.8, 0.5, 0.8, 0.0]);
        let ord = pcoa(&d, ids(3), 10, Distance::BrayCurtis).unwrap();
        assert_eq!(ord.n_axes(), 2);
        assert_eq!(ord.eigenvalues.len(), 2);

        for axis in 0..ord.n_axes() {
            let column = ord.axis(axis).unwrap();
            let pivot = column
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            assert!(pivot >= 0.0);
        }
        assert!(ord.axis(2).is_none());
        assert_eq!(ord.sample("S1").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_inputs() {
        let d = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        assert!(pcoa(&d, ids(3), 2, Distance::BrayCurtis).is_err());
        assert!(pcoa(&d, ids(2), 0, Distance::BrayCurtis).is_err());
        assert!(pcoa(&DMatrix::zeros(1, 1), ids(1), 2, Distance::BrayCurtis).is_err());
        assert!(pcoa(&DMatrix::zeros(2, 3), ids(2), 2, Distance::BrayCurtis).is_err());
    }
}
