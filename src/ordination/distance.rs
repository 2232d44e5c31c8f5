//! Pairwise sample distances.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance metric between sample profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    /// Σ|a − b| / Σ(a + b). Zero between two all-zero profiles.
    #[default]
    BrayCurtis,
    Euclidean,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::BrayCurtis => f.write_str("bray_curtis"),
            Distance::Euclidean => f.write_str("euclidean"),
        }
    }
}

/// Bray–Curtis dissimilarity between two non-negative profiles.
pub fn bray_curtis(a: &[f64], b: &[f64]) -> f64 {
    let (diff, total) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0), |(d, t), (&x, &y)| (d + (x - y).abs(), t + x + y));
    if total > 0.0 {
        diff / total
    } else {
        0.0
    }
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Symmetric n × n distance matrix between the rows of `samples`.
pub fn distance_matrix(samples: &DMatrix<f64>, metric: Distance) -> DMatrix<f64> {
    let n = samples.nrows();
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| samples.row(i).iter().copied().collect())
        .collect();

    let mut dist = DMatrix::zeros(n, n);
    for i in 1..n {
        for j in 0..i {
            let d = match metric {
                Distance::BrayCurtis => bray_curtis(&rows[i], &rows[j]),
                Distance::Euclidean => euclidean(&rows[i], &rows[j]),
            };
            dist[(i, j)] = d;
            dist[(j, i)] = d;
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bray_curtis() {
        assert_relative_eq!(bray_curtis(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_relative_eq!(bray_curtis(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
        // |6-4| + |4-6| = 4 over 20
        assert_relative_eq!(bray_curtis(&[6.0, 4.0], &[4.0, 6.0]), 0.2);
        assert_eq!(bray_curtis(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_euclidean() {
        assert_relative_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_distance_matrix_is_symmetric_with_zero_diagonal() {
        let samples = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let d = distance_matrix(&samples, Distance::BrayCurtis);
        for i in 0..3 {
            assert_eq!(d[(i, i)], 0.0);
            for j in 0..3 {
                assert_eq!(d[(i, j)], d[(j, i)]);
            }
        }
        assert_relative_eq!(d[(1, 0)], 1.0);
        assert_relative_eq!(d[(2, 0)], 1.0 / 3.0);
    }

    #[test]
    fn test_distance_serde_names() {
        let yaml = serde_yaml::to_string(&Distance::BrayCurtis).unwrap();
        assert_eq!(yaml.trim(), "bray_curtis");
        let parsed: Distance = serde_yaml::from_str("euclidean").unwrap();
        assert_eq!(parsed, Distance::Euclidean);
    }
}
