//! Log transform and long-to-wide pivot feeding the ordination.

use crate::data::ObservationTable;
use crate::error::{Result, TidyError};
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Set `logRA = log2(RA + 1)` on every row. Requires `RA`.
pub fn log_transform(table: &ObservationTable) -> Result<ObservationTable> {
    let rows = table
        .rows()
        .iter()
        .map(|obs| {
            let ra = obs.ra.ok_or_else(|| {
                TidyError::Pipeline(format!(
                    "observation ({}, {}) has no relative abundance",
                    obs.sample_id, obs.otu_id
                ))
            })?;
            let mut out = obs.clone();
            out.log_ra = Some((ra + 1.0).log2());
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(table.with_rows(rows))
}

/// Dense sample × OTU matrix of transformed abundances.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    /// Row labels.
    pub sample_ids: Vec<String>,
    /// Column labels.
    pub otu_ids: Vec<String>,
    /// samples × OTUs
    pub data: DMatrix<f64>,
}

impl SampleMatrix {
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_otus(&self) -> usize {
        self.data.ncols()
    }

    /// Value for a sample and OTU, if both are present.
    pub fn get(&self, sample_id: &str, otu_id: &str) -> Option<f64> {
        let row = self.sample_ids.iter().position(|s| s == sample_id)?;
        let col = self.otu_ids.iter().position(|o| o == otu_id)?;
        Some(self.data[(row, col)])
    }
}

/// Pivot `logRA` back to a sample × OTU matrix.
///
/// Samples and OTUs keep first-appearance order. Combinations with no row are
/// filled with 0.
pub fn pivot_wider(table: &ObservationTable) -> Result<SampleMatrix> {
    let sample_ids = table.sample_ids();
    let otu_ids = table.otu_ids();
    let sample_pos: HashMap<&str, usize> = sample_ids
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let otu_pos: HashMap<&str, usize> = otu_ids
        .iter()
        .enumerate()
        .map(|(i, o)| (o.as_str(), i))
        .collect();

    let mut data = DMatrix::zeros(sample_ids.len(), otu_ids.len());
    for obs in table.rows() {
        let value = obs.log_ra.ok_or_else(|| {
            TidyError::Pipeline(format!(
                "observation ({}, {}) has no logRA; log-transform before pivoting",
                obs.sample_id, obs.otu_id
            ))
        })?;
        data[(sample_pos[obs.sample_id.as_str()], otu_pos[obs.otu_id.as_str()])] = value;
    }

    Ok(SampleMatrix {
        sample_ids,
        otu_ids,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use approx::assert_relative_eq;

    fn with_ra(sample: &str, otu: &str, ra: f64) -> Observation {
        let mut o = Observation::new(sample, otu, 1);
        o.ra = Some(ra);
        o
    }

    #[test]
    fn test_log_transform() {
        let table = ObservationTable::new(
            vec![],
            vec![with_ra("S1", "A", 0.0), with_ra("S1", "B", 3.0), with_ra("S1", "C", 1023.0)],
        );
        let logged = log_transform(&table).unwrap();
        let values: Vec<f64> = logged.rows().iter().map(|o| o.log_ra.unwrap()).collect();
        assert_relative_eq!(values[0], 0.0);
        assert_relative_eq!(values[1], 2.0);
        assert_relative_eq!(values[2], 10.0);
    }

    #[test]
    fn test_log_transform_requires_ra() {
        let table = ObservationTable::new(vec![], vec![Observation::new("S1", "A", 1)]);
        assert!(log_transform(&table).is_err());
    }

    #[test]
    fn test_pivot_fills_missing_with_zero() {
        let table = ObservationTable::new(
            vec![],
            vec![with_ra("S1", "A", 1.0), with_ra("S1", "B", 3.0), with_ra("S2", "B", 7.0)],
        );
        let wide = pivot_wider(&log_transform(&table).unwrap()).unwrap();

        assert_eq!(wide.sample_ids, vec!["S1", "S2"]);
        assert_eq!(wide.otu_ids, vec!["A", "B"]);
        assert_eq!((wide.n_samples(), wide.n_otus()), (2, 2));
        assert_relative_eq!(wide.get("S1", "A").unwrap(), 1.0);
        assert_relative_eq!(wide.get("S2", "B").unwrap(), 3.0);
        assert_eq!(wide.get("S2", "A"), Some(0.0));
        assert_eq!(wide.get("S3", "A"), None);
    }
}
