//! Sequencing depth profiling.

use crate::data::ObservationTable;
use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Depth characteristics of the samples in an observation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthProfile {
    /// Sample ids in first-appearance order.
    pub sample_ids: Vec<String>,
    /// Depth per sample, aligned to `sample_ids`.
    pub depths: Vec<u64>,
    pub mean: f64,
    pub median: f64,
    pub min: u64,
    pub max: u64,
    /// Coefficient of variation (std_dev / mean).
    pub cv: f64,
}

impl std::fmt::Display for DepthProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Depth Profile")?;
        writeln!(f, "  Samples: {}", self.sample_ids.len())?;
        writeln!(f, "  Mean:    {:.0}", self.mean)?;
        writeln!(f, "  Median:  {:.0}", self.median)?;
        writeln!(f, "  Min:     {}", self.min)?;
        writeln!(f, "  Max:     {}", self.max)?;
        writeln!(f, "  CV:      {:.2}", self.cv)?;
        Ok(())
    }
}

/// Profile the per-sample depth of a depth-annotated table.
pub fn profile_depth(table: &ObservationTable) -> Result<DepthProfile> {
    let mut sample_ids = Vec::new();
    let mut depths = Vec::new();
    for (sample_id, indices) in table.group_indices(|o| &o.sample_id) {
        let depth = table.rows()[indices[0]].depth.ok_or_else(|| {
            TidyError::Pipeline(format!("sample '{}' has no depth", sample_id))
        })?;
        sample_ids.push(sample_id);
        depths.push(depth);
    }

    if depths.is_empty() {
        return Ok(DepthProfile {
            sample_ids,
            depths,
            mean: 0.0,
            median: 0.0,
            min: 0,
            max: 0,
            cv: 0.0,
        });
    }

    let values: Vec<f64> = depths.iter().map(|&d| d as f64).collect();
    let mean = values.iter().mean();
    let std_dev = values.iter().population_std_dev();
    let median = Data::new(values).median();
    let min = depths.iter().copied().min().unwrap_or(0);
    let max = depths.iter().copied().max().unwrap_or(0);

    Ok(DepthProfile {
        sample_ids,
        depths,
        mean,
        median,
        min,
        max,
        cv: if mean > 0.0 { std_dev / mean } else { 0.0 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use crate::filter::annotate_depth;
    use approx::assert_relative_eq;

    #[test]
    fn test_profile_depth() {
        let table = ObservationTable::new(
            vec![],
            vec![
                Observation::new("S1", "A", 10),
                Observation::new("S1", "B", 5),
                Observation::new("S2", "A", 0),
                Observation::new("S2", "B", 5),
            ],
        );
        let profile = profile_depth(&annotate_depth(&table)).unwrap();
        assert_eq!(profile.sample_ids, vec!["S1", "S2"]);
        assert_eq!(profile.depths, vec![15, 5]);
        assert_relative_eq!(profile.mean, 10.0);
        assert_relative_eq!(profile.median, 10.0);
        assert_relative_eq!(profile.cv, 0.5);
        assert_eq!((profile.min, profile.max), (5, 15));
    }

    #[test]
    fn test_requires_depth() {
        let table = ObservationTable::new(vec![], vec![Observation::new("S1", "A", 1)]);
        assert!(profile_depth(&table).is_err());
    }
}
