//! Per-OTU prevalence and mean relative abundance.

use crate::data::{ObservationTable, Status};
use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Summary of one OTU across its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtuPrevalence {
    pub otu_id: String,
    /// Mean relative abundance (per mille) across the OTU's rows.
    pub mean_ra: f64,
    pub prev: f64,
    pub status: Status,
}

/// Prevalence characteristics of an annotated observation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrevalenceProfile {
    /// One entry per OTU, in first-appearance order.
    pub otus: Vec<OtuPrevalence>,
    /// Mean prevalence across OTUs.
    pub mean_prevalence: f64,
    /// Median prevalence across OTUs.
    pub median_prevalence: f64,
    pub n_keep: usize,
    pub n_discard: usize,
}

impl PrevalenceProfile {
    pub fn n_otus(&self) -> usize {
        self.otus.len()
    }

    /// OTUs with a given status.
    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &OtuPrevalence> + '_ {
        self.otus.iter().filter(move |o| o.status == status)
    }
}

impl std::fmt::Display for PrevalenceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Prevalence Profile")?;
        writeln!(f, "  OTUs:              {}", self.n_otus())?;
        writeln!(f, "  Mean prevalence:   {:.2}%", self.mean_prevalence * 100.0)?;
        writeln!(f, "  Median prevalence: {:.2}%", self.median_prevalence * 100.0)?;
        writeln!(f, "  Keep:    {}", self.n_keep)?;
        writeln!(f, "  Discard: {}", self.n_discard)?;
        Ok(())
    }
}

/// Summarise prevalence per OTU. The table must carry `prev`, `RA` and `Status`.
pub fn profile_prevalence(table: &ObservationTable) -> Result<PrevalenceProfile> {
    let mut otus = Vec::new();
    for (otu_id, indices) in table.group_indices(|o| &o.otu_id) {
        let first = &table.rows()[indices[0]];
        let (prev, status) = match (first.prev, first.status) {
            (Some(p), Some(s)) => (p, s),
            _ => {
                return Err(TidyError::Pipeline(format!(
                    "OTU '{}' has no prevalence; annotate prevalence before profiling",
                    otu_id
                )))
            }
        };
        let ra = indices
            .iter()
            .map(|&i| {
                let row = &table.rows()[i];
                row.ra.ok_or_else(|| {
                    TidyError::Pipeline(format!(
                        "observation ({}, {}) has no relative abundance",
                        row.sample_id, otu_id
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        otus.push(OtuPrevalence {
            otu_id,
            mean_ra: ra.iter().mean(),
            prev,
            status,
        });
    }

    let prevalences: Vec<f64> = otus.iter().map(|o| o.prev).collect();
    let (mean_prevalence, median_prevalence) = if prevalences.is_empty() {
        (0.0, 0.0)
    } else {
        (prevalences.iter().mean(), Data::new(prevalences).median())
    };
    let n_keep = otus.iter().filter(|o| o.status == Status::Keep).count();
    let n_discard = otus.len() - n_keep;

    Ok(PrevalenceProfile {
        otus,
        mean_prevalence,
        median_prevalence,
        n_keep,
        n_discard,
    })
}
