//! Sequencing depth, prevalence and relative abundance annotation, and the
//! prevalence filter built on them.
//!
//! Depth is computed once, right after organelle removal, and is not
//! refreshed after prevalence filtering. RA keeps that original depth basis.

use crate::data::{ObservationTable, Status};
use crate::error::{Result, TidyError};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Default minimum prevalence for an OTU to be kept.
pub const DEFAULT_PREVALENCE_THRESHOLD: f64 = 0.05;

/// Relative abundance is expressed per mille of depth.
pub const RA_SCALE: f64 = 1000.0;

/// Set `depth` on every row to the total `value` of its sample.
///
/// Row count and order are unchanged.
pub fn annotate_depth(table: &ObservationTable) -> ObservationTable {
    let mut rows = table.rows().to_vec();
    for (_, indices) in table.group_indices(|o| &o.sample_id) {
        let depth: u64 = indices.iter().map(|&i| rows[i].value).sum();
        for i in indices {
            rows[i].depth = Some(depth);
        }
    }
    table.with_rows(rows)
}

/// Set `prev`, `RA` and `Status` on every row.
///
/// Per OTU, `prev` is the fraction of its rows with a nonzero count; per row,
/// `RA = value / depth * 1000` (0 when depth is 0); `Status` is `Keep` when
/// `prev >= threshold`. Requires [`annotate_depth`] to have run.
pub fn annotate_prevalence(table: &ObservationTable, threshold: f64) -> Result<ObservationTable> {
    validate_threshold(threshold)?;

    let mut rows = table.rows().to_vec();
    for (otu_id, indices) in table.group_indices(|o| &o.otu_id) {
        let present = indices.iter().filter(|&&i| rows[i].value > 0).count();
        let prev = present as f64 / indices.len() as f64;
        let status = if prev >= threshold {
            Status::Keep
        } else {
            Status::Discard
        };

        for i in indices {
            let row = &mut rows[i];
            let depth = row.depth.ok_or_else(|| {
                TidyError::Pipeline(format!(
                    "observation ({}, {}) has no depth; annotate depth before prevalence",
                    row.sample_id, otu_id
                ))
            })?;
            row.ra = Some(if depth == 0 {
                0.0
            } else {
                row.value as f64 / depth as f64 * RA_SCALE
            });
            row.prev = Some(prev);
            row.status = Some(status);
        }
    }
    Ok(table.with_rows(rows))
}

/// Keep only rows whose status is `Keep`.
///
/// An empty result is valid; it is logged, not raised. Use
/// [`ObservationTable::ensure_nonempty`] where an empty table is an error.
pub fn filter_prevalence(table: &ObservationTable) -> Result<ObservationTable> {
    if let Some(row) = table.rows().iter().find(|o| o.status.is_none()) {
        return Err(TidyError::Pipeline(format!(
            "OTU '{}' has no status; annotate prevalence before filtering",
            row.otu_id
        )));
    }
    let kept = table.filtered(|o| o.status == Some(Status::Keep));
    if kept.is_empty() && !table.is_empty() {
        warn!("Prevalence filter discarded every OTU");
    }
    Ok(kept)
}

/// Re-annotate prevalence on the current table and filter it.
///
/// Prevalence is recomputed relative to the rows present, so this is the form
/// to use when filtering an already filtered table again.
pub fn refilter_prevalence(table: &ObservationTable, threshold: f64) -> Result<ObservationTable> {
    filter_prevalence(&annotate_prevalence(table, threshold)?)
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TidyError::InvalidParameter(
            "Prevalence threshold must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

/// Result of prevalence filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// Number of OTUs before filtering.
    pub n_before: usize,
    /// Number of OTUs after filtering.
    pub n_after: usize,
    /// Number of OTUs removed.
    pub n_removed: usize,
    /// Observations before filtering.
    pub rows_before: usize,
    /// Observations after filtering.
    pub rows_after: usize,
    /// Proportion of OTUs retained.
    pub retention_rate: f64,
}

impl std::fmt::Display for FilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Filter Result")?;
        writeln!(f, "  Before:    {} OTUs ({} observations)", self.n_before, self.rows_before)?;
        writeln!(f, "  After:     {} OTUs ({} observations)", self.n_after, self.rows_after)?;
        writeln!(f, "  Removed:   {} OTUs", self.n_removed)?;
        writeln!(f, "  Retained:  {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Filter with statistics about what was filtered.
pub fn filter_prevalence_with_stats(
    table: &ObservationTable,
) -> Result<(ObservationTable, FilterResult)> {
    let n_before = table.otu_ids().len();
    let filtered = filter_prevalence(table)?;
    let n_after = filtered.otu_ids().len();

    let result = FilterResult {
        n_before,
        n_after,
        n_removed: n_before - n_after,
        rows_before: table.len(),
        rows_after: filtered.len(),
        retention_rate: if n_before == 0 {
            0.0
        } else {
            n_after as f64 / n_before as f64
        },
    };
    info!(
        "Prevalence filter kept {} of {} OTUs",
        result.n_after, result.n_before
    );

    Ok((filtered, result))
}
