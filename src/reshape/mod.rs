//! Wide-to-long reshaping and taxonomy join.
//!
//! Turns the OTU × sample matrix into one [`Observation`] per cell, carrying
//! the sample's metadata, then keeps only OTUs the taxonomy table covers.

use crate::data::{AbundanceMatrix, Metadata, Observation, ObservationTable, TaxonomyTable};
use crate::error::{Result, TidyError};
use log::{debug, info};

/// Reorder metadata rows to the matrix column order.
///
/// Fails with [`crate::error::TidyError::Alignment`] naming the first matrix
/// column that has no metadata row.
pub fn align_metadata(metadata: &Metadata, counts: &AbundanceMatrix) -> Result<Metadata> {
    let aligned = metadata.align_to(counts.sample_ids())?;
    let unused = metadata.n_samples().saturating_sub(aligned.n_samples());
    if unused > 0 {
        debug!("{} metadata rows have no matching matrix column", unused);
    }
    Ok(aligned)
}

/// Pivot the matrix to long form, one row per (sample, OTU) cell.
///
/// Rows are sample-major: samples in matrix column order, OTUs in matrix row
/// order within each sample. `metadata` must already be aligned to `counts`.
pub fn melt(counts: &AbundanceMatrix, metadata: &Metadata) -> Result<ObservationTable> {
    let mut rows = Vec::with_capacity(counts.n_samples() * counts.n_otus());

    for (col, sample_id) in counts.sample_ids().iter().enumerate() {
        let values = metadata
            .row(sample_id)
            .ok_or_else(|| TidyError::Alignment {
                sample: sample_id.clone(),
            })?;
        for (row, otu_id) in counts.otu_ids().iter().enumerate() {
            let mut obs = Observation::new(sample_id, otu_id, counts.get(row, col));
            obs.metadata = values.to_vec();
            rows.push(obs);
        }
    }

    Ok(ObservationTable::new(metadata.column_names().to_vec(), rows))
}

/// Inner join on OTU id: rows whose OTU the taxonomy does not cover are dropped.
pub fn join_taxonomy(table: &ObservationTable, taxonomy: &TaxonomyTable) -> ObservationTable {
    let rows = table
        .rows()
        .iter()
        .filter_map(|obs| {
            taxonomy.lineage(&obs.otu_id).map(|lineage| Observation {
                lineage: lineage.clone(),
                ..obs.clone()
            })
        })
        .collect();
    table.with_rows(rows)
}

/// Align, melt and join in one step.
pub fn reshape(
    counts: &AbundanceMatrix,
    metadata: &Metadata,
    taxonomy: &TaxonomyTable,
) -> Result<ObservationTable> {
    let aligned = align_metadata(metadata, counts)?;
    let long = melt(counts, &aligned)?;
    let joined = join_taxonomy(&long, taxonomy);

    let n_otus = joined.otu_ids().len();
    info!(
        "Reshaped to {} observations ({} samples x {} OTUs with taxonomy; {} OTUs dropped)",
        joined.len(),
        counts.n_samples(),
        n_otus,
        counts.n_otus() - n_otus
    );
    Ok(joined)
}
