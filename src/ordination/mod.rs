//! Beta-diversity ordination of the filtered observation table.

pub mod distance;
pub mod pcoa;
pub mod transform;

pub use distance::{bray_curtis, distance_matrix, euclidean, Distance};
pub use pcoa::{pcoa, Ordination};
pub use transform::{log_transform, pivot_wider, SampleMatrix};

use crate::data::ObservationTable;
use crate::error::{Result, TidyError};
use log::info;

/// Default number of ordination axes to keep.
pub const DEFAULT_AXES: usize = 3;

/// Pivot a log-transformed table to sample × OTU, compute distances and run PCoA.
pub fn ordinate(table: &ObservationTable, metric: Distance, n_axes: usize) -> Result<Ordination> {
    let wide = pivot_wider(table)?;
    if wide.n_otus() == 0 {
        return Err(TidyError::EmptyResult(
            "no OTUs left to ordinate".to_string(),
        ));
    }
    if wide.n_samples() < 2 {
        return Err(TidyError::InvalidParameter(format!(
            "ordination needs at least 2 samples, got {}",
            wide.n_samples()
        )));
    }

    let distances = distance_matrix(&wide.data, metric);
    let ordination = pcoa(&distances, wide.sample_ids, n_axes, metric)?;
    info!(
        "PCoA ({}) on {} samples x {} OTUs; first axes explain {}",
        metric,
        ordination.sample_ids.len(),
        wide.otu_ids.len(),
        ordination
            .proportion_explained
            .iter()
            .map(|p| format!("{:.1}%", p * 100.0))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(ordination)
}
