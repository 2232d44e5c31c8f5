//! Loading the three pipeline inputs together.

use crate::data::{AbundanceMatrix, Metadata, TaxonomyTable};
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Paths to the abundance matrix, sample metadata and taxonomy table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    pub counts: PathBuf,
    pub metadata: PathBuf,
    pub taxonomy: PathBuf,
}

/// The loaded, untransformed inputs.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub counts: AbundanceMatrix,
    pub metadata: Metadata,
    pub taxonomy: TaxonomyTable,
}

impl Inputs {
    /// Read all three inputs. Fails on the first missing or malformed file.
    pub fn load(paths: &InputPaths) -> Result<Self> {
        let counts = AbundanceMatrix::from_tsv(&paths.counts).map_err(|e| e.in_stage("load"))?;
        info!(
            "Loaded {} OTUs x {} samples from {}",
            counts.n_otus(),
            counts.n_samples(),
            paths.counts.display()
        );

        let metadata = Metadata::from_tsv(&paths.metadata).map_err(|e| e.in_stage("load"))?;
        info!(
            "Loaded metadata for {} samples ({} columns)",
            metadata.n_samples(),
            metadata.n_columns()
        );

        let taxonomy = TaxonomyTable::load(&paths.taxonomy).map_err(|e| e.in_stage("load"))?;
        info!("Loaded taxonomy for {} OTUs", taxonomy.len());

        Ok(Self {
            counts,
            metadata,
            taxonomy,
        })
    }
}
