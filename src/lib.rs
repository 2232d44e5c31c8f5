//! Amplicon OTU Table Tidying Library
//!
//! This library turns an amplicon sequencing OTU table (OTU × sample counts),
//! its sample metadata and a taxonomy lookup into a tidy long-form table,
//! filters it, and ordinates the samples.
//!
//! # Overview
//!
//! The library is organized into stage modules that each take and return an
//! [`data::ObservationTable`]:
//!
//! - **data**: Core data structures (AbundanceMatrix, Metadata, TaxonomyTable, ObservationTable)
//! - **reshape**: Metadata alignment, wide-to-long melt, taxonomy join
//! - **filter**: Organelle removal, depth and prevalence annotation, prevalence filter
//! - **profile**: Depth and prevalence summaries
//! - **plot**: Prevalence diagnostic plot (SVG)
//! - **ordination**: log transform, distance matrix, PCoA
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use amplicon_tidy::prelude::*;
//!
//! let counts = AbundanceMatrix::from_tsv("otu_table.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//! let taxonomy = TaxonomyTable::load("taxonomy.bin").unwrap();
//!
//! let output = Pipeline::new()
//!     .prevalence_threshold(0.05)
//!     .distance(Distance::BrayCurtis)
//!     .plot_to("prevalence.svg")
//!     .run(&counts, &metadata, &taxonomy)
//!     .unwrap();
//!
//! if let Some(ordination) = output.ordination {
//!     ordination.to_tsv("pcoa.tsv", Some(&metadata)).unwrap();
//! }
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod ordination;
pub mod pipeline;
pub mod plot;
pub mod profile;
pub mod reshape;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        AbundanceMatrix, InputPaths, Inputs, Lineage, Metadata, Observation, ObservationTable,
        Rank, Status, TaxonomyRecord, TaxonomyTable, Variable, VariableType,
    };
    pub use crate::error::{Result, TidyError};
    pub use crate::filter::{
        annotate_depth, annotate_prevalence, filter_prevalence, filter_prevalence_with_stats,
        refilter_prevalence, remove_organelles, FilterResult, DEFAULT_PREVALENCE_THRESHOLD,
    };
    pub use crate::ordination::{
        distance_matrix, log_transform, ordinate, pcoa, pivot_wider, Distance, Ordination,
        SampleMatrix,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutput};
    pub use crate::plot::{plot_prevalence, PlotSummary};
    pub use crate::profile::{profile_depth, profile_prevalence, DepthProfile, PrevalenceProfile};
    pub use crate::reshape::{align_metadata, join_taxonomy, melt, reshape};
}
