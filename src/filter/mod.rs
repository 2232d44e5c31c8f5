//! Quality filters for the observation table.
//!
//! Order matters: organelle removal, then depth, then prevalence annotation,
//! then the prevalence filter.

pub mod organelle;
pub mod prevalence;

pub use organelle::{is_organelle, remove_organelles, OrganelleRule, ORGANELLE_RULES};
pub use prevalence::{
    annotate_depth, annotate_prevalence, filter_prevalence, filter_prevalence_with_stats,
    refilter_prevalence, FilterResult, DEFAULT_PREVALENCE_THRESHOLD, RA_SCALE,
};
