//! Profiling of the annotated observation table.

mod depth;
mod prevalence;

pub use depth::{profile_depth, DepthProfile};
pub use prevalence::{profile_prevalence, OtuPrevalence, PrevalenceProfile};
