//! Input tables and the tidy observation table.

mod abundance;
mod inputs;
mod metadata;
mod observation;
mod taxonomy;

pub use abundance::AbundanceMatrix;
pub use inputs::{InputPaths, Inputs};
pub use metadata::{Metadata, Variable, VariableType, SAMPLE_ID_COLUMN};
pub use observation::{Observation, ObservationTable, Status, OTU_ID_COLUMN};
pub use taxonomy::{Lineage, Rank, TaxonomyRecord, TaxonomyTable};
