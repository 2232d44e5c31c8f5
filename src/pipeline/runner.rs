//! Pipeline runner: reshape, filter, plot and ordinate in a fixed order.

use crate::data::{AbundanceMatrix, Inputs, Metadata, ObservationTable, TaxonomyTable};
use crate::error::{Result, TidyError};
use crate::filter::{
    annotate_depth, annotate_prevalence, filter_prevalence_with_stats, remove_organelles,
    FilterResult, DEFAULT_PREVALENCE_THRESHOLD,
};
use crate::ordination::{log_transform, ordinate, Distance, Ordination, DEFAULT_AXES};
use crate::plot::{plot_prevalence, PlotSummary};
use crate::profile::{profile_depth, profile_prevalence, DepthProfile, PrevalenceProfile};
use crate::reshape::reshape;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_threshold() -> f64 {
    DEFAULT_PREVALENCE_THRESHOLD
}

fn default_axes() -> usize {
    DEFAULT_AXES
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Minimum prevalence for an OTU to be kept.
    #[serde(default = "default_threshold")]
    pub prevalence_threshold: f64,
    /// Distance used by the ordination.
    #[serde(default)]
    pub distance: Distance,
    /// Number of ordination axes to keep.
    #[serde(default = "default_axes")]
    pub n_axes: usize,
    /// Where to write the prevalence plot, if anywhere.
    #[serde(default)]
    pub plot: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(TidyError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(TidyError::from)
    }
}

/// Tables and summaries the pipeline produced.
///
/// Only two long tables are kept: the annotated one before the prevalence
/// filter and the log-transformed one after it.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub name: String,
    /// Rows straight after the taxonomy join, before organelle removal.
    pub n_reshaped: usize,
    /// Organelles removed; Depth, prev, RA and Status set.
    pub annotated: ObservationTable,
    /// `Keep` rows only, with logRA.
    pub transformed: ObservationTable,
    pub depth: DepthProfile,
    pub prevalence: PrevalenceProfile,
    pub filter_result: FilterResult,
    pub plot: Option<PlotSummary>,
    /// `None` when the prevalence filter discarded every OTU.
    pub ordination: Option<Ordination>,
}

/// Builder for configuring and running the pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    prevalence_threshold: f64,
    distance: Distance,
    n_axes: usize,
    plot: Option<PathBuf>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline with default settings.
    pub fn new() -> Self {
        Self {
            name: "unnamed".to_string(),
            prevalence_threshold: DEFAULT_PREVALENCE_THRESHOLD,
            distance: Distance::default(),
            n_axes: DEFAULT_AXES,
            plot: None,
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            name: config.name.clone(),
            prevalence_threshold: config.prevalence_threshold,
            distance: config.distance,
            n_axes: config.n_axes,
            plot: config.plot.clone(),
        }
    }

    /// Convert to a serializable config.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            prevalence_threshold: self.prevalence_threshold,
            distance: self.distance,
            n_axes: self.n_axes,
            plot: self.plot.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn prevalence_threshold(mut self, threshold: f64) -> Self {
        self.prevalence_threshold = threshold;
        self
    }

    pub fn distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    pub fn n_axes(mut self, n_axes: usize) -> Self {
        self.n_axes = n_axes;
        self
    }

    /// Write the prevalence plot to `path` while running.
    pub fn plot_to<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.plot = Some(path.into());
        self
    }

    /// Run on already loaded inputs.
    pub fn run_inputs(&self, inputs: &Inputs) -> Result<PipelineOutput> {
        self.run(&inputs.counts, &inputs.metadata, &inputs.taxonomy)
    }

    /// Execute the pipeline. Stops at the first failing stage.
    ///
    /// The plot is written last, so a failed run leaves no file behind.
    pub fn run(
        &self,
        counts: &AbundanceMatrix,
        metadata: &Metadata,
        taxonomy: &TaxonomyTable,
    ) -> Result<PipelineOutput> {
        info!("Running pipeline '{}'", self.name);
        if self.n_axes == 0 {
            return Err(TidyError::InvalidParameter(
                "PCoA needs at least one axis".to_string(),
            )
            .in_stage("ordination"));
        }

        let reshaped =
            reshape(counts, metadata, taxonomy).map_err(|e| e.in_stage("reshape"))?;
        let n_reshaped = reshaped.len();

        let with_depth = annotate_depth(&remove_organelles(&reshaped));
        drop(reshaped);
        let annotated = annotate_prevalence(&with_depth, self.prevalence_threshold)
            .map_err(|e| e.in_stage("filter"))?;
        let depth = profile_depth(&annotated).map_err(|e| e.in_stage("filter"))?;
        let prevalence = profile_prevalence(&annotated).map_err(|e| e.in_stage("filter"))?;

        let (filtered, filter_result) =
            filter_prevalence_with_stats(&annotated).map_err(|e| e.in_stage("filter"))?;

        let transformed = log_transform(&filtered).map_err(|e| e.in_stage("ordination"))?;
        drop(filtered);
        let ordination = if transformed.is_empty() {
            warn!("No observations left after filtering; skipping ordination");
            None
        } else {
            Some(
                ordinate(&transformed, self.distance, self.n_axes)
                    .map_err(|e| e.in_stage("ordination"))?,
            )
        };

        let plot = match &self.plot {
            Some(path) => Some(
                plot_prevalence(&prevalence, self.prevalence_threshold, path)
                    .map_err(|e| e.in_stage("plot"))?,
            ),
            None => None,
        };

        Ok(PipelineOutput {
            name: self.name.clone(),
            n_reshaped,
            annotated,
            transformed,
            depth,
            prevalence,
            filter_result,
            plot,
            ordination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Lineage, Rank, Status, TaxonomyRecord, Variable};
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    /// 6 samples × 5 OTUs. OTU_mito is mitochondrial, OTU_rare appears in one
    /// sample only, OTU_orphan has no taxonomy.
    fn fixture() -> (AbundanceMatrix, Metadata, TaxonomyTable) {
        let samples: Vec<String> = (1..=6).map(|i| format!("S{}", i)).collect();
        let counts = AbundanceMatrix::from_rows(
            &[
                vec![50, 40, 60, 10, 5, 20],
                vec![10, 30, 0, 40, 60, 25],
                vec![100, 0, 0, 0, 0, 0],
                vec![7, 7, 7, 7, 7, 7],
                vec![1, 2, 3, 4, 5, 6],
            ],
            vec![
                "OTU_a".into(),
                "OTU_b".into(),
                "OTU_rare".into(),
                "OTU_mito".into(),
                "OTU_orphan".into(),
            ],
            samples.clone(),
        )
        .unwrap();

        let metadata = Metadata::from_rows(
            vec!["Compartment".into()],
            samples
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let compartment = if i < 3 { "Root" } else { "Soil" };
                    (s.clone(), vec![Variable::Categorical(compartment.into())])
                })
                .collect(),
        )
        .unwrap();

        let bacteria = Lineage::default().with(Rank::Kingdom, "Bacteria");
        let taxonomy = TaxonomyTable::new(vec![
            TaxonomyRecord {
                otu_id: "OTU_a".into(),
                lineage: bacteria.clone(),
            },
            TaxonomyRecord {
                otu_id: "OTU_b".into(),
                lineage: bacteria.clone(),
            },
            TaxonomyRecord {
                otu_id: "OTU_rare".into(),
                lineage: bacteria.clone(),
            },
            TaxonomyRecord {
                otu_id: "OTU_mito".into(),
                lineage: bacteria.with(Rank::Family, "mitochondria"),
            },
        ])
        .unwrap();

        (counts, metadata, taxonomy)
    }

    #[test]
    fn test_stage_tables() {
        let (counts, metadata, taxonomy) = fixture();
        let out = Pipeline::new()
            .name("test")
            .prevalence_threshold(0.2)
            .run(&counts, &metadata, &taxonomy)
            .unwrap();

        // 6 samples × 4 OTUs with taxonomy
        assert_eq!(out.n_reshaped, 24);
        // mitochondria removed
        assert_eq!(out.annotated.len(), 18);
        // OTU_rare: 1/6 < 0.2
        assert_eq!(out.transformed.otu_ids(), vec!["OTU_a", "OTU_b"]);
        assert_eq!(out.filter_result.n_removed, 1);
        assert_eq!(out.prevalence.n_discard, 1);
        assert!(out.transformed.rows().iter().all(|o| o.log_ra.is_some()));
        assert!(out
            .transformed
            .rows()
            .iter()
            .all(|o| o.status == Some(Status::Keep)));
    }

    #[test]
    fn test_depth_basis_excludes_organelles_only() {
        let (counts, metadata, taxonomy) = fixture();
        let out = Pipeline::new()
            .prevalence_threshold(0.2)
            .run(&counts, &metadata, &taxonomy)
            .unwrap();

        // S1: 50 + 10 + 100 (rare, later discarded); mito and orphan excluded
        let s1 = out
            .transformed
            .rows()
            .iter()
            .find(|o| o.sample_id == "S1")
            .unwrap();
        assert_eq!(s1.depth, Some(160));
        assert_eq!(out.depth.depths[0], 160);
    }

    #[test]
    fn test_ordination_output() {
        let (counts, metadata, taxonomy) = fixture();
        let out = Pipeline::new()
            .n_axes(2)
            .distance(Distance::Euclidean)
            .run(&counts, &metadata, &taxonomy)
            .unwrap();

        let ord = out.ordination.unwrap();
        assert_eq!(ord.sample_ids.len(), 6);
        assert_eq!(ord.n_axes(), 2);
        assert_eq!(ord.distance, Distance::Euclidean);
        assert!(ord.proportion_explained[0] >= ord.proportion_explained[1]);
    }

    #[test]
    fn test_everything_discarded_skips_ordination() {
        let (counts, metadata, taxonomy) = fixture();
        let taxonomy = TaxonomyTable::new(
            taxonomy
                .records()
                .iter()
                .filter(|r| r.otu_id == "OTU_rare")
                .cloned()
                .collect(),
        )
        .unwrap();
        let out = Pipeline::new()
            .prevalence_threshold(0.5)
            .run(&counts, &metadata, &taxonomy)
            .unwrap();

        assert!(out.transformed.is_empty());
        assert!(out.ordination.is_none());
        assert_relative_eq!(out.filter_result.retention_rate, 0.0);
    }

    #[test]
    fn test_plot_written_when_configured() {
        let (counts, metadata, taxonomy) = fixture();
        let dir = tempdir().unwrap();
        let path = dir.path().join("prev.svg");
        let out = Pipeline::new()
            .plot_to(&path)
            .run(&counts, &metadata, &taxonomy)
            .unwrap();

        assert!(path.exists());
        assert_eq!(out.plot.unwrap().n_points, 3);
    }

    #[test]
    fn test_failed_run_writes_no_plot() {
        let (counts, metadata, taxonomy) = fixture();
        let dir = tempdir().unwrap();

        let no_axes = dir.path().join("no_axes.svg");
        let err = Pipeline::new()
            .n_axes(0)
            .plot_to(&no_axes)
            .run(&counts, &metadata, &taxonomy)
            .unwrap_err();
        assert!(err.to_string().starts_with("ordination stage failed"));
        assert!(!no_axes.exists());

        // A single sample passes every stage up to the ordination
        let single = AbundanceMatrix::from_rows(
            &[vec![50], vec![10], vec![100]],
            vec!["OTU_a".into(), "OTU_b".into(), "OTU_rare".into()],
            vec!["S1".into()],
        )
        .unwrap();
        let one_sample = dir.path().join("one_sample.svg");
        let err = Pipeline::new()
            .plot_to(&one_sample)
            .run(&single, &metadata, &taxonomy)
            .unwrap_err();
        assert!(matches!(err.root(), TidyError::InvalidParameter(_)));
        assert!(!one_sample.exists());
    }

    #[test]
    fn test_alignment_error_names_stage() {
        let (counts, _, taxonomy) = fixture();
        let metadata = Metadata::from_rows(
            vec!["Compartment".into()],
            vec![("S1".into(), vec![Variable::Missing])],
        )
        .unwrap();
        let err = Pipeline::new()
            .run(&counts, &metadata, &taxonomy)
            .unwrap_err();

        assert!(err.to_string().starts_with("reshape stage failed"));
        assert!(matches!(err.root(), TidyError::Alignment { sample } if sample == "S2"));
    }

    #[test]
    fn test_invalid_threshold_names_stage() {
        let (counts, metadata, taxonomy) = fixture();
        let err = Pipeline::new()
            .prevalence_threshold(2.0)
            .run(&counts, &metadata, &taxonomy)
            .unwrap_err();
        assert!(err.to_string().starts_with("filter stage failed"));
    }

    #[test]
    fn test_config_roundtrip() {
        let pipeline = Pipeline::new()
            .name("roots")
            .prevalence_threshold(0.1)
            .distance(Distance::Euclidean)
            .n_axes(2)
            .plot_to("prev.svg");

        let config = pipeline.to_config(Some("Root compartment survey"));
        let yaml = config.to_yaml().unwrap();
        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::from_yaml("name: minimal\n").unwrap();
        assert_eq!(config.prevalence_threshold, 0.05);
        assert_eq!(config.distance, Distance::BrayCurtis);
        assert_eq!(config.n_axes, 3);
        assert!(config.plot.is_none());
    }
}
