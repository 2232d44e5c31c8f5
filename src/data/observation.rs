//! Long-format ("tidy") observation table: one row per sample × OTU.

use crate::data::metadata::{Variable, SAMPLE_ID_COLUMN};
use crate::data::taxonomy::{Lineage, Rank};
use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Name of the OTU id column in tidy output.
pub const OTU_ID_COLUMN: &str = "variable";

/// Count and derived columns, written after the lineage in tidy output.
const DERIVED_COLUMNS: [&str; 6] = ["value", "Depth", "prev", "RA", "Status", "logRA"];

/// Whether `name` is taken by a fixed column of the tidy output.
pub(crate) fn is_reserved_column(name: &str) -> bool {
    name == SAMPLE_ID_COLUMN
        || name == OTU_ID_COLUMN
        || DERIVED_COLUMNS.contains(&name)
        || Rank::ALL.iter().any(|r| r.to_string() == name)
}

/// Prevalence filter decision for an OTU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Keep,
    Discard,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Keep => f.write_str("Keep"),
            Status::Discard => f.write_str("Discard"),
        }
    }
}

/// One (sample, OTU) observation.
///
/// Derived columns stay `None` until the stage that computes them has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub sample_id: String,
    pub otu_id: String,
    /// Raw read count.
    pub value: u64,
    /// Sample metadata, aligned to [`ObservationTable::metadata_columns`].
    pub metadata: Vec<Variable>,
    pub lineage: Lineage,
    /// Total reads of the sample at the time depth was computed.
    pub depth: Option<u64>,
    /// Fraction of the OTU's rows with a nonzero count.
    pub prev: Option<f64>,
    /// Relative abundance, per mille of depth.
    pub ra: Option<f64>,
    pub status: Option<Status>,
    /// log2(RA + 1)
    pub log_ra: Option<f64>,
}

impl Observation {
    /// A bare observation with no derived columns.
    pub fn new(sample_id: &str, otu_id: &str, value: u64) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            otu_id: otu_id.to_string(),
            value,
            metadata: Vec::new(),
            lineage: Lineage::default(),
            depth: None,
            prev: None,
            ra: None,
            status: None,
            log_ra: None,
        }
    }
}

/// The tidy table. Every pipeline stage consumes one and returns a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    metadata_columns: Vec<String>,
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(metadata_columns: Vec<String>, rows: Vec<Observation>) -> Self {
        Self {
            metadata_columns,
            rows,
        }
    }

    /// A table with the same columns and different rows.
    pub fn with_rows(&self, rows: Vec<Observation>) -> Self {
        Self {
            metadata_columns: self.metadata_columns.clone(),
            rows,
        }
    }

    /// A new table holding the rows for which `keep` returns true.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Observation) -> bool,
    {
        self.with_rows(self.rows.iter().filter(|o| keep(o)).cloned().collect())
    }

    pub fn metadata_columns(&self) -> &[String] {
        &self.metadata_columns
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail with [`TidyError::EmptyResult`] if no rows remain.
    pub fn ensure_nonempty(&self, context: &str) -> Result<&Self> {
        if self.is_empty() {
            Err(TidyError::EmptyResult(format!("no observations left after {}", context)))
        } else {
            Ok(self)
        }
    }

    /// Distinct sample ids in first-appearance order.
    pub fn sample_ids(&self) -> Vec<String> {
        self.group_indices(|o| &o.sample_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Distinct OTU ids in first-appearance order.
    pub fn otu_ids(&self) -> Vec<String> {
        self.group_indices(|o| &o.otu_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Row indices grouped by `key`, groups in first-appearance order.
    pub fn group_indices<F>(&self, key: F) -> Vec<(String, Vec<usize>)>
    where
        F: Fn(&Observation) -> &String,
    {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            let k = key(row);
            match position.get(k.as_str()) {
                Some(&g) => groups[g].1.push(idx),
                None => {
                    position.insert(k.as_str(), groups.len());
                    groups.push((k.clone(), vec![idx]));
                }
            }
        }
        groups
    }

    /// Write the table as TSV. Columns not yet computed are written as `NA`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;

        let mut header: Vec<String> = vec![SAMPLE_ID_COLUMN.to_string()];
        header.extend(self.metadata_columns.iter().cloned());
        header.push(OTU_ID_COLUMN.to_string());
        header.extend(Rank::ALL.iter().map(|r| r.to_string()));
        header.extend(DERIVED_COLUMNS.iter().map(|s| s.to_string()));
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            record.push(row.sample_id.clone());
            record.extend(row.metadata.iter().map(|v| v.to_string()));
            record.push(row.otu_id.clone());
            record.extend(
                Rank::ALL
                    .iter()
                    .map(|&r| row.lineage.get(r).unwrap_or("NA").to_string()),
            );
            record.push(row.value.to_string());
            record.push(or_na(row.depth));
            record.push(or_na(row.prev));
            record.push(or_na(row.ra));
            record.push(or_na(row.status));
            record.push(or_na(row.log_ra));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "NA".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table() -> ObservationTable {
        ObservationTable::new(
            vec![],
            vec![
                Observation::new("S1", "OTU1", 3),
                Observation::new("S1", "OTU2", 0),
                Observation::new("S2", "OTU1", 1),
                Observation::new("S2", "OTU2", 4),
            ],
        )
    }

    #[test]
    fn test_group_indices_keep_first_appearance_order() {
        let t = table();
        let by_otu = t.group_indices(|o| &o.otu_id);
        assert_eq!(by_otu.len(), 2);
        assert_eq!(by_otu[0], ("OTU1".to_string(), vec![0, 2]));
        assert_eq!(by_otu[1], ("OTU2".to_string(), vec![1, 3]));
        assert_eq!(t.sample_ids(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_filtered_returns_new_table() {
        let t = table();
        let nonzero = t.filtered(|o| o.value > 0);
        assert_eq!(nonzero.len(), 3);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_ensure_nonempty() {
        let t = table();
        assert!(t.ensure_nonempty("test").is_ok());
        let empty = t.filtered(|_| false);
        assert!(matches!(
            empty.ensure_nonempty("test"),
            Err(TidyError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_to_tsv_writes_na_for_missing_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tidy.tsv");
        table().to_tsv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("SampleID\tvariable\tKingdom"));
        assert!(header.ends_with("value\tDepth\tprev\tRA\tStatus\tlogRA"));
        let first = lines.next().unwrap();
        assert!(first.starts_with("S1\tOTU1\tNA"));
        assert!(first.ends_with("3\tNA\tNA\tNA\tNA\tNA"));
    }
}
