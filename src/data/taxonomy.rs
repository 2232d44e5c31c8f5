//! Taxonomy lookup table: one lineage per OTU.
//!
//! The table is read either from its pre-serialized binary form (bincode) or
//! from a TSV with a `variable` column holding the OTU id and one column per
//! rank (`Kingdom` … `Species`). Rank columns that are absent or empty are
//! treated as unassigned.

use crate::error::{require_file, Result, TidyError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Taxonomic ranks carried by a lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rank::Kingdom => "Kingdom",
            Rank::Phylum => "Phylum",
            Rank::Class => "Class",
            Rank::Order => "Order",
            Rank::Family => "Family",
            Rank::Genus => "Genus",
            Rank::Species => "Species",
        };
        f.write_str(name)
    }
}

/// Rank assignments for one OTU. `None` means unassigned at that rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
}

impl Lineage {
    /// Assignment at `rank`, if any.
    pub fn get(&self, rank: Rank) -> Option<&str> {
        let slot = match rank {
            Rank::Kingdom => &self.kingdom,
            Rank::Phylum => &self.phylum,
            Rank::Class => &self.class,
            Rank::Order => &self.order,
            Rank::Family => &self.family,
            Rank::Genus => &self.genus,
            Rank::Species => &self.species,
        };
        slot.as_deref()
    }

    /// Set the assignment at `rank`.
    pub fn with(mut self, rank: Rank, name: &str) -> Self {
        let value = Some(name.to_string());
        match rank {
            Rank::Kingdom => self.kingdom = value,
            Rank::Phylum => self.phylum = value,
            Rank::Class => self.class = value,
            Rank::Order => self.order = value,
            Rank::Family => self.family = value,
            Rank::Genus => self.genus = value,
            Rank::Species => self.species = value,
        }
        self
    }
}

/// One row of the taxonomy table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRecord {
    pub otu_id: String,
    pub lineage: Lineage,
}

/// Flat TSV layout of a taxonomy row.
#[derive(Debug, Serialize, Deserialize)]
struct TsvRow {
    #[serde(rename = "variable")]
    otu_id: String,
    #[serde(rename = "Kingdom", default)]
    kingdom: Option<String>,
    #[serde(rename = "Phylum", default)]
    phylum: Option<String>,
    #[serde(rename = "Class", default)]
    class: Option<String>,
    #[serde(rename = "Order", default)]
    order: Option<String>,
    #[serde(rename = "Family", default)]
    family: Option<String>,
    #[serde(rename = "Genus", default)]
    genus: Option<String>,
    #[serde(rename = "Species", default)]
    species: Option<String>,
}

impl From<TsvRow> for TaxonomyRecord {
    fn from(row: TsvRow) -> Self {
        Self {
            otu_id: row.otu_id,
            lineage: Lineage {
                kingdom: row.kingdom,
                phylum: row.phylum,
                class: row.class,
                order: row.order,
                family: row.family,
                genus: row.genus,
                species: row.species,
            },
        }
    }
}

impl From<&TaxonomyRecord> for TsvRow {
    fn from(record: &TaxonomyRecord) -> Self {
        let lineage = record.lineage.clone();
        Self {
            otu_id: record.otu_id.clone(),
            kingdom: lineage.kingdom,
            phylum: lineage.phylum,
            class: lineage.class,
            order: lineage.order,
            family: lineage.family,
            genus: lineage.genus,
            species: lineage.species,
        }
    }
}

/// Lookup from OTU id to lineage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyTable {
    records: Vec<TaxonomyRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TaxonomyTable {
    /// Build a table from records. OTU ids must be unique.
    pub fn new(records: Vec<TaxonomyRecord>) -> Result<Self> {
        let mut table = Self {
            records,
            index: HashMap::new(),
        };
        table.rebuild_index()?;
        Ok(table)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();
        for (idx, record) in self.records.iter().enumerate() {
            if self.index.insert(record.otu_id.clone(), idx).is_some() {
                return Err(TidyError::InvalidParameter(format!(
                    "duplicate OTU '{}' in taxonomy",
                    record.otu_id
                )));
            }
        }
        Ok(())
    }

    /// Load from a file, choosing the format by extension:
    /// `.tsv`/`.txt` are read as TSV, anything else as the binary artifact.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") | Some("txt") => Self::from_tsv(path),
            _ => Self::from_bincode(path),
        }
    }

    /// Load the pre-serialized binary taxonomy table.
    pub fn from_bincode<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        require_file(path)?;
        let reader = BufReader::new(File::open(path)?);
        let mut table: Self = bincode::deserialize_from(reader)?;
        table.rebuild_index().map_err(|e| TidyError::Parse {
            path: path.to_path_buf(),
            line: 0,
            message: e.to_string(),
        })?;
        Ok(table)
    }

    /// Write the binary taxonomy artifact.
    pub fn to_bincode<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    /// Load a taxonomy table from TSV.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        require_file(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<TsvRow>().enumerate() {
            let row = row.map_err(|e| TidyError::Parse {
                path: path.to_path_buf(),
                line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 2),
                message: e.to_string(),
            })?;
            records.push(TaxonomyRecord::from(row));
        }

        Self::new(records).map_err(|e| TidyError::Parse {
            path: path.to_path_buf(),
            line: 0,
            message: e.to_string(),
        })
    }

    /// Write the table as TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        for record in &self.records {
            writer.serialize(TsvRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Lineage of an OTU, if the table covers it.
    pub fn lineage(&self, otu_id: &str) -> Option<&Lineage> {
        self.index.get(otu_id).map(|&idx| &self.records[idx].lineage)
    }

    pub fn contains(&self, otu_id: &str) -> bool {
        self.index.contains_key(otu_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TaxonomyRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn sample_table() -> TaxonomyTable {
        TaxonomyTable::new(vec![
            TaxonomyRecord {
                otu_id: "OTU1".into(),
                lineage: Lineage::default()
                    .with(Rank::Kingdom, "Bacteria")
                    .with(Rank::Class, "Chloroplast"),
            },
            TaxonomyRecord {
                otu_id: "OTU2".into(),
                lineage: Lineage::default()
                    .with(Rank::Kingdom, "Bacteria")
                    .with(Rank::Family, "Rhizobiaceae"),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let table = sample_table();
        assert_eq!(table.len(), 2);
        assert!(table.contains("OTU2"));
        assert!(!table.contains("OTU3"));
        let lineage = table.lineage("OTU1").unwrap();
        assert_eq!(lineage.get(Rank::Class), Some("Chloroplast"));
        assert_eq!(lineage.get(Rank::Family), None);
    }

    #[test]
    fn test_duplicate_otu_rejected() {
        let record = TaxonomyRecord {
            otu_id: "OTU1".into(),
            lineage: Lineage::default(),
        };
        assert!(TaxonomyTable::new(vec![record.clone(), record]).is_err());
    }

    #[test]
    fn test_bincode_roundtrip_restores_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taxonomy.bin");
        let table = sample_table();
        table.to_bincode(&path).unwrap();

        let loaded = TaxonomyTable::load(&path).unwrap();
        assert_eq!(loaded.records(), table.records());
        assert_eq!(
            loaded.lineage("OTU2").and_then(|l| l.get(Rank::Family)),
            Some("Rhizobiaceae")
        );
    }

    #[test]
    fn test_tsv_with_missing_ranks_and_extra_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "variable\tKingdom\tClass\tFamily\tConfidence").unwrap();
        writeln!(file, "OTU1\tBacteria\t\tmitochondria\t0.9").unwrap();
        writeln!(file, "OTU2\tBacteria\tAlphaproteobacteria\t\t0.8").unwrap();
        file.flush().unwrap();

        let table = TaxonomyTable::from_tsv(file.path()).unwrap();
        let otu1 = table.lineage("OTU1").unwrap();
        assert_eq!(otu1.get(Rank::Family), Some("mitochondria"));
        assert_eq!(otu1.get(Rank::Class), None);
        assert_eq!(otu1.get(Rank::Genus), None);
    }

    #[test]
    fn test_tsv_ragged_row_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "variable\tKingdom\tFamily").unwrap();
        writeln!(file, "OTU1\tBacteria").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            TaxonomyTable::from_tsv(file.path()),
            Err(TidyError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_binary_file() {
        assert!(matches!(
            TaxonomyTable::load("/no/such/taxonomy.bin"),
            Err(TidyError::MissingFile { .. })
        ));
    }
}
