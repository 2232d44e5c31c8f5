//! Sample metadata keyed by `SampleID`.

use super::observation::is_reserved_column;
use crate::error::{require_file, Result, TidyError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Name of the key column in sample metadata tables.
pub const SAMPLE_ID_COLUMN: &str = "SampleID";

/// A metadata value that can be categorical or continuous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Categorical(s) => write!(f, "{}", s),
            Variable::Continuous(v) => write!(f, "{}", v),
            Variable::Missing => write!(f, "NA"),
        }
    }
}

/// Inferred type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Sample metadata: one row per sample, any number of descriptive columns.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Name of the key column (normally `SampleID`).
    key_column: String,
    /// Sample IDs in row order.
    sample_ids: Vec<String>,
    /// Names of the non-key columns.
    column_names: Vec<String>,
    /// sample_id -> values, aligned to `column_names`.
    rows: HashMap<String, Vec<Variable>>,
    /// Inferred type of each non-key column.
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Load metadata from a TSV file keyed by the `SampleID` column.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_tsv_keyed(path, SAMPLE_ID_COLUMN)
    }

    /// Load metadata from a TSV file keyed by `key_column`.
    ///
    /// The key column may sit anywhere in the header. Columns are inferred as
    /// continuous if every non-missing value parses as a number, otherwise
    /// categorical. Empty cells and `NA` are missing.
    pub fn from_tsv_keyed<P: AsRef<Path>>(path: P, key_column: &str) -> Result<Self> {
        let path = path.as_ref();
        require_file(path)?;
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let parse_err = |line: usize, message: String| TidyError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let header_line = lines
            .next()
            .ok_or_else(|| parse_err(1, "empty metadata file".to_string()))??;
        let header: Vec<String> = header_line
            .trim_end_matches('\r')
            .split('\t')
            .map(|s| s.trim().to_string())
            .collect();
        let key_idx = header
            .iter()
            .position(|h| h == key_column)
            .ok_or_else(|| parse_err(1, format!("no '{}' column in header", key_column)))?;
        let column_names: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != key_idx)
            .map(|(_, h)| h.clone())
            .collect();
        check_column_names(&column_names).map_err(|message| parse_err(1, message))?;

        // First pass: collect raw cells so column types can be inferred
        let mut raw_rows: Vec<(String, Vec<String>)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (idx, line_result) in lines.enumerate() {
            let line_no = idx + 2;
            let line = line_result?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != header.len() {
                return Err(parse_err(
                    line_no,
                    format!("expected {} columns, found {}", header.len(), fields.len()),
                ));
            }
            let sample_id = fields[key_idx].trim().to_string();
            if !seen.insert(sample_id.clone()) {
                return Err(parse_err(
                    line_no,
                    format!("duplicate {} '{}'", key_column, sample_id),
                ));
            }
            let values: Vec<String> = fields
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != key_idx)
                .map(|(_, s)| s.trim().to_string())
                .collect();
            raw_rows.push((sample_id, values));
        }

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = raw_rows.iter().all(|(_, values)| {
                let v = values[col_idx].as_str();
                is_missing_token(v) || v.parse::<f64>().is_ok()
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::with_capacity(raw_rows.len());
        let mut rows = HashMap::with_capacity(raw_rows.len());
        for (sample_id, values) in raw_rows {
            let parsed: Vec<Variable> = values
                .iter()
                .zip(&column_names)
                .map(|(raw, col_name)| {
                    if is_missing_token(raw) {
                        return Variable::Missing;
                    }
                    match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        _ => Variable::Categorical(raw.clone()),
                    }
                })
                .collect();
            sample_ids.push(sample_id.clone());
            rows.insert(sample_id, parsed);
        }

        Ok(Self {
            key_column: key_column.to_string(),
            sample_ids,
            column_names,
            rows,
            column_types,
        })
    }

    /// Build metadata in memory from `(sample_id, values)` rows.
    pub fn from_rows(
        column_names: Vec<String>,
        rows: Vec<(String, Vec<Variable>)>,
    ) -> Result<Self> {
        check_column_names(&column_names).map_err(TidyError::InvalidParameter)?;
        let mut sample_ids = Vec::with_capacity(rows.len());
        let mut data = HashMap::with_capacity(rows.len());
        for (sample_id, values) in rows {
            if values.len() != column_names.len() {
                return Err(TidyError::InvalidParameter(format!(
                    "sample '{}' has {} values for {} columns",
                    sample_id,
                    values.len(),
                    column_names.len()
                )));
            }
            if data.insert(sample_id.clone(), values).is_some() {
                return Err(TidyError::InvalidParameter(format!(
                    "duplicate sample '{}'",
                    sample_id
                )));
            }
            sample_ids.push(sample_id);
        }

        let column_types = column_names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let continuous = data.values().all(|vals: &Vec<Variable>| {
                    matches!(vals[idx], Variable::Continuous(_) | Variable::Missing)
                });
                let var_type = if continuous {
                    VariableType::Continuous
                } else {
                    VariableType::Categorical
                };
                (name.clone(), var_type)
            })
            .collect();

        Ok(Self {
            key_column: SAMPLE_ID_COLUMN.to_string(),
            sample_ids,
            column_names,
            rows: data,
            column_types,
        })
    }

    /// Name of the key column.
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Non-key column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// All values for one sample, aligned to [`Metadata::column_names`].
    pub fn row(&self, sample_id: &str) -> Option<&[Variable]> {
        self.rows.get(sample_id).map(|v| v.as_slice())
    }

    /// Get a value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        let idx = self.column_names.iter().position(|c| c == column)?;
        self.rows.get(sample_id).map(|v| &v[idx])
    }

    /// Get the inferred type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.rows.contains_key(sample_id)
    }

    /// Reorder metadata rows to match `sample_ids` exactly.
    ///
    /// Fails with [`TidyError::Alignment`] on the first sample that has no
    /// metadata row. Metadata rows not named in `sample_ids` are left out.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let mut rows = HashMap::with_capacity(sample_ids.len());
        for sid in sample_ids {
            if rows.contains_key(sid) {
                return Err(TidyError::InvalidParameter(format!(
                    "sample '{}' requested twice",
                    sid
                )));
            }
            let values = self.rows.get(sid).ok_or_else(|| TidyError::Alignment {
                sample: sid.clone(),
            })?;
            rows.insert(sid.clone(), values.clone());
        }

        Ok(Self {
            key_column: self.key_column.clone(),
            sample_ids: sample_ids.to_vec(),
            column_names: self.column_names.clone(),
            rows,
            column_types: self.column_types.clone(),
        })
    }
}

/// Metadata columns are carried into tidy output next to the fixed columns,
/// so their names must be unique and must not shadow those.
fn check_column_names(names: &[String]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(format!("duplicate metadata column '{}'", name));
        }
        if is_reserved_column(name) {
            return Err(format!("metadata column '{}' clashes with an output column", name));
        }
    }
    Ok(())
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na"
}
