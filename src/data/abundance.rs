//! OTU abundance matrix with sparse storage.

use crate::error::{require_file, Result, TidyError};
use sprs::{CsMat, TriMat};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A sparse matrix of raw read counts.
///
/// Rows represent OTUs, columns represent samples.
/// Uses CSR (Compressed Sparse Row) format for efficient per-OTU access.
#[derive(Debug, Clone)]
pub struct AbundanceMatrix {
    /// Sparse matrix in CSR format (OTUs × samples)
    data: CsMat<u64>,
    /// OTU identifiers (row names)
    otu_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl AbundanceMatrix {
    /// Create a new AbundanceMatrix from a sparse matrix and identifiers.
    pub fn new(data: CsMat<u64>, otu_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != otu_ids.len() {
            return Err(TidyError::InvalidParameter(format!(
                "matrix has {} rows but {} OTU ids were given",
                nrows,
                otu_ids.len()
            )));
        }
        if ncols != sample_ids.len() {
            return Err(TidyError::InvalidParameter(format!(
                "matrix has {} columns but {} sample ids were given",
                ncols,
                sample_ids.len()
            )));
        }
        if let Some(dup) = first_duplicate(&otu_ids) {
            return Err(TidyError::InvalidParameter(format!("duplicate OTU id '{}'", dup)));
        }
        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(TidyError::InvalidParameter(format!(
                "duplicate sample id '{}'",
                dup
            )));
        }
        Ok(Self {
            data,
            otu_ids,
            sample_ids,
        })
    }

    /// Build a matrix from dense rows (one `Vec` per OTU, one entry per sample).
    pub fn from_rows(rows: &[Vec<u64>], otu_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut tri_mat = TriMat::new((rows.len(), n_samples));
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_samples {
                return Err(TidyError::InvalidParameter(format!(
                    "row {} has {} values, expected {}",
                    row,
                    values.len(),
                    n_samples
                )));
            }
            for (col, &val) in values.iter().enumerate() {
                if val > 0 {
                    tri_mat.add_triplet(row, col, val);
                }
            }
        }
        Self::new(tri_mat.to_csr(), otu_ids, sample_ids)
    }

    /// Load an abundance matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the OTU ID header)
    /// - Subsequent rows: OTU ID followed by one non-negative integer per sample
    ///
    /// Every row must have as many fields as the header.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
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
            .ok_or_else(|| parse_err(1, "empty abundance table".to_string()))??;
        let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
        if header.len() < 2 {
            return Err(parse_err(1, "header must name at least one sample".to_string()));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(parse_err(1, format!("duplicate sample id '{}'", dup)));
        }
        let n_fields = header.len();

        let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
        let mut otu_ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (idx, line_result) in lines.enumerate() {
            let line_no = idx + 2;
            let line = line_result?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n_fields {
                return Err(parse_err(
                    line_no,
                    format!("expected {} columns, found {}", n_fields, fields.len()),
                ));
            }

            let otu_id = fields[0].trim().to_string();
            if !seen.insert(otu_id.clone()) {
                return Err(parse_err(line_no, format!("duplicate OTU id '{}'", otu_id)));
            }
            let row = otu_ids.len();
            otu_ids.push(otu_id);

            for (col, value_str) in fields[1..].iter().enumerate() {
                let value: u64 = value_str.trim().parse().map_err(|_| {
                    parse_err(
                        line_no,
                        format!(
                            "invalid count '{}' for sample '{}'",
                            value_str, sample_ids[col]
                        ),
                    )
                })?;
                if value > 0 {
                    triplets.push((row, col, value));
                }
            }
        }

        if otu_ids.is_empty() {
            return Err(parse_err(1, "no OTU rows in abundance table".to_string()));
        }

        let mut tri_mat = TriMat::new((otu_ids.len(), sample_ids.len()));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), otu_ids, sample_ids)
    }

    /// Write the abundance matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "OTU")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row, otu_id) in self.otu_ids.iter().enumerate() {
            write!(writer, "{}", otu_id)?;
            for col in 0..self.n_samples() {
                write!(writer, "\t{}", self.get(row, col))?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get the count at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    /// Number of OTUs (rows).
    #[inline]
    pub fn n_otus(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Total number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    #[inline]
    pub fn otu_ids(&self) -> &[String] {
        &self.otu_ids
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get a dense vector for a specific column (sample).
    pub fn col_dense(&self, col: usize) -> Vec<u64> {
        (0..self.n_otus()).map(|row| self.get(row, col)).collect()
    }

    /// Column sums (raw sequencing depth per sample, before any filtering).
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    ids.iter().find(|id| !seen.insert(id.as_str())).map(|s| s.as_str())
}
