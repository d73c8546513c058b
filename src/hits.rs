//! Parsing of `hmmsearch --tblout` / `--domtblout` tables.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::ProfileDbError;
use crate::fs_util::fs_error;
use crate::hmmer::TableFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentSpan {
    pub hmm_start: usize,
    pub hmm_stop: usize,
    pub gene_start: usize,
    pub gene_stop: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationHit {
    pub gene_callers_id: i64,
    pub profile_name: String,
    pub profile_accession: Option<String>,
    pub e_value: f64,
    pub bit_score: f64,
    /// Best domain for per-sequence tables, this domain for per-domain tables.
    pub domain_e_value: f64,
    pub domain_bit_score: f64,
    pub span: Option<AlignmentSpan>,
}

pub fn parse_table(path: &Path, format: TableFormat) -> Result<Vec<AnnotationHit>, ProfileDbError> {
    let file = File::open(path).map_err(|err| fs_error(path, err))?;
    let mut hits = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| fs_error(path, err))?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let hit = parse_line(&line, format).map_err(|message| ProfileDbError::Parse {
            path: path.to_path_buf(),
            message: format!("line {}: {message}", index + 1),
        })?;
        hits.push(hit);
    }
    Ok(hits)
}

fn parse_line(line: &str, format: TableFormat) -> Result<AnnotationHit, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (required, name_col, acc_col, full_col, domain_col) = match format {
        TableFormat::PerSequence => (18, 2, 3, 4, 7),
        TableFormat::PerDomain => (22, 3, 4, 6, 12),
    };
    if fields.len() < required {
        return Err(format!(
            "expected at least {required} columns, found {}",
            fields.len()
        ));
    }

    let span = match format {
        TableFormat::PerSequence => None,
        TableFormat::PerDomain => Some(AlignmentSpan {
            hmm_start: field(&fields, 15)?,
            hmm_stop: field(&fields, 16)?,
            gene_start: field(&fields, 17)?,
            gene_stop: field(&fields, 18)?,
        }),
    };

    Ok(AnnotationHit {
        gene_callers_id: field(&fields, 0)?,
        profile_name: fields[name_col].to_string(),
        profile_accession: match fields[acc_col] {
            "-" => None,
            acc => Some(acc.to_string()),
        },
        e_value: field(&fields, full_col)?,
        bit_score: field(&fields, full_col + 1)?,
        domain_e_value: field(&fields, domain_col)?,
        domain_bit_score: field(&fields, domain_col + 1)?,
        span,
    })
}

fn field<T: FromStr>(fields: &[&str], index: usize) -> Result<T, String> {
    fields[index]
        .parse()
        .map_err(|_| format!("column {} has unexpected value {:?}", index + 1, fields[index]))
}
