//! Streaming access to HMMER3 text profile libraries.
//!
//! A library is a concatenation of records, each starting with a `HMMER3/`
//! header and ending with a line holding only `//`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::PfamAccession;
use crate::error::ProfileDbError;
use crate::fs_util::fs_error;

#[derive(Debug, Clone)]
pub struct HmmProfile {
    pub name: String,
    pub accession: Option<String>,
    text: String,
}

impl HmmProfile {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pfam_accession(&self) -> Option<PfamAccession> {
        self.accession.as_deref().and_then(|acc| acc.parse().ok())
    }
}

pub struct ProfileReader<R> {
    reader: R,
    path: PathBuf,
    line_number: usize,
}

impl ProfileReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ProfileDbError> {
        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> ProfileReader<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            line_number: 0,
        }
    }

    fn parse_error(&self, message: impl Into<String>) -> ProfileDbError {
        ProfileDbError::Parse {
            path: self.path.clone(),
            message: format!("line {}: {}", self.line_number, message.into()),
        }
    }

    fn next_profile(&mut self) -> Result<Option<HmmProfile>, ProfileDbError> {
        let mut text = String::new();
        let mut name = None;
        let mut accession = None;
        let mut line = String::new();

        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|err| fs_error(&self.path, err))?;
            if read == 0 {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                return Err(self.parse_error("profile is missing its '//' terminator"));
            }
            self.line_number += 1;

            if text.is_empty() && line.trim().is_empty() {
                continue;
            }
            if text.is_empty() && !line.starts_with("HMMER3") {
                return Err(self.parse_error(format!("expected HMMER3 header, found {line:?}")));
            }
            text.push_str(&line);
            if !line.ends_with('\n') {
                text.push('\n');
            }

            let trimmed = line.trim_end();
            if let Some(value) = trimmed.strip_prefix("NAME ") {
                name = Some(value.trim().to_string());
            } else if let Some(value) = trimmed.strip_prefix("ACC ") {
                accession = Some(value.trim().to_string());
            } else if trimmed == "//" {
                let name = name.ok_or_else(|| self.parse_error("profile without NAME"))?;
                return Ok(Some(HmmProfile {
                    name,
                    accession,
                    text,
                }));
            }
        }
    }
}

impl<R: BufRead> Iterator for ProfileReader<R> {
    type Item = Result<HmmProfile, ProfileDbError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_profile().transpose()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub kept: usize,
    pub dropped: usize,
}

/// Copies the profiles of `source` accepted by `keep` into `target`.
pub fn filter_library<F>(
    source: &Path,
    target: &Path,
    mut keep: F,
) -> Result<FilterSummary, ProfileDbError>
where
    F: FnMut(&HmmProfile) -> bool,
{
    let out = File::create(target).map_err(|err| fs_error(target, err))?;
    let mut writer = BufWriter::new(out);
    let mut summary = FilterSummary::default();
    for profile in ProfileReader::open(source)? {
        let profile = profile?;
        if keep(&profile) {
            writer
                .write_all(profile.text().as_bytes())
                .map_err(|err| fs_error(target, err))?;
            summary.kept += 1;
        } else {
            summary.dropped += 1;
        }
    }
    writer.flush().map_err(|err| fs_error(target, err))?;
    Ok(summary)
}

/// Names of all profiles in a library, in file order.
pub fn profile_names(path: &Path) -> Result<Vec<String>, ProfileDbError> {
    ProfileReader::open(path)?
        .map(|profile| profile.map(|profile| profile.name))
        .collect()
}
