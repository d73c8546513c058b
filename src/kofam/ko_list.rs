//! The KOfam `ko_list`: per-KO scoring thresholds and definitions.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::domain::{KoNumber, MissingPolicy};
use crate::error::ProfileDbError;
use crate::fs_util::fs_error;

const COLUMNS: usize = 12;
const DEFINITION_COLUMN: usize = COLUMNS - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    /// Compare the threshold to the full-sequence score.
    Full,
    /// Compare the threshold to the best single-domain score.
    Domain,
}

impl FromStr for ScoreType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full" => Ok(ScoreType::Full),
            "domain" => Ok(ScoreType::Domain),
            other => Err(format!("unknown score type {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KoClass {
    Usable,
    NoThreshold,
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KoEntry {
    pub ko: KoNumber,
    pub threshold: Option<f64>,
    pub score_type: Option<ScoreType>,
    pub profile_type: Option<String>,
    pub f_measure: Option<f64>,
    pub nseq: Option<u32>,
    pub nseq_used: Option<u32>,
    pub alen: Option<u32>,
    pub mlen: Option<u32>,
    pub eff_nseq: Option<f64>,
    pub re_pos: Option<f64>,
    pub definition: String,
    raw: String,
}

impl KoEntry {
    /// Whether a hit with these scores passes the KO's threshold. Entries
    /// without a threshold accept everything.
    pub fn passes(&self, full_score: f64, domain_score: f64) -> bool {
        match (self.threshold, self.score_type) {
            (None, _) => true,
            (Some(threshold), Some(ScoreType::Domain)) => domain_score >= threshold,
            (Some(threshold), _) => full_score >= threshold,
        }
    }

    /// The entry as it appeared in the file, tab separated.
    pub fn raw_line(&self) -> &str {
        &self.raw
    }
}

/// Classifies a row by its data columns (everything between the KO number
/// and the definition). A row is usable when it has a threshold; without
/// one it still counts as having data if any other column is filled.
pub fn classify(data_columns: &[&str]) -> KoClass {
    match data_columns.split_first() {
        Some((threshold, _)) if *threshold != "-" => KoClass::Usable,
        Some((_, rest)) if rest.iter().any(|value| *value != "-") => KoClass::NoThreshold,
        _ => KoClass::NoData,
    }
}

#[derive(Debug, Clone, Default)]
pub struct KoList {
    header: String,
    usable: BTreeMap<KoNumber, KoEntry>,
    no_threshold: BTreeMap<KoNumber, KoEntry>,
    no_data: BTreeMap<KoNumber, KoEntry>,
}

impl KoList {
    pub fn load(path: &Path) -> Result<Self, ProfileDbError> {
        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        Self::from_reader(file, path)
    }

    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, ProfileDbError> {
        let parse_error = |line: u64, message: String| ProfileDbError::Parse {
            path: PathBuf::from(path),
            message: format!("line {line}: {message}"),
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let header = csv_reader
            .headers()
            .map_err(|err| parse_error(1, err.to_string()))?;
        if header.get(0) != Some("knum") || header.len() != COLUMNS {
            return Err(parse_error(1, format!("unexpected header {header:?}")));
        }
        let mut list = KoList {
            header: header.iter().collect::<Vec<_>>().join("\t"),
            ..KoList::default()
        };

        for record in csv_reader.records() {
            let record = record.map_err(|err| parse_error(0, err.to_string()))?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            let fields: Vec<&str> = record.iter().collect();
            if fields.len() != COLUMNS {
                return Err(parse_error(
                    line,
                    format!("expected {COLUMNS} columns, found {}", fields.len()),
                ));
            }

            let entry = parse_entry(&fields).map_err(|message| parse_error(line, message))?;
            if list.class_of(entry.ko.as_str()).is_some() {
                return Err(parse_error(line, format!("duplicate entry {}", entry.ko)));
            }
            let partition = match classify(&fields[1..DEFINITION_COLUMN]) {
                KoClass::Usable => &mut list.usable,
                KoClass::NoThreshold => &mut list.no_threshold,
                KoClass::NoData => &mut list.no_data,
            };
            partition.insert(entry.ko.clone(), entry);
        }

        Ok(list)
    }

    pub fn class_of(&self, ko: &str) -> Option<KoClass> {
        let ko: KoNumber = ko.parse().ok()?;
        if self.usable.contains_key(&ko) {
            Some(KoClass::Usable)
        } else if self.no_threshold.contains_key(&ko) {
            Some(KoClass::NoThreshold)
        } else if self.no_data.contains_key(&ko) {
            Some(KoClass::NoData)
        } else {
            None
        }
    }

    /// Usable entries only.
    pub fn get(&self, ko: &str) -> Option<&KoEntry> {
        ko.parse().ok().and_then(|ko: KoNumber| self.usable.get(&ko))
    }

    fn any(&self, ko: &str) -> Option<&KoEntry> {
        let ko: KoNumber = ko.parse().ok()?;
        self.usable
            .get(&ko)
            .or_else(|| self.no_threshold.get(&ko))
            .or_else(|| self.no_data.get(&ko))
    }

    pub fn definition(&self, ko: &str, policy: MissingPolicy) -> Result<String, ProfileDbError> {
        match (self.any(ko), policy) {
            (Some(entry), _) => Ok(entry.definition.clone()),
            (None, MissingPolicy::Placeholder) => Ok(format!("Unknown function with KO num {ko}")),
            (None, MissingPolicy::Strict) => Err(ProfileDbError::UnknownIdentifier(ko.to_string())),
        }
    }

    pub fn usable(&self) -> impl Iterator<Item = &KoEntry> {
        self.usable.values()
    }

    pub fn no_threshold(&self) -> impl Iterator<Item = &KoEntry> {
        self.no_threshold.values()
    }

    pub fn no_data(&self) -> impl Iterator<Item = &KoEntry> {
        self.no_data.values()
    }

    pub fn len(&self) -> usize {
        self.usable.len() + self.no_threshold.len() + self.no_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the header and every entry that is not usable, in file format.
    pub fn write_orphans(&self, path: &Path) -> Result<usize, ProfileDbError> {
        let file = File::create(path).map_err(|err| fs_error(path, err))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", self.header).map_err(|err| fs_error(path, err))?;
        let mut count = 0;
        for entry in self.no_threshold().chain(self.no_data()) {
            writeln!(writer, "{}", entry.raw_line()).map_err(|err| fs_error(path, err))?;
            count += 1;
        }
        writer.flush().map_err(|err| fs_error(path, err))?;
        Ok(count)
    }
}

fn parse_entry(fields: &[&str]) -> Result<KoEntry, String> {
    Ok(KoEntry {
        ko: fields[0].parse().map_err(|_| format!("invalid KO number {:?}", fields[0]))?,
        threshold: optional(fields[1])?,
        score_type: optional(fields[2])?,
        profile_type: optional(fields[3])?,
        f_measure: optional(fields[4])?,
        nseq: optional(fields[5])?,
        nseq_used: optional(fields[6])?,
        alen: optional(fields[7])?,
        mlen: optional(fields[8])?,
        eff_nseq: optional(fields[9])?,
        re_pos: optional(fields[10])?,
        definition: fields[DEFINITION_COLUMN].to_string(),
        raw: fields.join("\t"),
    })
}

fn optional<T: FromStr>(value: &str) -> Result<Option<T>, String> {
    if value == "-" {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("unexpected value {value:?}"))
}
