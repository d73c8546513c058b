//! InteracDome binding-frequency tables and the Pfam clan catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::Deserialize;

use crate::domain::{MissingPolicy, PfamAccession};
use crate::error::ProfileDbError;
use crate::fs_util::fs_error;

#[derive(Debug, Deserialize)]
struct InteractionRow {
    pfam_id: String,
    ligand_type: String,
    binding_frequencies: String,
}

/// Per-family, per-ligand binding frequencies over the family's HMM match
/// states, in match-state order.
#[derive(Debug, Clone, Default)]
pub struct BindingFrequencyTable {
    families: BTreeMap<PfamAccession, BTreeMap<String, Vec<f64>>>,
}

impl BindingFrequencyTable {
    pub fn load(path: &Path) -> Result<Self, ProfileDbError> {
        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        Self::from_reader(file, path)
    }

    /// Reads a tab-separated table with `#` comment lines and a header row.
    /// The family is the part of `pfam_id` before the first `_`.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, ProfileDbError> {
        let parse_error = |message: String| ProfileDbError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .has_headers(true)
            .from_reader(reader);

        let mut table = BindingFrequencyTable::default();
        for row in csv_reader.deserialize::<InteractionRow>() {
            let row = row.map_err(|err| parse_error(err.to_string()))?;
            let family = row.pfam_id.split('_').next().unwrap_or_default();
            let family: PfamAccession = family
                .parse()
                .map_err(|_| parse_error(format!("unexpected pfam_id {:?}", row.pfam_id)))?;
            let frequencies = row
                .binding_frequencies
                .split(',')
                .map(|value| value.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| {
                    parse_error(format!(
                        "non-numeric binding frequencies for {} / {}",
                        row.pfam_id, row.ligand_type
                    ))
                })?;
            table
                .families
                .entry(family)
                .or_default()
                .insert(row.ligand_type, frequencies);
        }
        Ok(table)
    }

    pub fn contains(&self, family: &PfamAccession) -> bool {
        self.families.contains_key(family)
    }

    pub fn ligands(&self, family: &PfamAccession) -> Option<&BTreeMap<String, Vec<f64>>> {
        self.families.get(family)
    }

    pub fn families(&self) -> BTreeSet<PfamAccession> {
        self.families.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// Max and mean of `frequencies` over the 1-based, inclusive match-state
/// range `hmm_start..=hmm_stop`, clipped to the vector. `None` when the
/// range covers nothing.
pub fn summarize_span(frequencies: &[f64], hmm_start: usize, hmm_stop: usize) -> Option<(f64, f64)> {
    let start = hmm_start.max(1) - 1;
    let stop = hmm_stop.min(frequencies.len());
    if start >= stop {
        return None;
    }
    let covered = &frequencies[start..stop];
    let max = covered.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = covered.iter().sum::<f64>() / covered.len() as f64;
    Some((max, mean))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClanEntry {
    pub clan_accession: Option<String>,
    pub clan_name: Option<String>,
    pub family_name: String,
    pub description: String,
}

/// `Pfam-A.clans.tsv`: accession, clan accession, clan name, family name,
/// description. No header.
#[derive(Debug, Clone, Default)]
pub struct ClanCatalog {
    entries: BTreeMap<PfamAccession, ClanEntry>,
}

impl ClanCatalog {
    pub fn load(path: &Path) -> Result<Self, ProfileDbError> {
        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        Self::from_reader(file, path)
    }

    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, ProfileDbError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut catalog = ClanCatalog::default();
        for record in csv_reader.records() {
            let record = record.map_err(|err| ProfileDbError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            if record.len() < 5 {
                return Err(ProfileDbError::Parse {
                    path: path.to_path_buf(),
                    message: format!("line {line}: expected 5 columns, found {}", record.len()),
                });
            }
            let accession: PfamAccession =
                record[0].parse().map_err(|_| ProfileDbError::Parse {
                    path: path.to_path_buf(),
                    message: format!("line {line}: invalid accession {:?}", &record[0]),
                })?;
            let optional = |value: &str| (!value.is_empty() && value != "\\N").then(|| value.to_string());
            catalog.entries.insert(
                accession,
                ClanEntry {
                    clan_accession: optional(&record[1]),
                    clan_name: optional(&record[2]),
                    family_name: record[3].to_string(),
                    description: record[4].to_string(),
                },
            );
        }
        Ok(catalog)
    }

    pub fn get(&self, accession: &PfamAccession) -> Option<&ClanEntry> {
        self.entries.get(accession)
    }

    pub fn definition(
        &self,
        accession: &PfamAccession,
        policy: MissingPolicy,
    ) -> Result<String, ProfileDbError> {
        match (self.entries.get(accession), policy) {
            (Some(entry), _) => Ok(entry.description.clone()),
            (None, MissingPolicy::Placeholder) => {
                Ok(format!("Unknown function with Pfam accession {accession}"))
            }
            (None, MissingPolicy::Strict) => {
                Err(ProfileDbError::UnknownIdentifier(accession.to_string()))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrites the clans file in place, keeping the rows of `families`.
pub fn filter_clans_file(
    path: &Path,
    families: &BTreeSet<PfamAccession>,
) -> Result<usize, ProfileDbError> {
    let tmp_path = path.with_extension("tsv.tmp");
    let reader = BufReader::new(File::open(path).map_err(|err| fs_error(path, err))?);
    let mut writer =
        BufWriter::new(File::create(&tmp_path).map_err(|err| fs_error(&tmp_path, err))?);

    let mut kept = 0;
    for line in reader.lines() {
        let line = line.map_err(|err| fs_error(path, err))?;
        let accession = line
            .split('\t')
            .next()
            .and_then(|value| value.parse::<PfamAccession>().ok());
        if accession.is_some_and(|accession| families.contains(&accession)) {
            writeln!(writer, "{line}").map_err(|err| fs_error(&tmp_path, err))?;
            kept += 1;
        }
    }
    writer.flush().map_err(|err| fs_error(&tmp_path, err))?;
    drop(writer);
    fs::rename(&tmp_path, path).map_err(|err| fs_error(path, err))?;
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;

    use super::*;

    const TABLE: &str = "\
# InteracDome v0.3
pfam_id\tdomain_length\tligand_type\tnum_nonidentical_instances\tnum_structures\tbinding_frequencies
PF00005_ABC_tran\t4\tATP_\t12\t40\t0.0,0.5,1.0,0.25
PF00005_ABC_tran\t4\tMG_\t3\t8\t0.0,0.0,0.1,0.0
PF00069_Pkinase\t2\tADP_\t7\t20\t0.9,0.1
";

    fn accession(value: &str) -> PfamAccession {
        value.parse().unwrap()
    }

    #[test]
    fn table_groups_ligands_by_family() {
        let table = BindingFrequencyTable::from_reader(Cursor::new(TABLE), Path::new("t.txt")).unwrap();
        assert_eq!(table.len(), 2);
        let ligands = table.ligands(&accession("PF00005")).unwrap();
        assert_eq!(ligands.len(), 2);
        assert_eq!(ligands["ATP_"], vec![0.0, 0.5, 1.0, 0.25]);
        assert!(!table.contains(&accession("PF00001")));
    }

    #[test]
    fn non_numeric_frequency_is_rejected() {
        let text = "pfam_id\tdomain_length\tligand_type\tnum_nonidentical_instances\tnum_structures\tbinding_frequencies\nPF00005_ABC\t2\tATP_\t1\t1\t0.1,x\n";
        assert_matches!(
            BindingFrequencyTable::from_reader(Cursor::new(text), Path::new("t.txt")),
            Err(ProfileDbError::Parse { .. })
        );
    }

    #[test]
    fn span_summary_is_one_based_and_clipped() {
        let frequencies = [0.0, 0.5, 1.0, 0.25];
        assert_eq!(summarize_span(&frequencies, 2, 3), Some((1.0, 0.75)));
        assert_eq!(summarize_span(&frequencies, 3, 10), Some((1.0, 0.625)));
        assert_eq!(summarize_span(&frequencies, 5, 8), None);
    }

    #[test]
    fn clans_supply_definitions() {
        let text = "PF00005\tCL0023\tP-loop_NTPase\tABC_tran\tABC transporter\nPF00069\t\t\tPkinase\tProtein kinase domain\n";
        let clans = ClanCatalog::from_reader(Cursor::new(text), Path::new("clans.tsv")).unwrap();
        assert_eq!(
            clans.definition(&accession("PF00005"), MissingPolicy::Strict).unwrap(),
            "ABC transporter"
        );
        assert_eq!(clans.get(&accession("PF00069")).unwrap().clan_accession, None);
        assert_eq!(
            clans.definition(&accession("PF99999"), MissingPolicy::Placeholder).unwrap(),
            "Unknown function with Pfam accession PF99999"
        );
    }
}
