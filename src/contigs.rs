//! SQLite contigs database: gene sequences in, function annotations out.

use std::path::{Path, PathBuf};

use bio::io::fasta;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::ProfileDbError;
use crate::fs_util::fs_error;

const SCHEMA: &str = "
CREATE TABLE self (key TEXT PRIMARY KEY, value TEXT);
CREATE TABLE gene_amino_acid_sequences (
    gene_callers_id INTEGER PRIMARY KEY,
    name TEXT,
    sequence TEXT NOT NULL
);
CREATE TABLE gene_functions (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    gene_callers_id INTEGER NOT NULL,
    source TEXT NOT NULL,
    accession TEXT NOT NULL,
    function TEXT NOT NULL,
    e_value REAL NOT NULL
);
CREATE TABLE domain_binding_frequencies (
    gene_callers_id INTEGER NOT NULL,
    pfam_id TEXT NOT NULL,
    ligand TEXT NOT NULL,
    hmm_start INTEGER NOT NULL,
    hmm_stop INTEGER NOT NULL,
    gene_start INTEGER NOT NULL,
    gene_stop INTEGER NOT NULL,
    max_frequency REAL NOT NULL,
    mean_frequency REAL NOT NULL
);
INSERT INTO self (key, value) VALUES ('db_type', 'contigs');
INSERT INTO self (key, value) VALUES ('gene_function_sources', '');
";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRow {
    pub gene_callers_id: i64,
    pub source: String,
    pub accession: String,
    pub function: String,
    pub e_value: f64,
}

/// Binding frequencies of one ligand over the HMM positions a domain hit covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingSummary {
    pub gene_callers_id: i64,
    pub pfam_id: String,
    pub ligand: String,
    pub hmm_start: usize,
    pub hmm_stop: usize,
    pub gene_start: usize,
    pub gene_stop: usize,
    pub max_frequency: f64,
    pub mean_frequency: f64,
}

pub trait FunctionStore {
    /// Writes one FASTA record per gene, headed by its gene callers id.
    fn export_amino_acid_sequences(&self, output: &Path) -> Result<usize, ProfileDbError>;

    /// Replaces all rows of `source` with `rows` and registers the source.
    fn add_gene_functions(
        &mut self,
        source: &str,
        rows: &[FunctionRow],
    ) -> Result<(), ProfileDbError>;

    /// Marks `source` as having been run without touching any rows.
    fn register_function_source(&mut self, source: &str) -> Result<(), ProfileDbError>;

    fn add_binding_summaries(&mut self, rows: &[BindingSummary]) -> Result<(), ProfileDbError>;
}

#[derive(Debug)]
pub struct ContigsDatabase {
    conn: Connection,
    path: PathBuf,
}

impl ContigsDatabase {
    pub fn create(path: &Path) -> Result<Self, ProfileDbError> {
        if path.exists() {
            return Err(ProfileDbError::Filesystem(format!(
                "{} already exists",
                path.display()
            )));
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open(path: &Path) -> Result<Self, ProfileDbError> {
        if !path.is_file() {
            return Err(ProfileDbError::Filesystem(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let conn = Connection::open(path)?;
        let db_type: Option<String> = conn
            .query_row("SELECT value FROM self WHERE key = 'db_type'", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|_| ProfileDbError::NotContigsDatabase(path.to_path_buf()))?;
        if db_type.as_deref() != Some("contigs") {
            return Err(ProfileDbError::NotContigsDatabase(path.to_path_buf()));
        }
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads protein sequences from FASTA, numbering genes from zero in file order.
    pub fn import_proteins(&mut self, fasta_path: &Path) -> Result<usize, ProfileDbError> {
        let reader = fasta::Reader::from_file(fasta_path).map_err(|err| ProfileDbError::Parse {
            path: fasta_path.to_path_buf(),
            message: err.to_string(),
        })?;
        let tx = self.conn.transaction()?;
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO gene_amino_acid_sequences (gene_callers_id, name, sequence) VALUES (?1, ?2, ?3)",
            )?;
            for record in reader.records() {
                let record = record.map_err(|err| fs_error(fasta_path, err))?;
                let sequence = String::from_utf8_lossy(record.seq()).to_uppercase();
                stmt.execute(params![count as i64, record.id(), sequence])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn add_gene_sequence(
        &mut self,
        gene_callers_id: i64,
        sequence: &str,
    ) -> Result<(), ProfileDbError> {
        self.conn.execute(
            "INSERT INTO gene_amino_acid_sequences (gene_callers_id, sequence) VALUES (?1, ?2)",
            params![gene_callers_id, sequence],
        )?;
        Ok(())
    }

    pub fn function_sources(&self) -> Result<Vec<String>, ProfileDbError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM self WHERE key = 'gene_function_sources'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(split_sources(value.as_deref().unwrap_or_default()))
    }

    pub fn gene_functions(&self, source: &str) -> Result<Vec<FunctionRow>, ProfileDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT gene_callers_id, source, accession, function, e_value FROM gene_functions
             WHERE source = ?1 ORDER BY gene_callers_id, accession",
        )?;
        let rows = stmt
            .query_map([source], |row| {
                Ok(FunctionRow {
                    gene_callers_id: row.get(0)?,
                    source: row.get(1)?,
                    accession: row.get(2)?,
                    function: row.get(3)?,
                    e_value: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn binding_summaries(&self) -> Result<Vec<BindingSummary>, ProfileDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT gene_callers_id, pfam_id, ligand, hmm_start, hmm_stop, gene_start, gene_stop,
                    max_frequency, mean_frequency
             FROM domain_binding_frequencies ORDER BY gene_callers_id, pfam_id, ligand",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BindingSummary {
                    gene_callers_id: row.get(0)?,
                    pfam_id: row.get(1)?,
                    ligand: row.get(2)?,
                    hmm_start: row.get::<_, i64>(3)? as usize,
                    hmm_stop: row.get::<_, i64>(4)? as usize,
                    gene_start: row.get::<_, i64>(5)? as usize,
                    gene_stop: row.get::<_, i64>(6)? as usize,
                    max_frequency: row.get(7)?,
                    mean_frequency: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn split_sources(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .map(str::to_string)
        .collect()
}

fn register_source(conn: &Connection, source: &str) -> Result<(), ProfileDbError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM self WHERE key = 'gene_function_sources'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let mut sources = split_sources(value.as_deref().unwrap_or_default());
    if !sources.iter().any(|existing| existing == source) {
        sources.push(source.to_string());
    }
    conn.execute(
        "INSERT OR REPLACE INTO self (key, value) VALUES ('gene_function_sources', ?1)",
        [sources.join(",")],
    )?;
    Ok(())
}

impl FunctionStore for ContigsDatabase {
    fn export_amino_acid_sequences(&self, output: &Path) -> Result<usize, ProfileDbError> {
        let mut writer = fasta::Writer::to_file(output).map_err(|err| fs_error(output, err))?;
        let mut stmt = self.conn.prepare(
            "SELECT gene_callers_id, sequence FROM gene_amino_acid_sequences ORDER BY gene_callers_id",
        )?;
        let mut rows = stmt.query([])?;
        let mut count = 0usize;
        while let Some(row) = rows.next()? {
            let gene_callers_id: i64 = row.get(0)?;
            let sequence: String = row.get(1)?;
            if sequence.is_empty() {
                continue;
            }
            writer
                .write(&gene_callers_id.to_string(), None, sequence.as_bytes())
                .map_err(|err| fs_error(output, err))?;
            count += 1;
        }
        writer.flush().map_err(|err| fs_error(output, err))?;
        Ok(count)
    }

    fn add_gene_functions(
        &mut self,
        source: &str,
        rows: &[FunctionRow],
    ) -> Result<(), ProfileDbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM gene_functions WHERE source = ?1", [source])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO gene_functions (gene_callers_id, source, accession, function, e_value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.gene_callers_id,
                    source,
                    row.accession,
                    row.function,
                    row.e_value
                ])?;
            }
        }
        register_source(&tx, source)?;
        tx.commit()?;
        Ok(())
    }

    fn register_function_source(&mut self, source: &str) -> Result<(), ProfileDbError> {
        register_source(&self.conn, source)
    }

    fn add_binding_summaries(&mut self, rows: &[BindingSummary]) -> Result<(), ProfileDbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM domain_binding_frequencies", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO domain_binding_frequencies (gene_callers_id, pfam_id, ligand,
                    hmm_start, hmm_stop, gene_start, gene_stop, max_frequency, mean_frequency)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.gene_callers_id,
                    row.pfam_id,
                    row.ligand,
                    row.hmm_start as i64,
                    row.hmm_stop as i64,
                    row.gene_start as i64,
                    row.gene_stop as i64,
                    row.max_frequency,
                    row.mean_frequency
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
