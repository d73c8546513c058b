//! Steps shared by the annotation drivers: precondition checks, the
//! per-run temporary directory, sequence export and the search itself.

use std::path::PathBuf;

use serde::Serialize;
use tempfile::TempDir;

use crate::app::RunContext;
use crate::contigs::FunctionStore;
use crate::error::ProfileDbError;
use crate::hits::{AnnotationHit, parse_table};
use crate::hmmer::{HmmerProgram, HmmerTools, NoiseCutoff, SearchRequest, TableFormat};
use crate::store::DataDirectory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AnnotationOutcome {
    /// Nothing to write: no sequences, no hits, or every hit filtered out.
    /// The source is still registered and earlier rows are left alone.
    NoHits,
    Annotated { hits: usize, rows: usize, genes: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationReport {
    pub source: String,
    pub sequences: usize,
    pub outcome: AnnotationOutcome,
    pub retained_temp_dir: Option<String>,
}

/// Fails unless the library has been pressed and `hmmsearch` can be run.
pub fn check_preconditions<H: HmmerTools>(
    data_dir: &DataDirectory,
    hmmer: &H,
) -> Result<(), ProfileDbError> {
    let dataset = data_dir.dataset();
    for path in std::iter::once(data_dir.library_path()).chain(data_dir.index_paths()) {
        if !path.as_std_path().is_file() {
            return Err(ProfileDbError::DatasetMissing {
                dataset: dataset.to_string(),
                command: dataset.command_name().to_string(),
                path: path.into_std_path_buf(),
            });
        }
    }
    hmmer.ensure_available(HmmerProgram::Hmmsearch)
}

pub struct SearchSession {
    temp_dir: Option<TempDir>,
    root: PathBuf,
    pub sequences: PathBuf,
    pub table: PathBuf,
    pub log: PathBuf,
    pub num_sequences: usize,
}

impl SearchSession {
    /// Creates the run's temporary directory and exports the amino-acid
    /// sequences of every gene into it.
    pub fn prepare<S: FunctionStore + ?Sized>(
        store: &S,
        ctx: &RunContext<'_>,
    ) -> Result<Self, ProfileDbError> {
        let temp_dir = tempfile::Builder::new()
            .prefix("profile-dbs-")
            .keep(ctx.debug())
            .tempdir()
            .map_err(|err| ProfileDbError::Filesystem(err.to_string()))?;
        let sequences = temp_dir.path().join("AA_gene_sequences.fa");
        let num_sequences = store.export_amino_acid_sequences(&sequences)?;
        ctx.info("Amino acid sequences exported", num_sequences);

        Ok(Self {
            table: temp_dir.path().join("hmm.table"),
            log: temp_dir.path().join("hmm.log"),
            root: temp_dir.path().to_path_buf(),
            sequences,
            num_sequences,
            temp_dir: Some(temp_dir),
        })
    }

    /// Runs `hmmsearch` and parses its table. A failed search keeps the
    /// temporary directory so the log named in the error stays readable.
    pub fn search<H: HmmerTools>(
        &mut self,
        hmmer: &H,
        data_dir: &DataDirectory,
        format: TableFormat,
        cutoff: NoiseCutoff,
        num_threads: usize,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<AnnotationHit>, ProfileDbError> {
        let library = data_dir.library_path();
        let request = SearchRequest {
            library: library.as_std_path(),
            sequences: &self.sequences,
            table_output: &self.table,
            log: &self.log,
            format,
            cutoff,
            num_threads,
        };
        ctx.info("Search library", &library);
        if let Err(err) = hmmer.search(&request) {
            self.retain(ctx);
            return Err(err);
        }
        parse_table(&self.table, format)
    }

    /// Registers `source` without writing rows and wraps up the run.
    pub fn no_hits<S: FunctionStore + ?Sized>(
        self,
        store: &mut S,
        source: &str,
        reason: &str,
        ctx: &RunContext<'_>,
    ) -> Result<AnnotationReport, ProfileDbError> {
        ctx.warning(format!("{reason}; nothing will be added to the contigs database"));
        store.register_function_source(source)?;
        Ok(AnnotationReport {
            source: source.to_string(),
            sequences: self.num_sequences,
            outcome: AnnotationOutcome::NoHits,
            retained_temp_dir: self.finish(ctx),
        })
    }

    fn retain(&mut self, ctx: &RunContext<'_>) {
        if let Some(temp_dir) = self.temp_dir.take() {
            let path = temp_dir.keep();
            ctx.warning(format!(
                "the temporary directory {} is kept for inspection",
                path.display()
            ));
        }
    }

    /// Removes the temporary directory, or reports where it was kept when
    /// debugging.
    pub fn finish(self, ctx: &RunContext<'_>) -> Option<String> {
        let path = self.root.display().to_string();
        if ctx.debug() {
            ctx.warning(format!(
                "the temporary directory {path} is kept; please remember to clean it up later"
            ));
            Some(path)
        } else {
            ctx.info("Removing temporary directory", &path);
            drop(self.temp_dir);
            None
        }
    }
}
