use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::annotate::AnnotationReport;
use crate::config::ResolvedConfig;
use crate::contigs::ContigsDatabase;
use crate::domain::Dataset;
use crate::download::Downloader;
use crate::error::ProfileDbError;
use crate::hmmer::{HmmerProgram, HmmerTools};
use crate::interacdome::InteracdomeSetup;
use crate::kofam::KofamSetup;
use crate::pipeline::{SetupOptions, SetupReport, run_setup};
use crate::store::{DataDirState, DataDirectory, SetupManifest};
use crate::{interacdome, kofam};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub level: EventLevel,
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Per-invocation run state handed to every stage: where progress goes and
/// whether debug retention is on.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    sink: &'a dyn ProgressSink,
    debug: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(sink: &'a dyn ProgressSink, debug: bool) -> Self {
        Self { sink, debug }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn phase(&self, phase: &str, detail: impl Into<String>) {
        self.emit(EventLevel::Info, format!("phase={phase}; {}", detail.into()), None);
    }

    pub fn info(&self, key: &str, value: impl Display) {
        self.emit(EventLevel::Info, format!("{key}: {value}"), None);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(EventLevel::Warning, message.into(), None);
    }

    pub fn timed(&self, message: String, elapsed: Duration) {
        self.emit(EventLevel::Info, message, Some(elapsed));
    }

    fn emit(&self, level: EventLevel, message: String, elapsed: Option<Duration>) {
        match level {
            EventLevel::Info => tracing::debug!(%message, "progress"),
            EventLevel::Warning => tracing::warn!(%message),
        }
        self.sink.event(ProgressEvent {
            level,
            message,
            elapsed,
        });
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub datasets: Vec<DatasetStatus>,
    pub hmmsearch_available: bool,
    pub hmmpress_available: bool,
    pub hmmsearch_version: Option<String>,
    pub hmmpress_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatus {
    pub dataset: Dataset,
    pub data_dir: String,
    pub is_default: bool,
    pub state: DataDirState,
    pub manifest: Option<SetupManifest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitDbResult {
    pub path: String,
    pub genes: usize,
}

pub struct App<D: Downloader, H: HmmerTools> {
    config: ResolvedConfig,
    downloader: D,
    hmmer: H,
}

impl<D: Downloader, H: HmmerTools> App<D, H> {
    pub fn new(config: ResolvedConfig, downloader: D, hmmer: H) -> Self {
        Self {
            config,
            downloader,
            hmmer,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    pub fn hmmer(&self) -> &H {
        &self.hmmer
    }

    pub fn data_dir(&self, dataset: Dataset) -> DataDirectory {
        DataDirectory::new(dataset, self.config.data_dir(dataset).path.clone())
    }

    pub fn setup(
        &self,
        dataset: Dataset,
        options: SetupOptions,
        ctx: &RunContext<'_>,
    ) -> Result<SetupReport, ProfileDbError> {
        let data_dir = self.data_dir(dataset);
        match dataset {
            Dataset::Interacdome => {
                let is_default = self.config.data_dir(dataset).is_default;
                let mut setup =
                    InteracdomeSetup::new(data_dir.clone(), is_default, &self.downloader, &self.hmmer);
                run_setup(&mut setup, &data_dir, options, ctx)
            }
            Dataset::Kofam => {
                let mut setup = KofamSetup::new(data_dir.clone(), &self.downloader, &self.hmmer);
                run_setup(&mut setup, &data_dir, options, ctx)
            }
        }
    }

    pub fn annotate(
        &self,
        dataset: Dataset,
        contigs_db: &Path,
        ctx: &RunContext<'_>,
    ) -> Result<AnnotationReport, ProfileDbError> {
        let data_dir = self.data_dir(dataset);
        let mut store = ContigsDatabase::open(contigs_db)?;
        ctx.phase("Annotate", format!("{dataset} on {}", contigs_db.display()));
        ctx.info("Threads", self.config.num_threads);
        match dataset {
            Dataset::Interacdome => interacdome::annotate::annotate(
                &data_dir,
                self.config.interacdome_kind,
                &mut store,
                &self.hmmer,
                self.config.num_threads,
                self.config.missing_definitions,
                ctx,
            ),
            Dataset::Kofam => kofam::annotate::annotate(
                &data_dir,
                &mut store,
                &self.hmmer,
                self.config.num_threads,
                self.config.missing_definitions,
                ctx,
            ),
        }
    }

    pub fn status(&self) -> Result<StatusResult, ProfileDbError> {
        let mut datasets = Vec::new();
        for dataset in [Dataset::Interacdome, Dataset::Kofam] {
            let data_dir = self.data_dir(dataset);
            datasets.push(DatasetStatus {
                dataset,
                data_dir: data_dir.root().to_string(),
                is_default: self.config.data_dir(dataset).is_default,
                state: data_dir.state(),
                manifest: data_dir.read_manifest()?,
            });
        }
        Ok(StatusResult {
            datasets,
            hmmsearch_available: self.hmmer.ensure_available(HmmerProgram::Hmmsearch).is_ok(),
            hmmpress_available: self.hmmer.ensure_available(HmmerProgram::Hmmpress).is_ok(),
            hmmsearch_version: self.hmmer.version(HmmerProgram::Hmmsearch),
            hmmpress_version: self.hmmer.version(HmmerProgram::Hmmpress),
        })
    }
}

/// Creates an empty contigs database, optionally loading protein sequences.
pub fn init_contigs_db(
    path: &Path,
    proteins: Option<&Path>,
    ctx: &RunContext<'_>,
) -> Result<InitDbResult, ProfileDbError> {
    let mut db = ContigsDatabase::create(path)?;
    let genes = match proteins {
        Some(fasta) => db.import_proteins(fasta)?,
        None => 0,
    };
    ctx.info("Contigs database", path.display());
    ctx.info("Genes imported", genes);
    Ok(InitDbResult {
        path: path.display().to_string(),
        genes,
    })
}
