use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ProfileDbError {
    #[error("{dataset} data already exists in {path}")]
    #[diagnostic(help("re-run setup with --reset if you want to download it again"))]
    AlreadyExists { dataset: String, path: PathBuf },

    #[error("refusing to reset non-default {dataset} data directory {path}")]
    #[diagnostic(help("remove the directory yourself and run setup again without --reset"))]
    ResetRefused { dataset: String, path: PathBuf },

    #[error("{dataset} data is missing: {path} does not exist (run `profile-dbs setup {command}` first)")]
    DatasetMissing {
        dataset: String,
        command: String,
        path: PathBuf,
    },

    #[error("required tool not found: {0}")]
    #[diagnostic(help("install HMMER and make sure the program is on your PATH"))]
    MissingTool(String),

    #[error("{0} is not a contigs database")]
    NotContigsDatabase(PathBuf),

    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("download of {url} returned status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("unexpected line {line_number} in {path}: {line:?}")]
    BadLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("module record {path} is incomplete: expected last line '///', found {last_line:?}")]
    #[diagnostic(help("the download was probably interrupted; re-run setup with --reset"))]
    BadModuleRecord { path: PathBuf, last_line: String },

    #[error("profile for {0} is missing from the downloaded profile archive")]
    MissingProfile(String),

    #[error("identifier {0} is not in the catalog")]
    UnknownIdentifier(String),

    #[error("hmmpress failed on {library}; see the log at {log}")]
    IndexingFailed { library: PathBuf, log: PathBuf },

    #[error("hmmsearch failed; see the log at {log}")]
    SearchFailed { log: PathBuf },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("contigs database error: {0}")]
    Database(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<rusqlite::Error> for ProfileDbError {
    fn from(err: rusqlite::Error) -> Self {
        ProfileDbError::Database(err.to_string())
    }
}
