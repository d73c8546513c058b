use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ProfileDbError;
use crate::fs_util::{find_in_path, fs_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmmerProgram {
    Hmmsearch,
    Hmmpress,
}

impl HmmerProgram {
    pub fn name(&self) -> &'static str {
        match self {
            HmmerProgram::Hmmsearch => "hmmsearch",
            HmmerProgram::Hmmpress => "hmmpress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `--tblout`: one line per (sequence, profile) pair.
    PerSequence,
    /// `--domtblout`: one line per domain.
    PerDomain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseCutoff {
    None,
    /// `--cut_ga`: the profile's own gathering thresholds.
    Gathering,
}

#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub library: &'a Path,
    pub sequences: &'a Path,
    pub table_output: &'a Path,
    pub log: &'a Path,
    pub format: TableFormat,
    pub cutoff: NoiseCutoff,
    pub num_threads: usize,
}

impl SearchRequest<'_> {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--cpu".to_string(),
            self.num_threads.to_string(),
            "--noali".to_string(),
        ];
        if self.cutoff == NoiseCutoff::Gathering {
            args.push("--cut_ga".to_string());
        }
        args.push(
            match self.format {
                TableFormat::PerSequence => "--tblout",
                TableFormat::PerDomain => "--domtblout",
            }
            .to_string(),
        );
        args.push(self.table_output.to_string_lossy().to_string());
        args.push(self.library.to_string_lossy().to_string());
        args.push(self.sequences.to_string_lossy().to_string());
        args
    }
}

pub trait HmmerTools {
    fn ensure_available(&self, program: HmmerProgram) -> Result<(), ProfileDbError>;
    fn press(&self, library: &Path, log: &Path) -> Result<(), ProfileDbError>;
    fn search(&self, request: &SearchRequest<'_>) -> Result<(), ProfileDbError>;

    /// The HMMER banner line of `program`, when it can be run.
    fn version(&self, _program: HmmerProgram) -> Option<String> {
        None
    }
}

#[derive(Clone)]
pub struct SystemHmmer {
    hmmsearch: Option<PathBuf>,
    hmmpress: Option<PathBuf>,
}

impl SystemHmmer {
    /// Explicit paths win over a `PATH` lookup.
    pub fn new(hmmsearch: Option<PathBuf>, hmmpress: Option<PathBuf>) -> Self {
        Self {
            hmmsearch: hmmsearch.or_else(|| find_in_path("hmmsearch")),
            hmmpress: hmmpress.or_else(|| find_in_path("hmmpress")),
        }
    }

    fn require(&self, program: HmmerProgram) -> Result<&PathBuf, ProfileDbError> {
        let path = match program {
            HmmerProgram::Hmmsearch => self.hmmsearch.as_ref(),
            HmmerProgram::Hmmpress => self.hmmpress.as_ref(),
        };
        path.ok_or_else(|| ProfileDbError::MissingTool(program.name().to_string()))
    }

    /// Runs `program` with stdout and stderr going to `log`; returns whether
    /// it exited successfully.
    fn run_logged(
        &self,
        program: HmmerProgram,
        args: &[String],
        log: &Path,
    ) -> Result<bool, ProfileDbError> {
        let executable = self.require(program)?;
        let stdout = File::create(log).map_err(|err| fs_error(log, err))?;
        let stderr = stdout.try_clone().map_err(|err| fs_error(log, err))?;
        tracing::debug!(program = program.name(), ?args, "running");
        let status = Command::new(executable)
            .args(args)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .map_err(|err| {
                ProfileDbError::MissingTool(format!("{} ({err})", executable.display()))
            })?;
        Ok(status.success())
    }
}

impl HmmerTools for SystemHmmer {
    fn ensure_available(&self, program: HmmerProgram) -> Result<(), ProfileDbError> {
        self.require(program).map(|_| ())
    }

    fn press(&self, library: &Path, log: &Path) -> Result<(), ProfileDbError> {
        let args = vec!["-f".to_string(), library.to_string_lossy().to_string()];
        if self.run_logged(HmmerProgram::Hmmpress, &args, log)? {
            Ok(())
        } else {
            Err(ProfileDbError::IndexingFailed {
                library: library.to_path_buf(),
                log: log.to_path_buf(),
            })
        }
    }

    fn version(&self, program: HmmerProgram) -> Option<String> {
        self.require(program).ok().and_then(|path| tool_version(path))
    }

    fn search(&self, request: &SearchRequest<'_>) -> Result<(), ProfileDbError> {
        if self.run_logged(HmmerProgram::Hmmsearch, &request.args(), request.log)? {
            Ok(())
        } else {
            Err(ProfileDbError::SearchFailed {
                log: request.log.to_path_buf(),
            })
        }
    }
}

fn tool_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("-h").output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|line| line.contains("HMMER"))
        .map(|line| line.trim_start_matches('#').trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_args_follow_policy() {
        let request = SearchRequest {
            library: Path::new("Pfam-A.hmm"),
            sequences: Path::new("aa.fa"),
            table_output: Path::new("hits.txt"),
            log: Path::new("log.txt"),
            format: TableFormat::PerDomain,
            cutoff: NoiseCutoff::Gathering,
            num_threads: 4,
        };
        assert_eq!(
            request.args(),
            vec![
                "--cpu",
                "4",
                "--noali",
                "--cut_ga",
                "--domtblout",
                "hits.txt",
                "Pfam-A.hmm",
                "aa.fa"
            ]
        );
    }

    #[test]
    fn missing_tool_is_reported() {
        let hmmer = SystemHmmer {
            hmmsearch: None,
            hmmpress: None,
        };
        let err = hmmer.ensure_available(HmmerProgram::Hmmpress).unwrap_err();
        assert!(matches!(err, ProfileDbError::MissingTool(name) if name == "hmmpress"));
    }
}
