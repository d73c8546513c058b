use std::io::{self, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::annotate::{AnnotationOutcome, AnnotationReport};
use crate::app::{EventLevel, InitDbResult, ProgressEvent, ProgressSink, StatusResult};
use crate::pipeline::SetupReport;
use crate::store::DataDirState;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_setup(result: &SetupReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_annotation(result: &AnnotationReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_status(result: &StatusResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_init_db(result: &InitDbResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress lines on stderr and a styled summary on stdout.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let line = match (event.level, event.elapsed) {
            (EventLevel::Warning, _) => format!("{} {}", "WARNING".yellow().bold(), event.message),
            (EventLevel::Info, Some(elapsed)) => format!(
                "{} {}",
                event.message.green(),
                format!("({:.1}s)", elapsed.as_secs_f64()).dark_grey()
            ),
            (EventLevel::Info, None) => match event.message.strip_prefix("phase=") {
                Some(rest) => {
                    let (phase, detail) = rest.split_once("; ").unwrap_or((rest, ""));
                    format!("{} {detail}", format!("[{phase}]").cyan().bold())
                }
                None => format!("  {}", event.message),
            },
        };
        eprintln!("{line}");
    }
}

impl ConsoleOutput {
    pub fn print_setup(result: &SetupReport) {
        println!(
            "{} {} set up in {}",
            "done".green().bold(),
            result.dataset,
            result.data_dir
        );
        for (name, count) in &result.counts {
            println!("  {name}: {count}");
        }
    }

    pub fn print_annotation(result: &AnnotationReport) {
        match &result.outcome {
            AnnotationOutcome::NoHits => println!(
                "{} {}: no hits in {} sequences",
                "done".yellow().bold(),
                result.source,
                result.sequences
            ),
            AnnotationOutcome::Annotated { hits, rows, genes } => println!(
                "{} {}: {rows} functions on {genes} genes ({hits} raw hits, {} sequences)",
                "done".green().bold(),
                result.source,
                result.sequences
            ),
        }
        if let Some(path) = &result.retained_temp_dir {
            println!("  kept temporary files in {path}");
        }
    }

    pub fn print_status(result: &StatusResult) {
        for status in &result.datasets {
            let state = match status.state {
                DataDirState::Complete => "complete".green(),
                DataDirState::Partial => "partial".yellow(),
                DataDirState::Absent => "absent".red(),
            };
            let default = if status.is_default { " (default)" } else { "" };
            println!("{}: {state} in {}{default}", status.dataset, status.data_dir);
            if let Some(manifest) = &status.manifest {
                println!("  {} set up {}", manifest.source_version, manifest.created_at);
            }
        }
        let tool = |available: bool, version: &Option<String>| match (available, version) {
            (true, Some(version)) => version.clone().green(),
            (true, None) => "found".to_string().green(),
            (false, _) => "missing".to_string().red(),
        };
        println!(
            "hmmsearch: {}",
            tool(result.hmmsearch_available, &result.hmmsearch_version)
        );
        println!(
            "hmmpress: {}",
            tool(result.hmmpress_available, &result.hmmpress_version)
        );
    }

    pub fn print_init_db(result: &InitDbResult) {
        println!(
            "{} created {} with {} genes",
            "done".green().bold(),
            result.path,
            result.genes
        );
    }
}
