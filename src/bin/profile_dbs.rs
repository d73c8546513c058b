use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use profile_dbs::app::{App, ProgressSink, RunContext, init_contigs_db};
use profile_dbs::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use profile_dbs::domain::{Dataset, InteracdomeKind};
use profile_dbs::download::HttpDownloader;
use profile_dbs::error::ProfileDbError;
use profile_dbs::hmmer::SystemHmmer;
use profile_dbs::output::{ConsoleOutput, JsonOutput, OutputMode};
use profile_dbs::pipeline::SetupOptions;

#[derive(Parser)]
#[command(name = "profile-dbs")]
#[command(about = "Set up InteracDome and KOfam profile databases and annotate contigs databases")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON and suppress progress output.
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Keep temporary files and intermediate downloads.
    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download and prepare a profile database")]
    Setup(SetupArgs),
    #[command(about = "Annotate a contigs database")]
    Run(RunArgs),
    #[command(about = "Show the state of the data directories")]
    Status,
    #[command(about = "Create an empty contigs database")]
    InitDb(InitDbArgs),
}

#[derive(Args)]
struct SetupArgs {
    #[arg(value_enum)]
    dataset: Dataset,

    #[arg(long)]
    data_dir: Option<String>,

    /// Delete the data directory first.
    #[arg(long)]
    reset: bool,
}

#[derive(Args)]
struct RunArgs {
    #[arg(value_enum)]
    dataset: Dataset,

    #[arg(short = 'c', long)]
    contigs_db: PathBuf,

    #[arg(long)]
    data_dir: Option<String>,

    /// InteracDome binding-frequency table to use.
    #[arg(long, value_enum)]
    kind: Option<InteracdomeKind>,

    /// Fail on hits without a known definition instead of writing a
    /// placeholder.
    #[arg(long)]
    strict_definitions: bool,
}

#[derive(Args)]
struct InitDbArgs {
    path: PathBuf,

    /// Protein FASTA to load as gene amino-acid sequences.
    #[arg(long)]
    proteins: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ProfileDbError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ProfileDbError) -> u8 {
    match error {
        ProfileDbError::AlreadyExists { .. }
        | ProfileDbError::ResetRefused { .. }
        | ProfileDbError::DatasetMissing { .. }
        | ProfileDbError::NotContigsDatabase(_)
        | ProfileDbError::ConfigRead(_)
        | ProfileDbError::ConfigParse(_)
        | ProfileDbError::InvalidConfig(_) => 2,
        ProfileDbError::MissingTool(_)
        | ProfileDbError::Download { .. }
        | ProfileDbError::DownloadStatus { .. }
        | ProfileDbError::IndexingFailed { .. }
        | ProfileDbError::SearchFailed { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &ConsoleOutput,
    };

    let mut overrides = ConfigOverrides {
        num_threads: cli.threads,
        debug: cli.debug,
        ..ConfigOverrides::default()
    };

    match cli.command {
        Commands::Setup(args) => {
            set_data_dir(&mut overrides, args.dataset, args.data_dir);
            let config = ConfigLoader::resolve(cli.config.as_deref(), &overrides)?;
            let ctx = RunContext::new(sink, config.debug);
            let app = build_app(config)?;
            let report = app.setup(args.dataset, SetupOptions { reset: args.reset }, &ctx)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_setup(&report).into_diagnostic()?,
                OutputMode::Interactive => ConsoleOutput::print_setup(&report),
            }
        }
        Commands::Run(args) => {
            set_data_dir(&mut overrides, args.dataset, args.data_dir);
            overrides.interacdome_kind = args.kind;
            overrides.strict_definitions = args.strict_definitions;
            let config = ConfigLoader::resolve(cli.config.as_deref(), &overrides)?;
            let ctx = RunContext::new(sink, config.debug);
            let app = build_app(config)?;
            let report = app.annotate(args.dataset, &args.contigs_db, &ctx)?;
            match output_mode {
                OutputMode::NonInteractive => {
                    JsonOutput::print_annotation(&report).into_diagnostic()?
                }
                OutputMode::Interactive => ConsoleOutput::print_annotation(&report),
            }
        }
        Commands::Status => {
            let config = ConfigLoader::resolve(cli.config.as_deref(), &overrides)?;
            let app = build_app(config)?;
            let status = app.status()?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_status(&status).into_diagnostic()?,
                OutputMode::Interactive => ConsoleOutput::print_status(&status),
            }
        }
        Commands::InitDb(args) => {
            let ctx = RunContext::new(sink, cli.debug);
            let result = init_contigs_db(&args.path, args.proteins.as_deref(), &ctx)?;
            match output_mode {
                OutputMode::NonInteractive => {
                    JsonOutput::print_init_db(&result).into_diagnostic()?
                }
                OutputMode::Interactive => ConsoleOutput::print_init_db(&result),
            }
        }
    }
    Ok(())
}

fn set_data_dir(overrides: &mut ConfigOverrides, dataset: Dataset, data_dir: Option<String>) {
    match dataset {
        Dataset::Interacdome => overrides.interacdome_data_dir = data_dir,
        Dataset::Kofam => overrides.kofam_data_dir = data_dir,
    }
}

fn build_app(config: ResolvedConfig) -> Result<App<HttpDownloader, SystemHmmer>, ProfileDbError> {
    let downloader = HttpDownloader::new(Duration::from_secs(config.download_timeout_secs))?;
    let hmmer = SystemHmmer::new(config.hmmsearch.clone(), config.hmmpress.clone());
    Ok(App::new(config, downloader, hmmer))
}
