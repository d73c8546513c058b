//! The five-stage shape shared by every dataset setup.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::app::RunContext;
use crate::domain::Dataset;
use crate::error::ProfileDbError;
use crate::store::{DataDirectory, SetupManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CheckExisting,
    Acquire,
    Normalize,
    Filter,
    Finalize,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::CheckExisting => "Check",
            Stage::Acquire => "Acquire",
            Stage::Normalize => "Normalize",
            Stage::Filter => "Filter",
            Stage::Finalize => "Finalize",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOptions {
    pub reset: bool,
}

/// One dataset's implementation of the setup stages. Stages run in
/// declaration order and each may rely on the effects of the previous ones.
pub trait DatasetSetup {
    fn dataset(&self) -> Dataset;

    /// Fails if a previous setup left marker files, unless resetting (or
    /// debugging), then prepares an empty target directory.
    fn check_existing(
        &mut self,
        options: SetupOptions,
        ctx: &RunContext<'_>,
    ) -> Result<(), ProfileDbError>;

    fn acquire(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError>;

    fn normalize(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError>;

    fn filter(&mut self, ctx: &RunContext<'_>) -> Result<(), ProfileDbError>;

    /// Builds and indexes the combined library and returns the manifest that
    /// marks the directory complete.
    fn finalize(&mut self, ctx: &RunContext<'_>) -> Result<SetupManifest, ProfileDbError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub dataset: Dataset,
    pub data_dir: String,
    pub elapsed_ms: u128,
    pub counts: BTreeMap<String, usize>,
}

pub fn run_setup<S: DatasetSetup + ?Sized>(
    setup: &mut S,
    data_dir: &DataDirectory,
    options: SetupOptions,
    ctx: &RunContext<'_>,
) -> Result<SetupReport, ProfileDbError> {
    let dataset = setup.dataset();
    let start = Instant::now();

    ctx.phase(Stage::CheckExisting.label(), format!("{dataset} data in {}", data_dir.root()));
    setup.check_existing(options, ctx)?;
    ctx.phase(Stage::Acquire.label(), "downloading");
    setup.acquire(ctx)?;
    ctx.phase(Stage::Normalize.label(), "unpacking and parsing");
    setup.normalize(ctx)?;
    ctx.phase(Stage::Filter.label(), "separating orphan entries");
    setup.filter(ctx)?;
    ctx.phase(Stage::Finalize.label(), "building the searchable library");
    let manifest = setup.finalize(ctx)?;
    data_dir.write_manifest(&manifest)?;

    let elapsed = start.elapsed();
    ctx.timed(format!("{dataset} setup finished"), elapsed);
    Ok(SetupReport {
        dataset,
        data_dir: data_dir.root().to_string(),
        elapsed_ms: elapsed.as_millis(),
        counts: manifest.counts,
    })
}
