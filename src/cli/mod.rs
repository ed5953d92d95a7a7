// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All pipeline logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `prepare` — builds train/dev/test splits from .csd files
//   2. `inspect` — summarises a split cache

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, PrepareArgs};

use crate::domain::traits::DataFetcher;
use crate::infra::{fetcher::LocalFiles, logging::TracingObserver};

#[derive(Parser, Debug)]
#[command(
    name = "mmsplits",
    version,
    about = "Align CMU-MOSI / CMU-MOSEI modalities and split them into train/dev/test."
)]
pub struct Cli {
    /// The subcommand to run (prepare or inspect)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

/// Handles the `prepare` subcommand.
fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let fetcher  = fetcher_for(args.mirror.as_deref())?;
    let use_case = PrepareUseCase::new(args.into());

    let mut observer = TracingObserver::default();
    let report = use_case.execute(fetcher.as_ref(), &mut observer)?;
    let splits = &report.prepared.splits;

    if report.from_cache {
        println!("Loaded splits from cache.");
    }
    println!(
        "train {}  dev {}  test {}  vocabulary {}",
        splits.train.len(),
        splits.dev.len(),
        splits.test.len(),
        report.prepared.vocabulary.len()
    );
    if observer.warnings() > 0 {
        println!("{} segments dropped, see the log for details.", observer.warnings());
    }
    Ok(())
}

/// Handles the `inspect` subcommand.
fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let summary = InspectUseCase::new(args.cache).execute(args.batch_size)?;
    print!("{summary}");
    Ok(())
}

#[cfg(feature = "download")]
fn fetcher_for(mirror: Option<&str>) -> Result<Box<dyn DataFetcher>> {
    use crate::infra::fetcher::MirrorFetcher;

    Ok(match mirror {
        Some(url) => Box::new(MirrorFetcher::new(url)?),
        None      => Box::new(LocalFiles),
    })
}

#[cfg(not(feature = "download"))]
fn fetcher_for(mirror: Option<&str>) -> Result<Box<dyn DataFetcher>> {
    if mirror.is_some() {
        anyhow::bail!("--mirror needs mmsplits built with the `download` feature");
    }
    Ok(Box::new(LocalFiles))
}
