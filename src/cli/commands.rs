// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `prepare` and `inspect`
// and all their configurable flags.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::prepare_use_case::PrepareConfig;
use crate::domain::dataset::{DatasetName, Modality};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align, clean and split a dataset into train/dev/test
    Prepare(PrepareArgs),

    /// Summarise a split cache written by `prepare`
    Inspect(InspectArgs),
}

/// All arguments for the `prepare` command.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory holding the .csd feature stores and the folds file
    #[arg(long)]
    pub base_path: PathBuf,

    /// Corpus to prepare: mosi or mosei
    #[arg(long, default_value = "mosi")]
    pub dataset: DatasetName,

    /// Comma-separated modalities: text, audio, visual
    #[arg(long, value_delimiter = ',', default_value = "text,audio")]
    pub modalities: Vec<Modality>,

    /// Drop speech pauses ("sp") from every modality
    #[arg(long)]
    pub remove_pauses: bool,

    /// Drop segments whose label is exactly zero
    #[arg(long)]
    pub remove_neutral: bool,

    /// Keep at most this many steps per segment; 0 or less disables it
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub max_length: i64,

    /// Pad short segments at the front (takes precedence over --pad-back)
    #[arg(long)]
    pub pad_front: bool,

    /// Pad short segments at the back
    #[arg(long)]
    pub pad_back: bool,

    /// Read splits from / write splits to this file
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Export the vocabulary as tokenizer.json into this directory
    #[arg(long)]
    pub vocab_dir: Option<PathBuf>,

    /// Download missing files from this mirror (needs the `download` feature)
    #[arg(long)]
    pub mirror: Option<String>,
}

/// Convert CLI PrepareArgs into the application-layer PrepareConfig.
/// The application layer never sees clap types.
impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            modalities:     a.modalities.into_iter().collect(),
            remove_pauses:  a.remove_pauses,
            remove_neutral: a.remove_neutral,
            max_length:     a.max_length,
            pad_front:      a.pad_front,
            pad_back:       a.pad_back,
            cache:          a.cache,
            vocab_dir:      a.vocab_dir,
            ..PrepareConfig::new(a.base_path, a.dataset)
        }
    }
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Split cache written by `prepare --cache`
    #[arg(long)]
    pub cache: PathBuf,

    /// Also build the first train batch of this size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn prepare_args(argv: &[&str]) -> PrepareArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Prepare(a) => a,
            other => panic!("expected prepare, got {other:?}"),
        }
    }

    #[test]
    fn test_prepare_defaults() {
        let cfg: PrepareConfig = prepare_args(&["mmsplits", "prepare", "--base-path", "/d"]).into();
        assert_eq!(cfg, PrepareConfig::mosi("/d"));
    }

    #[test]
    fn test_prepare_flags() {
        let cfg: PrepareConfig = prepare_args(&[
            "mmsplits", "prepare", "--base-path", "/d", "--dataset", "mosei",
            "--modalities", "text,visual", "--remove-pauses", "--max-length", "50",
            "--pad-back", "--cache", "/tmp/c.bin",
        ])
        .into();
        assert_eq!(cfg.dataset, DatasetName::Mosei);
        assert_eq!(cfg.modalities, [Modality::Text, Modality::Visual].into_iter().collect());
        assert!(cfg.remove_pauses);
        assert_eq!(cfg.max_length, 50);
        assert!(cfg.pad_back && !cfg.pad_front);
        assert_eq!(cfg.cache, Some(PathBuf::from("/tmp/c.bin")));
    }

    #[test]
    fn test_rejects_unknown_names() {
        assert!(Cli::try_parse_from(["mmsplits", "prepare", "--base-path", "/d", "--dataset", "iemocap"]).is_err());
        assert!(Cli::try_parse_from(["mmsplits", "prepare", "--base-path", "/d", "--modalities", "labels"]).is_err());
    }

    #[test]
    fn test_negative_max_length() {
        let a = prepare_args(&["mmsplits", "prepare", "--base-path", "/d", "--max-length", "-1"]);
        assert_eq!(a.max_length, -1);
    }
}
