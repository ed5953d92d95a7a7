// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Orchestrates the full split pipeline in order:
//
//   Step 1: Try the split cache         (Layer 6 - infra)
//   Step 2: Fetch + load sequences      (Layer 4 - data)
//   Step 3: Align streams to words      (Layer 4 - data)
//   Step 4: Build the vocabulary        (Layer 3 - domain)
//   Step 5: Align words to labels       (Layer 4 - data)
//   Step 6: Clean + split segments      (Layer 4 - data)
//   Step 7: Store the split cache       (Layer 6 - infra)
//
// A cache hit skips steps 2–7. The cache is written once, after
// every earlier step has succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    aligner::Aligner,
    loader::{load_corpus, CsdLoader},
    splitter::{Padding, SegmentSplitter, SplitOptions},
};
use crate::domain::{
    dataset::{DatasetDescriptor, DatasetName, Modality},
    error::{PipelineError, Result as PipelineResult},
    segment::{PreparedSplits, SplitStats},
    traits::{DataFetcher, SplitObserver},
    vocabulary::Vocabulary,
};
use crate::infra::{split_cache::SplitCache, vocab_store::VocabStore};

// ─── Prepare Configuration ────────────────────────────────────────────────────
// Everything one run needs. Serialisable so a run can be
// described in a JSON file as well as on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub base_path:      PathBuf,
    pub dataset:        DatasetName,
    pub modalities:     BTreeSet<Modality>,
    pub remove_pauses:  bool,
    pub remove_neutral: bool,
    /// Zero or negative disables truncation and padding
    pub max_length:     i64,
    pub pad_front:      bool,
    pub pad_back:       bool,
    pub cache:          Option<PathBuf>,
    /// Where to export tokenizer.json, if anywhere
    #[serde(default)]
    pub vocab_dir:      Option<PathBuf>,
}

impl PrepareConfig {
    pub fn new(base_path: impl Into<PathBuf>, dataset: DatasetName) -> Self {
        Self {
            base_path:      base_path.into(),
            dataset,
            modalities:     [Modality::Audio, Modality::Text].into_iter().collect(),
            remove_pauses:  false,
            remove_neutral: false,
            max_length:     -1,
            pad_front:      false,
            pad_back:       false,
            cache:          None,
            vocab_dir:      None,
        }
    }

    pub fn mosi(base_path: impl Into<PathBuf>) -> Self {
        Self::new(base_path, DatasetName::Mosi)
    }

    pub fn mosei(base_path: impl Into<PathBuf>) -> Self {
        Self::new(base_path, DatasetName::Mosei)
    }

    /// Parse modality names, rejecting `labels` and unknown names
    pub fn with_modality_names<S: AsRef<str>>(mut self, names: &[S]) -> PipelineResult<Self> {
        self.modalities = names
            .iter()
            .map(|n| n.as_ref().trim().parse())
            .collect::<PipelineResult<_>>()?;
        Ok(self)
    }

    pub fn descriptor(&self) -> DatasetDescriptor {
        DatasetDescriptor::select(self.dataset)
    }

    pub fn split_options(&self) -> PipelineResult<SplitOptions> {
        let descriptor = self.descriptor();
        if let Some(m) = self.modalities.iter().find(|m| !descriptor.supports(**m)) {
            return Err(PipelineError::UnsupportedModality(m.to_string()));
        }
        Ok(SplitOptions {
            modalities:     self.modalities.clone(),
            remove_pauses:  self.remove_pauses,
            remove_neutral: self.remove_neutral,
            max_length:     usize::try_from(self.max_length).ok().filter(|n| *n > 0),
            padding:        Padding::from_flags(self.pad_front, self.pad_back),
        })
    }
}

/// What one run produced
#[derive(Debug, Clone)]
pub struct PrepareReport {
    pub prepared:   PreparedSplits,
    /// `None` on a cache hit
    pub stats:      Option<SplitStats>,
    pub from_cache: bool,
}

/// Load, align, clean and split one dataset.
pub fn load_splits(
    config:   &PrepareConfig,
    fetcher:  &dyn DataFetcher,
    observer: &mut dyn SplitObserver,
) -> PipelineResult<PreparedSplits> {
    prepare(config, fetcher, observer).map(|report| report.prepared)
}

/// `load_splits`, keeping the run statistics
pub fn prepare(
    config:   &PrepareConfig,
    fetcher:  &dyn DataFetcher,
    observer: &mut dyn SplitObserver,
) -> PipelineResult<PrepareReport> {
    let options    = config.split_options()?;
    let descriptor = config.descriptor();

    // ── Step 1: Split cache ───────────────────────────────────────────────────
    let cache = config.cache.as_ref().map(SplitCache::new);
    if let Some(cache) = &cache {
        if let Some(prepared) = cache.load()? {
            return Ok(PrepareReport { prepared, stats: None, from_cache: true });
        }
    }

    // ── Step 2: Fetch and load ────────────────────────────────────────────────
    let requested: Vec<Modality> = options.modalities.iter().copied().collect();
    let source = CsdLoader::new(&config.base_path);
    let corpus = load_corpus(&source, fetcher, &config.base_path, &descriptor, &requested)?;

    // ── Step 3: Word-level alignment ──────────────────────────────────────────
    let aligner = Aligner::new();
    let others: BTreeMap<Modality, _> = corpus
        .sequences
        .iter()
        .filter(|(m, _)| !m.is_text() && **m != Modality::Labels)
        .map(|(m, s)| (*m, s))
        .collect();
    let aligned = aligner.align_to_words(corpus.sequence(Modality::Text)?, &others)?;

    // ── Step 4: Vocabulary ────────────────────────────────────────────────────
    let vocabulary = Vocabulary::build(aligned.words());
    tracing::info!("Vocabulary: {} words + specials", vocabulary.word_count());

    // ── Step 5: Label-level alignment ─────────────────────────────────────────
    let segments = aligner.align_to_labels(&aligned, corpus.sequence(Modality::Labels)?)?;

    // ── Step 6: Clean and split ───────────────────────────────────────────────
    let splitter = SegmentSplitter::new(&corpus.folds, &options);
    let outcome  = splitter.split(segments, observer);

    let prepared = PreparedSplits { splits: outcome.splits, vocabulary };

    // ── Step 7: Store the cache ───────────────────────────────────────────────
    if let Some(cache) = &cache {
        cache.store(&prepared)?;
    }

    Ok(PrepareReport {
        prepared,
        stats:      Some(outcome.stats),
        from_cache: false,
    })
}

// ─── PrepareUseCase ───────────────────────────────────────────────────────────
// Owns the config and runs the pipeline, then exports the
// vocabulary when asked to.
pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(
        &self,
        fetcher:  &dyn DataFetcher,
        observer: &mut dyn SplitObserver,
    ) -> Result<PrepareReport> {
        let cfg = &self.config;
        tracing::info!(
            "Preparing {} splits from '{}'",
            cfg.dataset,
            cfg.base_path.display()
        );

        let report = prepare(cfg, fetcher, observer)
            .with_context(|| format!("Cannot prepare {} splits", cfg.dataset))?;

        if let Some(dir) = &cfg.vocab_dir {
            VocabStore::new(dir)
                .save(&report.prepared.vocabulary)
                .context("Cannot export vocabulary")?;
        }

        Ok(report)
    }
}
