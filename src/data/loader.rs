// ============================================================
// Layer 4 — Modality Loader
// ============================================================
// Reads computational sequences from `{base_path}/{store}.csd`
// and the canonical folds from `{base_path}/{folds_file}`.
//
// A .csd file here is a JSON document:
//
//   {
//     "name": "CMU_MOSI_COVAREP",
//     "data": {
//       "03bSnISJMiM": {
//         "features":  { "kind": "numeric", "rows": [[0.1, ...], ...] },
//         "intervals": [[0.00, 0.01], ...]
//       }
//     }
//   }
//
// Before anything is read, the DataFetcher makes sure every
// required file exists. Fetch failures are surfaced as
// DataUnavailable, never retried here.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::domain::dataset::{DatasetDescriptor, Modality};
use crate::domain::error::{PipelineError, Result};
use crate::domain::segment::Folds;
use crate::domain::sequence::ComputationalSequence;
use crate::domain::traits::{DataFetcher, FeatureSource};

/// Loads `.csd` feature stores from a directory.
/// Implements the FeatureSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct CsdLoader {
    base_path: PathBuf,
}

impl CsdLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    fn read_json<T>(&self, file_name: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let path = self.base_path.join(file_name);
        let file = File::open(&path)
            .map_err(|e| PipelineError::unavailable(&path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::unavailable(&path, format!("cannot parse: {e}")))
    }
}

impl FeatureSource for CsdLoader {
    fn load_sequence(&self, store_id: &str) -> Result<ComputationalSequence> {
        let file_name = format!("{store_id}.csd");
        tracing::info!(
            "Using {} for {}",
            self.base_path.join(&file_name).display(),
            store_id
        );
        let sequence: ComputationalSequence = self.read_json(&file_name)?;
        tracing::debug!("Loaded {} entries from {}", sequence.len(), file_name);
        Ok(sequence)
    }

    fn load_folds(&self, folds_file: &str) -> Result<Folds> {
        let folds: Folds = self.read_json(folds_file)?;
        tracing::debug!(
            "Folds: {} train, {} dev, {} test videos",
            folds.train.len(),
            folds.dev.len(),
            folds.test.len()
        );
        Ok(folds)
    }
}

/// Every sequence one pipeline run needs, plus the folds
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    /// Text, the requested modalities, and labels
    pub sequences: BTreeMap<Modality, ComputationalSequence>,
    pub folds:     Folds,
}

impl LoadedCorpus {
    pub fn sequence(&self, modality: Modality) -> Result<&ComputationalSequence> {
        self.sequences
            .get(&modality)
            .ok_or_else(|| PipelineError::InvalidSequence {
                name:   modality.to_string(),
                reason: "modality was not loaded".to_string(),
            })
    }
}

/// The modalities a run loads: text is always the alignment
/// reference and labels are always needed for splitting.
pub fn required_modalities<'a>(
    requested: impl IntoIterator<Item = &'a Modality>,
) -> Vec<Modality> {
    let mut all: Vec<Modality> = requested.into_iter().copied().collect();
    all.push(Modality::Text);
    all.push(Modality::Labels);
    all.sort();
    all.dedup();
    all
}

/// The files `required_modalities` resolves to, folds file last
pub fn required_files(descriptor: &DatasetDescriptor, modalities: &[Modality]) -> Result<Vec<String>> {
    let mut files = Vec::with_capacity(modalities.len() + 1);
    for m in modalities {
        let file = descriptor
            .store_file(*m)
            .ok_or_else(|| PipelineError::UnsupportedModality(m.to_string()))?;
        files.push(file);
    }
    files.push(descriptor.folds_file.to_string());
    Ok(files)
}

/// Fetch (if needed) and load every sequence for `requested`.
pub fn load_corpus(
    source:     &dyn FeatureSource,
    fetcher:    &dyn DataFetcher,
    base_path:  &Path,
    descriptor: &DatasetDescriptor,
    requested:  &[Modality],
) -> Result<LoadedCorpus> {
    let modalities = required_modalities(requested);

    // ── Step 1: Make sure every file is on disk ──────────────────────────────
    let files = required_files(descriptor, &modalities)?;
    fetcher.ensure_available(base_path, &files)?;

    // ── Step 2: Read each modality's sequence ────────────────────────────────
    let mut sequences = BTreeMap::new();
    for m in modalities {
        let store_id = descriptor
            .store_id(m)
            .ok_or_else(|| PipelineError::UnsupportedModality(m.to_string()))?;
        tracing::info!("Loading {} modality from {}", m, store_id);
        sequences.insert(m, source.load_sequence(store_id)?);
    }

    // ── Step 3: Canonical folds ──────────────────────────────────────────────
    let folds = source.load_folds(descriptor.folds_file)?;

    Ok(LoadedCorpus { sequences, folds })
}
