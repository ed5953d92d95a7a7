// ============================================================
// Layer 2 — Inspect Use Case
// ============================================================
// Opens a split cache and reports what is inside it:
//   1. Segment count and mean label per split
//   2. Vocabulary size
//   3. Per-modality sequence length and feature width
//   4. Optionally, the tensor shapes of the first train batch
//      as produced by the DataLoader on the CPU backend

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use burn::data::dataloader::DataLoaderBuilder;

use crate::data::{
    batcher::{MultimodalBatch, MultimodalBatcher},
    dataset::SegmentDataset,
};
use crate::domain::dataset::Modality;
use crate::domain::segment::{PreparedSplits, SplitName};
use crate::infra::split_cache::SplitCache;

type InspectBackend = burn::backend::NdArray;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub split:      SplitName,
    pub segments:   usize,
    pub mean_label: f32,
}

/// `[batch, seq]` for text, `[batch, seq, dim]` per numeric modality
#[derive(Debug, Clone, PartialEq)]
pub struct BatchShapes {
    pub text:     Option<[usize; 2]>,
    pub features: Vec<(Modality, [usize; 3])>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectSummary {
    pub splits:     Vec<SplitSummary>,
    pub vocabulary: usize,
    /// Longest sequence and feature width per numeric modality
    pub modalities: Vec<(Modality, usize, usize)>,
    pub batch:      Option<BatchShapes>,
}

impl fmt::Display for InspectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.splits {
            writeln!(f, "{:<5} {:>6} segments, mean label {:+.3}", s.split, s.segments, s.mean_label)?;
        }
        writeln!(f, "vocabulary {} tokens", self.vocabulary)?;
        for (m, seq, dim) in &self.modalities {
            writeln!(f, "{m:<6} max length {seq}, width {dim}")?;
        }
        if let Some(batch) = &self.batch {
            if let Some(t) = batch.text {
                writeln!(f, "batch text   {t:?}")?;
            }
            for (m, dims) in &batch.features {
                writeln!(f, "batch {m:<6} {dims:?}")?;
            }
        }
        Ok(())
    }
}

pub struct InspectUseCase {
    cache: PathBuf,
}

impl InspectUseCase {
    pub fn new(cache: impl Into<PathBuf>) -> Self {
        Self { cache: cache.into() }
    }

    pub fn execute(&self, batch_size: Option<usize>) -> Result<InspectSummary> {
        let Some(prepared) = SplitCache::new(&self.cache)
            .load()
            .with_context(|| format!("Cannot read '{}'", self.cache.display()))?
        else {
            bail!(
                "No usable split cache at '{}'. Run 'prepare --cache' first.",
                self.cache.display()
            );
        };
        summarize(prepared, batch_size)
    }
}

fn summarize(prepared: PreparedSplits, batch_size: Option<usize>) -> Result<InspectSummary> {
    let splits: Vec<SegmentDataset> = [SplitName::Train, SplitName::Dev, SplitName::Test]
        .into_iter()
        .map(|s| SegmentDataset::from_splits(&prepared.splits, s))
        .collect();

    let modalities = prepared
        .splits
        .iter()
        .flat_map(|(_, r)| r.features.iter().map(|(m, a)| (*m, a.nrows(), a.ncols())))
        .fold(Vec::<(Modality, usize, usize)>::new(), |mut acc, (m, rows, cols)| {
            match acc.iter_mut().find(|(seen, _, _)| *seen == m) {
                Some(entry) => {
                    entry.1 = entry.1.max(rows);
                    entry.2 = entry.2.max(cols);
                }
                None => acc.push((m, rows, cols)),
            }
            acc
        });

    let batch = match batch_size {
        Some(n) if n > 0 => first_batch(&prepared, n).map(|b| shapes(&b)),
        _ => None,
    };

    Ok(InspectSummary {
        splits: splits
            .iter()
            .map(|d| SplitSummary {
                split:      d.split(),
                segments:   d.records().len(),
                mean_label: d.mean_label(),
            })
            .collect(),
        vocabulary: prepared.vocabulary.len(),
        modalities,
        batch,
    })
}

fn first_batch(prepared: &PreparedSplits, batch_size: usize) -> Option<MultimodalBatch<InspectBackend>> {
    let device  = Default::default();
    let batcher = MultimodalBatcher::<InspectBackend>::new(device, Arc::new(prepared.vocabulary.clone()));
    let dataset = SegmentDataset::from_splits(&prepared.splits, SplitName::Train);

    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset);

    let batch = loader.iter().next();
    batch
}

fn shapes(batch: &MultimodalBatch<InspectBackend>) -> BatchShapes {
    BatchShapes {
        text:     batch.text.as_ref().map(|t| t.dims()),
        features: batch.features.iter().map(|(m, t)| (*m, t.dims())).collect(),
    }
}
