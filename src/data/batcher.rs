// ============================================================
// Layer 4 — Multimodal Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SegmentRecords into
// tensors, one per modality.
//
//   Input:  N records, text of up to S words, numeric
//           modalities of up to S rows × D columns
//   Output: MultimodalBatch with
//             text     [N, S]      Int, vocabulary ids
//             numeric  [N, S, D]   Float, one per modality
//             labels   [N]         Float
//             lengths  [N]         Int, pre-truncation lengths
//
// Records prepared with a pad flag already share S. Records
// prepared without one are back-padded here with [PAD] ids and
// zero rows up to the longest record in the batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::dataset::Modality;
use crate::domain::segment::SegmentRecord;
use crate::domain::vocabulary::{SpecialToken, Vocabulary};

// ─── MultimodalBatch ──────────────────────────────────────────────────────────
/// A batch of segments. Every tensor has batch_size as its
/// first dimension.
#[derive(Debug, Clone)]
pub struct MultimodalBatch<B: Backend> {
    /// Vocabulary ids — shape: [batch_size, seq_len].
    /// `None` when text was not requested.
    pub text: Option<Tensor<B, 2, Int>>,

    /// Numeric modalities — shape: [batch_size, seq_len, dim]
    pub features: BTreeMap<Modality, Tensor<B, 3>>,

    /// Sentiment labels — shape: [batch_size]
    pub labels: Tensor<B, 1>,

    /// Sequence length before truncation/padding — shape: [batch_size]
    pub lengths: Tensor<B, 1, Int>,
}

// ─── MultimodalBatcher ────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MultimodalBatcher<B: Backend> {
    pub device:     B::Device,
    pub vocabulary: Arc<Vocabulary>,
}

impl<B: Backend> MultimodalBatcher<B> {
    pub fn new(device: B::Device, vocabulary: Arc<Vocabulary>) -> Self {
        Self { device, vocabulary }
    }

    fn text_tensor(&self, items: &[SegmentRecord]) -> Option<Tensor<B, 2, Int>> {
        let texts: Vec<&Vec<String>> = items.iter().filter_map(|r| r.text.as_ref()).collect();
        if texts.len() != items.len() {
            return None;
        }

        let seq_len = texts.iter().map(|t| t.len()).max().unwrap_or(0);
        let pad_id  = self.vocabulary.special(SpecialToken::Pad) as i32;

        let flat: Vec<i32> = texts
            .iter()
            .flat_map(|words| {
                words
                    .iter()
                    .map(|w| self.vocabulary.encode(w) as i32)
                    .chain(std::iter::repeat(pad_id))
                    .take(seq_len)
            })
            .collect();

        Some(
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
                .reshape([items.len(), seq_len]),
        )
    }

    fn feature_tensor(&self, items: &[SegmentRecord], modality: Modality) -> Tensor<B, 3> {
        let seq_len = items
            .iter()
            .filter_map(|r| r.seq_len(modality))
            .max()
            .unwrap_or(0);
        let dim = items
            .iter()
            .filter_map(|r| r.feature(modality))
            .map(|a| a.ncols())
            .find(|&d| d > 0)
            .unwrap_or(0);

        let mut flat = Vec::with_capacity(items.len() * seq_len * dim);
        for record in items {
            let rows = record.feature(modality).map(|a| a.nrows()).unwrap_or(0);
            if let Some(array) = record.feature(modality) {
                for row in array.rows() {
                    // Rows narrower than `dim` only come from empty arrays
                    flat.extend(row.iter().copied().chain(std::iter::repeat(0.0)).take(dim));
                }
            }
            flat.extend(std::iter::repeat(0.0).take((seq_len - rows) * dim));
        }

        Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([items.len(), seq_len, dim])
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<SegmentRecord, MultimodalBatch<B>> for MultimodalBatcher<B> {
    fn batch(&self, items: Vec<SegmentRecord>) -> MultimodalBatch<B> {
        let text = self.text_tensor(&items);

        let modalities: Vec<Modality> = items
            .iter()
            .flat_map(|r| r.features.keys().copied())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let features = modalities
            .into_iter()
            .map(|m| (m, self.feature_tensor(&items, m)))
            .collect();

        let labels: Vec<f32>  = items.iter().map(|r| r.label).collect();
        let lengths: Vec<i32> = items.iter().map(|r| r.length as i32).collect();

        MultimodalBatch {
            text,
            features,
            labels:  Tensor::<B, 1>::from_floats(labels.as_slice(), &self.device),
            lengths: Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), &self.device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use ndarray::Array2;

    type TestBackend = NdArray;

    fn vocabulary() -> Arc<Vocabulary> {
        Arc::new(Vocabulary::build(["good", "film"]))
    }

    fn record(words: &[&str], audio_rows: usize, label: f32) -> SegmentRecord {
        let mut features = BTreeMap::new();
        let values: Vec<f32> = (0..audio_rows * 2).map(|v| v as f32 + 1.0).collect();
        features.insert(
            Modality::Audio,
            Array2::from_shape_vec((audio_rows, 2), values).unwrap(),
        );
        SegmentRecord {
            video_id:   "v".to_string(),
            segment_id: "v[0]".to_string(),
            label,
            length:     words.len(),
            text:       Some(words.iter().map(|w| w.to_string()).collect()),
            features,
        }
    }

    fn batcher() -> MultimodalBatcher<TestBackend> {
        MultimodalBatcher::new(Default::default(), vocabulary())
    }

    #[test]
    fn test_batch_shapes() {
        let batch = batcher().batch(vec![
            record(&["good", "film"], 2, 1.5),
            record(&["film", "good"], 2, -0.5),
        ]);
        assert_eq!(batch.text.unwrap().dims(), [2, 2]);
        assert_eq!(batch.features[&Modality::Audio].dims(), [2, 2, 2]);
        assert_eq!(batch.labels.dims(), [2]);
        assert_eq!(batch.lengths.dims(), [2]);
    }

    #[test]
    fn test_unknown_words_and_back_padding() {
        let vocab = vocabulary();
        let batch = batcher().batch(vec![
            record(&["good", "boring", "film"], 3, 1.0),
            record(&["film"], 1, 0.0),
        ]);

        let ids: Vec<i64> = batch.text.unwrap().into_data().convert::<i64>().to_vec().unwrap();
        let unk = vocab.special(SpecialToken::Unk) as i64;
        let pad = vocab.special(SpecialToken::Pad) as i64;
        let good = vocab.index_of("good").unwrap() as i64;
        let film = vocab.index_of("film").unwrap() as i64;
        assert_eq!(ids, vec![good, unk, film, film, pad, pad]);

        let audio: Vec<f32> = batch.features[&Modality::Audio].clone().into_data().to_vec().unwrap();
        assert_eq!(audio.len(), 2 * 3 * 2);
        // Second record: one real row, then zeros
        assert_eq!(&audio[6..8], &[1.0, 2.0]);
        assert!(audio[8..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_lengths_and_labels_carried() {
        let batch = batcher().batch(vec![record(&["good"], 1, 2.5)]);
        let labels: Vec<f32> = batch.labels.into_data().to_vec().unwrap();
        let lengths: Vec<i64> = batch.lengths.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![2.5]);
        assert_eq!(lengths, vec![1]);
    }

    #[test]
    fn test_no_text_tensor_without_text() {
        let mut r = record(&["good"], 1, 1.0);
        r.text = None;
        let batch = batcher().batch(vec![r]);
        assert!(batch.text.is_none());
        assert_eq!(batch.features.len(), 1);
    }
}
