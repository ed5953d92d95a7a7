use burn::data::dataset::Dataset;

use crate::domain::dataset::Modality;
use crate::domain::segment::{SegmentRecord, SplitName, Splits};

/// One split's records behind Burn's Dataset trait.
pub struct SegmentDataset {
    split:   SplitName,
    records: Vec<SegmentRecord>,
}

impl SegmentDataset {
    pub fn new(split: SplitName, records: Vec<SegmentRecord>) -> Self {
        Self { split, records }
    }

    /// Clone one split out of a prepared set
    pub fn from_splits(splits: &Splits, split: SplitName) -> Self {
        Self::new(split, splits.get(split).to_vec())
    }

    pub fn split(&self) -> SplitName { self.split }

    pub fn records(&self) -> &[SegmentRecord] { &self.records }

    /// Mean of the labels, 0 for an empty split
    pub fn mean_label(&self) -> f32 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.records.iter().map(|r| r.label).sum::<f32>() / self.records.len() as f32
    }

    /// Longest sequence of `modality` across the split
    pub fn max_seq_len(&self, modality: Modality) -> usize {
        self.records
            .iter()
            .filter_map(|r| r.seq_len(modality))
            .max()
            .unwrap_or(0)
    }
}

impl Dataset<SegmentRecord> for SegmentDataset {
    fn get(&self, index: usize) -> Option<SegmentRecord> {
        self.records.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(id: &str, label: f32, words: usize) -> SegmentRecord {
        SegmentRecord {
            video_id:   "v".to_string(),
            segment_id: id.to_string(),
            label,
            length:     words,
            text:       Some(vec!["w".to_string(); words]),
            features:   BTreeMap::new(),
        }
    }

    #[test]
    fn test_dataset_get_and_len() {
        let ds = SegmentDataset::new(SplitName::Train, vec![record("v[0]", 1.0, 2), record("v[1]", -1.0, 4)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().segment_id, "v[1]");
        assert!(ds.get(2).is_none());
        assert_eq!(ds.mean_label(), 0.0);
        assert_eq!(ds.max_seq_len(Modality::Text), 4);
        assert_eq!(ds.max_seq_len(Modality::Audio), 0);
    }

    #[test]
    fn test_from_splits_picks_the_right_split() {
        let mut splits = Splits::default();
        splits.push(SplitName::Dev, record("v[0]", 2.0, 1));
        let ds = SegmentDataset::from_splits(&splits, SplitName::Dev);
        assert_eq!(ds.split(), SplitName::Dev);
        assert_eq!(ds.records().len(), 1);
        assert!(SegmentDataset::from_splits(&splits, SplitName::Test).is_empty());
    }
}
