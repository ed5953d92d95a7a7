// ============================================================
// Layer 3 — Segment Records and Splits
// ============================================================
// A SegmentRecord is the final unit of learning data: one
// labelled utterance with a sequence per requested modality.
//
//   text    → Vec<String>     (words, [PAUSE] and [PAD] tokens)
//   audio   → Array2<f32>     (rows × feature dim)
//   visual  → Array2<f32>
//
// Records are grouped into train / dev / test by the canonical
// video-id folds of the corpus.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::Modality;
use crate::domain::vocabulary::Vocabulary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Segment id with the bracketed sub-segment suffix removed
    pub video_id:   String,
    /// Full segment id, e.g. `03bSnISJMiM[11]`
    pub segment_id: String,
    /// Sentiment label, NaN already replaced by 0
    pub label:      f32,
    /// Rows after pause handling, before truncation/padding
    pub length:     usize,
    /// Present when text was requested
    pub text:       Option<Vec<String>>,
    /// One fixed-shape array per requested non-text modality
    pub features:   BTreeMap<Modality, Array2<f32>>,
}

impl SegmentRecord {
    /// Row count of a requested modality
    pub fn seq_len(&self, modality: Modality) -> Option<usize> {
        match modality {
            Modality::Text => self.text.as_ref().map(Vec::len),
            m              => self.features.get(&m).map(|a| a.nrows()),
        }
    }

    pub fn feature(&self, modality: Modality) -> Option<&Array2<f32>> {
        self.features.get(&modality)
    }
}

/// Which output split a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitName {
    Train,
    Dev,
    Test,
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => f.write_str("train"),
            Self::Dev   => f.write_str("dev"),
            Self::Test  => f.write_str("test"),
        }
    }
}

/// Canonical video-id membership lists. Supplied with the corpus,
/// never computed. On disk the dev fold is called `valid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Folds {
    pub train: HashSet<String>,
    #[serde(rename = "valid", alias = "dev")]
    pub dev:   HashSet<String>,
    pub test:  HashSet<String>,
}

impl Folds {
    /// Membership test in train → dev → test priority
    pub fn assign(&self, video_id: &str) -> Option<SplitName> {
        if self.train.contains(video_id) {
            Some(SplitName::Train)
        } else if self.dev.contains(video_id) {
            Some(SplitName::Dev)
        } else if self.test.contains(video_id) {
            Some(SplitName::Test)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Splits {
    pub train: Vec<SegmentRecord>,
    pub dev:   Vec<SegmentRecord>,
    pub test:  Vec<SegmentRecord>,
}

impl Splits {
    pub fn push(&mut self, split: SplitName, record: SegmentRecord) {
        self.get_mut(split).push(record);
    }

    pub fn get(&self, split: SplitName) -> &[SegmentRecord] {
        match split {
            SplitName::Train => &self.train,
            SplitName::Dev   => &self.dev,
            SplitName::Test  => &self.test,
        }
    }

    fn get_mut(&mut self, split: SplitName) -> &mut Vec<SegmentRecord> {
        match split {
            SplitName::Train => &mut self.train,
            SplitName::Dev   => &mut self.dev,
            SplitName::Test  => &mut self.test,
        }
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.dev.len() + self.test.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SplitName, &SegmentRecord)> {
        [SplitName::Train, SplitName::Dev, SplitName::Test]
            .into_iter()
            .flat_map(move |s| self.get(s).iter().map(move |r| (s, r)))
    }
}

/// `(train, dev, test, vocabulary)` — the unit the split cache stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedSplits {
    pub splits:     Splits,
    pub vocabulary: Vocabulary,
}

/// Per-run counters collected by the splitter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitStats {
    /// Segments read from the label stream
    pub processed:         usize,
    pub neutral_filtered:  usize,
    pub shape_mismatches:  usize,
    pub unassigned:        usize,
    pub empty:             usize,
    pub ragged:            usize,
    /// Value of the per-segment drop counter after the last segment.
    /// The counter restarts at zero for every segment, so this is
    /// 1 only when the last segment reaching the shape check failed it.
    pub reported_drops:    usize,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn folds() -> Folds {
        Folds {
            train: ["a".to_string(), "shared".to_string()].into_iter().collect(),
            dev:   ["b".to_string(), "shared".to_string()].into_iter().collect(),
            test:  ["c".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_assign_priority() {
        let f = folds();
        assert_eq!(f.assign("a"), Some(SplitName::Train));
        assert_eq!(f.assign("b"), Some(SplitName::Dev));
        assert_eq!(f.assign("c"), Some(SplitName::Test));
        // A video listed twice goes to the first matching fold
        assert_eq!(f.assign("shared"), Some(SplitName::Train));
        assert_eq!(f.assign("zzz"), None);
    }

    #[test]
    fn test_folds_json_uses_valid_for_dev() {
        let json = r#"{"train": ["a"], "valid": ["b"], "test": ["c"]}"#;
        let f: Folds = serde_json::from_str(json).unwrap();
        assert_eq!(f.assign("b"), Some(SplitName::Dev));
    }

    #[test]
    fn test_seq_len_per_modality() {
        let mut features = BTreeMap::new();
        features.insert(Modality::Audio, Array2::<f32>::zeros((4, 3)));
        let r = SegmentRecord {
            video_id:   "v".into(),
            segment_id: "v[0]".into(),
            label:      0.5,
            length:     4,
            text:       Some(vec!["a".into(); 4]),
            features,
        };
        assert_eq!(r.seq_len(Modality::Text), Some(4));
        assert_eq!(r.seq_len(Modality::Audio), Some(4));
        assert_eq!(r.seq_len(Modality::Visual), None);
    }
}
