// ============================================================
// Layer 3 — Computational Sequences
// ============================================================
// A computational sequence is one modality's raw stream for a
// whole corpus, keyed by video/segment id:
//
//   "abc123" → { features: rows, intervals: [(start, end), ...] }
//
// Row i of `features` covers time span `intervals[i]`.
// Text sequences carry one word per row; every other modality
// carries one numeric vector per row.
//
// After alignment the same information is re-shaped into:
//
//   AlignedVideo    — one entry per word of a video, every
//                     modality collapsed onto the word intervals
//   AlignedSegment  — one entry per labelled utterance, holding
//                     the word-level rows that fall inside it

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::dataset::Modality;

/// A closed time span in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    pub start: f64,
    pub end:   f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Intersection with `other` as used by the CMU SDK aligner:
    /// spans touching within `epsilon` intersect, the overlap is
    /// clipped to `other`, and a clipped span no longer than
    /// `epsilon` counts as no intersection.
    pub fn clip_to(&self, other: &Interval, epsilon: f64) -> Option<Interval> {
        if !(self.start < other.end + epsilon && self.end > other.start - epsilon) {
            return None;
        }
        let clipped = Interval::new(self.start.max(other.start), self.end.min(other.end));
        if (clipped.end - clipped.start).abs() > epsilon {
            Some(clipped)
        } else {
            None
        }
    }
}

impl From<[f64; 2]> for Interval {
    fn from([start, end]: [f64; 2]) -> Self {
        Self { start, end }
    }
}

impl From<Interval> for [f64; 2] {
    fn from(i: Interval) -> Self {
        [i.start, i.end]
    }
}

/// The rows of one sequence entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "lowercase")]
pub enum FeatureRows {
    Words(Vec<String>),
    #[serde(deserialize_with = "nullable_rows")]
    Numeric(Vec<Vec<f32>>),
}

impl FeatureRows {
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Words(w)   => w.len(),
            Self::Numeric(r) => r.len(),
        }
    }
}

/// JSON cannot hold NaN; missing values are stored as `null`
fn nullable_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<Option<f32>>> = Deserialize::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
        .collect())
}

/// Features and time spans of one key of a computational sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub features:  FeatureRows,
    pub intervals: Vec<Interval>,
}

/// One modality's stream for the whole corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationalSequence {
    /// Feature-store id, e.g. `CMU_MOSI_COVAREP`
    pub name: String,
    pub data: BTreeMap<String, SequenceEntry>,
}

impl ComputationalSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: SequenceEntry) {
        self.data.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&SequenceEntry> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of collapsing the rows matched to one word interval.
/// `RawRows` is the degraded mode taken when the collapse function
/// fails; it keeps the matched rows unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Collapsed {
    Reduced(Vec<f32>),
    RawRows(Vec<Vec<f32>>),
}

impl Collapsed {
    /// Number of rows this word contributes to a segment
    pub fn row_count(&self) -> usize {
        match self {
            Self::Reduced(_)    => 1,
            Self::RawRows(rows) => rows.len(),
        }
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        match self {
            Self::Reduced(v)    => vec![v],
            Self::RawRows(rows) => rows,
        }
    }
}

/// One video after word-level alignment
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedVideo {
    pub words:     Vec<String>,
    pub intervals: Vec<Interval>,
    /// Non-text modalities, one `Collapsed` per word
    pub streams:   BTreeMap<Modality, Vec<Collapsed>>,
}

/// The word-aligned corpus, keyed by video id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedCorpus {
    pub videos: BTreeMap<String, AlignedVideo>,
}

impl AlignedCorpus {
    /// Every word of every aligned video, in video order
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.videos
            .values()
            .flat_map(|v| v.words.iter().map(String::as_str))
    }
}

/// A labelled segment before cleaning. `label` may still be NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSegment {
    pub segment_id: String,
    pub label:      f32,
    /// Words inside the segment, one per word position
    pub words:      Vec<String>,
    /// Non-text modalities; a word kept as raw rows adds several rows
    pub streams:    BTreeMap<Modality, Vec<Vec<f32>>>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_overlapping_interval() {
        let row  = Interval::new(0.5, 2.0);
        let word = Interval::new(1.0, 1.5);
        assert_eq!(row.clip_to(&word, 1e-5), Some(Interval::new(1.0, 1.5)));
    }

    #[test]
    fn test_touching_intervals_do_not_intersect() {
        // Overlap exists only at the boundary, so the clipped span is zero-length
        let row  = Interval::new(0.0, 1.0);
        let word = Interval::new(1.0, 2.0);
        assert_eq!(row.clip_to(&word, 1e-5), None);
    }

    #[test]
    fn test_disjoint_intervals() {
        let row  = Interval::new(3.0, 4.0);
        let word = Interval::new(1.0, 2.0);
        assert!(row.clip_to(&word, 1e-5).is_none());
    }

    #[test]
    fn test_numeric_rows_read_null_as_nan() {
        let json = r#"{"features": {"kind": "numeric", "rows": [[1.0, null]]},
                       "intervals": [[0.0, 0.5]]}"#;
        let entry: SequenceEntry = serde_json::from_str(json).unwrap();
        match entry.features {
            FeatureRows::Numeric(rows) => {
                assert_eq!(rows[0][0], 1.0);
                assert!(rows[0][1].is_nan());
            }
            other => panic!("expected numeric rows, got {other:?}"),
        }
        assert_eq!(entry.intervals, vec![Interval::new(0.0, 0.5)]);
    }

    #[test]
    fn test_words_rows_parse() {
        let json = r#"{"kind": "words", "rows": ["hello", "sp"]}"#;
        let rows: FeatureRows = serde_json::from_str(json).unwrap();
        assert_eq!(rows, FeatureRows::Words(vec!["hello".into(), "sp".into()]));
    }

    #[test]
    fn test_collapsed_row_counts() {
        assert_eq!(Collapsed::Reduced(vec![1.0, 2.0]).row_count(), 1);
        assert_eq!(Collapsed::RawRows(vec![vec![1.0], vec![2.0, 3.0]]).row_count(), 2);
        assert_eq!(Collapsed::RawRows(Vec::new()).row_count(), 0);
    }
}
