// ============================================================
// Layer 4 — Aligner
// ============================================================
// Re-segments every modality onto the word intervals of the
// text modality, then cuts the word-level streams into the
// labelled utterance segments.
//
// Word alignment, per video:
//
//   words:   |  the  |   movie   | sp |  was  |
//   audio:   |a|a|a|a|a|a|a|a|a|a|a|a|a|a|a|a|a|
//                 │
//                 ▼  rows intersecting each word → collapse
//   aligned: [ a̅  ,    a̅       , a̅  ,   a̅   ]
//
// A row [s, e] matches word [ws, we] when s < we + ε and
// e > ws − ε, and its span clipped to the word is longer than ε.
// The collapse function (mean by default) reduces the matched
// rows; when it fails, the raw rows are kept as they are. A word
// that no row of some modality intersects is removed from the
// video in every modality, text included.
//
// Label alignment: label interval j of video v becomes segment
// "v[j]", holding every word position intersecting that interval.

use std::collections::BTreeMap;

use crate::domain::dataset::Modality;
use crate::domain::error::{PipelineError, Result};
use crate::domain::sequence::{
    AlignedCorpus, AlignedSegment, AlignedVideo, Collapsed, ComputationalSequence,
    FeatureRows, Interval,
};
use crate::domain::traits::{Collapse, CollapseError};

/// Intersection tolerance of the CMU Multimodal SDK
pub const EPSILON: f64 = 1e-5;

/// Arithmetic mean over the time axis
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanCollapse;

impl Collapse for MeanCollapse {
    fn collapse(
        &self,
        _intervals: &[Interval],
        rows:       &[Vec<f32>],
    ) -> std::result::Result<Vec<f32>, CollapseError> {
        let width = rows.first().ok_or(CollapseError::Empty)?.len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(CollapseError::Ragged);
        }

        let mut sum = vec![0.0f32; width];
        for row in rows {
            for (s, v) in sum.iter_mut().zip(row) {
                *s += v;
            }
        }
        let n = rows.len() as f32;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }
}

pub struct Aligner<C = MeanCollapse> {
    collapse: C,
    epsilon:  f64,
}

impl Aligner<MeanCollapse> {
    pub fn new() -> Self {
        Self::with_collapse(MeanCollapse)
    }
}

impl Default for Aligner<MeanCollapse> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Collapse> Aligner<C> {
    pub fn with_collapse(collapse: C) -> Self {
        Self { collapse, epsilon: EPSILON }
    }

    /// Align every stream in `others` onto the words of `text`.
    ///
    /// Videos missing from any stream are left out of the result.
    pub fn align_to_words(
        &self,
        text:   &ComputationalSequence,
        others: &BTreeMap<Modality, &ComputationalSequence>,
    ) -> Result<AlignedCorpus> {
        let mut corpus        = AlignedCorpus::default();
        let mut skipped       = 0usize;
        let mut dropped_words = 0usize;

        'videos: for (vid, entry) in &text.data {
            let words = match &entry.features {
                FeatureRows::Words(w) => w,
                FeatureRows::Numeric(_) => {
                    return Err(PipelineError::InvalidSequence {
                        name:   text.name.clone(),
                        reason: format!("entry '{vid}' holds numeric rows, expected words"),
                    });
                }
            };
            if words.len() != entry.intervals.len() {
                tracing::warn!(
                    "{}: {} words but {} intervals, removing video",
                    vid,
                    words.len(),
                    entry.intervals.len()
                );
                skipped += 1;
                continue;
            }

            let mut matched = BTreeMap::new();
            for (modality, sequence) in others {
                let Some(other) = sequence.get(vid) else {
                    tracing::warn!("{} is missing from {}, removing video", vid, sequence.name);
                    skipped += 1;
                    continue 'videos;
                };
                let rows = match &other.features {
                    FeatureRows::Numeric(r) => r,
                    FeatureRows::Words(_) => {
                        return Err(PipelineError::InvalidSequence {
                            name:   sequence.name.clone(),
                            reason: format!("entry '{vid}' holds words, expected numeric rows"),
                        });
                    }
                };
                if other.features.len() != other.intervals.len() {
                    tracing::debug!(
                        "{} in {}: {} rows but {} intervals, extra rows ignored",
                        vid,
                        sequence.name,
                        rows.len(),
                        other.intervals.len()
                    );
                }
                matched.insert(*modality, self.collapse_stream(&entry.intervals, rows, &other.intervals));
            }

            // ── Unify: a word survives only if every stream has rows for it ──
            let keep: Vec<bool> = (0..words.len())
                .map(|i| matched.values().all(|stream: &Vec<Option<Collapsed>>| stream[i].is_some()))
                .collect();
            let removed = keep.iter().filter(|k| !**k).count();
            if removed > 0 {
                tracing::debug!("{}: {} words have no rows in some modality", vid, removed);
                dropped_words += removed;
            }

            let streams = matched
                .into_iter()
                .map(|(m, stream)| (m, stream.into_iter().flatten().collect::<Vec<_>>()))
                .collect();
            corpus.videos.insert(vid.clone(), AlignedVideo {
                words:     retain_kept(words, &keep),
                intervals: retain_kept(&entry.intervals, &keep),
                streams,
            });
        }

        tracing::info!(
            "Aligned {} videos to words ({} removed, {} words without rows)",
            corpus.videos.len(),
            skipped,
            dropped_words
        );
        Ok(corpus)
    }

    /// Collapse one modality onto every word interval.
    ///
    /// With rows and words sorted by time (the usual layout of a
    /// feature store) a cursor skips rows that ended before the
    /// current word, so each video is scanned once. Unsorted rows
    /// fall back to a full scan per word.
    fn collapse_stream(
        &self,
        words: &[Interval],
        rows:  &[Vec<f32>],
        spans: &[Interval],
    ) -> Vec<Option<Collapsed>> {
        let n     = rows.len().min(spans.len());
        let rows  = &rows[..n];
        let spans = &spans[..n];

        let sorted = spans
            .windows(2)
            .all(|w| w[0].start <= w[1].start && w[0].end <= w[1].end)
            && words.windows(2).all(|w| w[0].start <= w[1].start);

        let mut lo = 0usize;
        words
            .iter()
            .map(|word| {
                if sorted {
                    while lo < n && spans[lo].end <= word.start - self.epsilon {
                        lo += 1;
                    }
                }
                self.collapse_interval(word, &rows[lo..], &spans[lo..], sorted)
            })
            .collect()
    }

    /// Collapse the rows intersecting `word`, or keep them raw.
    /// `None` when no row intersects the word.
    fn collapse_interval(
        &self,
        word:   &Interval,
        rows:   &[Vec<f32>],
        spans:  &[Interval],
        sorted: bool,
    ) -> Option<Collapsed> {
        let mut matched_spans = Vec::new();
        let mut matched_rows  = Vec::new();
        for (row, span) in rows.iter().zip(spans) {
            if sorted && span.start >= word.end + self.epsilon {
                break;
            }
            if let Some(clipped) = span.clip_to(word, self.epsilon) {
                matched_spans.push(clipped);
                matched_rows.push(row.clone());
            }
        }
        if matched_rows.is_empty() {
            return None;
        }

        Some(match self.collapse.collapse(&matched_spans, &matched_rows) {
            Ok(v)  => Collapsed::Reduced(v),
            Err(e) => {
                tracing::trace!(
                    "collapse failed on [{:.3}, {:.3}]: {}",
                    word.start,
                    word.end,
                    e
                );
                Collapsed::RawRows(matched_rows)
            }
        })
    }

    /// Cut the word-aligned corpus into labelled segments.
    pub fn align_to_labels(
        &self,
        corpus: &AlignedCorpus,
        labels: &ComputationalSequence,
    ) -> Result<Vec<AlignedSegment>> {
        let mut segments = Vec::new();

        for (vid, entry) in &labels.data {
            let label_rows = match &entry.features {
                FeatureRows::Numeric(r) => r,
                FeatureRows::Words(_) => {
                    return Err(PipelineError::InvalidSequence {
                        name:   labels.name.clone(),
                        reason: format!("entry '{vid}' holds words, expected numeric labels"),
                    });
                }
            };
            let Some(video) = corpus.videos.get(vid) else {
                tracing::debug!("{} has labels but no aligned features", vid);
                continue;
            };

            for (j, span) in entry.intervals.iter().enumerate() {
                let positions: Vec<usize> = video
                    .intervals
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| w.clip_to(span, self.epsilon).is_some())
                    .map(|(i, _)| i)
                    .collect();

                // Column 0 is sentiment; MOSEI's emotion columns are not kept
                segments.push(AlignedSegment {
                    segment_id: format!("{vid}[{j}]"),
                    label:      label_rows
                        .get(j)
                        .and_then(|r| r.first())
                        .copied()
                        .unwrap_or(f32::NAN),
                    words:      positions.iter().map(|&i| video.words[i].clone()).collect(),
                    streams:    segment_streams(video, &positions),
                });
            }
        }

        tracing::info!("Aligned labels into {} segments", segments.len());
        Ok(segments)
    }
}

/// Items whose `keep` flag is set
fn retain_kept<T: Clone>(items: &[T], keep: &[bool]) -> Vec<T> {
    items
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(item, _)| item.clone())
        .collect()
}

/// Gather the rows of one segment's word positions from every stream
fn segment_streams(video: &AlignedVideo, positions: &[usize]) -> BTreeMap<Modality, Vec<Vec<f32>>> {
    video
        .streams
        .iter()
        .map(|(modality, stream)| {
            let rows = positions
                .iter()
                .flat_map(|&i| stream[i].clone().into_rows())
                .collect();
            (*modality, rows)
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sequence::SequenceEntry;

    fn words_seq(vid: &str, words: &[&str]) -> ComputationalSequence {
        let mut s = ComputationalSequence::new("words");
        s.insert(vid, SequenceEntry {
            features:  FeatureRows::Words(words.iter().map(|w| w.to_string()).collect()),
            intervals: (0..words.len()).map(|i| Interval::new(i as f64, i as f64 + 1.0)).collect(),
        });
        s
    }

    /// Two rows per second: [i/2, i/2 + 0.5], value = i
    fn audio_seq(vid: &str, seconds: usize) -> ComputationalSequence {
        let mut s = ComputationalSequence::new("audio");
        let n = seconds * 2;
        s.insert(vid, SequenceEntry {
            features:  FeatureRows::Numeric((0..n).map(|i| vec![i as f32, 1.0]).collect()),
            intervals: (0..n).map(|i| Interval::new(i as f64 / 2.0, i as f64 / 2.0 + 0.5)).collect(),
        });
        s
    }

    fn first_value(_: &[Interval], rows: &[Vec<f32>]) -> std::result::Result<Vec<f32>, CollapseError> {
        rows.first().cloned().ok_or(CollapseError::Empty)
    }

    #[test]
    fn test_mean_collapse() {
        let out = MeanCollapse.collapse(&[], &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(out, vec![2.0, 3.0]);
    }

    #[test]
    fn test_mean_collapse_failures() {
        assert_eq!(MeanCollapse.collapse(&[], &[]), Err(CollapseError::Empty));
        assert_eq!(
            MeanCollapse.collapse(&[], &[vec![1.0], vec![1.0, 2.0]]),
            Err(CollapseError::Ragged)
        );
    }

    #[test]
    fn test_align_averages_rows_inside_each_word() {
        let text  = words_seq("v", &["good", "film"]);
        let audio = audio_seq("v", 2);
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();

        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();
        let video  = &corpus.videos["v"];
        assert_eq!(video.words, vec!["good", "film"]);
        assert_eq!(video.streams[&Modality::Audio], vec![
            Collapsed::Reduced(vec![0.5, 1.0]),
            Collapsed::Reduced(vec![2.5, 1.0]),
        ]);
    }

    #[test]
    fn test_custom_collapse_function() {
        let text  = words_seq("v", &["good", "film"]);
        let audio = audio_seq("v", 2);
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();

        let corpus = Aligner::with_collapse(first_value).align_to_words(&text, &others).unwrap();
        assert_eq!(
            corpus.videos["v"].streams[&Modality::Audio][1],
            Collapsed::Reduced(vec![2.0, 1.0])
        );
    }

    #[test]
    fn test_failed_collapse_keeps_raw_rows() {
        let text = words_seq("v", &["a"]);
        let mut audio = ComputationalSequence::new("audio");
        audio.insert("v", SequenceEntry {
            features:  FeatureRows::Numeric(vec![vec![1.0], vec![2.0, 3.0]]),
            intervals: vec![Interval::new(0.0, 0.5), Interval::new(0.5, 1.0)],
        });
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();

        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();
        assert_eq!(
            corpus.videos["v"].streams[&Modality::Audio][0],
            Collapsed::RawRows(vec![vec![1.0], vec![2.0, 3.0]])
        );
    }

    #[test]
    fn test_word_without_rows_is_removed_everywhere() {
        let text  = words_seq("v", &["a", "b", "c"]);
        let audio = audio_seq("v", 2); // covers only the first two seconds
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();

        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();
        let video  = &corpus.videos["v"];
        assert_eq!(video.words, vec!["a", "b"]);
        assert_eq!(video.intervals.len(), 2);
        assert_eq!(video.streams[&Modality::Audio].len(), 2);
    }

    #[test]
    fn test_partial_audio_keeps_the_segment() {
        let text  = words_seq("v", &["a", "b", "c"]);
        let audio = audio_seq("v", 2);
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();
        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();

        let mut labels = ComputationalSequence::new("labels");
        labels.insert("v", SequenceEntry {
            features:  FeatureRows::Numeric(vec![vec![1.0]]),
            intervals: vec![Interval::new(0.0, 3.0)],
        });
        let segments = Aligner::new().align_to_labels(&corpus, &labels).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].words, vec!["a", "b"]);
        assert_eq!(segments[0].streams[&Modality::Audio].len(), segments[0].words.len());
    }

    #[test]
    fn test_gap_in_one_modality_drops_only_that_word() {
        let text = words_seq("v", &["a", "b", "c"]);
        let mut audio = audio_seq("v", 3);
        // Remove the rows of the middle second
        if let Some(entry) = audio.data.get_mut("v") {
            if let FeatureRows::Numeric(rows) = &mut entry.features {
                rows.drain(2..4);
            }
            entry.intervals.drain(2..4);
        }
        let visual = audio_seq("v", 3);
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio), (Modality::Visual, &visual)]
            .into_iter()
            .collect();

        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();
        let video  = &corpus.videos["v"];
        assert_eq!(video.words, vec!["a", "c"]);
        assert_eq!(video.streams[&Modality::Visual], vec![
            Collapsed::Reduced(vec![0.5, 1.0]),
            Collapsed::Reduced(vec![4.5, 1.0]),
        ]);
        assert_eq!(video.streams[&Modality::Audio][1], Collapsed::Reduced(vec![4.5, 1.0]));
    }

    #[test]
    fn test_unsorted_rows_match_sorted_rows() {
        let text   = words_seq("v", &["a", "b", "c"]);
        let sorted = audio_seq("v", 3);
        let mut shuffled = sorted.clone();
        if let Some(entry) = shuffled.data.get_mut("v") {
            if let FeatureRows::Numeric(rows) = &mut entry.features {
                rows.reverse();
            }
            entry.intervals.reverse();
        }

        let align = |audio: &ComputationalSequence| {
            let others: BTreeMap<_, _> = [(Modality::Audio, audio)].into_iter().collect();
            Aligner::new().align_to_words(&text, &others).unwrap()
        };
        assert_eq!(align(&sorted), align(&shuffled));
    }

    #[test]
    fn test_video_missing_from_a_modality_is_removed() {
        let text  = words_seq("v", &["a"]);
        let audio = audio_seq("other", 1);
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();

        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();
        assert!(corpus.videos.is_empty());
    }

    #[test]
    fn test_numeric_text_is_rejected() {
        let audio  = audio_seq("v", 1);
        let others = BTreeMap::new();
        let err    = Aligner::new().align_to_words(&audio, &others).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSequence { .. }));
    }

    #[test]
    fn test_labels_cut_words_into_segments() {
        let text  = words_seq("v", &["a", "b", "c", "d"]);
        let audio = audio_seq("v", 4);
        let others: BTreeMap<_, _> = [(Modality::Audio, &audio)].into_iter().collect();
        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();

        let mut labels = ComputationalSequence::new("labels");
        labels.insert("v", SequenceEntry {
            features:  FeatureRows::Numeric(vec![vec![1.5], vec![f32::NAN]]),
            intervals: vec![Interval::new(0.0, 2.0), Interval::new(2.0, 4.0)],
        });

        let segments = Aligner::new().align_to_labels(&corpus, &labels).unwrap();
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].segment_id, "v[0]");
        assert_eq!(segments[0].label, 1.5);
        assert_eq!(segments[0].words, vec!["a", "b"]);
        assert_eq!(segments[0].streams[&Modality::Audio].len(), 2);

        assert_eq!(segments[1].segment_id, "v[1]");
        assert!(segments[1].label.is_nan());
        assert_eq!(segments[1].words, vec!["c", "d"]);
    }

    #[test]
    fn test_label_is_the_sentiment_column() {
        let text   = words_seq("v", &["a"]);
        let others = BTreeMap::new();
        let corpus = Aligner::new().align_to_words(&text, &others).unwrap();

        // Sentiment followed by six emotion scores
        let mut labels = ComputationalSequence::new("labels");
        labels.insert("v", SequenceEntry {
            features:  FeatureRows::Numeric(vec![vec![-2.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]]),
            intervals: vec![Interval::new(0.0, 1.0)],
        });
        let segments = Aligner::new().align_to_labels(&corpus, &labels).unwrap();
        assert_eq!(segments[0].label, -2.0);
    }

    #[test]
    fn test_raw_rows_expand_segment_length() {
        let mut corpus = AlignedCorpus::default();
        let mut streams = BTreeMap::new();
        streams.insert(Modality::Audio, vec![
            Collapsed::Reduced(vec![1.0]),
            Collapsed::RawRows(vec![vec![2.0], vec![3.0]]),
        ]);
        corpus.videos.insert("v".into(), AlignedVideo {
            words:     vec!["a".into(), "b".into()],
            intervals: vec![Interval::new(0.0, 1.0), Interval::new(1.0, 2.0)],
            streams,
        });

        let mut labels = ComputationalSequence::new("labels");
        labels.insert("v", SequenceEntry {
            features:  FeatureRows::Numeric(vec![vec![0.0]]),
            intervals: vec![Interval::new(0.0, 2.0)],
        });

        let segments = Aligner::new().align_to_labels(&corpus, &labels).unwrap();
        assert_eq!(segments[0].words.len(), 2);
        assert_eq!(segments[0].streams[&Modality::Audio], vec![vec![1.0], vec![2.0], vec![3.0]]);
    }
}
