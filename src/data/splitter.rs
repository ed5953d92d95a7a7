// ============================================================
// Layer 4 — Segment Cleaner & Fold Splitter
// ============================================================
// Turns labelled segments into SegmentRecords and routes each
// one into train / dev / test by its video id.
//
// Every segment passes through the same steps, in order:
//
//   1. video id       "abc[3]" → "abc"
//   2. label          NaN → 0
//   3. neutral        optional: drop labels that are exactly 0
//   4. gather         requested modalities, row counts
//   5. shape check    unequal row counts → drop + warning
//   6. clean          NaN → 0 in numeric modalities
//   7. pauses         "sp" words removed, or replaced by [PAUSE]
//   8. length         keep-last truncation, front/back padding
//   9. arrays         numeric rows → fixed-shape Array2
//  10. assign         train → dev → test, or drop + warning
//
// A segment is never revisited. Anomalies are reported to the
// SplitObserver and processing moves on to the next segment.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use ndarray::Array2;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::Modality;
use crate::domain::error::SplitWarning;
use crate::domain::segment::{Folds, SegmentRecord, SplitStats, Splits};
use crate::domain::sequence::AlignedSegment;
use crate::domain::traits::SplitObserver;
use crate::domain::vocabulary::{SpecialToken, PAUSE_MARKER};

/// Everything before a trailing `[...]` block
const VIDEO_ID_PATTERN: &str = r"(.*)\[.*\]";

/// Compiled once per process
fn video_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(VIDEO_ID_PATTERN).expect("video id pattern compiles"))
}

/// Where padding goes when a sequence is shorter than `max_length`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Padding {
    #[default]
    None,
    Front,
    Back,
}

impl Padding {
    /// Front padding wins when both flags are set
    pub fn from_flags(pad_front: bool, pad_back: bool) -> Self {
        if pad_front {
            Self::Front
        } else if pad_back {
            Self::Back
        } else {
            Self::None
        }
    }
}

/// Cleaning options for one run
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOptions {
    pub modalities:     BTreeSet<Modality>,
    pub remove_pauses:  bool,
    pub remove_neutral: bool,
    /// `None` disables truncation and padding
    pub max_length:     Option<usize>,
    pub padding:        Padding,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            modalities:     [Modality::Text, Modality::Audio].into_iter().collect(),
            remove_pauses:  false,
            remove_neutral: false,
            max_length:     None,
            padding:        Padding::None,
        }
    }
}

/// Result of one splitting pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitOutcome {
    pub splits: Splits,
    pub stats:  SplitStats,
}

pub struct SegmentSplitter<'a> {
    folds:   &'a Folds,
    options: &'a SplitOptions,
}

impl<'a> SegmentSplitter<'a> {
    pub fn new(folds: &'a Folds, options: &'a SplitOptions) -> Self {
        Self { folds, options }
    }

    /// Strip the bracketed sub-segment suffix.
    /// An id without brackets is its own video id.
    pub fn video_id<'s>(&self, segment_id: &'s str) -> &'s str {
        video_pattern()
            .captures(segment_id)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(segment_id)
    }

    /// Clean every segment and assign it to a split.
    pub fn split(
        &self,
        segments: impl IntoIterator<Item = AlignedSegment>,
        observer: &mut dyn SplitObserver,
    ) -> SplitOutcome {
        let mut splits   = Splits::default();
        let mut stats    = SplitStats::default();
        let mut num_drop = 0usize;

        for segment in segments {
            stats.processed += 1;

            let video_id = self.video_id(&segment.segment_id).to_string();
            let label    = if segment.label.is_nan() { 0.0 } else { segment.label };

            // Exact zero only: near-zero continuous labels are kept
            if self.options.remove_neutral && label == 0.0 {
                stats.neutral_filtered += 1;
                continue;
            }

            // The drop counter restarts for every segment, so the
            // end-of-run report reflects the last segment only.
            num_drop = 0;

            let record = match self.clean(segment, video_id, label) {
                Ok(record) => record,
                Err(warning) => {
                    match warning {
                        SplitWarning::ShapeMismatch { .. } => {
                            num_drop += 1;
                            stats.shape_mismatches += 1;
                        }
                        SplitWarning::EmptySegment { .. }   => stats.empty += 1,
                        SplitWarning::RaggedFeatures { .. } => stats.ragged += 1,
                        SplitWarning::FoldMembership { .. } => stats.unassigned += 1,
                    }
                    observer.warn(&warning);
                    continue;
                }
            };

            match self.folds.assign(&record.video_id) {
                Some(split) => splits.push(split, record),
                None => {
                    stats.unassigned += 1;
                    observer.warn(&SplitWarning::FoldMembership {
                        video_id:   record.video_id,
                        segment_id: record.segment_id,
                    });
                }
            }
        }

        stats.reported_drops = num_drop;
        observer.dropped(num_drop);

        tracing::info!(
            "Split {} segments: {} train, {} dev, {} test",
            stats.processed,
            splits.train.len(),
            splits.dev.len(),
            splits.test.len()
        );

        SplitOutcome { splits, stats }
    }

    /// Steps 4–9 for one segment
    fn clean(
        &self,
        segment:  AlignedSegment,
        video_id: String,
        label:    f32,
    ) -> Result<SegmentRecord, SplitWarning> {
        let AlignedSegment { segment_id, words, mut streams, .. } = segment;
        let opts      = self.options;
        let want_text = opts.modalities.contains(&Modality::Text);

        // ── Step 4: Gather requested modalities ──────────────────────────────
        let mut text = if want_text { Some(words) } else { None };
        let mut numeric: BTreeMap<Modality, Vec<Vec<f32>>> = opts
            .modalities
            .iter()
            .filter(|m| !m.is_text())
            .map(|m| (*m, streams.remove(m).unwrap_or_default()))
            .collect();

        // ── Step 5: Shape consistency ─────────────────────────────────────────
        let mut shapes = BTreeMap::new();
        if let Some(words) = &text {
            shapes.insert(Modality::Text, words.len());
        }
        for (m, rows) in &numeric {
            shapes.insert(*m, rows.len());
        }
        let distinct: BTreeSet<usize> = shapes.values().copied().collect();
        if distinct.len() > 1 {
            return Err(SplitWarning::ShapeMismatch { segment_id, shapes });
        }

        // ── Step 6: NaN → 0 ───────────────────────────────────────────────────
        for rows in numeric.values_mut() {
            rows.iter_mut().for_each(|row| nan_to_num(row));
        }

        // ── Step 7: Speech pauses ─────────────────────────────────────────────
        if let Some(words) = text.take() {
            let pauses: Vec<bool> = words.iter().map(|w| w == PAUSE_MARKER).collect();
            if opts.remove_pauses {
                text = Some(drop_positions(words, &pauses));
                for rows in numeric.values_mut() {
                    *rows = drop_positions(std::mem::take(rows), &pauses);
                }
            } else {
                text = Some(
                    words
                        .into_iter()
                        .zip(&pauses)
                        .map(|(w, &p)| if p { SpecialToken::Pause.as_str().to_string() } else { w })
                        .collect(),
                );
            }
        }

        let length = distinct_len(&text, &numeric);

        // ── Step 8: Truncate / pad ────────────────────────────────────────────
        if let Some(max_len) = opts.max_length {
            if let Some(words) = text.take() {
                text = Some(fit_length(words, max_len, opts.padding, || {
                    SpecialToken::Pad.as_str().to_string()
                }));
            }
            for (m, rows) in numeric.iter_mut() {
                let needs_pad = rows.len() < max_len && opts.padding != Padding::None;
                let Some(width) = rows.first().map(Vec::len) else {
                    if needs_pad {
                        return Err(SplitWarning::EmptySegment { segment_id });
                    }
                    continue;
                };
                tracing::trace!("{} {}: fitting {} rows to {}", segment_id, m, rows.len(), max_len);
                *rows = fit_length(std::mem::take(rows), max_len, opts.padding, || vec![0.0; width]);
            }
        }

        // ── Step 9: Fixed-shape arrays ────────────────────────────────────────
        let mut features = BTreeMap::new();
        for (m, rows) in numeric {
            match to_array(rows) {
                Some(array) => {
                    features.insert(m, array);
                }
                None => {
                    return Err(SplitWarning::RaggedFeatures { segment_id, modality: m });
                }
            }
        }

        Ok(SegmentRecord {
            video_id,
            segment_id,
            label,
            length,
            text,
            features,
        })
    }
}

/// NaN → 0, ±inf → the largest finite values (numpy's nan_to_num)
fn nan_to_num(row: &mut [f32]) {
    for v in row.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        } else if *v == f32::INFINITY {
            *v = f32::MAX;
        } else if *v == f32::NEG_INFINITY {
            *v = f32::MIN;
        }
    }
}

/// Keep the items whose `drop` flag is false
fn drop_positions<T>(items: Vec<T>, drop: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(drop)
        .filter(|(_, d)| !**d)
        .map(|(item, _)| item)
        .collect()
}

/// Row count shared by every requested modality
fn distinct_len(text: &Option<Vec<String>>, numeric: &BTreeMap<Modality, Vec<Vec<f32>>>) -> usize {
    text.as_ref()
        .map(Vec::len)
        .or_else(|| numeric.values().next().map(Vec::len))
        .unwrap_or(0)
}

/// Keep the last `max_len` items, or pad up to `max_len`
pub fn fit_length<T>(mut items: Vec<T>, max_len: usize, padding: Padding, pad: impl Fn() -> T) -> Vec<T> {
    let len = items.len();
    if len > max_len {
        return items.split_off(len - max_len);
    }
    let missing = max_len - len;
    match padding {
        Padding::Front if missing > 0 => {
            let mut out: Vec<T> = (0..missing).map(|_| pad()).collect();
            out.extend(items);
            out
        }
        Padding::Back if missing > 0 => {
            items.extend((0..missing).map(|_| pad()));
            items
        }
        _ => items,
    }
}

/// Stack rows into a `rows × width` array; `None` when rows are ragged
fn to_array(rows: Vec<Vec<f32>>) -> Option<Array2<f32>> {
    let n     = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != width) {
        return None;
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, width), flat).ok()
}
