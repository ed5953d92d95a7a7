// ============================================================
// Layer 3 — Error and Warning Taxonomy
// ============================================================
// Two kinds of anomalies flow out of the pipeline:
//
//   PipelineError  — fatal, surfaced immediately to the caller
//                    (unknown dataset, missing feature files, ...)
//
//   SplitWarning   — per-segment, non-fatal. The segment is
//                    dropped and processing continues with the
//                    next one. Warnings are handed to a
//                    SplitObserver instead of aborting the split.
//
// A cache miss is neither: the cache returns Ok(None).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::dataset::Modality;

/// Result alias for the library layers
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Dataset name is not one of the supported corpora
    #[error("Unsupported dataset '{0}' (expected one of: mosi, mosei)")]
    UnsupportedDataset(String),

    /// Modality name is unknown or cannot be requested
    #[error("Unsupported modality '{0}' (expected one of: text, audio, visual)")]
    UnsupportedModality(String),

    /// A feature store or folds file is missing or unreadable
    #[error("Data unavailable at '{}': {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    /// A computational sequence has the wrong row kind
    #[error("Invalid computational sequence '{name}': {reason}")]
    InvalidSequence { name: String, reason: String },

    /// The split cache could not be written
    #[error("Split cache error at '{}': {reason}", path.display())]
    Cache { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::DataUnavailable {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Non-fatal per-segment anomalies. The segment named in the
/// warning is absent from every output split.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitWarning {
    /// Requested modalities disagree on sequence length
    ShapeMismatch {
        segment_id: String,
        shapes:     BTreeMap<Modality, usize>,
    },

    /// Video id is in none of the train/dev/test folds
    FoldMembership {
        video_id:   String,
        segment_id: String,
    },

    /// Padding was requested but the segment has no rows to take a shape from
    EmptySegment { segment_id: String },

    /// Numeric rows of one modality have different widths
    RaggedFeatures {
        segment_id: String,
        modality:   Modality,
    },
}

impl SplitWarning {
    pub fn segment_id(&self) -> &str {
        match self {
            Self::ShapeMismatch { segment_id, .. }
            | Self::FoldMembership { segment_id, .. }
            | Self::EmptySegment { segment_id }
            | Self::RaggedFeatures { segment_id, .. } => segment_id,
        }
    }
}

impl fmt::Display for SplitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { segment_id, shapes } => {
                let shapes: Vec<String> = shapes
                    .iter()
                    .map(|(m, len)| format!("{m}: {len}"))
                    .collect();
                write!(f, "Datapoint {segment_id} shape mismatch {{{}}}", shapes.join(", "))
            }
            Self::FoldMembership { video_id, .. } => {
                write!(f, "{video_id} does not belong to any of the splits")
            }
            Self::EmptySegment { segment_id } => {
                write!(f, "Datapoint {segment_id} is empty and cannot be padded")
            }
            Self::RaggedFeatures { segment_id, modality } => {
                write!(f, "Datapoint {segment_id} has ragged {modality} rows")
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_every_modality() {
        let mut shapes = BTreeMap::new();
        shapes.insert(Modality::Text, 50);
        shapes.insert(Modality::Audio, 48);
        let w = SplitWarning::ShapeMismatch {
            segment_id: "abc[3]".to_string(),
            shapes,
        };
        assert_eq!(w.to_string(), "Datapoint abc[3] shape mismatch {text: 50, audio: 48}");
        assert_eq!(w.segment_id(), "abc[3]");
    }

    #[test]
    fn test_unsupported_dataset_message() {
        let e = PipelineError::UnsupportedDataset("iemocap".to_string());
        assert!(e.to_string().contains("iemocap"));
    }
}
