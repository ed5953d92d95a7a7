// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pipeline talks to its collaborators through these traits:
//
//   FeatureSource  — reads computational sequences and folds
//                    (CsdLoader reads {base}/{store}.csd files)
//   DataFetcher    — makes sure the files exist locally
//                    (LocalFiles checks, MirrorFetcher downloads)
//   Collapse       — reduces the rows inside one word interval
//                    (MeanCollapse averages them)
//   SplitObserver  — receives per-segment warnings
//                    (TracingObserver logs them)

use std::path::Path;

use thiserror::Error;

use crate::domain::error::{Result, SplitWarning};
use crate::domain::segment::Folds;
use crate::domain::sequence::{ComputationalSequence, Interval};

// ─── FeatureSource ────────────────────────────────────────────────────────────
/// Anything that can produce computational sequences by store id.
pub trait FeatureSource {
    /// Load the sequence stored under `store_id`
    fn load_sequence(&self, store_id: &str) -> Result<ComputationalSequence>;

    /// Load the canonical folds from `folds_file`
    fn load_folds(&self, folds_file: &str) -> Result<Folds>;
}

// ─── DataFetcher ──────────────────────────────────────────────────────────────
/// The download utility. Must be idempotent: with every file
/// already present, `ensure_available` does nothing.
pub trait DataFetcher {
    fn ensure_available(&self, base_path: &Path, files: &[String]) -> Result<()>;
}

// ─── Collapse ─────────────────────────────────────────────────────────────────
/// Why a collapse function could not reduce a set of rows
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollapseError {
    #[error("no rows to collapse")]
    Empty,

    #[error("rows have different widths")]
    Ragged,
}

/// Reduces all raw rows falling inside one word interval to a
/// single representative vector. Errors are not fatal: the aligner
/// keeps the raw rows for that interval instead.
pub trait Collapse {
    fn collapse(
        &self,
        intervals: &[Interval],
        rows:      &[Vec<f32>],
    ) -> std::result::Result<Vec<f32>, CollapseError>;
}

/// Plain functions and closures work as collapse functions
impl<F> Collapse for F
where
    F: Fn(&[Interval], &[Vec<f32>]) -> std::result::Result<Vec<f32>, CollapseError>,
{
    fn collapse(
        &self,
        intervals: &[Interval],
        rows:      &[Vec<f32>],
    ) -> std::result::Result<Vec<f32>, CollapseError> {
        self(intervals, rows)
    }
}

// ─── SplitObserver ────────────────────────────────────────────────────────────
/// Receives every non-fatal anomaly raised while splitting.
pub trait SplitObserver {
    fn warn(&mut self, warning: &SplitWarning);

    /// End-of-run drop report
    fn dropped(&mut self, count: usize) {
        let _ = count;
    }
}

/// Collects warnings in memory
#[derive(Debug, Default)]
pub struct CollectingObserver {
    pub warnings: Vec<SplitWarning>,
    pub dropped:  Option<usize>,
}

impl SplitObserver for CollectingObserver {
    fn warn(&mut self, warning: &SplitWarning) {
        self.warnings.push(warning.clone());
    }

    fn dropped(&mut self, count: usize) {
        self.dropped = Some(count);
    }
}
