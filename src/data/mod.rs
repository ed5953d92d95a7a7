// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer takes raw computational sequences all the way to
// cleaned train/dev/test records and tensor batches.
//
// The pipeline flows in this order:
//
//   {store}.csd files + folds
//       │
//       ▼
//   CsdLoader          → reads sequences and folds
//       │
//       ▼
//   Aligner            → collapses every modality onto word
//       │                intervals, then cuts by label interval
//       ▼
//   SegmentSplitter    → cleans, pads and assigns each segment
//       │                to train / dev / test
//       ▼
//   SegmentDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   MultimodalBatcher  → stacks records into tensor batches
//
// Each module is responsible for exactly one step.

/// Reads .csd feature stores and the folds file
pub mod loader;

/// Word-level and label-level alignment
pub mod aligner;

/// Segment cleaning and fold assignment
pub mod splitter;

/// Implements Burn's Dataset trait for segment records
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
