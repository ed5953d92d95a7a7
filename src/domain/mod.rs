// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the corpus:
// dataset descriptors, computational sequences, segment records,
// the vocabulary, and the error/warning taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O or network calls
//   - Only data types and the traits other layers implement

/// Dataset descriptors and the closed modality enum
pub mod dataset;

/// Fatal errors and per-segment warnings
pub mod error;

/// Segment records, folds and the train/dev/test splits
pub mod segment;

/// Computational sequences and their aligned forms
pub mod sequence;

/// Core abstractions (traits) that other layers implement
pub mod traits;

/// Word → index mapping with special tokens
pub mod vocabulary;
