// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the cross-cutting concerns that don't belong in any
// specific pipeline step:
//
//   fetcher.rs      — Data availability
//                     Checks that every feature store exists
//                     under the base path, or downloads missing
//                     ones from a mirror (feature "download").
//
//   split_cache.rs  — Split persistence
//                     Stores prepared train/dev/test splits and
//                     their vocabulary as one bincode blob.
//
//   vocab_store.rs  — Vocabulary export
//                     Writes the vocabulary as a WordLevel
//                     tokenizer.json.
//
//   logging.rs      — Tracing setup and the default
//                     SplitObserver.

/// Feature store presence checks and downloads
pub mod fetcher;

/// bincode split cache
pub mod split_cache;

/// tokenizer.json export
pub mod vocab_store;

/// Subscriber setup and tracing-backed observer
pub mod logging;
