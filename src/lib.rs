//! Align CMU-MOSI / CMU-MOSEI modalities to words, cut them into
//! labelled segments and split them into train / dev / test by the
//! canonical folds.
//!
//! ```no_run
//! use mmsplits::application::prepare_use_case::{load_splits, PrepareConfig};
//! use mmsplits::infra::{fetcher::LocalFiles, logging::TracingObserver};
//!
//! let mut config = PrepareConfig::mosi("data/mosi");
//! config.max_length = 50;
//! config.pad_back   = true;
//! let prepared = load_splits(&config, &LocalFiles, &mut TracingObserver::default())?;
//! println!("{} training segments", prepared.splits.train.len());
//! # Ok::<(), mmsplits::domain::error::PipelineError>(())
//! ```

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
