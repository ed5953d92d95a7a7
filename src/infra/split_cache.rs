// ============================================================
// Layer 6 — Split Cache
// ============================================================
// Persists a finished (train, dev, test, vocabulary) set so a
// later run with the same cache path skips loading, alignment
// and splitting entirely.
//
//   load()   — Ok(Some) on hit, Ok(None) when the file does not
//              exist or cannot be decoded
//   store()  — one bincode blob, written to a temp file in the
//              destination directory and renamed into place
//
// The cache key is the path alone. Options are not recorded in
// the blob, so reusing a path across different options returns
// the first run's splits.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::domain::error::{PipelineError, Result};
use crate::domain::segment::PreparedSplits;

#[derive(Debug, Clone)]
pub struct SplitCache {
    path: PathBuf,
}

impl SplitCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<PreparedSplits>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No split cache at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.error(e)),
        };

        match bincode::deserialize_from::<_, PreparedSplits>(BufReader::new(file)) {
            Ok(prepared) => {
                tracing::info!(
                    "Loaded {} cached segments from {}",
                    prepared.splits.total(),
                    self.path.display()
                );
                Ok(Some(prepared))
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable split cache {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn store(&self, prepared: &PreparedSplits) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.error(e))?;

        let tmp = NamedTempFile::new_in(&dir).map_err(|e| self.error(e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            bincode::serialize_into(&mut writer, prepared).map_err(|e| self.error(e))?;
            writer.flush().map_err(|e| self.error(e))?;
        }
        tmp.persist(&self.path).map_err(|e| self.error(e.error))?;

        tracing::info!("Cached splits to {}", self.path.display());
        Ok(())
    }

    fn error(&self, reason: impl std::fmt::Display) -> PipelineError {
        PipelineError::Cache {
            path:   self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use ndarray::Array2;

    use crate::domain::dataset::Modality;
    use crate::domain::segment::{SegmentRecord, SplitName, Splits};
    use crate::domain::vocabulary::Vocabulary;

    fn prepared() -> PreparedSplits {
        let mut features = BTreeMap::new();
        features.insert(Modality::Audio, Array2::from_shape_vec((2, 2), vec![0.5, 1.0, 1.5, 2.0]).unwrap());
        let mut splits = Splits::default();
        splits.push(SplitName::Test, SegmentRecord {
            video_id:   "v".to_string(),
            segment_id: "v[0]".to_string(),
            label:      -1.5,
            length:     2,
            text:       Some(vec!["good".to_string(), "[PAD]".to_string()]),
            features,
        });
        PreparedSplits {
            splits,
            vocabulary: Vocabulary::build(["good"]),
        }
    }

    #[test]
    fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SplitCache::new(dir.path().join("splits.bin"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_store_then_load_returns_equal_splits() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = SplitCache::new(dir.path().join("nested").join("splits.bin"));
        let p     = prepared();
        cache.store(&p).unwrap();
        assert_eq!(cache.load().unwrap(), Some(p));
    }

    #[test]
    fn test_corrupt_blob_is_a_miss() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("splits.bin");
        std::fs::write(&path, b"\x01\x02garbage").unwrap();
        assert!(SplitCache::new(path).load().unwrap().is_none());
    }
}
