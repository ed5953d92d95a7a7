// ============================================================
// Layer 6 — Data Fetcher
// ============================================================
// Makes sure the feature stores and the folds file exist under
// the base path before the loader touches them.
//
//   LocalFiles     — presence check only; fails with the list
//                    of missing files
//   MirrorFetcher  — (feature "download") downloads missing files
//                    from `{mirror}/{file}`, skipping files that
//                    are already present
//
// Both are idempotent: with everything on disk they do nothing.

use std::path::Path;

use crate::domain::error::{PipelineError, Result};
use crate::domain::traits::DataFetcher;

/// Files from `files` that do not exist under `base_path`
pub fn missing_files<'a>(base_path: &Path, files: &'a [String]) -> Vec<&'a str> {
    files
        .iter()
        .filter(|f| !base_path.join(f.as_str()).is_file())
        .map(String::as_str)
        .collect()
}

/// Checks that every file is present and never downloads
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

impl DataFetcher for LocalFiles {
    fn ensure_available(&self, base_path: &Path, files: &[String]) -> Result<()> {
        let missing = missing_files(base_path, files);
        if missing.is_empty() {
            return Ok(());
        }
        Err(PipelineError::unavailable(
            base_path,
            format!("missing {}", missing.join(", ")),
        ))
    }
}

#[cfg(feature = "download")]
pub use mirror::MirrorFetcher;

#[cfg(feature = "download")]
mod mirror {
    use std::fs::{self, File};
    use std::path::Path;
    use std::time::Duration;

    use reqwest::blocking::Client;

    use super::missing_files;
    use crate::domain::error::{PipelineError, Result};
    use crate::domain::traits::DataFetcher;

    /// Downloads missing files from an HTTP mirror
    pub struct MirrorFetcher {
        base_url: String,
        client:   Client,
    }

    impl MirrorFetcher {
        pub fn new(base_url: impl Into<String>) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(300))
                .user_agent(concat!("mmsplits/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| PipelineError::unavailable("", format!("http client: {e}")))?;
            Ok(Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                client,
            })
        }

        fn download(&self, file: &str, dest: &Path) -> Result<()> {
            let url = format!("{}/{}", self.base_url, file);
            tracing::info!("Downloading {} → {}", url, dest.display());

            let mut response = self
                .client
                .get(&url)
                .send()
                .map_err(|e| PipelineError::unavailable(dest, format!("GET {url}: {e}")))?;

            if !response.status().is_success() {
                return Err(PipelineError::unavailable(
                    dest,
                    format!("GET {url}: HTTP {}", response.status()),
                ));
            }

            // Incomplete downloads keep the .part name
            let partial = dest.with_extension("part");
            let mut out = File::create(&partial)?;
            response
                .copy_to(&mut out)
                .map_err(|e| PipelineError::unavailable(dest, format!("GET {url}: {e}")))?;
            fs::rename(&partial, dest)?;
            Ok(())
        }
    }

    impl DataFetcher for MirrorFetcher {
        fn ensure_available(&self, base_path: &Path, files: &[String]) -> Result<()> {
            fs::create_dir_all(base_path)?;
            for file in missing_files(base_path, files) {
                self.download(file, &base_path.join(file))?;
            }
            Ok(())
        }
    }
}
