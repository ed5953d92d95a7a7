// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Exports the Vocabulary as a HuggingFace tokenizer.json so
// downstream models can encode text with the same indices.
//
// The JSON is written by hand and loaded back with
// Tokenizer::from_file. WordLevel needs no training; the ids
// are exactly the Vocabulary's:
//
//   model          WordLevel, vocab = word → index, unk [UNK]
//   pre_tokenizer  WhitespaceSplit (words are already split)
//   added_tokens   the five special tokens at their indices
//
// No normalizer is configured, so encoding is case-sensitive
// exactly like the Vocabulary.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::domain::vocabulary::{SpecialToken, Vocabulary};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Write tokenizer.json and load it back
    pub fn save(&self, vocabulary: &Vocabulary) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: word → index map ──────────────────────────────────────────
        let vocab: serde_json::Map<String, serde_json::Value> = vocabulary
            .iter()
            .map(|(token, idx)| (token.to_string(), serde_json::json!(idx)))
            .collect();

        // ── Step 2: special tokens as added tokens ────────────────────────────
        let added_tokens: Vec<serde_json::Value> = SpecialToken::ALL
            .iter()
            .map(|t| serde_json::json!({
                "id":          vocabulary.special(*t),
                "content":     t.as_str(),
                "single_word": false,
                "lstrip":      false,
                "rstrip":      false,
                "normalized":  false,
                "special":     true,
            }))
            .collect();

        // ── Step 3: Write tokenizer JSON in HuggingFace format ────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": {
                "type": "WhitespaceSplit"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": SpecialToken::Unk.as_str()
            }
        });

        let path = self.tokenizer_path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!(
            "Vocabulary of {} tokens saved to '{}'",
            vocabulary.len(),
            path.display()
        );

        self.load()
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.tokenizer_path())
    }
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}
