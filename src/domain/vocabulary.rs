// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Maps every word token to a unique index:
//
//   0 .. W-1      distinct corpus words, sorted lexicographically
//   W .. W+4      [PAD] [BOS] [EOS] [UNK] [PAUSE], in that order
//
// A corpus word spelled exactly like a special token is not
// numbered twice; the special token keeps its slot at the top.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Special tokens, in the order they are appended to the vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialToken {
    Pad,
    Bos,
    Eos,
    Unk,
    Pause,
}

impl SpecialToken {
    pub const ALL: [SpecialToken; 5] = [
        SpecialToken::Pad,
        SpecialToken::Bos,
        SpecialToken::Eos,
        SpecialToken::Unk,
        SpecialToken::Pause,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pad   => "[PAD]",
            Self::Bos   => "[BOS]",
            Self::Eos   => "[EOS]",
            Self::Unk   => "[UNK]",
            Self::Pause => "[PAUSE]",
        }
    }

    pub fn is_special(token: &str) -> bool {
        Self::ALL.iter().any(|t| t.as_str() == token)
    }
}

/// Word marker the aligner emits for detected speech silence
pub const PAUSE_MARKER: &str = "sp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Index → token
    tokens:   Vec<String>,
    /// Token → index
    word2idx: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from every word observed in the aligned text.
    /// Duplicates are collapsed before numbering.
    pub fn build<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = words
            .into_iter()
            .filter(|w| !SpecialToken::is_special(w))
            .collect();

        let tokens: Vec<String> = distinct
            .into_iter()
            .map(str::to_string)
            .chain(SpecialToken::ALL.iter().map(|t| t.as_str().to_string()))
            .collect();

        let word2idx = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        Self { tokens, word2idx }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of corpus words, i.e. everything below the special tokens
    pub fn word_count(&self) -> usize {
        self.tokens.len() - SpecialToken::ALL.len()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.word2idx.get(token).copied()
    }

    /// Index of `token`, or of `[UNK]` when the token is unknown
    pub fn encode(&self, token: &str) -> usize {
        self.index_of(token)
            .unwrap_or_else(|| self.special(SpecialToken::Unk))
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn special(&self, token: SpecialToken) -> usize {
        let offset = SpecialToken::ALL
            .iter()
            .position(|t| *t == token)
            .unwrap_or_default();
        self.word_count() + offset
    }

    /// `(token, index)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tokens.iter().enumerate().map(|(i, t)| (t.as_str(), i))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_sorted_then_specials() {
        let v = Vocabulary::build(["movie", "a", "great", "a", "sp"]);
        assert_eq!(v.index_of("a"), Some(0));
        assert_eq!(v.index_of("great"), Some(1));
        assert_eq!(v.index_of("movie"), Some(2));
        assert_eq!(v.index_of("sp"), Some(3));
        assert_eq!(v.index_of("[PAD]"), Some(4));
        assert_eq!(v.index_of("[PAUSE]"), Some(8));
        assert_eq!(v.len(), 9);
    }

    #[test]
    fn test_indices_contiguous_and_unique() {
        let v = Vocabulary::build(["z", "y", "x", "y"]);
        let mut seen: Vec<usize> = v.iter().map(|(t, i)| {
            assert_eq!(v.index_of(t), Some(i));
            i
        }).collect();
        seen.sort();
        assert_eq!(seen, (0..v.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_specials_occupy_top_indices_in_order() {
        let v = Vocabulary::build(["b", "a"]);
        let n = v.len();
        for (offset, t) in SpecialToken::ALL.iter().enumerate() {
            let expected = n - SpecialToken::ALL.len() + offset;
            assert_eq!(v.index_of(t.as_str()), Some(expected));
            assert_eq!(v.special(*t), expected);
        }
    }

    #[test]
    fn test_corpus_word_equal_to_special_does_not_collide() {
        let v = Vocabulary::build(["[PAD]", "hello", "[UNK]"]);
        assert_eq!(v.len(), 1 + SpecialToken::ALL.len());
        assert_eq!(v.index_of("hello"), Some(0));
        assert_eq!(v.index_of("[PAD]"), Some(1));
        assert_eq!(v.token(4), Some("[UNK]"));
    }

    #[test]
    fn test_unknown_word_encodes_as_unk() {
        let v = Vocabulary::build(["hello"]);
        assert_eq!(v.encode("nope"), v.special(SpecialToken::Unk));
    }

    #[test]
    fn test_empty_corpus_still_has_specials() {
        let v = Vocabulary::build(std::iter::empty());
        assert_eq!(v.len(), SpecialToken::ALL.len());
        assert_eq!(v.special(SpecialToken::Pad), 0);
    }
}
