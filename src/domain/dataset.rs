// ============================================================
// Layer 3 — Dataset Descriptors
// ============================================================
// A dataset descriptor names one supported corpus and maps
// each logical modality to the feature store that holds it:
//
//   mosi  → CMU_MOSI_TimestampedWords.csd, CMU_MOSI_COVAREP.csd, ...
//   mosei → CMU_MOSEI_TimestampedWords.csd, CMU_MOSEI_COVAREP.csd, ...
//
// Modality names are a closed enum. Strings coming from the
// command line are parsed once, at configuration time, so an
// unsupported name fails fast instead of mis-keying a map later.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// The logical modalities of a multimodal sentiment corpus.
/// `Labels` is the sentiment annotation stream, never a model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
    Visual,
    Labels,
}

impl Modality {
    /// The modalities a caller may request as features
    pub const REQUESTABLE: [Modality; 3] = [Modality::Text, Modality::Audio, Modality::Visual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text   => "text",
            Self::Audio  => "audio",
            Self::Visual => "visual",
            Self::Labels => "labels",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = PipelineError;

    /// Parses a requestable modality. `labels` is rejected because
    /// labels are always loaded and never requested as a feature.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text"   => Ok(Self::Text),
            "audio"  => Ok(Self::Audio),
            "visual" => Ok(Self::Visual),
            other    => Err(PipelineError::UnsupportedModality(other.to_string())),
        }
    }
}

/// Supported corpora
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetName {
    Mosi,
    Mosei,
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mosi  => f.write_str("mosi"),
            Self::Mosei => f.write_str("mosei"),
        }
    }
}

impl FromStr for DatasetName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mosi"  => Ok(Self::Mosi),
            "mosei" => Ok(Self::Mosei),
            other   => Err(PipelineError::UnsupportedDataset(other.to_string())),
        }
    }
}

/// Immutable description of one corpus: where each modality lives
/// and which file holds the canonical train/dev/test folds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub name:       DatasetName,
    stores:         &'static [(Modality, &'static str)],
    pub folds_file: &'static str,
}

const MOSI_STORES: &[(Modality, &str)] = &[
    (Modality::Text,   "CMU_MOSI_TimestampedWords"),
    (Modality::Audio,  "CMU_MOSI_COVAREP"),
    (Modality::Visual, "CMU_MOSI_Visual_Facet_41"),
    (Modality::Labels, "CMU_MOSI_Opinion_Labels"),
];

const MOSEI_STORES: &[(Modality, &str)] = &[
    (Modality::Text,   "CMU_MOSEI_TimestampedWords"),
    (Modality::Audio,  "CMU_MOSEI_COVAREP"),
    (Modality::Visual, "CMU_MOSEI_VisualFacet42"),
    (Modality::Labels, "CMU_MOSEI_Labels"),
];

impl DatasetDescriptor {
    /// Select the descriptor for a parsed dataset name
    pub fn select(name: DatasetName) -> Self {
        match name {
            DatasetName::Mosi => Self {
                name,
                stores:     MOSI_STORES,
                folds_file: "CMU_MOSI_StandardFolds.json",
            },
            DatasetName::Mosei => Self {
                name,
                stores:     MOSEI_STORES,
                folds_file: "CMU_MOSEI_StandardFolds.json",
            },
        }
    }

    /// Select by raw name, failing with `UnsupportedDataset`
    pub fn by_name(name: &str) -> Result<Self, PipelineError> {
        Ok(Self::select(name.parse()?))
    }

    /// The feature-store id for a modality, if this corpus has it
    pub fn store_id(&self, modality: Modality) -> Option<&'static str> {
        self.stores
            .iter()
            .find(|(m, _)| *m == modality)
            .map(|(_, id)| *id)
    }

    /// `{store_id}.csd` for a modality
    pub fn store_file(&self, modality: Modality) -> Option<String> {
        self.store_id(modality).map(|id| format!("{id}.csd"))
    }

    pub fn supports(&self, modality: Modality) -> bool {
        self.store_id(modality).is_some()
    }
}
