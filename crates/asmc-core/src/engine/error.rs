use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::pdb::PdbError;
use crate::core::models::residue::ResidueNumber;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Superposition needs at least {required} point pairs, got {found}")]
    InsufficientPoints { found: usize, required: usize },

    #[error("Point sets differ in size: reference has {reference}, mobile has {mobile}")]
    PointCountMismatch { reference: usize, mobile: usize },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Only {matched} of {defined} active sites matched, at least {required} required")]
    TooFewSitesMatched {
        matched: usize,
        defined: usize,
        required: usize,
    },

    #[error("Motif of '{id}' has length {found}, expected {expected}")]
    MotifLengthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("No score for residue pair ({a}, {b}) in table '{table}'")]
    UnknownResidue { a: char, b: char, table: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ConfigError),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid dissimilarity matrix: {0}")]
    InvalidMatrix(String),

    #[error("No motif for item '{0}'")]
    UnknownItem(String),

    #[error("Active site residue {residue} is not present in chain {chain} of the reference")]
    SiteNotInReference { chain: char, residue: ResidueNumber },

    #[error("Chain {chain} not found in structure '{structure}'")]
    ChainNotFound { structure: String, chain: char },

    #[error("Failed to read structure: {0}")]
    StructureInput(#[from] PdbError),
}

/// Conditions that make a result less trustworthy without invalidating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AlignmentWarning {
    TooFewSitesForRefinement { matched: usize },
    HighRmsd { rmsd: f64, threshold: f64 },
    LowAlignmentScore { score: f64, threshold: f64 },
    LowIdentity { percent: f64, threshold: f64 },
    UnmatchedSites { count: usize },
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSitesForRefinement { matched } => write!(
                f,
                "local refinement skipped, only {matched} sites matched"
            ),
            Self::HighRmsd { rmsd, threshold } => {
                write!(f, "RMSD {rmsd:.2} exceeds {threshold:.2}")
            }
            Self::LowAlignmentScore { score, threshold } => {
                write!(f, "alignment score {score:.1} below {threshold:.1}")
            }
            Self::LowIdentity { percent, threshold } => {
                write!(f, "sequence identity {percent:.1}% below {threshold:.1}%")
            }
            Self::UnmatchedSites { count } => write!(f, "{count} sites unmatched"),
        }
    }
}
