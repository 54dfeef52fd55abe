//! Substitution scoring tables keyed by residue-letter pairs.
//!
//! [`SubstitutionMatrix::blosum62`] is built in; other tables are read from
//! the NCBI text layout with [`SubstitutionMatrix::from_ncbi_str`].

mod blosum62;
pub mod matrix;

pub use matrix::{ScoreKind, ScoringTableError, ScoringTableParseErrorKind, SubstitutionMatrix};
