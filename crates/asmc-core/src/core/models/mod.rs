//! # Core Models Module
//!
//! Immutable data holders shared by every stage of the pipeline.
//!
//! - [`residue`] - Residue numbers and residues reduced to a representative coordinate
//! - [`chain`] - Residues of one chain in strictly increasing number order
//! - [`structure`] - A parsed coordinate model, chains in file order
//! - [`builder`] - Incremental construction used by the file readers
//! - [`site`] - The annotated active site of a reference structure
//! - [`sequence`] - Target sequences and extracted active-site motifs

pub mod builder;
pub mod chain;
pub mod residue;
pub mod sequence;
pub mod site;
pub mod structure;
