//! # Core Module
//!
//! Stateless building blocks shared by the engine and workflows.
//!
//! - **Data model** ([`models`]) - Structures, chains, residues, active-site definitions, sequences and motifs
//! - **File I/O** ([`io`]) - PDB, site-definition and FASTA adapters
//! - **Scoring tables** ([`scoring`]) - Substitution matrices, including built-in BLOSUM62
//! - **Utilities** ([`utils`]) - Geometry helpers and residue-code lookup tables

pub mod io;
pub mod models;
pub mod scoring;
pub mod utils;
