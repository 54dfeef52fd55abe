//! # Engine Module
//!
//! The algorithms of the pipeline: fitting structures onto a reference,
//! deciding which target residues correspond to the reference active site,
//! and grouping the extracted motifs.
//!
//! ## Architecture
//!
//! - **Superposition** ([`superposition`]) - Least-squares rigid fit of paired point sets
//! - **Sequence Alignment** ([`sequence_alignment`]) - Global pairwise alignment with a linear gap penalty
//! - **Correspondence** ([`correspondence`]) - Active-site extraction from structures or sequences
//! - **Dissimilarity** ([`dissimilarity`]) - Weighted, normalized all-pairs motif distances
//! - **Clustering** ([`clustering`]) - DBSCAN over a dissimilarity matrix with automatic parameters
//! - **Configuration** ([`config`]) - Validated parameter sets with documented defaults
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine errors and result warnings
//!
//! Every entry point takes its configuration explicitly and leaves its inputs
//! untouched, so calls on independent targets can run concurrently.

pub mod clustering;
pub mod config;
pub mod correspondence;
pub mod dissimilarity;
pub mod error;
pub mod progress;
pub mod sequence_alignment;
pub mod superposition;
