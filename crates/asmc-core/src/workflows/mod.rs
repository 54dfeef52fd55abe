//! # Workflows Module
//!
//! End-to-end entry points that tie the `core` and `engine` layers together.
//!
//! - **Extraction** ([`extract`]) - Active-site motifs for a batch of structures and sequences,
//!   one outcome per target so a bad input never stops the batch
//! - **Clustering** ([`cluster`]) - Dissimilarity matrix, density clustering, and ε sweeps over motifs
//! - **Reports** ([`report`]) - Tab-separated per-target, summary, matrix, and cluster tables
//!
//! Both workflows report progress through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter).

pub mod cluster;
pub mod extract;
pub mod report;
