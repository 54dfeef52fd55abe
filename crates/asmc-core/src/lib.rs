//! # ASMC Core Library
//!
//! Active-site extraction and motif clustering for families of homologous
//! proteins: map a reference's annotated active site onto many target
//! structures or sequences, then group the targets by how their active-site
//! residues differ.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`,
//!   `ActiveSiteDefinition`, `Motif`), substitution tables, and readers for
//!   PDB, FASTA, and active-site files.
//!
//! - **[`engine`]: The Algorithms.** Least-squares superposition, global
//!   sequence alignment, nearest-residue correspondence, weighted motif
//!   dissimilarity, and DBSCAN with automatic parameter selection.
//!
//! - **[`workflows`]: The Public API.** Batch extraction over many targets,
//!   clustering runs, and tab-separated reports.

pub mod core;
pub mod engine;
pub mod workflows;
