//! Readers and writers for the files that enter and leave the pipeline.
//!
//! Coordinate files are read through the [`traits::StructureFile`] trait;
//! site definitions and FASTA have free functions.

pub mod fasta;
pub mod pdb;
pub mod sites;
pub mod traits;
