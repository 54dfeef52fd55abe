pub mod cluster;
pub mod extract;
pub mod sweep;

use crate::error::{CliError, Result};
use asmc::core::io::fasta;
use asmc::core::models::sequence::Motif;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Reads a motif FASTA file as `(id, motif)` items in file order.
fn read_motifs(path: &Path) -> Result<Vec<(String, Motif)>> {
    let records =
        fasta::read_sequences_from_path(path).map_err(|e| CliError::parsing(path, e))?;
    if records.is_empty() {
        return Err(CliError::Argument(format!(
            "No motifs found in '{}'",
            path.display()
        )));
    }
    Ok(records
        .into_iter()
        .map(|r| {
            let motif = Motif::new(r.residues());
            (r.id, motif)
        })
        .collect())
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}
