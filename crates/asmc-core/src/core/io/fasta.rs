use crate::core::models::sequence::{Motif, Sequence};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Record name is not valid UTF-8: {0}")]
    InvalidName(#[from] FromUtf8Error),
    #[error("Record '{0}' contains non-ASCII residues")]
    InvalidSequence(String),
}

/// Reads every record of a (multi-)FASTA stream.
pub fn read_sequences<R: BufRead>(reader: R) -> Result<Vec<Sequence>, FastaError> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);
    let mut sequences = Vec::new();
    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        let residues = std::str::from_utf8(record.sequence().as_ref())
            .map_err(|_| FastaError::InvalidSequence(name.clone()))?;
        sequences.push(Sequence::new(&name, residues));
    }
    Ok(sequences)
}

pub fn read_sequences_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, FastaError> {
    read_sequences(BufReader::new(File::open(path)?))
}

/// Writes motifs as single-line FASTA records named by item id.
pub fn write_motifs<'a, W, I>(writer: W, motifs: I) -> Result<(), FastaError>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a Motif)>,
{
    let mut fa_out = noodles_fasta::io::writer::Builder::default()
        .set_line_base_count(usize::MAX)
        .build_from_writer(writer);
    for (id, motif) in motifs {
        let definition = noodles_fasta::record::Definition::new(id.to_string(), None);
        let sequence = noodles_fasta::record::Sequence::from(motif.as_str().as_bytes().to_vec());
        fa_out.write_record(&noodles_fasta::Record::new(definition, sequence))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_multi_record_fasta() {
        let text = ">seq1 first\nMKV\nLY\n>seq2\nacdef\n";
        let sequences = read_sequences(text.as_bytes()).unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].id, "seq1");
        assert_eq!(sequences[0].residues(), "MKVLY");
        assert_eq!(sequences[1].residues(), "ACDEF");
    }

    #[test]
    fn motifs_are_written_one_line_per_record() {
        let a = Motif::new("HDS");
        let b = Motif::new("H-S");
        let mut out = Vec::new();
        write_motifs(&mut out, [("t1", &a), ("t2", &b)]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">t1\nHDS\n>t2\nHXS\n");
    }
}
