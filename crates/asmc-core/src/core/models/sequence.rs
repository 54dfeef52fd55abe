use crate::core::utils::identifiers::{UNKNOWN_RESIDUE_CODE, is_gap_or_unknown};
use serde::Serialize;
use std::fmt;

/// An identified protein sequence in one-letter codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub id: String,
    residues: String,
}

impl Sequence {
    /// Whitespace is dropped, letters are upper-cased and non-ASCII
    /// characters become `X`.
    pub fn new(id: &str, residues: &str) -> Self {
        let residues = residues
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| {
                if c.is_ascii() {
                    c.to_ascii_uppercase()
                } else {
                    UNKNOWN_RESIDUE_CODE
                }
            })
            .collect();
        Self {
            id: id.to_string(),
            residues,
        }
    }

    pub fn residues(&self) -> &str {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// The residue letters found at the reference's active-site positions, in
/// site order. Gap and unknown placeholders are stored as `X`, as are
/// non-ASCII characters, so `len` counts residues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Motif(String);

impl Motif {
    pub fn new(codes: &str) -> Self {
        codes.chars().collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }

    pub fn gap_count(&self) -> usize {
        self.0.chars().filter(|&c| c == UNKNOWN_RESIDUE_CODE).count()
    }
}

impl FromIterator<char> for Motif {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        Motif(
            iter.into_iter()
                .map(|c| {
                    if is_gap_or_unknown(c) || !c.is_ascii() {
                        UNKNOWN_RESIDUE_CODE
                    } else {
                        c.to_ascii_uppercase()
                    }
                })
                .collect(),
        )
    }
}

impl fmt::Display for Motif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_strips_whitespace_and_uppercases() {
        let seq = Sequence::new("q1", "mk v\nly");
        assert_eq!(seq.residues(), "MKVLY");
        assert_eq!(seq.len(), 5);
    }

    #[test]
    fn motif_normalises_gap_placeholders() {
        let motif = Motif::new("hd-.xS");
        assert_eq!(motif.as_str(), "HDXXXS");
        assert_eq!(motif.gap_count(), 3);
        assert_eq!(motif.to_string(), "HDXXXS");
    }

    #[test]
    fn non_ascii_letters_count_as_one_unknown_residue() {
        let motif = Motif::new("HÉS");
        assert_eq!(motif.as_str(), "HXS");
        assert_eq!(motif.len(), 3);
        assert_eq!(motif.gap_count(), 1);

        let seq = Sequence::new("q2", "mkÅv");
        assert_eq!(seq.residues(), "MKXV");
        assert_eq!(seq.len(), seq.residues().chars().count());
    }
}
