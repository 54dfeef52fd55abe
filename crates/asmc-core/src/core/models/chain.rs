use super::residue::{Residue, ResidueNumber};
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Residue {found} in chain {chain} does not follow residue {previous}")]
    NonIncreasingResidue {
        chain: char,
        previous: ResidueNumber,
        found: ResidueNumber,
    },
}

/// Residues of one chain in strictly increasing residue-number order.
///
/// Numbering gaps are allowed and indicate missing density.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: char,
    residues: Vec<Residue>,
    residue_map: HashMap<ResidueNumber, usize>,
}

impl Chain {
    pub fn new(id: char) -> Self {
        Self {
            id,
            residues: Vec::new(),
            residue_map: HashMap::new(),
        }
    }

    pub(crate) fn push_residue(&mut self, residue: Residue) -> Result<(), ChainError> {
        if let Some(last) = self.residues.last() {
            if residue.number <= last.number {
                return Err(ChainError::NonIncreasingResidue {
                    chain: self.id,
                    previous: last.number,
                    found: residue.number,
                });
            }
        }
        self.residue_map.insert(residue.number, self.residues.len());
        self.residues.push(residue);
        Ok(())
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn residue(&self, number: ResidueNumber) -> Option<&Residue> {
        self.residue_map.get(&number).map(|&idx| &self.residues[idx])
    }

    pub fn residue_index(&self, number: ResidueNumber) -> Option<usize> {
        self.residue_map.get(&number).copied()
    }

    /// One-letter sequence in chain order.
    pub fn sequence(&self) -> String {
        self.residues.iter().map(|r| r.code).collect()
    }

    pub fn representative_coords(&self) -> Vec<Point3<f64>> {
        self.residues.iter().map(|r| r.representative).collect()
    }

    pub(crate) fn map_coordinates<F>(&self, f: &F) -> Self
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        Self {
            id: self.id,
            residues: self.residues.iter().map(|r| r.map_coordinates(f)).collect(),
            residue_map: self.residue_map.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residue(number: isize, name: &str, x: f64) -> Residue {
        let ca = Point3::new(x, 0.0, 0.0);
        Residue::new(ResidueNumber::new(number), name, ca, vec![ca])
    }

    #[test]
    fn push_residue_accepts_gapped_increasing_numbers() {
        let mut chain = Chain::new('A');
        chain.push_residue(residue(1, "ALA", 0.0)).unwrap();
        chain.push_residue(residue(5, "GLY", 3.8)).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.residue(ResidueNumber::new(5)).unwrap().name, "GLY");
        assert_eq!(chain.residue_index(ResidueNumber::new(5)), Some(1));
        assert!(chain.residue(ResidueNumber::new(2)).is_none());
    }

    #[test]
    fn push_residue_rejects_duplicates_and_decreasing_numbers() {
        let mut chain = Chain::new('B');
        chain.push_residue(residue(10, "ALA", 0.0)).unwrap();
        let err = chain.push_residue(residue(10, "SER", 1.0)).unwrap_err();
        assert_eq!(
            err,
            ChainError::NonIncreasingResidue {
                chain: 'B',
                previous: ResidueNumber::new(10),
                found: ResidueNumber::new(10),
            }
        );
        assert!(chain.push_residue(residue(9, "SER", 1.0)).is_err());
    }

    #[test]
    fn sequence_concatenates_one_letter_codes() {
        let mut chain = Chain::new('A');
        chain.push_residue(residue(1, "MET", 0.0)).unwrap();
        chain.push_residue(residue(2, "LYS", 1.0)).unwrap();
        chain.push_residue(residue(3, "UNK", 2.0)).unwrap();
        assert_eq!(chain.sequence(), "MKX");
        assert_eq!(chain.representative_coords().len(), 3);
    }
}
