use super::chain::{Chain, ChainError};
use super::residue::{Residue, ResidueNumber};
use super::structure::Structure;
use crate::core::utils::identifiers::REPRESENTATIVE_ATOM_NAME;
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("A chain must be started before residue {0}")]
    NoCurrentChain(ResidueNumber),
    #[error("Atom '{0}' was added before any residue was started")]
    NoCurrentResidue(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug)]
struct PendingResidue {
    number: ResidueNumber,
    name: String,
    representative: Option<Point3<f64>>,
    atoms: Vec<Point3<f64>>,
}

/// Incremental constructor used by coordinate-file readers.
///
/// Atoms are streamed in file order. A residue is committed to its chain when
/// the next residue or chain starts, and only if it carried an alpha-carbon.
#[derive(Debug)]
pub struct StructureBuilder {
    name: String,
    chains: Vec<Chain>,
    chain_id_map: HashMap<char, usize>,
    current_chain_idx: Option<usize>,
    pending: Option<PendingResidue>,
    skipped_residues: usize,
}

impl StructureBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chains: Vec::new(),
            chain_id_map: HashMap::new(),
            current_chain_idx: None,
            pending: None,
            skipped_residues: 0,
        }
    }

    pub fn start_chain(&mut self, id: char) -> Result<&mut Self, BuilderError> {
        self.commit_pending()?;
        let idx = *self.chain_id_map.entry(id).or_insert_with(|| {
            self.chains.push(Chain::new(id));
            self.chains.len() - 1
        });
        self.current_chain_idx = Some(idx);
        Ok(self)
    }

    pub fn start_residue(
        &mut self,
        number: ResidueNumber,
        name: &str,
    ) -> Result<&mut Self, BuilderError> {
        if self.current_chain_idx.is_none() {
            return Err(BuilderError::NoCurrentChain(number));
        }
        self.commit_pending()?;
        self.pending = Some(PendingResidue {
            number,
            name: name.to_string(),
            representative: None,
            atoms: Vec::new(),
        });
        Ok(self)
    }

    pub fn add_atom(
        &mut self,
        name: &str,
        position: Point3<f64>,
    ) -> Result<&mut Self, BuilderError> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| BuilderError::NoCurrentResidue(name.to_string()))?;
        if name.trim() == REPRESENTATIVE_ATOM_NAME && pending.representative.is_none() {
            pending.representative = Some(position);
        }
        pending.atoms.push(position);
        Ok(self)
    }

    /// Number of residues dropped so far for lacking an alpha-carbon.
    pub fn skipped_residues(&self) -> usize {
        self.skipped_residues
    }

    fn commit_pending(&mut self) -> Result<(), BuilderError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let Some(representative) = pending.representative else {
            self.skipped_residues += 1;
            return Ok(());
        };
        if let Some(idx) = self.current_chain_idx {
            self.chains[idx].push_residue(Residue::new(
                pending.number,
                &pending.name,
                representative,
                pending.atoms,
            ))?;
        }
        Ok(())
    }

    /// Finishes construction. Chains left without residues are dropped.
    pub fn build(mut self) -> Result<Structure, BuilderError> {
        self.commit_pending()?;
        let chains = self.chains.into_iter().filter(|c| !c.is_empty()).collect();
        Ok(Structure::from_chains(&self.name, chains))
    }
}
