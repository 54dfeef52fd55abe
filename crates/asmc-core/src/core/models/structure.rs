use super::chain::Chain;
use nalgebra::Point3;
use std::collections::HashMap;

/// A parsed coordinate model: chains in file order, each holding residues
/// with a representative alpha-carbon coordinate.
///
/// Structures are read-only once built. Superposition produces a new,
/// transformed copy instead of moving atoms in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    /// Identifier of the model, usually the file stem.
    pub name: String,
    chains: Vec<Chain>,
    chain_map: HashMap<char, usize>,
}

impl Structure {
    pub(crate) fn from_chains(name: &str, chains: Vec<Chain>) -> Self {
        let chain_map = chains
            .iter()
            .enumerate()
            .map(|(idx, chain)| (chain.id, idx))
            .collect();
        Self {
            name: name.to_string(),
            chains,
            chain_map,
        }
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Looks up a chain by its single-character identifier.
    pub fn chain(&self, id: char) -> Option<&Chain> {
        self.chain_map.get(&id).map(|&idx| &self.chains[idx])
    }

    /// The first chain in file order, used when a target chain is not named.
    pub fn first_chain(&self) -> Option<&Chain> {
        self.chains.first()
    }

    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(Chain::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.residue_count() == 0
    }

    /// Returns a copy with every coordinate passed through `f`.
    pub fn map_coordinates<F>(&self, f: F) -> Self
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        Self {
            name: self.name.clone(),
            chains: self.chains.iter().map(|c| c.map_coordinates(&f)).collect(),
            chain_map: self.chain_map.clone(),
        }
    }
}
