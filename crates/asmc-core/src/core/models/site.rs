use super::residue::ResidueNumber;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SiteDefinitionError {
    #[error("Active-site definition for chain {0} lists no residues")]
    NoSites(char),
}

/// The annotated active site of a reference structure: one chain and the
/// residue numbers that make up the site, sorted and free of duplicates.
///
/// Site order is the column order of every motif extracted against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSiteDefinition {
    pub structure_id: Option<String>,
    pub chain_id: char,
    sites: Vec<ResidueNumber>,
}

impl ActiveSiteDefinition {
    pub fn new<I>(chain_id: char, sites: I) -> Result<Self, SiteDefinitionError>
    where
        I: IntoIterator<Item = ResidueNumber>,
    {
        let mut sites: Vec<ResidueNumber> = sites.into_iter().collect();
        sites.sort_unstable();
        sites.dedup();
        if sites.is_empty() {
            return Err(SiteDefinitionError::NoSites(chain_id));
        }
        Ok(Self {
            structure_id: None,
            chain_id,
            sites,
        })
    }

    /// Builds a definition from plain residue numbers without insertion codes.
    pub fn from_numbers<I>(chain_id: char, numbers: I) -> Result<Self, SiteDefinitionError>
    where
        I: IntoIterator<Item = isize>,
    {
        Self::new(chain_id, numbers.into_iter().map(ResidueNumber::new))
    }

    pub fn with_structure_id(mut self, structure_id: &str) -> Self {
        self.structure_id = Some(structure_id.to_string());
        self
    }

    pub fn sites(&self) -> &[ResidueNumber] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// 0-based column of `number` in the site order.
    pub fn position(&self, number: ResidueNumber) -> Option<usize> {
        self.sites.binary_search(&number).ok()
    }
}
