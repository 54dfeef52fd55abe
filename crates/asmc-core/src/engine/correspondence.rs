use super::config::{CorrespondenceConfig, PairingMode, SequenceAlignmentConfig};
use super::error::{AlignmentWarning, EngineError};
use super::sequence_alignment::{PairwiseAlignment, global_align};
use super::superposition::{MIN_SUPERPOSITION_POINTS, RigidTransform, Superposition, superimpose};
use crate::core::models::chain::Chain;
use crate::core::models::residue::ResidueNumber;
use crate::core::models::sequence::{Motif, Sequence};
use crate::core::models::site::ActiveSiteDefinition;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::to_array;
use crate::core::utils::identifiers::UNKNOWN_RESIDUE_CODE;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// A reference structure together with its validated active site.
#[derive(Debug, Clone)]
pub struct ActiveSiteReference {
    structure: Structure,
    definition: ActiveSiteDefinition,
    chain_idx: usize,
    site_indices: Vec<usize>,
}

impl ActiveSiteReference {
    /// Checks that the site chain and every site residue exist in `structure`.
    pub fn new(structure: Structure, definition: ActiveSiteDefinition) -> Result<Self, EngineError> {
        let chain_idx = structure
            .chains()
            .iter()
            .position(|c| c.id == definition.chain_id)
            .ok_or_else(|| EngineError::ChainNotFound {
                structure: structure.name.clone(),
                chain: definition.chain_id,
            })?;
        let chain = &structure.chains()[chain_idx];
        let site_indices = definition
            .sites()
            .iter()
            .map(|&number| {
                chain
                    .residue_index(number)
                    .ok_or(EngineError::SiteNotInReference {
                        chain: chain.id,
                        residue: number,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            structure,
            definition,
            chain_idx,
            site_indices,
        })
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn definition(&self) -> &ActiveSiteDefinition {
        &self.definition
    }

    pub fn chain(&self) -> &Chain {
        &self.structure.chains()[self.chain_idx]
    }

    /// The reference's own residues at the site positions.
    pub fn motif(&self) -> Motif {
        let residues = self.chain().residues();
        self.site_indices.iter().map(|&i| residues[i].code).collect()
    }

    fn site_points(&self) -> Vec<Point3<f64>> {
        let residues = self.chain().residues();
        self.site_indices
            .iter()
            .map(|&i| residues[i].representative)
            .collect()
    }
}

/// What an active site is extracted from.
#[derive(Debug, Clone)]
pub enum Target {
    /// A coordinate model; the first chain is used when `chain` is `None`.
    Structure {
        structure: Structure,
        chain: Option<char>,
    },
    Sequence(Sequence),
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Target::Structure { structure, .. } => &structure.name,
            Target::Sequence(sequence) => &sequence.id,
        }
    }
}

/// The target residue found for one reference site residue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correspondence {
    pub reference_residue: ResidueNumber,
    pub reference_code: char,
    /// Matched residue; for sequence targets this is the 1-based position.
    pub target_residue: Option<ResidueNumber>,
    pub target_name: Option<String>,
    /// One-letter code, `X` when unmatched.
    pub target_code: char,
    /// Distance between representative atoms after superposition.
    pub distance: Option<f64>,
}

impl Correspondence {
    pub fn is_matched(&self) -> bool {
        self.target_residue.is_some()
    }
}

/// One superposition followed by a nearest-residue search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralPass {
    pub rmsd: f64,
    pub n_points: usize,
    pub correspondences: Vec<Correspondence>,
}

impl StructuralPass {
    pub fn sites_matched(&self) -> usize {
        self.correspondences.iter().filter(|c| c.is_matched()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SequenceDiagnostics {
    pub score: f64,
    pub percent_identity: f64,
}

/// Everything learned about one target's active site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSiteAlignment {
    pub target_id: String,
    pub target_chain: Option<char>,
    pub sites_defined: usize,
    /// Whole-structure fit; absent for sequence targets.
    pub global: Option<StructuralPass>,
    /// Active-site-only refit, when it ran.
    pub local: Option<StructuralPass>,
    pub sequence: Option<SequenceDiagnostics>,
    correspondences: Vec<Correspondence>,
    pub warnings: Vec<AlignmentWarning>,
}

impl ActiveSiteAlignment {
    /// Final correspondences, one per reference site in site order.
    pub fn correspondences(&self) -> &[Correspondence] {
        &self.correspondences
    }

    pub fn sites_matched(&self) -> usize {
        self.correspondences.iter().filter(|c| c.is_matched()).count()
    }

    pub fn motif(&self) -> Motif {
        self.correspondences.iter().map(|c| c.target_code).collect()
    }

    pub fn global_rmsd(&self) -> Option<f64> {
        self.global.as_ref().map(|p| p.rmsd)
    }

    pub fn local_rmsd(&self) -> Option<f64> {
        self.local.as_ref().map(|p| p.rmsd)
    }

    /// Global minus local RMSD.
    pub fn rmsd_improvement(&self) -> Option<f64> {
        Some(self.global_rmsd()? - self.local_rmsd()?)
    }
}

/// Maps a reference active site onto targets.
pub struct CorrespondenceFinder<'a> {
    reference: &'a ActiveSiteReference,
    config: &'a CorrespondenceConfig,
    sequence_config: &'a SequenceAlignmentConfig,
}

impl<'a> CorrespondenceFinder<'a> {
    pub fn new(
        reference: &'a ActiveSiteReference,
        config: &'a CorrespondenceConfig,
        sequence_config: &'a SequenceAlignmentConfig,
    ) -> Self {
        Self {
            reference,
            config,
            sequence_config,
        }
    }

    /// Extracts the active site of `target` by superposition or, for
    /// sequence targets, by global sequence alignment.
    #[instrument(skip_all, name = "correspondence", fields(target = target.id()))]
    pub fn find(&self, target: &Target) -> Result<ActiveSiteAlignment, EngineError> {
        let alignment = match target {
            Target::Structure { structure, chain } => self.from_structure(structure, *chain)?,
            Target::Sequence(sequence) => self.from_sequence(sequence)?,
        };

        let matched = alignment.sites_matched();
        if matched < self.config.min_sites_matched {
            return Err(EngineError::TooFewSitesMatched {
                matched,
                defined: alignment.sites_defined,
                required: self.config.min_sites_matched,
            });
        }
        for w in &alignment.warnings {
            warn!(target = %alignment.target_id, "{w}");
        }
        Ok(alignment)
    }

    fn from_structure(
        &self,
        structure: &Structure,
        chain: Option<char>,
    ) -> Result<ActiveSiteAlignment, EngineError> {
        let target_chain = match chain {
            Some(id) => structure.chain(id).ok_or_else(|| EngineError::ChainNotFound {
                structure: structure.name.clone(),
                chain: id,
            })?,
            None => structure.first_chain().ok_or_else(|| {
                EngineError::EmptyInput(format!("structure '{}' has no chains", structure.name))
            })?,
        };
        if chain.is_none() {
            debug!(chain = %target_chain.id, "Using first chain of target");
        }

        let (pairs, sequence) = self.global_pairs(target_chain)?;
        let (ref_points, target_points): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let global_fit = superimpose(&ref_points, &target_points)?;
        let global = self.nearest_pass(target_chain, &global_fit);
        debug!(
            rmsd = global_fit.rmsd,
            pairs = global_fit.n_points,
            matched = global.sites_matched(),
            "Global superposition"
        );

        let mut warnings = Vec::new();
        let local = if self.config.refine {
            self.refine(target_chain, &global, &mut warnings)?
        } else {
            None
        };

        let correspondences = local
            .as_ref()
            .unwrap_or(&global)
            .correspondences
            .clone();
        if let Some(threshold) = self.config.rmsd_warning_threshold {
            if global.rmsd > threshold {
                warnings.push(AlignmentWarning::HighRmsd {
                    rmsd: global.rmsd,
                    threshold,
                });
            }
        }
        push_unmatched_warning(&correspondences, &mut warnings);
        if let Some(diag) = &sequence {
            self.push_sequence_warnings(diag, &mut warnings);
        }

        Ok(ActiveSiteAlignment {
            target_id: structure.name.clone(),
            target_chain: Some(target_chain.id),
            sites_defined: self.reference.definition.len(),
            global: Some(global),
            local,
            sequence,
            correspondences,
            warnings,
        })
    }

    /// Reference/target representative-atom pairs for the whole-structure fit.
    fn global_pairs(
        &self,
        target_chain: &Chain,
    ) -> Result<(Vec<(Point3<f64>, Point3<f64>)>, Option<SequenceDiagnostics>), EngineError> {
        let reference_chain = self.reference.chain();
        let ref_residues = reference_chain.residues();
        let target_residues = target_chain.residues();
        let pairs = match self.config.pairing {
            PairingMode::ChainOrder => ref_residues
                .iter()
                .zip(target_residues)
                .map(|(r, t)| (r.representative, t.representative))
                .collect(),
            PairingMode::ResidueNumber => ref_residues
                .iter()
                .filter_map(|r| {
                    target_chain
                        .residue(r.number)
                        .map(|t| (r.representative, t.representative))
                })
                .collect(),
            PairingMode::SequenceAlignment => {
                let aln = global_align(
                    &reference_chain.sequence(),
                    &target_chain.sequence(),
                    self.sequence_config,
                )?;
                let pairs = aln
                    .aligned_pairs()
                    .map(|(i, j)| (ref_residues[i].representative, target_residues[j].representative))
                    .collect();
                return Ok((pairs, Some(diagnostics(&aln))));
            }
        };
        Ok((pairs, None))
    }

    /// Refits on the site residues matched by the first pass and searches again.
    fn refine(
        &self,
        target_chain: &Chain,
        first: &StructuralPass,
        warnings: &mut Vec<AlignmentWarning>,
    ) -> Result<Option<StructuralPass>, EngineError> {
        let (ref_points, target_points): (Vec<_>, Vec<_>) = self
            .reference
            .site_points()
            .into_iter()
            .zip(&first.correspondences)
            .filter_map(|(p, c)| {
                let number = c.target_residue?;
                target_chain.residue(number).map(|t| (p, t.representative))
            })
            .unzip();

        if ref_points.len() < MIN_SUPERPOSITION_POINTS {
            warnings.push(AlignmentWarning::TooFewSitesForRefinement {
                matched: ref_points.len(),
            });
            return Ok(None);
        }
        let local_fit = superimpose(&ref_points, &target_points)?;
        let local = self.nearest_pass(target_chain, &local_fit);
        debug!(
            rmsd = local_fit.rmsd,
            improvement = first.rmsd - local_fit.rmsd,
            matched = local.sites_matched(),
            "Active-site refinement"
        );
        Ok(Some(local))
    }

    /// Matches every reference site residue to its nearest transformed target
    /// residue within the cutoff. Each site is matched independently; ties go
    /// to the smaller residue number.
    fn nearest_pass(&self, target_chain: &Chain, fit: &Superposition) -> StructuralPass {
        let correspondences = nearest_residues(
            self.reference,
            target_chain,
            &fit.transform,
            self.config.distance_cutoff,
        );
        StructuralPass {
            rmsd: fit.rmsd,
            n_points: fit.n_points,
            correspondences,
        }
    }

    fn from_sequence(&self, sequence: &Sequence) -> Result<ActiveSiteAlignment, EngineError> {
        if sequence.is_empty() {
            return Err(EngineError::EmptyInput(format!(
                "sequence '{}' is empty",
                sequence.id
            )));
        }
        let reference_chain = self.reference.chain();
        let ref_residues = reference_chain.residues();
        let aln = global_align(&reference_chain.sequence(), sequence.residues(), self.sequence_config)?;

        let target_codes: Vec<char> = sequence.residues().chars().collect();
        let mut target_for_ref = vec![None; ref_residues.len()];
        for &(i, j) in &aln.columns {
            if let Some(i) = i {
                target_for_ref[i] = j;
            }
        }

        let correspondences: Vec<Correspondence> = self
            .reference
            .site_indices
            .iter()
            .map(|&i| {
                let r = &ref_residues[i];
                let j = target_for_ref[i];
                Correspondence {
                    reference_residue: r.number,
                    reference_code: r.code,
                    target_residue: j.map(|j| ResidueNumber::new(j as isize + 1)),
                    target_name: None,
                    target_code: j.map(|j| target_codes[j]).unwrap_or(UNKNOWN_RESIDUE_CODE),
                    distance: None,
                }
            })
            .collect();

        let diag = diagnostics(&aln);
        let mut warnings = Vec::new();
        push_unmatched_warning(&correspondences, &mut warnings);
        self.push_sequence_warnings(&diag, &mut warnings);

        Ok(ActiveSiteAlignment {
            target_id: sequence.id.clone(),
            target_chain: None,
            sites_defined: self.reference.definition.len(),
            global: None,
            local: None,
            sequence: Some(diag),
            correspondences,
            warnings,
        })
    }

    fn push_sequence_warnings(&self, diag: &SequenceDiagnostics, warnings: &mut Vec<AlignmentWarning>) {
        if let Some(threshold) = self.sequence_config.min_score_warning {
            if diag.score < threshold {
                warnings.push(AlignmentWarning::LowAlignmentScore {
                    score: diag.score,
                    threshold,
                });
            }
        }
        if let Some(threshold) = self.sequence_config.min_identity_warning {
            if diag.percent_identity < threshold {
                warnings.push(AlignmentWarning::LowIdentity {
                    percent: diag.percent_identity,
                    threshold,
                });
            }
        }
    }
}

fn diagnostics(aln: &PairwiseAlignment) -> SequenceDiagnostics {
    SequenceDiagnostics {
        score: aln.score,
        percent_identity: aln.percent_identity(),
    }
}

fn push_unmatched_warning(correspondences: &[Correspondence], warnings: &mut Vec<AlignmentWarning>) {
    let count = correspondences.iter().filter(|c| !c.is_matched()).count();
    if count > 0 {
        warnings.push(AlignmentWarning::UnmatchedSites { count });
    }
}

fn nearest_residues(
    reference: &ActiveSiteReference,
    target_chain: &Chain,
    transform: &RigidTransform,
    cutoff: f64,
) -> Vec<Correspondence> {
    let target_residues = target_chain.residues();
    let moved: Vec<[f64; 3]> = target_residues
        .iter()
        .map(|r| to_array(&transform.apply(&r.representative)))
        .collect();
    let kdtree: KdTree<f64, 3> = (&moved).into();
    let radius_sq = cutoff * cutoff;

    let ref_residues = reference.chain().residues();
    reference
        .site_indices
        .iter()
        .map(|&i| {
            let r = &ref_residues[i];
            let nearest = kdtree
                .within_unsorted::<SquaredEuclidean>(&to_array(&r.representative), radius_sq)
                .into_iter()
                .filter(|n| n.distance <= radius_sq)
                .min_by(|a, b| a.distance.total_cmp(&b.distance).then(a.item.cmp(&b.item)));
            match nearest {
                Some(n) => {
                    let t = &target_residues[n.item as usize];
                    Correspondence {
                        reference_residue: r.number,
                        reference_code: r.code,
                        target_residue: Some(t.number),
                        target_name: Some(t.name.clone()),
                        target_code: t.code,
                        distance: Some(n.distance.sqrt()),
                    }
                }
                None => Correspondence {
                    reference_residue: r.number,
                    reference_code: r.code,
                    target_residue: None,
                    target_name: None,
                    target_code: UNKNOWN_RESIDUE_CODE,
                    distance: None,
                },
            }
        })
        .collect()
}
