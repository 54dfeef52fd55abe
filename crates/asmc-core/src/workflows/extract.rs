use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::StructureFile;
use crate::core::models::sequence::{Motif, Sequence};
use crate::core::models::site::ActiveSiteDefinition;
use crate::engine::config::{CorrespondenceConfig, SequenceAlignmentConfig};
use crate::engine::correspondence::{
    ActiveSiteAlignment, ActiveSiteReference, CorrespondenceFinder, Target,
};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Where a target's residues come from.
#[derive(Debug, Clone)]
pub enum TargetSource {
    /// A PDB file, read when its turn comes.
    StructureFile { path: PathBuf, chain: Option<char> },
    Sequence(Sequence),
}

impl TargetSource {
    /// File stem for structure files, record name for sequences.
    pub fn id(&self) -> String {
        match self {
            TargetSource::StructureFile { path, .. } => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            TargetSource::Sequence(sequence) => sequence.id.clone(),
        }
    }

    fn load(&self) -> Result<Target, EngineError> {
        match self {
            TargetSource::StructureFile { path, chain } => Ok(Target::Structure {
                structure: PdbFile::read_from_path(path)?,
                chain: *chain,
            }),
            TargetSource::Sequence(sequence) => Ok(Target::Sequence(sequence.clone())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionConfig {
    pub correspondence: CorrespondenceConfig,
    pub sequence: SequenceAlignmentConfig,
    /// Ids no target may take besides the reference's own, such as the
    /// names of batch-level output files.
    pub reserved_ids: Vec<String>,
}

/// One target's id with its alignment or the reason it failed.
pub type TargetOutcome = (String, Result<ActiveSiteAlignment, EngineError>);

#[derive(Debug)]
pub struct ExtractionResult {
    pub reference_motif: Motif,
    /// In input order.
    pub outcomes: Vec<TargetOutcome>,
}

impl ExtractionResult {
    pub fn succeeded(&self) -> impl Iterator<Item = &ActiveSiteAlignment> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &EngineError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id.as_str(), e)))
    }

    /// Reference motif first, then every extracted motif in input order.
    pub fn motifs(&self, reference_id: &str) -> Vec<(String, Motif)> {
        std::iter::once((reference_id.to_string(), self.reference_motif.clone()))
            .chain(self.succeeded().map(|a| (a.target_id.clone(), a.motif())))
            .collect()
    }
}

/// One distinct id per target, in input order.
///
/// A target whose id is reserved or already taken by an earlier target gets
/// the first free `_2`, `_3`, ... suffix.
pub fn assign_target_ids(targets: &[TargetSource], reserved: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|id| id.to_string()).collect();
    targets
        .iter()
        .map(|source| {
            let base = source.id();
            let id = if taken.contains(&base) {
                let renamed = (2..)
                    .map(|n| format!("{base}_{n}"))
                    .find(|candidate| !taken.contains(candidate))
                    .unwrap_or_else(|| base.clone());
                warn!(target = %base, renamed = %renamed, "Duplicate target id renamed");
                renamed
            } else {
                base
            };
            taken.insert(id.clone());
            id
        })
        .collect()
}

/// Reads the reference PDB file and checks the site definition against it.
pub fn load_reference<P: AsRef<Path>>(
    path: P,
    definition: ActiveSiteDefinition,
) -> Result<ActiveSiteReference, EngineError> {
    let structure = PdbFile::read_from_path(path)?;
    info!(
        reference = %structure.name,
        chains = structure.chains().len(),
        residues = structure.residue_count(),
        "Loaded reference structure"
    );
    ActiveSiteReference::new(structure, definition)
}

/// Extracts the reference active site from every target.
///
/// A failing target is recorded in its outcome and does not stop the batch.
#[instrument(skip_all, name = "extraction_workflow", fields(targets = targets.len()))]
pub fn run(
    reference: &ActiveSiteReference,
    targets: &[TargetSource],
    config: &ExtractionConfig,
    reporter: &ProgressReporter,
) -> Result<ExtractionResult, EngineError> {
    config.sequence.validate()?;
    let finder = CorrespondenceFinder::new(reference, &config.correspondence, &config.sequence);
    let reference_motif = reference.motif();
    info!(
        sites = reference.definition().len(),
        motif = %reference_motif,
        "Extracting active sites"
    );

    let mut reserved: Vec<&str> = vec![reference.structure().name.as_str()];
    reserved.extend(config.reserved_ids.iter().map(String::as_str));
    let ids = assign_target_ids(targets, &reserved);

    reporter.report(Progress::PhaseStart {
        name: "Extracting Active Sites",
    });
    reporter.report(Progress::TaskStart {
        total_steps: targets.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = targets.iter().zip(ids.iter());

    #[cfg(feature = "parallel")]
    let iterator = targets.par_iter().zip(ids.par_iter());

    let outcomes: Vec<TargetOutcome> = iterator
        .map(|(source, id)| {
            let id = id.clone();
            let result = source
                .load()
                .and_then(|target| finder.find(&target))
                .map(|mut alignment| {
                    alignment.target_id = id.clone();
                    alignment
                });
            match &result {
                Ok(alignment) => debug!(
                    target = %id,
                    matched = alignment.sites_matched(),
                    motif = %alignment.motif(),
                    "Target done"
                ),
                Err(e) => {
                    warn!(target = %id, error = %e, "Target failed");
                    reporter.report(Progress::ItemFailed {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            reporter.report(Progress::TaskIncrement);
            (id, result)
        })
        .collect();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let result = ExtractionResult {
        reference_motif,
        outcomes,
    };
    info!(
        succeeded = result.succeeded().count(),
        failed = result.failed().count(),
        "Extraction finished"
    );
    Ok(result)
}
