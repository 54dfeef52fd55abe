use super::create_output;
use crate::cli::ExtractArgs;
use crate::config::PartialAsmcConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use asmc::core::io::{fasta, sites};
use asmc::core::models::site::ActiveSiteDefinition;
use asmc::engine::progress::ProgressReporter;
use asmc::workflows::extract::{self, TargetSource};
use asmc::workflows::report;
use std::fs;
use std::io::Write;
use tracing::{debug, info, warn};

const SUMMARY_STEM: &str = "summary";

pub fn run(args: ExtractArgs, progress: &CliProgressHandler) -> Result<()> {
    // === Phase 1: Configuration ===
    let mut config =
        PartialAsmcConfig::load(args.config.as_deref())?.merge_extraction(&args)?;
    config.reserved_ids.push(SUMMARY_STEM.to_string());
    debug!(?config, "Resolved extraction configuration");

    // === Phase 2: Inputs ===
    let definition = load_definition(&args)?;
    let reference = extract::load_reference(&args.reference, definition)?;
    if let Some(id) = &reference.definition().structure_id {
        if id != &reference.structure().name {
            warn!(
                site_file = %id,
                reference = %reference.structure().name,
                "Active-site file names a different structure than the reference"
            );
        }
    }
    let targets = collect_targets(&args)?;
    info!(targets = targets.len(), "Loaded target list");

    // === Phase 3: Extraction ===
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let result = extract::run(&reference, &targets, &config, &reporter)?;

    // === Phase 4: Reports ===
    fs::create_dir_all(&args.output_dir)?;
    for alignment in result.succeeded() {
        let path = args.output_dir.join(format!("{}.tsv", alignment.target_id));
        let mut out = create_output(&path)?;
        report::write_alignment_report(&mut out, &reference, alignment, &config.correspondence)?;
        out.flush()?;
    }

    let mut summary = create_output(&args.output_dir.join(format!("{SUMMARY_STEM}.tsv")))?;
    report::write_batch_summary(&mut summary, &reference, &result)?;
    summary.flush()?;

    let motifs = result.motifs(&reference.structure().name);
    let mut fasta_out = create_output(&args.output_dir.join("motifs.fasta"))?;
    fasta::write_motifs(&mut fasta_out, motifs.iter().map(|(id, m)| (id.as_str(), m)))?;
    fasta_out.flush()?;

    let failed = result.failed().count();
    println!(
        "Reference motif {}: extracted {} of {} targets ({} failed) into {}",
        result.reference_motif,
        result.succeeded().count(),
        targets.len(),
        failed,
        args.output_dir.display()
    );
    Ok(())
}

fn load_definition(args: &ExtractArgs) -> Result<ActiveSiteDefinition> {
    if let Some(path) = &args.sites {
        return sites::read_sites_from_path(path).map_err(|e| CliError::parsing(path, e));
    }
    let (Some(list), Some(chain)) = (&args.site_list, args.chain) else {
        return Err(CliError::Argument(
            "An active site is required: pass --sites or --site-list with --chain".to_string(),
        ));
    };
    let numbers = sites::parse_site_list(list).map_err(|e| CliError::Argument(e.to_string()))?;
    Ok(ActiveSiteDefinition::new(chain, numbers)?)
}

fn collect_targets(args: &ExtractArgs) -> Result<Vec<TargetSource>> {
    let mut targets: Vec<TargetSource> = args
        .targets
        .iter()
        .map(|path| TargetSource::StructureFile {
            path: path.clone(),
            chain: args.target_chain,
        })
        .collect();
    if let Some(path) = &args.sequences {
        let sequences =
            fasta::read_sequences_from_path(path).map_err(|e| CliError::parsing(path, e))?;
        targets.extend(sequences.into_iter().map(TargetSource::Sequence));
    }
    if targets.is_empty() {
        return Err(CliError::Argument(
            "No targets given: pass --targets and/or --sequences".to_string(),
        ));
    }
    Ok(targets)
}
