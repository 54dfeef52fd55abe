use super::{create_output, read_motifs};
use crate::cli::ClusterArgs;
use crate::config::{PartialAsmcConfig, RadiusOverrides};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use asmc::engine::progress::ProgressReporter;
use asmc::workflows::{cluster, report};
use std::fs;
use std::io::Write;
use tracing::{debug, info};

pub fn run(args: ClusterArgs, progress: &CliProgressHandler) -> Result<()> {
    let radius = RadiusOverrides {
        epsilon: args.epsilon,
        ..RadiusOverrides::default()
    };
    let (config, table) = PartialAsmcConfig::load(args.motif.config.as_deref())?
        .merge_clustering(&args.motif, &radius)?;
    debug!(?config, table = table.name(), "Resolved clustering configuration");

    let motifs = read_motifs(&args.motif.motifs)?;
    info!(items = motifs.len(), "Loaded motifs");

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let result = cluster::run(&motifs, &table, &config, &reporter)?;

    fs::create_dir_all(&args.output_dir)?;
    let mut out = create_output(&args.output_dir.join("matrix.tsv"))?;
    report::write_matrix(&mut out, &result.matrix)?;
    out.flush()?;

    let mut out = create_output(&args.output_dir.join("clusters.tsv"))?;
    report::write_clusters(&mut out, &result.assignment, &motifs)?;
    out.flush()?;

    let mut out = create_output(&args.output_dir.join("cluster_summary.tsv"))?;
    report::write_cluster_summaries(&mut out, &result.summaries)?;
    out.flush()?;

    let assignment = &result.assignment;
    println!(
        "{} clusters and {} noise items from {} motifs (epsilon {:.3}, min points {})",
        assignment.n_clusters(),
        assignment.noise_count(),
        motifs.len(),
        assignment.epsilon,
        assignment.min_points
    );
    Ok(())
}
