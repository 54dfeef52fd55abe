use super::{create_output, read_motifs};
use crate::cli::SweepArgs;
use crate::config::{PartialAsmcConfig, RadiusOverrides};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use asmc::engine::progress::ProgressReporter;
use asmc::workflows::{cluster, report};
use std::io::{self, Write};
use tracing::info;

pub fn run(args: SweepArgs, progress: &CliProgressHandler) -> Result<()> {
    let radius = RadiusOverrides {
        epsilon: None,
        start: args.start,
        stop: args.stop,
        step: args.step,
    };
    let (config, table) = PartialAsmcConfig::load(args.motif.config.as_deref())?
        .merge_clustering(&args.motif, &radius)?;
    let motifs = read_motifs(&args.motif.motifs)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let result = cluster::run_sweep(&motifs, &table, &config, &reporter)?;

    match &args.output {
        Some(path) => {
            let mut out = create_output(path)?;
            report::write_sweep(&mut out, &result.points)?;
            out.flush()?;
            info!(path = %path.display(), "Wrote sweep table");
        }
        None => {
            let mut out = io::stdout().lock();
            report::write_sweep(&mut out, &result.points)?;
            out.flush()?;
        }
    }
    Ok(())
}
