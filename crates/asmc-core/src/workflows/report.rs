//! Tab-separated reports for extraction and clustering results.

use super::extract::{ExtractionResult, TargetOutcome};
use crate::core::models::sequence::Motif;
use crate::engine::clustering::{ClusterAssignment, ClusterSummary, SweepPoint};
use crate::engine::config::CorrespondenceConfig;
use crate::engine::correspondence::{ActiveSiteAlignment, ActiveSiteReference};
use crate::engine::dissimilarity::DissimilarityMatrix;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to write table: {0}")]
    Csv(#[from] csv::Error),
}

const MISSING: &str = "-";

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer)
}

fn format_rmsd(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.3}"))
}

#[derive(Serialize)]
struct CorrespondenceRow {
    ref_chain: char,
    ref_number: String,
    ref_residue: char,
    target_number: String,
    target_residue: String,
    distance: String,
}

/// Writes one target's alignment: a `#` header block, a site line readable
/// as an active-site definition, then one row per reference site.
pub fn write_alignment_report<W: Write>(
    mut writer: W,
    reference: &ActiveSiteReference,
    alignment: &ActiveSiteAlignment,
    config: &CorrespondenceConfig,
) -> Result<(), ReportError> {
    let chain = alignment.target_chain.unwrap_or('-');
    writeln!(writer, "# target: {}", alignment.target_id)?;
    writeln!(
        writer,
        "# reference: {} chain {}",
        reference.structure().name,
        reference.definition().chain_id
    )?;
    writeln!(writer, "# target chain: {chain}")?;
    if alignment.global.is_some() {
        writeln!(writer, "# distance cutoff: {:.2}", config.distance_cutoff)?;
        writeln!(writer, "# pairing: {:?}", config.pairing)?;
        writeln!(writer, "# global rmsd: {}", format_rmsd(alignment.global_rmsd()))?;
        writeln!(writer, "# local rmsd: {}", format_rmsd(alignment.local_rmsd()))?;
        writeln!(
            writer,
            "# rmsd improvement: {}",
            format_rmsd(alignment.rmsd_improvement())
        )?;
    }
    if let Some(seq) = &alignment.sequence {
        writeln!(writer, "# alignment score: {:.1}", seq.score)?;
        writeln!(writer, "# sequence identity: {:.1}%", seq.percent_identity)?;
    }
    writeln!(
        writer,
        "# sites matched: {}/{}",
        alignment.sites_matched(),
        alignment.sites_defined
    )?;
    writeln!(writer, "# motif: {}", alignment.motif())?;
    for w in &alignment.warnings {
        writeln!(writer, "# warning: {w}")?;
    }

    let matched = alignment
        .correspondences()
        .iter()
        .filter_map(|c| c.target_residue)
        .join(",");
    writeln!(writer, "{}\t{}\t{}", alignment.target_id, chain, matched)?;

    let mut out = tsv_writer(writer);
    for c in alignment.correspondences() {
        out.serialize(CorrespondenceRow {
            ref_chain: reference.definition().chain_id,
            ref_number: c.reference_residue.to_string(),
            ref_residue: c.reference_code,
            target_number: c
                .target_residue
                .map_or_else(|| MISSING.to_string(), |n| n.to_string()),
            target_residue: match (&c.target_name, c.is_matched()) {
                (Some(name), _) => name.clone(),
                (None, true) => c.target_code.to_string(),
                (None, false) => MISSING.to_string(),
            },
            distance: c
                .distance
                .map_or_else(|| MISSING.to_string(), |d| format!("{d:.3}")),
        })?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct SummaryRow {
    #[serde(rename = "Structure")]
    structure: String,
    #[serde(rename = "Chain")]
    chain: String,
    #[serde(rename = "RMSD(Å)")]
    rmsd: String,
    #[serde(rename = "Local_RMSD(Å)")]
    local_rmsd: String,
    #[serde(rename = "N_Sites")]
    n_sites: usize,
    #[serde(rename = "N_Defined")]
    n_defined: usize,
    #[serde(rename = "Residue_Positions")]
    positions: String,
    #[serde(rename = "Residue_Types")]
    types: String,
    #[serde(rename = "Motif")]
    motif: String,
    #[serde(rename = "Status")]
    status: String,
}

fn summary_row(outcome: &TargetOutcome, n_defined: usize) -> SummaryRow {
    let (id, result) = outcome;
    match result {
        Ok(a) => SummaryRow {
            structure: id.clone(),
            chain: a.target_chain.map_or_else(|| MISSING.to_string(), String::from),
            rmsd: format_rmsd(a.global_rmsd()),
            local_rmsd: format_rmsd(a.local_rmsd()),
            n_sites: a.sites_matched(),
            n_defined,
            positions: a
                .correspondences()
                .iter()
                .map(|c| c.target_residue.map_or_else(|| MISSING.to_string(), |n| n.to_string()))
                .join(","),
            types: a
                .correspondences()
                .iter()
                .map(|c| c.target_name.as_deref().unwrap_or(MISSING))
                .join(","),
            motif: a.motif().to_string(),
            status: if a.warnings.is_empty() {
                "ok".to_string()
            } else {
                format!("ok; {}", a.warnings.iter().join("; "))
            },
        },
        Err(e) => SummaryRow {
            structure: id.clone(),
            chain: MISSING.to_string(),
            rmsd: MISSING.to_string(),
            local_rmsd: MISSING.to_string(),
            n_sites: 0,
            n_defined,
            positions: MISSING.to_string(),
            types: MISSING.to_string(),
            motif: MISSING.to_string(),
            status: format!("failed: {e}"),
        },
    }
}

/// One row for the reference, then one per target in input order.
pub fn write_batch_summary<W: Write>(
    writer: W,
    reference: &ActiveSiteReference,
    result: &ExtractionResult,
) -> Result<(), ReportError> {
    let definition = reference.definition();
    let chain = reference.chain();
    let mut out = tsv_writer(writer);
    out.serialize(SummaryRow {
        structure: reference.structure().name.clone(),
        chain: definition.chain_id.to_string(),
        rmsd: format_rmsd(Some(0.0)),
        local_rmsd: format_rmsd(Some(0.0)),
        n_sites: definition.len(),
        n_defined: definition.len(),
        positions: definition.sites().iter().join(","),
        types: definition
            .sites()
            .iter()
            .map(|&n| chain.residue(n).map_or(MISSING, |r| r.name.as_str()))
            .join(","),
        motif: result.reference_motif.to_string(),
        status: "reference".to_string(),
    })?;
    for outcome in &result.outcomes {
        out.serialize(summary_row(outcome, definition.len()))?;
    }
    out.flush()?;
    Ok(())
}

/// Square matrix with item ids as header row and first column.
pub fn write_matrix<W: Write>(writer: W, matrix: &DissimilarityMatrix) -> Result<(), ReportError> {
    let mut out = tsv_writer(writer);
    out.write_record(std::iter::once("").chain(matrix.ids().iter().map(String::as_str)))?;
    for (i, id) in matrix.ids().iter().enumerate() {
        let values = matrix.row(i).iter().map(|v| format!("{v:.6}"));
        out.write_record(std::iter::once(id.clone()).chain(values))?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ClusterRow<'a> {
    id: &'a str,
    motif: &'a str,
    cluster: i32,
}

/// `id motif cluster` per item; noise is `-1`.
pub fn write_clusters<W: Write>(
    writer: W,
    assignment: &ClusterAssignment,
    motifs: &[(String, Motif)],
) -> Result<(), ReportError> {
    let by_id: HashMap<&str, &Motif> = motifs.iter().map(|(id, m)| (id.as_str(), m)).collect();
    let mut out = tsv_writer(writer);
    for (id, &cluster) in assignment.ids().iter().zip(assignment.labels()) {
        out.serialize(ClusterRow {
            id,
            motif: by_id.get(id.as_str()).map_or(MISSING, |m| m.as_str()),
            cluster,
        })?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ClusterSummaryRow<'a> {
    cluster: i32,
    size: usize,
    consensus: &'a str,
    highly_conserved: String,
    conservation: String,
    members: String,
}

pub fn write_cluster_summaries<W: Write>(
    writer: W,
    summaries: &[ClusterSummary],
) -> Result<(), ReportError> {
    let mut out = tsv_writer(writer);
    for s in summaries {
        out.serialize(ClusterSummaryRow {
            cluster: s.label,
            size: s.size(),
            consensus: s.consensus.as_str(),
            highly_conserved: s.highly_conserved_positions().iter().join(","),
            conservation: s.conservation.iter().map(|c| format!("{c:.2}")).join(","),
            members: s.members.join(","),
        })?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct SweepRow {
    epsilon: String,
    min_points: usize,
    clusters: usize,
    noise: usize,
    silhouette: String,
}

pub fn write_sweep<W: Write>(writer: W, points: &[SweepPoint]) -> Result<(), ReportError> {
    let mut out = tsv_writer(writer);
    for p in points {
        out.serialize(SweepRow {
            epsilon: format!("{:.3}", p.epsilon),
            min_points: p.assignment.min_points,
            clusters: p.n_clusters,
            noise: p.n_noise,
            silhouette: p
                .silhouette
                .map_or_else(|| MISSING.to_string(), |s| format!("{s:.4}")),
        })?;
    }
    out.flush()?;
    Ok(())
}
