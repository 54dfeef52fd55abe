use crate::core::models::sequence::Motif;
use crate::core::scoring::SubstitutionMatrix;
use crate::engine::clustering::{
    self, ClusterAssignment, ClusterSummary, SweepPoint, default_min_points,
};
use crate::engine::config::{ClusteringConfig, DissimilarityConfig};
use crate::engine::dissimilarity::{DissimilarityMatrix, compute_dissimilarity};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

#[derive(Debug, Clone, Default)]
pub struct MotifClusteringConfig {
    pub dissimilarity: DissimilarityConfig,
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone)]
pub struct ClusteringResult {
    pub matrix: DissimilarityMatrix,
    pub assignment: ClusterAssignment,
    pub summaries: Vec<ClusterSummary>,
}

#[derive(Debug, Clone)]
pub struct SweepResult {
    pub matrix: DissimilarityMatrix,
    pub points: Vec<SweepPoint>,
}

fn build_matrix(
    motifs: &[(String, Motif)],
    table: &SubstitutionMatrix,
    config: &DissimilarityConfig,
    reporter: &ProgressReporter,
) -> Result<DissimilarityMatrix, EngineError> {
    reporter.phase("Computing Dissimilarities", || {
        compute_dissimilarity(motifs, table, config)
    })
}

/// Scores every motif pair and clusters the result.
#[instrument(skip_all, name = "clustering_workflow", fields(motifs = motifs.len()))]
pub fn run(
    motifs: &[(String, Motif)],
    table: &SubstitutionMatrix,
    config: &MotifClusteringConfig,
    reporter: &ProgressReporter,
) -> Result<ClusteringResult, EngineError> {
    // === Phase 1: Pairwise dissimilarities ===
    let matrix = build_matrix(motifs, table, &config.dissimilarity, reporter)?;

    // === Phase 2: Density clustering ===
    let assignment = reporter.phase("Clustering", || {
        clustering::cluster(&matrix, &config.clustering)
    })?;

    // === Phase 3: Cluster composition ===
    let summaries = clustering::summarize_clusters(&assignment, motifs)?;
    for s in &summaries {
        reporter.report(Progress::Message(format!(
            "Cluster {}: {} members, consensus {}",
            s.label,
            s.size(),
            s.consensus
        )));
    }
    info!(
        clusters = summaries.len(),
        noise = assignment.noise_count(),
        "Clustering workflow finished"
    );

    Ok(ClusteringResult {
        matrix,
        assignment,
        summaries,
    })
}

/// Clusters at every radius of the configured grid and returns all
/// partitions.
#[instrument(skip_all, name = "sweep_workflow", fields(motifs = motifs.len()))]
pub fn run_sweep(
    motifs: &[(String, Motif)],
    table: &SubstitutionMatrix,
    config: &MotifClusteringConfig,
    reporter: &ProgressReporter,
) -> Result<SweepResult, EngineError> {
    let matrix = build_matrix(motifs, table, &config.dissimilarity, reporter)?;
    let min_points = config
        .clustering
        .min_points
        .unwrap_or_else(|| default_min_points(matrix.len()));
    let epsilons = config.clustering.epsilon_grid.values();

    let points = reporter.phase("Sweeping Radius", || {
        clustering::sweep(&matrix, &epsilons, min_points)
    })?;
    info!(candidates = points.len(), min_points, "Sweep finished");
    Ok(SweepResult { matrix, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ClusteringConfigBuilder;

    fn motifs() -> Vec<(String, Motif)> {
        [
            ("a", "HDSKRC"),
            ("b", "HDSKRC"),
            ("c", "HDSKRC"),
            ("d", "WWPPGG"),
        ]
        .iter()
        .map(|(id, m)| (id.to_string(), Motif::new(m)))
        .collect()
    }

    #[test]
    fn outlier_motif_is_left_unclustered() {
        let config = MotifClusteringConfig {
            clustering: ClusteringConfigBuilder::new()
                .epsilon(0.5)
                .min_points(2)
                .build()
                .unwrap(),
            ..MotifClusteringConfig::default()
        };
        let result = run(
            &motifs(),
            &SubstitutionMatrix::blosum62(),
            &config,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.matrix.get_by_id("a", "d"), Some(1.0));
        assert_eq!(result.assignment.label_of("d"), Some(clustering::NOISE));
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].size(), 3);
        assert_eq!(result.summaries[0].consensus.as_str(), "HDSKRC");
    }

    #[test]
    fn sweep_covers_whole_grid() {
        let result = run_sweep(
            &motifs(),
            &SubstitutionMatrix::blosum62(),
            &MotifClusteringConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.points.len(), 19);
        assert!(result.points.iter().all(|p| p.assignment.min_points == 2));
    }

    #[test]
    fn length_mismatch_aborts_the_step() {
        let mut items = motifs();
        items.push(("e".to_string(), Motif::new("HDS")));
        let err = run(
            &items,
            &SubstitutionMatrix::blosum62(),
            &MotifClusteringConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MotifLengthMismatch { .. }));
    }
}
