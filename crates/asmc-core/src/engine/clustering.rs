use super::config::{ClusteringConfig, ConfigError};
use super::dissimilarity::DissimilarityMatrix;
use super::error::EngineError;
use crate::core::models::sequence::Motif;
use crate::core::utils::identifiers::UNKNOWN_RESIDUE_CODE;
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Label given to items that belong to no cluster.
pub const NOISE: i32 = -1;

/// Fraction above which a position counts as highly conserved.
pub const HIGH_CONSERVATION: f64 = 0.8;

/// Cluster labels for every item of a dissimilarity matrix.
///
/// Labels are `0..n_clusters` in order of each cluster's first item; the
/// numbering itself carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub epsilon: f64,
    pub min_points: usize,
    /// Mean silhouette over clustered items, when at least two clusters exist.
    pub silhouette: Option<f64>,
    ids: Vec<String>,
    labels: Vec<i32>,
}

impl ClusterAssignment {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn label_of(&self, id: &str) -> Option<i32> {
        self.ids.iter().position(|i| i == id).map(|i| self.labels[i])
    }

    pub fn n_clusters(&self) -> usize {
        self.labels.iter().filter(|&&l| l != NOISE).unique().count()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Item indices grouped by cluster label, noise excluded.
    pub fn clusters(&self) -> BTreeMap<i32, Vec<usize>> {
        let mut clusters: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, &label) in self.labels.iter().enumerate() {
            if label != NOISE {
                clusters.entry(label).or_default().push(i);
            }
        }
        clusters
    }
}

/// One candidate radius of an ε sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub epsilon: f64,
    pub n_clusters: usize,
    pub n_noise: usize,
    pub silhouette: Option<f64>,
    pub assignment: ClusterAssignment,
}

/// Composition of one cluster's motifs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub label: i32,
    pub members: Vec<String>,
    /// Most common residue per position, `X` where it covers half the
    /// members or fewer.
    pub consensus: Motif,
    /// Share of members carrying the most common residue, per position.
    pub conservation: Vec<f64>,
}

impl ClusterSummary {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// 1-based positions conserved in more than [`HIGH_CONSERVATION`] of members.
    pub fn highly_conserved_positions(&self) -> Vec<usize> {
        self.conservation
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > HIGH_CONSERVATION)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// `max(2, round(ln n))`.
pub fn default_min_points(n: usize) -> usize {
    if n < 2 {
        return 2;
    }
    ((n as f64).ln().round() as usize).max(2)
}

fn validate(epsilon: f64, min_points: usize) -> Result<(), ConfigError> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(ConfigError::InvalidParameter {
            name: "epsilon",
            reason: format!("must be a positive number, got {epsilon}"),
        });
    }
    if min_points == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "min_points",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Density-based clustering of a precomputed dissimilarity matrix.
///
/// An item's neighbourhood is every item within `epsilon`, itself included;
/// it is a core item when the neighbourhood holds at least `min_points`.
/// Core items within `epsilon` of each other share a cluster. A non-core item
/// joins the cluster of its nearest core neighbour (ties to the smallest id),
/// or is noise. With fewer than `min_points + 1` items everything is noise.
pub fn dbscan(
    matrix: &DissimilarityMatrix,
    epsilon: f64,
    min_points: usize,
) -> Result<ClusterAssignment, EngineError> {
    validate(epsilon, min_points)?;
    let n = matrix.len();
    let mut labels = vec![NOISE; n];

    if n >= min_points + 1 {
        let neighbours: Vec<Vec<usize>> = (0..n)
            .map(|i| (0..n).filter(|&j| matrix.get(i, j) <= epsilon).collect())
            .collect();
        let is_core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_points).collect();

        let mut next_label = 0;
        let mut queue = VecDeque::new();
        for seed in 0..n {
            if !is_core[seed] || labels[seed] != NOISE {
                continue;
            }
            labels[seed] = next_label;
            queue.push_back(seed);
            while let Some(i) = queue.pop_front() {
                for &j in &neighbours[i] {
                    if is_core[j] && labels[j] == NOISE {
                        labels[j] = next_label;
                        queue.push_back(j);
                    }
                }
            }
            next_label += 1;
        }

        let ids = matrix.ids();
        for i in 0..n {
            if is_core[i] {
                continue;
            }
            labels[i] = neighbours[i]
                .iter()
                .filter(|&&j| is_core[j])
                .min_by(|&&a, &&b| {
                    matrix
                        .get(i, a)
                        .total_cmp(&matrix.get(i, b))
                        .then_with(|| ids[a].cmp(&ids[b]))
                })
                .map_or(NOISE, |&j| labels[j]);
        }
    }

    let mut assignment = ClusterAssignment {
        epsilon,
        min_points,
        silhouette: None,
        ids: matrix.ids().to_vec(),
        labels,
    };
    assignment.silhouette = silhouette(matrix, &assignment);
    debug!(
        epsilon,
        min_points,
        clusters = assignment.n_clusters(),
        noise = assignment.noise_count(),
        "DBSCAN pass"
    );
    Ok(assignment)
}

/// Mean silhouette coefficient over non-noise items.
///
/// `None` unless the assignment has at least two clusters. Items alone in
/// their cluster score 0.
pub fn silhouette(matrix: &DissimilarityMatrix, assignment: &ClusterAssignment) -> Option<f64> {
    let clusters = assignment.clusters();
    if clusters.len() < 2 {
        return None;
    }
    let mut total = 0.0;
    let mut count = 0usize;
    for (label, members) in &clusters {
        for &i in members {
            count += 1;
            if members.len() == 1 {
                continue;
            }
            let a = members.iter().map(|&j| matrix.get(i, j)).sum::<f64>()
                / (members.len() - 1) as f64;
            let b = clusters
                .iter()
                .filter(|(other, _)| *other != label)
                .map(|(_, others)| {
                    others.iter().map(|&j| matrix.get(i, j)).sum::<f64>() / others.len() as f64
                })
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 {
                total += (b - a) / denom;
            }
        }
    }
    Some(total / count as f64)
}

/// Runs [`dbscan`] once per radius.
#[instrument(skip_all, name = "epsilon_sweep", fields(candidates = epsilons.len()))]
pub fn sweep(
    matrix: &DissimilarityMatrix,
    epsilons: &[f64],
    min_points: usize,
) -> Result<Vec<SweepPoint>, EngineError> {
    #[cfg(not(feature = "parallel"))]
    let iterator = epsilons.iter();

    #[cfg(feature = "parallel")]
    let iterator = epsilons.par_iter();

    iterator
        .map(|&epsilon| {
            let assignment = dbscan(matrix, epsilon, min_points)?;
            Ok(SweepPoint {
                epsilon,
                n_clusters: assignment.n_clusters(),
                n_noise: assignment.noise_count(),
                silhouette: assignment.silhouette,
                assignment,
            })
        })
        .collect()
}

/// Picks the sweep point with the best silhouette, then the fewest noise
/// items, then the smallest radius. Without any silhouette, the one with the
/// fewest noise items and smallest radius.
pub fn best_sweep_point(points: Vec<SweepPoint>) -> Option<SweepPoint> {
    let scored = points.iter().any(|p| p.silhouette.is_some());
    points
        .into_iter()
        .filter(|p| !scored || p.silhouette.is_some())
        .min_by(|a, b| {
            let sa = a.silhouette.unwrap_or(0.0);
            let sb = b.silhouette.unwrap_or(0.0);
            sb.total_cmp(&sa)
                .then(a.n_noise.cmp(&b.n_noise))
                .then(a.epsilon.total_cmp(&b.epsilon))
        })
}

/// Clusters `matrix`, deriving any parameter `config` leaves open.
#[instrument(skip_all, name = "clustering", fields(items = matrix.len()))]
pub fn cluster(
    matrix: &DissimilarityMatrix,
    config: &ClusteringConfig,
) -> Result<ClusterAssignment, EngineError> {
    if matrix.is_empty() {
        return Err(EngineError::EmptyInput("no items to cluster".to_string()));
    }
    let min_points = config
        .min_points
        .unwrap_or_else(|| default_min_points(matrix.len()));

    let assignment = match config.epsilon {
        Some(epsilon) => dbscan(matrix, epsilon, min_points)?,
        None => {
            let points = sweep(matrix, &config.epsilon_grid.values(), min_points)?;
            let best = best_sweep_point(points).ok_or_else(|| ConfigError::InvalidParameter {
                name: "epsilon_grid",
                reason: "no candidate radius".to_string(),
            })?;
            debug!(epsilon = best.epsilon, silhouette = ?best.silhouette, "Selected radius");
            best.assignment
        }
    };
    info!(
        epsilon = assignment.epsilon,
        min_points,
        clusters = assignment.n_clusters(),
        noise = assignment.noise_count(),
        "Clustering finished"
    );
    Ok(assignment)
}

/// Consensus and conservation of every cluster, noise excluded.
pub fn summarize_clusters(
    assignment: &ClusterAssignment,
    motifs: &[(String, Motif)],
) -> Result<Vec<ClusterSummary>, EngineError> {
    let by_id: HashMap<&str, &Motif> = motifs.iter().map(|(id, m)| (id.as_str(), m)).collect();
    assignment
        .clusters()
        .into_iter()
        .map(|(label, members)| {
            let member_motifs = members
                .iter()
                .map(|&i| {
                    let id = &assignment.ids[i];
                    by_id
                        .get(id.as_str())
                        .copied()
                        .ok_or_else(|| EngineError::UnknownItem(id.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let length = member_motifs.first().map_or(0, |m| m.len());
            if let Some((i, m)) = member_motifs.iter().enumerate().find(|(_, m)| m.len() != length) {
                return Err(EngineError::MotifLengthMismatch {
                    id: assignment.ids[members[i]].clone(),
                    expected: length,
                    found: m.len(),
                });
            }

            let columns: Vec<Vec<char>> = member_motifs.iter().map(|m| m.codes().collect()).collect();
            let size = members.len() as f64;
            let (consensus, conservation): (String, Vec<f64>) = (0..length)
                .map(|pos| {
                    let counts = columns.iter().map(|c| c[pos]).counts();
                    let (residue, count) = counts
                        .into_iter()
                        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                        .unwrap_or((UNKNOWN_RESIDUE_CODE, 0));
                    let share = count as f64 / size;
                    let code = if share > 0.5 { residue } else { UNKNOWN_RESIDUE_CODE };
                    (code, share)
                })
                .unzip();

            Ok(ClusterSummary {
                label,
                members: members.iter().map(|&i| assignment.ids[i].clone()).collect(),
                consensus: Motif::new(&consensus),
                conservation,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{ClusteringConfigBuilder, EpsilonGrid};
    use std::collections::BTreeSet;

    fn matrix(ids: &[&str], values: &[f64]) -> DissimilarityMatrix {
        DissimilarityMatrix::from_values(ids.iter().map(|s| s.to_string()).collect(), values.to_vec())
            .unwrap()
    }

    /// Three identical items and one far outlier.
    fn three_and_outlier() -> DissimilarityMatrix {
        matrix(
            &["a", "b", "c", "z"],
            &[
                0.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, 0.0, 1.0, //
                1.0, 1.0, 1.0, 0.0,
            ],
        )
    }

    /// Two tight groups: {a, b, c} and {d, e, f}.
    fn two_groups() -> DissimilarityMatrix {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut values = vec![0.0; 36];
        for i in 0..6 {
            for j in 0..6 {
                if i != j {
                    values[i * 6 + j] = if (i < 3) == (j < 3) { 0.1 } else { 0.9 };
                }
            }
        }
        matrix(&ids, &values)
    }

    fn partition(a: &ClusterAssignment) -> (BTreeSet<BTreeSet<String>>, BTreeSet<String>) {
        let clusters = a
            .clusters()
            .values()
            .map(|m| m.iter().map(|&i| a.ids()[i].clone()).collect())
            .collect();
        let noise = a
            .ids()
            .iter()
            .zip(a.labels())
            .filter(|&(_, &l)| l == NOISE)
            .map(|(id, _)| id.clone())
            .collect();
        (clusters, noise)
    }

    #[test]
    fn identical_items_cluster_and_outlier_is_noise() {
        let a = dbscan(&three_and_outlier(), 0.5, 2).unwrap();
        assert_eq!(a.n_clusters(), 1);
        assert_eq!(a.labels(), &[0, 0, 0, NOISE]);
        assert_eq!(a.label_of("z"), Some(NOISE));
        assert_eq!(a.silhouette, None);
    }

    #[test]
    fn too_few_items_are_all_noise() {
        let m = matrix(&["a", "b"], &[0.0, 0.0, 0.0, 0.0]);
        let a = dbscan(&m, 0.5, 2).unwrap();
        assert_eq!(a.noise_count(), 2);
        assert_eq!(a.n_clusters(), 0);
    }

    #[test]
    fn all_equal_matrix_forms_one_cluster() {
        let m = matrix(&["a", "b", "c"], &[0.0; 9]);
        let a = dbscan(&m, 0.05, 2).unwrap();
        assert_eq!(a.n_clusters(), 1);
        assert_eq!(a.noise_count(), 0);
    }

    #[test]
    fn border_item_joins_nearest_core_cluster() {
        // Groups 0..4 and 5..9 are tight; item 4 sits between them, nearer to 1.
        let ids: Vec<String> = (0..9).map(|i| format!("i{i}")).collect();
        let group = |i: usize| if i < 4 { Some(0) } else if i > 4 { Some(1) } else { None };
        let mut values = vec![0.9; 81];
        for i in 0..9 {
            for j in 0..9 {
                if i == j {
                    values[i * 9 + j] = 0.0;
                } else if group(i).is_some() && group(i) == group(j) {
                    values[i * 9 + j] = 0.1;
                }
            }
        }
        for (other, d) in [(1, 0.3), (5, 0.35)] {
            values[4 * 9 + other] = d;
            values[other * 9 + 4] = d;
        }
        let m = DissimilarityMatrix::from_values(ids, values).unwrap();
        let a = dbscan(&m, 0.4, 4).unwrap();
        assert_eq!(a.n_clusters(), 2);
        assert_eq!(a.noise_count(), 0);
        assert_eq!(a.label_of("i4"), a.label_of("i1"));
        assert_ne!(a.label_of("i1"), a.label_of("i5"));
    }

    #[test]
    fn partition_is_stable_under_reordering() {
        let m = two_groups();
        let original = dbscan(&m, 0.2, 2).unwrap();
        let shuffled = dbscan(&m.reordered(&[4, 1, 5, 0, 3, 2]), 0.2, 2).unwrap();
        assert_eq!(partition(&original), partition(&shuffled));
        assert_eq!(original.n_clusters(), 2);
    }

    #[test]
    fn silhouette_of_well_separated_groups_is_high() {
        let a = dbscan(&two_groups(), 0.2, 2).unwrap();
        let s = a.silhouette.unwrap();
        // a = 0.1, b = 0.9 for every item.
        assert!((s - 0.8 / 0.9).abs() < 1e-12);
    }

    #[test]
    fn sweep_returns_one_point_per_radius() {
        let points = sweep(&two_groups(), &[0.05, 0.2, 0.95], 2).unwrap();
        let summary: Vec<(usize, usize)> = points.iter().map(|p| (p.n_clusters, p.n_noise)).collect();
        assert_eq!(summary, vec![(0, 6), (2, 0), (1, 0)]);
        assert_eq!(best_sweep_point(points).unwrap().epsilon, 0.2);
    }

    #[test]
    fn automatic_parameters_pick_separating_radius() {
        let config = ClusteringConfig::default();
        let a = cluster(&two_groups(), &config).unwrap();
        assert_eq!(a.min_points, 2);
        assert_eq!(a.n_clusters(), 2);
        assert!((a.epsilon - 0.1).abs() < 1e-9);
    }

    #[test]
    fn explicit_parameters_are_used_as_given() {
        let config = ClusteringConfigBuilder::new()
            .epsilon(0.95)
            .min_points(3)
            .epsilon_grid(EpsilonGrid::new(0.1, 0.2, 0.1).unwrap())
            .build()
            .unwrap();
        let a = cluster(&two_groups(), &config).unwrap();
        assert_eq!(a.epsilon, 0.95);
        assert_eq!(a.n_clusters(), 1);
    }

    #[test]
    fn invalid_radius_is_rejected() {
        assert!(matches!(
            dbscan(&two_groups(), 0.0, 2),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            dbscan(&two_groups(), 0.3, 0),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn default_min_points_grows_with_log_of_count() {
        assert_eq!(default_min_points(1), 2);
        assert_eq!(default_min_points(4), 2);
        assert_eq!(default_min_points(30), 3);
        assert_eq!(default_min_points(100), 5);
    }

    #[test]
    fn summaries_report_consensus_and_conservation() {
        let a = dbscan(&three_and_outlier(), 0.5, 2).unwrap();
        let motifs: Vec<(String, Motif)> = [("a", "HDSK"), ("b", "HDSR"), ("c", "HESW"), ("z", "WWWW")]
            .iter()
            .map(|(id, m)| (id.to_string(), Motif::new(m)))
            .collect();
        let summaries = summarize_clusters(&a, &motifs).unwrap();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.size(), 3);
        assert_eq!(s.consensus.as_str(), "HDSX");
        assert!((s.conservation[1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.highly_conserved_positions(), vec![1, 3]);
    }

    #[test]
    fn summaries_require_a_motif_per_member() {
        let a = dbscan(&three_and_outlier(), 0.5, 2).unwrap();
        let motifs = vec![("a".to_string(), Motif::new("HD"))];
        assert!(matches!(
            summarize_clusters(&a, &motifs),
            Err(EngineError::UnknownItem(_))
        ));
    }
}
