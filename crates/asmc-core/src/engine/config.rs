use crate::core::scoring::SubstitutionMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn require_positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be zero or positive, got {value}"),
        })
    }
}

/// How reference and target residues are paired for the whole-structure fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingMode {
    /// i-th residue of the reference chain with the i-th of the target chain,
    /// truncated to the shorter chain.
    #[default]
    ChainOrder,
    /// Residues carrying the same number and insertion code.
    ResidueNumber,
    /// Residues aligned to each other by global sequence alignment.
    SequenceAlignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceConfig {
    pub distance_cutoff: f64,
    pub min_sites_matched: usize,
    pub refine: bool,
    pub pairing: PairingMode,
    pub rmsd_warning_threshold: Option<f64>,
}

impl Default for CorrespondenceConfig {
    fn default() -> Self {
        Self {
            distance_cutoff: 4.0,
            min_sites_matched: 1,
            refine: true,
            pairing: PairingMode::ChainOrder,
            rmsd_warning_threshold: Some(5.0),
        }
    }
}

#[derive(Default)]
pub struct CorrespondenceConfigBuilder {
    distance_cutoff: Option<f64>,
    min_sites_matched: Option<usize>,
    refine: Option<bool>,
    pairing: Option<PairingMode>,
    rmsd_warning_threshold: Option<Option<f64>>,
}

impl CorrespondenceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance_cutoff(mut self, cutoff: f64) -> Self {
        self.distance_cutoff = Some(cutoff);
        self
    }
    pub fn min_sites_matched(mut self, n: usize) -> Self {
        self.min_sites_matched = Some(n);
        self
    }
    pub fn refine(mut self, refine: bool) -> Self {
        self.refine = Some(refine);
        self
    }
    pub fn pairing(mut self, pairing: PairingMode) -> Self {
        self.pairing = Some(pairing);
        self
    }
    pub fn rmsd_warning_threshold(mut self, threshold: Option<f64>) -> Self {
        self.rmsd_warning_threshold = Some(threshold);
        self
    }

    pub fn build(self) -> Result<CorrespondenceConfig, ConfigError> {
        let defaults = CorrespondenceConfig::default();
        let distance_cutoff = require_positive(
            "distance_cutoff",
            self.distance_cutoff.unwrap_or(defaults.distance_cutoff),
        )?;
        let rmsd_warning_threshold = self
            .rmsd_warning_threshold
            .unwrap_or(defaults.rmsd_warning_threshold)
            .map(|t| require_positive("rmsd_warning_threshold", t))
            .transpose()?;
        Ok(CorrespondenceConfig {
            distance_cutoff,
            min_sites_matched: self.min_sites_matched.unwrap_or(defaults.min_sites_matched),
            refine: self.refine.unwrap_or(defaults.refine),
            pairing: self.pairing.unwrap_or(defaults.pairing),
            rmsd_warning_threshold,
        })
    }
}

/// Column scoring for global sequence alignment.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceScoring {
    /// Fixed scores for identical and non-identical residues.
    Identity { match_score: f64, mismatch_score: f64 },
    /// Scores looked up in a substitution table.
    Substitution(SubstitutionMatrix),
}

impl Default for SequenceScoring {
    fn default() -> Self {
        Self::Identity {
            match_score: 1.0,
            mismatch_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceAlignmentConfig {
    pub scoring: SequenceScoring,
    /// Linear penalty subtracted per gap column.
    pub gap_penalty: f64,
    pub min_score_warning: Option<f64>,
    /// Percent identity below which a result is flagged.
    pub min_identity_warning: Option<f64>,
}

impl Default for SequenceAlignmentConfig {
    fn default() -> Self {
        Self {
            scoring: SequenceScoring::default(),
            gap_penalty: 0.0,
            min_score_warning: None,
            min_identity_warning: Some(20.0),
        }
    }
}

impl SequenceAlignmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("gap_penalty", self.gap_penalty)?;
        if let Some(identity) = self.min_identity_warning {
            if !(0.0..=100.0).contains(&identity) {
                return Err(ConfigError::InvalidParameter {
                    name: "min_identity_warning",
                    reason: format!("must be a percentage, got {identity}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityConfig {
    pub gap_penalty: f64,
    pub weight_multiplier: f64,
    /// 1-based motif positions whose contribution is multiplied.
    pub weighted_positions: Vec<usize>,
}

impl Default for DissimilarityConfig {
    fn default() -> Self {
        Self {
            gap_penalty: 20.0,
            weight_multiplier: 5.0,
            weighted_positions: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct DissimilarityConfigBuilder {
    gap_penalty: Option<f64>,
    weight_multiplier: Option<f64>,
    weighted_positions: Option<Vec<usize>>,
}

impl DissimilarityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gap_penalty(mut self, penalty: f64) -> Self {
        self.gap_penalty = Some(penalty);
        self
    }
    pub fn weight_multiplier(mut self, multiplier: f64) -> Self {
        self.weight_multiplier = Some(multiplier);
        self
    }
    pub fn weighted_positions(mut self, positions: Vec<usize>) -> Self {
        self.weighted_positions = Some(positions);
        self
    }

    pub fn build(self) -> Result<DissimilarityConfig, ConfigError> {
        let defaults = DissimilarityConfig::default();
        let gap_penalty =
            require_non_negative("gap_penalty", self.gap_penalty.unwrap_or(defaults.gap_penalty))?;
        let weight_multiplier = require_positive(
            "weight_multiplier",
            self.weight_multiplier.unwrap_or(defaults.weight_multiplier),
        )?;
        let mut weighted_positions = self.weighted_positions.unwrap_or_default();
        if weighted_positions.contains(&0) {
            return Err(ConfigError::InvalidParameter {
                name: "weighted_positions",
                reason: "positions are 1-based".to_string(),
            });
        }
        weighted_positions.sort_unstable();
        weighted_positions.dedup();
        Ok(DissimilarityConfig {
            gap_penalty,
            weight_multiplier,
            weighted_positions,
        })
    }
}

/// Upper bound on the number of radii a grid may hold.
pub const MAX_GRID_POINTS: usize = 10_000;

/// Inclusive, evenly spaced range of candidate neighbourhood radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGrid {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Default for EpsilonGrid {
    fn default() -> Self {
        Self {
            start: 0.05,
            stop: 0.95,
            step: 0.05,
        }
    }
}

impl EpsilonGrid {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, ConfigError> {
        let start = require_positive("epsilon_grid.start", start)?;
        let step = require_positive("epsilon_grid.step", step)?;
        if !(stop.is_finite() && stop >= start) {
            return Err(ConfigError::InvalidParameter {
                name: "epsilon_grid.stop",
                reason: format!("must be at least start ({start}), got {stop}"),
            });
        }
        let grid = Self { start, stop, step };
        let points = grid.point_count();
        if points > MAX_GRID_POINTS as f64 {
            return Err(ConfigError::InvalidParameter {
                name: "epsilon_grid.step",
                reason: format!(
                    "grid from {start} to {stop} by {step} has {points:.0} radii, more than {MAX_GRID_POINTS}"
                ),
            });
        }
        Ok(grid)
    }

    fn point_count(&self) -> f64 {
        ((self.stop - self.start) / self.step + 1e-9).floor() + 1.0
    }

    /// At most `MAX_GRID_POINTS` radii, starting at `start`.
    pub fn values(&self) -> Vec<f64> {
        let points = self.point_count();
        let steps = if points.is_finite() && points >= 1.0 {
            (points as usize).min(MAX_GRID_POINTS) - 1
        } else {
            0
        };
        (0..=steps)
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    /// Neighbourhood radius; chosen from `epsilon_grid` when absent.
    pub epsilon: Option<f64>,
    /// Minimum neighbourhood size, counting the point itself; derived from
    /// the item count when absent.
    pub min_points: Option<usize>,
    pub epsilon_grid: EpsilonGrid,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            epsilon: None,
            min_points: None,
            epsilon_grid: EpsilonGrid::default(),
        }
    }
}

#[derive(Default)]
pub struct ClusteringConfigBuilder {
    epsilon: Option<f64>,
    min_points: Option<usize>,
    epsilon_grid: Option<EpsilonGrid>,
}

impl ClusteringConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }
    pub fn min_points(mut self, min_points: usize) -> Self {
        self.min_points = Some(min_points);
        self
    }
    pub fn epsilon_grid(mut self, grid: EpsilonGrid) -> Self {
        self.epsilon_grid = Some(grid);
        self
    }

    pub fn build(self) -> Result<ClusteringConfig, ConfigError> {
        let epsilon = self
            .epsilon
            .map(|e| require_positive("epsilon", e))
            .transpose()?;
        if self.min_points == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "min_points",
                reason: "must be at least 1".to_string(),
            });
        }
        let epsilon_grid = match self.epsilon_grid {
            Some(g) => EpsilonGrid::new(g.start, g.stop, g.step)?,
            None => EpsilonGrid::default(),
        };
        Ok(ClusteringConfig {
            epsilon,
            min_points: self.min_points,
            epsilon_grid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correspondence_builder_applies_defaults() {
        let config = CorrespondenceConfigBuilder::new().build().unwrap();
        assert_eq!(config, CorrespondenceConfig::default());
        assert_eq!(config.distance_cutoff, 4.0);
        assert_eq!(config.min_sites_matched, 1);
    }

    #[test]
    fn correspondence_builder_rejects_non_positive_cutoff() {
        for cutoff in [0.0, -1.0, f64::NAN] {
            let err = CorrespondenceConfigBuilder::new()
                .distance_cutoff(cutoff)
                .build()
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidParameter {
                    name: "distance_cutoff",
                    ..
                }
            ));
        }
    }

    #[test]
    fn rmsd_warning_can_be_disabled() {
        let config = CorrespondenceConfigBuilder::new()
            .rmsd_warning_threshold(None)
            .build()
            .unwrap();
        assert_eq!(config.rmsd_warning_threshold, None);
    }

    #[test]
    fn dissimilarity_builder_sorts_positions_and_rejects_zero() {
        let config = DissimilarityConfigBuilder::new()
            .weighted_positions(vec![5, 2, 5])
            .build()
            .unwrap();
        assert_eq!(config.weighted_positions, vec![2, 5]);
        assert_eq!(config.gap_penalty, 20.0);
        assert_eq!(config.weight_multiplier, 5.0);

        let err = DissimilarityConfigBuilder::new()
            .weighted_positions(vec![0, 1])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));
    }

    #[test]
    fn clustering_builder_rejects_bad_parameters() {
        assert!(ClusteringConfigBuilder::new().epsilon(0.0).build().is_err());
        assert!(ClusteringConfigBuilder::new().min_points(0).build().is_err());
        let config = ClusteringConfigBuilder::new()
            .epsilon(0.3)
            .min_points(2)
            .build()
            .unwrap();
        assert_eq!(config.epsilon, Some(0.3));
        assert_eq!(config.min_points, Some(2));
    }

    #[test]
    fn epsilon_grid_includes_stop_value() {
        let grid = EpsilonGrid::new(0.1, 0.5, 0.1).unwrap();
        let values = grid.values();
        assert_eq!(values.len(), 5);
        assert!((values[4] - 0.5).abs() < 1e-12);
        assert_eq!(EpsilonGrid::default().values().len(), 19);
        assert!(EpsilonGrid::new(0.5, 0.1, 0.1).is_err());
    }

    #[test]
    fn epsilon_grid_rejects_too_many_radii() {
        let err = EpsilonGrid::new(0.05, 0.95, 1e-15).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "epsilon_grid.step",
                ..
            }
        ));
        assert!(ClusteringConfigBuilder::new()
            .epsilon_grid(EpsilonGrid {
                start: 0.05,
                stop: 0.95,
                step: 1e-15,
            })
            .build()
            .is_err());

        let widest = EpsilonGrid::new(1.0, 10_000.0, 1.0).unwrap();
        assert_eq!(widest.values().len(), MAX_GRID_POINTS);

        let unchecked = EpsilonGrid {
            start: 0.05,
            stop: 0.95,
            step: 1e-15,
        };
        assert_eq!(unchecked.values().len(), MAX_GRID_POINTS);
    }

    #[test]
    fn sequence_alignment_config_validates_identity_percentage() {
        let mut config = SequenceAlignmentConfig::default();
        assert!(config.validate().is_ok());
        config.min_identity_warning = Some(150.0);
        assert!(config.validate().is_err());
    }
}
