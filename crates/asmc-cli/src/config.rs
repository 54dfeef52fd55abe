use crate::cli::{ExtractArgs, MotifArgs, PairingArg};
use crate::error::{CliError, Result};
use asmc::core::scoring::{ScoreKind, SubstitutionMatrix};
use asmc::engine::config::{
    self as core_config, ClusteringConfigBuilder, CorrespondenceConfigBuilder,
    DissimilarityConfigBuilder, EpsilonGrid, PairingMode, SequenceAlignmentConfig,
    SequenceScoring,
};
use asmc::workflows::cluster::MotifClusteringConfig;
use asmc::workflows::extract::ExtractionConfig;
use serde::Deserialize;
use serde::de::IntoDeserializer;
use serde::de::value::StrDeserializer;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const DEFAULT_TABLE: &str = "blosum62";

impl From<PairingArg> for PairingMode {
    fn from(arg: PairingArg) -> Self {
        match arg {
            PairingArg::ChainOrder => PairingMode::ChainOrder,
            PairingArg::ResidueNumber => PairingMode::ResidueNumber,
            PairingArg::SequenceAlignment => PairingMode::SequenceAlignment,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialCorrespondenceConfig {
    #[serde(rename = "distance-cutoff")]
    distance_cutoff: Option<f64>,
    #[serde(rename = "min-sites-matched")]
    min_sites_matched: Option<usize>,
    refine: Option<bool>,
    pairing: Option<PairingMode>,
    #[serde(rename = "rmsd-warning-threshold")]
    rmsd_warning_threshold: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSequenceConfig {
    #[serde(rename = "scoring-matrix")]
    scoring_matrix: Option<String>,
    #[serde(rename = "matrix-kind")]
    matrix_kind: Option<ScoreKind>,
    #[serde(rename = "match-score")]
    match_score: Option<f64>,
    #[serde(rename = "mismatch-score")]
    mismatch_score: Option<f64>,
    #[serde(rename = "gap-penalty")]
    gap_penalty: Option<f64>,
    #[serde(rename = "min-score-warning")]
    min_score_warning: Option<f64>,
    #[serde(rename = "min-identity-warning")]
    min_identity_warning: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialDissimilarityConfig {
    #[serde(rename = "scoring-matrix")]
    scoring_matrix: Option<String>,
    #[serde(rename = "matrix-kind")]
    matrix_kind: Option<ScoreKind>,
    #[serde(rename = "gap-penalty")]
    gap_penalty: Option<f64>,
    #[serde(rename = "weight-multiplier")]
    weight_multiplier: Option<f64>,
    #[serde(rename = "weighted-positions")]
    weighted_positions: Option<Vec<usize>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialEpsilonGrid {
    start: Option<f64>,
    stop: Option<f64>,
    step: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialClusteringConfig {
    epsilon: Option<f64>,
    #[serde(rename = "min-points")]
    min_points: Option<usize>,
    #[serde(rename = "epsilon-grid")]
    epsilon_grid: Option<PartialEpsilonGrid>,
}

/// Radius options that only some subcommands expose.
#[derive(Debug, Default, Clone, Copy)]
pub struct RadiusOverrides {
    pub epsilon: Option<f64>,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub step: Option<f64>,
}

/// The TOML configuration file, every field optional.
///
/// Values are resolved as command-line flag, then `--set`, then file, then
/// library default.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialAsmcConfig {
    correspondence: Option<PartialCorrespondenceConfig>,
    #[serde(rename = "sequence-alignment")]
    sequence: Option<PartialSequenceConfig>,
    dissimilarity: Option<PartialDissimilarityConfig>,
    clustering: Option<PartialClusteringConfig>,
}

impl PartialAsmcConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::parsing(path, e))
    }

    /// Reads `path` when given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn merge_extraction(mut self, args: &ExtractArgs) -> Result<ExtractionConfig> {
        self.apply_set_values(&args.set_values)?;
        let file = self.correspondence.take().unwrap_or_default();

        let mut builder = CorrespondenceConfigBuilder::new();
        if let Some(cutoff) = args.cutoff.or(file.distance_cutoff) {
            builder = builder.distance_cutoff(cutoff);
        }
        if let Some(n) = args.min_sites.or(file.min_sites_matched) {
            builder = builder.min_sites_matched(n);
        }
        if args.no_refine {
            builder = builder.refine(false);
        } else if let Some(refine) = file.refine {
            builder = builder.refine(refine);
        }
        if let Some(pairing) = args.pairing.map(PairingMode::from).or(file.pairing) {
            builder = builder.pairing(pairing);
        }
        if let Some(threshold) = file.rmsd_warning_threshold {
            builder = builder.rmsd_warning_threshold(Some(threshold));
        }

        Ok(ExtractionConfig {
            correspondence: builder.build().map_err(config_error)?,
            sequence: Self::merge_sequence(self.sequence.take().unwrap_or_default())?,
            reserved_ids: Vec::new(),
        })
    }

    fn merge_sequence(partial: PartialSequenceConfig) -> Result<SequenceAlignmentConfig> {
        let defaults = SequenceAlignmentConfig::default();
        let scoring = match partial.scoring_matrix {
            Some(name) => SequenceScoring::Substitution(resolve_table(
                &name,
                partial.matrix_kind.unwrap_or_default(),
            )?),
            None => SequenceScoring::Identity {
                match_score: partial.match_score.unwrap_or(1.0),
                mismatch_score: partial.mismatch_score.unwrap_or(0.0),
            },
        };
        let config = SequenceAlignmentConfig {
            scoring,
            gap_penalty: partial.gap_penalty.unwrap_or(defaults.gap_penalty),
            min_score_warning: partial.min_score_warning.or(defaults.min_score_warning),
            min_identity_warning: partial
                .min_identity_warning
                .or(defaults.min_identity_warning),
        };
        config.validate().map_err(config_error)?;
        Ok(config)
    }

    pub fn merge_clustering(
        mut self,
        args: &MotifArgs,
        radius: &RadiusOverrides,
    ) -> Result<(MotifClusteringConfig, SubstitutionMatrix)> {
        self.apply_set_values(&args.set_values)?;

        let file = self.dissimilarity.take().unwrap_or_default();
        let table_name = args
            .scoring_matrix
            .as_deref()
            .or(file.scoring_matrix.as_deref())
            .unwrap_or(DEFAULT_TABLE);
        let table = resolve_table(table_name, file.matrix_kind.unwrap_or_default())?;

        let mut builder = DissimilarityConfigBuilder::new();
        if let Some(gap) = args.gap_penalty.or(file.gap_penalty) {
            builder = builder.gap_penalty(gap);
        }
        if let Some(weight) = args.weight.or(file.weight_multiplier) {
            builder = builder.weight_multiplier(weight);
        }
        if let Some(positions) = args.weighted_positions.clone().or(file.weighted_positions) {
            builder = builder.weighted_positions(positions);
        }
        let dissimilarity = builder.build().map_err(config_error)?;

        let file = self.clustering.take().unwrap_or_default();
        let grid = file.epsilon_grid.unwrap_or_default();
        let defaults = EpsilonGrid::default();
        let epsilon_grid = EpsilonGrid::new(
            radius.start.or(grid.start).unwrap_or(defaults.start),
            radius.stop.or(grid.stop).unwrap_or(defaults.stop),
            radius.step.or(grid.step).unwrap_or(defaults.step),
        )
        .map_err(config_error)?;

        let mut builder = ClusteringConfigBuilder::new().epsilon_grid(epsilon_grid);
        if let Some(epsilon) = radius.epsilon.or(file.epsilon) {
            builder = builder.epsilon(epsilon);
        }
        if let Some(min_points) = args.min_points.or(file.min_points) {
            builder = builder.min_points(min_points);
        }

        Ok((
            MotifClusteringConfig {
                dissimilarity,
                clustering: builder.build().map_err(config_error)?,
            },
            table,
        ))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            let section = key.split_once('.').map_or(key, |(s, _)| s);
            match section {
                "correspondence" => {
                    let c = self.correspondence.get_or_insert_with(Default::default);
                    match key {
                        "correspondence.distance-cutoff" => {
                            c.distance_cutoff = Some(parse(key, value)?)
                        }
                        "correspondence.min-sites-matched" => {
                            c.min_sites_matched = Some(parse(key, value)?)
                        }
                        "correspondence.refine" => c.refine = Some(parse(key, value)?),
                        "correspondence.pairing" => c.pairing = Some(parse_enum(key, value)?),
                        "correspondence.rmsd-warning-threshold" => {
                            c.rmsd_warning_threshold = Some(parse(key, value)?)
                        }
                        _ => return Err(unsupported(key)),
                    }
                }
                "sequence-alignment" => {
                    let s = self.sequence.get_or_insert_with(Default::default);
                    match key {
                        "sequence-alignment.scoring-matrix" => {
                            s.scoring_matrix = Some(value.to_string())
                        }
                        "sequence-alignment.matrix-kind" => {
                            s.matrix_kind = Some(parse_enum(key, value)?)
                        }
                        "sequence-alignment.match-score" => s.match_score = Some(parse(key, value)?),
                        "sequence-alignment.mismatch-score" => {
                            s.mismatch_score = Some(parse(key, value)?)
                        }
                        "sequence-alignment.gap-penalty" => s.gap_penalty = Some(parse(key, value)?),
                        "sequence-alignment.min-score-warning" => {
                            s.min_score_warning = Some(parse(key, value)?)
                        }
                        "sequence-alignment.min-identity-warning" => {
                            s.min_identity_warning = Some(parse(key, value)?)
                        }
                        _ => return Err(unsupported(key)),
                    }
                }
                "dissimilarity" => {
                    let d = self.dissimilarity.get_or_insert_with(Default::default);
                    match key {
                        "dissimilarity.scoring-matrix" => d.scoring_matrix = Some(value.to_string()),
                        "dissimilarity.matrix-kind" => d.matrix_kind = Some(parse_enum(key, value)?),
                        "dissimilarity.gap-penalty" => d.gap_penalty = Some(parse(key, value)?),
                        "dissimilarity.weight-multiplier" => {
                            d.weight_multiplier = Some(parse(key, value)?)
                        }
                        "dissimilarity.weighted-positions" => {
                            d.weighted_positions = Some(
                                value
                                    .split(',')
                                    .map(str::trim)
                                    .filter(|p| !p.is_empty())
                                    .map(|p| parse(key, p))
                                    .collect::<Result<_>>()?,
                            )
                        }
                        _ => return Err(unsupported(key)),
                    }
                }
                "clustering" => {
                    let c = self.clustering.get_or_insert_with(Default::default);
                    match key {
                        "clustering.epsilon" => c.epsilon = Some(parse(key, value)?),
                        "clustering.min-points" => c.min_points = Some(parse(key, value)?),
                        "clustering.epsilon-grid.start" => {
                            c.epsilon_grid.get_or_insert_with(Default::default).start =
                                Some(parse(key, value)?)
                        }
                        "clustering.epsilon-grid.stop" => {
                            c.epsilon_grid.get_or_insert_with(Default::default).stop =
                                Some(parse(key, value)?)
                        }
                        "clustering.epsilon-grid.step" => {
                            c.epsilon_grid.get_or_insert_with(Default::default).step =
                                Some(parse(key, value)?)
                        }
                        _ => return Err(unsupported(key)),
                    }
                }
                _ => return Err(unsupported(key)),
            }
        }
        Ok(())
    }
}

/// `blosum62` names the built-in table; anything else is a file path.
pub fn resolve_table(name_or_path: &str, kind: ScoreKind) -> Result<SubstitutionMatrix> {
    if name_or_path.eq_ignore_ascii_case(DEFAULT_TABLE) {
        return Ok(SubstitutionMatrix::blosum62());
    }
    let path = Path::new(name_or_path);
    if !path.exists() {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Scoring matrix does not exist: {}", name_or_path),
        )));
    }
    SubstitutionMatrix::read_from_path(path, kind).map_err(|e| CliError::parsing(path, e))
}

fn config_error(e: core_config::ConfigError) -> CliError {
    CliError::Config(e.to_string())
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!(
        "Unsupported configuration key for --set: '{}'",
        key
    ))
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_enum<'de, T: Deserialize<'de>>(key: &str, value: &'de str) -> Result<T> {
    let deserializer: StrDeserializer<'de, serde::de::value::Error> =
        value.trim().into_deserializer();
    T::deserialize(deserializer)
        .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::io::Write;

    fn extract_args(extra: &[&str]) -> ExtractArgs {
        let mut argv = vec![
            "asmc", "extract", "-r", "ref.pdb", "--site-list", "10,11", "--chain", "A", "-o",
            "out",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Extract(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn motif_args(extra: &[&str]) -> MotifArgs {
        let mut argv = vec!["asmc", "cluster", "-i", "motifs.fasta", "-o", "out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Cluster(args) => args.motif,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn config_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_configuration_yields_library_defaults() {
        let config = PartialAsmcConfig::default()
            .merge_extraction(&extract_args(&[]))
            .unwrap();
        assert_eq!(config.correspondence, core_config::CorrespondenceConfig::default());
        assert_eq!(config.sequence, SequenceAlignmentConfig::default());
    }

    #[test]
    fn file_values_are_applied() {
        let file = config_file(
            r#"
[correspondence]
distance-cutoff = 3.0
pairing = "residue-number"
refine = false

[sequence-alignment]
scoring-matrix = "BLOSUM62"
gap-penalty = 4.0
"#,
        );
        let config = PartialAsmcConfig::from_file(file.path())
            .unwrap()
            .merge_extraction(&extract_args(&[]))
            .unwrap();
        assert_eq!(config.correspondence.distance_cutoff, 3.0);
        assert_eq!(config.correspondence.pairing, PairingMode::ResidueNumber);
        assert!(!config.correspondence.refine);
        assert_eq!(config.sequence.gap_penalty, 4.0);
        assert!(matches!(
            config.sequence.scoring,
            SequenceScoring::Substitution(_)
        ));
    }

    #[test]
    fn flags_override_set_values_which_override_file() {
        let file = config_file("[correspondence]\ndistance-cutoff = 3.0\nmin-sites-matched = 2\n");
        let args = extract_args(&[
            "--cutoff",
            "6.5",
            "-S",
            "correspondence.distance-cutoff=5.0",
            "-S",
            "correspondence.min-sites-matched=3",
        ]);
        let config = PartialAsmcConfig::from_file(file.path())
            .unwrap()
            .merge_extraction(&args)
            .unwrap();
        assert_eq!(config.correspondence.distance_cutoff, 6.5);
        assert_eq!(config.correspondence.min_sites_matched, 3);
    }

    #[test]
    fn unknown_fields_in_file_are_rejected() {
        let file = config_file("[correspondence]\ncutoff = 3.0\n");
        let err = PartialAsmcConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }

    #[test]
    fn malformed_set_value_is_a_config_error() {
        let args = extract_args(&["-S", "correspondence.distance-cutoff"]);
        let err = PartialAsmcConfig::default()
            .merge_extraction(&args)
            .unwrap_err();
        assert!(err.to_string().contains("Expected KEY=VALUE"));
    }

    #[test]
    fn unsupported_set_key_is_rejected() {
        let args = extract_args(&["-S", "correspondence.radius=2"]);
        let err = PartialAsmcConfig::default()
            .merge_extraction(&args)
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported configuration key"));
    }

    #[test]
    fn set_values_parse_enums_by_their_kebab_names() {
        let args = extract_args(&["-S", "correspondence.pairing=sequence-alignment"]);
        let config = PartialAsmcConfig::default().merge_extraction(&args).unwrap();
        assert_eq!(config.correspondence.pairing, PairingMode::SequenceAlignment);

        let args = extract_args(&["-S", "correspondence.pairing=diagonal"]);
        assert!(PartialAsmcConfig::default().merge_extraction(&args).is_err());
    }

    #[test]
    fn invalid_cutoff_is_reported_by_the_builder() {
        let err = PartialAsmcConfig::default()
            .merge_extraction(&extract_args(&["--cutoff", "0"]))
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn clustering_merge_combines_all_sources() {
        let file = config_file(
            r#"
[dissimilarity]
gap-penalty = 10.0
weighted-positions = [2, 1]

[clustering]
min-points = 3

[clustering.epsilon-grid]
start = 0.1
stop = 0.5
step = 0.1
"#,
        );
        let args = motif_args(&["--weight", "2.5", "-S", "clustering.epsilon=0.3"]);
        let (config, table) = PartialAsmcConfig::from_file(file.path())
            .unwrap()
            .merge_clustering(&args, &RadiusOverrides::default())
            .unwrap();
        assert_eq!(table.name(), "BLOSUM62");
        assert_eq!(config.dissimilarity.gap_penalty, 10.0);
        assert_eq!(config.dissimilarity.weight_multiplier, 2.5);
        assert_eq!(config.dissimilarity.weighted_positions, vec![1, 2]);
        assert_eq!(config.clustering.epsilon, Some(0.3));
        assert_eq!(config.clustering.min_points, Some(3));
        assert_eq!(config.clustering.epsilon_grid.values().len(), 5);
    }

    #[test]
    fn radius_overrides_take_precedence() {
        let radius = RadiusOverrides {
            epsilon: Some(0.25),
            start: Some(0.2),
            stop: Some(0.4),
            step: Some(0.2),
        };
        let (config, _) = PartialAsmcConfig::default()
            .merge_clustering(&motif_args(&["-S", "clustering.epsilon=0.9"]), &radius)
            .unwrap();
        assert_eq!(config.clustering.epsilon, Some(0.25));
        assert_eq!(config.clustering.epsilon_grid.values().len(), 2);
    }

    #[test]
    fn missing_scoring_matrix_file_is_an_io_error() {
        let err = resolve_table("/definitely/not/here.mat", ScoreKind::Similarity).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn scoring_matrix_file_is_read() {
        let file = config_file("   A  C\nA  0  3\nC  3  0\n");
        let table = resolve_table(file.path().to_str().unwrap(), ScoreKind::Distance).unwrap();
        assert_eq!(table.kind(), ScoreKind::Distance);
        assert_eq!(table.score('A', 'C'), Some(3.0));
    }
}
