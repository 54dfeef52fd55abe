use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "ASMC CLI - extract active-site motifs from homologous proteins and cluster them by composition.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Map a reference active site onto target structures and sequences.
    Extract(ExtractArgs),
    /// Cluster extracted motifs by weighted substitution dissimilarity.
    Cluster(ClusterArgs),
    /// Cluster motifs over a grid of neighbourhood radii and tabulate the results.
    Sweep(SweepArgs),
}

/// Residue pairing used for the whole-structure fit.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingArg {
    ChainOrder,
    ResidueNumber,
    SequenceAlignment,
}

/// Arguments for the `extract` subcommand.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    // --- Reference ---
    /// PDB file of the reference structure.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub reference: PathBuf,

    /// Active-site file: `structure<TAB>chain<TAB>residue,residue,...`.
    #[arg(short, long, value_name = "PATH", required_unless_present = "site_list")]
    pub sites: Option<PathBuf>,

    /// Active-site residues as a comma-separated list, e.g. `52,78,104A`.
    #[arg(long, value_name = "LIST", conflicts_with = "sites", requires = "chain")]
    pub site_list: Option<String>,

    /// Reference chain of `--site-list`.
    #[arg(long, value_name = "CHAR")]
    pub chain: Option<char>,

    // --- Targets ---
    /// Target PDB files.
    #[arg(short, long, value_name = "PATH", num_args(1..))]
    pub targets: Vec<PathBuf>,

    /// Chain to use in every target structure; the first chain when absent.
    #[arg(long, value_name = "CHAR")]
    pub target_chain: Option<char>,

    /// FASTA file of target sequences, aligned to the reference sequence.
    #[arg(long, value_name = "PATH")]
    pub sequences: Option<PathBuf>,

    /// Directory for per-target reports, the summary, and the motif FASTA.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output_dir: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Correspondence Overrides ---
    /// Override the nearest-residue distance cutoff in Ångström.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Override the pairing used for the whole-structure fit.
    #[arg(long, value_enum, value_name = "MODE")]
    pub pairing: Option<PairingArg>,

    /// Override the minimum number of matched sites for a target to succeed.
    #[arg(long, value_name = "INT")]
    pub min_sites: Option<usize>,

    /// Skip the active-site-only refit.
    #[arg(long)]
    pub no_refine: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S correspondence.distance-cutoff=3.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Motif input and scoring shared by `cluster` and `sweep`.
#[derive(Args, Debug)]
pub struct MotifArgs {
    /// FASTA file of motifs, as written by `extract`.
    #[arg(short = 'i', long = "motifs", required = true, value_name = "PATH")]
    pub motifs: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Substitution table: `blosum62` or a path to an NCBI-format matrix.
    #[arg(long, value_name = "NAME_OR_PATH")]
    pub scoring_matrix: Option<String>,

    /// Override the penalty for a gap at one motif position.
    #[arg(long, value_name = "FLOAT")]
    pub gap_penalty: Option<f64>,

    /// Override the multiplier applied at weighted positions.
    #[arg(long, value_name = "FLOAT")]
    pub weight: Option<f64>,

    /// 1-based motif positions to weight, e.g. `1,4,7`.
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub weighted_positions: Option<Vec<usize>>,

    /// Override the minimum neighbourhood size, the item itself included.
    #[arg(long, value_name = "INT")]
    pub min_points: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S clustering.epsilon=0.3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `cluster` subcommand.
#[derive(Args, Debug)]
pub struct ClusterArgs {
    #[command(flatten)]
    pub motif: MotifArgs,

    /// Directory for the matrix, assignment, and summary tables.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output_dir: PathBuf,

    /// Neighbourhood radius; chosen by silhouette when absent.
    #[arg(short, long, value_name = "FLOAT")]
    pub epsilon: Option<f64>,
}

/// Arguments for the `sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(flatten)]
    pub motif: MotifArgs,

    /// Output table; printed to stdout when absent.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// First radius of the grid.
    #[arg(long, value_name = "FLOAT")]
    pub start: Option<f64>,

    /// Last radius of the grid, inclusive.
    #[arg(long, value_name = "FLOAT")]
    pub stop: Option<f64>,

    /// Grid spacing.
    #[arg(long, value_name = "FLOAT")]
    pub step: Option<f64>,
}
