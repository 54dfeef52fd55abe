use asmc::core::io::fasta::FastaError;
use asmc::core::models::site::SiteDefinitionError;
use asmc::engine::error::EngineError;
use asmc::workflows::report::ReportError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    AsmcCore(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write report: {0}")]
    Report(#[from] ReportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn parsing(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::FileParsing {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<SiteDefinitionError> for CliError {
    fn from(e: SiteDefinitionError) -> Self {
        CliError::Argument(e.to_string())
    }
}

impl From<FastaError> for CliError {
    fn from(e: FastaError) -> Self {
        CliError::Other(e.into())
    }
}
