use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Error taxonomy for a flattening run.
///
/// Only root-level failures are fatal. Per-file problems (unreadable
/// entries, undecodable content, highlighting failures) never surface
/// here: they degrade the affected file's disposition or rendering and
/// are reported through `RunStats` instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Cannot access scan root '{path}': {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    EntryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("Glob Pattern Error: {0}")]
    Glob(String),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<globset::Error> for AppError {
    fn from(err: globset::Error) -> Self {
        AppError::Glob(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::TomlParse(err.to_string())
    }
}
