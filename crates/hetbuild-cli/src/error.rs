use hetbuild::core::models::cell::CellError;
use hetbuild::core::models::lattice::LatticeError;
use hetbuild::engine::config::ConfigError;
use hetbuild::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid search settings: {0}")]
    Search(#[from] ConfigError),

    #[error("Invalid {layer} lattice: {source}")]
    Lattice {
        layer: &'static str,
        #[source]
        source: LatticeError,
    },

    #[error("Failed to build slab cell: {0}")]
    Slab(#[from] CellError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to format results: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
