//! edaflow flow manifests
//!
//! Loads `edaflow.toml`, the file describing one FPGA build:
//! - Design name and toplevel
//! - Backend, architecture and work root
//! - Tool options
//! - Tagged input files
//!
//! # Precedence
//!
//! Later sources override earlier ones:
//! 1. Manifest (`edaflow.toml`, found by walking up from the start directory)
//! 2. Environment variables (`EDAFLOW_BACKEND`, `EDAFLOW_ARCH`, `EDAFLOW_WORK_ROOT`)
//! 3. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use edaflow_config::ManifestLoader;
//! use std::path::Path;
//!
//! let loaded = ManifestLoader::new().load_from_directory(Path::new(".")).unwrap();
//! let plan = edaflow_build::configure(&loaded.request().unwrap()).unwrap();
//! ```

pub mod loader;
pub mod manifest;

use edaflow_build::BuildError;
use std::path::PathBuf;
use thiserror::Error;

/// Manifest errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Flow manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read flow manifest: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid flow manifest: {0}")]
    ValidationError(String),

    #[error("Missing required field '{field}' in {file}")]
    MissingField { field: String, file: PathBuf },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Result type for manifest operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{LoadedManifest, ManifestLoader, MANIFEST_NAME};
pub use manifest::{DesignSection, FlowManifest, FlowSection};
