/// Flow configuration and graph construction error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing required option '{key}' for {variant}")]
    MissingOption { key: String, variant: String },

    #[error("Missing required {role} file for {variant}")]
    MissingRole { role: String, variant: String },

    #[error("Only one {role} file is supported. Found {first} and {second}")]
    DuplicateAssignment {
        role: String,
        first: String,
        second: String,
    },

    #[error("Incompatible formats for {variant}: {first} and {second}")]
    FormatMismatch {
        variant: String,
        first: String,
        second: String,
    },

    #[error("Unsupported variant: architecture '{arch}' with backend '{backend}'")]
    UnsupportedVariant { arch: String, backend: String },

    #[error("Invalid value for option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("Stage '{command}' declares no outputs")]
    EmptyOutputs { command: String },

    #[error("Default target '{target}' is not produced by any stage")]
    UnknownTarget { target: String },

    #[error("Stage producing '{stage}' depends on '{input}', which is only produced by a later stage")]
    ForwardDependency { stage: String, input: String },

    #[error("Output '{output}' is produced by more than one stage (stages {first} and {second})")]
    DuplicateOutput {
        output: String,
        first: usize,
        second: usize,
    },

    #[error("Path '{path}' cannot be used in a Makefile rule: {character:?} has no escape")]
    UnrepresentablePath { path: String, character: char },

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create a missing option error
    pub fn missing_option(key: impl Into<String>, variant: impl ToString) -> Self {
        Self::MissingOption {
            key: key.into(),
            variant: variant.to_string(),
        }
    }

    /// Create a missing role error
    pub fn missing_role(role: impl ToString, variant: impl ToString) -> Self {
        Self::MissingRole {
            role: role.to_string(),
            variant: variant.to_string(),
        }
    }

    /// Create a format mismatch error
    pub fn format_mismatch(
        variant: impl ToString,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::FormatMismatch {
            variant: variant.to_string(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create an invalid option error
    pub fn invalid_option(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}
