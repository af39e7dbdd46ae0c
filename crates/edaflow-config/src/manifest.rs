//! Flow manifest (edaflow.toml)

use crate::{ConfigError, ConfigResult};
use edaflow_build::{FlowRequest, InputFile, Options, Variant};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Work root used when the manifest does not name one
pub const DEFAULT_WORK_ROOT: &str = "build";

/// Contents of an `edaflow.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FlowManifest {
    pub design: DesignSection,

    pub flow: FlowSection,

    /// Tool options, passed to the flow untouched
    #[serde(default)]
    pub options: Options,

    /// Input files in supply order
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<InputFile>,
}

/// `[design]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DesignSection {
    /// Design name; most artifacts are named after it
    pub name: String,

    /// Toplevel module (default: the design name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toplevel: Option<String>,
}

/// `[flow]` table
///
/// Backend and architecture may be left out when the environment or the
/// command line supplies them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FlowSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// Directory the Makefile is written to, relative to the manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_root: Option<PathBuf>,
}

impl FlowManifest {
    /// Load a manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse manifest text; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        if self.design.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "design.name".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }

        if let Some(toplevel) = &self.design.toplevel {
            if toplevel.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "design.toplevel".to_string(),
                    reason: "toplevel cannot be empty".to_string(),
                });
            }
        }

        for (index, file) in self.files.iter().enumerate() {
            if file.name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "files[{}] has an empty name",
                    index
                )));
            }
            if file.file_type.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "'{}' has an empty file_type",
                    file.name
                )));
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.design.name
    }

    /// Toplevel module, falling back to the design name
    pub fn toplevel(&self) -> &str {
        self.design.toplevel.as_deref().unwrap_or(&self.design.name)
    }

    pub fn work_root(&self) -> &Path {
        self.flow
            .work_root
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_WORK_ROOT))
    }

    /// Resolve the backend and architecture into a variant
    ///
    /// `file` names the manifest in the error when either is missing.
    pub fn variant(&self, file: &Path) -> ConfigResult<Variant> {
        let missing = |field: &str| ConfigError::MissingField {
            field: field.to_string(),
            file: file.to_path_buf(),
        };
        let backend = self.flow.backend.as_deref().ok_or_else(|| missing("flow.backend"))?;
        let arch = self.flow.arch.as_deref().ok_or_else(|| missing("flow.arch"))?;

        Ok(Variant::resolve(arch, backend)?)
    }

    /// Build the flow request this manifest describes
    pub fn to_request(&self, file: &Path) -> ConfigResult<FlowRequest> {
        let request = FlowRequest::new(self.name(), self.variant(file)?)
            .with_toplevel(self.toplevel())
            .with_files(self.files.clone())
            .with_options(self.options.clone());
        Ok(request)
    }
}
