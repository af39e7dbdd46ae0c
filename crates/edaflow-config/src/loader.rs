//! Manifest discovery
//!
//! Finds `edaflow.toml` by walking up from a directory and applies
//! environment overrides on top of it.

use crate::manifest::FlowManifest;
use crate::{ConfigError, ConfigResult};
use edaflow_build::FlowRequest;
use std::env;
use std::path::{Path, PathBuf};

/// File name searched for by [`ManifestLoader::load_from_directory`]
pub const MANIFEST_NAME: &str = "edaflow.toml";

/// Manifest loader
///
/// Applies, in increasing priority:
/// 1. The manifest file
/// 2. Environment variables (`EDAFLOW_*`)
#[derive(Debug, Default)]
pub struct ManifestLoader {
    /// Skip environment overrides
    ignore_env: bool,
}

/// A manifest together with where it was found
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub manifest: FlowManifest,

    /// Path of the manifest file
    pub path: PathBuf,

    /// Directory containing the manifest; relative paths resolve against it
    pub root: PathBuf,
}

impl ManifestLoader {
    /// Create a new manifest loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not consult `EDAFLOW_*` variables
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load the nearest manifest at or above the given directory
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<LoadedManifest> {
        let path = Self::find_manifest(start_dir)
            .ok_or_else(|| ConfigError::NotFound(start_dir.join(MANIFEST_NAME)))?;
        self.load_from_file(&path)
    }

    /// Load a specific manifest file
    pub fn load_from_file(&self, path: &Path) -> ConfigResult<LoadedManifest> {
        let manifest = FlowManifest::load_from_file(path)?;
        let manifest = if self.ignore_env {
            manifest
        } else {
            self.apply_env_overrides(manifest)
        };

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!(path = %path.display(), "loaded flow manifest");

        Ok(LoadedManifest {
            manifest,
            path: path.to_path_buf(),
            root,
        })
    }

    /// Walk up the directory tree looking for edaflow.toml
    fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(MANIFEST_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Apply environment variable overrides
    ///
    /// `EDAFLOW_BACKEND`, `EDAFLOW_ARCH` and `EDAFLOW_WORK_ROOT` replace the
    /// matching `[flow]` keys.
    fn apply_env_overrides(&self, mut manifest: FlowManifest) -> FlowManifest {
        if let Ok(backend) = env::var("EDAFLOW_BACKEND") {
            manifest.flow.backend = Some(backend);
        }

        if let Ok(arch) = env::var("EDAFLOW_ARCH") {
            manifest.flow.arch = Some(arch);
        }

        if let Ok(work_root) = env::var("EDAFLOW_WORK_ROOT") {
            manifest.flow.work_root = Some(PathBuf::from(work_root));
        }

        manifest
    }
}

impl LoadedManifest {
    /// Work root, resolved against the manifest directory
    pub fn work_root(&self) -> PathBuf {
        self.root.join(self.manifest.work_root())
    }

    /// Flow request for the loaded manifest
    pub fn request(&self) -> ConfigResult<FlowRequest> {
        self.manifest.to_request(&self.path)
    }
}
