//! Writing build descriptions to disk
use crate::error::{BuildError, BuildResult};
use crate::graph::BuildGraph;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the emitted build description inside the work root
pub const MAKEFILE_NAME: &str = "Makefile";

/// Thin I/O boundary for generated text
///
/// Parent directories are never created; a missing work root is reported as an
/// error rather than silently materialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct Emitter;

impl Emitter {
    /// Write text verbatim to a path
    pub fn write(text: &str, path: &Path) -> BuildResult<()> {
        fs::write(path, text).map_err(|e| BuildError::io(path, e))?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "wrote build description");
        Ok(())
    }

    /// Serialize a graph to `<work_root>/Makefile`
    pub fn write_graph(graph: &BuildGraph, work_root: &Path) -> BuildResult<PathBuf> {
        let path = work_root.join(MAKEFILE_NAME);
        let text = graph.serialize();
        Self::write(&text, &path)?;
        Ok(path)
    }
}
