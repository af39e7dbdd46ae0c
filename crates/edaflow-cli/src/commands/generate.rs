//! Generate command - resolve a flow manifest and write its Makefile

use anyhow::{Context, Result};
use edaflow_build::FlowPlan;
use edaflow_config::{LoadedManifest, ManifestLoader};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Generate command arguments
#[derive(Debug, Default)]
pub struct GenerateArgs {
    /// Explicit manifest file
    pub manifest: Option<PathBuf>,
    /// Work root override
    pub work_root: Option<PathBuf>,
    /// Backend override
    pub backend: Option<String>,
    /// Architecture override
    pub arch: Option<String>,
    /// JSON output
    pub json: bool,
    /// Directory to search from (defaults to current directory)
    pub start_dir: Option<PathBuf>,
}

/// Run the generate command
pub fn run(args: GenerateArgs) -> Result<()> {
    let mut loaded = load_manifest(&args)?;

    // Command line beats manifest and environment
    if let Some(backend) = args.backend.clone() {
        loaded.manifest.flow.backend = Some(backend);
    }
    if let Some(arch) = args.arch.clone() {
        loaded.manifest.flow.arch = Some(arch);
    }

    let work_root = args
        .work_root
        .clone()
        .unwrap_or_else(|| loaded.work_root());

    let request = loaded
        .request()
        .with_context(|| format!("Invalid flow manifest {}", loaded.path.display()))?;

    let plan = edaflow_build::configure(&request)
        .with_context(|| format!("Failed to configure {} flow", request.variant))?;

    fs::create_dir_all(&work_root)
        .with_context(|| format!("Failed to create work root {}", work_root.display()))?;
    let makefile = plan.write(&work_root).context("Failed to write Makefile")?;

    tracing::info!(
        makefile = %makefile.display(),
        stages = plan.graph.len(),
        "generated Makefile"
    );
    for file in &plan.unused_files {
        tracing::warn!(file = %file.name, file_type = %file.file_type, "input file not used by the flow");
    }

    if args.json {
        print_json(&plan, &makefile);
    } else {
        print_summary(&plan, &makefile);
    }

    Ok(())
}

fn load_manifest(args: &GenerateArgs) -> Result<LoadedManifest> {
    let loader = ManifestLoader::new();

    match &args.manifest {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let start_dir = match &args.start_dir {
                Some(dir) => dir.clone(),
                None => env::current_dir().context("Failed to read current directory")?,
            };
            loader
                .load_from_directory(&start_dir)
                .context("No flow manifest found")
        }
    }
}

fn print_json(plan: &FlowPlan, makefile: &Path) {
    println!(
        "{}",
        serde_json::json!({
            "success": true,
            "variant": plan.variant.to_string(),
            "makefile": makefile.display().to_string(),
            "stages": plan.graph.len(),
            "default_targets": plan.default_targets(),
            "artifacts": plan.artifacts,
            "unused_files": plan.unused_files,
            "helper_scripts": plan.helper_scripts,
            "hazards": plan.graph.hazards().len(),
        })
    );
}

fn print_summary(plan: &FlowPlan, makefile: &Path) {
    println!("Wrote {}", makefile.display());
    println!("  Variant: {}", plan.variant);
    println!("  Stages: {}", plan.graph.len());
    println!("  Default targets: {}", plan.default_targets().join(" "));

    if !plan.artifacts.is_empty() {
        let names: Vec<&str> = plan.artifacts.iter().map(|a| a.name.as_str()).collect();
        println!("  Artifacts: {}", names.join(" "));
    }
    if !plan.helper_scripts.is_empty() {
        let paths: Vec<&str> = plan
            .helper_scripts
            .iter()
            .map(|h| h.path.as_str())
            .collect();
        println!("  Helper scripts: {}", paths.join(" "));
    }
    if !plan.unused_files.is_empty() {
        println!("  Unused files: {}", plan.unused_files.len());
    }
}
