use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

/// Makefile generator for open source FPGA toolchains.
///
/// edaflow reads an edaflow.toml describing a design, its input files and
/// tool options, and writes a Makefile that runs Yosys, nextpnr, VPR and the
/// bitstream tools in the right order. Nothing is executed; run `make` in the
/// work root afterwards.
///
/// EXAMPLES:
///     edaflow generate                         Use the nearest edaflow.toml
///     edaflow generate -m boards/icebreaker.toml
///     edaflow generate --arch ecp5 --json      Override the architecture
///     edaflow variants                         List backend/arch pairs
///
/// ENVIRONMENT VARIABLES:
///     EDAFLOW_BACKEND     Override [flow] backend
///     EDAFLOW_ARCH        Override [flow] arch
///     EDAFLOW_WORK_ROOT   Override [flow] work_root
///     EDAFLOW_JSON        Set to 'true' for JSON output by default
///     EDAFLOW_LOG_LEVEL   Log level (error, warn, info, debug, trace)
#[derive(Parser)]
#[command(name = "edaflow")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log detail (repeatable)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the Makefile for a flow manifest
    ///
    /// Resolves the backend and architecture, assigns every input file to a
    /// role, validates the tool options and writes the Makefile into the
    /// work root. Command line flags override the manifest and the
    /// environment.
    ///
    /// EXAMPLES:
    ///     edaflow generate                          Nearest edaflow.toml
    ///     edaflow generate --work-root out          Write to ./out
    ///     edaflow generate --backend symbiflow-vpr --arch xilinx
    #[command(visible_alias = "g")]
    Generate {
        /// Manifest file (default: search upwards for edaflow.toml)
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,
        /// Directory the Makefile is written to
        #[arg(long, short = 'o')]
        work_root: Option<PathBuf>,
        /// Backend mode (nextpnr, symbiflow-nextpnr, symbiflow-vpr)
        #[arg(long, short = 'b')]
        backend: Option<String>,
        /// Target architecture or vendor
        #[arg(long, short = 'a')]
        arch: Option<String>,
        /// JSON output
        #[arg(long, env = "EDAFLOW_JSON")]
        json: bool,
    },

    /// List supported backend/architecture pairs
    ///
    /// Shows, for each variant, the options it requires and whether the
    /// fasm2bels back-annotation sub-flow is available.
    ///
    /// EXAMPLES:
    ///     edaflow variants          Table
    ///     edaflow variants --json   Machine readable
    Variants {
        /// JSON output
        #[arg(long, env = "EDAFLOW_JSON")]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::LoggingConfig::from_env(cli.verbose));

    match cli.command {
        Commands::Generate {
            manifest,
            work_root,
            backend,
            arch,
            json,
        } => {
            let args = commands::generate::GenerateArgs {
                manifest,
                work_root,
                backend,
                arch,
                json,
                ..Default::default()
            };
            commands::generate::run(args)?;
        }
        Commands::Variants { json } => {
            commands::variants::run(json)?;
        }
    }

    Ok(())
}
