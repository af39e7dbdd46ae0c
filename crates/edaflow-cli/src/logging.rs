//! Structured logging setup
//!
//! Log records go to stderr so that `--json` output on stdout stays
//! machine readable. `RUST_LOG` takes precedence over everything else.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Crates whose records are shown at the configured level
const TARGETS: &[&str] = &["edaflow", "edaflow_build", "edaflow_config"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for edaflow's own records
    pub level: Level,

    /// Emit one JSON object per record
    pub use_json: bool,

    /// Include the module target in records
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    /// Read `EDAFLOW_LOG_LEVEL` and `EDAFLOW_LOG_JSON`
    ///
    /// Each `-v` on the command line raises the level by one step above
    /// whatever the environment selected.
    pub fn from_env(verbosity: u8) -> Self {
        let level = env::var("EDAFLOW_LOG_LEVEL")
            .map(|v| parse_level(&v))
            .unwrap_or(Level::WARN);

        let use_json = env::var("EDAFLOW_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level: raise(level, verbosity),
            use_json,
            include_target: verbosity >= 2,
        }
    }

    fn directives(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse a level name, falling back to WARN
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to WARN. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::WARN
        }
    }
}

fn raise(level: Level, steps: u8) -> Level {
    const ORDER: [Level; 5] = [
        Level::ERROR,
        Level::WARN,
        Level::INFO,
        Level::DEBUG,
        Level::TRACE,
    ];
    let start = ORDER.iter().position(|l| *l == level).unwrap_or(1);
    ORDER[(start + steps as usize).min(ORDER.len() - 1)]
}

/// Install the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directives()));

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.without_time())
                .init();
        }
    });
}
