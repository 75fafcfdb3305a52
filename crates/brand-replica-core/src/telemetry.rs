//! Tracing initialisation for binaries embedding the pipeline.
//!
//! Call [`init_tracing`] once at program start. Without `RUST_LOG`, pipeline
//! crates log at the requested level and every dependency at `warn`. Later
//! calls are ignored because the global subscriber can only be set once.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates whose events follow the requested verbosity.
const PIPELINE_TARGETS: [&str; 2] = ["brand_replica_core", "brand_replica"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(PIPELINE_TARGETS.iter().map(|t| format!("{t}={level}")));
    directives.join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON with run and phase fields flattened.
/// * `level`: pipeline verbosity when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let format = if json {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer().with_target(level >= Level::DEBUG).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_verbosity_to_pipeline_crates() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,brand_replica_core=debug,brand_replica=debug"
        );
        assert!(EnvFilter::try_new(default_directives(Level::TRACE)).is_ok());
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);
        tracing::info!(event = "telemetry.test", "still logging");
    }
}
