use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Dependencies stay at `warn` unless a directive names them.
const DEPENDENCY_LEVEL: &str = "warn";
const ALLOCATOR_TARGET: &str = "account_allocator";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directives}'")]
    Filter {
        directives: String,
        #[source]
        source: ParseError,
    },
    #[error("could not install the log subscriber: {0}")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Expand a bare level such as `debug` into allocator-scoped directives.
/// Anything that already looks like a directive list is used as given.
pub fn allocator_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{DEPENDENCY_LEVEL},{ALLOCATOR_TARGET}={level}")
    }
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = allocator_directives(&config.log_level);
    EnvFilter::try_new(&directives).map_err(|source| TelemetryError::Filter { directives, source })
}

/// Install the global subscriber. Logs go to stderr so `--json` output on
/// stdout stays machine readable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
