use std::env;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the allocator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub allocation: AllocationConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = AllocationConfig::default();
        let equitable_percentage = read_var(
            "ALLOCATION_EQUITABLE_PERCENTAGE",
            defaults.equitable_percentage,
        )?;
        if !(equitable_percentage > 0.0 && equitable_percentage < 1.0) {
            return Err(ConfigError::OutOfRange {
                var: "ALLOCATION_EQUITABLE_PERCENTAGE",
                expected: "a fraction strictly between 0 and 1",
            });
        }

        let rotation_percentage =
            read_var("ALLOCATION_ROTATION_PERCENTAGE", defaults.rotation_percentage)?;
        if !(rotation_percentage > 0.0 && rotation_percentage <= 1.0) {
            return Err(ConfigError::OutOfRange {
                var: "ALLOCATION_ROTATION_PERCENTAGE",
                expected: "a fraction in (0, 1]",
            });
        }

        let batch_size = read_var("ALLOCATION_BATCH_SIZE", defaults.batch_size)?;
        let history_limit = read_var("ALLOCATION_HISTORY_LIMIT", defaults.history_limit)?;
        if batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                var: "ALLOCATION_BATCH_SIZE",
                expected: "a positive integer",
            });
        }
        if history_limit == 0 {
            return Err(ConfigError::OutOfRange {
                var: "ALLOCATION_HISTORY_LIMIT",
                expected: "a positive integer",
            });
        }

        Ok(Self {
            environment,
            allocation: AllocationConfig {
                equitable_percentage,
                rotation_percentage,
                batch_size,
                history_limit,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn read_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Unparseable { var, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Knobs for the hybrid strategy, rotations and bulk persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationConfig {
    /// Share of the pool dealt evenly; the rest follows the ranking weights.
    pub equitable_percentage: f64,
    /// Default share released per agent by a partial rotation.
    pub rotation_percentage: f64,
    /// Accounts per `save_all` call when persisting a run.
    pub batch_size: usize,
    /// Distributions retained by the in-memory history.
    pub history_limit: usize,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            equitable_percentage: 0.5,
            rotation_percentage: 0.2,
            batch_size: 100,
            history_limit: 100,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} could not be parsed from '{value}'")]
    Unparseable { var: &'static str, value: String },
    #[error("{var} must be {expected}")]
    OutOfRange {
        var: &'static str,
        expected: &'static str,
    },
}
