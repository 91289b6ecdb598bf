use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::allocation::{AllocationError, DistributionError, RepositoryError};
use crate::workflows::roster::RosterImportError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("roster error: {0}")]
    Roster(#[from] RosterImportError),
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("distribution error: {0}")]
    Distribution(#[from] DistributionError),
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl AppError {
    /// Process exit status: 2 for rejected input, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        let client_error = match self {
            AppError::Roster(_) | AppError::Allocation(_) => true,
            AppError::Distribution(err) => err.is_client_error(),
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) | AppError::Storage(_) => {
                false
            }
        };
        if client_error {
            2
        } else {
            1
        }
    }
}
