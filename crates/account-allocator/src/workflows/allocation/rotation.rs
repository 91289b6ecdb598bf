use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::distribution::{Distribution, DistributionKind};
use super::domain::{Account, Agent};
use super::service::{DistributionCoordinator, DistributionError, DistributionRequest, Repositories};

const PERFORMANCE_BASE_RATE: f64 = 0.2;
const PERFORMANCE_MAX_RATE: f64 = 0.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationType {
    Full,
    #[default]
    Partial,
    PerformanceBased,
}

impl RotationType {
    pub const fn label(self) -> &'static str {
        match self {
            RotationType::Full => "full",
            RotationType::Partial => "partial",
            RotationType::PerformanceBased => "performance_based",
        }
    }

    const fn distribution_kind(self) -> DistributionKind {
        match self {
            RotationType::Full => DistributionKind::FullRotation,
            RotationType::Partial => DistributionKind::PartialRotation,
            RotationType::PerformanceBased => DistributionKind::PerformanceRotation,
        }
    }
}

impl FromStr for RotationType {
    type Err = DistributionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            "performance_based" => Ok(Self::PerformanceBased),
            other => Err(DistributionError::InvalidArgument(format!(
                "unknown rotation type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationRequest {
    pub rotation_type: RotationType,
    /// Share of each agent's book released by a partial rotation, in `(0, 1]`.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationOutcome {
    pub distribution: Distribution,
    pub rotation_type: RotationType,
    pub rotated_accounts: usize,
    pub message: String,
}

/// Cadence for unattended partial rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationInterval {
    Daily,
    Weekly,
    Monthly,
}

impl RotationInterval {
    pub const fn period(self) -> Duration {
        const DAY: u64 = 24 * 60 * 60;
        match self {
            RotationInterval::Daily => Duration::from_secs(DAY),
            RotationInterval::Weekly => Duration::from_secs(7 * DAY),
            RotationInterval::Monthly => Duration::from_secs(30 * DAY),
        }
    }
}

impl FromStr for RotationInterval {
    type Err = DistributionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DistributionError::InvalidArgument(format!(
                "invalid interval: {other}"
            ))),
        }
    }
}

/// Releases part of the book and re-runs the allocation over every active account.
pub struct RotationService {
    coordinator: Arc<DistributionCoordinator>,
    repositories: Repositories,
    default_percentage: f64,
}

impl RotationService {
    pub fn new(
        coordinator: Arc<DistributionCoordinator>,
        repositories: Repositories,
        default_percentage: f64,
    ) -> Self {
        Self {
            coordinator,
            repositories,
            default_percentage,
        }
    }

    /// Partial rotation with the configured share.
    pub fn default_request(&self) -> RotationRequest {
        RotationRequest {
            rotation_type: RotationType::Partial,
            percentage: self.default_percentage,
        }
    }

    pub async fn execute(
        &self,
        request: RotationRequest,
    ) -> Result<RotationOutcome, DistributionError> {
        let released = match request.rotation_type {
            RotationType::Full => self.release_all().await?,
            RotationType::Partial => {
                let percentage = request.percentage;
                if !(percentage > 0.0 && percentage <= 1.0) {
                    return Err(DistributionError::InvalidArgument(format!(
                        "rotation percentage must be in (0, 1], got {percentage}"
                    )));
                }
                self.release_lowest_value(|_| percentage).await?
            }
            RotationType::PerformanceBased => {
                self.release_lowest_value(performance_rotation_rate).await?
            }
        };

        info!(
            rotation = request.rotation_type.label(),
            released, "accounts released for rotation"
        );

        let outcome = self
            .coordinator
            .execute(DistributionRequest {
                update_rankings: false,
                kind: request.rotation_type.distribution_kind(),
                rotated_accounts: Some(released),
            })
            .await?;

        Ok(RotationOutcome {
            distribution: outcome.distribution,
            rotation_type: request.rotation_type,
            rotated_accounts: released,
            message: format!(
                "Rotation completed successfully using {} strategy",
                request.rotation_type.label()
            ),
        })
    }

    /// Clear every account, inactive ones included.
    async fn release_all(&self) -> Result<usize, DistributionError> {
        let mut accounts = self.repositories.accounts.get_all().await?;
        let released = accounts.iter().filter(|account| account.is_assigned()).count();
        accounts.iter_mut().for_each(Account::release);
        self.coordinator.save_accounts(accounts).await?;
        Ok(released)
    }

    /// For each agent, release `floor(book * rate(agent))` of its lowest-value accounts.
    async fn release_lowest_value<F>(&self, rate: F) -> Result<usize, DistributionError>
    where
        F: Fn(&Agent) -> f64,
    {
        let agents = self.repositories.agents.get_all().await?;
        let mut to_rotate = Vec::new();

        for agent in &agents {
            let book = self.repositories.accounts.get_by_agent(&agent.id).await?;
            // Floored once; `select_lowest_value` takes the count, not a second rate.
            let count = (book.len() as f64 * rate(agent)).floor() as usize;
            to_rotate.extend(select_lowest_value(book, count));
        }

        to_rotate.iter_mut().for_each(Account::release);
        let released = to_rotate.len();
        self.coordinator.save_accounts(to_rotate).await?;
        Ok(released)
    }

    /// Spawn a task running the default partial rotation every `interval`.
    /// The first rotation happens one full period after spawning.
    pub fn schedule(self: Arc<Self>, interval: RotationInterval) -> JoinHandle<()> {
        let period = interval.period();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let request = self.default_request();
                match self.execute(request).await {
                    Ok(outcome) => info!(
                        id = %outcome.distribution.id,
                        rotated = outcome.rotated_accounts,
                        "scheduled rotation finished"
                    ),
                    Err(err) => warn!(error = %err, "scheduled rotation failed"),
                }
            }
        })
    }
}

/// Worse ranks rotate more: `min(0.2 + (ranking / 10) * 0.1, 0.4)`.
pub fn performance_rotation_rate(agent: &Agent) -> f64 {
    let ranking_factor = f64::from(agent.current_ranking) / 10.0;
    (PERFORMANCE_BASE_RATE + ranking_factor * 0.1).min(PERFORMANCE_MAX_RATE)
}

/// The `count` accounts with the lowest potential value, ties in input order.
pub fn select_lowest_value(mut accounts: Vec<Account>, count: usize) -> Vec<Account> {
    accounts.sort_by(|left, right| left.potential_value.total_cmp(&right.potential_value));
    accounts.truncate(count);
    accounts
}
