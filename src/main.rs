use account_allocator::config::{AllocationConfig, AppConfig};
use account_allocator::error::AppError;
use account_allocator::telemetry;
use account_allocator::workflows::allocation::{
    Agent, AllocationServices, DistributionRequest, DistributionStats, RepositoryError,
    RotationOutcome, RotationRequest, RotationType,
};
use account_allocator::workflows::roster::{Roster, RosterImporter};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "account-allocator",
    about = "Rank sales agents, allocate client accounts and rotate books from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an initial hybrid distribution over the roster
    Distribute(DistributeArgs),
    /// Release part of the assigned book and redistribute it
    Rotate(RotateArgs),
    /// Rank agents by performance score
    Rank(RankArgs),
}

#[derive(Args, Debug)]
struct RosterArgs {
    /// Agents CSV export
    #[arg(long)]
    agents: PathBuf,
    /// Accounts CSV export
    #[arg(long)]
    accounts: PathBuf,
    /// Override the configured equitable share (0 < p < 1)
    #[arg(long)]
    equitable_percentage: Option<f64>,
    /// Print JSON instead of the text report
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DistributeArgs {
    #[command(flatten)]
    roster: RosterArgs,
    /// Keep the rankings from the agents file instead of recomputing them
    #[arg(long)]
    skip_ranking: bool,
}

#[derive(Args, Debug)]
struct RotateArgs {
    #[command(flatten)]
    roster: RosterArgs,
    /// full, partial or performance_based
    #[arg(long, default_value = "partial")]
    rotation_type: RotationType,
    /// Share released per agent for partial rotations (defaults to configuration)
    #[arg(long)]
    percentage: Option<f64>,
    /// Run an initial distribution before rotating, for rosters without assignments
    #[arg(long)]
    distribute_first: bool,
}

#[derive(Args, Debug)]
struct RankArgs {
    /// Agents CSV export
    #[arg(long)]
    agents: PathBuf,
    /// Only show the best `top` agents
    #[arg(long)]
    top: Option<usize>,
    /// Print JSON instead of the text report
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum CommandOutput {
    Distribution {
        stats: DistributionStats,
    },
    Rotation {
        outcome: RotationOutcome,
        stats: DistributionStats,
    },
    Ranking {
        agents: Vec<Agent>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(?config.environment, "account allocator starting");

    let json = match &cli.command {
        Command::Distribute(args) => args.roster.json,
        Command::Rotate(args) => args.roster.json,
        Command::Rank(args) => args.json,
    };

    let output = execute(cli.command, config.allocation).await?;
    if json {
        let rendered = serde_json::to_string_pretty(&output)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
    } else {
        render_output(&output);
    }
    Ok(())
}

async fn execute(
    command: Command,
    mut config: AllocationConfig,
) -> Result<CommandOutput, AppError> {
    match command {
        Command::Distribute(args) => {
            let services = load_services(&args.roster, &mut config).await?;
            services
                .coordinator
                .execute(DistributionRequest {
                    update_rankings: !args.skip_ranking,
                    ..DistributionRequest::default()
                })
                .await?;
            let stats = latest_stats(&services).await?;
            Ok(CommandOutput::Distribution { stats })
        }
        Command::Rotate(args) => {
            let services = load_services(&args.roster, &mut config).await?;
            if args.distribute_first {
                services
                    .coordinator
                    .execute(DistributionRequest::default())
                    .await?;
            }
            let request = RotationRequest {
                rotation_type: args.rotation_type,
                percentage: args.percentage.unwrap_or(config.rotation_percentage),
            };
            let outcome = services.rotation.execute(request).await?;
            let stats = latest_stats(&services).await?;
            Ok(CommandOutput::Rotation { outcome, stats })
        }
        Command::Rank(args) => {
            let agents = RosterImporter::agents_from_path(&args.agents)?;
            let services = AllocationServices::in_memory(&config)?;
            let mut ranked = services.ranking.calculate_rankings(Some(agents)).await?;
            if let Some(top) = args.top {
                ranked.truncate(top);
            }
            Ok(CommandOutput::Ranking { agents: ranked })
        }
    }
}

async fn load_services(
    args: &RosterArgs,
    config: &mut AllocationConfig,
) -> Result<AllocationServices, AppError> {
    if let Some(percentage) = args.equitable_percentage {
        config.equitable_percentage = percentage;
    }
    let services = AllocationServices::in_memory(config)?;
    Roster::from_paths(&args.agents, &args.accounts)?
        .seed(&services.repositories)
        .await?;
    Ok(services)
}

async fn latest_stats(services: &AllocationServices) -> Result<DistributionStats, AppError> {
    services.coordinator.stats().await?.ok_or_else(|| {
        AppError::Storage(RepositoryError::Unavailable(
            "no distribution recorded after a successful run".to_string(),
        ))
    })
}

fn render_output(output: &CommandOutput) {
    match output {
        CommandOutput::Distribution { stats } => render_stats(stats),
        CommandOutput::Rotation { outcome, stats } => {
            println!("{}", outcome.message);
            println!(
                "Rotation type: {} ({} accounts released)\n",
                outcome.rotation_type.label(),
                outcome.rotated_accounts
            );
            render_stats(stats);
        }
        CommandOutput::Ranking { agents } => {
            println!("Agent ranking");
            for agent in agents {
                println!(
                    "{:>3}. {} ({}), conversion {:.1}%, sales {:.2}, closed {}",
                    agent.current_ranking,
                    agent.name,
                    agent.id,
                    agent.metrics.conversion_rate,
                    agent.metrics.total_sales,
                    agent.metrics.closed_accounts
                );
            }
        }
    }
}

fn render_stats(stats: &DistributionStats) {
    let header = &stats.distribution;
    println!("Distribution {}", header.id);
    println!(
        "Type: {}, run at {}",
        header.kind.label(),
        header.date.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Equitable share: {:.0}%",
        header.parameters.equitable_percentage * 100.0
    );

    println!("\nAgents");
    for row in &stats.stats {
        println!(
            "- #{} {} ({}): {} accounts ({} equitable, {} ranking)",
            row.ranking,
            row.agent_name,
            row.agent_id,
            row.total_accounts,
            row.equitable_accounts,
            row.ranking_accounts
        );
    }

    let summary = &stats.summary;
    println!("\nSummary");
    println!("- total accounts: {}", summary.total_accounts);
    println!(
        "- per agent: avg {:.2}, std dev {:.2}, min {}, max {}",
        summary.avg_accounts, summary.std_deviation, summary.min_accounts, summary.max_accounts
    );
}
