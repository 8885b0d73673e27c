//! uniconnect-events - command-line entry point
//!
//! Runs recommendation, join and favorite operations against the configured
//! database and prints results as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uniconnect_common::config::{resolve_config, ConfigOverrides, ResolvedConfig};
use uuid::Uuid;

use uniconnect_events::db::{favorites, participation};
use uniconnect_events::{EventService, RecommendOptions, TieBreak};

/// Command-line arguments for uniconnect-events
#[derive(Parser, Debug)]
#[command(name = "uniconnect-events")]
#[command(about = "Event recommendations and capacity-aware joins for university clubs")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/uniconnect/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable or disable word-embedding scoring
    #[arg(long, global = true)]
    semantic: Option<bool>,

    /// Word vector model (.vec)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank upcoming events for a student
    Recommend {
        #[arg(long)]
        student: Uuid,

        #[arg(long, default_value_t = 50)]
        top_k: usize,

        /// Ordering for equal scores when ranking by tags only
        #[arg(long, value_enum, default_value_t = TieBreak::CandidateOrder)]
        tie_break: TieBreak,

        /// Earliest event date to consider (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// Join an event (waitlisted once it is full)
    Join {
        #[arg(long)]
        student: Uuid,

        #[arg(long)]
        event: Uuid,
    },
    /// Manage favorite events
    Favorite {
        #[command(subcommand)]
        action: FavoriteCommand,
    },
    /// List a student's participations, newest first
    Participations {
        #[arg(long)]
        student: Uuid,
    },
    /// Participation figures for a club's events
    ClubSummary {
        #[arg(long)]
        club: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum FavoriteCommand {
    Add {
        #[arg(long)]
        student: Uuid,

        #[arg(long)]
        event: Uuid,
    },
    Remove {
        #[arg(long)]
        student: Uuid,

        #[arg(long)]
        event: Uuid,
    },
    List {
        #[arg(long)]
        student: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = resolve_config(&ConfigOverrides {
        config_path: args.config.clone(),
        database_path: args.database.clone(),
        semantic_enabled: args.semantic,
        model_path: args.model.clone(),
    })
    .context("Failed to resolve configuration")?;

    init_tracing(&config);

    info!(
        database = %config.database_path.display(),
        semantic_enabled = config.semantic.enabled,
        "Starting uniconnect-events"
    );

    let service = EventService::from_config(&config)
        .await
        .context("Failed to open event database")?;

    match args.command {
        Command::Recommend {
            student,
            top_k,
            tie_break,
            from,
        } => {
            let today = from.unwrap_or_else(|| chrono::Local::now().date_naive());
            let options = RecommendOptions { top_k, tie_break };
            let recommendations = service
                .recommend_for_student(student, options, today)
                .await
                .context("Recommendation failed")?;
            print_json(&recommendations)?;
        }
        Command::Join { student, event } => {
            let outcome = service.join(student, event).await.context("Join failed")?;
            print_json(&outcome)?;
        }
        Command::Favorite { action } => match action {
            FavoriteCommand::Add { student, event } => {
                let added = favorites::add_favorite(service.pool(), student, event)
                    .await
                    .context("Failed to add favorite")?;
                print_json(&serde_json::json!({ "event_id": event, "added": added }))?;
            }
            FavoriteCommand::Remove { student, event } => {
                favorites::remove_favorite(service.pool(), student, event)
                    .await
                    .context("Failed to remove favorite")?;
                print_json(&serde_json::json!({ "event_id": event, "removed": true }))?;
            }
            FavoriteCommand::List { student } => {
                let list = favorites::list_favorites(service.pool(), student)
                    .await
                    .context("Failed to list favorites")?;
                print_json(&list)?;
            }
        },
        Command::Participations { student } => {
            let list = participation::list_student_participations(service.pool(), student)
                .await
                .context("Failed to list participations")?;
            print_json(&list)?;
        }
        Command::ClubSummary { club } => {
            let summary = participation::club_participation_summary(service.pool(), club)
                .await
                .context("Failed to summarize club participation")?;
            print_json(&summary)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level applies to this workspace's crates
fn init_tracing(config: &ResolvedConfig) {
    let fallback = format!(
        "uniconnect_events={level},uniconnect_common={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
