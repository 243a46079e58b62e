//! Action Log admin CLI - maintenance commands for the delegation store

mod report;

use action_log::delegation::{sweep_expired, DelegationReason};
use action_log::models::Role;
use action_log::store::{DelegationFilter, NewUser, Store};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "action-log-admin")]
#[command(about = "Maintenance commands for the Action Log server")]
#[command(version)]
struct Cli {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:action_log.db")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deactivate delegations whose expiry has passed
    Sweep {
        /// Show what would be deactivated without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Print details for each expired delegation
        #[arg(short, long)]
        verbose: bool,
    },

    /// List delegations, newest first
    List {
        /// Only delegations with this reason
        #[arg(long, value_parser = parse_reason)]
        reason: Option<DelegationReason>,

        /// Only active delegations
        #[arg(long)]
        active: bool,

        /// Maximum number of rows
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Create a user
    CreateUser {
        #[arg(long)]
        username: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// economist, senior_economist, principal_economist,
        /// assistant_commissioner, commissioner or super_admin
        #[arg(long, value_parser = parse_role)]
        role: Role,

        #[arg(long)]
        designation: Option<String>,
    },
}

fn parse_reason(s: &str) -> std::result::Result<DelegationReason, String> {
    s.parse()
}

fn parse_role(s: &str) -> std::result::Result<Role, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "action_log_admin=info,action_log=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let pool = action_log::db::connect(&cli.database_url)
        .await
        .with_context(|| format!("opening {}", cli.database_url))?;
    let store = Store::new(pool);
    tracing::debug!(database_url = %cli.database_url, "connected");

    match cli.command {
        Commands::Sweep { dry_run, verbose } => run_sweep(&store, dry_run, verbose).await,
        Commands::List {
            reason,
            active,
            limit,
        } => run_list(&store, reason, active, limit).await,
        Commands::CreateUser {
            username,
            first_name,
            last_name,
            role,
            designation,
        } => {
            run_create_user(
                &store,
                NewUser {
                    username,
                    first_name,
                    last_name,
                    role,
                    designation,
                },
            )
            .await
        }
    }
}

async fn run_sweep(store: &Store, dry_run: bool, verbose: bool) -> Result<()> {
    let now = Utc::now();
    let report = sweep_expired(store, now, dry_run).await?;
    print!("{}", report::render_sweep(&report, now, verbose));
    Ok(())
}

async fn run_list(
    store: &Store,
    reason: Option<DelegationReason>,
    active: bool,
    limit: i64,
) -> Result<()> {
    let filter = DelegationFilter {
        reason,
        active: active.then_some(true),
    };
    let records = store.list_delegations(filter, limit, 0).await?;
    print!("{}", report::render_list(&records, Utc::now()));
    Ok(())
}

async fn run_create_user(store: &Store, new: NewUser) -> Result<()> {
    let user = store.create_user(new).await?;
    println!(
        "Created {} ({}) as {} with id {}",
        user.full_name(),
        user.username,
        user.role.label(),
        user.id
    );
    Ok(())
}
