//! Self-service portal operator binary.

mod commands;
mod settings;

use clap::{Parser, Subcommand};
use selfserve_core::models::user::UserIdentity;
use tracing_subscriber::EnvFilter;

use crate::commands::{ClusterArgs, OrgArgs};
use crate::settings::DbSettings;

/// Provision clusters and organizations on behalf of a user.
#[derive(Parser, Debug)]
#[command(name = "selfserve", version, about)]
struct Cli {
    /// Email of the user the operation runs for.
    #[arg(long, env = "SELFSERVE_USER_EMAIL", global = true)]
    email: Option<String>,

    /// Timeout applied to every upstream request, in seconds.
    #[arg(long, env = "SELFSERVE_UPSTREAM_TIMEOUT", default_value_t = 30, global = true)]
    timeout_secs: u64,

    #[command(flatten)]
    db: DbSettings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage Kubernetes clusters
    Cluster(ClusterArgs),
    /// Manage platform organizations
    Org(OrgArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("selfserve=info".parse()?))
        .json()
        .init();

    selfserve_upstream::install_crypto_provider();

    let cli = Cli::parse();
    let email = cli
        .email
        .ok_or_else(|| anyhow::anyhow!("--email (or SELFSERVE_USER_EMAIL) is required"))?;
    let user = UserIdentity::from_email(email);

    let db = selfserve_db::DbManager::open(&(&cli.db).into()).await?;

    match cli.command {
        Command::Cluster(args) => commands::run_cluster(args, &user, &db, cli.timeout_secs).await,
        Command::Org(args) => commands::run_org(args, &user, &db, cli.timeout_secs).await,
    }
}
