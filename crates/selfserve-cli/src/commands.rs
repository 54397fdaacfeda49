//! Subcommands, one per lifecycle operation.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use selfserve_core::models::cluster::ProvisionedCluster;
use selfserve_core::models::user::UserIdentity;
use selfserve_db::DbManager;
use selfserve_db::repository::{SurrealClusterRepository, SurrealOrganizationRepository};
use selfserve_lifecycle::{ClusterManager, OrganizationManager, RefreshReport};
use selfserve_upstream::{HttpUpstream, KubeRbacConnector};
use tracing::info;

use crate::settings::{ClusterSettings, OrganizationSettings, upstream_config};

#[derive(Args, Debug)]
pub struct ClusterArgs {
    #[command(flatten)]
    settings: ClusterSettings,

    #[command(subcommand)]
    action: ClusterAction,
}

#[derive(Subcommand, Debug)]
enum ClusterAction {
    /// List your clusters
    List,
    /// Request a new cluster
    Create { name: String },
    /// Reconcile your clusters with the broker
    Refresh,
    /// Delete a cluster by its broker id
    Delete { id: String },
    /// Grant cluster-admin and write an OIDC kubeconfig
    Kubeconfig {
        id: String,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct OrgArgs {
    #[command(flatten)]
    settings: OrganizationSettings,

    #[command(subcommand)]
    action: OrgAction,
}

#[derive(Subcommand, Debug)]
enum OrgAction {
    /// List your organizations
    List,
    /// Create an organization managed by you
    Create { name: String },
    /// Delete an organization by its GUID
    Delete { guid: String },
}

pub async fn run_cluster(
    args: ClusterArgs,
    user: &UserIdentity,
    db: &DbManager,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let broker = HttpUpstream::new(upstream_config(args.settings.credentials(), timeout_secs))?;
    let manager = ClusterManager::new(
        SurrealClusterRepository::new(db.client().clone()),
        broker,
        KubeRbacConnector::with_timeout(std::time::Duration::from_secs(timeout_secs)),
        args.settings.cluster_config(),
    );

    match args.action {
        ClusterAction::List => {
            for cluster in manager.list(user).await? {
                print_cluster(&cluster);
            }
        }
        ClusterAction::Create { name } => {
            let cluster = manager.create(user, &name).await?;
            print_cluster(&cluster);
        }
        ClusterAction::Refresh => {
            let report = manager.refresh(user).await?;
            print_report(&report);
        }
        ClusterAction::Delete { id } => {
            let report = manager.delete(user, &id).await?;
            println!("deletion of {id} accepted");
            print_report(&report);
        }
        ClusterAction::Kubeconfig { id, output } => {
            let download = manager.kubeconfig(user, &id).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &download.content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "Kubeconfig written");
                }
                None => print!("{}", download.content),
            }
        }
    }
    Ok(())
}

pub async fn run_org(
    args: OrgArgs,
    user: &UserIdentity,
    db: &DbManager,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let platform = HttpUpstream::new(upstream_config(args.settings.credentials(), timeout_secs))?;
    let manager = OrganizationManager::new(
        SurrealOrganizationRepository::new(db.client().clone()),
        platform,
        args.settings.organization_config(),
    );

    match args.action {
        OrgAction::List => {
            let listing = manager.list(user).await?;
            println!("console: {}", listing.console_url);
            for org in listing.organizations {
                println!("{}\t{}", org.remote_id, org.name);
            }
        }
        OrgAction::Create { name } => {
            let created = manager.create(user, &name).await?;
            println!(
                "{}\t{}",
                created.organization.remote_id, created.organization.name
            );
            for warning in created.warnings {
                eprintln!("warning: {warning}");
            }
        }
        OrgAction::Delete { guid } => {
            manager.delete(user, &guid).await?;
            println!("deleted {guid}");
        }
    }
    Ok(())
}

fn print_cluster(cluster: &ProvisionedCluster) {
    let status = &cluster.status;
    println!(
        "{}\t{}\t{} {}\t{}:{}\t{}",
        cluster.remote_id,
        cluster.name,
        status.last_action,
        status.last_action_state,
        status.master_host,
        status.master_port,
        status.master_ip.as_deref().unwrap_or("-"),
    );
}

fn print_report(report: &RefreshReport) {
    for name in &report.updated {
        println!("updated\t{name}");
    }
    for name in &report.removed {
        println!("removed\t{name}");
    }
    for failure in &report.failed {
        eprintln!("failed\t{}\t{}", failure.cluster, failure.reason);
    }
}

