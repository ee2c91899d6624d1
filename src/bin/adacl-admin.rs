use adacl::directory::InMemoryDirectoryStore;
use adacl::dispatch::{BatchDispatcher, BatchRequest};
use adacl::security::roles::{ActionType, DaclRoleManager, RoleManagerTrait};
use adacl::Config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adacl-admin")]
#[command(about = "ADACL Admin Tool - Role authorization checks against directory DACLs")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, default_value = "config/adacl.toml")]
    pub config: PathBuf,

    /// Directory snapshot (JSON)
    #[arg(long, default_value = "config/directory.json")]
    pub directory: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Print this run's authorization metrics (Prometheus text format) to
    /// stderr after the command completes
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured roles with their flattened actions
    Roles,

    /// Check whether a principal may perform an action on a target
    Check {
        principal: String,
        /// Action tag, e.g. Get or AddAccessRule
        action: String,
        target: String,
    },

    /// Check whether a principal's rights on a target satisfy a role
    HasRole {
        principal: String,
        role: String,
        target: String,
    },

    /// Show the rights a principal effectively holds on a target
    Rights { principal: String, target: String },

    /// Grant a role's rights on a target
    AddRole {
        principal: String,
        role: String,
        target: String,
        /// Write the directory snapshot back after the change
        #[arg(long)]
        save: bool,
    },

    /// Revoke a role's rights on a target
    RemoveRole {
        principal: String,
        role: String,
        target: String,
        /// Write the directory snapshot back after the change
        #[arg(long)]
        save: bool,
    },

    /// Execute a batch request file (JSON)
    Batch {
        file: PathBuf,
        /// Principal the batch runs on behalf of
        #[arg(long)]
        requester: String,
        /// Write the directory snapshot back after the batch
        #[arg(long)]
        save: bool,
    },
}

struct AdminContext {
    config: Config,
    manager: Arc<DaclRoleManager>,
    directory: Arc<InMemoryDirectoryStore>,
    directory_path: PathBuf,
    pretty: bool,
}

impl AdminContext {
    fn load(cli: &Cli, config: Config) -> Result<Self> {
        let directory = Arc::new(
            InMemoryDirectoryStore::from_file(&cli.directory)
                .with_context(|| format!("loading directory {}", cli.directory.display()))?,
        );
        let manager = Arc::new(DaclRoleManager::from_config(&config, directory.clone())?);

        Ok(Self {
            config,
            manager,
            directory,
            directory_path: cli.directory.clone(),
            pretty: cli.pretty,
        })
    }

    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", output);
        Ok(())
    }

    async fn save_if(&self, save: bool) -> Result<()> {
        if save {
            self.directory.save(&self.directory_path).await?;
            info!(path = %self.directory_path.display(), "Directory snapshot saved");
        }
        Ok(())
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", cli.config.display(), e);
            std::process::exit(2);
        }
    };
    init_logging(&config);

    if let Err(e) = run(&cli, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, config: Config) -> Result<()> {
    let ctx = AdminContext::load(cli, config)?;
    let outcome = execute(cli, &ctx).await;

    if cli.metrics {
        eprint!("{}", ctx.manager.metrics().gather_text()?);
    }
    outcome
}

async fn execute(cli: &Cli, ctx: &AdminContext) -> Result<()> {
    let manager = &ctx.manager;

    match &cli.command {
        Commands::Roles => {
            let role_set = manager.role_set();
            let roles: Vec<_> = role_set.catalog.iter().collect();
            ctx.print(&roles)
        }
        Commands::Check {
            principal,
            action,
            target,
        } => {
            let action = ActionType::from_tag(action)?;
            let decision = manager.evaluate(principal, action, target).await?;
            ctx.print(&json!({
                "principal": principal,
                "action": action.to_string(),
                "target": target,
                "allowed": decision.is_allowed(),
                "role": decision.granting_role(),
                "reason": decision.denial_reason(),
            }))
        }
        Commands::HasRole {
            principal,
            role,
            target,
        } => {
            let satisfied = manager.has_role(principal, role, target).await?;
            ctx.print(&json!({
                "principal": principal,
                "role": role,
                "target": target,
                "has_role": satisfied,
            }))
        }
        Commands::Rights { principal, target } => {
            let breakdown = manager.rights_breakdown(principal, target).await?;
            let effective = manager.aggregator().resolve(&breakdown);
            ctx.print(&json!({
                "principal": principal,
                "target": target,
                "effective": effective,
                "allowed": breakdown.allowed,
                "denied": breakdown.denied,
            }))
        }
        Commands::AddRole {
            principal,
            role,
            target,
            save,
        } => {
            manager.add_role(principal, role, target).await?;
            ctx.save_if(*save).await?;
            ctx.print(&json!({ "granted": role, "principal": principal, "target": target }))
        }
        Commands::RemoveRole {
            principal,
            role,
            target,
            save,
        } => {
            manager.remove_role(principal, role, target).await?;
            ctx.save_if(*save).await?;
            ctx.print(&json!({ "revoked": role, "principal": principal, "target": target }))
        }
        Commands::Batch {
            file,
            requester,
            save,
        } => {
            let content = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("reading batch request {}", file.display()))?;
            let request: BatchRequest = serde_json::from_str(&content)?;

            let dispatcher = BatchDispatcher::new(
                ctx.manager.clone(),
                ctx.directory.clone(),
                ctx.config.dispatch.clone(),
            );
            let results = dispatcher.execute(requester, request).await?;
            ctx.save_if(*save).await?;
            ctx.print(&results)
        }
    }
}
