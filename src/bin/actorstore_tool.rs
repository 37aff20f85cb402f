use actorstore::record::{FieldSpec, PermissionEntry};
use actorstore::{
    Actor, ActorPlatform, Execution, ExecutionsSummary, Record, StoreConfig, Subscription,
    TaggedId, Worker,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "actorstore-tool")]
#[command(about = "Developer tooling for actorstore snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List actors stored in a snapshot
    Actors {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Usage summary of one actor's executions
    Summary {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        actor: String,
    },
    /// Executions of one actor
    Executions {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        actor: String,
    },
    Workers {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        actor: String,
    },
    Permissions {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        actor: String,
    },
    /// Report which kind of record a generated id belongs to
    InspectId { id: String },
    /// Print the field schema of a record kind
    Fields { kind: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Actors { snapshot, tenant } => {
            let platform = open_snapshot(&snapshot).await?;
            let actors = platform.actors().list(tenant.as_deref()).await?;
            print_json(&actors)
        }
        Command::Summary { snapshot, actor } => {
            let platform = open_snapshot(&snapshot).await?;
            let summary = platform.executions().summarize(&actor).await?;
            print_json(&summary)
        }
        Command::Executions { snapshot, actor } => {
            let platform = open_snapshot(&snapshot).await?;
            let executions = platform.executions().list_executions(&actor).await?;
            print_json(&executions)
        }
        Command::Workers { snapshot, actor } => {
            let platform = open_snapshot(&snapshot).await?;
            let workers = platform.workers().get_workers(&actor).await?;
            print_json(&workers)
        }
        Command::Permissions { snapshot, actor } => {
            let platform = open_snapshot(&snapshot).await?;
            let permissions = platform.permissions().get_permissions(&actor).await?;
            print_json(&permissions)
        }
        Command::InspectId { id } => inspect_id(&id),
        Command::Fields { kind } => print_fields(&kind),
    }
}

async fn open_snapshot(path: &Path) -> Result<ActorPlatform> {
    if !path.exists() {
        return Err(anyhow!("snapshot '{}' does not exist", path.display()));
    }
    let config = StoreConfig::new().snapshot_path(path);
    ActorPlatform::open(config)
        .await
        .with_context(|| format!("failed to load snapshot '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

fn inspect_id(id: &str) -> Result<()> {
    let tagged: TaggedId = id
        .parse()
        .with_context(|| format!("'{id}' is not a generated id"))?;
    println!("kind: {}", tagged.kind());
    println!("code: {}", tagged.kind().code());
    println!("payload: {}", tagged.payload());
    Ok(())
}

fn print_fields(kind: &str) -> Result<()> {
    let fields: &[FieldSpec] = match kind {
        "actor" => Actor::FIELDS,
        "execution" => Execution::FIELDS,
        "summary" => ExecutionsSummary::FIELDS,
        "worker" => Worker::FIELDS,
        "subscription" => Subscription::FIELDS,
        "permission" => PermissionEntry::FIELDS,
        other => return Err(anyhow!("unknown record kind '{other}'")),
    };
    for spec in fields {
        println!(
            "{:<20} {:<10} {}",
            spec.name,
            format!("{:?}", spec.source).to_lowercase(),
            spec.description
        );
    }
    Ok(())
}
