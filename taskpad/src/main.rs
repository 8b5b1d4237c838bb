//! `Taskpad` — offline-first task manager.
//!
//! Tasks are created, edited, and deleted locally with durable
//! persistence; changes are reconciled against the remote task API after
//! each mutation when connectivity is available, or on demand via `sync`.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskpad/config.toml`).
//!
//! ```bash
//! # Capture a task (syncs afterwards when the remote is reachable)
//! cargo run --bin taskpad -- add "Water the plants" -d "balcony first"
//!
//! # Work fully offline
//! cargo run --bin taskpad -- --offline add "Read on the plane"
//!
//! # Reconcile everything that accumulated offline
//! cargo run --bin taskpad -- sync
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use url::Url;

use taskpad::config::{CliArgs, ClientConfig};
use taskpad::connectivity::{ConnectivityMonitor, HttpProbe};
use taskpad::gateway::TaskGateway;
use taskpad::gateway::http::HttpGateway;
use taskpad::repo::{RepoEvent, SyncOutcome, TaskRepository};
use taskpad::storage::{KeyValueStore, TaskStore, fs::FsStore};
use taskpad::sync::SyncEngine;
use taskpad_model::task::{TaskDraft, TaskId, TaskPatch};

/// Top-level CLI: global flags plus one subcommand.
#[derive(Parser, Debug)]
#[command(version, about = "Offline-first task manager")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

/// Task operations.
#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Create a new task.
    Add {
        /// Task title (3–100 characters).
        title: String,
        /// Task description (up to 500 characters).
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List tasks.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
    },
    /// Edit a task's title or description.
    Edit {
        /// Id of the task to edit.
        id: TaskId,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Toggle a task's completion state.
    Done {
        /// Id of the task to toggle.
        id: TaskId,
    },
    /// Delete a task.
    Rm {
        /// Id of the task to delete.
        id: TaskId,
    },
    /// Run one reconciliation pass now.
    Sync,
    /// Show task counts, sync status, and connectivity.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging, to a file when requested and stderr otherwise.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown when file
/// logging is active, so buffered entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(path) = file_path {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name()?.to_str()?;
        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        None
    }
}

/// Wire up storage, connectivity, and the gateway, then dispatch the
/// subcommand.
async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let base = Url::parse(&config.base_url)?;
    let store = TaskStore::new(FsStore::new(config.data_dir.clone()));
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let engine = SyncEngine::new(config.sync.clone());
    let (repo, mut events) =
        TaskRepository::new(store, Arc::clone(&monitor), engine, config.event_buffer);

    repo.load_from_storage().await;

    let gateway = HttpGateway::new(base.clone(), config.request_timeout)?;
    if !cli.args.offline {
        let probe = HttpProbe::new(base, config.request_timeout)?;
        monitor.refresh(&probe).await;
    }

    match cli.command {
        Command::Add { title, description } => {
            let task = repo.create(TaskDraft { title, description }).await?;
            println!("created {}  {}", task.id, task.title);
            sync_after_mutation(&repo, &gateway).await;
        }
        Command::List { all } => {
            let tasks = repo.tasks().await;
            let mut shown = 0;
            for task in tasks.iter().filter(|t| all || !t.completed) {
                let check = if task.completed { "x" } else { " " };
                let pending = if task.synced { " " } else { "*" };
                println!("[{check}]{pending} {}  {}", task.id, task.title);
                shown += 1;
            }
            if shown == 0 {
                println!("no tasks");
            }
        }
        Command::Edit {
            id,
            title,
            description,
        } => {
            let patch = TaskPatch {
                title,
                description,
                completed: None,
            };
            let task = repo.update(&id, patch).await?;
            println!("updated {}  {}", task.id, task.title);
            sync_after_mutation(&repo, &gateway).await;
        }
        Command::Done { id } => {
            let task = repo.toggle(&id).await?;
            let verb = if task.completed {
                "completed"
            } else {
                "reopened"
            };
            println!("{verb} {}  {}", task.id, task.title);
            sync_after_mutation(&repo, &gateway).await;
        }
        Command::Rm { id } => {
            repo.delete(&id).await?;
            println!("deleted {id}");
            sync_after_mutation(&repo, &gateway).await;
        }
        Command::Sync => match repo.sync_with_server(&gateway).await? {
            SyncOutcome::Completed { synced, failed } => {
                println!("sync complete: {synced} synced, {failed} still pending");
            }
            SyncOutcome::Offline => {
                println!("offline — changes will sync when connectivity returns");
            }
            SyncOutcome::AlreadySyncing => println!("a sync pass is already running"),
        },
        Command::Status => {
            let status = repo.status().await;
            let tasks = repo.tasks().await;
            let dirty = tasks.iter().filter(|t| !t.synced).count();
            println!("{} task(s), {dirty} pending sync", tasks.len());
            match status.last_sync_time {
                Some(ts) => println!("last sync: {ts}"),
                None => println!("last sync: never"),
            }
            if let Some(err) = status.error {
                println!("load error: {err}");
            }
            let connectivity = if monitor.is_connected() {
                "online"
            } else {
                "offline"
            };
            println!("connectivity: {connectivity}");
        }
    }

    drain_events(&mut events);
    Ok(())
}

/// Opportunistic post-mutation sync: runs a pass when online, stays quiet
/// when not. Pass failures are logged, never fatal to the mutation that
/// already succeeded.
async fn sync_after_mutation<S, G>(repo: &TaskRepository<S>, gateway: &G)
where
    S: KeyValueStore,
    G: TaskGateway,
{
    if !repo.connectivity().is_connected() {
        return;
    }
    if let Err(e) = repo.sync_with_server(gateway).await {
        tracing::warn!(error = %e, "post-mutation sync failed");
    }
}

/// Drain pending repository events and surface the user-visible ones as
/// transient messages.
fn drain_events(rx: &mut mpsc::Receiver<RepoEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            RepoEvent::SyncCompleted { synced, failed } if synced > 0 || failed > 0 => {
                println!("synced {synced} task(s), {failed} pending");
            }
            RepoEvent::SyncFailed(msg) => eprintln!("sync failed: {msg}"),
            _ => {}
        }
    }
}
