//! `opsbook` - run and simulate playbooks from the command line.
//!
//! Loads playbook and object definitions from JSON files into the
//! in-memory collaborators, so authors can exercise automations without
//! a backing service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opsbook_core::{ExecutionContext, ObjectSnapshot, Playbook};
use opsbook_engine::testing::{
    InMemoryExecutionStore, InMemoryObjectStore, InMemoryPlaybookStore, InMemoryTaskStore,
    RecordingEventSink,
};
use opsbook_engine::{EngineConfig, PlaybookEngine, TestPlaybookRequest};

#[derive(Parser)]
#[command(name = "opsbook", about = "Playbook automation runner", version)]
struct Cli {
    /// Organization identifier.
    #[arg(long, default_value = "local")]
    organization: String,

    /// Property identifier.
    #[arg(long, default_value = "local")]
    property: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a playbook against test data.
    Test {
        /// Playbook definition (JSON file).
        #[arg(long)]
        playbook: PathBuf,

        /// Test data (JSON file).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Persist the simulation report as an execution record.
        #[arg(long)]
        commit: bool,
    },

    /// Execute a playbook against an object.
    Exec {
        /// Playbook definition (JSON file).
        #[arg(long)]
        playbook: PathBuf,

        /// Object snapshot (JSON file).
        #[arg(long)]
        object: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,opsbook_engine=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let ctx = ExecutionContext::new(&cli.organization, &cli.property);

    let playbooks = Arc::new(InMemoryPlaybookStore::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let tasks = Arc::new(InMemoryTaskStore::new());
    let executions = Arc::new(InMemoryExecutionStore::new());
    let events = Arc::new(RecordingEventSink::new());
    let engine = PlaybookEngine::with_config(
        playbooks.clone(),
        objects.clone(),
        tasks,
        executions,
        events.clone(),
        EngineConfig::from_env(),
    );

    match cli.command {
        Command::Test {
            playbook,
            data,
            commit,
        } => {
            let playbook: Playbook = load_json(&playbook)?;
            let playbook_id = playbook.id.clone();
            playbooks.put(playbook).await;

            let test_data = match data {
                Some(path) => load_json(&path)?,
                None => serde_json::json!({}),
            };

            let report = engine
                .test_playbook(
                    &TestPlaybookRequest {
                        playbook_id,
                        test_data,
                        dry_run: !commit,
                    },
                    &ctx,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Exec { playbook, object } => {
            let playbook: Playbook = load_json(&playbook)?;
            let object: ObjectSnapshot = load_json(&object)?;
            let playbook_id = playbook.id.clone();
            let object_id = object.id.clone();
            playbooks.put(playbook).await;
            objects.put_object(object).await;

            let result = engine.execute_playbook(&playbook_id, &object_id, &ctx).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if let Some(object) = objects.get(&object_id).await {
                println!("{}", serde_json::to_string_pretty(&object)?);
            }
            for event in events.events().await {
                tracing::info!(event_type = %event.event_type, "emitted");
            }
        }
    }

    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}
