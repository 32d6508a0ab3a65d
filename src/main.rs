use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

use strand_rs::services::{
    AgentRequest, AgentResponse, AgentService, DocumentStore, HttpStore, MemoryStore,
    ServiceError, SubAgentClient,
};
use strand_rs::strand::engine::{RunContext, RunEvent, WorkflowRunner};
use strand_rs::strand::loader::WorkflowLoader;
use strand_rs::strand::selector::WorkflowCatalog;
use strand_rs::strand::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a workflow file to completion
    Run {
        /// Path to the workflow file
        #[arg(short, long)]
        file: String,

        /// Project id the run is scoped to
        #[arg(short, long)]
        project: String,

        /// Tenant inputs as key=value pairs
        #[arg(short, long)]
        input: Vec<String>,
    },
    /// Serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Placeholder agent service used when no RPC endpoint is configured;
/// agent nodes fail at execution time, everything else still runs.
struct UnconfiguredAgents;

#[async_trait::async_trait]
impl AgentService for UnconfiguredAgents {
    async fn execute(&self, _request: AgentRequest) -> Result<AgentResponse, ServiceError> {
        Err(ServiceError::other(
            "SUBAGENT_RPC_URL is not configured; agent nodes cannot run",
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            file,
            project,
            input,
        } => {
            let def = WorkflowLoader::new()
                .load(&file)
                .with_context(|| format!("loading workflow from {}", file))?;
            let inputs = parse_inputs(&input)?;

            let runner = WorkflowRunner::new(build_agents(), build_store());
            let mut ctx = RunContext::new(project).with_inputs(inputs);

            let (tx, mut rx) = mpsc::channel(100);
            let progress = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    if let RunEvent::NodeCompleted {
                        node_id, percent, ..
                    } = &event
                    {
                        log::info!("[{:>3}%] {}", percent, node_id);
                    }
                }
            });

            let result = runner.run(&def, &mut ctx, Some(tx)).await?;
            let _ = progress.await;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Serve { port } => {
            let store = build_store();
            let state = AppState {
                runner: Arc::new(WorkflowRunner::new(build_agents(), store.clone())),
                catalog: Arc::new(WorkflowCatalog::new(store)),
            };
            server::serve(port, state)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}

/// Prefer the REST store when configured, otherwise run in-memory.
fn build_store() -> Arc<dyn DocumentStore> {
    match HttpStore::new() {
        Ok(store) => Arc::new(store),
        Err(_) => {
            log::warn!("DOCSTORE_BASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_agents() -> Arc<dyn AgentService> {
    match SubAgentClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::warn!("Agent RPC unavailable: {}", e);
            Arc::new(UnconfiguredAgents)
        }
    }
}

fn parse_inputs(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("input '{}' is not key=value", pair))?;
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(map)
}
