// SPDX-License-Identifier: MIT

//! Run controller
//!
//! Drives a workflow through its execution order, strictly sequentially:
//! a node never begins before all of its direct predecessors have
//! recorded an output, and the first executor error stops the run with
//! node attribution attached.

use super::context::{RunContext, RunStatus};
use super::error::EngineError;
use super::executor::Executors;
use super::graph::{NodeKind, WorkflowDefinition};
use super::order::execution_order;
use crate::services::{AgentService, DocumentStore};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Progress and lifecycle events emitted during a run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    NodeStarted {
        node_id: String,
        name: String,
    },
    NodeCompleted {
        node_id: String,
        name: String,
        index: usize,
        total: usize,
        percent: u8,
    },
    RunCompleted,
    RunFailed {
        node_id: Option<String>,
        message: String,
    },
}

/// Executes workflows against the wired services
pub struct WorkflowRunner {
    executors: Executors,
}

impl WorkflowRunner {
    pub fn new(agents: Arc<dyn AgentService>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            executors: Executors::new(agents, store),
        }
    }

    /// Execute `graph` to completion. The return value is the output of
    /// the terminal `end` node. Events are best-effort; a closed receiver
    /// never fails a run.
    pub async fn run(
        &self,
        graph: &WorkflowDefinition,
        ctx: &mut RunContext,
        events: Option<mpsc::Sender<RunEvent>>,
    ) -> Result<Value, EngineError> {
        ctx.set_status(RunStatus::Running);

        match self.drive(graph, ctx, &events).await {
            Ok(value) => {
                ctx.set_status(RunStatus::Completed);
                emit(&events, RunEvent::RunCompleted).await;
                Ok(value)
            }
            Err(err) => {
                ctx.set_status(RunStatus::Failed);
                emit(
                    &events,
                    RunEvent::RunFailed {
                        node_id: err.node_id().map(str::to_string),
                        message: err.to_string(),
                    },
                )
                .await;
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        graph: &WorkflowDefinition,
        ctx: &mut RunContext,
        events: &Option<mpsc::Sender<RunEvent>>,
    ) -> Result<Value, EngineError> {
        graph.validate()?;
        let start = graph
            .start_node()
            .ok_or_else(|| EngineError::malformed("workflow has no start node"))?;

        let order = execution_order(graph, &start.id)?;
        let total = order.len();
        log::info!(
            "Running workflow '{}' with {} nodes in order",
            graph.name,
            total
        );

        let mut final_value = Value::Null;
        for (index, node) in order.iter().enumerate() {
            emit(
                events,
                RunEvent::NodeStarted {
                    node_id: node.id.clone(),
                    name: node.name.clone(),
                },
            )
            .await;

            let output = self
                .executors
                .execute(node, graph, ctx)
                .await
                .map_err(|e| e.at_node(node))?;

            if matches!(node.kind, NodeKind::End(_)) {
                final_value = output.clone();
            }
            ctx.record_output(&node.id, output)?;

            let percent = ((index + 1) * 100 / total) as u8;
            log::info!("Node '{}' completed ({}%)", node.id, percent);
            emit(
                events,
                RunEvent::NodeCompleted {
                    node_id: node.id.clone(),
                    name: node.name.clone(),
                    index: index + 1,
                    total,
                    percent,
                },
            )
            .await;
        }

        Ok(final_value)
    }
}

async fn emit(events: &Option<mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
