// SPDX-License-Identifier: MIT

//! Per-run execution state

use super::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Mutable state for a single run, owned by the controller.
///
/// `node_outputs` is append-only: one output per node per run, never
/// overwritten. Executors read outputs; only the controller records them.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub project_id: String,
    /// Tenant-supplied initial inputs
    pub inputs: Map<String, Value>,
    /// Run-level advanced options
    pub advanced_options: Map<String, Value>,
    node_outputs: HashMap<String, Value>,
    status: RunStatus,
}

impl RunContext {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_advanced_options(mut self, options: Map<String, Value>) -> Self {
        self.advanced_options = options;
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Record a node's output. Outputs are write-once.
    pub fn record_output(&mut self, node_id: &str, output: Value) -> Result<(), EngineError> {
        if self.node_outputs.contains_key(node_id) {
            return Err(EngineError::DuplicateOutput {
                node_id: node_id.to_string(),
            });
        }
        self.node_outputs.insert(node_id.to_string(), output);
        Ok(())
    }

    /// A node's recorded output, if it has run
    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.node_outputs.get(node_id)
    }

    /// All recorded outputs, keyed by node id
    pub fn outputs(&self) -> &HashMap<String, Value> {
        &self.node_outputs
    }
}
