// SPDX-License-Identifier: MIT

//! Node executors
//!
//! One executor per node kind. An executor runs only after every direct
//! predecessor of its node has recorded an output; it reads the run
//! context and returns the node's output value without touching any other
//! node's recorded output.

mod agent;
mod persistence;
mod source;
mod transform;

pub use agent::infer_provider;

use super::context::RunContext;
use super::error::EngineError;
use super::graph::{EndNode, Node, NodeKind, WorkflowDefinition};
use super::template::{self, Scope};
use crate::services::{AgentService, DocumentStore};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Constant acknowledgement returned by start nodes
static START_ACK: Lazy<Value> = Lazy::new(|| json!({"status": "started"}));

/// Shared handles the executors need
pub struct Executors {
    agents: Arc<dyn AgentService>,
    store: Arc<dyn DocumentStore>,
}

impl Executors {
    pub fn new(agents: Arc<dyn AgentService>, store: Arc<dyn DocumentStore>) -> Self {
        Self { agents, store }
    }

    /// Dispatch a node to its kind-specific executor.
    pub async fn execute(
        &self,
        node: &Node,
        graph: &WorkflowDefinition,
        ctx: &RunContext,
    ) -> Result<Value, EngineError> {
        let predecessors = graph.predecessors(&node.id);
        let scope = Scope::new(ctx, &predecessors);

        match &node.kind {
            NodeKind::Start => Ok(START_ACK.clone()),
            NodeKind::Input { value } => Ok(wrap_scalar(value.clone())),
            NodeKind::Agent(def) => agent::execute(def, &scope, self.agents.as_ref()).await,
            NodeKind::Transform(def) => transform::execute(def, &scope),
            NodeKind::SourceFetch(def) => {
                source::execute(def, ctx, self.store.as_ref()).await
            }
            NodeKind::Persistence(def) => {
                persistence::execute(def, &scope, self.store.as_ref()).await
            }
            NodeKind::End(def) => self.execute_end(def, node, ctx, &predecessors).await,
        }
    }

    /// Compute the run's return value and fire the optional auto-export.
    async fn execute_end(
        &self,
        def: &EndNode,
        node: &Node,
        ctx: &RunContext,
        predecessors: &[String],
    ) -> Result<Value, EngineError> {
        let value = match &def.final_output_node_id {
            Some(target) => match ctx.output(target) {
                Some(output) => output.clone(),
                None => {
                    log::warn!(
                        "end node '{}' redirect target '{}' has no recorded output",
                        node.id,
                        target
                    );
                    Value::Null
                }
            },
            None => {
                let mut map = Map::new();
                for id in predecessors {
                    if let Some(output) = ctx.output(id) {
                        map.insert(id.clone(), output.clone());
                    }
                }
                Value::Object(map)
            }
        };

        if let Some(export) = &def.auto_export {
            let scope = Scope::new(ctx, predecessors);
            let collection = template::resolve_string(&export.collection_template, &scope);
            let doc_id = export
                .doc_id_template
                .as_ref()
                .map(|t| template::resolve_string(t, &scope))
                .filter(|s| !s.is_empty());

            // export is best-effort: the run's primary result stands
            if let Err(err) = persistence::write_value(
                self.store.as_ref(),
                &ctx.project_id,
                &collection,
                doc_id,
                value.clone(),
            )
            .await
            {
                log::warn!("auto-export from end node '{}' failed: {}", node.id, err);
            }
        }

        Ok(value)
    }
}

/// Scalars wrap as `{"output": v}` so `prev.output` addressing works
/// uniformly; objects and arrays pass through unchanged.
fn wrap_scalar(value: Value) -> Value {
    match value {
        structured @ (Value::Object(_) | Value::Array(_)) => structured,
        scalar => json!({ "output": scalar }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_scalar_wraps_scalars() {
        assert_eq!(wrap_scalar(json!("hi")), json!({"output": "hi"}));
        assert_eq!(wrap_scalar(json!(3)), json!({"output": 3}));
        assert_eq!(wrap_scalar(json!(null)), json!({"output": null}));
    }

    #[test]
    fn test_wrap_scalar_passes_structured_through() {
        assert_eq!(wrap_scalar(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(wrap_scalar(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_start_ack_shape() {
        assert_eq!(START_ACK.clone(), json!({"status": "started"}));
    }
}
