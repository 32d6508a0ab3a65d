// SPDX-License-Identifier: MIT

//! Typed error handling for the workflow engine

use crate::services::ServiceError;
use crate::strand::engine::graph::Node;
use thiserror::Error;

/// Top-level error type for workflow execution
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad graph shape, detected at load time
    #[error("Malformed workflow: {0}")]
    MalformedWorkflow(String),

    /// An edge references a node id that does not exist
    #[error("Dangling edge {edge_source} -> {target}")]
    DanglingEdge { edge_source: String, target: String },

    /// Ordering failed: a cycle, or reachable nodes the order omitted
    #[error("Workflow graph has a cycle or unreachable nodes: {missing:?}")]
    CyclicOrUnreachable { missing: Vec<String> },

    /// A node's output was recorded twice within one run
    #[error("Output for node '{node_id}' was already recorded")]
    DuplicateOutput { node_id: String },

    /// A node executor failed; carries the context needed to render
    /// "which step broke"
    #[error("Node '{node_name}' ({node_kind}, id={node_id}) failed: {source}")]
    NodeExecution {
        node_id: String,
        node_kind: String,
        node_name: String,
        #[source]
        source: Box<EngineError>,
    },

    /// Missing or invalid node configuration, raised before any I/O
    /// for that node
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Agent RPC or document store failure
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a malformed workflow error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedWorkflow(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wrap this error with attribution to the node it occurred in.
    pub fn at_node(self, node: &Node) -> Self {
        Self::NodeExecution {
            node_id: node.id.clone(),
            node_kind: node.kind.kind_name().to_string(),
            node_name: node.name.clone(),
            source: Box::new(self),
        }
    }

    /// The id of the node this error is attributed to, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeExecution { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    /// The underlying cause with node attribution peeled off.
    pub fn cause(&self) -> &EngineError {
        match self {
            Self::NodeExecution { source, .. } => source.cause(),
            other => other,
        }
    }
}
