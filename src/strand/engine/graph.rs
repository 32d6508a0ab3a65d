// SPDX-License-Identifier: MIT

//! Workflow graph data model
//!
//! Pure data: nodes, edges, and the validation rules applied once at load
//! time. A definition is immutable for the duration of a run and may be
//! shared across concurrent runs.

use super::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A directed workflow graph
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A typed step in the workflow graph
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    /// Unique identifier within the workflow
    pub id: String,
    /// Human label used in error messages
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Kind-specific node payloads
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    Input {
        #[serde(default)]
        value: Value,
    },
    Agent(AgentNode),
    Transform(TransformNode),
    SourceFetch(SourceFetchNode),
    Persistence(PersistenceNode),
    End(EndNode),
}

impl NodeKind {
    /// Wire name of this kind, used in error attribution
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Input { .. } => "input",
            NodeKind::Agent(_) => "agent",
            NodeKind::Transform(_) => "transform",
            NodeKind::SourceFetch(_) => "source_fetch",
            NodeKind::Persistence(_) => "persistence",
            NodeKind::End(_) => "end",
        }
    }
}

/// Agent node payload
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentNode {
    pub agent_id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Secondary instruction merged into the system prompt at call time
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub input_template: String,
    /// Declared shape of the agent's textual output
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub agent_role: Option<String>,
    #[serde(default)]
    pub runtime_profile_id: Option<String>,
}

/// Declared output shape for agent nodes. Parsing follows the declaration,
/// never the content.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Html,
}

/// Transform node payload
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformNode {
    pub mode: TransformMode,
    #[serde(default)]
    pub template: Option<String>,
}

/// How a transform node produces its output
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Pass through the full predecessor-output map unchanged
    Aggregate,
    /// Render the configured template against the run context
    Template,
}

/// Source fetch node payload
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFetchNode {
    pub source: SourceKind,
}

/// Enumerated external resources a workflow may read
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Knowledge,
    Assets,
    Documents,
}

impl SourceKind {
    /// Collection name under the project scope
    pub fn collection(&self) -> &'static str {
        match self {
            SourceKind::Knowledge => "knowledge",
            SourceKind::Assets => "assets",
            SourceKind::Documents => "documents",
        }
    }
}

/// Persistence node payload
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceNode {
    pub operation: PersistenceOp,
    #[serde(default)]
    pub collection_template: String,
    #[serde(default)]
    pub doc_id_template: Option<String>,
    #[serde(default)]
    pub data_template: Option<String>,
}

/// Persistence operations
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceOp {
    Read,
    Write,
}

/// End node payload
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EndNode {
    /// Redirect the run's return value to a specific node's output
    /// (graph-wide lookup, not limited to immediate predecessors)
    #[serde(default)]
    pub final_output_node_id: Option<String>,
    /// Optional persistence side-effect applied to the return value
    #[serde(default)]
    pub auto_export: Option<AutoExport>,
}

/// Best-effort export descriptor attached to an end node
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoExport {
    pub collection_template: String,
    #[serde(default)]
    pub doc_id_template: Option<String>,
}

/// A directed dependency between two nodes
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Node {
    /// Template strings carried by this node's configuration
    pub fn templates(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::Agent(agent) => {
                let mut templates = vec![agent.input_template.as_str()];
                if let Some(prompt) = &agent.system_prompt {
                    templates.push(prompt);
                }
                templates
            }
            NodeKind::Transform(transform) => {
                transform.template.as_deref().into_iter().collect()
            }
            NodeKind::Persistence(persistence) => {
                let mut templates = vec![persistence.collection_template.as_str()];
                if let Some(doc_id) = &persistence.doc_id_template {
                    templates.push(doc_id);
                }
                if let Some(data) = &persistence.data_template {
                    templates.push(data);
                }
                templates
            }
            NodeKind::End(end) => match &end.auto_export {
                Some(export) => {
                    let mut templates = vec![export.collection_template.as_str()];
                    if let Some(doc_id) = &export.doc_id_template {
                        templates.push(doc_id);
                    }
                    templates
                }
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

impl WorkflowDefinition {
    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The unique start node, if present
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| matches!(n.kind, NodeKind::Start))
    }

    /// Direct predecessors of a node, in edge insertion order
    pub fn predecessors(&self, id: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source.clone())
            .collect()
    }

    /// Direct successors of a node, in edge insertion order
    pub fn successors(&self, id: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.clone())
            .collect()
    }

    /// Validate graph shape. Performed once at load time; cycles are the
    /// orderer's job.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut ids: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(EngineError::malformed(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        let starts = self
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Start))
            .count();
        if starts != 1 {
            return Err(EngineError::malformed(format!(
                "expected exactly one start node, found {}",
                starts
            )));
        }
        if !self.nodes.iter().any(|n| matches!(n.kind, NodeKind::End(_))) {
            return Err(EngineError::malformed("workflow has no end node"));
        }

        for edge in &self.edges {
            if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
                return Err(EngineError::DanglingEdge {
                    edge_source: edge.source.clone(),
                    target: edge.target.clone(),
                });
            }
            if edge.source == edge.target {
                return Err(EngineError::malformed(format!(
                    "self-loop on node '{}'",
                    edge.source
                )));
            }
        }

        for node in &self.nodes {
            if let NodeKind::End(end) = &node.kind {
                if let Some(target) = &end.final_output_node_id {
                    if !ids.contains(target.as_str()) {
                        return Err(EngineError::malformed(format!(
                            "end node '{}' redirects to unknown node '{}'",
                            node.id, target
                        )));
                    }
                }
            }
        }

        // the `prev` root is only legal with exactly one predecessor;
        // anything else must address predecessors as nodes.<id>
        for node in &self.nodes {
            let uses_prev = node
                .templates()
                .iter()
                .any(|t| t.contains("{{prev") || t.contains("{{ prev"));
            if uses_prev && self.predecessors(&node.id).len() > 1 {
                return Err(EngineError::malformed(format!(
                    "node '{}' uses the prev root but has multiple predecessors",
                    node.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            kind,
        }
    }

    fn minimal(nodes: Vec<Node>, edges: Vec<Edge>) -> WorkflowDefinition {
        WorkflowDefinition {
            id: "w1".to_string(),
            name: "test".to_string(),
            nodes,
            edges,
        }
    }

    #[test]
    fn test_parse_agent_node_yaml() {
        let yaml = r#"
            id: gen
            name: Generate post
            kind: agent
            agentId: writer
            model: claude-sonnet-4
            temperature: 0.7
            inputTemplate: "Write about {{inputs.topic}}"
            outputFormat: json
        "#;
        let parsed: Node = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.id, "gen");
        match parsed.kind {
            NodeKind::Agent(agent) => {
                assert_eq!(agent.agent_id, "writer");
                assert_eq!(agent.model.as_deref(), Some("claude-sonnet-4"));
                assert_eq!(agent.output_format, OutputFormat::Json);
                assert!(agent.input_template.contains("{{inputs.topic}}"));
            }
            other => panic!("expected agent node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_persistence_node_yaml() {
        let yaml = r#"
            id: save
            kind: persistence
            operation: write
            collectionTemplate: posts
            dataTemplate: "{{prev}}"
        "#;
        let parsed: Node = serde_yaml::from_str(yaml).unwrap();
        match parsed.kind {
            NodeKind::Persistence(p) => {
                assert_eq!(p.operation, PersistenceOp::Write);
                assert_eq!(p.collection_template, "posts");
                assert!(p.doc_id_template.is_none());
            }
            other => panic!("expected persistence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_end_node_with_export_yaml() {
        let yaml = r#"
            id: done
            kind: end
            finalOutputNodeId: gen
            autoExport:
              collectionTemplate: exports
        "#;
        let parsed: Node = serde_yaml::from_str(yaml).unwrap();
        match parsed.kind {
            NodeKind::End(end) => {
                assert_eq!(end.final_output_node_id.as_deref(), Some("gen"));
                assert_eq!(end.auto_export.unwrap().collection_template, "exports");
            }
            other => panic!("expected end node, got {:?}", other),
        }
    }

    #[test]
    fn test_output_format_defaults_to_text() {
        let yaml = r#"
            id: gen
            kind: agent
            agentId: writer
        "#;
        let parsed: Node = serde_yaml::from_str(yaml).unwrap();
        match parsed.kind {
            NodeKind::Agent(agent) => assert_eq!(agent.output_format, OutputFormat::Text),
            other => panic!("expected agent node, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_minimal_graph() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![Edge::new("s", "e")],
        );
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("s", NodeKind::End(EndNode::default())),
            ],
            vec![],
        );
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate node id"));
    }

    #[test]
    fn test_validate_requires_exactly_one_start() {
        let none = minimal(vec![node("e", NodeKind::End(EndNode::default()))], vec![]);
        assert!(none.validate().is_err());

        let two = minimal(
            vec![
                node("s1", NodeKind::Start),
                node("s2", NodeKind::Start),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![],
        );
        let err = two.validate().unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_validate_rejects_dangling_edge() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![Edge::new("s", "ghost")],
        );
        let err = def.validate().unwrap_err();
        assert!(matches!(err, EngineError::DanglingEdge { .. }));
    }

    #[test]
    fn test_validate_rejects_self_loop() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![Edge::new("e", "e")],
        );
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("self-loop"));
    }

    #[test]
    fn test_validate_rejects_unknown_redirect_target() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node(
                    "e",
                    NodeKind::End(EndNode {
                        final_output_node_id: Some("ghost".to_string()),
                        auto_export: None,
                    }),
                ),
            ],
            vec![Edge::new("s", "e")],
        );
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("unknown node"));
    }

    #[test]
    fn test_validate_rejects_prev_with_multiple_predecessors() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("a", NodeKind::Input { value: json!(1) }),
                node("b", NodeKind::Input { value: json!(2) }),
                node(
                    "t",
                    NodeKind::Transform(TransformNode {
                        mode: TransformMode::Template,
                        template: Some("{{prev.output}}".to_string()),
                    }),
                ),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("s", "b"),
                Edge::new("a", "t"),
                Edge::new("b", "t"),
                Edge::new("t", "e"),
            ],
        );
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("prev root"));
    }

    #[test]
    fn test_prev_with_single_predecessor_is_fine() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("a", NodeKind::Input { value: json!(1) }),
                node(
                    "t",
                    NodeKind::Transform(TransformNode {
                        mode: TransformMode::Template,
                        template: Some("{{prev.output}}".to_string()),
                    }),
                ),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("a", "t"),
                Edge::new("t", "e"),
            ],
        );
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_predecessors_follow_edge_insertion_order() {
        let def = minimal(
            vec![
                node("s", NodeKind::Start),
                node("a", NodeKind::Input { value: json!(1) }),
                node("b", NodeKind::Input { value: json!(2) }),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("s", "b"),
                Edge::new("b", "e"),
                Edge::new("a", "e"),
            ],
        );
        assert_eq!(def.predecessors("e"), vec!["b", "a"]);
        assert_eq!(def.successors("s"), vec!["a", "b"]);
    }
}
