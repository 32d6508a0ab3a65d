// SPDX-License-Identifier: MIT

//! Execution ordering
//!
//! Kahn's algorithm over the subgraph reachable from the start node. The
//! queue is FIFO and successors are visited in edge insertion order, so a
//! given graph always yields the same sequence. A cycle reachable from the
//! start raises a typed error rather than silently shortening the order.

use super::error::EngineError;
use super::graph::{Node, WorkflowDefinition};
use std::collections::{HashMap, HashSet, VecDeque};

/// Compute the execution order starting at `start_id`.
///
/// Every node in the result appears after all of its predecessors.
pub fn execution_order<'a>(
    graph: &'a WorkflowDefinition,
    start_id: &str,
) -> Result<Vec<&'a Node>, EngineError> {
    // nodes reachable from the start, in discovery order
    let mut reachable: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut frontier: VecDeque<&str> = VecDeque::new();
    if graph.node(start_id).is_some() {
        seen.insert(start_id);
        frontier.push_back(start_id);
    }
    while let Some(id) = frontier.pop_front() {
        reachable.push(id);
        for edge in graph.edges.iter().filter(|e| e.source == id) {
            if seen.insert(edge.target.as_str()) {
                frontier.push_back(edge.target.as_str());
            }
        }
    }

    // in-degree per node, counting only edges whose source is reachable
    let mut in_degree: HashMap<&str, usize> = reachable.iter().map(|id| (*id, 0)).collect();
    for edge in &graph.edges {
        if seen.contains(edge.source.as_str()) {
            if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(start_id);

    let mut order: Vec<&str> = Vec::new();
    // cycle guard: the loop must settle well inside this bound
    let bound = 2 * graph.nodes.len();
    let mut iterations = 0;

    while let Some(id) = queue.pop_front() {
        iterations += 1;
        if iterations > bound {
            break;
        }
        order.push(id);
        for edge in graph.edges.iter().filter(|e| e.source == id) {
            if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(edge.target.as_str());
                }
            }
        }
    }

    if !queue.is_empty() || order.len() != reachable.len() {
        let placed: HashSet<&str> = order.iter().copied().collect();
        let missing: Vec<String> = reachable
            .iter()
            .filter(|id| !placed.contains(*id))
            .map(|id| id.to_string())
            .collect();
        return Err(EngineError::CyclicOrUnreachable { missing });
    }

    Ok(order
        .iter()
        .filter_map(|id| graph.node(id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::engine::graph::{Edge, EndNode, NodeKind};
    use serde_json::json;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            kind,
        }
    }

    fn input(id: &str) -> Node {
        node(id, NodeKind::Input { value: json!(null) })
    }

    fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> WorkflowDefinition {
        WorkflowDefinition {
            id: "w".to_string(),
            name: "test".to_string(),
            nodes,
            edges,
        }
    }

    fn ids(order: &[&Node]) -> Vec<String> {
        order.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_linear_chain() {
        let def = graph(
            vec![
                node("s", NodeKind::Start),
                input("a"),
                input("b"),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("a", "b"),
                Edge::new("b", "e"),
            ],
        );
        let order = execution_order(&def, "s").unwrap();
        assert_eq!(ids(&order), vec!["s", "a", "b", "e"]);
    }

    #[test]
    fn test_diamond_respects_dependencies() {
        let def = graph(
            vec![
                node("s", NodeKind::Start),
                input("a"),
                input("b"),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("s", "b"),
                Edge::new("a", "e"),
                Edge::new("b", "e"),
            ],
        );
        let order = execution_order(&def, "s").unwrap();
        let sequence = ids(&order);

        let position = |id: &str| sequence.iter().position(|n| n == id).unwrap();
        assert_eq!(position("s"), 0);
        assert!(position("a") < position("e"));
        assert!(position("b") < position("e"));
        assert_eq!(sequence.len(), 4);
    }

    #[test]
    fn test_order_is_stable_across_calls() {
        let def = graph(
            vec![
                node("s", NodeKind::Start),
                input("a"),
                input("b"),
                input("c"),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "b"),
                Edge::new("s", "a"),
                Edge::new("s", "c"),
                Edge::new("a", "e"),
                Edge::new("b", "e"),
                Edge::new("c", "e"),
            ],
        );
        let first = ids(&execution_order(&def, "s").unwrap());
        for _ in 0..10 {
            assert_eq!(ids(&execution_order(&def, "s").unwrap()), first);
        }
        // ties broken by edge insertion order: b before a before c
        assert_eq!(first, vec!["s", "b", "a", "c", "e"]);
    }

    #[test]
    fn test_cycle_raises_typed_error() {
        let def = graph(
            vec![
                node("s", NodeKind::Start),
                input("a"),
                input("b"),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("a", "b"),
                Edge::new("b", "a"),
                Edge::new("b", "e"),
            ],
        );
        let err = execution_order(&def, "s").unwrap_err();
        match err {
            EngineError::CyclicOrUnreachable { missing } => {
                assert!(missing.contains(&"a".to_string()));
                assert!(missing.contains(&"b".to_string()));
            }
            other => panic!("expected CyclicOrUnreachable, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_nodes_are_not_ordered() {
        // island nodes are simply not part of the run
        let def = graph(
            vec![
                node("s", NodeKind::Start),
                input("a"),
                input("island"),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![Edge::new("s", "a"), Edge::new("a", "e")],
        );
        let order = execution_order(&def, "s").unwrap();
        assert_eq!(ids(&order), vec!["s", "a", "e"]);
    }

    #[test]
    fn test_edge_from_unreachable_source_is_ignored() {
        // a reachable node fed by an island still executes
        let def = graph(
            vec![
                node("s", NodeKind::Start),
                input("island"),
                input("a"),
                node("e", NodeKind::End(EndNode::default())),
            ],
            vec![
                Edge::new("s", "a"),
                Edge::new("island", "a"),
                Edge::new("a", "e"),
            ],
        );
        let order = execution_order(&def, "s").unwrap();
        assert_eq!(ids(&order), vec!["s", "a", "e"]);
    }

    #[test]
    fn test_missing_start_yields_empty_error() {
        let def = graph(vec![input("a")], vec![]);
        let err = execution_order(&def, "ghost").unwrap_err();
        assert!(matches!(err, EngineError::CyclicOrUnreachable { .. }));
    }
}
