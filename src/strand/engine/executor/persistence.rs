// SPDX-License-Identifier: MIT

//! Persistence node execution
//!
//! Reads require both a collection and a document id before any I/O
//! happens. Writes resolve their templates, generate a document id when
//! none is configured, and honor the project-scope redirect for
//! well-known collections.

use super::super::error::EngineError;
use super::super::graph::{PersistenceNode, PersistenceOp};
use super::super::template::{self, Scope};
use crate::services::DocumentStore;
use serde_json::{json, Value};
use uuid::Uuid;

/// Collections that must live under the project scope. Writes addressed
/// to these roots are redirected to `projects/{projectId}/<collection>`;
/// this is an access-control compliance rule, not a convenience.
const PROJECT_SCOPED: &[&str] = &["posts", "drafts", "knowledge", "assets", "documents", "exports"];

pub(super) async fn execute(
    def: &PersistenceNode,
    scope: &Scope<'_>,
    store: &dyn DocumentStore,
) -> Result<Value, EngineError> {
    match def.operation {
        PersistenceOp::Read => read(def, scope, store).await,
        PersistenceOp::Write => write(def, scope, store).await,
    }
}

async fn read(
    def: &PersistenceNode,
    scope: &Scope<'_>,
    store: &dyn DocumentStore,
) -> Result<Value, EngineError> {
    if def.collection_template.trim().is_empty() {
        return Err(EngineError::configuration(
            "persistence read requires a collection",
        ));
    }
    let doc_id_template = match def.doc_id_template.as_deref() {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return Err(EngineError::configuration(
                "persistence read requires a docId",
            ))
        }
    };

    let collection = template::resolve_string(&def.collection_template, scope);
    let doc_id = template::resolve_string(doc_id_template, scope);

    let doc = store.get(&collection, &doc_id).await?;
    Ok(doc)
}

async fn write(
    def: &PersistenceNode,
    scope: &Scope<'_>,
    store: &dyn DocumentStore,
) -> Result<Value, EngineError> {
    if def.collection_template.trim().is_empty() {
        return Err(EngineError::configuration(
            "persistence write requires a collection",
        ));
    }
    let data_template = def.data_template.as_deref().ok_or_else(|| {
        EngineError::configuration("persistence write requires a dataTemplate")
    })?;

    let collection = template::resolve_string(&def.collection_template, scope);
    let doc_id = def
        .doc_id_template
        .as_ref()
        .map(|t| template::resolve_string(t, scope))
        .filter(|s| !s.trim().is_empty());
    let data = template::resolve(data_template, scope);

    write_value(store, &scope.ctx.project_id, &collection, doc_id, data).await
}

/// Shared write path, also used by the end node's auto-export. Applies
/// the project-scope redirect and generates a document id when needed.
pub(super) async fn write_value(
    store: &dyn DocumentStore,
    project_id: &str,
    collection: &str,
    doc_id: Option<String>,
    data: Value,
) -> Result<Value, EngineError> {
    let collection = scope_collection(project_id, collection);
    let doc_id = doc_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    // non-object payloads still need a mergeable document shape
    let data = match data {
        obj @ Value::Object(_) => obj,
        other => json!({ "output": other }),
    };

    store.set_merge(&collection, &doc_id, data).await?;
    log::info!("wrote document {}/{}", collection, doc_id);

    Ok(json!({
        "collection": collection,
        "docId": doc_id,
        "written": true,
    }))
}

/// Access-control compliance: well-known root collections are rewritten
/// into the project scope.
pub(super) fn scope_collection(project_id: &str, collection: &str) -> String {
    if PROJECT_SCOPED.contains(&collection) {
        format!("projects/{}/{}", project_id, collection)
    } else {
        collection.to_string()
    }
}
