// SPDX-License-Identifier: MIT

//! Source fetch execution
//!
//! Reads an enumerated external resource scoped to the current project,
//! filtered to active records and capped at a fixed page size. The result
//! carries both the raw records and a flattened text rendering for prompt
//! consumption.

use super::super::context::RunContext;
use super::super::error::EngineError;
use super::super::graph::SourceFetchNode;
use crate::services::{DocumentStore, Filter};
use serde_json::{json, Value};

/// Fixed page size for source reads
pub(super) const PAGE_SIZE: usize = 50;

pub(super) async fn execute(
    def: &SourceFetchNode,
    ctx: &RunContext,
    store: &dyn DocumentStore,
) -> Result<Value, EngineError> {
    let collection = format!("projects/{}/{}", ctx.project_id, def.source.collection());
    let filters = [Filter::equals("status", "active")];

    let records = store.query(&collection, &filters, PAGE_SIZE).await?;
    log::debug!("fetched {} records from {}", records.len(), collection);

    let text = render_records_text(&records);
    Ok(json!({
        "source": def.source,
        "count": records.len(),
        "records": records,
        "text": text,
    }))
}

/// Flatten records into a prompt-friendly block, one record per section.
fn render_records_text(records: &[Value]) -> String {
    records
        .iter()
        .map(|record| match record {
            Value::Object(obj) => obj
                .iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{}: {}", key, s),
                    other => format!("{}: {}", key, other),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
