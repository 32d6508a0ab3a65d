// SPDX-License-Identifier: MIT

//! Workflow selection
//!
//! Maps a pipeline context tag to a stored workflow definition. This is
//! configuration around the engine, not part of it: callers resolve a
//! definition here, then hand it to the runner.

use super::engine::graph::WorkflowDefinition;
use crate::services::{DocumentStore, Filter, ServiceError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Collection holding workflow records:
/// `{name, pipelineContext, status, definition}`
pub const WORKFLOWS_COLLECTION: &str = "workflows";

const CATALOG_PAGE: usize = 100;

/// Seam for resolving pipeline context tags to workflow definitions
#[async_trait]
pub trait WorkflowResolver: Send + Sync {
    async fn select(
        &self,
        pipeline_context: &str,
    ) -> Result<Option<WorkflowDefinition>, ServiceError>;
}

/// Store-backed resolver. Prefers an active exact tag match, falls back
/// to any exact tag match, then to a case-insensitive name substring.
pub struct WorkflowCatalog {
    store: Arc<dyn DocumentStore>,
}

impl WorkflowCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All catalog records, for listing surfaces
    pub async fn list(&self) -> Result<Vec<Value>, ServiceError> {
        self.store
            .query(WORKFLOWS_COLLECTION, &[], CATALOG_PAGE)
            .await
    }

    fn decode(record: &Value) -> Option<WorkflowDefinition> {
        serde_json::from_value(record.get("definition")?.clone()).ok()
    }
}

#[async_trait]
impl WorkflowResolver for WorkflowCatalog {
    async fn select(
        &self,
        pipeline_context: &str,
    ) -> Result<Option<WorkflowDefinition>, ServiceError> {
        let active = self
            .store
            .query(
                WORKFLOWS_COLLECTION,
                &[
                    Filter::equals("pipelineContext", pipeline_context),
                    Filter::equals("status", "active"),
                ],
                1,
            )
            .await?;
        if let Some(def) = active.first().and_then(Self::decode) {
            return Ok(Some(def));
        }

        let any = self
            .store
            .query(
                WORKFLOWS_COLLECTION,
                &[Filter::equals("pipelineContext", pipeline_context)],
                1,
            )
            .await?;
        if let Some(def) = any.first().and_then(Self::decode) {
            return Ok(Some(def));
        }

        // last resort: name substring heuristic
        let needle = pipeline_context.to_lowercase();
        let all = self
            .store
            .query(WORKFLOWS_COLLECTION, &[], CATALOG_PAGE)
            .await?;
        for record in &all {
            let name = record
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if name.to_lowercase().contains(&needle) {
                if let Some(def) = Self::decode(record) {
                    return Ok(Some(def));
                }
            }
        }

        Ok(None)
    }
}
