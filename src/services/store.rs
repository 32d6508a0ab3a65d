// SPDX-License-Identifier: MIT

//! Document store clients
//!
//! The store is a hierarchical key/value store addressed by `(collection,
//! document id)` supporting get, set-with-merge, and equality-filtered
//! queries. Every write carries a server-assigned `updatedAt` timestamp:
//! the in-memory store stamps it itself, the REST store trusts the remote
//! side to do so.

use super::error::ServiceError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::env;
use tokio::sync::RwLock;

/// Timestamp field stamped onto every written document.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Equality filter for collection queries
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub equals: Value,
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: value.into(),
        }
    }
}

/// Seam for the document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `NotFound` if absent.
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Value, ServiceError>;

    /// Merge `data` into the document, creating it if needed.
    async fn set_merge(
        &self,
        collection: &str,
        doc_id: &str,
        data: Value,
    ) -> Result<(), ServiceError>;

    /// Equality-filtered scan of a collection, capped at `limit`.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: usize,
    ) -> Result<Vec<Value>, ServiceError>;
}

/// In-memory store used by tests and local runs
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Value, ServiceError> {
        let collections = self.collections.read().await;
        let doc = collections
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("{}/{}", collection, doc_id)))?;
        Ok(with_id(doc_id, doc))
    }

    async fn set_merge(
        &self,
        collection: &str,
        doc_id: &str,
        data: Value,
    ) -> Result<(), ServiceError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let entry = docs
            .entry(doc_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        merge_into(entry, data);
        if let Value::Object(obj) = entry {
            obj.insert(
                UPDATED_AT_FIELD.to_string(),
                json!(Utc::now().to_rfc3339()),
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: usize,
    ) -> Result<Vec<Value>, ServiceError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(&String, &Value)> = docs
            .iter()
            .filter(|(_, doc)| {
                filters
                    .iter()
                    .all(|f| doc.get(&f.field) == Some(&f.equals))
            })
            .collect();
        // stable listing order regardless of map iteration
        matched.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(matched
            .into_iter()
            .take(limit)
            .map(|(id, doc)| with_id(id, doc.clone()))
            .collect())
    }
}

/// Shallow object merge; non-object payloads replace the document.
fn merge_into(target: &mut Value, data: Value) {
    match (target, data) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (slot, other) => *slot = other,
    }
}

/// Surface the document id on read results without mutating stored data.
fn with_id(doc_id: &str, mut doc: Value) -> Value {
    if let Value::Object(obj) = &mut doc {
        obj.entry("id")
            .or_insert_with(|| Value::String(doc_id.to_string()));
    }
    doc
}

/// REST-backed store client
pub struct HttpStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStore {
    /// Create a new HttpStore
    ///
    /// Requires the `DOCSTORE_BASE_URL` environment variable to be set.
    /// Optionally uses `DOCSTORE_API_KEY` for bearer authentication.
    pub fn new() -> Result<Self, ServiceError> {
        let base_url = env::var("DOCSTORE_BASE_URL")
            .map_err(|_| ServiceError::other("DOCSTORE_BASE_URL must be set"))?;
        Ok(Self::with_base_url(base_url))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: env::var("DOCSTORE_API_KEY").ok(),
        }
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, ServiceError> {
        let joined = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        reqwest::Url::parse(&joined)
            .map_err(|e| ServiceError::other(format!("invalid store URL '{}': {}", joined, e)))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

/// Map HTTP statuses onto the service error taxonomy.
fn map_status(status: StatusCode, resource: &str) -> Option<ServiceError> {
    if status == StatusCode::FORBIDDEN {
        Some(ServiceError::access_denied(resource))
    } else if status == StatusCode::NOT_FOUND {
        Some(ServiceError::not_found(resource))
    } else if !status.is_success() {
        Some(ServiceError::other(format!(
            "store HTTP {} for {}",
            status, resource
        )))
    } else {
        None
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Value, ServiceError> {
        let resource = format!("{}/{}", collection, doc_id);
        let url = self.url(&resource)?;
        let resp = self.authed(self.client.get(url)).send().await?;
        if let Some(err) = map_status(resp.status(), &resource) {
            return Err(err);
        }
        Ok(resp.json::<Value>().await?)
    }

    async fn set_merge(
        &self,
        collection: &str,
        doc_id: &str,
        data: Value,
    ) -> Result<(), ServiceError> {
        let resource = format!("{}/{}", collection, doc_id);
        let url = self.url(&resource)?;
        let resp = self
            .authed(self.client.patch(url).json(&json!({ "data": data, "merge": true })))
            .send()
            .await?;
        if let Some(err) = map_status(resp.status(), &resource) {
            return Err(err);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: usize,
    ) -> Result<Vec<Value>, ServiceError> {
        let resource = format!("{}:query", collection);
        let url = self.url(&resource)?;
        let filter_body: Vec<Value> = filters
            .iter()
            .map(|f| json!({"field": f.field, "equals": f.equals}))
            .collect();
        let resp = self
            .authed(
                self.client
                    .post(url)
                    .json(&json!({"filters": filter_body, "limit": limit})),
            )
            .send()
            .await?;
        if let Some(err) = map_status(resp.status(), &resource) {
            return Err(err);
        }
        Ok(resp.json::<Vec<Value>>().await?)
    }
}
