// SPDX-License-Identifier: MIT

//! Workflow loading
//!
//! Loads workflow definitions from YAML (or JSON, a YAML subset) and
//! validates them before anything runs.

use super::engine::error::EngineError;
use super::engine::graph::WorkflowDefinition;
use std::fs;
use std::path::Path;

/// Loads and validates workflow definitions
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a workflow definition from a file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition, EngineError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a workflow definition from a string
    pub fn parse(content: &str) -> Result<WorkflowDefinition, EngineError> {
        let def: WorkflowDefinition = serde_yaml::from_str(content)
            .map_err(|e| EngineError::malformed(format!("unparseable workflow: {}", e)))?;
        def.validate()?;
        Ok(def)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}
