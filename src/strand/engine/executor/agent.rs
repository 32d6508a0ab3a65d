// SPDX-License-Identifier: MIT

//! Agent node execution
//!
//! Resolves the node's input template into a task prompt, infers a
//! provider tag from the model name, invokes the external sub-agent RPC,
//! and shapes the textual result according to the node's declared output
//! format.

use super::super::error::EngineError;
use super::super::graph::{AgentNode, OutputFormat};
use super::super::template::{self, Scope};
use crate::services::{AgentRequest, AgentService, ServiceError};
use serde_json::{json, Value};

/// Known model-name fragments and the provider tag they imply. Checked in
/// order; first match wins.
const PROVIDER_PATTERNS: &[(&str, &str)] = &[
    ("claude", "anthropic"),
    ("gpt", "openai"),
    ("o1", "openai"),
    ("gemini", "google"),
    ("deepseek", "deepseek"),
];

/// Provider used when no pattern matches the model name
pub const DEFAULT_PROVIDER: &str = "google";

/// Infer the provider tag from a model name.
pub fn infer_provider(model: &str) -> &'static str {
    let lower = model.to_lowercase();
    PROVIDER_PATTERNS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, provider)| *provider)
        .unwrap_or(DEFAULT_PROVIDER)
}

pub(super) async fn execute(
    def: &AgentNode,
    scope: &Scope<'_>,
    agents: &dyn AgentService,
) -> Result<Value, EngineError> {
    let task_prompt = template::resolve_string(&def.input_template, scope);

    // the secondary instruction rides along in the system prompt
    let system_prompt = match (&def.system_prompt, &def.instructions) {
        (Some(prompt), Some(instructions)) => Some(format!("{}\n\n{}", prompt, instructions)),
        (Some(prompt), None) => Some(prompt.clone()),
        (None, Some(instructions)) => Some(instructions.clone()),
        (None, None) => None,
    };

    let provider = def
        .model
        .as_deref()
        .map(infer_provider)
        .unwrap_or(DEFAULT_PROVIDER);

    let previous_outputs: Vec<Value> = scope
        .predecessors
        .iter()
        .filter_map(|id| scope.ctx.output(id).cloned())
        .collect();

    let request = AgentRequest {
        project_id: scope.ctx.project_id.clone(),
        sub_agent_id: def.agent_id.clone(),
        agent_role: def.agent_role.clone(),
        task_prompt,
        system_prompt,
        previous_outputs,
        model: def.model.clone(),
        provider: Some(provider.to_string()),
        temperature: def.temperature,
        runtime_profile_id: def.runtime_profile_id.clone(),
    };

    log::debug!(
        "Invoking sub-agent '{}' via {} provider",
        def.agent_id,
        provider
    );
    let response = agents.execute(request).await?;

    if !response.success {
        let message = response
            .error
            .unwrap_or_else(|| "agent returned success=false".to_string());
        return Err(ServiceError::Agent { message }.into());
    }

    Ok(shape_output(&response.output, def.output_format))
}

/// Shape the agent's textual result per the declared format.
fn shape_output(raw: &str, format: OutputFormat) -> Value {
    match format {
        OutputFormat::Json => match extract_json_object(raw) {
            Some(parsed) => parsed,
            None => {
                log::warn!("agent output declared json but no object parsed; keeping raw text");
                json!({ "output": raw })
            }
        },
        OutputFormat::Text | OutputFormat::Html => json!({ "output": raw }),
    }
}

/// Parse the outermost `{...}` span, if any.
fn extract_json_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}
