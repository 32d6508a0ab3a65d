// SPDX-License-Identifier: MIT

//! Template variable resolution
//!
//! Templates embed `{{path}}` tokens resolved against the run context.
//! Paths are dot-separated and begin with one of a closed set of roots:
//! `projectId`, `inputs`, `advancedOptions`, `nodes`, `prev`, or a bare
//! node id kept for backward compatibility. Unresolvable tokens are left
//! verbatim; a typo in a template never aborts a run.

use super::context::RunContext;
use serde_json::{Map, Value};

/// Resolution scope: the run context plus the current node's direct
/// predecessors, which the `prev` root needs.
pub struct Scope<'a> {
    pub ctx: &'a RunContext,
    pub predecessors: &'a [String],
}

impl<'a> Scope<'a> {
    pub fn new(ctx: &'a RunContext, predecessors: &'a [String]) -> Self {
        Self { ctx, predecessors }
    }
}

/// Resolve a template. A template that is exactly one token yields the
/// underlying value (object/array/scalar); anything else renders to a
/// string with non-string values JSON-serialized in place.
pub fn resolve(template: &str, scope: &Scope) -> Value {
    if let Some(path) = single_token(template) {
        return match lookup(path, scope) {
            Some(value) => value,
            None => Value::String(template.to_string()),
        };
    }
    Value::String(render(template, scope))
}

/// Resolve into a string, for prompts, collection names and document ids.
pub fn resolve_string(template: &str, scope: &Scope) -> String {
    match resolve(template, scope) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// The whole template is a single `{{...}}` token, or None
fn single_token(template: &str) -> Option<&str> {
    template
        .trim()
        .strip_prefix("{{")?
        .strip_suffix("}}")
        .map(str::trim)
        .filter(|path| !path.is_empty() && !path.contains("{{") && !path.contains("}}"))
}

/// Interpolate every token in a mixed template
fn render(template: &str, scope: &Scope) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let path = after[..end].trim();
                match lookup(path, scope) {
                    Some(Value::String(s)) => out.push_str(&s),
                    Some(other) => out.push_str(&other.to_string()),
                    // fail open: the token stays verbatim
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                // unterminated token, emit the remainder untouched
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve one dotted path against the scope's roots.
fn lookup(path: &str, scope: &Scope) -> Option<Value> {
    let mut segments = path.split('.');
    let root = segments.next()?;
    let rest: Vec<&str> = segments.collect();

    match root {
        "projectId" if rest.is_empty() => Some(Value::String(scope.ctx.project_id.clone())),
        "projectId" => None,
        "inputs" => walk_map(&scope.ctx.inputs, &rest),
        "advancedOptions" => walk_map(&scope.ctx.advanced_options, &rest),
        "nodes" => {
            let (node_id, sub) = rest.split_first()?;
            walk(scope.ctx.output(node_id)?, sub).cloned()
        }
        "prev" => {
            let first = scope.predecessors.first()?;
            walk(scope.ctx.output(first)?, &rest).cloned()
        }
        // bare node id form
        other => walk(scope.ctx.output(other)?, &rest).cloned(),
    }
}

/// Walk a dotted path into a value. Missing is a first-class outcome, not
/// an exception: any unmatched segment yields None.
fn walk<'v>(value: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    let mut current = value;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn walk_map(map: &Map<String, Value>, segments: &[&str]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    walk(map.get(*first)?, rest).cloned()
}
