// SPDX-License-Identifier: MIT

//! Transform node execution

use super::super::error::EngineError;
use super::super::graph::{TransformMode, TransformNode};
use super::super::template::{self, Scope};
use serde_json::{Map, Value};

pub(super) fn execute(def: &TransformNode, scope: &Scope<'_>) -> Result<Value, EngineError> {
    match def.mode {
        TransformMode::Aggregate => {
            // the full predecessor-output map, unchanged
            let mut map = Map::new();
            for id in scope.predecessors {
                if let Some(output) = scope.ctx.output(id) {
                    map.insert(id.clone(), output.clone());
                }
            }
            Ok(Value::Object(map))
        }
        TransformMode::Template => {
            let tmpl = def.template.as_deref().ok_or_else(|| {
                EngineError::configuration("transform node in template mode requires a template")
            })?;
            Ok(template::resolve(tmpl, scope))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::engine::context::RunContext;
    use serde_json::json;

    #[test]
    fn test_aggregate_passes_predecessor_map_through() {
        let mut ctx = RunContext::new("p1");
        ctx.record_output("a", json!({"output": "one"})).unwrap();
        ctx.record_output("b", json!({"n": 2})).unwrap();
        // not a predecessor, must not leak in
        ctx.record_output("c", json!(3)).unwrap();

        let predecessors = vec!["a".to_string(), "b".to_string()];
        let scope = Scope::new(&ctx, &predecessors);
        let def = TransformNode {
            mode: TransformMode::Aggregate,
            template: None,
        };

        let result = execute(&def, &scope).unwrap();
        assert_eq!(
            result,
            json!({"a": {"output": "one"}, "b": {"n": 2}})
        );
    }

    #[test]
    fn test_template_mode_renders() {
        let mut ctx = RunContext::new("p1");
        ctx.record_output("a", json!({"output": "hi"})).unwrap();

        let predecessors = vec!["a".to_string()];
        let scope = Scope::new(&ctx, &predecessors);
        let def = TransformNode {
            mode: TransformMode::Template,
            template: Some("{{prev.output}}!".to_string()),
        };

        assert_eq!(execute(&def, &scope).unwrap(), json!("hi!"));
    }

    #[test]
    fn test_template_mode_without_template_is_config_error() {
        let ctx = RunContext::new("p1");
        let scope = Scope::new(&ctx, &[]);
        let def = TransformNode {
            mode: TransformMode::Template,
            template: None,
        };

        let err = execute(&def, &scope).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
