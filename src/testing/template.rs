//! State templating for scenario files
//!
//! Paths, header values and body strings in scenario files may reference the
//! test state with minijinja expressions, e.g.
//! `/category/{{ allCategories[0].id }}`. Rendering is strict: referencing a
//! key that has not been written is an error, never an empty string.
//!
//! A body string that is exactly one `{{ expr }}` keeps the JSON type of the
//! value it evaluates to, so `"{{ produce.id }}"` yields a number.

use std::collections::BTreeSet;
use std::sync::Arc;

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde_json::Value;

use crate::common::Result;
use crate::state::TestState;

/// Shared template environment
#[derive(Debug, Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

impl Templates {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env: Arc::new(env) }
    }

    /// Whether `source` contains template syntax at all
    pub fn is_template(source: &str) -> bool {
        source.contains("{{") || source.contains("{%")
    }

    /// Render `source` against the state
    pub fn render(&self, source: &str, state: &TestState) -> Result<String> {
        if !Self::is_template(source) {
            return Ok(source.to_string());
        }
        Ok(self.env.render_str(source, state.get_all())?)
    }

    /// Inner expression of a string that is a single `{{ expr }}` and nothing else
    fn single_expression(source: &str) -> Option<&str> {
        let inner = source
            .trim()
            .strip_prefix("{{")?
            .strip_suffix("}}")?
            .trim_start_matches('-')
            .trim_end_matches('-');
        if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
            return None;
        }
        Some(inner.trim())
    }

    /// Evaluate a single expression against the state, keeping its JSON type
    pub fn eval(&self, expression: &str, state: &TestState) -> Result<Value> {
        let value = self
            .env
            .compile_expression(expression)?
            .eval(state.get_all())?;
        if value.is_undefined() {
            return Err(minijinja::Error::new(
                ErrorKind::UndefinedError,
                format!("'{}' is undefined", expression),
            )
            .into());
        }
        Ok(serde_json::to_value(&value)?)
    }

    /// Render every string leaf of `value`
    pub fn render_value(&self, value: &Value, state: &TestState) -> Result<Value> {
        Ok(match value {
            Value::String(s) => match Self::single_expression(s) {
                Some(expression) => self.eval(expression, state)?,
                None => Value::String(self.render(s, state)?),
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.render_value(item, state))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.render_value(v, state)?)))
                    .collect::<Result<_>>()?,
            ),
            other => other.clone(),
        })
    }

    /// Top-level state keys referenced by `source`
    pub fn variables(&self, source: &str) -> Result<BTreeSet<String>> {
        if !Self::is_template(source) {
            return Ok(BTreeSet::new());
        }
        let template = self.env.template_from_str(source)?;
        Ok(template.undeclared_variables(false).into_iter().collect())
    }

    /// Top-level state keys referenced by any string leaf of `value`
    pub fn value_variables(&self, value: &Value) -> Result<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        match value {
            Value::String(s) => out.extend(self.variables(s)?),
            Value::Array(items) => {
                for item in items {
                    out.extend(self.value_variables(item)?);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    out.extend(self.value_variables(item)?);
                }
            }
            _ => {}
        }
        Ok(out)
    }

    /// Whether any string leaf of `value` is a template
    pub fn value_has_templates(value: &Value) -> bool {
        match value {
            Value::String(s) => Self::is_template(s),
            Value::Array(items) => items.iter().any(Self::value_has_templates),
            Value::Object(map) => map.values().any(Self::value_has_templates),
            _ => false,
        }
    }
}
