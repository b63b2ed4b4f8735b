//! `{{ ... }}` template expansion.
//!
//! A token names its source by its leading segment:
//! - `{{env.NAME}}` reads an enabled variable of the active environment
//! - `{{context.NAME}}` reads the run's execution context
//! - `{{nodeId::$.json.path}}` or `{{nodeId.field}}` reads the data of a node
//!   that already succeeded in the current run
//!
//! Tokens that cannot be resolved stay in the output verbatim.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::warn;

use crate::{
    common::MemCache,
    model::Environment,
    workflow::{
        jsonpath,
        node::{NodeId, NodeResult},
    },
};

/// Regex pattern for template tokens
/// Format: `{{ source.name }}` or `{{ nodeId::$.path }}`
const TEMPLATE_PATTERN: &str = r"\{\{\s*(.*?)\s*\}\}";

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEMPLATE_PATTERN).expect("template pattern is valid"));

const ENV_SOURCE: &str = "env";
const CONTEXT_SOURCE: &str = "context";

/// Resolves templates against the three scopes of a run.
pub struct Resolver<'a> {
    environment: &'a Environment,
    context: &'a MemCache<String, Value>,
    results: &'a MemCache<NodeId, NodeResult>,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        environment: &'a Environment,
        context: &'a MemCache<String, Value>,
        results: &'a MemCache<NodeId, NodeResult>,
        max_depth: usize,
    ) -> Self {
        Self {
            environment,
            context,
            results,
            max_depth,
        }
    }

    /// Resolve an optional template, absent input stays absent.
    pub fn resolve(
        &self,
        template: Option<&str>,
    ) -> Option<String> {
        template.map(|t| self.resolve_str(t))
    }

    /// Resolve every token of `template`, re-expanding values that contain
    /// tokens themselves until nothing changes or the depth bound is hit.
    pub fn resolve_str(
        &self,
        template: &str,
    ) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }

        let mut current = template.to_string();
        for _ in 0..self.max_depth {
            let next = self.expand_once(&current);
            if next == current || !next.contains("{{") {
                return next;
            }
            current = next;
        }

        warn!(template, max_depth = self.max_depth, "template expansion depth exceeded, leaving remaining tokens unresolved");
        current
    }

    /// Resolve template variables in a JSON Value recursively
    pub fn resolve_json_value(
        &self,
        value: &Value,
    ) -> Value {
        match value {
            Value::String(s) => Value::String(self.resolve_str(s)),
            Value::Array(arr) => Value::Array(arr.iter().map(|v| self.resolve_json_value(v)).collect()),
            Value::Object(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), self.resolve_json_value(v))).collect()),
            _ => value.clone(),
        }
    }

    fn expand_once(
        &self,
        template: &str,
    ) -> String {
        TEMPLATE_RE
            .replace_all(template, |caps: &Captures| self.lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string()))
            .into_owned()
    }

    fn lookup(
        &self,
        expr: &str,
    ) -> Option<String> {
        let (source, path) = match expr.split_once("::") {
            Some((source, path)) => (source.trim(), Some(path.trim())),
            None => match expr.split_once('.') {
                Some((source, path)) => (source, Some(path)),
                None => (expr, None),
            },
        };

        match source {
            ENV_SOURCE => path.and_then(|name| self.environment.get(name)).map(str::to_string),
            CONTEXT_SOURCE => path.and_then(|name| self.context.get(&name.to_string())).map(|v| stringify(&v)),
            node_id => self.lookup_node(node_id, path),
        }
    }

    fn lookup_node(
        &self,
        node_id: &str,
        path: Option<&str>,
    ) -> Option<String> {
        let result = self.results.get(&node_id.to_string()).filter(NodeResult::is_success)?;
        let data = result.data.unwrap_or(Value::Null);

        match path.filter(|p| !p.is_empty()) {
            None => Some(stringify(&data)),
            Some(path) => match jsonpath::first_match(path, &data) {
                Ok(value) => value.map(|v| stringify(&v)),
                Err(err) => {
                    warn!(node_id, path, "{}", err);
                    None
                }
            },
        }
    }
}

/// Strings substitute raw, everything else as its JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
