//! Active environment snapshot supplied by the environment store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One decrypted environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub is_secret: bool,
}

fn default_enabled() -> bool {
    true
}

impl EnvironmentVariable {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            is_secret: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.is_secret = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Read-only view over the active environment for one run.
///
/// Only enabled variables are visible. Secrecy does not affect lookups,
/// values arrive already decrypted.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, EnvironmentVariable>,
}

impl Environment {
    pub fn new(variables: Vec<EnvironmentVariable>) -> Self {
        Self {
            variables: variables.into_iter().map(|v| (v.key.clone(), v)).collect(),
        }
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.variables.get(key).filter(|v| v.enabled).map(|v| v.value.as_str())
    }

    pub fn variables(&self) -> impl Iterator<Item = &EnvironmentVariable> {
        self.variables.values()
    }
}

impl From<Vec<EnvironmentVariable>> for Environment {
    fn from(variables: Vec<EnvironmentVariable>) -> Self {
        Self::new(variables)
    }
}
