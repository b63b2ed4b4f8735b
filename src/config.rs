use std::{fs, path::Path};

use serde::Deserialize;

use crate::Result;

/// Maximum nested `{{...}}` expansions before the resolver gives up.
pub const DEFAULT_MAX_TEMPLATE_DEPTH: usize = 10;
/// Maximum handler nesting along one dispatch chain.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 256;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// nested template expansion bound, defaults to 10
    pub max_template_depth: usize,
    /// dispatch recursion bound, guards self-loops and cyclic graphs
    pub max_dispatch_depth: usize,
    /// optional per-node timeout in milliseconds, unset means no timeout
    pub node_timeout_ms: Option<u64>,
    /// capacity of the run-scoped result and context caches, raised to the
    /// flow's node count when smaller; context variables past it may be evicted
    pub cache_capacity: usize,
    /// http proxy config
    pub http: HttpConfig,
    /// export config
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// request timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// directory the filesystem export sink writes into
    pub output_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_template_depth: DEFAULT_MAX_TEMPLATE_DEPTH,
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
            node_timeout_ms: None,
            cache_capacity: 4096,
            http: HttpConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "exports".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<RuntimeConfig>(toml_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use crate::RuntimeConfig;

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        max_template_depth = 4
        node_timeout_ms = 1500
        [http]
        timeout_ms = 5000

        [export]
        output_dir = "/tmp/flow-exports"
        "#;
        let config = RuntimeConfig::load_from_str(toml_str).unwrap();
        assert_eq!(config.max_template_depth, 4);
        assert_eq!(config.max_dispatch_depth, 256);
        assert_eq!(config.node_timeout_ms, Some(1500));
        assert_eq!(config.http.timeout_ms, 5000);
        assert_eq!(config.export.output_dir, "/tmp/flow-exports");
    }

    #[test]
    fn test_config_defaults() {
        let config = RuntimeConfig::load_from_str("").unwrap();
        assert_eq!(config.max_template_depth, 10);
        assert!(config.node_timeout_ms.is_none());
        assert_eq!(config.http.timeout_ms, 30_000);
    }

    #[test]
    fn test_config_invalid() {
        assert!(RuntimeConfig::load_from_str("max_template_depth = \"ten\"").is_err());
    }
}
