use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Compiler configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Collection holding vertex documents; the table name vertex sources lower to
    #[validate(length(min = 1, message = "Vertex collection cannot be empty"))]
    pub vertex_collection: String,

    /// Maximum nesting depth of sub-plans (union branches, repeat bodies, ...)
    #[validate(range(
        min = 1,
        max = 1024,
        message = "Max nesting depth must be between 1 and 1024"
    ))]
    pub max_nesting_depth: u32,

    /// Fail when a tag used as a predicate operand has several bindings,
    /// instead of using the most recent one
    pub strict_tags: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            vertex_collection: "Node".to_string(),
            max_nesting_depth: 64,
            strict_tags: true,
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            vertex_collection: env::var("DOCGRAPH_VERTEX_COLLECTION")
                .unwrap_or_else(|_| "Node".to_string()),
            max_nesting_depth: parse_env_var("DOCGRAPH_MAX_NESTING_DEPTH", "64")?,
            strict_tags: parse_env_var("DOCGRAPH_STRICT_TAGS", "true")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides on top of `self`, then validate
    pub fn from_cli(mut self, cli: CliConfig) -> Result<Self, ConfigError> {
        if let Some(vertex_collection) = cli.vertex_collection {
            self.vertex_collection = vertex_collection;
        }
        if let Some(max_nesting_depth) = cli.max_nesting_depth {
            self.max_nesting_depth = max_nesting_depth;
        }
        if cli.lenient_tags {
            self.strict_tags = false;
        }

        self.validate()?;
        Ok(self)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with another configuration (the other one wins)
    pub fn merge(&mut self, other: Self) {
        self.vertex_collection = other.vertex_collection;
        self.max_nesting_depth = other.max_nesting_depth;
        self.strict_tags = other.strict_tags;
    }
}

/// CLI overrides (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub vertex_collection: Option<String>,
    pub max_nesting_depth: Option<u32>,
    pub lenient_tags: bool,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
