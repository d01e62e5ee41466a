//! Configuration system
//!
//! Tunables for command-list capacity, radix-sort scratch sizing, and the
//! default commit strategy. Configs are plain serde structs loadable from
//! TOML or RON files.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Which commit point a command list should use by default
///
/// Callers choose based on batch size and latency tolerance: sequential for
/// tiny batches, material-sorted for typical frames, multithreaded-sorted
/// when classification and sorting are worth moving off the submission path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Strict FIFO replay of every command
    Sequential,
    /// Draw commands radix-sorted by key, state changes kept in enqueue order
    MaterialSorted,
    /// Material sorting performed on a background worker thread
    MultithreadedSorted,
}

/// Configuration for a [`crate::render::CommandList`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandListConfig {
    /// Pre-allocated capacity of the pending command queue
    pub initial_capacity: usize,

    /// Pre-allocated capacity of the radix-sort scratch arena (in commands)
    pub sort_scratch_capacity: usize,

    /// Default commit strategy for `execute_with_strategy`
    pub strategy: ExecutionStrategy,
}

impl Default for CommandListConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            sort_scratch_capacity: 4096,
            strategy: ExecutionStrategy::MaterialSorted,
        }
    }
}

impl Config for CommandListConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CommandListConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.strategy, ExecutionStrategy::MaterialSorted);
    }

    #[test]
    fn test_parse_toml_strategy_names() {
        let config: CommandListConfig = toml::from_str(
            r#"
            initial_capacity = 64
            sort_scratch_capacity = 256
            strategy = "multithreaded_sorted"
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.sort_scratch_capacity, 256);
        assert_eq!(config.strategy, ExecutionStrategy::MultithreadedSorted);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CommandListConfig {
            initial_capacity: 32,
            sort_scratch_capacity: 128,
            strategy: ExecutionStrategy::Sequential,
        };

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: CommandListConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.initial_capacity, 32);
        assert_eq!(parsed.strategy, ExecutionStrategy::Sequential);
    }
}
