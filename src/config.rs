//! Configuration management for the Trinity agent service.
//!
//! Configuration can be set via environment variables:
//! - `OPENAI_API_KEY` - Optional. Enables the OpenAI provider.
//! - `ANTHROPIC_API_KEY` - Optional. Enables the Anthropic provider.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `WORKSPACE_PATH` - Optional. Directory for agent file output and memory. Defaults to `./workspace`.
//! - `DEFAULT_MODEL` - Optional. Model identifier passed to the provider. Defaults to `gpt-4-turbo-preview`.
//! - `MAX_ITERATIONS` - Optional. Default run-loop budget per agent. Defaults to `10`.
//! - `MAX_CONCURRENT_TASKS` - Optional. Task engine semaphore permits. Defaults to `5`.
//!
//! Neither API key is required: without one the agents run in a degraded
//! mode where the think stage reports that no language model is available.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key, if the OpenAI provider should be used
    pub openai_api_key: Option<String>,

    /// Anthropic API key, if the Anthropic provider should be used
    pub anthropic_api_key: Option<String>,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Root directory for agent file output and per-agent memory
    pub workspace_path: PathBuf,

    /// Model identifier passed to whichever provider is configured
    pub default_model: String,

    /// Default iteration budget for the agent run loop
    pub max_iterations: usize,

    /// Semaphore permits for the ancillary task engine
    pub max_concurrent_tasks: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a numeric variable fails to
    /// parse. Absent API keys are not an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./workspace"));

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "gpt-4-turbo-preview".to_string());

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
            })?;

        let max_concurrent_tasks = std::env::var("MAX_CONCURRENT_TASKS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MAX_CONCURRENT_TASKS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            openai_api_key,
            anthropic_api_key,
            host,
            port,
            workspace_path,
            default_model,
            max_iterations,
            max_concurrent_tasks,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(workspace_path: PathBuf) -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            host: "127.0.0.1".to_string(),
            port: 8000,
            workspace_path,
            default_model: "gpt-4-turbo-preview".to_string(),
            max_iterations: 10,
            max_concurrent_tasks: 5,
        }
    }
}
