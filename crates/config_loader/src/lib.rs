//! # Config Loader
//!
//! Configuration loading and normalization module.
//!
//! Responsibilities:
//! - Parse YAML/TOML/JSON configuration files
//! - Apply environment overrides (`REDIS_PASSWORD`)
//! - Normalize mapping values (string or list) into a `MappingTable`
//! - Validate configuration legality
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("config.yaml")).unwrap();
//! println!("Channels: {:?}", config.mappings.channels());
//! ```

mod parser;
mod validator;

pub use contracts::BridgeConfig;
pub use parser::ConfigFormat;

use contracts::{ContractError, RawBridgeConfig};
use std::path::Path;
use tracing::debug;

/// Environment variable consulted when the file leaves the password empty
pub const REDIS_PASSWORD_ENV: &str = "REDIS_PASSWORD";

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.yaml / .yml / .toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string, applying environment overrides
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<BridgeConfig, ContractError> {
        let env_password = std::env::var(REDIS_PASSWORD_ENV).ok();
        Self::load_with_env(content, format, env_password)
    }

    /// Load configuration from string with an explicit password override source
    pub fn load_with_env(
        content: &str,
        format: ConfigFormat,
        env_password: Option<String>,
    ) -> Result<BridgeConfig, ContractError> {
        let mut raw = parser::parse(content, format)?;
        Self::apply_env_overrides(&mut raw, env_password);
        validator::normalize(raw)
    }

    /// Serialize normalized configuration to TOML string
    pub fn to_toml(config: &BridgeConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize normalized configuration to JSON string
    pub fn to_json(config: &BridgeConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Password from the environment only fills an empty file value
    fn apply_env_overrides(raw: &mut RawBridgeConfig, env_password: Option<String>) {
        if raw.redis.password.is_empty() {
            if let Some(password) = env_password.filter(|p| !p.is_empty()) {
                debug!(env = REDIS_PASSWORD_ENV, "Using Redis password from environment");
                raw.redis.password = password;
            }
        }
    }
}
