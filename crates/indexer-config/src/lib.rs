//! Indexer configuration loading.
//!
//! TOML files with `${VAR}` environment substitution and a small set of
//! environment overrides, validated before use.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("file not found: {0}")]
	FileNotFound(String),

	#[error("parse error: {0}")]
	ParseError(String),

	#[error("validation error: {0}")]
	ValidationError(String),

	#[error("environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("io error: {0}")]
	IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct IndexerConfig {
	#[serde(default)]
	pub indexer: IndexerSection,
	#[serde(default)]
	pub fees: FeesSection,
	#[serde(default)]
	pub exchange: ExchangeSection,
	#[serde(default)]
	pub reduce: ReduceSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerSection {
	#[serde(default = "default_name")]
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeesSection {
	/// Protocol fee charged on the fee-bearing side, in basis points.
	#[serde(default)]
	pub protocol_bps: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSection {
	/// Offset added to foreign-exchange nonce notifications.
	#[serde(default)]
	pub open_sea_nonce_offset: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReduceSection {
	/// Attempts for the optimistic save loop before giving up.
	#[serde(default = "default_max_save_attempts")]
	pub max_save_attempts: u32,
	/// Deadline for a single balance or price oracle call.
	#[serde(default = "default_oracle_timeout_ms")]
	pub oracle_timeout_ms: u64,
}

impl ReduceSection {
	pub fn oracle_timeout(&self) -> Duration {
		Duration::from_millis(self.oracle_timeout_ms)
	}
}

fn default_name() -> String {
	"order-indexer".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_max_save_attempts() -> u32 {
	5
}

fn default_oracle_timeout_ms() -> u64 {
	5_000
}

impl Default for IndexerSection {
	fn default() -> Self {
		Self {
			name: default_name(),
			log_level: default_log_level(),
		}
	}
}

impl Default for FeesSection {
	fn default() -> Self {
		Self { protocol_bps: 0 }
	}
}

impl Default for ExchangeSection {
	fn default() -> Self {
		Self {
			open_sea_nonce_offset: 0,
		}
	}
}

impl Default for ReduceSection {
	fn default() -> Self {
		Self {
			max_save_attempts: default_max_save_attempts(),
			oracle_timeout_ms: default_oracle_timeout_ms(),
		}
	}
}

/// Configuration loader with environment variable substitution.
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "INDEXER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<IndexerConfig, ConfigError> {
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"no configuration file specified".to_string(),
			));
		};

		self.apply_env_overrides(&mut config)?;
		self.validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<IndexerConfig, ConfigError> {
		let content = tokio::fs::read_to_string(file_path).await?;
		let substituted = self.substitute_env_vars(&content)?;
		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value =
				env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut IndexerConfig) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.indexer.log_level = log_level;
		}

		if let Ok(protocol_bps) = env::var(format!("{}PROTOCOL_FEE_BPS", self.env_prefix)) {
			config.fees.protocol_bps = protocol_bps.parse().map_err(|e| {
				ConfigError::ValidationError(format!("invalid protocol fee: {}", e))
			})?;
		}

		Ok(())
	}

	fn validate_config(&self, config: &IndexerConfig) -> Result<(), ConfigError> {
		if config.fees.protocol_bps >= 10_000 {
			return Err(ConfigError::ValidationError(
				"protocol fee must be below 10000 basis points".to_string(),
			));
		}
		if config.reduce.max_save_attempts == 0 {
			return Err(ConfigError::ValidationError(
				"at least one save attempt is required".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[tokio::test]
	async fn test_defaults_fill_missing_sections() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[fees]\nprotocol_bps = 250").unwrap();

		let config = ConfigLoader::new()
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.fees.protocol_bps, 250);
		assert_eq!(config.reduce.max_save_attempts, 5);
		assert_eq!(config.indexer.log_level, "info");
	}

	#[tokio::test]
	async fn test_rejects_out_of_range_fee() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[fees]\nprotocol_bps = 10000").unwrap();

		let err = ConfigLoader::new()
			.with_file(file.path())
			.load()
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::ValidationError(_)));
	}

	#[tokio::test]
	async fn test_missing_env_var_is_reported() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[indexer]\nname = \"${{DOES_NOT_EXIST_XYZ}}\"").unwrap();

		let err = ConfigLoader::new()
			.with_file(file.path())
			.load()
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::EnvVarNotFound(_)));
	}
}
