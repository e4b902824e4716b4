use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Configuration {
	pub log_filters: String,
	/// Identifier of the asset the group session is watching, e.g. a media URL.
	pub track_id: String,
	/// Maximum difference between local and group position before a corrective seek.
	#[serde(with = "humantime_serde")]
	pub drift_tolerance: std::time::Duration,
	/// Period of the coarse drift check that catches silent local drift.
	#[serde(with = "humantime_serde")]
	pub sync_check_interval: std::time::Duration,
}

impl Configuration {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Configuration, ConfigurationError> {
		let text = read_to_string(path)?;

		Ok(Configuration::try_from(text.as_str())?)
	}
}

impl TryFrom<&str> for Configuration {
	type Error = toml::de::Error;

	fn try_from(text: &str) -> Result<Self, Self::Error> {
		toml::from_str(text)
	}
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
	#[error("Failed to deserialize with error: {0}")]
	DeserializationError(#[from] toml::de::Error),
	#[error("IO operation failed: {0}")]
	IoError(#[from] std::io::Error),
}
