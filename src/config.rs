//! Process configuration loaded once at startup.
//!
//! Missing or malformed values are returned as [`ConfigError`]s from the loader; callers are
//! expected to treat them as fatal.

// std
use std::path::Path;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const CLIENT_ID: &str = "CLIENT_ID";
const CLIENT_SECRET: &str = "CLIENT_SECRET";
const REDIRECT_URI: &str = "REDIRECT_URI";
const HOST: &str = "HOST";

/// Client registration and public host settings.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Public base URL the browser is sent back to after login.
	pub host: Url,
}
impl BrokerConfig {
	/// Loads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads a dotenv file into the process environment, then reads settings from it.
	///
	/// Variables already present in the environment win over the file.
	pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
			path: path.display().to_string(),
			source,
		})?;

		Self::from_env()
	}

	/// Reads settings through `lookup`; blank values count as missing.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |key: &'static str| {
			lookup(key)
				.map(|value| value.trim().to_owned())
				.filter(|value| !value.is_empty())
				.ok_or(ConfigError::MissingValue { key })
		};
		let url = |key: &'static str| -> Result<Url, ConfigError> {
			let raw = required(key)?;

			Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { key, source })
		};

		Ok(Self {
			client_id: required(CLIENT_ID)?,
			client_secret: TokenSecret::new(required(CLIENT_SECRET)?),
			redirect_uri: url(REDIRECT_URI)?,
			host: url(HOST)?,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
		move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v).to_owned())
	}

	#[test]
	fn loads_every_required_value() {
		let config = BrokerConfig::from_lookup(lookup(&[
			("CLIENT_ID", "client-id"),
			("CLIENT_SECRET", "secret"),
			("REDIRECT_URI", "https://app.example.com/callback"),
			("HOST", "https://app.example.com"),
		]))
		.expect("Complete configuration should load.");

		assert_eq!(config.client_id, "client-id");
		assert_eq!(config.client_secret.expose(), "secret");
		assert_eq!(config.redirect_uri.as_str(), "https://app.example.com/callback");
		assert!(!format!("{config:?}").contains("\"secret\""));
	}

	#[test]
	fn blank_values_are_missing() {
		let err = BrokerConfig::from_lookup(lookup(&[
			("CLIENT_ID", "client-id"),
			("CLIENT_SECRET", "  "),
			("REDIRECT_URI", "https://app.example.com/callback"),
			("HOST", "https://app.example.com"),
		]))
		.expect_err("Blank secrets should be rejected.");

		assert!(matches!(err, ConfigError::MissingValue { key: "CLIENT_SECRET" }));
	}

	#[test]
	fn malformed_urls_name_their_key() {
		let err = BrokerConfig::from_lookup(lookup(&[
			("CLIENT_ID", "client-id"),
			("CLIENT_SECRET", "secret"),
			("REDIRECT_URI", "https://app.example.com/callback"),
			("HOST", "not a url"),
		]))
		.expect_err("Malformed hosts should be rejected.");

		assert!(matches!(err, ConfigError::InvalidUrl { key: "HOST", .. }));
	}

	#[test]
	fn missing_env_file_is_reported() {
		let err = BrokerConfig::from_env_file("/nonexistent/xbl-broker.env")
			.expect_err("Missing dotenv files should be rejected.");

		assert!(matches!(err, ConfigError::EnvFile { .. }));
	}
}
