use log::Level;
use serde::Deserialize;

use super::error::Result;
use super::model::Direction;
use super::tracker::CascadePolicy;

/// Settings bundled with the app in `explorer.toml`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerConfig {
	/// Base URL of the query backend
	pub api_url: String,
	/// Neighbors a double-click pulls in
	pub direction: Direction,
	/// Which later expansions a collapse takes with it
	pub cascade: CascadePolicy,
	/// Query to run on start; the backend's default query is used when unset
	pub initial_query: Option<String>,
	/// `log` level filter, e.g. `debug`
	pub log_level: String,
}

impl Default for ExplorerConfig {
	fn default() -> Self {
		Self {
			api_url: "http://localhost:3000".to_string(),
			direction: Direction::Both,
			cascade: CascadePolicy::Temporal,
			initial_query: None,
			log_level: "debug".to_string(),
		}
	}
}

impl ExplorerConfig {
	/// Parse a TOML config. Missing keys keep their defaults.
	pub fn from_toml(source: &str) -> Result<Self> {
		Ok(toml::from_str(source)?)
	}

	/// Configured log level, `Debug` when it does not parse.
	pub fn log_level(&self) -> Level {
		self.log_level.parse().unwrap_or(Level::Debug)
	}
}
