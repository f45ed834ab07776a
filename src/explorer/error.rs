//! Error types for the explorer core.

use thiserror::Error;

/// Result type alias for explorer operations.
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Errors raised while querying, expanding or collapsing the graph.
///
/// None of these are fatal to a session: each one aborts the user operation
/// that triggered it and leaves unrelated state alone.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExplorerError {
	/// Transport failure talking to the query backend
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// The backend answered with an error body or a failing status
	#[error("Service error: {0}")]
	Service(String),

	/// A payload did not have the shape the client expects
	#[error("Malformed payload: {0}")]
	MalformedPayload(String),

	/// Configuration could not be parsed
	#[error("Configuration error: {0}")]
	Config(#[from] toml::de::Error),

	/// Collapse requested for a node that has no expansion record
	#[error("Node is not expanded: {0}")]
	NotExpanded(String),

	/// The view does not hold the node an operation refers to
	#[error("Unknown node: {0}")]
	UnknownNode(String),

	/// Removing a node would leave a relationship pointing at nothing
	#[error("Relationship {relationship} still references node {node}")]
	DanglingRelationship {
		/// Node that was about to be removed
		node: String,
		/// Relationship still attached to it
		relationship: String,
	},

	/// A relationship was added without one of its endpoints
	#[error("Relationship {relationship} references missing node {node}")]
	MissingEndpoint {
		/// Endpoint the view does not hold
		node: String,
		/// Relationship being added
		relationship: String,
	},

	/// The view rejected part of a batch after an earlier part went through
	#[error("View rejected part of the update: {0}")]
	PartialViewFailure(#[source] Box<ExplorerError>),

	/// An async result arrived after its graph was replaced
	#[error("Stale result for graph generation {found}, current is {current}")]
	Stale {
		/// Generation the operation started in
		found: u64,
		/// Generation now loaded
		current: u64,
	},

	/// No graph has been loaded yet
	#[error("No graph loaded")]
	NoGraph,
}

impl ExplorerError {
	/// Errors that signal a bookkeeping mismatch rather than a failed call.
	/// Callers log these and carry on.
	pub fn is_invariant_violation(&self) -> bool {
		matches!(
			self,
			Self::NotExpanded(_)
				| Self::UnknownNode(_)
				| Self::DanglingRelationship { .. }
				| Self::MissingEndpoint { .. }
		)
	}

	/// Errors that come from the query backend or its payloads.
	pub fn is_service_error(&self) -> bool {
		matches!(
			self,
			Self::Http(_) | Self::Service(_) | Self::MalformedPayload(_)
		)
	}
}
