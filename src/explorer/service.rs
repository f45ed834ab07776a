//! Query backend client.

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::config::ExplorerConfig;
use super::error::{ExplorerError, Result};
use super::graph::GraphData;
use super::neighbors::{NeighborGroup, NeighborRequest};
use super::rows::rows_to_graph;

/// Backend the explorer pulls graph data from.
#[async_trait(?Send)]
pub trait QueryService {
	/// Run a top-level query. The text is forwarded untouched.
	async fn execute_query(&self, query: &str) -> Result<GraphData>;

	/// Neighbor rows of a node, grouped by relation type.
	async fn fetch_neighbors(&self, request: &NeighborRequest) -> Result<Vec<NeighborGroup>>;

	/// Node labels known to the backend.
	async fn node_types(&self) -> Result<Vec<String>>;

	/// A query the backend suggests to start with.
	async fn default_query(&self) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
	query: &'a str,
}

/// Envelope of every backend answer.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
	results: Option<T>,
	query: Option<String>,
	error: Option<String>,
}

/// [`QueryService`] over the backend's JSON HTTP API.
#[derive(Clone, Debug)]
pub struct HttpQueryService {
	base_url: String,
	client: Client,
}

impl HttpQueryService {
	/// Service for the backend at `base_url`.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client: Client::new(),
		}
	}

	/// Service for the configured `api_url`.
	pub fn from_config(config: &ExplorerConfig) -> Self {
		Self::new(&config.api_url)
	}

	/// Full URL of an API path.
	pub fn endpoint(&self, path: &str) -> String {
		format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
	}

	async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
	) -> Result<ApiResponse<T>> {
		let url = self.endpoint(path);
		debug!("POST {}", url);
		let response = self.client.post(&url).json(body).send().await?;
		Self::decode(response).await
	}

	async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>> {
		let status = response.status();
		let text = response.text().await?;
		parse_body(status, &text)
	}
}

/// Undecodable bodies are malformed payloads; error bodies and failing
/// statuses are service errors.
fn parse_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<ApiResponse<T>> {
	let body: ApiResponse<T> = serde_json::from_str(text)
		.map_err(|err| ExplorerError::MalformedPayload(format!("{status}: {err}")))?;
	if let Some(message) = &body.error {
		error!("Backend returned {}: {}", status, message);
		return Err(ExplorerError::Service(format!("{status}: {message}")));
	}
	if !status.is_success() {
		return Err(ExplorerError::Service(format!("backend returned {status}")));
	}
	Ok(body)
}

fn results<T>(body: ApiResponse<T>, what: &str) -> Result<T> {
	body.results
		.ok_or_else(|| ExplorerError::MalformedPayload(format!("{what} response has no results")))
}

#[async_trait(?Send)]
impl QueryService for HttpQueryService {
	async fn execute_query(&self, query: &str) -> Result<GraphData> {
		let body = self
			.post::<_, Vec<Map<String, Value>>>("query", &QueryRequest { query })
			.await?;
		rows_to_graph(query, &results(body, "query")?)
	}

	async fn fetch_neighbors(&self, request: &NeighborRequest) -> Result<Vec<NeighborGroup>> {
		let body = self.post("neighbors", request).await?;
		results(body, "neighbors")
	}

	async fn node_types(&self) -> Result<Vec<String>> {
		let body = self.post("node-types", &Map::new()).await?;
		results(body, "node-types")
	}

	async fn default_query(&self) -> Result<String> {
		let url = self.endpoint("default-query");
		debug!("GET {}", url);
		let response = self.client.get(&url).send().await?;
		let body: ApiResponse<Value> = Self::decode(response).await?;
		body.query
			.ok_or_else(|| ExplorerError::MalformedPayload("default-query response has no query".into()))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn endpoints_join_cleanly() {
		let service = HttpQueryService::new("http://localhost:3000/");
		assert_eq!(service.endpoint("query"), "http://localhost:3000/api/query");
		assert_eq!(
			service.endpoint("/node-types"),
			"http://localhost:3000/api/node-types"
		);
	}

	#[test]
	fn undecodable_body_is_a_malformed_payload() {
		let err = parse_body::<Vec<String>>(StatusCode::OK, "<html>oops</html>").unwrap_err();
		assert!(matches!(&err, ExplorerError::MalformedPayload(msg) if msg.starts_with("200 OK")));
		assert!(err.is_service_error());

		let err = parse_body::<Vec<String>>(StatusCode::BAD_REQUEST, r#"{"error": "bad label"}"#)
			.unwrap_err();
		assert!(matches!(&err, ExplorerError::Service(msg) if msg.ends_with("bad label")));

		let err = parse_body::<Vec<String>>(StatusCode::BAD_GATEWAY, "{}").unwrap_err();
		assert!(matches!(err, ExplorerError::Service(_)));
	}

	#[test]
	fn envelope_reads_results_and_errors() {
		let ok: ApiResponse<Vec<String>> =
			serde_json::from_value(json!({"results": ["Drug", "Disease"]})).unwrap();
		assert_eq!(results(ok, "node-types").unwrap(), vec!["Drug", "Disease"]);

		let failed: ApiResponse<Vec<String>> =
			serde_json::from_value(json!({"error": "Query is required"})).unwrap();
		assert_eq!(failed.error.as_deref(), Some("Query is required"));
		assert!(matches!(
			results(failed, "query"),
			Err(ExplorerError::MalformedPayload(_))
		));

		let default: ApiResponse<Value> =
			serde_json::from_value(json!({"query": "MATCH (a) RETURN a"})).unwrap();
		assert_eq!(default.query.as_deref(), Some("MATCH (a) RETURN a"));
	}

	#[test]
	fn neighbor_envelope_decodes_groups() {
		let body: ApiResponse<Vec<NeighborGroup>> = serde_json::from_value(json!({
			"results": [{
				"relation": "TREATS",
				"destination": "Disease",
				"direction": "outgoing",
				"results": [[{"id": "X1"}]]
			}]
		}))
		.unwrap();
		let groups = results(body, "neighbors").unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].destination.as_deref(), Some("Disease"));
	}
}
