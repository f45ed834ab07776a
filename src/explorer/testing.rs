//! Fakes and fixtures for the explorer tests.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;

use super::error::{ExplorerError, Result};
use super::graph::GraphData;
use super::model::{Node, Properties, Relationship};
use super::neighbors::{NeighborGroup, NeighborRequest};
use super::service::QueryService;
use super::view::GraphView;

pub fn node(id: &str) -> Node {
	Node::new(id, vec!["Person".into()], Properties::new())
}

pub fn rel(from: &str, rel_type: &str, to: &str) -> Relationship {
	Relationship::new(from, rel_type, to, Properties::new())
}

/// Build a connections payload from node ids and `(from, type, to)` triples.
pub fn connections(nodes: &[&str], relationships: &[(&str, &str, &str)]) -> GraphData {
	let mut data = GraphData::default();
	for id in nodes {
		data.upsert_node(node(id));
	}
	for (from, rel_type, to) in relationships {
		data.insert_relationship(rel(from, rel_type, to));
	}
	data
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewCall {
	Add(Vec<String>, Vec<String>),
	RemoveNodes(Vec<String>),
	RemoveRelationships(Vec<String>),
	Fit(Vec<String>),
}

/// In-memory view that records every mutating call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingView {
	pub graph: GraphData,
	pub calls: Vec<ViewCall>,
	pub fits: Vec<Vec<String>>,
	pub fail_adds: bool,
	pub fail_node_removals: bool,
}

impl RecordingView {
	pub fn with_nodes(ids: &[&str]) -> Self {
		Self {
			graph: connections(ids, &[]),
			..Self::default()
		}
	}
}

impl GraphView for RecordingView {
	fn nodes(&self) -> &[Node] {
		&self.graph.nodes
	}

	fn relationships(&self) -> &[Relationship] {
		&self.graph.relationships
	}

	fn add_and_update(&mut self, nodes: &[Node], relationships: &[Relationship]) -> Result<()> {
		self.calls.push(ViewCall::Add(
			nodes.iter().map(|n| n.id.clone()).collect(),
			relationships.iter().map(|r| r.id.clone()).collect(),
		));
		if self.fail_adds {
			return Err(ExplorerError::Service("view refused the batch".into()));
		}
		self.graph.add_and_update(nodes, relationships)
	}

	fn remove_nodes_with_ids(&mut self, ids: &[String]) -> Result<()> {
		self.calls.push(ViewCall::RemoveNodes(ids.to_vec()));
		if self.fail_node_removals {
			return Err(ExplorerError::Service("view refused node removal".into()));
		}
		self.graph.remove_nodes_with_ids(ids)
	}

	fn remove_relationships_with_ids(&mut self, ids: &[String]) -> Result<()> {
		self.calls.push(ViewCall::RemoveRelationships(ids.to_vec()));
		self.graph.remove_relationships_with_ids(ids)
	}

	fn fit(&mut self, node_ids: &[String]) {
		self.calls.push(ViewCall::Fit(node_ids.to_vec()));
		self.fits.push(node_ids.to_vec());
	}
}

/// Query service answering from canned data, keyed by node id. Typed
/// neighbor requests only get the groups whose relation matches exactly.
#[derive(Debug, Default)]
pub struct FakeQueryService {
	pub graph: GraphData,
	pub neighbors: HashMap<String, Vec<NeighborGroup>>,
	pub requests: RefCell<Vec<NeighborRequest>>,
	pub fail_neighbors: bool,
}

#[async_trait(?Send)]
impl QueryService for FakeQueryService {
	async fn execute_query(&self, _query: &str) -> Result<GraphData> {
		Ok(self.graph.clone())
	}

	async fn fetch_neighbors(&self, request: &NeighborRequest) -> Result<Vec<NeighborGroup>> {
		self.requests.borrow_mut().push(request.clone());
		if self.fail_neighbors {
			return Err(ExplorerError::Service("500: backend down".into()));
		}
		let groups = self.neighbors.get(&request.id).into_iter().flatten();
		// the backend compares relation names exactly
		Ok(groups
			.filter(|group| {
				request
					.relationship_type
					.as_ref()
					.is_none_or(|wanted| group.relation == *wanted)
			})
			.cloned()
			.collect())
	}

	async fn node_types(&self) -> Result<Vec<String>> {
		Ok(vec!["Person".into()])
	}

	async fn default_query(&self) -> Result<String> {
		Ok("MATCH (a:Person) RETURN a".into())
	}
}
