//! Neighbor query payloads and their normalization into graph elements.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ExplorerError, Result};
use super::graph::GraphData;
use super::model::{Direction, Node, Properties, Relationship};

/// Body of a neighbor query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborRequest {
	/// Primary label of the node
	pub label: String,
	/// Node id
	pub id: String,
	/// Which side to look on
	pub direction: Direction,
	/// Only this relation, compared exactly by the backend
	#[serde(skip_serializing_if = "Option::is_none")]
	pub relationship_type: Option<String>,
}

impl NeighborRequest {
	/// Request for `node`'s neighbors. The backend needs the primary label to
	/// know which relation tables to search.
	pub fn for_node(node: &Node, direction: Direction, relationship_type: Option<&str>) -> Result<Self> {
		let label = node.primary_label().ok_or_else(|| {
			ExplorerError::MalformedPayload(format!("node {} has no label to expand by", node.id))
		})?;
		Ok(Self {
			label: label.to_string(),
			id: node.id.clone(),
			direction,
			relationship_type: relationship_type.map(str::to_string),
		})
	}
}

/// Rows of one relation type around a node, as returned by the backend.
///
/// Each row's first column is the neighbor's property record.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NeighborGroup {
	/// Relation name as stored by the backend
	pub relation: String,
	/// Label of the neighbors for outgoing groups
	#[serde(default)]
	pub destination: Option<String>,
	/// Label of the neighbors for incoming groups
	#[serde(default)]
	pub source: Option<String>,
	/// Outgoing or incoming, never both
	pub direction: Direction,
	/// Result rows
	#[serde(default)]
	pub results: Vec<Vec<Value>>,
}

/// Turn neighbor rows of `center` into unique nodes and relationships.
pub fn normalize_neighbors(center: &Node, groups: &[NeighborGroup]) -> Result<GraphData> {
	let mut connections = GraphData::default();

	for group in groups {
		let (label, outgoing) = match group.direction {
			Direction::Outgoing => (group.destination.as_deref(), true),
			Direction::Incoming => (group.source.as_deref(), false),
			Direction::Both => {
				return Err(ExplorerError::MalformedPayload(format!(
					"relation {} came back without a concrete direction",
					group.relation
				)));
			}
		};
		let label = label.ok_or_else(|| {
			ExplorerError::MalformedPayload(format!(
				"{:?} relation {} has no neighbor label",
				group.direction, group.relation
			))
		})?;

		for row in &group.results {
			let record = row.first().ok_or_else(|| {
				ExplorerError::MalformedPayload(format!("empty row in relation {}", group.relation))
			})?;
			let neighbor = Node::from_record(label, record)?;
			let relationship = if outgoing {
				Relationship::new(&center.id, &group.relation, &neighbor.id, Properties::new())
			} else {
				Relationship::new(&neighbor.id, &group.relation, &center.id, Properties::new())
			};
			connections.upsert_node(neighbor);
			connections.insert_relationship(relationship);
		}
	}

	debug!(
		"Normalized {} groups around {} into {} nodes, {} relationships",
		groups.len(),
		center.id,
		connections.nodes.len(),
		connections.relationships.len()
	);
	Ok(connections)
}

/// Row count of one backend relation around a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeCount {
	/// Relation name as the backend reported it. Typed neighbor requests
	/// must send this one, the backend matches it exactly.
	pub relation: String,
	/// Uppercased type, as it appears on relationships
	pub rel_type: String,
	/// Neighbor rows of this relation
	pub count: usize,
}

/// Row counts per backend relation, sorted by relationship type.
pub fn relationship_type_counts(groups: &[NeighborGroup]) -> Vec<TypeCount> {
	let mut counts: BTreeMap<(String, &str), usize> = BTreeMap::new();
	for group in groups {
		let key = (group.relation.to_uppercase(), group.relation.as_str());
		*counts.entry(key).or_default() += group.results.len();
	}
	counts
		.into_iter()
		.map(|((rel_type, relation), count)| TypeCount {
			relation: relation.to_string(),
			rel_type,
			count,
		})
		.collect()
}
