use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use super::error::{ExplorerError, Result};
use super::model::{Node, Relationship};
use super::view::GraphView;

/// Ordered, deduplicated set of nodes and relationships.
///
/// Used both as the payload returned by the query layer and as the model
/// backing a view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	/// Nodes in insertion order
	pub nodes: Vec<Node>,
	/// Relationships in insertion order
	pub relationships: Vec<Relationship>,
}

impl GraphData {
	/// No nodes and no relationships.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.relationships.is_empty()
	}

	/// Node with the given id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// Relationship with the given id.
	pub fn relationship(&self, id: &str) -> Option<&Relationship> {
		self.relationships.iter().find(|rel| rel.id == id)
	}

	/// Insert a node, or merge it into the existing node with the same id.
	/// Returns `true` when the node was new.
	pub fn upsert_node(&mut self, node: Node) -> bool {
		match self.nodes.iter_mut().find(|existing| existing.id == node.id) {
			Some(existing) => {
				existing.merge(&node);
				false
			}
			None => {
				self.nodes.push(node);
				true
			}
		}
	}

	/// Insert a relationship unless one with the same natural key exists.
	/// Returns `true` when it was inserted.
	pub fn insert_relationship(&mut self, relationship: Relationship) -> bool {
		let key = relationship.natural_key();
		if self.relationships.iter().any(|rel| rel.natural_key() == key) {
			return false;
		}
		self.relationships.push(relationship);
		true
	}

	/// Node ids, in order.
	pub fn node_ids(&self) -> impl Iterator<Item = &str> {
		self.nodes.iter().map(|node| node.id.as_str())
	}

	/// Relationship ids, in order.
	pub fn relationship_ids(&self) -> impl Iterator<Item = &str> {
		self.relationships.iter().map(|rel| rel.id.as_str())
	}
}

impl GraphView for GraphData {
	fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	fn relationships(&self) -> &[Relationship] {
		&self.relationships
	}

	fn add_and_update(&mut self, nodes: &[Node], relationships: &[Relationship]) -> Result<()> {
		// Validate the whole batch before touching anything.
		let incoming: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
		for rel in relationships {
			for endpoint in [&rel.from, &rel.to] {
				if !incoming.contains(endpoint.as_str()) && self.node(endpoint).is_none() {
					return Err(ExplorerError::MissingEndpoint {
						node: endpoint.clone(),
						relationship: rel.id.clone(),
					});
				}
			}
		}

		for node in nodes {
			self.upsert_node(node.clone());
		}
		for rel in relationships {
			self.insert_relationship(rel.clone());
		}
		Ok(())
	}

	fn remove_nodes_with_ids(&mut self, ids: &[String]) -> Result<()> {
		let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
		if let Some(rel) = self
			.relationships
			.iter()
			.find(|rel| doomed.contains(rel.from.as_str()) || doomed.contains(rel.to.as_str()))
		{
			let node = if doomed.contains(rel.from.as_str()) { &rel.from } else { &rel.to };
			return Err(ExplorerError::DanglingRelationship {
				node: node.clone(),
				relationship: rel.id.clone(),
			});
		}

		for id in ids {
			if self.node(id).is_none() {
				warn!("Asked to remove unknown node {}", id);
			}
		}
		self.nodes.retain(|node| !doomed.contains(node.id.as_str()));
		Ok(())
	}

	fn remove_relationships_with_ids(&mut self, ids: &[String]) -> Result<()> {
		let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
		for id in ids {
			if self.relationship(id).is_none() {
				warn!("Asked to remove unknown relationship {}", id);
			}
		}
		self.relationships.retain(|rel| !doomed.contains(rel.id.as_str()));
		Ok(())
	}

	fn fit(&mut self, _node_ids: &[String]) {}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::explorer::model::Properties;

	fn node(id: &str) -> Node {
		Node::new(id, vec!["Person".into()], Properties::new())
	}

	fn rel(from: &str, rel_type: &str, to: &str) -> Relationship {
		Relationship::new(from, rel_type, to, Properties::new())
	}

	#[test]
	fn upsert_merges_existing_node() {
		let mut graph = GraphData::default();
		assert!(graph.upsert_node(node("n1")));
		let mut props = Properties::new();
		props.insert("name".into(), json!("Ada"));
		assert!(!graph.upsert_node(Node::new("n1", vec!["Person".into()], props)));
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(graph.nodes[0].caption, "Ada");
	}

	#[test]
	fn relationships_dedupe_by_natural_key() {
		let mut graph = GraphData::default();
		assert!(graph.insert_relationship(rel("n1", "likes", "n2")));
		assert!(!graph.insert_relationship(rel("n1", "LIKES", "n2")));
		assert!(graph.insert_relationship(rel("n2", "LIKES", "n1")));
		assert_eq!(graph.relationships.len(), 2);
	}

	#[test]
	fn add_rejects_relationship_without_endpoint() {
		let mut graph = GraphData::default();
		graph.add_and_update(&[node("n1")], &[]).unwrap();
		let err = graph
			.add_and_update(&[], &[rel("n1", "LIKES", "n2")])
			.unwrap_err();
		assert!(matches!(err, ExplorerError::MissingEndpoint { ref node, .. } if node == "n2"));
		assert!(graph.relationships.is_empty());
	}

	#[test]
	fn removing_node_with_attached_relationship_fails() {
		let mut graph = GraphData::default();
		graph
			.add_and_update(&[node("n1"), node("n2")], &[rel("n1", "LIKES", "n2")])
			.unwrap();

		let err = graph.remove_nodes_with_ids(&["n2".into()]).unwrap_err();
		assert!(matches!(err, ExplorerError::DanglingRelationship { .. }));
		assert_eq!(graph.nodes.len(), 2);

		graph
			.remove_relationships_with_ids(&["n1_LIKES_n2".into()])
			.unwrap();
		graph.remove_nodes_with_ids(&["n2".into()]).unwrap();
		assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec!["n1"]);
	}

	#[test]
	fn unknown_ids_are_ignored_on_removal() {
		let mut graph = GraphData::default();
		graph.add_and_update(&[node("n1")], &[]).unwrap();
		graph.remove_nodes_with_ids(&["ghost".into()]).unwrap();
		graph
			.remove_relationships_with_ids(&["ghost_X_n1".into()])
			.unwrap();
		assert_eq!(graph.nodes.len(), 1);
	}
}
