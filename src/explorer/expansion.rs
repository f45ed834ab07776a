use std::collections::HashSet;

use log::{debug, info};

use super::error::{ExplorerError, Result};
use super::graph::GraphData;
use super::model::{Node, Relationship};
use super::tracker::{Expansion, GraphStateTracker, TypeIndex};
use super::view::GraphView;

/// What an expansion changed in the view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionOutcome {
	/// Node that was expanded
	pub node_id: String,
	/// Nodes that were not shown before
	pub added_nodes: Vec<String>,
	/// Relationships that were not shown before
	pub added_relationships: Vec<String>,
}

/// Merges a node's neighbors into the view and the tracker.
pub struct ExpansionProcessor<'a, V> {
	tracker: &'a mut GraphStateTracker,
	view: &'a mut V,
}

impl<'a, V: GraphView> ExpansionProcessor<'a, V> {
	/// Expand into `view`, recording in `tracker`.
	pub fn new(tracker: &'a mut GraphStateTracker, view: &'a mut V) -> Self {
		Self { tracker, view }
	}

	/// Expand `node` with already normalized `connections`. With a
	/// `rel_type`, only relationships of that type (and the nodes they reach)
	/// take part.
	///
	/// The tracker is only updated once the view accepted the additions.
	pub fn expand(
		&mut self,
		node: &Node,
		connections: &GraphData,
		rel_type: Option<&str>,
	) -> Result<ExpansionOutcome> {
		if !self.view.has_node(&node.id) {
			return Err(ExplorerError::UnknownNode(node.id.clone()));
		}
		let wanted = rel_type.map(str::to_uppercase);

		let candidates: Vec<&Relationship> = connections
			.relationships
			.iter()
			.filter(|rel| rel.touches(&node.id))
			.filter(|rel| wanted.as_deref().is_none_or(|t| rel.rel_type == t))
			.collect();

		let nodes: Vec<Node> = match wanted {
			Some(_) => {
				let reached: HashSet<&str> = candidates
					.iter()
					.map(|rel| rel.other_end(&node.id))
					.collect();
				connections
					.nodes
					.iter()
					.filter(|n| reached.contains(n.id.as_str()))
					.cloned()
					.collect()
			}
			None => connections.nodes.clone(),
		};

		let children: Vec<String> = nodes
			.iter()
			.filter(|n| n.id != node.id)
			.map(|n| n.id.clone())
			.collect();

		let mut by_type = TypeIndex::new();
		for rel in &candidates {
			let related = rel.other_end(&node.id);
			if related == node.id {
				continue;
			}
			by_type
				.entry(rel.rel_type.clone())
				.or_default()
				.insert(related.to_string());
		}

		let shown: HashSet<String> = self
			.view
			.relationships()
			.iter()
			.map(Relationship::natural_key)
			.collect();
		let mut fresh_keys = HashSet::new();
		let new_relationships: Vec<Relationship> = candidates
			.iter()
			.filter(|rel| {
				let key = rel.natural_key();
				!shown.contains(&key) && fresh_keys.insert(key)
			})
			.map(|rel| (*rel).clone())
			.collect();

		let added_nodes: Vec<String> = nodes
			.iter()
			.filter(|n| !self.view.has_node(&n.id))
			.map(|n| n.id.clone())
			.collect();

		self.view.add_and_update(&nodes, &new_relationships)?;

		self.tracker.record_expansion(Expansion {
			parent: node.id.clone(),
			children,
			relationships: candidates.iter().map(|rel| rel.id.clone()).collect(),
			by_type,
		});

		if added_nodes.is_empty() {
			debug!("Expansion of {} added no new nodes", node.id);
		} else {
			self.view.fit(&added_nodes);
		}

		let outcome = ExpansionOutcome {
			node_id: node.id.clone(),
			added_nodes,
			added_relationships: new_relationships.into_iter().map(|rel| rel.id).collect(),
		};
		info!(
			"Expanded {}: {} new nodes, {} new relationships",
			node.id,
			outcome.added_nodes.len(),
			outcome.added_relationships.len()
		);
		Ok(outcome)
	}
}
