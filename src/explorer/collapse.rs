use std::collections::HashSet;

use log::{error, info, warn};

use super::error::{ExplorerError, Result};
use super::model::Relationship;
use super::tracker::{CollapsePlan, GraphStateTracker};
use super::view::GraphView;

/// Removes what an expansion (and the expansions nested after it) added.
pub struct CollapseProcessor<'a, V> {
	tracker: &'a mut GraphStateTracker,
	view: &'a mut V,
}

impl<'a, V: GraphView> CollapseProcessor<'a, V> {
	/// Collapse against `tracker` and `view`.
	pub fn new(tracker: &'a mut GraphStateTracker, view: &'a mut V) -> Self {
		Self { tracker, view }
	}

	/// Collapse `node_id`. Relationships go first, then nodes; the tracker is
	/// pruned only after both removals went through.
	///
	/// Returns the plan with the ids that were actually removed from the view.
	pub fn collapse(&mut self, node_id: &str) -> Result<CollapsePlan> {
		let mut plan = self.tracker.plan_collapse(node_id).inspect_err(|err| {
			warn!("Cannot collapse {}: {}", node_id, err);
		})?;

		plan.nodes_to_remove.retain(|id| {
			let shown = self.view.has_node(id);
			if !shown {
				warn!("Node {} planned for removal is not in the view", id);
			}
			shown
		});
		plan.relationships_to_remove.retain(|id| {
			let shown = self.view.has_relationship(id);
			if !shown {
				warn!("Relationship {} planned for removal is not in the view", id);
			}
			shown
		});

		// Anything else still attached to a doomed node has to go too.
		let doomed: HashSet<&str> = plan.nodes_to_remove.iter().map(String::as_str).collect();
		let planned: HashSet<&str> = plan
			.relationships_to_remove
			.iter()
			.map(String::as_str)
			.collect();
		let attached: Vec<&Relationship> = self
			.view
			.relationships()
			.iter()
			.filter(|rel| !planned.contains(rel.id.as_str()))
			.filter(|rel| doomed.contains(rel.from.as_str()) || doomed.contains(rel.to.as_str()))
			.collect();
		// Initial relationships stay, so their endpoints have to stay as well.
		if let Some(rel) = attached
			.iter()
			.find(|rel| self.tracker.is_initial_relationship(&rel.id))
		{
			let node = if doomed.contains(rel.from.as_str()) { &rel.from } else { &rel.to };
			let err = ExplorerError::DanglingRelationship {
				node: node.clone(),
				relationship: rel.id.clone(),
			};
			error!("Cannot collapse {}: {}", node_id, err);
			return Err(err);
		}
		plan.relationships_to_remove
			.extend(attached.iter().map(|rel| rel.id.clone()));

		self.view
			.remove_relationships_with_ids(&plan.relationships_to_remove)
			.inspect_err(|err| error!("Removing relationships for {} failed: {}", node_id, err))?;
		if let Err(err) = self.view.remove_nodes_with_ids(&plan.nodes_to_remove) {
			error!("Removing nodes for {} failed: {}", node_id, err);
			return Err(ExplorerError::PartialViewFailure(Box::new(err)));
		}

		self.tracker.apply_collapse(&plan);
		info!(
			"Collapsed {} ({} expansions): removed {} nodes, {} relationships",
			node_id,
			plan.collapsed.len(),
			plan.nodes_to_remove.len(),
			plan.relationships_to_remove.len()
		);
		Ok(plan)
	}
}
