//! Expansion and ownership bookkeeping.
//!
//! The tracker only knows identifiers. It records which expansion brought
//! which node into the graph, which nodes and relationships came from the
//! last full query, and works out what a collapse may remove without ever
//! touching a rendered element.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Deserialize;

use super::error::{ExplorerError, Result};

/// Relationship type -> ids of the nodes reached through it.
pub type TypeIndex = BTreeMap<String, BTreeSet<String>>;

/// Which later expansions a collapse takes down with it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadePolicy {
	/// Every expansion made after the collapsed one.
	#[default]
	Temporal,
	/// Only expansions whose node is itself removed by the collapse.
	Reachable,
}

/// One expansion event, ready to be recorded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expansion {
	/// Node that was expanded
	pub parent: String,
	/// Direct children in discovery order
	pub children: Vec<String>,
	/// Relationships between the parent and its children
	pub relationships: Vec<String>,
	/// Children grouped by relationship type
	pub by_type: TypeIndex,
}

/// What a collapse would remove. Produced by
/// [`GraphStateTracker::plan_collapse`] without mutating anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollapsePlan {
	/// Expanded nodes being collapsed, in expansion order. Their records are
	/// forgotten by [`GraphStateTracker::apply_collapse`].
	pub collapsed: Vec<String>,
	/// Nodes no remaining expansion owns
	pub nodes_to_remove: Vec<String>,
	/// Relationships no remaining expansion recorded
	pub relationships_to_remove: Vec<String>,
}

/// Ownership records of every expansion since the last query.
#[derive(Debug, Default)]
pub struct GraphStateTracker {
	policy: CascadePolicy,
	initial_nodes: HashSet<String>,
	initial_relationships: HashSet<String>,
	/// child -> expanded nodes that brought it in
	owners: HashMap<String, BTreeSet<String>>,
	/// expanded node ids in the order they were first expanded
	order: Vec<String>,
	children: HashMap<String, Vec<String>>,
	relationships: HashMap<String, BTreeSet<String>>,
	types: HashMap<String, TypeIndex>,
}

impl GraphStateTracker {
	/// Empty tracker using `policy`.
	pub fn new(policy: CascadePolicy) -> Self {
		Self {
			policy,
			..Self::default()
		}
	}

	/// Cascade policy used by [`plan_collapse`](Self::plan_collapse).
	pub fn policy(&self) -> CascadePolicy {
		self.policy
	}

	/// Change the policy. Existing records are kept.
	pub fn set_policy(&mut self, policy: CascadePolicy) {
		self.policy = policy;
	}

	/// Forget everything and start over from a fresh query result.
	pub fn reset<N, R>(&mut self, initial_nodes: N, initial_relationships: R)
	where
		N: IntoIterator,
		N::Item: Into<String>,
		R: IntoIterator,
		R::Item: Into<String>,
	{
		self.owners.clear();
		self.order.clear();
		self.children.clear();
		self.relationships.clear();
		self.types.clear();
		self.initial_nodes = initial_nodes.into_iter().map(Into::into).collect();
		self.initial_relationships = initial_relationships.into_iter().map(Into::into).collect();
	}

	/// Whether `node_id` has an expansion record.
	pub fn is_expanded(&self, node_id: &str) -> bool {
		self.children.contains_key(node_id)
	}

	/// Whether the node came from the last full query.
	pub fn is_initial_node(&self, node_id: &str) -> bool {
		self.initial_nodes.contains(node_id)
	}

	/// Whether the relationship came from the last full query.
	pub fn is_initial_relationship(&self, relationship_id: &str) -> bool {
		self.initial_relationships.contains(relationship_id)
	}

	/// Expanded node ids, oldest first.
	pub fn expanded(&self) -> &[String] {
		&self.order
	}

	/// Expanded nodes that brought `node_id` in.
	pub fn owners_of(&self, node_id: &str) -> Option<&BTreeSet<String>> {
		self.owners.get(node_id)
	}

	/// Children of an expanded node, in discovery order.
	pub fn children_of(&self, node_id: &str) -> Option<&[String]> {
		self.children.get(node_id).map(Vec::as_slice)
	}

	/// Relationships recorded by an expansion.
	pub fn relationships_of(&self, node_id: &str) -> Option<&BTreeSet<String>> {
		self.relationships.get(node_id)
	}

	/// Children of an expansion per relationship type.
	pub fn relationship_types(&self, node_id: &str) -> Option<&TypeIndex> {
		self.types.get(node_id)
	}

	/// Record an expansion. Recording into an already expanded node merges
	/// into its records and keeps its place in the expansion order.
	pub fn record_expansion(&mut self, expansion: Expansion) {
		let Expansion {
			parent,
			children,
			relationships,
			by_type,
		} = expansion;

		for child in &children {
			if *child == parent {
				continue;
			}
			self.owners
				.entry(child.clone())
				.or_default()
				.insert(parent.clone());
		}

		if !self.children.contains_key(&parent) {
			self.order.push(parent.clone());
		}
		let recorded = self.children.entry(parent.clone()).or_default();
		for child in children {
			if child != parent && !recorded.contains(&child) {
				recorded.push(child);
			}
		}

		self.relationships
			.entry(parent.clone())
			.or_default()
			.extend(relationships);

		let index = self.types.entry(parent).or_default();
		for (rel_type, related) in by_type {
			index.entry(rel_type).or_default().extend(related);
		}
	}

	/// Work out what collapsing `node_id` removes. Does not mutate.
	pub fn plan_collapse(&self, node_id: &str) -> Result<CollapsePlan> {
		let Some(position) = self.order.iter().position(|id| id == node_id) else {
			return Err(ExplorerError::NotExpanded(node_id.to_string()));
		};

		let seed = match self.policy {
			CascadePolicy::Temporal => &self.order[position..],
			CascadePolicy::Reachable => &self.order[position..=position],
		};
		let collapsed = self.cascade(seed);
		let collapsing: HashSet<&str> = collapsed.iter().map(String::as_str).collect();
		let remaining: HashSet<&str> = self
			.order
			.iter()
			.map(String::as_str)
			.filter(|id| !collapsing.contains(id))
			.collect();

		let mut seen = HashSet::new();
		let mut nodes_to_remove = Vec::new();
		for expanded in &collapsed {
			for child in self.children_of(expanded).unwrap_or_default() {
				if self.is_initial_node(child) || self.owned_by_any(child, &remaining) {
					continue;
				}
				if seen.insert(child.as_str()) {
					nodes_to_remove.push(child.clone());
				}
			}
		}

		let mut seen = HashSet::new();
		let mut relationships_to_remove = Vec::new();
		for expanded in &collapsed {
			for rel in self.relationships.get(expanded).into_iter().flatten() {
				if self.is_initial_relationship(rel) || self.recorded_by_any(rel, &remaining) {
					continue;
				}
				if seen.insert(rel.as_str()) {
					relationships_to_remove.push(rel.clone());
				}
			}
		}

		Ok(CollapsePlan {
			collapsed,
			nodes_to_remove,
			relationships_to_remove,
		})
	}

	/// Drop the records named by a plan. Call only once the view has
	/// confirmed the removals.
	pub fn apply_collapse(&mut self, plan: &CollapsePlan) {
		let collapsing: HashSet<&str> = plan.collapsed.iter().map(String::as_str).collect();

		// Owner sets only ever name currently expanded nodes.
		self.owners.retain(|_, owners| {
			owners.retain(|owner| !collapsing.contains(owner.as_str()));
			!owners.is_empty()
		});

		for id in &plan.collapsed {
			self.children.remove(id);
			self.relationships.remove(id);
			self.types.remove(id);
		}
		self.order.retain(|id| !collapsing.contains(id.as_str()));
	}

	fn owned_by_any(&self, node_id: &str, candidates: &HashSet<&str>) -> bool {
		self.owners
			.get(node_id)
			.is_some_and(|owners| owners.iter().any(|owner| candidates.contains(owner.as_str())))
	}

	fn recorded_by_any(&self, relationship_id: &str, candidates: &HashSet<&str>) -> bool {
		candidates.iter().any(|expanded| {
			self.relationships
				.get(*expanded)
				.is_some_and(|rels| rels.contains(relationship_id))
		})
	}

	/// Grow the collapse set from `seed` with every expanded node the
	/// collapse would remove, until nothing changes. A removed node cannot
	/// stay expanded, wherever it sits in the expansion order.
	fn cascade(&self, seed: &[String]) -> Vec<String> {
		let mut collapsing: HashSet<&str> = seed.iter().map(String::as_str).collect();
		loop {
			let mut grew = false;
			for expanded in &self.order {
				if collapsing.contains(expanded.as_str()) || self.is_initial_node(expanded) {
					continue;
				}
				let doomed = self.owners.get(expanded).is_some_and(|owners| {
					!owners.is_empty() && owners.iter().all(|o| collapsing.contains(o.as_str()))
				});
				if doomed {
					collapsing.insert(expanded.as_str());
					grew = true;
				}
			}
			if !grew {
				break;
			}
		}
		self.order
			.iter()
			.filter(|id| collapsing.contains(id.as_str()))
			.cloned()
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn expansion(parent: &str, children: &[&str], rels: &[&str]) -> Expansion {
		Expansion {
			parent: parent.into(),
			children: children.iter().map(|c| c.to_string()).collect(),
			relationships: rels.iter().map(|r| r.to_string()).collect(),
			by_type: TypeIndex::new(),
		}
	}

	fn strings(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	/// reset({n1}) -> expand n1 {n2, n3} -> expand n2 {n4}
	fn nested() -> GraphStateTracker {
		let mut tracker = GraphStateTracker::default();
		tracker.reset(["n1"], Vec::<String>::new());
		tracker.record_expansion(expansion(
			"n1",
			&["n2", "n3"],
			&["n1_LIKES_n2", "n1_LIKES_n3"],
		));
		tracker.record_expansion(expansion("n2", &["n1", "n4"], &["n1_LIKES_n2", "n2_OWNS_n4"]));
		tracker
	}

	#[test]
	fn reset_is_idempotent_and_clears_records() {
		let mut tracker = nested();
		tracker.reset(["n1"], ["r1"]);
		tracker.reset(["n1"], ["r1"]);
		assert!(tracker.expanded().is_empty());
		assert!(tracker.owners_of("n2").is_none());
		assert!(tracker.is_initial_node("n1"));
		assert!(tracker.is_initial_relationship("r1"));

		tracker.reset(Vec::<String>::new(), Vec::<String>::new());
		assert!(!tracker.is_initial_node("n1"));
	}

	#[test]
	fn record_expansion_tracks_owners() {
		let mut tracker = GraphStateTracker::default();
		tracker.reset(["n1", "n5"], Vec::<String>::new());
		tracker.record_expansion(expansion("n1", &["n2", "n2"], &["n1_A_n2"]));
		tracker.record_expansion(expansion("n5", &["n2", "n5"], &["n5_B_n2"]));

		assert!(tracker.is_expanded("n1"));
		assert!(!tracker.is_expanded("n2"));
		assert_eq!(tracker.children_of("n1"), Some(&["n2".to_string()][..]));
		assert_eq!(tracker.children_of("n5"), Some(&["n2".to_string()][..]));
		assert_eq!(
			tracker.owners_of("n2").unwrap().iter().collect::<Vec<_>>(),
			vec!["n1", "n5"]
		);
		assert!(tracker.owners_of("n5").is_none());
	}

	#[test]
	fn re_expansion_merges_and_keeps_order() {
		let mut tracker = GraphStateTracker::default();
		let mut first = expansion("n1", &["n2"], &["n1_A_n2"]);
		first.by_type.insert("A".into(), BTreeSet::from(["n2".to_string()]));
		tracker.record_expansion(first);
		tracker.record_expansion(expansion("n3", &["n4"], &["n3_A_n4"]));
		let mut second = expansion("n1", &["n2", "n6"], &["n1_B_n6"]);
		second.by_type.insert("B".into(), BTreeSet::from(["n6".to_string()]));
		tracker.record_expansion(second);

		assert_eq!(tracker.expanded(), &strings(&["n1", "n3"])[..]);
		assert_eq!(tracker.children_of("n1").unwrap(), &strings(&["n2", "n6"])[..]);
		assert_eq!(tracker.relationships_of("n1").unwrap().len(), 2);
		let types = tracker.relationship_types("n1").unwrap();
		assert_eq!(types.keys().collect::<Vec<_>>(), vec!["A", "B"]);
	}

	#[test]
	fn collapse_of_unexpanded_node_is_rejected() {
		let tracker = nested();
		let err = tracker.plan_collapse("n3").unwrap_err();
		assert!(matches!(err, ExplorerError::NotExpanded(id) if id == "n3"));
	}

	#[test]
	fn collapse_cascades_to_later_expansions() {
		let tracker = nested();
		let plan = tracker.plan_collapse("n1").unwrap();
		assert_eq!(
			plan,
			CollapsePlan {
				collapsed: strings(&["n1", "n2"]),
				nodes_to_remove: strings(&["n2", "n3", "n4"]),
				relationships_to_remove: strings(&["n1_LIKES_n2", "n1_LIKES_n3", "n2_OWNS_n4"]),
			}
		);
		// planning is pure
		assert!(tracker.is_expanded("n1"));
		assert!(tracker.is_expanded("n2"));
	}

	#[test]
	fn collapse_keeps_what_earlier_expansions_still_own() {
		let tracker = nested();
		let plan = tracker.plan_collapse("n2").unwrap();
		assert_eq!(plan.collapsed, strings(&["n2"]));
		// n1 is initial, n4 only belongs to n2
		assert_eq!(plan.nodes_to_remove, strings(&["n4"]));
		// n1_LIKES_n2 is still recorded by the remaining n1 expansion
		assert_eq!(plan.relationships_to_remove, strings(&["n2_OWNS_n4"]));
	}

	#[test]
	fn initial_elements_are_never_planned_for_removal() {
		let mut tracker = GraphStateTracker::default();
		tracker.reset(["n1", "n2"], ["n1_LIKES_n2"]);
		tracker.record_expansion(expansion(
			"n1",
			&["n2", "n3"],
			&["n1_LIKES_n2", "n1_LIKES_n3"],
		));
		let plan = tracker.plan_collapse("n1").unwrap();
		assert_eq!(plan.nodes_to_remove, strings(&["n3"]));
		assert_eq!(plan.relationships_to_remove, strings(&["n1_LIKES_n3"]));
	}

	#[test]
	fn apply_collapse_forgets_records_and_empty_owner_sets() {
		let mut tracker = nested();
		let plan = tracker.plan_collapse("n1").unwrap();
		tracker.apply_collapse(&plan);

		assert!(tracker.expanded().is_empty());
		for id in ["n2", "n3", "n4"] {
			assert!(tracker.owners_of(id).is_none(), "{id} still has owners");
		}
		assert!(tracker.children_of("n1").is_none());
		assert!(tracker.relationships_of("n2").is_none());
		assert!(tracker.relationship_types("n2").is_none());
	}

	#[test]
	fn apply_collapse_strips_collapsed_owners_from_kept_nodes() {
		let mut tracker = GraphStateTracker::default();
		tracker.reset(["n1", "n5"], Vec::<String>::new());
		tracker.record_expansion(expansion("n5", &["n2"], &["n5_B_n2"]));
		tracker.record_expansion(expansion("n1", &["n2"], &["n1_A_n2"]));

		let plan = tracker.plan_collapse("n1").unwrap();
		assert!(plan.nodes_to_remove.is_empty());
		assert_eq!(plan.relationships_to_remove, strings(&["n1_A_n2"]));
		tracker.apply_collapse(&plan);

		assert_eq!(
			tracker.owners_of("n2").unwrap().iter().collect::<Vec<_>>(),
			vec!["n5"]
		);
	}

	#[test]
	fn temporal_policy_collapses_unrelated_later_branch() {
		let mut tracker = GraphStateTracker::default();
		tracker.reset(["n1", "n5"], Vec::<String>::new());
		tracker.record_expansion(expansion("n1", &["n2"], &["n1_A_n2"]));
		tracker.record_expansion(expansion("n5", &["n2", "n6"], &["n5_B_n2", "n5_B_n6"]));

		let plan = tracker.plan_collapse("n1").unwrap();
		assert_eq!(plan.collapsed, strings(&["n1", "n5"]));
		assert_eq!(plan.nodes_to_remove, strings(&["n2", "n6"]));
	}

	#[test]
	fn reachable_policy_spares_other_owners() {
		let mut tracker = GraphStateTracker::new(CascadePolicy::Reachable);
		tracker.reset(["n1", "n5"], Vec::<String>::new());
		tracker.record_expansion(expansion("n1", &["n2"], &["n1_A_n2"]));
		tracker.record_expansion(expansion("n5", &["n2", "n6"], &["n5_B_n2", "n5_B_n6"]));

		let plan = tracker.plan_collapse("n1").unwrap();
		assert_eq!(plan.collapsed, strings(&["n1"]));
		assert!(plan.nodes_to_remove.is_empty());
		assert_eq!(plan.relationships_to_remove, strings(&["n1_A_n2"]));
	}

	#[test]
	fn reachable_policy_still_collapses_nested_expansions() {
		let mut tracker = nested();
		tracker.set_policy(CascadePolicy::Reachable);
		let plan = tracker.plan_collapse("n1").unwrap();
		assert_eq!(plan.collapsed, strings(&["n1", "n2"]));
		assert_eq!(plan.nodes_to_remove, strings(&["n2", "n3", "n4"]));
	}

	#[test]
	fn reachable_policy_collapses_earlier_expansion_left_without_owners() {
		let mut tracker = GraphStateTracker::new(CascadePolicy::Reachable);
		tracker.reset(["r", "n"], Vec::<String>::new());
		tracker.record_expansion(expansion("r", &["e"], &["r_A_e"]));
		tracker.record_expansion(expansion("e", &["x"], &["e_B_x"]));
		tracker.record_expansion(expansion("n", &["e"], &["n_C_e"]));

		let plan = tracker.plan_collapse("r").unwrap();
		assert_eq!(plan.collapsed, strings(&["r"]));
		assert!(plan.nodes_to_remove.is_empty());
		tracker.apply_collapse(&plan);
		assert!(tracker.is_expanded("e"));

		// e now hangs off n alone, so collapsing n takes e's expansion too
		let plan = tracker.plan_collapse("n").unwrap();
		assert_eq!(
			plan,
			CollapsePlan {
				collapsed: strings(&["e", "n"]),
				nodes_to_remove: strings(&["x", "e"]),
				relationships_to_remove: strings(&["e_B_x", "n_C_e"]),
			}
		);
		tracker.apply_collapse(&plan);
		assert!(tracker.expanded().is_empty());
		assert!(!tracker.is_expanded("e"));
		assert!(tracker.owners_of("x").is_none());
		assert!(tracker.owners_of("e").is_none());
	}
}
