//! One exploration session: the tracker, the view it mirrors, and the
//! generation token that keeps late async results away from a newer graph.

use std::cell::RefCell;

use log::{debug, info};

use super::collapse::CollapseProcessor;
use super::error::{ExplorerError, Result};
use super::expansion::{ExpansionOutcome, ExpansionProcessor};
use super::model::{Direction, Node};
use super::neighbors::{NeighborGroup, NeighborRequest, normalize_neighbors};
use super::service::QueryService;
use super::tracker::{CascadePolicy, CollapsePlan, GraphStateTracker};
use super::view::GraphView;

/// Snapshot taken before an expansion goes to the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingExpansion {
	/// Graph generation the expansion started in
	pub generation: u64,
	/// Node being expanded
	pub node: Node,
	/// Relation filter, if any
	pub rel_type: Option<String>,
}

/// What a double-click did.
#[derive(Clone, Debug, PartialEq)]
pub enum Activation {
	/// The node was expanded
	Expanded(ExpansionOutcome),
	/// The node was collapsed
	Collapsed(CollapsePlan),
}

/// Tracker and view of the graph being explored.
#[derive(Debug)]
pub struct ExplorerSession<V> {
	tracker: GraphStateTracker,
	view: Option<V>,
	generation: u64,
}

impl<V> Default for ExplorerSession<V> {
	fn default() -> Self {
		Self::new(CascadePolicy::default())
	}
}

impl<V> ExplorerSession<V> {
	/// Session without a graph yet.
	pub fn new(policy: CascadePolicy) -> Self {
		Self {
			tracker: GraphStateTracker::new(policy),
			view: None,
			generation: 0,
		}
	}

	/// Bumped on every [`load`](Self::load).
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Expansion records of the current graph.
	pub fn tracker(&self) -> &GraphStateTracker {
		&self.tracker
	}

	/// Current view, once a graph was loaded.
	pub fn view(&self) -> Option<&V> {
		self.view.as_ref()
	}

	/// Mutable access to the current view.
	pub fn view_mut(&mut self) -> Option<&mut V> {
		self.view.as_mut()
	}

	/// Whether `node_id` has an expansion record.
	pub fn is_expanded(&self, node_id: &str) -> bool {
		self.tracker.is_expanded(node_id)
	}
}

impl<V: GraphView> ExplorerSession<V> {
	/// Replace the current graph. The old view is dropped, the generation
	/// moves on and the tracker restarts from the new view's elements.
	pub fn load(&mut self, view: V) -> u64 {
		self.tracker.reset(
			view.nodes().iter().map(|node| node.id.clone()),
			view.relationships().iter().map(|rel| rel.id.clone()),
		);
		self.generation += 1;
		info!(
			"Loaded graph generation {} with {} nodes, {} relationships",
			self.generation,
			view.nodes().len(),
			view.relationships().len()
		);
		self.view = Some(view);
		self.generation
	}

	/// Snapshot what an expansion of `node_id` needs before the backend is
	/// asked.
	pub fn begin_expansion(&self, node_id: &str, rel_type: Option<&str>) -> Result<PendingExpansion> {
		let view = self.view.as_ref().ok_or(ExplorerError::NoGraph)?;
		let node = view
			.node(node_id)
			.cloned()
			.ok_or_else(|| ExplorerError::UnknownNode(node_id.to_string()))?;
		Ok(PendingExpansion {
			generation: self.generation,
			node,
			rel_type: rel_type.map(str::to_string),
		})
	}

	/// Finish an expansion with the rows the backend returned. Results that
	/// belong to an earlier graph are refused and change nothing.
	pub fn complete_expansion(
		&mut self,
		pending: &PendingExpansion,
		groups: &[NeighborGroup],
	) -> Result<ExpansionOutcome> {
		if pending.generation != self.generation {
			return Err(ExplorerError::Stale {
				found: pending.generation,
				current: self.generation,
			});
		}
		let view = self.view.as_mut().ok_or(ExplorerError::NoGraph)?;
		let connections = normalize_neighbors(&pending.node, groups)?;
		ExpansionProcessor::new(&mut self.tracker, view).expand(
			&pending.node,
			&connections,
			pending.rel_type.as_deref(),
		)
	}

	/// Collapse `node_id` in the current view.
	pub fn collapse(&mut self, node_id: &str) -> Result<CollapsePlan> {
		let view = self.view.as_mut().ok_or(ExplorerError::NoGraph)?;
		CollapseProcessor::new(&mut self.tracker, view).collapse(node_id)
	}
}

/// Fetch a node's neighbors and merge them in. `rel_type` restricts the
/// expansion to one relationship type.
///
/// No borrow of the session is held while the backend is being awaited.
pub async fn expand_node<V, S>(
	session: &RefCell<ExplorerSession<V>>,
	service: &S,
	node_id: &str,
	rel_type: Option<&str>,
	direction: Direction,
) -> Result<ExpansionOutcome>
where
	V: GraphView,
	S: QueryService + ?Sized,
{
	let pending = session.borrow().begin_expansion(node_id, rel_type)?;
	let request = NeighborRequest::for_node(&pending.node, direction, rel_type)?;
	let groups = service.fetch_neighbors(&request).await?;
	let outcome = session.borrow_mut().complete_expansion(&pending, &groups);
	if let Err(ExplorerError::Stale { found, current }) = &outcome {
		debug!(
			"Dropping neighbors of {} from generation {} (now {})",
			node_id, found, current
		);
	}
	outcome
}

/// Double-click behavior: collapse an expanded node, expand any other.
pub async fn activate_node<V, S>(
	session: &RefCell<ExplorerSession<V>>,
	service: &S,
	node_id: &str,
	direction: Direction,
) -> Result<Activation>
where
	V: GraphView,
	S: QueryService + ?Sized,
{
	let expanded = session.borrow().is_expanded(node_id);
	if expanded {
		let plan = session.borrow_mut().collapse(node_id)?;
		return Ok(Activation::Collapsed(plan));
	}
	expand_node(session, service, node_id, None, direction)
		.await
		.map(Activation::Expanded)
}
