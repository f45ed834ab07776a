//! The rendering surface the processors drive.

use super::error::Result;
use super::model::{Node, Relationship};

/// A live graph view. The processors only ever talk to the rendered graph
/// through this trait; they never hold rendered objects themselves.
pub trait GraphView {
	/// Nodes currently shown.
	fn nodes(&self) -> &[Node];

	/// Relationships currently shown.
	fn relationships(&self) -> &[Relationship];

	/// Add new elements and merge properties into existing nodes.
	/// Relationships whose natural key is already shown are ignored.
	fn add_and_update(&mut self, nodes: &[Node], relationships: &[Relationship]) -> Result<()>;

	/// Remove nodes. Must fail rather than leave a relationship dangling.
	fn remove_nodes_with_ids(&mut self, ids: &[String]) -> Result<()>;

	/// Remove relationships. Unknown ids are skipped.
	fn remove_relationships_with_ids(&mut self, ids: &[String]) -> Result<()>;

	/// Bring the given nodes into the viewport. Empty input is a no-op.
	fn fit(&mut self, node_ids: &[String]);

	/// Shown node with the given id.
	fn node(&self, id: &str) -> Option<&Node> {
		self.nodes().iter().find(|node| node.id == id)
	}

	/// Whether the node is shown.
	fn has_node(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	/// Whether the relationship is shown.
	fn has_relationship(&self, id: &str) -> bool {
		self.relationships().iter().any(|rel| rel.id == id)
	}
}
