//! Incremental graph exploration: expand a node to pull in its neighbors,
//! collapse it to take them away again.

mod collapse;
mod config;
mod error;
mod expansion;
mod graph;
mod model;
mod neighbors;
mod rows;
mod service;
mod session;
mod tracker;
mod view;

#[cfg(test)]
mod testing;

pub use collapse::CollapseProcessor;
pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};
pub use expansion::{ExpansionOutcome, ExpansionProcessor};
pub use graph::GraphData;
pub use model::{Direction, Node, Properties, Relationship, color_for_label, relationship_id};
pub use neighbors::{
	NeighborGroup, NeighborRequest, TypeCount, normalize_neighbors, relationship_type_counts,
};
pub use rows::{QueryPattern, rows_to_graph};
pub use service::{HttpQueryService, QueryService};
pub use session::{Activation, ExplorerSession, PendingExpansion, activate_node, expand_node};
pub use tracker::{CascadePolicy, CollapsePlan, Expansion, GraphStateTracker, TypeIndex};
pub use view::GraphView;
