use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use crate::explorer::{GraphData, GraphView, Node, Relationship, Result};

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
/// World-space distance within which a click lands on a relationship.
pub const EDGE_HIT_DISTANCE: f64 = 4.0;

const SPAWN_DISTANCE: f64 = 40.0;
const LAYOUT_RADIUS: f64 = 100.0;
const FIT_PADDING: f64 = 60.0;

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub caption: String,
	pub color: String,
}

/// A drawn relationship, resolved to simulation indices.
#[derive(Clone, Debug)]
pub struct EdgeInfo {
	pub id: String,
	pub caption: String,
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

/// Canvas-backed [`GraphView`]: the explorer's graph plus a force simulation
/// laying it out.
pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	/// Id of the selected node or relationship
	pub selected: Option<String>,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	data: GraphData,
	index: HashMap<String, DefaultNodeIdx>,
	edges: Vec<EdgeInfo>,
}

fn simulation() -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

impl ForceGraphState {
	pub fn new(data: GraphData, width: f64, height: f64) -> Self {
		let mut state = Self {
			graph: simulation(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			selected: None,
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
			data,
			index: HashMap::new(),
			edges: Vec::new(),
		};
		state.rebuild();
		state
	}

	pub fn edges(&self) -> &[EdgeInfo] {
		&self.edges
	}

	/// Current simulation positions, keyed by node id.
	pub fn positions(&self) -> HashMap<String, (f64, f64)> {
		let mut positions = HashMap::with_capacity(self.index.len());
		self.graph.visit_nodes(|node| {
			positions.insert(
				node.data.user_data.id.clone(),
				(node.x() as f64, node.y() as f64),
			);
		});
		positions
	}

	pub fn positions_by_index(&self) -> HashMap<DefaultNodeIdx, (f64, f64)> {
		let mut positions = HashMap::with_capacity(self.index.len());
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x() as f64, node.y() as f64));
		});
		positions
	}

	/// Recreate the simulation from `data`. Nodes that were already laid out
	/// keep their position and anchoring; new ones spawn next to a neighbor.
	fn rebuild(&mut self) {
		let mut previous: HashMap<String, (f32, f32, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			previous.insert(
				node.data.user_data.id.clone(),
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		let mut placed: HashMap<String, (f32, f32)> = previous
			.iter()
			.map(|(id, &(x, y, _))| (id.clone(), (x, y)))
			.collect();
		let fresh: Vec<&Node> = self
			.data
			.nodes
			.iter()
			.filter(|node| !previous.contains_key(&node.id))
			.collect();
		for (i, node) in fresh.iter().enumerate() {
			let angle = (i as f64) * 2.0 * PI / fresh.len() as f64;
			let anchor = self
				.data
				.relationships
				.iter()
				.filter(|rel| rel.touches(&node.id))
				.find_map(|rel| placed.get(rel.other_end(&node.id)).copied());
			let (x, y) = match anchor {
				Some((ax, ay)) => (
					ax as f64 + SPAWN_DISTANCE * angle.cos(),
					ay as f64 + SPAWN_DISTANCE * angle.sin(),
				),
				None => (LAYOUT_RADIUS * angle.cos(), LAYOUT_RADIUS * angle.sin()),
			};
			placed.insert(node.id.clone(), (x as f32, y as f32));
		}

		let mut graph = simulation();
		let mut index = HashMap::with_capacity(self.data.nodes.len());
		for node in &self.data.nodes {
			let (x, y) = placed.get(&node.id).copied().unwrap_or_default();
			let is_anchor = previous.get(&node.id).is_some_and(|&(_, _, anchor)| anchor);
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo {
					id: node.id.clone(),
					caption: node.caption.clone(),
					color: node.color.clone(),
				},
			});
			index.insert(node.id.clone(), idx);
		}

		let mut edges = Vec::with_capacity(self.data.relationships.len());
		for rel in &self.data.relationships {
			if let (Some(&source), Some(&target)) = (index.get(&rel.from), index.get(&rel.to)) {
				graph.add_edge(source, target, EdgeData::default());
				edges.push(EdgeInfo {
					id: rel.id.clone(),
					caption: rel.caption.clone(),
					source,
					target,
				});
			}
		}

		// indices from the old simulation mean nothing to the new one
		self.hover = HoverState::default();
		self.drag = DragState::default();
		if self
			.selected
			.as_ref()
			.is_some_and(|id| !index.contains_key(id) && !edges.iter().any(|e| &e.id == id))
		{
			self.selected = None;
		}

		debug!(
			"Rebuilt simulation with {} nodes, {} edges",
			index.len(),
			edges.len()
		);
		self.graph = graph;
		self.index = index;
		self.edges = edges;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn node_id_at(&self, sx: f64, sy: f64) -> Option<String> {
		let idx = self.node_at_position(sx, sy)?;
		self.index
			.iter()
			.find_map(|(id, &i)| (i == idx).then(|| id.clone()))
	}

	/// Id of the relationship closest to a screen point, if one is in reach.
	pub fn relationship_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let positions = self.positions_by_index();
		self.edges
			.iter()
			.filter_map(|edge| {
				let &(x1, y1) = positions.get(&edge.source)?;
				let &(x2, y2) = positions.get(&edge.target)?;
				let distance = segment_distance(gx, gy, x1, y1, x2, y2);
				(distance < EDGE_HIT_DISTANCE).then_some((distance, edge))
			})
			.min_by(|a, b| a.0.total_cmp(&b.0))
			.map(|(_, edge)| edge.id.clone())
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous highlight around while it fades out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.edges {
				if edge.source == idx {
					self.hover.neighbors.insert(edge.target);
				} else if edge.target == idx {
					self.hover.neighbors.insert(edge.source);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn is_selected(&self, id: &str) -> bool {
		self.selected.as_deref() == Some(id)
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

/// Distance from point `(px, py)` to the segment `(x1, y1)-(x2, y2)`.
fn segment_distance(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
	let (dx, dy) = (x2 - x1, y2 - y1);
	let len_sq = dx * dx + dy * dy;
	let t = if len_sq < f64::EPSILON {
		0.0
	} else {
		(((px - x1) * dx + (py - y1) * dy) / len_sq).clamp(0.0, 1.0)
	};
	let (cx, cy) = (x1 + t * dx, y1 + t * dy);
	((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

impl GraphView for ForceGraphState {
	fn nodes(&self) -> &[Node] {
		&self.data.nodes
	}

	fn relationships(&self) -> &[Relationship] {
		&self.data.relationships
	}

	fn add_and_update(&mut self, nodes: &[Node], relationships: &[Relationship]) -> Result<()> {
		self.data.add_and_update(nodes, relationships)?;
		self.rebuild();
		Ok(())
	}

	fn remove_nodes_with_ids(&mut self, ids: &[String]) -> Result<()> {
		self.data.remove_nodes_with_ids(ids)?;
		self.rebuild();
		Ok(())
	}

	fn remove_relationships_with_ids(&mut self, ids: &[String]) -> Result<()> {
		self.data.remove_relationships_with_ids(ids)?;
		self.rebuild();
		Ok(())
	}

	fn fit(&mut self, node_ids: &[String]) {
		let positions = self.positions();
		let points: Vec<(f64, f64)> = node_ids
			.iter()
			.filter_map(|id| positions.get(id).copied())
			.collect();
		if points.is_empty() {
			return;
		}
		let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
		let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for (x, y) in points {
			min_x = min_x.min(x);
			min_y = min_y.min(y);
			max_x = max_x.max(x);
			max_y = max_y.max(y);
		}
		let (box_w, box_h) = (max_x - min_x + FIT_PADDING, max_y - min_y + FIT_PADDING);
		let k = (self.width / box_w).min(self.height / box_h).clamp(0.1, 2.0);
		let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::explorer::{ExplorerError, Properties};

	fn node(id: &str) -> Node {
		Node::new(id, vec!["Person".into()], Properties::new())
	}

	fn rel(from: &str, to: &str) -> Relationship {
		Relationship::new(from, "KNOWS", to, Properties::new())
	}

	fn state() -> ForceGraphState {
		let mut data = GraphData::default();
		data.upsert_node(node("a"));
		data.upsert_node(node("b"));
		data.insert_relationship(rel("a", "b"));
		ForceGraphState::new(data, 800.0, 600.0)
	}

	#[test]
	fn builds_one_edge_per_relationship() {
		let state = state();
		assert_eq!(state.edges().len(), 1);
		assert_eq!(state.edges()[0].id, "a_KNOWS_b");
		assert_eq!(state.positions().len(), 2);
	}

	#[test]
	fn adding_keeps_existing_positions() {
		let mut state = state();
		let before = state.positions();
		state.add_and_update(&[node("c")], &[rel("b", "c")]).unwrap();

		let after = state.positions();
		assert_eq!(after["a"], before["a"]);
		assert_eq!(after["b"], before["b"]);
		let (bx, by) = after["b"];
		let (cx, cy) = after["c"];
		let spawn = ((cx - bx).powi(2) + (cy - by).powi(2)).sqrt();
		assert!((spawn - SPAWN_DISTANCE).abs() < 0.01);
		assert_eq!(state.edges().len(), 2);
	}

	#[test]
	fn removal_refuses_dangling_relationships() {
		let mut state = state();
		let err = state.remove_nodes_with_ids(&["b".into()]).unwrap_err();
		assert!(matches!(err, ExplorerError::DanglingRelationship { .. }));
		assert_eq!(state.nodes().len(), 2);

		state.remove_relationships_with_ids(&["a_KNOWS_b".into()]).unwrap();
		state.remove_nodes_with_ids(&["b".into()]).unwrap();
		assert!(state.edges().is_empty());
		assert_eq!(state.positions().len(), 1);
	}

	#[test]
	fn selection_is_cleared_when_element_goes_away() {
		let mut state = state();
		state.selected = Some("a_KNOWS_b".into());
		state.remove_relationships_with_ids(&["a_KNOWS_b".into()]).unwrap();
		assert_eq!(state.selected, None);
	}

	#[test]
	fn fit_centers_requested_nodes() {
		let mut state = state();
		state.fit(&["a".into(), "b".into()]);
		let positions = state.positions();
		let (ax, ay) = positions["a"];
		let (bx, by) = positions["b"];
		let (mx, my) = ((ax + bx) / 2.0, (ay + by) / 2.0);
		let k = state.transform.k;
		assert!((state.transform.x + mx * k - 400.0).abs() < 1e-6);
		assert!((state.transform.y + my * k - 300.0).abs() < 1e-6);

		let before = state.transform.clone();
		state.fit(&[]);
		assert_eq!(state.transform.x, before.x);
		assert_eq!(state.transform.k, before.k);
	}

	#[test]
	fn hit_tests_nodes_and_relationships() {
		let state = state();
		let positions = state.positions();
		let (ax, ay) = positions["a"];
		let (bx, by) = positions["b"];
		let to_screen = |x: f64, y: f64| {
			(
				x * state.transform.k + state.transform.x,
				y * state.transform.k + state.transform.y,
			)
		};

		let (sx, sy) = to_screen(ax, ay);
		assert_eq!(state.node_id_at(sx, sy).as_deref(), Some("a"));

		let (mx, my) = to_screen((ax + bx) / 2.0, (ay + by) / 2.0);
		assert_eq!(
			state.relationship_at_position(mx, my).as_deref(),
			Some("a_KNOWS_b")
		);
		assert_eq!(state.relationship_at_position(mx + 500.0, my + 500.0), None);
	}

	#[test]
	fn segment_distance_clamps_to_endpoints() {
		assert_eq!(segment_distance(5.0, 3.0, 0.0, 0.0, 10.0, 0.0), 3.0);
		assert_eq!(segment_distance(-4.0, 3.0, 0.0, 0.0, 10.0, 0.0), 5.0);
		assert_eq!(segment_distance(1.0, 1.0, 1.0, 1.0, 1.0, 1.0), 0.0);
	}
}
