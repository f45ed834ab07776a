//! Conversion of tabular query results into graph elements.
//!
//! The query text itself is opaque to the explorer; only the variable
//! bindings of its `MATCH` path pattern are read, so that result columns can
//! be told apart as nodes or relationships.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde_json::{Map, Value};

use super::error::Result;
use super::graph::GraphData;
use super::model::{Node, Properties, Relationship};

/// Relationship type used when neither the pattern nor the record names one.
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "RELATED";

static MATCH_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?is)\bMATCH\b(.*?)(?:\bCOLUMNS\b|\bRETURN\b|$)").expect("valid MATCH regex")
});

static ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?x)
		\(\s*(?P<node_var>\w+)?\s*(?::\s*(?P<node_label>\w+))?[^)]*\)
		| (?P<left><)?-\[\s*(?P<edge_var>\w+)?\s*(?::\s*(?P<edge_type>\w+))?[^\]]*\]-(?P<right>>)?
		| ,
		",
	)
	.expect("valid pattern element regex")
});

/// One `-[..]-` element of a path pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeBinding {
	/// Relationship variable
	pub var: Option<String>,
	/// Type from the pattern, if given
	pub rel_type: Option<String>,
	/// Node variable the arrow leaves
	pub from: Option<String>,
	/// Node variable the arrow points at
	pub to: Option<String>,
}

/// Variable bindings of a `MATCH` path pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryPattern {
	/// node variable -> label (`None` when unlabeled)
	pub nodes: HashMap<String, Option<String>>,
	/// Relationship elements, in pattern order
	pub edges: Vec<EdgeBinding>,
}

impl QueryPattern {
	/// Read the bindings of the first `MATCH` clause. Unparseable text gives an empty pattern.
	pub fn parse(query: &str) -> Self {
		let mut pattern = Self::default();
		let Some(clause) = MATCH_CLAUSE.captures(query).and_then(|c| c.get(1)) else {
			return pattern;
		};

		let mut previous: Option<String> = None;
		// edge waiting for its right-hand node, with its arrow pointing left
		let mut pending: Option<(EdgeBinding, bool)> = None;

		for element in ELEMENT.captures_iter(clause.as_str()) {
			let text = &element[0];
			if text == "," {
				previous = None;
				pending = None;
			} else if text.starts_with('(') {
				let var = element.name("node_var").map(|m| m.as_str().to_string());
				if let Some(var) = &var {
					let label = element.name("node_label").map(|m| m.as_str().to_string());
					let entry = pattern.nodes.entry(var.clone()).or_insert(None);
					if label.is_some() {
						*entry = label;
					}
				}
				if let Some((mut edge, points_left)) = pending.take() {
					if points_left {
						edge.from = var.clone();
						edge.to = previous.clone();
					} else {
						edge.from = previous.clone();
						edge.to = var.clone();
					}
					pattern.edges.push(edge);
				}
				previous = var;
			} else {
				let points_left =
					element.name("left").is_some() && element.name("right").is_none();
				pending = Some((
					EdgeBinding {
						var: element.name("edge_var").map(|m| m.as_str().to_string()),
						rel_type: element.name("edge_type").map(|m| m.as_str().to_string()),
						from: None,
						to: None,
					},
					points_left,
				));
			}
		}
		pattern
	}

	fn is_edge_var(&self, column: &str) -> bool {
		self.edges
			.iter()
			.any(|edge| edge.var.as_deref() == Some(column))
	}
}

/// Convert result rows of `query` into deduplicated graph elements.
pub fn rows_to_graph(query: &str, rows: &[Map<String, Value>]) -> Result<GraphData> {
	let pattern = QueryPattern::parse(query);
	let mut graph = GraphData::default();

	for row in rows {
		let mut bound: HashMap<&str, String> = HashMap::new();

		for (column, value) in row {
			if !value.is_object() || pattern.is_edge_var(column) {
				continue;
			}
			let label = match pattern.nodes.get(column.as_str()) {
				Some(label) => label.as_deref().unwrap_or(column.as_str()),
				None if value.get("id").is_some() => column.as_str(),
				None => {
					debug!("Skipping column {} without an id", column);
					continue;
				}
			};
			let node = Node::from_record(label, value)?;
			bound.insert(column.as_str(), node.id.clone());
			graph.upsert_node(node);
		}

		for edge in &pattern.edges {
			let endpoint = |var: &Option<String>| var.as_deref().and_then(|v| bound.get(v));
			let (Some(from), Some(to)) = (endpoint(&edge.from), endpoint(&edge.to)) else {
				continue;
			};
			let record = edge
				.var
				.as_deref()
				.and_then(|var| row.get(var))
				.and_then(Value::as_object);
			let rel_type = edge
				.rel_type
				.clone()
				.or_else(|| {
					record.and_then(|r| {
						["label", "type"]
							.iter()
							.find_map(|key| r.get(*key).and_then(Value::as_str))
							.map(str::to_string)
					})
				})
				.unwrap_or_else(|| DEFAULT_RELATIONSHIP_TYPE.to_string());
			let properties: Properties = record.cloned().unwrap_or_default();
			graph.insert_relationship(Relationship::new(from.as_str(), &rel_type, to.as_str(), properties));
		}
	}

	debug!(
		"Converted {} rows into {} nodes, {} relationships",
		rows.len(),
		graph.nodes.len(),
		graph.relationships.len()
	);
	Ok(graph)
}
