//! Graph element records shared by the query layer, the tracker and the views.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ExplorerError, Result};

/// Arbitrary JSON-like properties of a node or relationship.
pub type Properties = Map<String, Value>;

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Property keys tried, in order, when deriving a node caption.
const CAPTION_KEYS: &[&str] = &["name", "title", "caption", "label"];

/// Which side of a node to look for neighbors on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// Relationships pointing at the node
	Incoming,
	/// Relationships leaving the node
	Outgoing,
	/// Both of the above
	#[default]
	Both,
}

/// A graph node as the views show it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	/// Unique node id
	pub id: String,
	/// First entry is the primary (display) label
	pub labels: Vec<String>,
	/// Properties from the backend record
	pub properties: Properties,
	/// Text drawn next to the node
	pub caption: String,
	/// Fill color, derived from the primary label
	pub color: String,
}

impl Node {
	/// Build a node, deriving caption and color. Every construction path goes
	/// through here so identical data always renders identically.
	pub fn new(id: impl Into<String>, labels: Vec<String>, properties: Properties) -> Self {
		let id = id.into();
		let caption = caption_for(&id, &properties);
		let color = color_for_label(labels.first().map(String::as_str));
		Self {
			id,
			labels,
			properties,
			caption,
			color,
		}
	}

	/// Validate a backend property record and turn it into a node.
	///
	/// The record must be an object with an `id` that is a string or a number.
	pub fn from_record(label: &str, record: &Value) -> Result<Self> {
		let Some(properties) = record.as_object() else {
			return Err(ExplorerError::MalformedPayload(format!(
				"{label} record is not an object: {record}"
			)));
		};
		let id = properties
			.get("id")
			.and_then(id_string)
			.ok_or_else(|| {
				ExplorerError::MalformedPayload(format!("{label} record has no usable id: {record}"))
			})?;
		Ok(Self::new(id, vec![label.to_string()], properties.clone()))
	}

	/// The first label, if any.
	pub fn primary_label(&self) -> Option<&str> {
		self.labels.first().map(String::as_str)
	}

	/// Merge a re-fetched copy of this node into it: properties are
	/// overwritten key by key, unseen labels appended, caption recomputed.
	pub fn merge(&mut self, other: &Node) {
		for (key, value) in &other.properties {
			self.properties.insert(key.clone(), value.clone());
		}
		for label in &other.labels {
			if !self.labels.contains(label) {
				self.labels.push(label.clone());
			}
		}
		self.caption = caption_for(&self.id, &self.properties);
		self.color = color_for_label(self.primary_label());
	}
}

/// A directed, typed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
	/// `from_TYPE_to`, see [`relationship_id`]
	pub id: String,
	/// Source node id
	pub from: String,
	/// Target node id
	pub to: String,
	/// Uppercased relationship type
	#[serde(rename = "type")]
	pub rel_type: String,
	/// Text drawn along the edge
	pub caption: String,
	/// Edge properties, often empty
	pub properties: Properties,
}

impl Relationship {
	/// Build a relationship. The type is uppercased and the id derived from it.
	pub fn new(
		from: impl Into<String>,
		rel_type: &str,
		to: impl Into<String>,
		properties: Properties,
	) -> Self {
		let (from, to) = (from.into(), to.into());
		let rel_type = rel_type.to_uppercase();
		Self {
			id: relationship_id(&from, &rel_type, &to),
			caption: rel_type.clone(),
			from,
			to,
			rel_type,
			properties,
		}
	}

	/// Identity recomputed from the endpoints and type, independent of the
	/// stored `id`.
	pub fn natural_key(&self) -> String {
		relationship_id(&self.from, &self.rel_type, &self.to)
	}

	/// Whether `node_id` is one of the endpoints.
	pub fn touches(&self, node_id: &str) -> bool {
		self.from == node_id || self.to == node_id
	}

	/// The endpoint that is not `node_id` (or `node_id` itself for a self-loop).
	pub fn other_end(&self, node_id: &str) -> &str {
		if self.from == node_id { &self.to } else { &self.from }
	}
}

/// Natural key of a relationship: `from + "_" + TYPE + "_" + to`.
pub fn relationship_id(from: &str, rel_type: &str, to: &str) -> String {
	format!("{from}_{}_{to}", rel_type.to_uppercase())
}

/// Palette color for a primary label. Stable across sessions.
pub fn color_for_label(label: Option<&str>) -> String {
	let Some(label) = label else {
		return COLORS[0].to_string();
	};
	let hash = label
		.bytes()
		.fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
	COLORS[hash % COLORS.len()].to_string()
}

fn caption_for(id: &str, properties: &Properties) -> String {
	CAPTION_KEYS
		.iter()
		.filter_map(|key| properties.get(*key))
		.find_map(|value| match value {
			Value::String(s) if !s.is_empty() => Some(s.clone()),
			Value::Number(n) => Some(n.to_string()),
			_ => None,
		})
		.unwrap_or_else(|| id.to_string())
}

fn id_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn relationship_id_uppercases_type() {
		let rel = Relationship::new("n1", "likes", "n2", Properties::new());
		assert_eq!(rel.id, "n1_LIKES_n2");
		assert_eq!(rel.rel_type, "LIKES");
		assert_eq!(rel.caption, "LIKES");
		assert_eq!(rel.natural_key(), rel.id);
		assert_eq!(relationship_id("a", "Owns", "b"), "a_OWNS_b");
	}

	#[test]
	fn other_end_handles_both_directions_and_self_loops() {
		let rel = Relationship::new("n1", "LIKES", "n2", Properties::new());
		assert_eq!(rel.other_end("n1"), "n2");
		assert_eq!(rel.other_end("n2"), "n1");
		let looped = Relationship::new("n1", "LIKES", "n1", Properties::new());
		assert_eq!(looped.other_end("n1"), "n1");
	}

	#[test]
	fn from_record_accepts_numeric_ids() {
		let node = Node::from_record("Drug", &json!({"id": 42, "name": "Aspirin"})).unwrap();
		assert_eq!(node.id, "42");
		assert_eq!(node.caption, "Aspirin");
		assert_eq!(node.primary_label(), Some("Drug"));
		assert_eq!(node.color, color_for_label(Some("Drug")));
	}

	#[test]
	fn from_record_rejects_missing_id() {
		let err = Node::from_record("Drug", &json!({"name": "Aspirin"})).unwrap_err();
		assert!(matches!(err, ExplorerError::MalformedPayload(_)));
		let err = Node::from_record("Drug", &json!(["D1"])).unwrap_err();
		assert!(matches!(err, ExplorerError::MalformedPayload(_)));
	}

	#[test]
	fn caption_falls_back_to_id() {
		let node = Node::new("n7", vec![], Properties::new());
		assert_eq!(node.caption, "n7");
		assert_eq!(node.color, COLORS[0]);
	}

	#[test]
	fn merge_overwrites_properties_and_recomputes_caption() {
		let mut node = Node::from_record("Drug", &json!({"id": "d1", "dose": 5})).unwrap();
		let refetched =
			Node::from_record("Compound", &json!({"id": "d1", "name": "Ibuprofen", "dose": 10}))
				.unwrap();
		node.merge(&refetched);
		assert_eq!(node.caption, "Ibuprofen");
		assert_eq!(node.properties["dose"], json!(10));
		assert_eq!(node.labels, vec!["Drug".to_string(), "Compound".to_string()]);
		assert_eq!(node.color, color_for_label(Some("Drug")));
	}

	#[test]
	fn direction_uses_lowercase_wire_names() {
		assert_eq!(serde_json::to_string(&Direction::Incoming).unwrap(), "\"incoming\"");
		let parsed: Direction = serde_json::from_str("\"outgoing\"").unwrap();
		assert_eq!(parsed, Direction::Outgoing);
	}
}
