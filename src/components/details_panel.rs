use std::rc::Rc;

use leptos::prelude::*;
use serde_json::Value;
use web_sys::MouseEvent;

use super::force_graph::ElementHandler;
use crate::explorer::{Node, Properties, Relationship, TypeCount};

/// Element picked with a single click.
#[derive(Clone, Debug, PartialEq)]
pub enum Selected {
	Node { node: Node, expanded: bool },
	Relationship(Relationship),
}

impl Selected {
	pub fn id(&self) -> &str {
		match self {
			Self::Node { node, .. } => &node.id,
			Self::Relationship(rel) => &rel.id,
		}
	}
}

/// Expand a node, optionally by one backend relation only.
pub type ExpandHandler = Rc<dyn Fn(String, Option<String>)>;

fn property_table(properties: &Properties) -> AnyView {
	let rows = properties
		.iter()
		.map(|(key, value)| {
			let value = match value {
				Value::String(text) => text.clone(),
				other => other.to_string(),
			};
			view! {
				<tr>
					<th>{key.clone()}</th>
					<td>{value}</td>
				</tr>
			}
		})
		.collect_view();
	view! {
		<table class="properties">
			<tbody>{rows}</tbody>
		</table>
	}
	.into_any()
}

/// Properties of the selection, plus expand and collapse actions for nodes.
#[component]
pub fn DetailsPanel(
	#[prop(into)] selection: Signal<Option<Selected>>,
	#[prop(into)] type_counts: Signal<Option<Vec<TypeCount>>>,
	#[prop(into)] busy: Signal<bool>,
	on_expand: ExpandHandler,
	on_collapse: ElementHandler,
) -> impl IntoView {
	let on_expand = StoredValue::new_local(on_expand);
	let on_collapse = StoredValue::new_local(on_collapse);

	let body = move || match selection.get() {
		None => view! {
			<p class="hint">
				"Click a node or relationship to inspect it. Double-click a node to expand or collapse it."
			</p>
		}
		.into_any(),
		Some(Selected::Relationship(rel)) => view! {
			<h2>{rel.caption.clone()}</h2>
			<p class="endpoints">{format!("{} -> {}", rel.from, rel.to)}</p>
			{property_table(&rel.properties)}
		}
		.into_any(),
		Some(Selected::Node { node, expanded }) => {
			let expand_all = {
				let id = node.id.clone();
				move |_: MouseEvent| on_expand.with_value(|expand| expand(id.clone(), None))
			};
			let collapse = {
				let id = node.id.clone();
				move |_: MouseEvent| on_collapse.with_value(|collapse| collapse(id.clone()))
			};
			let type_rows = {
				let id = node.id.clone();
				move || match type_counts.get() {
					None => view! { <li class="loading">"Loading relationship types..."</li> }.into_any(),
					Some(counts) if counts.is_empty() => {
						view! { <li class="empty">"No relationships"</li> }.into_any()
					}
					Some(counts) => counts
						.into_iter()
						.map(|TypeCount { relation, rel_type, count }| {
							let id = id.clone();
							let label = format!("{rel_type} ({count})");
							let on_click = move |_: MouseEvent| {
								on_expand.with_value(|expand| expand(id.clone(), Some(relation.clone())))
							};
							view! {
								<li>
									<button disabled=move || busy.get() on:click=on_click>
										{label}
									</button>
								</li>
							}
						})
						.collect_view()
						.into_any(),
				}
			};

			view! {
				<h2>{node.caption.clone()}</h2>
				<p class="labels">{node.labels.join(", ")}</p>
				{property_table(&node.properties)}
				<div class="actions">
					<button disabled=move || busy.get() on:click=expand_all>
						{if expanded { "Expand more" } else { "Expand" }}
					</button>
					<button disabled=move || busy.get() || !expanded on:click=collapse>
						"Collapse"
					</button>
				</div>
				<h3>"Relationship types"</h3>
				<ul class="relationship-types">{type_rows}</ul>
			}
			.into_any()
		}
	};

	view! { <aside class="details-panel">{body}</aside> }
}
