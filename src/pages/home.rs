use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error, info};

use crate::components::details_panel::{DetailsPanel, ExpandHandler, Selected};
use crate::components::force_graph::{CanvasSession, ElementHandler, ForceGraphCanvas};
use crate::components::query_bar::QueryBar;
use crate::explorer::{
	Activation, ExplorerConfig, ExplorerError, ExplorerSession, ExpansionOutcome, GraphData,
	GraphView, HttpQueryService, NeighborRequest, QueryService, TypeCount, activate_node,
	expand_node, relationship_type_counts,
};

/// Report an expansion result on the status line. Stale results only get a
/// debug line: the graph they belonged to is gone.
fn report_expansion(result: Result<ExpansionOutcome, ExplorerError>, status: RwSignal<Option<String>>) {
	match result {
		Ok(outcome) if outcome.added_nodes.is_empty() && outcome.added_relationships.is_empty() => {
			status.set(Some(format!("No new neighbors for {}", outcome.node_id)));
		}
		Ok(outcome) => {
			info!(
				"Expanded {}: {} nodes, {} relationships",
				outcome.node_id,
				outcome.added_nodes.len(),
				outcome.added_relationships.len()
			);
			status.set(None);
		}
		Err(err) => report_error(err, status),
	}
}

fn report_error(err: ExplorerError, status: RwSignal<Option<String>>) {
	if matches!(err, ExplorerError::Stale { .. }) {
		debug!("Ignoring stale result: {}", err);
		return;
	}
	error!("{}", err);
	status.set(Some(err.to_string()));
}

/// Re-read the selected element from the session after the graph changed.
fn refresh_selection(session: &CanvasSession, selection: RwSignal<Option<Selected>>) {
	let Some(current) = selection.get_untracked() else {
		return;
	};
	let session = session.borrow();
	let Some(view) = session.view() else {
		selection.set(None);
		return;
	};
	let refreshed = match current {
		Selected::Node { node, .. } => view.node(&node.id).cloned().map(|node| Selected::Node {
			expanded: session.is_expanded(&node.id),
			node,
		}),
		Selected::Relationship(rel) => view
			.relationships()
			.iter()
			.find(|r| r.id == rel.id)
			.cloned()
			.map(Selected::Relationship),
	};
	selection.set(refreshed);
}

/// The explorer page: query bar, canvas and details panel.
#[component]
pub fn Home() -> impl IntoView {
	let config = use_context::<ExplorerConfig>().unwrap_or_default();
	let direction = config.direction;
	let service: Rc<dyn QueryService> = Rc::new(HttpQueryService::from_config(&config));
	let session: CanvasSession = Rc::new(RefCell::new(ExplorerSession::new(config.cascade)));

	let graph = RwSignal::new(GraphData::default());
	let query = RwSignal::new(config.initial_query.clone().unwrap_or_default());
	let busy = RwSignal::new(false);
	let status = RwSignal::new(None::<String>);
	let node_types = RwSignal::new(Vec::<String>::new());
	let selection = RwSignal::new(None::<Selected>);
	let type_counts = RwSignal::new(None::<Vec<TypeCount>>);

	let run_query: Rc<dyn Fn(String)> = {
		let service = service.clone();
		Rc::new(move |text: String| {
			if busy.get_untracked() || text.trim().is_empty() {
				return;
			}
			busy.set(true);
			status.set(None);
			selection.set(None);
			let service = service.clone();
			spawn_local(async move {
				match service.execute_query(&text).await {
					Ok(data) if data.is_empty() => status.set(Some("Query returned no graph elements".into())),
					Ok(data) => graph.set(data),
					Err(err) => report_error(err, status),
				}
				busy.set(false);
			});
		})
	};

	{
		let (service, run_query) = (service.clone(), run_query.clone());
		let configured = config.initial_query.clone();
		spawn_local(async move {
			match service.node_types().await {
				Ok(types) => node_types.set(types),
				Err(err) => error!("Could not load node types: {}", err),
			}
			let initial = match configured {
				Some(text) => Some(text),
				None => match service.default_query().await {
					Ok(text) => {
						query.set(text.clone());
						Some(text)
					}
					Err(err) => {
						report_error(err, status);
						None
					}
				},
			};
			if let Some(text) = initial {
				run_query(text);
			}
		});
	}

	let on_node_click: ElementHandler = {
		let (service, session) = (service.clone(), session.clone());
		Rc::new(move |id: String| {
			let (node, expanded) = {
				let session = session.borrow();
				let node = session.view().and_then(|view| view.node(&id).cloned());
				(node, session.is_expanded(&id))
			};
			let Some(node) = node else {
				return;
			};
			type_counts.set(None);
			let request = NeighborRequest::for_node(&node, direction, None);
			selection.set(Some(Selected::Node { node, expanded }));

			let request = match request {
				Ok(request) => request,
				Err(err) => return report_error(err, status),
			};
			let service = service.clone();
			spawn_local(async move {
				match service.fetch_neighbors(&request).await {
					Ok(groups) => {
						// the user may have moved on to another element meanwhile
						let current = selection.with_untracked(|s| s.as_ref().map(|s| s.id() == request.id));
						if current == Some(true) {
							type_counts.set(Some(relationship_type_counts(&groups)));
						}
					}
					Err(err) => report_error(err, status),
				}
			});
		})
	};

	let on_relationship_click: ElementHandler = {
		let session = session.clone();
		Rc::new(move |id: String| {
			let rel = session
				.borrow()
				.view()
				.and_then(|view| view.relationships().iter().find(|r| r.id == id).cloned());
			selection.set(rel.map(Selected::Relationship));
		})
	};

	let on_background_click: Rc<dyn Fn()> = Rc::new(move || selection.set(None));

	let on_node_dblclick: ElementHandler = {
		let (service, session) = (service.clone(), session.clone());
		Rc::new(move |id: String| {
			if busy.get_untracked() {
				debug!("Ignoring double-click on {} while busy", id);
				return;
			}
			busy.set(true);
			let (service, session) = (service.clone(), session.clone());
			spawn_local(async move {
				match activate_node(&*session, service.as_ref(), &id, direction).await {
					Ok(Activation::Expanded(outcome)) => report_expansion(Ok(outcome), status),
					Ok(Activation::Collapsed(plan)) => {
						info!(
							"Collapsed {}: {} nodes, {} relationships removed",
							id,
							plan.nodes_to_remove.len(),
							plan.relationships_to_remove.len()
						);
						status.set(None);
					}
					Err(err) => report_error(err, status),
				}
				refresh_selection(&session, selection);
				busy.set(false);
			});
		})
	};

	let on_expand: ExpandHandler = {
		let (service, session) = (service.clone(), session.clone());
		Rc::new(move |id: String, rel_type: Option<String>| {
			if busy.get_untracked() {
				return;
			}
			busy.set(true);
			let (service, session) = (service.clone(), session.clone());
			spawn_local(async move {
				let result =
					expand_node(&*session, service.as_ref(), &id, rel_type.as_deref(), direction).await;
				report_expansion(result, status);
				refresh_selection(&session, selection);
				busy.set(false);
			});
		})
	};

	let on_collapse: ElementHandler = {
		let session = session.clone();
		Rc::new(move |id: String| {
			if busy.get_untracked() {
				return;
			}
			let result = session.borrow_mut().collapse(&id);
			match result {
				Ok(plan) => info!("Collapsed {}: {} nodes removed", id, plan.nodes_to_remove.len()),
				Err(err) => report_error(err, status),
			}
			refresh_selection(&session, selection);
		})
	};

	view! {
		<div class="explorer">
			<QueryBar query=query node_types=node_types busy=busy on_run=run_query />
			<div class="explorer-main">
				<div class="graph-area">
					<ForceGraphCanvas
						session=session
						data=graph
						on_node_click=on_node_click
						on_node_dblclick=on_node_dblclick
						on_relationship_click=on_relationship_click
						on_background_click=on_background_click
					/>
					<div class="busy-overlay" class:visible=move || busy.get()>
						<span class="spinner"></span>
					</div>
				</div>
				<DetailsPanel
					selection=selection
					type_counts=type_counts
					busy=busy
					on_expand=on_expand
					on_collapse=on_collapse
				/>
			</div>
			<p class="status-line">{move || status.get().unwrap_or_default()}</p>
		</div>
	}
}
