use std::rc::Rc;

use leptos::prelude::*;

use crate::explorer::color_for_label;

/// Query input with a run button and the backend's node-type legend.
#[component]
pub fn QueryBar(
	query: RwSignal<String>,
	#[prop(into)] node_types: Signal<Vec<String>>,
	#[prop(into)] busy: Signal<bool>,
	on_run: Rc<dyn Fn(String)>,
) -> impl IntoView {
	let run_key = on_run.clone();
	let on_keydown = move |ev: web_sys::KeyboardEvent| {
		// shift+enter keeps multi-line editing
		if ev.key() == "Enter" && !ev.shift_key() {
			ev.prevent_default();
			run_key(query.get_untracked());
		}
	};
	let on_click = move |_: web_sys::MouseEvent| on_run(query.get_untracked());

	let legend = move || {
		node_types
			.get()
			.into_iter()
			.map(|label| {
				let swatch = format!("background: {};", color_for_label(Some(&label)));
				view! {
					<li>
						<span class="swatch" style=swatch></span>
						{label}
					</li>
				}
			})
			.collect_view()
	};

	view! {
		<div class="query-bar">
			<textarea
				class="query-input"
				rows="3"
				spellcheck="false"
				placeholder="MATCH (a:Label)-[r:TYPE]->(b) ..."
				prop:value=move || query.get()
				on:input=move |ev| query.set(event_target_value(&ev))
				on:keydown=on_keydown
			/>
			<button class="run-button" disabled=move || busy.get() on:click=on_click>
				"Run"
			</button>
			<ul class="legend">{legend}</ul>
		</div>
	}
}
