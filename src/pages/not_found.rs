use leptos::prelude::*;

/// 404 Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"Page not found"</h1>
			<a href="/">"Back to the explorer"</a>
		</div>
	}
}
