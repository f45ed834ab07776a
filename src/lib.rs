//! Leptos client-side graph explorer: run a query, then grow and shrink the
//! resulting graph by expanding and collapsing nodes.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
mod components;
pub mod explorer;
mod pages;

// Top-Level pages
use crate::explorer::ExplorerConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

const BUNDLED_CONFIG: &str = include_str!("../explorer.toml");

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging(level: Level) {
	let _ = console_log::init_with_level(level);
	console_error_panic_hook::set_once();
	info!("Logging initialized at {}", level);
}

/// Settings compiled in from `explorer.toml`.
pub fn bundled_config() -> explorer::Result<ExplorerConfig> {
	ExplorerConfig::from_toml(BUNDLED_CONFIG)
}

/// An app router which renders the explorer and handles 404's
#[component]
pub fn App(config: ExplorerConfig) -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();
	provide_context(config);

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		// sets the document title
		<Title text="Graph Explorer" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
