use graph_explorer::explorer::ExplorerConfig;
use graph_explorer::{App, bundled_config, init_logging};
use leptos::prelude::*;
use log::{Level, error};

fn main() {
	let config = bundled_config();
	init_logging(config.as_ref().map_or(Level::Debug, ExplorerConfig::log_level));
	let config = config.unwrap_or_else(|err| {
		error!("Ignoring invalid explorer.toml: {}", err);
		ExplorerConfig::default()
	});

	mount_to_body(move || view! { <App config=config.clone() /> })
}
