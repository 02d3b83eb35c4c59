//! Force layout research: a parameter sweep engine for force-directed graph
//! layouts, plus the Leptos front end that runs it in the browser.
//!
//! [`research`] and [`layout`] do not depend on the UI.

use leptos::prelude::*;
use leptos_meta::{Html, Meta, Title, provide_meta_context};
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;
use log::{Level, info};

mod components;
pub mod layout;
mod pages;
pub mod research;

use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Route `log` output to the browser console and report panics there.
///
/// Debug builds log everything down to `debug!`, release builds stop at
/// `info!`.
pub fn init_logging() {
	let level = if cfg!(debug_assertions) {
		Level::Debug
	} else {
		Level::Info
	};
	let _ = console_log::init_with_level(level);
	console_error_panic_hook::set_once();
	info!("logging at {level}");
}

/// Research page at `/`, everything else is a 404.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="Force Layout Research" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<main>
				<Routes fallback=|| view! { <NotFound /> }>
					<Route path=path!("/") view=Home />
				</Routes>
			</main>
		</Router>
	}
}
