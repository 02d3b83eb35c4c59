use force_layout_research::{App, init_logging};

fn main() {
	init_logging();
	leptos::mount::mount_to_body(App);
}
