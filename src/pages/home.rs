use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::components::force_graph::CanvasLayout;
use crate::components::progress_bar::ProgressBar;
use crate::layout::ForceLayout;
use crate::research::{
	BrowserTime, Research, ResearchError, ResearchSettings, TestProgress, TestResult,
	results_to_tsv,
};

/// Settings the page starts with. Small enough to finish in a few seconds.
const DEMO_SETTINGS: &str = r##"{
	"linkStrengths": [0.05, 0.1],
	"charges": [-100, -200],
	"graphs": [[10, 15], [20, 30]],
	"graphRepeat": 2,
	"repeat": 1,
	"selector": "#omi",
	"width": 640,
	"height": 400,
	"testTimeoutMs": 30000,
	"timeoutPolicy": "skip"
}"##;

async fn run_research(
	json: &str,
	cancel: CancellationToken,
	on_start: impl FnOnce(usize),
	on_test_finished: impl FnMut(TestProgress<'_>),
) -> Result<Vec<TestResult>, ResearchError> {
	let settings = ResearchSettings::from_json(json)?;
	let visual = settings.visual;
	let mut research = Research::new(settings)?
		.with_time(BrowserTime)
		.with_cancellation(cancel);
	if visual {
		let selector = &research.settings().selector;
		let layout = CanvasLayout::from_selector(selector).map_err(|e| {
			ResearchError::InvalidConfiguration(format!("selector `{selector}`: {e}"))
		})?;
		research = research.with_simulator(layout);
	} else {
		research = research.with_simulator(ForceLayout::default().with_time(BrowserTime));
	}
	on_start(research.total_tests());
	research.run_with_progress(on_test_finished).await
}

/// Research page: edit settings, run the experiment, copy the results.
#[component]
pub fn Home() -> impl IntoView {
	let (config, set_config) = signal(DEMO_SETTINGS.to_owned());
	let (running, set_running) = signal(false);
	let (completed, set_completed) = signal(0usize);
	let (total, set_total) = signal(0usize);
	let (results, set_results) = signal(Vec::<TestResult>::new());
	let (errors, set_errors) = signal(Vec::<String>::new());
	let (decimal_comma, set_decimal_comma) = signal(false);
	let cancel = StoredValue::new(CancellationToken::new());

	let start = move |_| {
		if running.get_untracked() {
			return;
		}
		let token = CancellationToken::new();
		cancel.set_value(token.clone());
		set_running.set(true);
		set_completed.set(0);
		set_total.set(0);
		set_results.set(Vec::new());
		set_errors.set(Vec::new());

		let json = config.get_untracked();
		spawn_local(async move {
			let outcome = run_research(
				&json,
				token,
				|total| set_total.set(total),
				|progress| set_completed.set(progress.completed),
			)
			.await;
			match outcome {
				Ok(done) => {
					info!("research finished with {} results", done.len());
					set_results.set(done);
				}
				Err(e) => {
					error!("research failed: {e}");
					set_errors.update(|errors| errors.push(e.to_string()));
				}
			}
			set_running.set(false);
		});
	};
	let stop = move |_| cancel.with_value(|token| token.cancel());

	let tsv = move || results.with(|results| results_to_tsv(results, decimal_comma.get()));

	view! {
		<div class="research">
			<h1>"Force Layout Research"</h1>

			<textarea
				class="settings"
				rows="14"
				cols="60"
				prop:value=move || config.get()
				on:input=move |ev| set_config.set(event_target_value(&ev))
				disabled=move || running.get()
			/>

			<div class="controls">
				<button on:click=start disabled=move || running.get()>"Start"</button>
				<button on:click=stop disabled=move || !running.get()>"Cancel"</button>
				<label>
					<input
						type="checkbox"
						prop:checked=move || decimal_comma.get()
						on:change=move |ev| set_decimal_comma.set(event_target_checked(&ev))
					/>
					"Decimal comma"
				</label>
			</div>

			<ProgressBar value=completed max=total />

			<canvas id="omi" class="force-graph-canvas" style="display: block;" />

			<ul class="errors">
				{move || {
					errors
						.get()
						.into_iter()
						.map(|e| view! { <li>{e}</li> })
						.collect_view()
				}}
			</ul>

			<pre class="results">{tsv}</pre>
		</div>
	}
}
