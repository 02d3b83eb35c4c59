use leptos::prelude::*;

/// Share of `max` reached by `value`, in percent. Empty progress is 0.
fn percent(value: usize, max: usize) -> f64 {
	if max == 0 {
		0.0
	} else {
		(value.min(max) as f64) * 100.0 / max as f64
	}
}

/// Accessible progress bar showing `value` out of `max`.
#[component]
pub fn ProgressBar(
	/// Finished units.
	#[prop(into)]
	value: Signal<usize>,
	/// Total units. Zero renders an empty bar.
	#[prop(into)]
	max: Signal<usize>,
) -> impl IntoView {
	view! {
		<div
			class="progress"
			role="progressbar"
			aria-valuemin="0"
			aria-valuenow=move || value.get().to_string()
			aria-valuemax=move || max.get().to_string()
		>
			<div
				class="progress-bar"
				style:width=move || format!("{:.1}%", percent(value.get(), max.get()))
			>
				{move || format!("{} / {}", value.get(), max.get())}
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::percent;

	#[test]
	fn percent_of_total() {
		assert_eq!(percent(0, 4), 0.0);
		assert_eq!(percent(1, 4), 25.0);
		assert_eq!(percent(4, 4), 100.0);
	}

	#[test]
	fn empty_and_overfull_progress() {
		assert_eq!(percent(0, 0), 0.0);
		assert_eq!(percent(5, 4), 100.0);
	}
}
