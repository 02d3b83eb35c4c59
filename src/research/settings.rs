//! Experiment settings.
//!
//! [`ResearchSettings`] is immutable once built. It is produced either from
//! [`ResearchSettings::default`] or by merging a [`PartialSettings`] (for
//! example deserialised from JSON) over the defaults and validating the
//! result.
//!
//! | Option | Key | Default |
//! |--------|-----|---------|
//! | Link strengths to test | `linkStrengths` | `[]` |
//! | Charges to test | `charges` | `[]` |
//! | Graph classes `[vertices, edges]` | `graphs` | `[]` |
//! | Graphs sampled per class | `graphRepeat` | 1 |
//! | Runs per configuration | `repeat` | 1 |
//! | Metrics, by name | `metrics` | all built-ins |
//! | Graph service URL | `graphServiceUrl` | none (local generator) |
//! | Render while running | `visual` | true |
//! | Element hosting the canvas | `selector` | `#omi` |
//! | Layout area | `width` / `height` | 960 x 500 |
//! | Display scale | `scale` | 1 |
//! | Graph generation seed | `seed` | 0 |
//! | Per-test timeout (ms) | `testTimeoutMs` | none |
//! | On timeout | `timeoutPolicy` | `abort` |
//! | Graph fetch retries | `fetchRetries` | 0 |
//! | Delay before first retry (ms) | `retryBackoffMs` | 500 |

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ResearchError;
use super::metrics::{self, Metric};

/// A graph class: how many vertices and edges the sampled graphs have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct GraphSpec {
	/// Vertex count requested from the source.
	pub vertex_count: usize,
	/// Edge count requested from the source.
	pub edge_count: usize,
}

impl GraphSpec {
	/// Create a graph class.
	pub const fn new(vertex_count: usize, edge_count: usize) -> Self {
		Self {
			vertex_count,
			edge_count,
		}
	}
}

impl From<(usize, usize)> for GraphSpec {
	fn from((vertex_count, edge_count): (usize, usize)) -> Self {
		Self::new(vertex_count, edge_count)
	}
}

impl From<GraphSpec> for (usize, usize) {
	fn from(spec: GraphSpec) -> Self {
		(spec.vertex_count, spec.edge_count)
	}
}

impl fmt::Display for GraphSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "G({}, {})", self.vertex_count, self.edge_count)
	}
}

/// What to do when a test does not settle in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeoutPolicy {
	/// Fail the whole experiment.
	#[default]
	Abort,
	/// Record a sentinel result and continue with the next test.
	Skip,
}

/// Display area handed to the layout simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
	/// Layout width.
	pub width: f64,
	/// Layout height.
	pub height: f64,
	/// Factor between layout space and display pixels.
	pub scale: f64,
}

/// Fully resolved, validated experiment settings.
#[derive(Debug, Clone)]
pub struct ResearchSettings {
	/// Link strengths to test.
	pub link_strengths: Vec<f64>,
	/// Node charges to test. Negative values repel.
	pub charges: Vec<f64>,
	/// Graph classes to test.
	pub graphs: Vec<GraphSpec>,
	/// Distinct graphs sampled per graph class.
	pub graph_repeat: usize,
	/// Runs of each configuration.
	pub repeat: usize,
	/// Metrics applied to every settled layout, in output order.
	pub metrics: Vec<Metric>,
	/// Remote graph service. `None` uses the local generator.
	pub graph_service_url: Option<String>,
	/// Render tests while they run.
	pub visual: bool,
	/// CSS selector of the element hosting the display surface.
	pub selector: String,
	/// Layout width.
	pub width: f64,
	/// Layout height.
	pub height: f64,
	/// Display scale.
	pub scale: f64,
	/// Seed for graph generation. Graph class `k` uses `seed + k`.
	pub seed: u64,
	/// Wall-clock budget per test.
	pub test_timeout: Option<Duration>,
	/// Reaction to a test exceeding its budget.
	pub timeout_policy: TimeoutPolicy,
	/// Extra attempts for a failed graph fetch.
	pub fetch_retries: usize,
	/// Delay before the first retry, doubled for each further one.
	pub retry_backoff: Duration,
}

impl Default for ResearchSettings {
	fn default() -> Self {
		Self {
			link_strengths: Vec::new(),
			charges: Vec::new(),
			graphs: Vec::new(),
			graph_repeat: 1,
			repeat: 1,
			metrics: metrics::standard(),
			graph_service_url: None,
			visual: true,
			selector: "#omi".to_owned(),
			width: 960.0,
			height: 500.0,
			scale: 1.0,
			seed: 0,
			test_timeout: None,
			timeout_policy: TimeoutPolicy::Abort,
			fetch_retries: 0,
			retry_backoff: Duration::from_millis(500),
		}
	}
}

/// Settings overrides. Absent fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PartialSettings {
	/// Axis values. An empty list is a valid, empty sweep.
	pub link_strengths: Option<Vec<f64>>,
	/// Node charges. Negative values repel.
	pub charges: Option<Vec<f64>>,
	/// Graph classes to fetch.
	pub graphs: Option<Vec<GraphSpec>>,
	/// Graphs fetched per class.
	pub graph_repeat: Option<usize>,
	/// Runs of every parameter/graph combination.
	pub repeat: Option<usize>,
	/// Built-in metric names.
	pub metrics: Option<Vec<String>>,
	/// Base URL of the random graph service.
	pub graph_service_url: Option<String>,
	/// Lay out on the page canvas instead of headless.
	pub visual: Option<bool>,
	/// Canvas, or a container to put a canvas in.
	pub selector: Option<String>,
	/// Layout area width.
	pub width: Option<f64>,
	/// Layout area height.
	pub height: Option<f64>,
	/// Canvas zoom factor.
	pub scale: Option<f64>,
	/// Base seed. Graph class `k` uses `seed + k`.
	pub seed: Option<u64>,
	/// Per-test timeout. Absent means no timeout.
	pub test_timeout_ms: Option<u64>,
	/// What a timed-out test does to the run.
	pub timeout_policy: Option<TimeoutPolicy>,
	/// Extra attempts for a transient fetch failure.
	pub fetch_retries: Option<usize>,
	/// Delay before the first retry. Doubles on each further one.
	pub retry_backoff_ms: Option<u64>,
}

impl ResearchSettings {
	/// Merge `partial` over the defaults and validate.
	pub fn from_partial(partial: PartialSettings) -> Result<Self, ResearchError> {
		let defaults = Self::default();
		let metrics = match partial.metrics {
			Some(names) => names
				.iter()
				.map(|name| {
					Metric::builtin(name).ok_or_else(|| {
						ResearchError::InvalidConfiguration(format!("unknown metric `{name}`"))
					})
				})
				.collect::<Result<Vec<_>, _>>()?,
			None => defaults.metrics,
		};

		let settings = Self {
			link_strengths: partial.link_strengths.unwrap_or(defaults.link_strengths),
			charges: partial.charges.unwrap_or(defaults.charges),
			graphs: partial.graphs.unwrap_or(defaults.graphs),
			graph_repeat: partial.graph_repeat.unwrap_or(defaults.graph_repeat),
			repeat: partial.repeat.unwrap_or(defaults.repeat),
			metrics,
			graph_service_url: partial.graph_service_url.or(defaults.graph_service_url),
			visual: partial.visual.unwrap_or(defaults.visual),
			selector: partial.selector.unwrap_or(defaults.selector),
			width: partial.width.unwrap_or(defaults.width),
			height: partial.height.unwrap_or(defaults.height),
			scale: partial.scale.unwrap_or(defaults.scale),
			seed: partial.seed.unwrap_or(defaults.seed),
			test_timeout: partial
				.test_timeout_ms
				.map(Duration::from_millis)
				.or(defaults.test_timeout),
			timeout_policy: partial.timeout_policy.unwrap_or(defaults.timeout_policy),
			fetch_retries: partial.fetch_retries.unwrap_or(defaults.fetch_retries),
			retry_backoff: partial
				.retry_backoff_ms
				.map(Duration::from_millis)
				.unwrap_or(defaults.retry_backoff),
		};
		settings.validate()?;
		Ok(settings)
	}

	/// Parse JSON overrides and merge them over the defaults.
	pub fn from_json(json: &str) -> Result<Self, ResearchError> {
		let partial: PartialSettings = serde_json::from_str(json)
			.map_err(|e| ResearchError::InvalidConfiguration(e.to_string()))?;
		Self::from_partial(partial)
	}

	/// Check invariants that the type system does not.
	///
	/// Empty axes and zero repeat counts are accepted: they make an
	/// experiment with no tests.
	pub fn validate(&self) -> Result<(), ResearchError> {
		let invalid = |msg: String| Err(ResearchError::InvalidConfiguration(msg));

		if let Some(v) = self.link_strengths.iter().find(|v| !v.is_finite()) {
			return invalid(format!("link strength {v} is not finite"));
		}
		if let Some(v) = self.charges.iter().find(|v| !v.is_finite()) {
			return invalid(format!("charge {v} is not finite"));
		}
		for (name, value) in [
			("width", self.width),
			("height", self.height),
			("scale", self.scale),
		] {
			if !(value.is_finite() && value > 0.0) {
				return invalid(format!("{name} must be positive, got {value}"));
			}
		}
		let mut seen = HashSet::new();
		for metric in &self.metrics {
			if !seen.insert(metric.name()) {
				return invalid(format!("metric `{}` listed twice", metric.name()));
			}
		}
		if self.test_count().is_none() {
			return invalid("number of tests does not fit in usize".to_owned());
		}
		Ok(())
	}

	/// Number of tests the experiment will run.
	///
	/// Saturates at `usize::MAX` for settings that [`validate`](Self::validate)
	/// rejects.
	pub fn total_tests(&self) -> usize {
		self.test_count().unwrap_or(usize::MAX)
	}

	fn test_count(&self) -> Option<usize> {
		let factors = [
			self.link_strengths.len(),
			self.charges.len(),
			self.graphs.len(),
			self.graph_repeat,
			self.repeat,
		];
		if factors.contains(&0) {
			return Some(0);
		}
		factors.into_iter().try_fold(1usize, usize::checked_mul)
	}

	/// Layout area and display scale.
	pub fn bounds(&self) -> Bounds {
		Bounds {
			width: self.width,
			height: self.height,
			scale: self.scale,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn empty_overrides_give_defaults() {
		let settings = ResearchSettings::from_json("{}").unwrap();
		assert_eq!(settings.width, 960.0);
		assert_eq!(settings.height, 500.0);
		assert_eq!(settings.graph_repeat, 1);
		assert_eq!(settings.metrics.len(), 3);
		assert_eq!(settings.total_tests(), 0);
		assert!(settings.visual);
	}

	#[test]
	fn camel_case_keys_and_graph_pairs() {
		let settings = ResearchSettings::from_json(
			r#"{
				"linkStrengths": [0.1, 0.5],
				"charges": [-30],
				"graphs": [[10, 15], [20, 30]],
				"graphRepeat": 3,
				"repeat": 2,
				"metrics": ["edgeCrossings"],
				"testTimeoutMs": 2000,
				"timeoutPolicy": "skip"
			}"#,
		)
		.unwrap();
		assert_eq!(settings.graphs, vec![GraphSpec::new(10, 15), GraphSpec::new(20, 30)]);
		assert_eq!(settings.total_tests(), 24);
		assert_eq!(settings.metrics.len(), 1);
		assert_eq!(settings.test_timeout, Some(Duration::from_secs(2)));
		assert_eq!(settings.timeout_policy, TimeoutPolicy::Skip);
	}

	#[test]
	fn unknown_metric_is_rejected() {
		let err = ResearchSettings::from_json(r#"{"metrics": ["angularResolution"]}"#).unwrap_err();
		assert!(matches!(err, ResearchError::InvalidConfiguration(_)));
	}

	#[test]
	fn unknown_key_is_rejected() {
		assert!(ResearchSettings::from_json(r#"{"linkStrength": [1]}"#).is_err());
	}

	#[test]
	fn non_positive_area_is_rejected() {
		let partial = PartialSettings {
			width: Some(0.0),
			..Default::default()
		};
		assert!(ResearchSettings::from_partial(partial).is_err());
	}

	#[test]
	fn duplicate_metric_is_rejected() {
		let settings = ResearchSettings {
			metrics: vec![
				Metric::builtin("edgeCrossings").unwrap(),
				Metric::builtin("edgeCrossings").unwrap(),
			],
			..Default::default()
		};
		assert!(settings.validate().is_err());
	}

	#[test]
	fn empty_axis_means_no_tests() {
		let settings = ResearchSettings {
			link_strengths: vec![0.1],
			charges: Vec::new(),
			graphs: vec![GraphSpec::new(5, 5)],
			..Default::default()
		};
		assert!(settings.validate().is_ok());
		assert_eq!(settings.total_tests(), 0);
	}

	#[test]
	fn overflowing_test_count_is_rejected() {
		let json = format!(
			r#"{{"linkStrengths": [0.1, 0.2], "charges": [-30], "graphs": [[5, 5]], "graphRepeat": {}, "repeat": 3}}"#,
			usize::MAX / 2
		);
		let err = ResearchSettings::from_json(&json).unwrap_err();
		assert!(matches!(err, ResearchError::InvalidConfiguration(_)), "{err:?}");

		let settings = ResearchSettings {
			link_strengths: vec![0.1, 0.2],
			charges: vec![-30.0],
			graphs: vec![GraphSpec::new(5, 5)],
			graph_repeat: usize::MAX,
			..Default::default()
		};
		assert_eq!(settings.total_tests(), usize::MAX);
		assert!(settings.validate().is_err());
	}

	#[test]
	fn huge_repeat_with_an_empty_axis_is_still_empty() {
		let settings = ResearchSettings {
			graph_repeat: usize::MAX,
			repeat: usize::MAX,
			..Default::default()
		};
		assert!(settings.validate().is_ok());
		assert_eq!(settings.total_tests(), 0);
	}
}
