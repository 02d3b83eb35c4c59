//! Experiment orchestration.
//!
//! A [`Research`] fetches the graphs of every graph class, expands the
//! settings into the full list of [`Configuration`]s and runs them one at a
//! time through a [`LayoutSimulator`]. Result `i` always belongs to
//! configuration `i`.
//!
//! ```text
//! link strengths x charges x graphs (x graph repeat) -> configurations
//! configurations x repeat -> tests -> settle -> metrics -> results
//! ```

use futures::future::try_join_all;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::combinations::CartesianProduct;
use super::error::{MetricError, ResearchError, SimulationError, SourceError};
use super::graph::Graph;
use super::metrics::Metric;
use super::settings::{GraphSpec, ResearchSettings, TimeoutPolicy};
use super::source::{EdgeList, GraphSource, HttpGraphSource, RandomGraphSource};
use super::time::{self, TimeError, TimeProvider};
use crate::layout::{ForceLayout, LayoutParams, LayoutSimulator};

/// One test to run: parameters plus a private copy of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
	/// Position in execution order.
	pub index: usize,
	/// Spring strength of every edge.
	pub link_strength: f64,
	/// Node charge. Negative values repel.
	pub charge: f64,
	/// Exclusively owned by this configuration.
	pub graph: Graph,
	/// Sample number of the graph within its class.
	pub graph_iteration: usize,
	/// Run number of this parameter/graph combination.
	pub repeat_iteration: usize,
}

/// Settings snapshot stored with every result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSettings {
	/// See [`Configuration::link_strength`].
	pub link_strength: f64,
	/// See [`Configuration::charge`].
	pub charge: f64,
	/// Node slots of the tested graph.
	pub vertex_count: usize,
	/// Edges of the tested graph.
	pub edge_count: usize,
	/// See [`Configuration::graph_iteration`].
	pub graph_iteration: usize,
	/// See [`Configuration::repeat_iteration`].
	pub repeat_iteration: usize,
}

impl TestSettings {
	/// Column names, in declaration order.
	pub const KEYS: [&'static str; 6] = [
		"linkStrength",
		"charge",
		"vertexCount",
		"edgeCount",
		"graphIteration",
		"repeatIteration",
	];
}

/// How a test ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStatus {
	/// The layout settled and metrics were computed.
	Settled,
	/// The layout ran out of time and the test was skipped.
	TimedOut,
}

/// A metric outcome, keyed by metric name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
	/// Metric name, as configured.
	pub name: String,
	/// The score, or why it could not be computed.
	pub value: Result<f64, MetricError>,
}

/// Outcome of a single test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
	/// Index of the configuration this result belongs to.
	pub index: usize,
	/// Parameters and graph size of the test.
	pub settings: TestSettings,
	/// Whether the layout settled.
	pub status: TestStatus,
	/// One entry per configured metric, in configured order.
	pub metrics: Vec<MetricValue>,
}

impl TestResult {
	/// Value of the metric called `name`, if it was configured.
	pub fn metric(&self, name: &str) -> Option<Result<f64, MetricError>> {
		self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
	}
}

/// Passed to the progress callback after every test.
#[derive(Debug)]
pub struct TestProgress<'a> {
	/// Tests finished so far, including this one.
	pub completed: usize,
	/// Tests in the whole run.
	pub total: usize,
	/// The test that just finished.
	pub result: &'a TestResult,
}

/// Expand settings and fetched graphs into the ordered test list.
///
/// `graph_sets[k]` holds the sampled graphs of `settings.graphs[k]`. The
/// order is link strength, then charge, then graph (class by class), then
/// repeat, with the last varying fastest.
pub fn build_configurations(
	settings: &ResearchSettings,
	graph_sets: &[Vec<Graph>],
) -> Vec<Configuration> {
	let graphs: Vec<&Graph> = graph_sets.iter().flatten().collect();
	let strengths: Vec<usize> = (0..settings.link_strengths.len()).collect();
	let charges: Vec<usize> = (0..settings.charges.len()).collect();
	let graph_ids: Vec<usize> = (0..graphs.len()).collect();

	let mut configurations = Vec::new();
	for combination in CartesianProduct::new(&[&strengths[..], &charges[..], &graph_ids[..]]) {
		let graph = graphs[*combination[2]];
		for repeat_iteration in 0..settings.repeat {
			configurations.push(Configuration {
				index: configurations.len(),
				link_strength: settings.link_strengths[*combination[0]],
				charge: settings.charges[*combination[1]],
				graph: graph.clone(),
				graph_iteration: graph.iteration(),
				repeat_iteration,
			});
		}
	}
	configurations
}

/// A configured experiment. Consumed by [`Research::run`].
pub struct Research {
	settings: ResearchSettings,
	source: Box<dyn GraphSource>,
	simulator: Box<dyn LayoutSimulator>,
	time: Option<Box<dyn TimeProvider>>,
	cancel: CancellationToken,
}

impl Research {
	/// Validate `settings` and pick default collaborators: the HTTP service
	/// when a URL is configured, otherwise the local random generator, and
	/// the headless force layout.
	pub fn new(settings: ResearchSettings) -> Result<Self, ResearchError> {
		settings.validate()?;
		let source: Box<dyn GraphSource> = match &settings.graph_service_url {
			Some(url) => Box::new(HttpGraphSource::new(url.clone())),
			None => Box::new(RandomGraphSource),
		};
		Ok(Self {
			settings,
			source,
			simulator: Box::new(ForceLayout::default()),
			time: None,
			cancel: CancellationToken::new(),
		})
	}

	/// Replace the graph source chosen from the settings.
	pub fn with_source(mut self, source: impl GraphSource + 'static) -> Self {
		self.source = Box::new(source);
		self
	}

	/// Replace the default headless [`ForceLayout`].
	pub fn with_simulator(mut self, simulator: impl LayoutSimulator + 'static) -> Self {
		self.simulator = Box::new(simulator);
		self
	}

	/// Timer used for per-test timeouts and retry backoff.
	pub fn with_time(mut self, time: impl TimeProvider + 'static) -> Self {
		self.time = Some(Box::new(time));
		self
	}

	/// Token checked before every test. Cancelling it stops the run.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = token;
		self
	}

	/// The validated settings this run uses.
	pub fn settings(&self) -> &ResearchSettings {
		&self.settings
	}

	/// Number of tests [`Research::run`] will execute.
	pub fn total_tests(&self) -> usize {
		self.settings.total_tests()
	}

	/// Run every test in order and return the results.
	pub async fn run(self) -> Result<Vec<TestResult>, ResearchError> {
		self.run_with_progress(|_| {}).await
	}

	/// Like [`Research::run`], calling `on_test_finished` after every test.
	pub async fn run_with_progress(
		mut self,
		mut on_test_finished: impl FnMut(TestProgress<'_>),
	) -> Result<Vec<TestResult>, ResearchError> {
		let total = self.total_tests();
		if total == 0 {
			info!("research has no tests to run");
			return Ok(Vec::new());
		}
		if self.settings.test_timeout.is_some() && self.time.is_none() {
			return Err(ResearchError::InvalidConfiguration(
				"a test timeout needs a time provider".to_owned(),
			));
		}
		info!("starting research with {total} tests");

		let graph_sets = self.fetch_all().await?;
		let configurations = build_configurations(&self.settings, &graph_sets);
		drop(graph_sets);

		let mut results = Vec::with_capacity(configurations.len());
		for configuration in configurations {
			if self.cancel.is_cancelled() {
				warn!("research cancelled after {} of {total} tests", results.len());
				return Err(ResearchError::Cancelled {
					completed: results.len(),
					total,
				});
			}
			let result = self.run_test(configuration).await.inspect_err(|e| {
				error!("research aborted: {e}");
			})?;
			info!(
				"test {}/{total} finished (link strength {}, charge {})",
				results.len() + 1,
				result.settings.link_strength,
				result.settings.charge
			);
			on_test_finished(TestProgress {
				completed: results.len() + 1,
				total,
				result: &result,
			});
			results.push(result);
		}
		Ok(results)
	}

	async fn fetch_all(&self) -> Result<Vec<Vec<Graph>>, ResearchError> {
		let requests = self.settings.graphs.iter().enumerate().map(|(k, &spec)| {
			self.fetch_class(spec, self.settings.seed.wrapping_add(k as u64))
		});
		try_join_all(requests).await
	}

	/// Fetch the sample graphs of one graph class, tagged with their iteration.
	async fn fetch_class(&self, spec: GraphSpec, seed: u64) -> Result<Vec<Graph>, ResearchError> {
		let edge_lists = self
			.fetch_with_retry(spec, seed)
			.await
			.map_err(|source| ResearchError::ExternalServiceFailure { spec, source })?;
		if edge_lists.len() != self.settings.graph_repeat {
			return Err(ResearchError::ExternalServiceFailure {
				spec,
				source: SourceError::UnexpectedCount {
					expected: self.settings.graph_repeat,
					actual: edge_lists.len(),
				},
			});
		}
		info!("fetched {} graphs of class {spec}", edge_lists.len());
		Ok(edge_lists
			.iter()
			.enumerate()
			.map(|(i, edges)| Graph::from_edges(edges).with_iteration(i))
			.collect())
	}

	async fn fetch_with_retry(&self, spec: GraphSpec, seed: u64) -> Result<Vec<EdgeList>, SourceError> {
		let count = self.settings.graph_repeat;
		let mut delay = self.settings.retry_backoff;
		let mut attempt = 0;
		loop {
			match self.source.fetch_graphs(spec, count, seed).await {
				Ok(graphs) => return Ok(graphs),
				Err(e) if e.is_transient() && attempt < self.settings.fetch_retries => {
					attempt += 1;
					warn!(
						"fetching {spec} failed: {e}; retry {attempt}/{} in {delay:?}",
						self.settings.fetch_retries
					);
					if let Some(time) = &self.time {
						if let Err(e) = time.sleep(delay).await {
							warn!("backoff skipped: {e}");
						}
					}
					delay = delay.saturating_mul(2);
				}
				Err(e) => return Err(e),
			}
		}
	}

	async fn run_test(&mut self, configuration: Configuration) -> Result<TestResult, ResearchError> {
		let Configuration {
			index,
			link_strength,
			charge,
			mut graph,
			graph_iteration,
			repeat_iteration,
		} = configuration;
		let settings = TestSettings {
			link_strength,
			charge,
			vertex_count: graph.vertex_count(),
			edge_count: graph.edge_count(),
			graph_iteration,
			repeat_iteration,
		};
		let params = LayoutParams {
			link_strength,
			charge,
			bounds: self.settings.bounds(),
		};
		debug!("test {index}: {settings:?}");

		let settle = self.simulator.settle(&mut graph, &params);
		let outcome = match (self.settings.test_timeout, self.time.as_deref()) {
			(Some(limit), Some(time)) => match time::timeout(time, limit, settle).await {
				Ok(outcome) => outcome,
				Err(TimeError::Elapsed) => {
					warn!("test {index} did not settle within {limit:?}");
					return match self.settings.timeout_policy {
						TimeoutPolicy::Abort => Err(ResearchError::SimulationTimeout {
							index,
							timeout: limit,
						}),
						TimeoutPolicy::Skip => Ok(unsettled(index, settings, &self.settings.metrics)),
					};
				}
				Err(e) => return Err(e.into()),
			},
			_ => settle.await,
		};

		match outcome {
			Ok(()) => Ok(TestResult {
				index,
				settings,
				status: TestStatus::Settled,
				metrics: self
					.settings
					.metrics
					.iter()
					.map(|metric| MetricValue {
						name: metric.name().to_owned(),
						value: metric.compute(&graph),
					})
					.collect(),
			}),
			Err(source @ SimulationError::NotSettled { .. })
				if self.settings.timeout_policy == TimeoutPolicy::Skip =>
			{
				warn!("test {index} skipped: {source}");
				Ok(unsettled(index, settings, &self.settings.metrics))
			}
			Err(source) => Err(ResearchError::Simulation { index, source }),
		}
	}
}

fn unsettled(index: usize, settings: TestSettings, metrics: &[Metric]) -> TestResult {
	TestResult {
		index,
		settings,
		status: TestStatus::TimedOut,
		metrics: metrics
			.iter()
			.map(|metric| MetricValue {
				name: metric.name().to_owned(),
				value: Err(MetricError::Unsettled),
			})
			.collect(),
	}
}
