//! Error types for the research engine.
//!
//! Failures are split by blast radius: [`ResearchError`] aborts a whole
//! experiment, [`MetricError`] only fills a single metric slot of a result.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::settings::GraphSpec;
use super::time::TimeError;

/// Errors that abort an experiment. No partial results are returned.
#[derive(Debug, Error)]
pub enum ResearchError {
	/// A setting failed validation.
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	/// The graph source could not deliver graphs for a graph class.
	#[error("graph source failed for {spec}: {source}")]
	ExternalServiceFailure {
		/// Graph class being fetched.
		spec: GraphSpec,
		/// Underlying failure.
		#[source]
		source: SourceError,
	},

	/// A test did not settle in time and the policy is to abort.
	#[error("test {index} did not settle within {timeout:?}")]
	SimulationTimeout {
		/// Position of the test in configuration order.
		index: usize,
		/// The budget that was exceeded.
		timeout: Duration,
	},

	/// The layout simulator failed for a reason other than running out of time.
	#[error("layout simulation failed in test {index}: {source}")]
	Simulation {
		/// Position of the test in configuration order.
		index: usize,
		/// Underlying failure.
		#[source]
		source: SimulationError,
	},

	/// The timer used to bound a test failed.
	#[error("timer failed: {0}")]
	Timer(#[from] TimeError),

	/// The cancellation token fired between two tests.
	#[error("experiment cancelled after {completed} of {total} tests")]
	Cancelled {
		/// Tests finished before cancellation was observed.
		completed: usize,
		/// Declared total.
		total: usize,
	},
}

/// Errors raised while fetching or decoding graphs.
#[derive(Debug, Error)]
pub enum SourceError {
	/// Transport-level failure talking to the service.
	#[error("request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// The service answered but reported a problem.
	#[error("service error: {0}")]
	Service(String),

	/// The edge-list text could not be parsed.
	#[error("malformed edge list at byte {offset}: {message}")]
	Parse {
		/// Byte offset into the service text.
		offset: usize,
		/// What was expected.
		message: String,
	},

	/// The service returned a different number of graphs than requested.
	#[error("expected {expected} graphs, got {actual}")]
	UnexpectedCount {
		/// Requested graph count.
		expected: usize,
		/// Delivered graph count.
		actual: usize,
	},

	/// The requested graph class cannot exist.
	#[error("invalid graph spec: {0}")]
	InvalidSpec(String),
}

impl SourceError {
	/// Whether trying the same request again could succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, SourceError::Http(_) | SourceError::Service(_))
	}
}

/// Errors raised by a layout simulator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
	/// The simulation used its whole tick budget without settling.
	#[error("layout did not settle after {ticks} ticks")]
	NotSettled {
		/// Ticks performed.
		ticks: usize,
	},

	/// The display surface could not be used.
	#[error("display surface unavailable: {0}")]
	Surface(String),

	/// The timer used to pause between batches of ticks failed.
	#[error("layout timer failed: {0}")]
	Timer(String),

	/// The simulation was torn down before it reported back.
	#[error("simulation interrupted")]
	Interrupted,
}

/// Per-metric failure, stored in the metric's slot of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum MetricError {
	/// A node referenced by an edge has no position yet.
	#[error("node {node} has no resolved position")]
	UnresolvedGeometry {
		/// Index of the node without a position.
		node: usize,
	},

	/// The metric is undefined for a graph without edges.
	#[error("metric is not applicable to a graph without edges")]
	NoEdges,

	/// The test was skipped after a timeout, so nothing was measured.
	#[error("layout never settled")]
	Unsettled,
}
