//! Layout quality metrics.
//!
//! Every metric is a pure function of a settled [`Graph`]. Calling one on a
//! graph without positions yields [`MetricError::UnresolvedGeometry`].

use std::fmt;

use super::combinations::CartesianProduct;
use super::error::MetricError;
use super::graph::{Graph, Segment};

/// Signature shared by all metrics.
pub type MetricFn = fn(&Graph) -> Result<f64, MetricError>;

/// A named metric.
#[derive(Clone)]
pub struct Metric {
	name: String,
	compute: MetricFn,
}

impl Metric {
	/// Name of [`edge_crossings`].
	pub const EDGE_CROSSINGS: &'static str = "edgeCrossings";
	/// Name of [`edge_length_average`].
	pub const EDGE_LENGTH_AVERAGE: &'static str = "edgeLengthAverage";
	/// Name of [`edge_length_deviation`].
	pub const EDGE_LENGTH_DEVIATION: &'static str = "edgeLengthDeviation";

	/// Wrap a metric function under a name.
	pub fn new(name: impl Into<String>, compute: MetricFn) -> Self {
		Self {
			name: name.into(),
			compute,
		}
	}

	/// Look up a built-in metric by name.
	pub fn builtin(name: &str) -> Option<Self> {
		let compute: MetricFn = match name {
			Self::EDGE_CROSSINGS => edge_crossings,
			Self::EDGE_LENGTH_AVERAGE => edge_length_average,
			Self::EDGE_LENGTH_DEVIATION => edge_length_deviation,
			_ => return None,
		};
		Some(Self::new(name, compute))
	}

	/// Metric name, used as result key and export column.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Evaluate the metric.
	pub fn compute(&self, graph: &Graph) -> Result<f64, MetricError> {
		(self.compute)(graph)
	}
}

impl fmt::Debug for Metric {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Metric").field(&self.name).finish()
	}
}

/// The built-in metrics, in declaration order.
pub fn standard() -> Vec<Metric> {
	[
		Metric::EDGE_CROSSINGS,
		Metric::EDGE_LENGTH_AVERAGE,
		Metric::EDGE_LENGTH_DEVIATION,
	]
	.into_iter()
	.filter_map(Metric::builtin)
	.collect()
}

/// Number of proper crossings between distinct edges.
///
/// Edges are paired with the edge list against itself, so each unordered
/// pair is seen twice and the matching count is halved. Pairs of an edge
/// with itself are dropped before testing.
pub fn edge_crossings(graph: &Graph) -> Result<f64, MetricError> {
	let segments = graph.segments()?;
	Ok(crossing_pairs(&segments, true) as f64 / 2.0)
}

fn crossing_pairs(segments: &[Segment], skip_self_pairs: bool) -> usize {
	let indices: Vec<usize> = (0..segments.len()).collect();
	CartesianProduct::new(&[&indices[..], &indices[..]])
		.filter(|pair| !(skip_self_pairs && pair[0] == pair[1]))
		.filter(|pair| segments[*pair[0]].crosses(&segments[*pair[1]]))
		.count()
}

/// Arithmetic mean of the edge lengths.
///
/// Fails with [`MetricError::NoEdges`] instead of dividing by zero.
pub fn edge_length_average(graph: &Graph) -> Result<f64, MetricError> {
	if graph.edge_count() == 0 {
		return Err(MetricError::NoEdges);
	}
	let mut total = 0.0;
	for length in graph.edge_lengths() {
		total += length?;
	}
	Ok(total / graph.edge_count() as f64)
}

/// Population standard deviation of the edge lengths (divisor N).
pub fn edge_length_deviation(graph: &Graph) -> Result<f64, MetricError> {
	let mean = edge_length_average(graph)?;
	let mut squared = 0.0;
	for length in graph.edge_lengths() {
		squared += (length? - mean).powi(2);
	}
	Ok((squared / graph.edge_count() as f64).sqrt())
}
