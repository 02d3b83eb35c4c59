//! Graph model and derived geometry.
//!
//! Nodes are identified by their index. A graph built from an edge list
//! gets one node slot for every index up to the highest one referenced,
//! so vertices never mentioned by an edge become isolated nodes.

use serde::Serialize;

use super::error::MetricError;

/// A point in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Position {
	/// Create a position.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance to `other`.
	pub fn distance(&self, other: &Position) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}
}

/// A vertex. Its position stays `None` until a layout has settled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
	/// Settled position, written by the layout simulator.
	pub position: Option<Position>,
	/// Optional categorical group, used for colouring.
	pub group: Option<u32>,
}

/// An edge between two node indices. Self-loops are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
	/// Source node index.
	pub source: usize,
	/// Target node index.
	pub target: usize,
}

impl Edge {
	/// Create an edge.
	pub const fn new(source: usize, target: usize) -> Self {
		Self { source, target }
	}

	/// Whether both ends are the same node.
	pub fn is_loop(&self) -> bool {
		self.source == self.target
	}
}

/// An edge resolved to the positions of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
	/// Position of the source node.
	pub start: Position,
	/// Position of the target node.
	pub end: Position,
}

impl Segment {
	/// Create a segment.
	pub const fn new(start: Position, end: Position) -> Self {
		Self { start, end }
	}

	/// Length of the segment. Zero for degenerate segments.
	pub fn length(&self) -> f64 {
		self.start.distance(&self.end)
	}

	fn direction(&self) -> (f64, f64) {
		(self.end.x - self.start.x, self.end.y - self.start.y)
	}

	/// Whether the two segments cross at a single point strictly inside both.
	///
	/// Solves `start + s * d1 == other.start + t * d2` for `s` and `t` and
	/// requires both in the open interval (0, 1). Shared endpoints therefore
	/// never count. Parallel, collinear and zero-length segments make the
	/// system singular and are reported as not crossing.
	pub fn crosses(&self, other: &Segment) -> bool {
		let (d1x, d1y) = self.direction();
		let (d2x, d2y) = other.direction();

		let denominator = d1x * d2y - d2x * d1y;
		let tolerance = f64::EPSILON * d1x.hypot(d1y) * d2x.hypot(d2y);
		if denominator.is_nan() || denominator.abs() <= tolerance {
			return false;
		}

		let (ox, oy) = (self.start.x - other.start.x, self.start.y - other.start.y);
		let s = (d2x * oy - d2y * ox) / denominator;
		let t = (d1x * oy - d1y * ox) / denominator;

		s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0
	}
}

/// Nodes and edges of one sampled graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	iteration: usize,
}

impl Graph {
	/// Build a graph from `(source, target)` pairs with 0-based indices.
	///
	/// Every index up to the highest referenced one gets a node slot with
	/// no position.
	pub fn from_edges(edges: &[(usize, usize)]) -> Self {
		let node_count = edges
			.iter()
			.map(|&(source, target)| source.max(target) + 1)
			.max()
			.unwrap_or(0);
		Self {
			nodes: vec![Node::default(); node_count],
			edges: edges
				.iter()
				.map(|&(source, target)| Edge::new(source, target))
				.collect(),
			iteration: 0,
		}
	}

	/// Build an already laid out graph from positions and edges.
	///
	/// Edges referring past the end of `positions` get unresolved nodes.
	pub fn with_positions(positions: &[Position], edges: &[(usize, usize)]) -> Self {
		let mut graph = Self::from_edges(edges);
		if graph.nodes.len() < positions.len() {
			graph.nodes.resize(positions.len(), Node::default());
		}
		for (node, position) in graph.nodes.iter_mut().zip(positions) {
			node.position = Some(*position);
		}
		graph
	}

	/// Tag the graph with its sample number within its graph class.
	pub fn with_iteration(mut self, iteration: usize) -> Self {
		self.iteration = iteration;
		self
	}

	/// Sample number within the graph class.
	pub fn iteration(&self) -> usize {
		self.iteration
	}

	/// All node slots, by index.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Mutable node slots, for simulators writing positions.
	pub fn nodes_mut(&mut self) -> &mut [Node] {
		&mut self.nodes
	}

	/// All edges, in insertion order.
	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	/// Number of node slots.
	pub fn vertex_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Whether every node has a position.
	pub fn is_settled(&self) -> bool {
		self.nodes.iter().all(|n| n.position.is_some())
	}

	fn position_of(&self, index: usize) -> Result<Position, MetricError> {
		self.nodes
			.get(index)
			.and_then(|n| n.position)
			.ok_or(MetricError::UnresolvedGeometry { node: index })
	}

	/// Resolve an edge to its endpoint positions.
	pub fn segment(&self, edge: &Edge) -> Result<Segment, MetricError> {
		Ok(Segment::new(
			self.position_of(edge.source)?,
			self.position_of(edge.target)?,
		))
	}

	/// Resolve every edge, failing on the first unresolved endpoint.
	pub fn segments(&self) -> Result<Vec<Segment>, MetricError> {
		self.edges.iter().map(|e| self.segment(e)).collect()
	}

	/// Euclidean length of `edge`.
	pub fn edge_length(&self, edge: &Edge) -> Result<f64, MetricError> {
		self.segment(edge).map(|s| s.length())
	}

	/// Lengths of all edges, in edge order, computed on demand.
	pub fn edge_lengths(&self) -> impl Iterator<Item = Result<f64, MetricError>> + '_ {
		self.edges.iter().map(|e| self.edge_length(e))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
		Segment::new(Position::new(x1, y1), Position::new(x2, y2))
	}

	#[test]
	fn from_edges_densifies_node_slots() {
		let graph = Graph::from_edges(&[(0, 3), (3, 1)]);
		assert_eq!(graph.vertex_count(), 4);
		assert_eq!(graph.edge_count(), 2);
		assert!(graph.nodes().iter().all(|n| n.position.is_none()));
		assert!(!graph.is_settled());
	}

	#[test]
	fn empty_edge_list_gives_empty_graph() {
		let graph = Graph::from_edges(&[]);
		assert_eq!(graph.vertex_count(), 0);
		assert!(graph.is_settled());
	}

	#[test]
	fn edge_length_is_euclidean() {
		let graph =
			Graph::with_positions(&[Position::new(0.0, 0.0), Position::new(3.0, 4.0)], &[(0, 1)]);
		assert_eq!(graph.edge_length(&graph.edges()[0]), Ok(5.0));
	}

	#[test]
	fn self_loop_has_zero_length() {
		let graph = Graph::with_positions(&[Position::new(2.0, 2.0)], &[(0, 0)]);
		assert_eq!(graph.edge_lengths().collect::<Vec<_>>(), vec![Ok(0.0)]);
	}

	#[test]
	fn unresolved_endpoint_is_reported() {
		let graph = Graph::from_edges(&[(0, 1)]);
		assert_eq!(
			graph.edge_length(&graph.edges()[0]),
			Err(MetricError::UnresolvedGeometry { node: 0 })
		);
	}

	#[test]
	fn deep_copies_do_not_share_positions() {
		let original = Graph::from_edges(&[(0, 1)]);
		let mut copy = original.clone();
		copy.nodes_mut()[0].position = Some(Position::new(1.0, 1.0));
		assert!(original.nodes()[0].position.is_none());
	}

	#[test]
	fn x_crosses() {
		assert!(seg(0.0, 0.0, 1.0, 1.0).crosses(&seg(0.0, 1.0, 1.0, 0.0)));
	}

	#[test]
	fn shared_endpoint_does_not_cross() {
		assert!(!seg(0.0, 0.0, 1.0, 1.0).crosses(&seg(1.0, 1.0, 2.0, 0.0)));
	}

	#[test]
	fn touching_interior_does_not_cross() {
		// T-junction: the second segment ends on the first.
		assert!(!seg(0.0, 0.0, 2.0, 0.0).crosses(&seg(1.0, 1.0, 1.0, 0.0)));
	}

	#[test]
	fn parallel_and_collinear_segments_do_not_cross() {
		assert!(!seg(0.0, 0.0, 1.0, 0.0).crosses(&seg(0.0, 1.0, 1.0, 1.0)));
		assert!(!seg(0.0, 0.0, 2.0, 0.0).crosses(&seg(1.0, 0.0, 3.0, 0.0)));
		let s = seg(0.0, 0.0, 1.0, 1.0);
		assert!(!s.crosses(&s));
	}

	#[test]
	fn zero_length_segment_does_not_cross() {
		assert!(!seg(0.5, 0.5, 0.5, 0.5).crosses(&seg(0.0, 1.0, 1.0, 0.0)));
	}
}
