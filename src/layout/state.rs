use std::f64::consts::PI;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::simulator::LayoutParams;
use crate::research::{Graph, Position};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Drawn radius of a node, in canvas pixels.
pub const NODE_RADIUS: f64 = 5.0;

/// Tuning of the physics and of the settling criterion.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceLayoutOptions {
	/// Simulated seconds per tick.
	pub dt: f32,
	/// Mass of every node.
	pub mass: f32,
	/// Cap on a single force contribution.
	pub force_max: f32,
	/// Velocity cap per node.
	pub node_speed: f32,
	/// Velocity kept after each tick, in `0..=1`.
	pub damping_factor: f32,
	/// Fraction of the distance to the centre each node moves per tick.
	pub gravity: f32,
	/// A tick is calm when no node moves further than this.
	pub settle_threshold: f32,
	/// Consecutive calm ticks needed to call the layout settled.
	pub calm_ticks: usize,
	/// Ticks after which the layout is declared unsettleable.
	pub max_ticks: usize,
}

impl Default for ForceLayoutOptions {
	fn default() -> Self {
		Self {
			dt: 0.016,
			mass: 10.0,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			gravity: 0.02,
			settle_threshold: 0.01,
			calm_ticks: 10,
			max_ticks: 10_000,
		}
	}
}

/// Per-node payload carried through the physics graph.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Index of the node in the research graph.
	pub index: usize,
	/// Fill colour used by the canvas renderer.
	pub color: &'static str,
}

/// A graph being laid out, plus progress towards settling.
pub struct LayoutState {
	/// Physics graph. Node order follows the research graph.
	pub graph: ForceGraph<NodeInfo, ()>,
	/// Layout area. Gravity pulls towards its centre.
	pub width: f64,
	/// See [`LayoutState::width`].
	pub height: f64,
	/// Largest node displacement during the last tick.
	pub movement: f32,
	options: ForceLayoutOptions,
	previous: Vec<(f32, f32)>,
	ticks: usize,
	calm: usize,
}

impl LayoutState {
	/// Place the nodes of `data` on a circle around the centre of the area.
	///
	/// Charge follows the usual sign convention (negative repels) and is
	/// negated into the simulator's repulsion constant. Self-loops exert no
	/// force and are left out.
	pub fn new(data: &Graph, params: &LayoutParams, options: ForceLayoutOptions) -> Self {
		let (width, height) = (params.bounds.width, params.bounds.height);
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: -params.charge as f32,
			force_spring: params.link_strength as f32,
			force_max: options.force_max,
			node_speed: options.node_speed,
			damping_factor: options.damping_factor,
		});
		let mut indices = Vec::with_capacity(data.vertex_count());
		let mut previous = Vec::with_capacity(data.vertex_count());
		let radius = width.min(height) / 4.0;

		for (i, node) in data.nodes().iter().enumerate() {
			let color = node
				.group
				.map(|g| COLORS[g as usize % COLORS.len()])
				.unwrap_or(COLORS[0]);
			let angle = (i as f64) * 2.0 * PI / data.vertex_count() as f64;
			let (x, y) = (
				(width / 2.0 + radius * angle.cos()) as f32,
				(height / 2.0 + radius * angle.sin()) as f32,
			);

			indices.push(graph.add_node(NodeData {
				x,
				y,
				mass: options.mass,
				is_anchor: false,
				user_data: NodeInfo { index: i, color },
			}));
			previous.push((x, y));
		}

		for edge in data.edges().iter().filter(|e| !e.is_loop()) {
			if let (Some(&src), Some(&tgt)) = (indices.get(edge.source), indices.get(edge.target)) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
		}

		Self {
			graph,
			width,
			height,
			movement: f32::INFINITY,
			options,
			previous,
			ticks: 0,
			calm: 0,
		}
	}

	/// Advance the physics by one step and update the settling counters.
	pub fn tick(&mut self) {
		self.graph.update(self.options.dt);

		let gravity = self.options.gravity;
		if gravity > 0.0 {
			let (cx, cy) = ((self.width / 2.0) as f32, (self.height / 2.0) as f32);
			self.graph.visit_nodes_mut(|node| {
				node.data.x += (cx - node.data.x) * gravity;
				node.data.y += (cy - node.data.y) * gravity;
			});
		}

		let previous = &mut self.previous;
		let (mut movement, mut finite) = (0.0f32, true);
		self.graph.visit_nodes(|node| {
			let (x, y) = (node.x(), node.y());
			let slot = &mut previous[node.data.user_data.index];
			let step = (x - slot.0).hypot(y - slot.1);
			finite &= step.is_finite();
			movement = movement.max(step);
			*slot = (x, y);
		});

		self.ticks += 1;
		self.movement = if finite { movement } else { f32::NAN };
		// NaN never counts as calm
		if self.movement < self.options.settle_threshold {
			self.calm += 1;
		} else {
			self.calm = 0;
		}
	}

	/// Ticks run so far.
	pub fn ticks(&self) -> usize {
		self.ticks
	}

	/// Whether the last `calm_ticks` ticks all stayed under the threshold.
	pub fn is_settled(&self) -> bool {
		self.calm >= self.options.calm_ticks
	}

	/// Whether the tick budget is used up.
	pub fn is_exhausted(&self) -> bool {
		self.ticks >= self.options.max_ticks
	}

	/// Copy the current node positions into `graph`.
	pub fn write_positions(&self, graph: &mut Graph) {
		let nodes = graph.nodes_mut();
		self.graph.visit_nodes(|node| {
			if let Some(slot) = nodes.get_mut(node.data.user_data.index) {
				slot.position = Some(Position::new(node.x() as f64, node.y() as f64));
			}
		});
	}
}
