use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::state::{ForceLayoutOptions, LayoutState};
use crate::research::{Bounds, Graph, SimulationError, TimeProvider};

/// Parameters of a single layout run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
	/// Spring strength of the edges.
	pub link_strength: f64,
	/// Node charge. Negative values repel.
	pub charge: f64,
	/// Layout area and display scale.
	pub bounds: Bounds,
}

/// A physics simulation that settles a graph layout.
///
/// Implementations write a position into every node of `graph` before
/// returning `Ok`. Settling may take arbitrarily long; callers bound it
/// with a timeout.
#[async_trait(?Send)]
pub trait LayoutSimulator {
	/// Lay out `graph` under `params` and wait for the layout to settle.
	async fn settle(&mut self, graph: &mut Graph, params: &LayoutParams)
	-> Result<(), SimulationError>;
}

/// Runs the simulation without drawing anything.
///
/// Every few ticks the simulation pauses so that other work can run. With a
/// timer (see [`ForceLayout::with_time`]) the pause is a zero-length sleep,
/// which in the browser goes through `setTimeout` and so lets pending timers
/// fire, including a test timeout racing the layout. Without a timer it only
/// reschedules itself: futures polled by the same executor get a turn, but
/// browser timers do not, and timeouts are not honoured there.
#[derive(Clone, Default)]
pub struct ForceLayout {
	options: ForceLayoutOptions,
	time: Option<Rc<dyn TimeProvider>>,
}

const TICKS_PER_YIELD: usize = 64;

impl ForceLayout {
	/// Headless layout without a timer. See [`ForceLayout::with_time`].
	pub fn new(options: ForceLayoutOptions) -> Self {
		Self {
			options,
			time: None,
		}
	}

	/// Pause through `time` instead of rescheduling in place.
	pub fn with_time(mut self, time: impl TimeProvider + 'static) -> Self {
		self.time = Some(Rc::new(time));
		self
	}

	async fn pause(&self) -> Result<(), SimulationError> {
		match &self.time {
			Some(time) => time
				.sleep(Duration::ZERO)
				.await
				.map_err(|e| SimulationError::Timer(e.to_string())),
			None => {
				YieldNow(false).await;
				Ok(())
			}
		}
	}
}

impl fmt::Debug for ForceLayout {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ForceLayout")
			.field("options", &self.options)
			.field("timed", &self.time.is_some())
			.finish()
	}
}

#[async_trait(?Send)]
impl LayoutSimulator for ForceLayout {
	async fn settle(
		&mut self,
		graph: &mut Graph,
		params: &LayoutParams,
	) -> Result<(), SimulationError> {
		let mut state = LayoutState::new(graph, params, self.options.clone());
		while !state.is_settled() {
			if state.is_exhausted() {
				return Err(SimulationError::NotSettled {
					ticks: state.ticks(),
				});
			}
			state.tick();
			if state.ticks() % TICKS_PER_YIELD == 0 {
				self.pause().await?;
			}
		}
		debug!(
			"layout of {} nodes settled after {} ticks",
			graph.vertex_count(),
			state.ticks()
		);
		state.write_positions(graph);
		Ok(())
	}
}

/// Returns `Pending` once, waking itself immediately.
struct YieldNow(bool);

impl Future for YieldNow {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.0 {
			return Poll::Ready(());
		}
		self.0 = true;
		cx.waker().wake_by_ref();
		Poll::Pending
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::research::{TimeError, timeout};
	use async_trait::async_trait;
	use futures::executor::block_on;
	use std::cell::Cell;

	/// Zero-length sleeps yield once, like a browser `setTimeout(0)`. Longer
	/// sleeps end once the layout has paused twice.
	#[derive(Clone, Default)]
	struct Paced {
		pauses: Rc<Cell<usize>>,
	}

	#[async_trait(?Send)]
	impl TimeProvider for Paced {
		async fn sleep(&self, duration: Duration) -> Result<(), TimeError> {
			if duration.is_zero() {
				self.pauses.set(self.pauses.get() + 1);
				YieldNow(false).await;
			} else {
				futures::future::poll_fn(|cx| {
					if self.pauses.get() >= 2 {
						Poll::Ready(())
					} else {
						cx.waker().wake_by_ref();
						Poll::Pending
					}
				})
				.await;
			}
			Ok(())
		}
	}

	fn restless() -> ForceLayoutOptions {
		ForceLayoutOptions {
			settle_threshold: 0.0,
			max_ticks: 1_000_000,
			..Default::default()
		}
	}

	fn params() -> LayoutParams {
		LayoutParams {
			link_strength: 0.05,
			charge: -150.0,
			bounds: Bounds {
				width: 400.0,
				height: 300.0,
				scale: 1.0,
			},
		}
	}

	#[test]
	fn empty_graph_settles_immediately() {
		let mut graph = Graph::from_edges(&[]);
		let mut layout = ForceLayout::default();
		assert_eq!(block_on(layout.settle(&mut graph, &params())), Ok(()));
	}

	#[test]
	fn single_edge_settles_with_finite_positions() {
		let mut graph = Graph::from_edges(&[(0, 1)]);
		let mut layout = ForceLayout::new(ForceLayoutOptions {
			settle_threshold: 0.05,
			max_ticks: 100_000,
			..Default::default()
		});
		assert_eq!(block_on(layout.settle(&mut graph, &params())), Ok(()));
		assert!(graph.is_settled());
		for node in graph.nodes() {
			let p = node.position.unwrap();
			assert!(p.x.is_finite() && p.y.is_finite());
		}
	}

	#[test]
	fn tick_budget_is_enforced() {
		let mut graph = Graph::from_edges(&[(0, 1), (1, 2)]);
		let mut layout = ForceLayout::new(ForceLayoutOptions {
			max_ticks: 1,
			calm_ticks: 5,
			..Default::default()
		});
		assert_eq!(
			block_on(layout.settle(&mut graph, &params())),
			Err(SimulationError::NotSettled { ticks: 1 })
		);
		assert!(!graph.is_settled());
	}

	#[test]
	fn self_loops_do_not_break_the_simulation() {
		let graph = Graph::from_edges(&[(0, 0), (0, 1)]);
		let mut state = LayoutState::new(&graph, &params(), ForceLayoutOptions::default());
		for _ in 0..10 {
			state.tick();
		}
		assert!(state.movement.is_finite());
	}

	#[test]
	fn initial_positions_lie_on_a_circle_inside_the_area() {
		let mut graph = Graph::from_edges(&[(0, 1), (1, 2), (2, 3)]);
		let state = LayoutState::new(&graph, &params(), ForceLayoutOptions::default());
		state.write_positions(&mut graph);
		for node in graph.nodes() {
			let p = node.position.unwrap();
			let r = (p.x - 200.0).hypot(p.y - 150.0);
			assert!((r - 75.0).abs() < 1e-3, "{r}");
		}
	}

	#[test]
	fn timed_layout_pauses_once_per_batch() {
		let time = Paced::default();
		let mut graph = Graph::from_edges(&[(0, 1), (1, 2)]);
		let mut layout = ForceLayout::new(ForceLayoutOptions {
			max_ticks: 200,
			..restless()
		})
		.with_time(time.clone());
		assert_eq!(
			block_on(layout.settle(&mut graph, &params())),
			Err(SimulationError::NotSettled { ticks: 200 })
		);
		assert_eq!(time.pauses.get(), 200 / TICKS_PER_YIELD);
	}

	#[test]
	fn timeout_fires_while_a_timed_layout_runs() {
		let time = Paced::default();
		let mut graph = Graph::from_edges(&[(0, 1), (1, 2), (2, 0)]);
		let mut layout = ForceLayout::new(restless()).with_time(time.clone());
		let outcome = block_on(timeout(
			&time,
			Duration::from_secs(1),
			layout.settle(&mut graph, &params()),
		));
		assert_eq!(outcome, Err(TimeError::Elapsed));
		assert_eq!(time.pauses.get(), 2);
		assert!(!graph.is_settled());
	}
}
