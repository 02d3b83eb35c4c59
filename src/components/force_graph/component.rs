use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

use super::render;
use crate::layout::{ForceLayoutOptions, LayoutParams, LayoutSimulator, LayoutState};
use crate::research::{Graph, SimulationError};

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Lays out graphs on a canvas, one simulation step per animation frame.
///
/// Every test reuses the same canvas. The frame loop stops as soon as the
/// layout settles, runs out of ticks, or the `settle` future is dropped.
pub struct CanvasLayout {
	canvas: HtmlCanvasElement,
	options: ForceLayoutOptions,
}

impl CanvasLayout {
	/// Draw on `canvas` with the given physics tuning.
	pub fn new(canvas: HtmlCanvasElement, options: ForceLayoutOptions) -> Self {
		Self { canvas, options }
	}

	/// Use the element matching `selector`: the element itself when it is a
	/// canvas, otherwise a canvas appended to it.
	pub fn from_selector(selector: &str) -> Result<Self, SimulationError> {
		let document = window()?
			.document()
			.ok_or_else(|| SimulationError::Surface("no document".to_owned()))?;
		let host = document
			.query_selector(selector)
			.map_err(|e| surface(&e))?
			.ok_or_else(|| SimulationError::Surface(format!("nothing matches `{selector}`")))?;

		let canvas = match host.dyn_into::<HtmlCanvasElement>() {
			Ok(canvas) => canvas,
			Err(host) => {
				let canvas: HtmlCanvasElement = document
					.create_element("canvas")
					.map_err(|e| surface(&e))?
					.dyn_into()
					.map_err(|e| surface(&e))?;
				host.append_child(&canvas).map_err(|e| surface(&e))?;
				canvas
			}
		};
		Ok(Self::new(canvas, ForceLayoutOptions::default()))
	}
}

#[async_trait(?Send)]
impl LayoutSimulator for CanvasLayout {
	async fn settle(
		&mut self,
		graph: &mut Graph,
		params: &LayoutParams,
	) -> Result<(), SimulationError> {
		let window = window()?;
		let scale = params.bounds.scale;
		self.canvas.set_width((params.bounds.width * scale) as u32);
		self.canvas.set_height((params.bounds.height * scale) as u32);
		let ctx: CanvasRenderingContext2d = self
			.canvas
			.get_context("2d")
			.map_err(|e| surface(&e))?
			.ok_or_else(|| SimulationError::Surface("no 2d context".to_owned()))?
			.dyn_into()
			.map_err(|e| surface(&e))?;

		let state = Rc::new(RefCell::new(LayoutState::new(
			graph,
			params,
			self.options.clone(),
		)));
		let (tx, rx) = oneshot::channel();
		let mut tx = Some(tx);
		let animate: FrameCallback = Rc::new(RefCell::new(None));
		let handle = Rc::new(Cell::new(None));
		let (state_anim, animate_inner, handle_inner) =
			(state.clone(), animate.clone(), handle.clone());

		*animate.borrow_mut() = Some(Closure::new(move || {
			handle_inner.set(None);
			let outcome = {
				let mut s = state_anim.borrow_mut();
				s.tick();
				render::render(&s, &ctx, scale);
				if s.is_settled() {
					Some(Ok(()))
				} else if s.is_exhausted() {
					Some(Err(SimulationError::NotSettled { ticks: s.ticks() }))
				} else {
					None
				}
			};
			let outcome = outcome.or_else(|| {
				let cb = animate_inner.borrow();
				let cb = cb.as_ref()?;
				match web_sys::window()
					.map(|w| w.request_animation_frame(cb.as_ref().unchecked_ref()))
				{
					Some(Ok(id)) => {
						handle_inner.set(Some(id));
						None
					}
					Some(Err(e)) => Some(Err(surface(&e))),
					None => Some(Err(SimulationError::Surface("no window".to_owned()))),
				}
			});
			if let Some(outcome) = outcome {
				if let Some(tx) = tx.take() {
					let _ = tx.send(outcome);
				}
			}
		}));

		let _guard = FrameGuard {
			window: window.clone(),
			animate: animate.clone(),
			handle: handle.clone(),
		};
		let first = match *animate.borrow() {
			Some(ref cb) => window.request_animation_frame(cb.as_ref().unchecked_ref()),
			None => Err(JsValue::NULL),
		};
		handle.set(Some(first.map_err(|e| surface(&e))?));

		rx.await.map_err(|_| SimulationError::Interrupted)??;
		let state = state.borrow();
		debug!(
			"canvas layout of {} nodes settled after {} ticks",
			graph.vertex_count(),
			state.ticks()
		);
		state.write_positions(graph);
		Ok(())
	}
}

/// Cancels a pending frame and frees the self-referencing frame callback.
struct FrameGuard {
	window: Window,
	animate: FrameCallback,
	handle: Rc<Cell<Option<i32>>>,
}

impl Drop for FrameGuard {
	fn drop(&mut self) {
		if let Some(id) = self.handle.take() {
			let _ = self.window.cancel_animation_frame(id);
		}
		self.animate.borrow_mut().take();
	}
}

fn window() -> Result<Window, SimulationError> {
	web_sys::window().ok_or_else(|| SimulationError::Surface("no window".to_owned()))
}

fn surface(value: &JsValue) -> SimulationError {
	SimulationError::Surface(format!("{value:?}"))
}
