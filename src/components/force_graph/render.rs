use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use crate::layout::{LayoutState, NODE_RADIUS};

/// Draw one frame of `state`, scaled by `scale`.
pub fn render(state: &LayoutState, ctx: &CanvasRenderingContext2d, scale: f64) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width * scale, state.height * scale);
	ctx.save();
	let _ = ctx.scale(scale, scale);
	draw_edges(state, ctx, scale);
	draw_nodes(state, ctx);
	ctx.restore();
	draw_status(state, ctx);
}

fn draw_edges(state: &LayoutState, ctx: &CanvasRenderingContext2d, scale: f64) {
	ctx.set_stroke_style_str("rgba(100, 180, 255, 0.6)");
	ctx.set_line_width(1.5 / scale);
	ctx.begin_path();
	state.graph.visit_edges(|n1, n2, _| {
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		ctx.move_to(x1, y1);
		ctx.line_to(x2, y2);
	});
	ctx.stroke();
}

fn draw_nodes(state: &LayoutState, ctx: &CanvasRenderingContext2d) {
	state.graph.visit_nodes(|node| {
		let (x, y) = (node.x() as f64, node.y() as f64);
		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node.data.user_data.color);
		ctx.fill();
	});
}

fn draw_status(state: &LayoutState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("rgba(255, 255, 255, 0.8)");
	ctx.set_font("12px sans-serif");
	let _ = ctx.fill_text(
		&format!("tick {}  movement {:.3}", state.ticks(), state.movement),
		8.0,
		16.0,
	);
}
