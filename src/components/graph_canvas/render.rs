use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{CanvasState, Gesture};
use crate::layout::types::Rect;
use crate::layout::{EdgeDisplay, NodeKind, Point, Size, VisualEdge, VisualNode};

const NAME_FONT: &str = "14px sans-serif";
const LABEL_FONT: &str = "11px sans-serif";
const PADDING: f64 = 16.0;
const AVATAR: f64 = 36.0;
const ARROW: f64 = 9.0;
const DUAL_OFFSET: f64 = 6.0;

fn avatar_slot(kind: NodeKind) -> f64 {
	match kind {
		NodeKind::Person => AVATAR + PADDING / 2.0,
		NodeKind::Item => 0.0,
	}
}

fn box_size(kind: NodeKind, text_width: f64) -> Size {
	let base = kind.default_size();
	Size::new(base.w.max((text_width + avatar_slot(kind) + 2.0 * PADDING).ceil()), base.h)
}

/// Sizes of nodes whose rendered box differs from what the layout last saw.
pub fn measure_nodes(nodes: &[VisualNode], ctx: &CanvasRenderingContext2d) -> Vec<(String, Size)> {
	ctx.set_font(NAME_FONT);
	nodes
		.iter()
		.filter_map(|node| {
			let width = ctx.measure_text(&node.data.name).ok()?.width();
			let size = box_size(node.kind, width);
			(node.measured != Some(size)).then(|| (node.id.clone(), size))
		})
		.collect()
}

pub fn render(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let vp = &state.viewport;
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, vp.width, vp.height);
	ctx.save();
	let _ = ctx.translate(vp.x, vp.y);
	let _ = ctx.scale(vp.zoom, vp.zoom);
	draw_edges(state, ctx);
	draw_connect_preview(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// Where the segment from the box center towards `toward` leaves the box.
fn exit_point(rect: &Rect, toward: Point) -> Point {
	let c = rect.center();
	let (dx, dy) = (toward.x - c.x, toward.y - c.y);
	let tx = if dx == 0.0 { f64::INFINITY } else { rect.w / 2.0 / dx.abs() };
	let ty = if dy == 0.0 { f64::INFINITY } else { rect.h / 2.0 / dy.abs() };
	let t = tx.min(ty).min(1.0);
	Point::new(c.x + dx * t, c.y + dy * t)
}

fn edge_color(edge: &VisualEdge, state: &CanvasState) -> &'static str {
	let touches_hover = state
		.hover
		.as_deref()
		.is_some_and(|h| h == edge.source || h == edge.target);
	if edge.selected {
		"#ffd166"
	} else if touches_hover {
		"rgba(160, 210, 255, 0.95)"
	} else {
		"rgba(100, 180, 255, 0.6)"
	}
}

fn draw_edges(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let nodes: HashMap<&str, &VisualNode> = state
		.controller
		.nodes()
		.iter()
		.map(|n| (n.id.as_str(), n))
		.collect();
	let k = state.viewport.zoom;

	for edge in state.controller.edges() {
		let (Some(source), Some(target)) = (nodes.get(edge.source.as_str()), nodes.get(edge.target.as_str()))
		else {
			continue;
		};
		let (sr, tr) = (source.rect(), target.rect());
		let (sc, tc) = (sr.center(), tr.center());
		let (dx, dy) = (tc.x - sc.x, tc.y - sc.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let (ux, uy) = (dx / dist, dy / dist);
		let width = (if edge.selected { 2.5 } else { 1.5 }) / k.max(0.5);
		let line = edge_color(edge, state);
		let label = edge.label.as_deref();

		match edge.display {
			EdgeDisplay::DualDirected => {
				let shift = |p: Point, side: f64| {
					Point::new(p.x - uy * DUAL_OFFSET * side, p.y + ux * DUAL_OFFSET * side)
				};
				let (from, to) = (exit_point(&sr, tc), exit_point(&tr, sc));
				draw_segment(ctx, shift(from, 1.0), shift(to, 1.0), width, line, false, true);
				draw_segment(ctx, shift(to, -1.0), shift(from, -1.0), width, line, false, true);

				let mid = Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
				if let Some(text) = label {
					draw_label(ctx, text, shift(mid, 3.0));
				}
				if let Some(text) = edge.backward_label.as_deref() {
					draw_label(ctx, text, shift(mid, -3.0));
				}
			}
			display => {
				let (from, to) = (exit_point(&sr, tc), exit_point(&tr, sc));
				let (start_arrow, end_arrow) = match display {
					EdgeDisplay::Bidirectional => (true, true),
					EdgeDisplay::OneWay => (false, true),
					_ => (false, false),
				};
				draw_segment(ctx, from, to, width, line, start_arrow, end_arrow);
				if let Some(text) = label {
					draw_label(ctx, text, Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
				}
			}
		}
	}
}

fn draw_segment(
	ctx: &CanvasRenderingContext2d,
	from: Point,
	to: Point,
	width: f64,
	color: &str,
	start_arrow: bool,
	end_arrow: bool,
) {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let dist = (dx * dx + dy * dy).sqrt().max(0.001);
	let (ux, uy) = (dx / dist, dy / dist);
	let trim = |arrow: bool| if arrow { ARROW } else { 0.0 };

	ctx.set_stroke_style_str(color);
	ctx.set_line_width(width);
	ctx.begin_path();
	ctx.move_to(from.x + ux * trim(start_arrow), from.y + uy * trim(start_arrow));
	ctx.line_to(to.x - ux * trim(end_arrow), to.y - uy * trim(end_arrow));
	ctx.stroke();

	ctx.set_fill_style_str(color);
	if end_arrow {
		draw_arrow(ctx, to, ux, uy);
	}
	if start_arrow {
		draw_arrow(ctx, from, -ux, -uy);
	}
}

fn draw_arrow(ctx: &CanvasRenderingContext2d, tip: Point, ux: f64, uy: f64) {
	let (back_x, back_y) = (tip.x - ux * ARROW, tip.y - uy * ARROW);
	let (px, py) = (-uy * ARROW * 0.5, ux * ARROW * 0.5);
	ctx.begin_path();
	ctx.move_to(tip.x, tip.y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_label(ctx: &CanvasRenderingContext2d, text: &str, at: Point) {
	ctx.set_font(LABEL_FONT);
	let width = ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0);
	ctx.set_fill_style_str("rgba(26, 26, 46, 0.85)");
	ctx.fill_rect(at.x - width / 2.0 - 4.0, at.y - 8.0, width + 8.0, 16.0);
	ctx.set_fill_style_str("rgba(255, 255, 255, 0.8)");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(text, at.x, at.y);
	ctx.set_text_align("start");
}

fn draw_connect_preview(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let Gesture::Connect { from, at } = &state.gesture else {
		return;
	};
	let Some(source) = state.controller.node(from) else {
		return;
	};
	let k = state.viewport.zoom;
	let (dash, gap) = (8.0 / k, 4.0 / k);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(dash),
		&JsValue::from_f64(gap),
	));
	ctx.set_line_dash_offset(-(state.flow_time * 30.0) % (dash + gap));
	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
	ctx.set_line_width(1.5 / k);

	let start = exit_point(&source.rect(), *at);
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	ctx.line_to(at.x, at.y);
	ctx.stroke();

	if let Some(target) = state.controller.find_connection_target(*at, from) {
		let r = target.rect().inflate(4.0);
		ctx.stroke_rect(r.x, r.y, r.w, r.h);
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.viewport.zoom;

	for node in state.controller.nodes() {
		let r = node.rect();
		let hovered = state.hover.as_deref() == Some(node.id.as_str());

		ctx.set_fill_style_str(match node.kind {
			NodeKind::Person => "#24344f",
			NodeKind::Item => "#3a2a4f",
		});
		ctx.fill_rect(r.x, r.y, r.w, r.h);

		let (stroke, width) = if node.selected {
			("#ffd166", 2.5)
		} else if hovered {
			("#9ecbff", 2.0)
		} else {
			("rgba(255, 255, 255, 0.25)", 1.0)
		};
		ctx.set_stroke_style_str(stroke);
		ctx.set_line_width(width / k.max(0.5));
		ctx.stroke_rect(r.x, r.y, r.w, r.h);

		let mid_y = r.y + r.h / 2.0;
		if node.kind == NodeKind::Person {
			let (cx, radius) = (r.x + PADDING + AVATAR / 2.0, AVATAR / 2.0);
			ctx.begin_path();
			let _ = ctx.arc(cx, mid_y, radius, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(if node.data.image.is_some() { "#5a7fb0" } else { "#3b5b8a" });
			ctx.fill();

			let initial: String = node.data.name.chars().take(1).collect();
			ctx.set_font(NAME_FONT);
			ctx.set_fill_style_str("white");
			ctx.set_text_align("center");
			ctx.set_text_baseline("middle");
			let _ = ctx.fill_text(&initial.to_uppercase(), cx, mid_y);
			ctx.set_text_align("start");
		}

		ctx.set_font(NAME_FONT);
		ctx.set_fill_style_str("white");
		ctx.set_text_baseline("middle");
		let _ = ctx.fill_text(&node.data.name, r.x + PADDING + avatar_slot(node.kind), mid_y);
	}
}
