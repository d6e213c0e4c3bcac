use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{CanvasState, Release, connect_entities};
use crate::store::MemoryStore;

type SharedState = Rc<RefCell<Option<CanvasState>>>;

fn window_size(window: &Window) -> (f64, f64) {
	(
		window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
		window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
	)
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Canvas view of the store's entities and relationships.
///
/// `revision` must be bumped after every store mutation made outside the
/// canvas; `selected` and `force` are shared with the surrounding page.
#[component]
pub fn GraphCanvas(
	store: Rc<RefCell<MemoryStore>>,
	revision: RwSignal<u64>,
	selected: RwSignal<HashSet<String>>,
	force: RwSignal<bool>,
	#[prop(default = false)] fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, store_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), store.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if state_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			error!("no window, canvas not started");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			canvas
				.parent_element()
				.map(|p| (p.client_width() as f64, p.client_height() as f64))
				.unwrap_or((800.0, 600.0))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("2d context unavailable, canvas not started");
			return;
		};

		let mut initial = CanvasState::new(store_init.clone(), w, h, js_sys::Date::now() as u64);
		initial.controller.sync_selection(&selected.get_untracked());
		initial.controller.set_force_enabled(force.get_untracked());
		*state_init.borrow_mut() = Some(initial);
		info!("graph canvas started at {w}x{h}");

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			// unmounted: release the layout and stop requesting frames
			if canvas_ref.try_get_untracked().flatten().is_none() {
				if let Some(mut s) = state_anim.borrow_mut().take() {
					s.controller.teardown();
				}
				return;
			}

			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.frame(now);
				for (id, size) in render::measure_nodes(s.controller.nodes(), &ctx) {
					s.controller.report_node_size(&id, size);
				}
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_rev = state.clone();
	Effect::new(move |_| {
		revision.track();
		if let Some(ref mut s) = *state_rev.borrow_mut() {
			let added = s.controller.sync_structure();
			if !added.is_empty() {
				debug!("{} new nodes on canvas", added.len());
			}
		}
	});

	let state_sel = state.clone();
	Effect::new(move |_| {
		let ids = selected.get();
		if let Some(ref mut s) = *state_sel.borrow_mut() {
			s.controller.sync_selection(&ids);
		}
	});

	let state_force = state.clone();
	Effect::new(move |_| {
		let on = force.get();
		if let Some(ref mut s) = *state_force.borrow_mut() {
			s.controller.set_force_enabled(on);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y, ev.shift_key());
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let (state_mu, store_mu) = (state.clone(), store.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let release = match *state_mu.borrow_mut() {
			Some(ref mut s) => s.pointer_up(),
			None => return,
		};
		let additive = ev.ctrl_key() || ev.meta_key();

		match release {
			Release::Click(hit) => selected.update(|ids| match hit {
				Some(id) if additive => {
					if !ids.remove(&id) {
						ids.insert(id);
					}
				}
				Some(id) => {
					ids.clear();
					ids.insert(id);
				}
				None => ids.clear(),
			}),
			Release::Connect { from, to: Some(to) } => match connect_entities(&store_mu, &from, &to) {
				Ok(_) => revision.update(|r| *r += 1),
				Err(e) => warn!("connection not stored: {e}"),
			},
			Release::Connect { from, to: None } => debug!("connection from {from} dropped on empty canvas"),
			Release::None => {}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_dc = state.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let started = match *state_dc.borrow_mut() {
			Some(ref mut s) => s.ego_at(x, y),
			None => false,
		};
		// ego layout switches the force engine off
		if started && force.get_untracked() {
			force.set(false);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:dblclick=on_dblclick
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
