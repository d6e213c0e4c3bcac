use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::layout::{LayoutConfig, LayoutController, Point, Relationship, Viewport};
use crate::store::{self, DomainStore, MemoryStore};

/// Screen pixels a press may travel and still count as a click.
pub const CLICK_SLOP: f64 = 4.0;

/// Default label for relationships drawn on the canvas.
pub const NEW_RELATIONSHIP_LABEL: &str = "related";

/// Pointer gesture in progress.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gesture {
	/// Nothing pressed.
	#[default]
	Idle,
	/// Dragging the background.
	Pan {
		start: (f64, f64),
		origin: (f64, f64),
		moved: bool,
	},
	/// Pressed on a node; becomes a layout drag once the pointer leaves the slop.
	Drag {
		id: String,
		start: (f64, f64),
		grab: Point,
		moved: bool,
	},
	/// Dragging a new connection out of `from`.
	Connect { from: String, at: Point },
}

/// What a pointer release amounts to.
#[derive(Clone, Debug, PartialEq)]
pub enum Release {
	/// Nothing for the host to do.
	None,
	/// A click on a node, or on the background.
	Click(Option<String>),
	/// A connection gesture ended; `to` is the captured target, if any.
	Connect { from: String, to: Option<String> },
}

pub struct CanvasState {
	pub controller: LayoutController<MemoryStore>,
	pub viewport: Viewport,
	pub gesture: Gesture,
	pub hover: Option<String>,
	pub flow_time: f64,
	last_frame: Option<f64>,
}

impl CanvasState {
	pub fn new(store: Rc<RefCell<MemoryStore>>, width: f64, height: f64, seed: u64) -> Self {
		let config = LayoutConfig {
			center: Point::new(width / 2.0, height / 2.0),
			..LayoutConfig::default()
		};
		let mut controller = LayoutController::new(store, config, seed);
		controller.sync_structure();

		Self {
			controller,
			viewport: Viewport::new(width, height),
			gesture: Gesture::Idle,
			hover: None,
			flow_time: 0.0,
			last_frame: None,
		}
	}

	/// Advance animations to `now` (milliseconds). Returns whether nodes moved.
	pub fn frame(&mut self, now: f64) -> bool {
		if let Some(last) = self.last_frame {
			// clamp so a backgrounded tab doesn't jump the edge flow
			self.flow_time += ((now - last) / 1000.0).clamp(0.0, 0.1);
		}
		self.last_frame = Some(now);
		self.controller.on_frame(now)
	}

	pub fn node_at_screen(&self, sx: f64, sy: f64) -> Option<String> {
		let p = self.viewport.screen_to_canvas(sx, sy);
		self.controller.node_at(p).map(|n| n.id.clone())
	}

	pub fn pointer_down(&mut self, sx: f64, sy: f64, connect: bool) {
		let p = self.viewport.screen_to_canvas(sx, sy);
		self.gesture = match self.node_at_screen(sx, sy) {
			Some(from) if connect => Gesture::Connect { from, at: p },
			Some(id) => Gesture::Drag {
				id,
				start: (sx, sy),
				grab: p,
				moved: false,
			},
			None => Gesture::Pan {
				start: (sx, sy),
				origin: (self.viewport.x, self.viewport.y),
				moved: false,
			},
		};
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		let p = self.viewport.screen_to_canvas(sx, sy);
		let beyond_slop = |start: (f64, f64)| (sx - start.0).hypot(sy - start.1) > CLICK_SLOP;

		match &mut self.gesture {
			Gesture::Idle => {
				self.hover = self.controller.node_at(p).map(|n| n.id.clone());
			}
			Gesture::Pan { start, origin, moved } => {
				*moved |= beyond_slop(*start);
				self.viewport.x = origin.0 + (sx - start.0);
				self.viewport.y = origin.1 + (sy - start.1);
			}
			Gesture::Drag {
				id,
				start,
				grab,
				moved,
			} => {
				if !*moved && beyond_slop(*start) {
					*moved = self.controller.drag_start(id, *grab);
				}
				if *moved {
					self.controller.drag_move(p);
				}
			}
			Gesture::Connect { at, .. } => *at = p,
		}
	}

	pub fn pointer_up(&mut self) -> Release {
		match std::mem::take(&mut self.gesture) {
			Gesture::Drag { moved: true, .. } => {
				self.controller.drag_end();
				Release::None
			}
			Gesture::Drag { id, .. } => Release::Click(Some(id)),
			Gesture::Pan { moved: false, .. } => Release::Click(None),
			Gesture::Pan { .. } | Gesture::Idle => Release::None,
			Gesture::Connect { from, at } => {
				let to = self
					.controller
					.find_connection_target(at, &from)
					.map(|n| n.id.clone());
				Release::Connect { from, to }
			}
		}
	}

	pub fn pointer_leave(&mut self) {
		if matches!(self.gesture, Gesture::Drag { moved: true, .. }) {
			self.controller.drag_end();
		}
		self.gesture = Gesture::Idle;
		self.hover = None;
	}

	pub fn zoom(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.viewport.zoom_at(sx, sy, factor);
	}

	/// Animate an ego layout around the node under the pointer.
	pub fn ego_at(&mut self, sx: f64, sy: f64) -> bool {
		let Some(id) = self.node_at_screen(sx, sy) else {
			return false;
		};
		self.controller.start_ego_layout(&id, &self.viewport)
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(width, height);
	}
}

/// Store a new undirected relationship between two entities.
pub fn connect_entities(store: &RefCell<MemoryStore>, from: &str, to: &str) -> store::Result<String> {
	let mut store = store.borrow_mut();
	let id = store.new_id("rel");
	store.add_relationship(Relationship::new(id.clone(), from, to, NEW_RELATIONSHIP_LABEL))?;
	debug!("connected {from} to {to} as {id}");
	Ok(id)
}
