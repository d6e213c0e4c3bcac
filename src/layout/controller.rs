//! Owner of the visual lists and of every driver that moves nodes.
//!
//! The host calls `sync_structure` when entities or relationships change,
//! `sync_selection` when the selection changes, forwards gestures, and calls
//! `on_frame` once per animation frame. At most one driver writes positions
//! in a frame:
//!
//!   ego animation  >  force engine  >  pending collision pass
//!
//! Manual drag writes positions directly only while the force engine is off;
//! with the engine on, the dragged node is pinned and the engine writes it.
//! The ego animation and the collision pass are single-owner tasks: scheduling
//! a new one replaces the handle of the previous one.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::collision::resolve_collisions;
use super::connect;
use super::ego::{EgoAnimation, ego_targets};
use super::mapper::{map_entities, map_relationships};
use super::simulation::Simulation;
use super::sync::{self, NodeSync, sync_edges, sync_nodes};
use super::types::{ForceParams, LayoutConfig, Point, Size, VisualEdge, VisualNode};
use super::viewport::Viewport;
use crate::store::DomainStore;

/// Handle of a scheduled single-owner task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

impl fmt::Display for TaskHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Which driver currently owns node positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
	/// Nothing is moving nodes.
	Idle,
	/// The force engine is hot.
	Force,
	/// An ego animation is in flight.
	Ego,
	/// A manual drag with the force engine off.
	Drag,
}

#[derive(Clone, Debug)]
struct DragState {
	id: String,
	/// Pointer minus node top-left at grab time.
	offset: Point,
}

/// Layout and view-synchronization engine over a [`DomainStore`].
pub struct LayoutController<S: DomainStore> {
	store: Rc<RefCell<S>>,
	config: LayoutConfig,
	nodes: Vec<VisualNode>,
	edges: Vec<VisualEdge>,
	selected: HashSet<String>,
	force_enabled: bool,
	simulation: Option<Simulation>,
	ego: Option<(TaskHandle, EgoAnimation)>,
	pending_collision: Option<TaskHandle>,
	drag: Option<DragState>,
	next_task: u64,
	rng: SmallRng,
}

impl<S: DomainStore> LayoutController<S> {
	/// A controller with empty visual lists; call [`Self::sync_structure`] to populate.
	///
	/// `seed` drives the scatter of new nodes that have no stored position.
	pub fn new(store: Rc<RefCell<S>>, config: LayoutConfig, seed: u64) -> Self {
		Self {
			store,
			config,
			nodes: Vec::new(),
			edges: Vec::new(),
			selected: HashSet::new(),
			force_enabled: false,
			simulation: None,
			ego: None,
			pending_collision: None,
			drag: None,
			next_task: 0,
			rng: SmallRng::seed_from_u64(seed),
		}
	}

	/// Current visual nodes.
	pub fn nodes(&self) -> &[VisualNode] {
		&self.nodes
	}

	/// Current visual edges.
	pub fn edges(&self) -> &[VisualEdge] {
		&self.edges
	}

	/// Visual node by id.
	pub fn node(&self, id: &str) -> Option<&VisualNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// The injected store.
	pub fn store(&self) -> &Rc<RefCell<S>> {
		&self.store
	}

	/// Engine constants.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Whether continuous force layout is switched on.
	pub fn force_enabled(&self) -> bool {
		self.force_enabled
	}

	/// The live force engine, if running.
	pub fn simulation(&self) -> Option<&Simulation> {
		self.simulation.as_ref()
	}

	/// Handle of the pending collision pass, if one is scheduled.
	pub fn pending_collision_pass(&self) -> Option<TaskHandle> {
		self.pending_collision
	}

	/// Handle and focal id of the in-flight ego animation.
	pub fn ego_in_flight(&self) -> Option<(TaskHandle, &str)> {
		self.ego.as_ref().map(|(h, anim)| (*h, anim.focal()))
	}

	/// Id of the node being dragged.
	pub fn dragging(&self) -> Option<&str> {
		self.drag.as_ref().map(|d| d.id.as_str())
	}

	/// The driver that owns positions right now.
	pub fn authority(&self) -> Authority {
		if self.ego.is_some() {
			Authority::Ego
		} else if self.drag.is_some() && self.simulation.is_none() {
			Authority::Drag
		} else if self.simulation.as_ref().is_some_and(Simulation::is_hot) {
			Authority::Force
		} else {
			Authority::Idle
		}
	}

	fn next_handle(&mut self) -> TaskHandle {
		self.next_task += 1;
		TaskHandle(self.next_task)
	}

	/// Re-derive the visual lists after entities or relationships changed.
	///
	/// Returns the ids that are new since the previous derivation.
	pub fn sync_structure(&mut self) -> Vec<String> {
		let (fresh_nodes, fresh_edges) = {
			let store = self.store.borrow();
			(map_entities(store.entities()), map_relationships(store.relationships()))
		};

		let synced = sync_nodes(&self.nodes, fresh_nodes, &mut self.rng);
		let has_new = synced.has_new();
		let NodeSync { nodes, added } = synced;
		self.nodes = nodes;
		self.edges = sync_edges(&self.edges, fresh_edges);

		let live: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		self.selected.retain(|id| live.contains(id.as_str()));
		if self.drag.as_ref().is_some_and(|d| !live.contains(d.id.as_str())) {
			debug!("dragged node vanished, dropping drag");
			self.drag = None;
		}
		if self.ego.as_ref().is_some_and(|(_, anim)| !live.contains(anim.focal())) {
			debug!("ego focal vanished, cancelling animation");
			self.ego = None;
		}
		self.refresh_selection();

		if self.force_enabled {
			self.sync_simulation();
		} else if has_new {
			self.schedule_collision_pass();
		}

		added
	}

	fn sync_simulation(&mut self) {
		if self.nodes.is_empty() {
			if self.simulation.take().is_some() {
				debug!("force engine stopped: no nodes left");
			}
			return;
		}

		match self.simulation.as_mut() {
			Some(sim) => {
				if !sim.structure_matches(&self.nodes, &self.edges) {
					sim.reseed(&self.nodes, &self.edges);
				}
			}
			None => {
				let params = self.store.borrow().force_params();
				self.simulation = Simulation::new(
					&self.nodes,
					&self.edges,
					params,
					self.config.center,
					self.config.collision_margin,
				);
			}
		}

		// a drag may have started before the engine existed
		if let (Some(sim), Some(drag)) = (self.simulation.as_mut(), self.drag.as_ref()) {
			if !sim.is_pinned(&drag.id) {
				if let Some(node) = self.nodes.iter().find(|n| n.id == drag.id) {
					sim.pin(&drag.id, node.position);
				}
			}
		}
	}

	/// Match `selected` flags to the given selected ids. Returns whether anything changed.
	pub fn sync_selection(&mut self, selected: &HashSet<String>) -> bool {
		self.selected = selected.clone();
		self.refresh_selection()
	}

	fn refresh_selection(&mut self) -> bool {
		let (nodes, edges) = sync::sync_selection(&self.nodes, &self.edges, &self.selected);
		let nodes = match nodes {
			Cow::Owned(nodes) => Some(nodes),
			Cow::Borrowed(_) => None,
		};
		let edges = match edges {
			Cow::Owned(edges) => Some(edges),
			Cow::Borrowed(_) => None,
		};

		let changed = nodes.is_some() || edges.is_some();
		if let Some(nodes) = nodes {
			self.nodes = nodes;
		}
		if let Some(edges) = edges {
			self.edges = edges;
		}
		changed
	}

	/// Record a size reported by the renderer.
	///
	/// A running force engine takes the new box into its bodies. Otherwise a
	/// node's first measurement schedules a collision pass, since its real box
	/// may overlap its neighbours.
	pub fn report_node_size(&mut self, id: &str, size: Size) -> bool {
		let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
			return false;
		};
		if node.measured == Some(size) {
			return false;
		}
		let first = node.measured.is_none();
		node.measured = Some(size);
		if let Some(sim) = self.simulation.as_mut() {
			sim.set_size(id, size);
		} else if first && !self.force_enabled && self.ego.is_none() {
			self.schedule_collision_pass();
		}
		true
	}

	/// Switch continuous force layout on or off.
	///
	/// Turning it on cancels any ego animation and pending collision pass.
	/// Turning it off discards the engine and writes final positions back.
	pub fn set_force_enabled(&mut self, enabled: bool) {
		if enabled == self.force_enabled {
			return;
		}
		self.force_enabled = enabled;

		if enabled {
			self.cancel_ego();
			self.cancel_collision_pass();
			self.sync_simulation();
			info!("force layout enabled");
		} else {
			if self.simulation.take().is_some() {
				let positions = self.positions_of(self.nodes.iter().map(|n| n.id.as_str()));
				self.store.borrow_mut().write_positions(&positions);
			}
			info!("force layout disabled");
		}
	}

	/// Store new force tunables and hand them to the live engine.
	pub fn set_force_params(&mut self, params: ForceParams) {
		self.store.borrow_mut().set_force_params(params);
		if let Some(sim) = self.simulation.as_mut() {
			sim.set_params(params);
		}
	}

	/// Grab a node at canvas point `pointer`. Returns `false` for an unknown id.
	pub fn drag_start(&mut self, id: &str, pointer: Point) -> bool {
		let Some(position) = self.node(id).map(|n| n.position) else {
			debug!("drag start on unknown node {id}");
			return false;
		};
		self.cancel_ego();
		self.drag = Some(DragState {
			id: id.to_string(),
			offset: Point::new(pointer.x - position.x, pointer.y - position.y),
		});
		if let Some(sim) = self.simulation.as_mut() {
			sim.pin(id, position);
		}
		true
	}

	/// Follow the pointer. Returns whether a node moved right away.
	pub fn drag_move(&mut self, pointer: Point) -> bool {
		let Some(drag) = self.drag.as_ref() else {
			return false;
		};
		let at = Point::new(pointer.x - drag.offset.x, pointer.y - drag.offset.y);

		match self.simulation.as_mut() {
			// the engine writes the pinned node on its next tick
			Some(sim) => {
				sim.pin(&drag.id, at);
				false
			}
			None => match self.nodes.iter_mut().find(|n| n.id == drag.id) {
				Some(node) => {
					node.position = at;
					true
				}
				None => false,
			},
		}
	}

	/// Release the dragged node.
	///
	/// With the engine on the pin is released; otherwise the position is
	/// written back and overlaps are resolved right away.
	pub fn drag_end(&mut self) {
		let Some(drag) = self.drag.take() else {
			return;
		};
		match self.simulation.as_mut() {
			Some(sim) => sim.unpin(&drag.id),
			None => {
				let positions = self.positions_of(std::iter::once(drag.id.as_str()));
				self.store.borrow_mut().write_positions(&positions);
				self.cancel_collision_pass();
				self.run_collision_pass();
			}
		}
	}

	/// Start an animated ego layout around `focal`, centered in `viewport`.
	///
	/// Disables the force engine first and replaces any in-flight ego
	/// animation. Returns `false`, changing nothing, for an unknown focal id.
	pub fn start_ego_layout(&mut self, focal: &str, viewport: &Viewport) -> bool {
		let params = self.store.borrow().ego_params();
		let Some(targets) =
			ego_targets(focal, &self.nodes, &self.edges, &params, viewport.visible_center())
		else {
			debug!("ego layout skipped: unknown focal {focal}");
			return false;
		};

		self.set_force_enabled(false);
		self.drag = None;
		self.cancel_collision_pass();

		let handle = self.next_handle();
		let anim = EgoAnimation::new(focal, &self.nodes, targets, self.config.ego_duration_ms);
		if let Some((old, _)) = self.ego.replace((handle, anim)) {
			debug!("ego animation {old} superseded by {handle}");
		}
		true
	}

	fn cancel_ego(&mut self) {
		if let Some((handle, _)) = self.ego.take() {
			debug!("ego animation {handle} cancelled");
		}
	}

	/// Schedule one collision pass for the next frame, replacing a pending one.
	pub fn schedule_collision_pass(&mut self) -> TaskHandle {
		let handle = self.next_handle();
		if let Some(old) = self.pending_collision.replace(handle) {
			debug!("collision pass {old} replaced by {handle}");
		}
		handle
	}

	fn cancel_collision_pass(&mut self) {
		self.pending_collision = None;
	}

	fn run_collision_pass(&mut self) -> bool {
		let resolved = match resolve_collisions(&self.nodes, self.config.collision_margin) {
			Cow::Borrowed(_) => return false,
			Cow::Owned(resolved) => resolved,
		};
		let moved: HashMap<String, Point> = resolved
			.iter()
			.zip(&self.nodes)
			.filter(|(new, old)| new.position != old.position)
			.map(|(new, _)| (new.id.clone(), new.position))
			.collect();
		self.nodes = resolved;
		self.store.borrow_mut().write_positions(&moved);
		debug!("collision pass moved {} nodes", moved.len());
		true
	}

	/// Advance whichever driver owns positions. Returns whether nodes moved.
	pub fn on_frame(&mut self, now: f64) -> bool {
		if let Some((_, anim)) = self.ego.as_mut() {
			if anim.step(now, &mut self.nodes) {
				let ids: Vec<String> = anim.targets().keys().cloned().collect();
				self.ego = None;
				let positions = self.positions_of(ids.iter().map(String::as_str));
				self.store.borrow_mut().write_positions(&positions);
				info!("ego layout finished, {} positions stored", positions.len());
			}
			return true;
		}

		if let Some(sim) = self.simulation.as_mut() {
			if sim.tick() {
				sim.apply_to(&mut self.nodes);
				return true;
			}
		}

		if self.drag.is_none() && self.pending_collision.take().is_some() {
			return self.run_collision_pass();
		}
		false
	}

	fn positions_of<'a>(&self, ids: impl Iterator<Item = &'a str>) -> HashMap<String, Point> {
		let wanted: HashSet<&str> = ids.collect();
		self.nodes
			.iter()
			.filter(|n| wanted.contains(n.id.as_str()))
			.map(|n| (n.id.clone(), n.position))
			.collect()
	}

	/// Topmost node whose box contains canvas point `p`.
	pub fn node_at(&self, p: Point) -> Option<&VisualNode> {
		self.nodes.iter().rev().find(|n| n.rect().contains(p))
	}

	/// Best drop target for a connection dragged out of `from`, released at `at`.
	pub fn find_connection_target(&self, at: Point, from: &str) -> Option<&VisualNode> {
		connect::find_connection_target(at, from, &self.nodes, self.config.capture_radius)
	}

	/// Cancel every pending task and drop the engine without writing back.
	pub fn teardown(&mut self) {
		self.cancel_ego();
		self.cancel_collision_pass();
		self.drag = None;
		self.simulation = None;
		debug!("layout controller torn down");
	}
}
