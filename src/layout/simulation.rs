//! Continuous force-directed layout.
//!
//! Alpha-cooled integration in the style of d3-force:
//! every tick blends alpha towards its target, accumulates link, charge and
//! collision impulses into velocities, integrates, then nudges the whole
//! layout towards the canvas center. Bodies live in center coordinates;
//! visual nodes are top-left anchored, so conversion happens at the edges.
//!
//! The engine is owned by the layout controller: created when force layout is
//! enabled, dropped when it is disabled. Everything outside can only start,
//! reheat, pin, unpin or stop it.

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use log::debug;

use super::types::{ForceParams, Point, Size, VisualEdge, VisualNode};

/// Below this alpha the engine is cool and ticks stop.
pub const ALPHA_MIN: f64 = 0.001;
/// Alpha used to reheat on parameter change, reseed and drag.
pub const REHEAT_ALPHA: f64 = 0.3;

const VELOCITY_DECAY: f64 = 0.4;
const CENTER_STRENGTH: f64 = 0.1;
const COLLIDE_STRENGTH: f64 = 0.7;
const COLLIDE_ITERATIONS: usize = 3;
const CHARGE_DISTANCE_MIN_SQ: f64 = 1.0;

fn alpha_decay() -> f64 {
	1.0 - ALPHA_MIN.powf(1.0 / 300.0)
}

/// Deterministic sub-pixel offset for coincident bodies.
fn jiggle(i: usize, j: usize) -> (f64, f64) {
	let angle = ((i as f64) * 0.618_034 + (j as f64) * 0.414_214) * TAU;
	(angle.cos() * 1e-6, angle.sin() * 1e-6)
}

#[derive(Clone, Debug)]
struct Body {
	id: String,
	x: f64,
	y: f64,
	vx: f64,
	vy: f64,
	half: Size,
	radius: f64,
}

impl Body {
	fn from_node(node: &VisualNode, margin: f64) -> Self {
		let mut body = Self {
			id: node.id.clone(),
			x: node.position.x,
			y: node.position.y,
			vx: 0.0,
			vy: 0.0,
			half: Size::default(),
			radius: 0.0,
		};
		body.resize(node.size(), margin);
		body
	}

	fn resize(&mut self, size: Size, margin: f64) {
		let top_left = self.top_left();
		self.half = Size::new(size.w / 2.0, size.h / 2.0);
		self.radius = size.w.max(size.h) / 2.0 + margin / 2.0;
		self.x = top_left.x + self.half.w;
		self.y = top_left.y + self.half.h;
	}

	fn top_left(&self) -> Point {
		Point::new(self.x - self.half.w, self.y - self.half.h)
	}
}

#[derive(Clone, Copy, Debug)]
struct Link {
	source: usize,
	target: usize,
	bias: f64,
}

/// Live state of the force layout.
#[derive(Clone, Debug)]
pub struct Simulation {
	params: ForceParams,
	center: Point,
	margin: f64,
	bodies: Vec<Body>,
	index: HashMap<String, usize>,
	links: Vec<Link>,
	/// Pinned top-left positions, by node id.
	pins: HashMap<String, Point>,
	alpha: f64,
	alpha_target: f64,
	edge_signature: HashSet<(String, String, String)>,
}

impl Simulation {
	/// Start a hot engine over the given graph, or `None` when there are no nodes.
	pub fn new(
		nodes: &[VisualNode],
		edges: &[VisualEdge],
		params: ForceParams,
		center: Point,
		margin: f64,
	) -> Option<Self> {
		if nodes.is_empty() {
			return None;
		}

		let mut sim = Self {
			params,
			center,
			margin,
			bodies: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			pins: HashMap::new(),
			alpha: 1.0,
			alpha_target: 0.0,
			edge_signature: HashSet::new(),
		};
		sim.load(nodes, edges, &HashMap::new());
		debug!("force engine started with {} nodes, {} links", sim.bodies.len(), sim.links.len());
		Some(sim)
	}

	fn load(
		&mut self,
		nodes: &[VisualNode],
		edges: &[VisualEdge],
		velocities: &HashMap<String, (f64, f64)>,
	) {
		self.bodies = nodes
			.iter()
			.map(|node| {
				let mut body = Body::from_node(node, self.margin);
				if let Some(&(vx, vy)) = velocities.get(&node.id) {
					body.vx = vx;
					body.vy = vy;
				}
				body
			})
			.collect();
		self.index = self
			.bodies
			.iter()
			.enumerate()
			.map(|(i, b)| (b.id.clone(), i))
			.collect();

		let mut degree = vec![0usize; self.bodies.len()];
		let pairs: Vec<(usize, usize)> = edges
			.iter()
			.filter_map(|e| Some((*self.index.get(&e.source)?, *self.index.get(&e.target)?)))
			.filter(|(s, t)| s != t)
			.collect();
		for &(s, t) in &pairs {
			degree[s] += 1;
			degree[t] += 1;
		}
		self.links = pairs
			.into_iter()
			.map(|(source, target)| Link {
				source,
				target,
				bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
			})
			.collect();

		self.edge_signature = signature(edges);
		self.pins.retain(|id, _| self.index.contains_key(id));
	}

	/// Whether the node and edge id sets still match what the engine was seeded with.
	pub fn structure_matches(&self, nodes: &[VisualNode], edges: &[VisualEdge]) -> bool {
		nodes.len() == self.bodies.len()
			&& nodes.iter().all(|n| self.index.contains_key(&n.id))
			&& signature(edges) == self.edge_signature
	}

	/// Re-seed from the current visual positions after a structural change.
	///
	/// Surviving bodies keep their velocity, alpha is kept (but raised to at
	/// least [`REHEAT_ALPHA`]) and pins stay while their node exists.
	pub fn reseed(&mut self, nodes: &[VisualNode], edges: &[VisualEdge]) {
		let velocities: HashMap<String, (f64, f64)> = self
			.bodies
			.iter()
			.map(|b| (b.id.clone(), (b.vx, b.vy)))
			.collect();
		self.load(nodes, edges, &velocities);
		self.alpha = self.alpha.max(REHEAT_ALPHA);
		debug!("force engine reseeded: {} nodes, alpha {:.3}", self.bodies.len(), self.alpha);
	}

	/// Swap in new parameters and reheat briefly.
	pub fn set_params(&mut self, params: ForceParams) {
		self.params = params;
		self.alpha = self.alpha.max(REHEAT_ALPHA);
	}

	/// Current parameters.
	pub fn params(&self) -> ForceParams {
		self.params
	}

	/// Take a node's measured box into account, keeping its top-left corner.
	///
	/// Reheats when the size actually changed. Returns `false` for an unknown node.
	pub fn set_size(&mut self, id: &str, size: Size) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let body = &mut self.bodies[i];
		if body.half == Size::new(size.w / 2.0, size.h / 2.0) {
			return true;
		}
		body.resize(size, self.margin);
		self.alpha = self.alpha.max(REHEAT_ALPHA);
		true
	}

	/// Pin a node's top-left corner to `at` and keep the engine warm.
	///
	/// Returns `false` when the node is unknown.
	pub fn pin(&mut self, id: &str, at: Point) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		self.pins.insert(id.to_string(), at);
		let body = &mut self.bodies[i];
		body.x = at.x + body.half.w;
		body.y = at.y + body.half.h;
		body.vx = 0.0;
		body.vy = 0.0;
		self.alpha_target = REHEAT_ALPHA;
		self.alpha = self.alpha.max(REHEAT_ALPHA);
		true
	}

	/// Release a pin and let the engine cool down.
	pub fn unpin(&mut self, id: &str) {
		self.pins.remove(id);
		if self.pins.is_empty() {
			self.alpha_target = 0.0;
		}
	}

	/// Whether `id` is currently pinned.
	pub fn is_pinned(&self, id: &str) -> bool {
		self.pins.contains_key(id)
	}

	/// Current alpha.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Whether further ticks would move anything.
	pub fn is_hot(&self) -> bool {
		self.alpha >= ALPHA_MIN || self.alpha_target >= ALPHA_MIN
	}

	/// Advance one step. Returns `false`, without moving anything, once cool.
	pub fn tick(&mut self) -> bool {
		if !self.is_hot() {
			return false;
		}

		self.alpha += (self.alpha_target - self.alpha) * alpha_decay();

		self.apply_links();
		self.apply_charge();
		for _ in 0..COLLIDE_ITERATIONS {
			self.apply_collisions();
		}
		self.apply_center();

		for body in &mut self.bodies {
			match self.pins.get(&body.id) {
				Some(pin) => {
					body.x = pin.x + body.half.w;
					body.y = pin.y + body.half.h;
					body.vx = 0.0;
					body.vy = 0.0;
				}
				None => {
					body.vx *= 1.0 - VELOCITY_DECAY;
					body.vy *= 1.0 - VELOCITY_DECAY;
					body.x += body.vx;
					body.y += body.vy;
				}
			}
		}

		if !self.is_hot() {
			debug!("force engine cooled");
		}
		true
	}

	fn apply_links(&mut self) {
		let (distance, strength) = (self.params.link_distance, self.params.link_strength);
		for (k, link) in self.links.iter().enumerate() {
			let (s, t) = (&self.bodies[link.source], &self.bodies[link.target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 && y == 0.0 {
				(x, y) = jiggle(k, link.target);
			}
			let len = (x * x + y * y).sqrt();
			let l = (len - distance) / len * self.alpha * strength;
			let (x, y) = (x * l, y * l);

			let t = &mut self.bodies[link.target];
			t.vx -= x * link.bias;
			t.vy -= y * link.bias;
			let s = &mut self.bodies[link.source];
			s.vx += x * (1.0 - link.bias);
			s.vy += y * (1.0 - link.bias);
		}
	}

	fn apply_charge(&mut self) {
		let strength = self.params.charge_strength * self.alpha;
		let n = self.bodies.len();
		for i in 0..n {
			let (mut ax, mut ay) = (0.0, 0.0);
			for j in 0..n {
				if i == j {
					continue;
				}
				let mut dx = self.bodies[j].x - self.bodies[i].x;
				let mut dy = self.bodies[j].y - self.bodies[i].y;
				if dx == 0.0 && dy == 0.0 {
					(dx, dy) = jiggle(i, j);
				}
				let mut l = dx * dx + dy * dy;
				if l < CHARGE_DISTANCE_MIN_SQ {
					l = (CHARGE_DISTANCE_MIN_SQ * l).sqrt();
				}
				let w = strength / l;
				ax += dx * w;
				ay += dy * w;
			}
			self.bodies[i].vx += ax;
			self.bodies[i].vy += ay;
		}
	}

	fn apply_collisions(&mut self) {
		let n = self.bodies.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let (a, b) = (&self.bodies[i], &self.bodies[j]);
				let r = a.radius + b.radius;
				let mut x = a.x + a.vx - b.x - b.vx;
				let mut y = a.y + a.vy - b.y - b.vy;
				let mut l = x * x + y * y;
				if l >= r * r {
					continue;
				}
				if x == 0.0 && y == 0.0 {
					(x, y) = jiggle(i, j);
					l = x * x + y * y;
				}
				let len = l.sqrt();
				let push = (r - len) / len * COLLIDE_STRENGTH;
				let (x, y) = (x * push, y * push);
				let (ra2, rb2) = (a.radius * a.radius, b.radius * b.radius);
				let ratio = rb2 / (ra2 + rb2);

				let a = &mut self.bodies[i];
				a.vx += x * ratio;
				a.vy += y * ratio;
				let b = &mut self.bodies[j];
				b.vx -= x * (1.0 - ratio);
				b.vy -= y * (1.0 - ratio);
			}
		}
	}

	fn apply_center(&mut self) {
		let n = self.bodies.len() as f64;
		let (sx, sy) = self
			.bodies
			.iter()
			.fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
		let dx = (self.center.x - sx / n) * CENTER_STRENGTH;
		let dy = (self.center.y - sy / n) * CENTER_STRENGTH;
		for body in &mut self.bodies {
			body.x += dx;
			body.y += dy;
		}
	}

	/// Top-left position of every body, by id.
	pub fn positions(&self) -> impl Iterator<Item = (&str, Point)> + '_ {
		self.bodies.iter().map(|b| (b.id.as_str(), b.top_left()))
	}

	/// Write engine positions into `nodes` in place; selection and identity stay.
	pub fn apply_to(&self, nodes: &mut [VisualNode]) {
		for node in nodes {
			if let Some(&i) = self.index.get(&node.id) {
				node.position = self.bodies[i].top_left();
			}
		}
	}
}

fn signature(edges: &[VisualEdge]) -> HashSet<(String, String, String)> {
	edges
		.iter()
		.map(|e| (e.id.clone(), e.source.clone(), e.target.clone()))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::mapper::{map_entities, map_relationships};
	use crate::layout::types::{Entity, Relationship};

	fn pair(far: f64) -> (Vec<VisualNode>, Vec<VisualEdge>) {
		let nodes = map_entities(&[
			Entity::person("a", "Ada").at(0.0, 0.0),
			Entity::person("b", "Bo").at(far, 0.0),
		]);
		let edges = map_relationships(&[Relationship::new("ab", "a", "b", "sibling")]);
		(nodes, edges)
	}

	fn center_distance(sim: &Simulation) -> f64 {
		let p: Vec<Point> = sim.positions().map(|(_, p)| p).collect();
		((p[1].x - p[0].x).powi(2) + (p[1].y - p[0].y).powi(2)).sqrt()
	}

	#[test]
	fn test_zero_nodes_is_stopped() {
		assert!(Simulation::new(&[], &[], ForceParams::default(), Point::ORIGIN, 10.0).is_none());
	}

	#[test]
	fn test_link_pulls_distant_nodes_together() {
		let (nodes, edges) = pair(3000.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		let before = center_distance(&sim);
		for _ in 0..200 {
			sim.tick();
		}
		assert!(center_distance(&sim) < before / 2.0);
	}

	#[test]
	fn test_cools_down_and_stops() {
		let (nodes, edges) = pair(200.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		let mut ticks = 0;
		while sim.tick() {
			ticks += 1;
			assert!(ticks < 1000, "engine never cooled");
		}
		assert!(!sim.is_hot());
		assert!(!sim.tick());
	}

	#[test]
	fn test_pinned_node_follows_pin() {
		let (nodes, edges) = pair(400.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		assert!(sim.pin("a", Point::new(-250.0, 75.0)));
		for _ in 0..50 {
			sim.tick();
		}
		let a = sim.positions().find(|(id, _)| *id == "a").unwrap().1;
		assert_eq!(a, Point::new(-250.0, 75.0));

		sim.unpin("a");
		assert!(!sim.is_pinned("a"));
		assert!(!sim.pin("ghost", Point::ORIGIN));
	}

	#[test]
	fn test_reseed_keeps_warmth_and_pin() {
		let (mut nodes, mut edges) = pair(400.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		for _ in 0..20 {
			sim.tick();
		}
		sim.pin("b", Point::new(10.0, 10.0));
		let alpha = sim.alpha();

		nodes.extend(map_entities(&[Entity::person("c", "Cy").at(50.0, 50.0)]));
		edges.extend(map_relationships(&[Relationship::new("bc", "b", "c", "friend")]));
		assert!(!sim.structure_matches(&nodes, &edges));

		sim.reseed(&nodes, &edges);
		assert!(sim.structure_matches(&nodes, &edges));
		assert!(sim.alpha() >= alpha);
		assert!(sim.is_pinned("b"));

		nodes.remove(1);
		edges.clear();
		sim.reseed(&nodes, &edges);
		assert!(!sim.is_pinned("b"));
	}

	#[test]
	fn test_cosmetic_change_matches_structure() {
		let (mut nodes, edges) = pair(400.0);
		let sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		nodes[0].selected = true;
		nodes[1].data.name = "Bob".into();
		assert!(sim.structure_matches(&nodes, &edges));
	}

	#[test]
	fn test_set_params_reheats() {
		let (nodes, edges) = pair(200.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		while sim.tick() {}
		let params = ForceParams {
			link_distance: 60.0,
			..ForceParams::default()
		};
		sim.set_params(params);
		assert_eq!(sim.params(), params);
		assert!(sim.is_hot());
	}

	#[test]
	fn test_measured_size_keeps_wide_boxes_apart() {
		let (nodes, edges) = pair(200.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 16.0).unwrap();
		while sim.tick() {}

		let wide = Size::new(600.0, 60.0);
		assert!(sim.set_size("a", wide));
		assert!(sim.set_size("b", wide));
		assert!(!sim.set_size("ghost", wide));
		assert!(sim.is_hot());
		while sim.tick() {}

		// bodies repel as circles of radius 308, so centers end well past one box width
		assert!(center_distance(&sim) > 550.0, "{}", center_distance(&sim));
	}

	#[test]
	fn test_set_size_keeps_top_left() {
		let (nodes, edges) = pair(400.0);
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		let before = sim.positions().next().unwrap().1;
		sim.set_size("a", Size::new(300.0, 100.0));
		assert_eq!(sim.positions().next().unwrap().1, before);
	}

	#[test]
	fn test_apply_to_keeps_selection() {
		let (mut nodes, edges) = pair(300.0);
		nodes[1].selected = true;
		let mut sim = Simulation::new(&nodes, &edges, ForceParams::default(), Point::ORIGIN, 10.0).unwrap();
		sim.tick();
		sim.apply_to(&mut nodes);
		assert!(nodes[1].selected);
		assert_eq!(nodes[1].position, sim.positions().nth(1).unwrap().1);
	}
}
