//! Radial "ego network" layout.
//!
//! Rings are hop counts from the focal node, found by breadth-first search
//! over relationships taken as undirected. Nodes the search never reaches go
//! on one extra ring outside the furthest reached one, so every node gets a
//! place. Members of a ring keep node-list order and sit at even angular
//! steps starting from the top.

use std::collections::{HashMap, VecDeque};

use super::types::{EgoLayoutParams, Point, VisualEdge, VisualNode};

/// Start angle of every ring: straight up.
const START_ANGLE: f64 = -std::f64::consts::FRAC_PI_2;

/// Cubic ease-out: fast start, gentle landing.
pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Hop distance from `focal` for every node, or `None` if `focal` is unknown.
pub fn ring_distances(
	focal: &str,
	nodes: &[VisualNode],
	edges: &[VisualEdge],
) -> Option<HashMap<String, usize>> {
	if !nodes.iter().any(|n| n.id == focal) {
		return None;
	}

	let mut neighbors: HashMap<&str, Vec<&str>> = HashMap::new();
	for edge in edges {
		neighbors.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
		neighbors.entry(edge.target.as_str()).or_default().push(edge.source.as_str());
	}

	let mut rings: HashMap<String, usize> = HashMap::new();
	let mut queue = VecDeque::from([(focal, 0usize)]);
	rings.insert(focal.to_string(), 0);

	while let Some((id, ring)) = queue.pop_front() {
		for &next in neighbors.get(id).map(Vec::as_slice).unwrap_or(&[]) {
			if !rings.contains_key(next) {
				rings.insert(next.to_string(), ring + 1);
				queue.push_back((next, ring + 1));
			}
		}
	}

	// edges may name ids without a node; only real nodes count towards the outer ring
	rings.retain(|id, _| nodes.iter().any(|n| &n.id == id));
	let outer = rings.values().copied().max().unwrap_or(0) + 1;
	for node in nodes {
		rings.entry(node.id.clone()).or_insert(outer);
	}
	Some(rings)
}

/// Target top-left position of every node, centered on `center`.
///
/// Ring `r` has radius `r * ring_spacing`; its `k` members sit at
/// `-90° + i * angular_spread / k`.
pub fn ego_targets(
	focal: &str,
	nodes: &[VisualNode],
	edges: &[VisualEdge],
	params: &EgoLayoutParams,
	center: Point,
) -> Option<HashMap<String, Point>> {
	let rings = ring_distances(focal, nodes, edges)?;

	let mut members: HashMap<usize, Vec<&VisualNode>> = HashMap::new();
	for node in nodes {
		members.entry(rings[&node.id]).or_default().push(node);
	}

	let spread = params.angular_spread.to_radians();
	let mut targets = HashMap::with_capacity(nodes.len());
	for (ring, ring_nodes) in members {
		let radius = ring as f64 * params.ring_spacing;
		let step = spread / ring_nodes.len() as f64;
		for (i, node) in ring_nodes.into_iter().enumerate() {
			let angle = START_ANGLE + i as f64 * step;
			let size = node.size();
			let target = Point::new(
				center.x + radius * angle.cos() - size.w / 2.0,
				center.y + radius * angle.sin() - size.h / 2.0,
			);
			targets.insert(node.id.clone(), target);
		}
	}
	Some(targets)
}

/// An in-flight interpolation from current positions to ego targets.
#[derive(Clone, Debug)]
pub struct EgoAnimation {
	focal: String,
	from: HashMap<String, Point>,
	to: HashMap<String, Point>,
	duration_ms: f64,
	started_at: Option<f64>,
}

impl EgoAnimation {
	/// Animate `nodes` from where they are now to `to` over `duration_ms`.
	///
	/// The clock starts at the first [`EgoAnimation::step`].
	pub fn new(
		focal: impl Into<String>,
		nodes: &[VisualNode],
		to: HashMap<String, Point>,
		duration_ms: f64,
	) -> Self {
		let from = nodes
			.iter()
			.filter(|n| to.contains_key(&n.id))
			.map(|n| (n.id.clone(), n.position))
			.collect();
		Self {
			focal: focal.into(),
			from,
			to,
			duration_ms,
			started_at: None,
		}
	}

	/// Focal node id.
	pub fn focal(&self) -> &str {
		&self.focal
	}

	/// Final positions.
	pub fn targets(&self) -> &HashMap<String, Point> {
		&self.to
	}

	/// Eased progress in `[0, 1]` at `now`.
	pub fn progress(&self, now: f64) -> f64 {
		match self.started_at {
			Some(start) if self.duration_ms > 0.0 => {
				ease_out_cubic(((now - start) / self.duration_ms).clamp(0.0, 1.0))
			}
			Some(_) => 1.0,
			None => 0.0,
		}
	}

	/// Write interpolated positions into `nodes`; returns `true` once finished.
	///
	/// Nodes that vanished since the start are simply absent from `nodes`;
	/// nodes that appeared since are left alone. The finishing frame writes
	/// the targets exactly.
	pub fn step(&mut self, now: f64, nodes: &mut [VisualNode]) -> bool {
		let start = *self.started_at.get_or_insert(now);
		let finished = now - start >= self.duration_ms;
		let t = self.progress(now);

		for node in nodes {
			let (Some(&from), Some(&to)) = (self.from.get(&node.id), self.to.get(&node.id)) else {
				continue;
			};
			node.position = if finished { to } else { from.lerp(to, t) };
		}
		finished
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::mapper::{map_entities, map_relationships};
	use crate::layout::types::{Entity, Relationship};

	fn chain() -> (Vec<VisualNode>, Vec<VisualEdge>) {
		let nodes = map_entities(&[
			Entity::person("a", "A"),
			Entity::person("b", "B"),
			Entity::person("c", "C"),
			Entity::person("d", "D"),
		]);
		let edges = map_relationships(&[
			Relationship::new("ab", "a", "b", "x"),
			// direction must not matter for distance
			Relationship::new("cb", "c", "b", "x").directed(None),
			Relationship::new("cd", "c", "d", "x"),
		]);
		(nodes, edges)
	}

	fn angle_about(center: Point, node: &VisualNode, target: Point) -> f64 {
		let size = node.size();
		(target.y + size.h / 2.0 - center.y).atan2(target.x + size.w / 2.0 - center.x)
	}

	#[test]
	fn test_chain_rings() {
		let (nodes, edges) = chain();
		let rings = ring_distances("a", &nodes, &edges).unwrap();
		assert_eq!(rings["a"], 0);
		assert_eq!(rings["b"], 1);
		assert_eq!(rings["c"], 2);
		assert_eq!(rings["d"], 3);
	}

	#[test]
	fn test_chain_targets_sit_on_ring_radius() {
		let (nodes, edges) = chain();
		let params = EgoLayoutParams::default();
		let center = Point::new(500.0, 400.0);
		let targets = ego_targets("a", &nodes, &edges, &params, center).unwrap();

		for (node, ring) in nodes.iter().zip(0..) {
			let size = node.size();
			let t = targets[&node.id];
			let (cx, cy) = (t.x + size.w / 2.0 - center.x, t.y + size.h / 2.0 - center.y);
			let r = (cx * cx + cy * cy).sqrt();
			assert!((r - ring as f64 * params.ring_spacing).abs() < 1e-9, "{}", node.id);
		}
	}

	#[test]
	fn test_ring_members_evenly_spaced() {
		let nodes = map_entities(&[
			Entity::person("hub", "Hub"),
			Entity::person("n", "N"),
			Entity::item("e", "E"),
			Entity::person("s", "S"),
			Entity::person("w", "W"),
		]);
		let edges = map_relationships(&[
			Relationship::new("1", "hub", "n", "x"),
			Relationship::new("2", "e", "hub", "x"),
			Relationship::new("3", "hub", "s", "x"),
			Relationship::new("4", "w", "hub", "x"),
		]);
		let center = Point::new(0.0, 0.0);
		let targets = ego_targets("hub", &nodes, &edges, &EgoLayoutParams::default(), center).unwrap();

		let angles: Vec<f64> = nodes[1..]
			.iter()
			.map(|n| angle_about(center, n, targets[&n.id]))
			.collect();
		for pair in angles.windows(2) {
			let gap = (pair[1] - pair[0]).rem_euclid(std::f64::consts::TAU);
			assert!((gap - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
		}
	}

	#[test]
	fn test_unreachable_nodes_get_outer_ring() {
		let (mut nodes, edges) = chain();
		nodes.extend(map_entities(&[Entity::item("lone", "Lone"), Entity::item("far", "Far")]));
		let rings = ring_distances("a", &nodes, &edges).unwrap();
		assert_eq!(rings["lone"], 4);
		assert_eq!(rings["far"], 4);
		assert_eq!(rings.len(), nodes.len());
	}

	#[test]
	fn test_unknown_focal_is_skipped() {
		let (nodes, edges) = chain();
		assert!(ring_distances("ghost", &nodes, &edges).is_none());
		assert!(ego_targets("ghost", &nodes, &edges, &EgoLayoutParams::default(), Point::ORIGIN).is_none());
	}

	#[test]
	fn test_animation_eases_and_lands_exactly() {
		let (mut nodes, edges) = chain();
		for (i, node) in nodes.iter_mut().enumerate() {
			node.position = Point::new(i as f64 * 10.0, 0.0);
		}
		let targets = ego_targets("a", &nodes, &edges, &EgoLayoutParams::default(), Point::ORIGIN).unwrap();
		let mut anim = EgoAnimation::new("a", &nodes, targets.clone(), 300.0);

		assert!(!anim.step(1000.0, &mut nodes));
		assert_eq!(nodes[1].position, Point::new(10.0, 0.0));

		assert!(!anim.step(1150.0, &mut nodes));
		let expected = Point::new(10.0, 0.0).lerp(targets["b"], ease_out_cubic(0.5));
		assert_eq!(nodes[1].position, expected);

		assert!(anim.step(1300.0, &mut nodes));
		for node in &nodes {
			assert_eq!(node.position, targets[&node.id]);
		}
	}

	#[test]
	fn test_ease_out_cubic_endpoints() {
		assert_eq!(ease_out_cubic(0.0), 0.0);
		assert_eq!(ease_out_cubic(1.0), 1.0);
		assert_eq!(ease_out_cubic(0.5), 0.875);
	}
}
