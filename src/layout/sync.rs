//! Reconcile freshly mapped visual lists with the previous ones.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use rand::Rng;

use super::types::{Point, VisualEdge, VisualNode};

/// Range new nodes without a stored position are scattered over, per axis.
pub const SCATTER_RANGE: Range<f64> = 100.0..600.0;

/// Result of a structural node sync.
#[derive(Clone, Debug)]
pub struct NodeSync {
	/// Fresh list carrying the prior view state.
	pub nodes: Vec<VisualNode>,
	/// Ids with no counterpart in the prior list, in fresh-list order.
	pub added: Vec<String>,
}

impl NodeSync {
	/// Whether any genuinely new id appeared.
	pub fn has_new(&self) -> bool {
		!self.added.is_empty()
	}
}

/// Carry position, selection and measured size over to `fresh`; place new ids.
///
/// A new node takes its entity's stored position when the field is present,
/// even at the origin. Otherwise both coordinates are drawn from
/// [`SCATTER_RANGE`].
pub fn sync_nodes<R: Rng + ?Sized>(
	prior: &[VisualNode],
	fresh: Vec<VisualNode>,
	rng: &mut R,
) -> NodeSync {
	let index: HashMap<&str, &VisualNode> = prior.iter().map(|n| (n.id.as_str(), n)).collect();
	let mut added = Vec::new();

	let nodes = fresh
		.into_iter()
		.map(|mut node| {
			match index.get(node.id.as_str()) {
				Some(old) => {
					node.position = old.position;
					node.selected = old.selected;
					node.measured = old.measured;
				}
				None => {
					node.position = match node.data.stored_position {
						Some(stored) => stored,
						None => Point::new(
							rng.gen_range(SCATTER_RANGE),
							rng.gen_range(SCATTER_RANGE),
						),
					};
					added.push(node.id.clone());
				}
			}
			node
		})
		.collect();

	NodeSync { nodes, added }
}

/// Carry edge selection over to `fresh`.
pub fn sync_edges(prior: &[VisualEdge], fresh: Vec<VisualEdge>) -> Vec<VisualEdge> {
	let selected: HashSet<&str> = prior
		.iter()
		.filter(|e| e.selected)
		.map(|e| e.id.as_str())
		.collect();

	fresh
		.into_iter()
		.map(|mut edge| {
			edge.selected = selected.contains(edge.id.as_str());
			edge
		})
		.collect()
}

/// Whether an edge counts as selected under the given node selection.
///
/// Only a selection of exactly two nodes selects anything: the edges
/// running between them.
pub fn edge_selected(edge: &VisualEdge, selected: &HashSet<String>) -> bool {
	selected.len() == 2 && selected.contains(&edge.source) && selected.contains(&edge.target)
}

/// Flip only `selected` flags to match `selected`.
///
/// Each list comes back borrowed when none of its flags changed, so callers
/// can skip a re-render.
pub fn sync_selection<'a>(
	nodes: &'a [VisualNode],
	edges: &'a [VisualEdge],
	selected: &HashSet<String>,
) -> (Cow<'a, [VisualNode]>, Cow<'a, [VisualEdge]>) {
	let nodes_dirty = nodes.iter().any(|n| n.selected != selected.contains(&n.id));
	let nodes = if nodes_dirty {
		Cow::Owned(
			nodes
				.iter()
				.map(|n| VisualNode {
					selected: selected.contains(&n.id),
					..n.clone()
				})
				.collect(),
		)
	} else {
		Cow::Borrowed(nodes)
	};

	let edges_dirty = edges.iter().any(|e| e.selected != edge_selected(e, selected));
	let edges = if edges_dirty {
		Cow::Owned(
			edges
				.iter()
				.map(|e| VisualEdge {
					selected: edge_selected(e, selected),
					..e.clone()
				})
				.collect(),
		)
	} else {
		Cow::Borrowed(edges)
	};

	(nodes, edges)
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;
	use crate::layout::mapper::{map_entities, map_relationships};
	use crate::layout::types::{Entity, Relationship};

	fn family() -> (Vec<Entity>, Vec<Relationship>) {
		let entities = vec![
			Entity::person("a", "Ada").at(10.0, 10.0),
			Entity::person("b", "Bo"),
			Entity::person("c", "Cy"),
		];
		let rels = vec![
			Relationship::new("ab", "a", "b", "sibling"),
			Relationship::new("bc", "b", "c", "cousin"),
		];
		(entities, rels)
	}

	#[test]
	fn test_new_nodes_use_stored_or_scattered_position() {
		let (mut entities, _) = family();
		entities.push(Entity::item("z", "Zero").at(0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(7);

		let sync = sync_nodes(&[], map_entities(&entities), &mut rng);

		assert_eq!(sync.added, ["a", "b", "c", "z"]);
		assert_eq!(sync.nodes[0].position, Point::new(10.0, 10.0));
		assert_eq!(sync.nodes[3].position, Point::ORIGIN);
		for node in &sync.nodes[1..3] {
			assert!(SCATTER_RANGE.contains(&node.position.x));
			assert!(SCATTER_RANGE.contains(&node.position.y));
		}
	}

	#[test]
	fn test_adding_one_entity_keeps_prior_positions() {
		let (mut entities, _) = family();
		let mut rng = StdRng::seed_from_u64(1);
		let mut first = sync_nodes(&[], map_entities(&entities), &mut rng).nodes;
		first[1].position = Point::new(333.0, 444.0);
		first[2].selected = true;

		entities.push(Entity::person("d", "Di"));
		let second = sync_nodes(&first, map_entities(&entities), &mut rng);

		assert_eq!(second.nodes.len(), 4);
		assert_eq!(second.added, ["d"]);
		for (old, new) in first.iter().zip(&second.nodes) {
			assert_eq!(old.position, new.position);
			assert_eq!(old.selected, new.selected);
		}
	}

	#[test]
	fn test_stored_position_is_ignored_for_existing_nodes() {
		let (mut entities, _) = family();
		let mut rng = StdRng::seed_from_u64(3);
		let mut first = sync_nodes(&[], map_entities(&entities), &mut rng).nodes;
		first[0].position = Point::new(50.0, 60.0);

		entities[0].position = Some(Point::new(999.0, 999.0));
		let second = sync_nodes(&first, map_entities(&entities), &mut rng);

		assert!(!second.has_new());
		assert_eq!(second.nodes[0].position, Point::new(50.0, 60.0));
	}

	#[test]
	fn test_selection_two_endpoints_selects_edge() {
		let (entities, rels) = family();
		let nodes = map_entities(&entities);
		let edges = map_relationships(&rels);

		let pick: HashSet<String> = ["a", "b"].map(String::from).into();
		let (nodes2, edges2) = sync_selection(&nodes, &edges, &pick);
		assert!(edges2[0].selected);
		assert!(!edges2[1].selected);
		assert_eq!(nodes2.iter().filter(|n| n.selected).count(), 2);
	}

	#[test]
	fn test_selection_unchanged_is_borrowed() {
		let (entities, rels) = family();
		let nodes = map_entities(&entities);
		let edges = map_relationships(&rels);

		let (n, e) = sync_selection(&nodes, &edges, &HashSet::new());
		assert!(matches!(n, Cow::Borrowed(_)));
		assert!(matches!(e, Cow::Borrowed(_)));
	}

	#[test]
	fn test_three_selected_selects_no_edge() {
		let (entities, rels) = family();
		let nodes = map_entities(&entities);
		let edges = map_relationships(&rels);

		let pick: HashSet<String> = ["a", "b", "c"].map(String::from).into();
		let (_, edges) = sync_selection(&nodes, &edges, &pick);
		assert!(matches!(edges, Cow::Borrowed(_)));
		assert!(edges.iter().all(|e| !e.selected));
	}

	mod props {
		use proptest::prelude::*;

		use super::*;

		fn arb_entities() -> impl Strategy<Value = Vec<Entity>> {
			prop::collection::vec(
				(any::<bool>(), prop::option::of((-500.0..500.0f64, -500.0..500.0f64))),
				0..24,
			)
			.prop_map(|specs| {
				specs
					.into_iter()
					.enumerate()
					.map(|(i, (item, pos))| {
						let e = if item {
							Entity::item(format!("e{i}"), "x")
						} else {
							Entity::person(format!("e{i}"), "x")
						};
						match pos {
							Some((x, y)) => e.at(x, y),
							None => e,
						}
					})
					.collect()
			})
		}

		proptest! {
			#[test]
			fn resync_unchanged_set_preserves_view_state(entities in arb_entities(), seed in any::<u64>()) {
				let mut rng = StdRng::seed_from_u64(seed);
				let mut first = sync_nodes(&[], map_entities(&entities), &mut rng).nodes;
				for (i, node) in first.iter_mut().enumerate() {
					node.selected = i % 3 == 0;
				}

				let second = sync_nodes(&first, map_entities(&entities), &mut rng);
				prop_assert!(!second.has_new());
				prop_assert_eq!(&first, &second.nodes);
			}

			#[test]
			fn edge_selected_only_for_exact_pair(n_selected in 0usize..5) {
				let ids = ["a", "b", "c", "d", "e"];
				let edges = map_relationships(&[Relationship::new("ab", "a", "b", "x")]);
				let selected: HashSet<String> = ids[..n_selected].iter().map(|s| s.to_string()).collect();
				prop_assert_eq!(edge_selected(&edges[0], &selected), n_selected == 2);
			}
		}
	}
}
