//! Static de-overlap pass for node boxes.
//!
//! Used while the force engine is off: once after nodes are added and once
//! after a manual drag ends. Every pass visits pairs in input order and pushes
//! both boxes of an overlapping pair apart by half the penetration along the
//! shallower axis, so the result is stable for a given input. Clusters the
//! passes cannot untangle get a final sweep that drops each box below the
//! earlier boxes it still hits.

use std::borrow::Cow;

use super::types::{Point, Rect, VisualNode};

/// Upper bound on relaxation passes.
pub const MAX_PASSES: usize = 100;

/// Penetrations at or below this are treated as touching.
const EPSILON: f64 = 1e-6;

/// Push overlapping boxes apart until no pair (grown by `margin`) overlaps.
///
/// Returns the input untouched, borrowed, when nothing overlapped.
pub fn resolve_collisions(nodes: &[VisualNode], margin: f64) -> Cow<'_, [VisualNode]> {
	if !any_overlap(nodes, margin) {
		return Cow::Borrowed(nodes);
	}

	let mut rects: Vec<Rect> = nodes.iter().map(VisualNode::rect).collect();

	for _pass in 0..MAX_PASSES {
		let mut moved = false;

		for i in 0..rects.len() {
			for j in (i + 1)..rects.len() {
				if let Some((dx, dy)) = separation(&rects[i], &rects[j], margin) {
					rects[i].x -= dx;
					rects[i].y -= dy;
					rects[j].x += dx;
					rects[j].y += dy;
					moved = true;
				}
			}
		}

		if !moved {
			break;
		}
	}

	if overlapping_pair(&rects, margin) {
		sweep_down(&mut rects, margin);
	}

	let resolved = nodes
		.iter()
		.zip(&rects)
		.map(|(node, rect)| VisualNode {
			position: Point::new(rect.x, rect.y),
			..node.clone()
		})
		.collect();
	Cow::Owned(resolved)
}

/// Whether any pair of boxes overlaps once `margin` apart is required.
pub fn any_overlap(nodes: &[VisualNode], margin: f64) -> bool {
	let rects: Vec<Rect> = nodes.iter().map(VisualNode::rect).collect();
	overlapping_pair(&rects, margin)
}

fn overlapping_pair(rects: &[Rect], margin: f64) -> bool {
	(0..rects.len()).any(|i| {
		((i + 1)..rects.len()).any(|j| penetration(&rects[i], &rects[j], margin).is_some())
	})
}

/// Move each box straight down until it clears every box before it.
///
/// Boxes only ever move down and earlier boxes are settled, so every pair is
/// fixed at most once.
fn sweep_down(rects: &mut [Rect], margin: f64) {
	for i in 1..rects.len() {
		while let Some(j) = (0..i).find(|&j| penetration(&rects[j], &rects[i], margin).is_some()) {
			rects[i].y = rects[j].bottom() + margin;
		}
	}
}

/// Penetration depth on both axes, if the pair overlaps.
fn penetration(a: &Rect, b: &Rect, margin: f64) -> Option<(f64, f64)> {
	let px = (a.right() + margin - b.x).min(b.right() + margin - a.x);
	let py = (a.bottom() + margin - b.y).min(b.bottom() + margin - a.y);
	(px > EPSILON && py > EPSILON).then_some((px, py))
}

/// Half-displacement to apply to `b` (and its negation to `a`).
fn separation(a: &Rect, b: &Rect, margin: f64) -> Option<(f64, f64)> {
	let (px, py) = penetration(a, b, margin)?;
	let (ca, cb) = (a.center(), b.center());

	// ties push the earlier box towards negative coordinates
	let sign = |from: f64, to: f64| if to >= from { 1.0 } else { -1.0 };

	Some(if px <= py {
		(sign(ca.x, cb.x) * px / 2.0, 0.0)
	} else {
		(0.0, sign(ca.y, cb.y) * py / 2.0)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::types::{NodeData, NodeKind, Size};

	fn node(id: &str, x: f64, y: f64, w: f64, h: f64) -> VisualNode {
		VisualNode {
			id: id.into(),
			kind: NodeKind::Person,
			data: NodeData {
				name: id.into(),
				image: None,
				stored_position: None,
			},
			position: Point::new(x, y),
			selected: false,
			measured: Some(Size::new(w, h)),
		}
	}

	#[test]
	fn test_no_overlap_returns_input() {
		let nodes = vec![node("a", 0.0, 0.0, 50.0, 50.0), node("b", 100.0, 0.0, 50.0, 50.0)];
		let out = resolve_collisions(&nodes, 10.0);
		assert!(matches!(out, Cow::Borrowed(_)));
	}

	#[test]
	fn test_pushes_along_shallow_axis() {
		let nodes = vec![node("a", 0.0, 0.0, 100.0, 80.0), node("b", 60.0, 10.0, 100.0, 80.0)];
		let out = resolve_collisions(&nodes, 0.0);

		// x penetration 40 < y penetration 70: split 20/20 horizontally
		assert_eq!(out[0].position, Point::new(-20.0, 0.0));
		assert_eq!(out[1].position, Point::new(80.0, 10.0));
		assert!(!any_overlap(&out, 0.0));
	}

	#[test]
	fn test_coincident_boxes_split_in_input_order() {
		let nodes = vec![node("a", 0.0, 0.0, 40.0, 40.0), node("b", 0.0, 0.0, 40.0, 40.0)];
		let out = resolve_collisions(&nodes, 10.0);
		assert!(out[0].position.x < out[1].position.x);
		assert!(!any_overlap(&out, 10.0));
	}

	#[test]
	fn test_unmeasured_nodes_use_default_box() {
		let mut a = node("a", 0.0, 0.0, 0.0, 0.0);
		let mut b = node("b", 10.0, 0.0, 0.0, 0.0);
		a.measured = None;
		b.measured = None;
		let nodes = [a, b];
		let out = resolve_collisions(&nodes, 0.0);

		// 150 of horizontal overlap against 64 vertical: they separate vertically
		let gap = out[1].position.y - out[0].position.y;
		assert!(gap >= NodeKind::Person.default_size().h - EPSILON);
		assert!(!any_overlap(&out, 0.0));
	}

	#[test]
	fn test_selection_and_ids_survive() {
		let mut a = node("a", 0.0, 0.0, 40.0, 40.0);
		a.selected = true;
		let b = node("b", 5.0, 5.0, 40.0, 40.0);
		let nodes = [a, b];
		let out = resolve_collisions(&nodes, 4.0);
		assert!(out[0].selected);
		assert_eq!(out[1].id, "b");
	}

	#[test]
	fn test_dense_cluster_fully_resolves() {
		let nodes: Vec<_> = (0..40)
			.map(|i| {
				let mut n = node(&format!("n{i}"), (i % 8) as f64 * 3.0, (i / 8) as f64 * 3.0, 0.0, 0.0);
				n.measured = None;
				n
			})
			.collect();

		let once = resolve_collisions(&nodes, 16.0).into_owned();
		assert!(!any_overlap(&once, 16.0));
		assert!(matches!(resolve_collisions(&once, 16.0), Cow::Borrowed(_)));
	}

	#[test]
	fn test_sweep_drops_later_boxes_below_earlier_ones() {
		let mut rects: Vec<Rect> = [(0.0, 0.0), (10.0, 10.0), (20.0, 0.0)]
			.into_iter()
			.map(|(x, y)| Rect { x, y, w: 100.0, h: 50.0 })
			.collect();
		sweep_down(&mut rects, 10.0);
		assert_eq!(rects[0].y, 0.0);
		assert_eq!(rects[1].y, 60.0);
		assert_eq!(rects[2].y, 120.0);
		assert!(!overlapping_pair(&rects, 10.0));
	}

	mod props {
		use proptest::prelude::*;

		use super::*;

		proptest! {
			#[test]
			fn resolving_twice_is_a_no_op(
				boxes in prop::collection::vec((0.0..200.0f64, 0.0..200.0f64, 20.0..120.0f64, 20.0..80.0f64), 0..40),
				margin in 0.0..20.0f64,
			) {
				let nodes: Vec<_> = boxes
					.iter()
					.enumerate()
					.map(|(i, &(x, y, w, h))| node(&format!("n{i}"), x, y, w, h))
					.collect();

				let once = resolve_collisions(&nodes, margin).into_owned();
				prop_assert!(!any_overlap(&once, margin));
				let twice = resolve_collisions(&once, margin);
				prop_assert!(matches!(twice, Cow::Borrowed(_)));
				prop_assert_eq!(&once[..], &twice[..]);
			}
		}
	}
}
