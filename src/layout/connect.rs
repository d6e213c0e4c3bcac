//! Drop-target lookup for drag-to-connect gestures released over empty canvas.

use super::types::{Point, VisualNode};

/// The node a connection dragged out of `from` should attach to when released at `at`.
///
/// Each candidate's box is grown by half the capture radius on every side;
/// among the grown boxes containing `at`, the node whose real box edge is
/// nearest wins. The source node never qualifies. Ties keep input order.
pub fn find_connection_target<'a>(
	at: Point,
	from: &str,
	nodes: &'a [VisualNode],
	capture_radius: f64,
) -> Option<&'a VisualNode> {
	let pad = capture_radius / 2.0;
	let mut best: Option<(&VisualNode, f64)> = None;

	for node in nodes.iter().filter(|n| n.id != from) {
		let rect = node.rect();
		if !rect.inflate(pad).contains(at) {
			continue;
		}
		let distance = rect.edge_distance(at);
		if best.is_none_or(|(_, d)| distance < d) {
			best = Some((node, distance));
		}
	}

	best.map(|(node, _)| node)
}
