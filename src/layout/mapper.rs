//! Entities and relationships to their visual images.
//!
//! Pure: the same domain lists always map to the same visual lists. View
//! state (position, selection, measured size) is filled in later by
//! [`super::sync`].

use super::types::{EdgeDisplay, Entity, NodeData, Point, Relationship, VisualEdge, VisualNode};

/// Map every entity to a visual node, in input order.
pub fn map_entities(entities: &[Entity]) -> Vec<VisualNode> {
	entities.iter().map(map_entity).collect()
}

fn map_entity(entity: &Entity) -> VisualNode {
	VisualNode {
		id: entity.id.clone(),
		kind: entity.kind,
		data: NodeData {
			name: entity.name.clone(),
			image: non_empty(entity.image.as_deref()),
			stored_position: entity.position,
		},
		position: entity.position.unwrap_or(Point::ORIGIN),
		selected: false,
		measured: None,
	}
}

/// Map every relationship to a visual edge, in input order.
pub fn map_relationships(relationships: &[Relationship]) -> Vec<VisualEdge> {
	relationships
		.iter()
		.map(|rel| {
			let (display, label, backward_label) = edge_display(rel);
			VisualEdge {
				id: rel.id.clone(),
				source: rel.source.clone(),
				target: rel.target.clone(),
				display,
				label,
				backward_label,
				selected: false,
			}
		})
		.collect()
}

/// Display type and the labels to paint for a relationship.
///
/// Blank labels count as absent. When only the backward label is set on a
/// directed relationship, the edge is dual-directed rather than one-way.
pub fn edge_display(rel: &Relationship) -> (EdgeDisplay, Option<String>, Option<String>) {
	let forward = non_empty(Some(rel.label.as_str()));
	let backward = non_empty(rel.backward_label.as_deref());

	if !rel.directed {
		return (EdgeDisplay::Undirected, forward, None);
	}

	match (forward, backward) {
		(forward, None) => (EdgeDisplay::OneWay, forward, None),
		(Some(f), Some(b)) if f == b => (EdgeDisplay::Bidirectional, Some(f), None),
		(forward, backward) => (EdgeDisplay::DualDirected, forward, backward),
	}
}

fn non_empty(s: Option<&str>) -> Option<String> {
	s.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rel(directed: bool, label: &str, backward: Option<&str>) -> Relationship {
		Relationship {
			id: "r".into(),
			source: "a".into(),
			target: "b".into(),
			directed,
			label: label.into(),
			backward_label: backward.map(str::to_string),
			created_at: 0.0,
		}
	}

	#[test]
	fn test_decision_table() {
		let cases = [
			(rel(false, "friend", Some("pal")), EdgeDisplay::Undirected, Some("friend"), None),
			(rel(true, "parent of", None), EdgeDisplay::OneWay, Some("parent of"), None),
			(rel(true, "parent of", Some("  ")), EdgeDisplay::OneWay, Some("parent of"), None),
			(rel(true, "sibling", Some("sibling")), EdgeDisplay::Bidirectional, Some("sibling"), None),
			(rel(true, "parent of", Some("child of")), EdgeDisplay::DualDirected, Some("parent of"), Some("child of")),
			(rel(true, "", Some("child of")), EdgeDisplay::DualDirected, None, Some("child of")),
			(rel(true, "", None), EdgeDisplay::OneWay, None, None),
		];

		for (rel, display, label, backward) in cases {
			let (d, l, b) = edge_display(&rel);
			assert_eq!(d, display, "{rel:?}");
			assert_eq!(l.as_deref(), label, "{rel:?}");
			assert_eq!(b.as_deref(), backward, "{rel:?}");
		}
	}

	#[test]
	fn test_missing_fields_are_absent() {
		let mut entity = Entity::person("a", "Ada");
		entity.image = Some(String::new());
		let nodes = map_entities(&[entity, Entity::item("b", "Locket").at(0.0, 0.0)]);

		assert_eq!(nodes[0].data.image, None);
		assert_eq!(nodes[0].position, Point::ORIGIN);
		assert_eq!(nodes[0].data.stored_position, None);
		assert_eq!(nodes[1].data.stored_position, Some(Point::ORIGIN));
	}

	#[test]
	fn test_images_are_one_to_one() {
		let entities = vec![Entity::person("a", "Ada"), Entity::person("b", "Bo")];
		let rels = vec![Relationship::new("r1", "a", "b", "friend")];
		let nodes = map_entities(&entities);
		let edges = map_relationships(&rels);

		let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["a", "b"]);
		assert_eq!(edges.len(), 1);
		assert_eq!(edges[0].id, "r1");
		assert_eq!(edges[0].display, EdgeDisplay::Undirected);
	}
}
