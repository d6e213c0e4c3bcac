//! Domain records, their visual images and the tunable layout parameters.

use serde::{Deserialize, Serialize};

/// A point on the canvas, in canvas (not screen) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Point {
	/// The canvas origin.
	pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

	/// Build a point from its coordinates.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Linear interpolation towards `to` at `t` in `[0, 1]`.
	pub fn lerp(self, to: Point, t: f64) -> Point {
		Point {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
		}
	}
}

/// Width and height of a node box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
	/// Box width.
	pub w: f64,
	/// Box height.
	pub h: f64,
}

impl Size {
	/// Build a size from width and height.
	pub const fn new(w: f64, h: f64) -> Self {
		Self { w, h }
	}
}

/// Axis-aligned box, top-left anchored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	/// Left edge.
	pub x: f64,
	/// Top edge.
	pub y: f64,
	/// Width.
	pub w: f64,
	/// Height.
	pub h: f64,
}

impl Rect {
	/// Right edge.
	pub fn right(&self) -> f64 {
		self.x + self.w
	}

	/// Bottom edge.
	pub fn bottom(&self) -> f64 {
		self.y + self.h
	}

	/// Box center.
	pub fn center(&self) -> Point {
		Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
	}

	/// The same box grown by `pad` on every side.
	pub fn inflate(&self, pad: f64) -> Rect {
		Rect {
			x: self.x - pad,
			y: self.y - pad,
			w: self.w + pad * 2.0,
			h: self.h + pad * 2.0,
		}
	}

	/// Inclusive containment test.
	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
	}

	/// Distance from `p` to the nearest box edge, zero when inside.
	pub fn edge_distance(&self, p: Point) -> f64 {
		let dx = (self.x - p.x).max(0.0).max(p.x - self.right());
		let dy = (self.y - p.y).max(0.0).max(p.y - self.bottom());
		(dx * dx + dy * dy).sqrt()
	}
}

/// What an entity stands for. Sizing and painting switch on this tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	/// A person.
	#[default]
	Person,
	/// An object or item.
	Item,
}

impl NodeKind {
	/// Box assumed for a node the renderer has not measured yet.
	pub fn default_size(self) -> Size {
		match self {
			NodeKind::Person => Size::new(160.0, 64.0),
			NodeKind::Item => Size::new(140.0, 48.0),
		}
	}
}

/// A person or item participating in the diagram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
	/// Stable identifier.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Optional image reference (URL or data URI).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	/// Person or item.
	pub kind: NodeKind,
	/// Stored canvas position. `Some({0,0})` is a real position, not "unset".
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub position: Option<Point>,
	/// Creation time, milliseconds since the epoch.
	pub created_at: f64,
}

impl Entity {
	/// A person without image or stored position.
	pub fn person(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			image: None,
			kind: NodeKind::Person,
			position: None,
			created_at: 0.0,
		}
	}

	/// An item without image or stored position.
	pub fn item(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			kind: NodeKind::Item,
			..Self::person(id, name)
		}
	}

	/// Same entity with a stored position.
	pub fn at(mut self, x: f64, y: f64) -> Self {
		self.position = Some(Point::new(x, y));
		self
	}
}

/// A labeled, optionally directed connection between two entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
	/// Stable identifier.
	pub id: String,
	/// Entity the relationship starts from.
	pub source: String,
	/// Entity the relationship points to.
	pub target: String,
	/// Whether the relationship has a direction.
	pub directed: bool,
	/// Label read from source to target.
	pub label: String,
	/// Label read from target to source.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub backward_label: Option<String>,
	/// Creation time, milliseconds since the epoch.
	pub created_at: f64,
}

impl Relationship {
	/// An undirected relationship with a single label.
	pub fn new(
		id: impl Into<String>,
		source: impl Into<String>,
		target: impl Into<String>,
		label: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			directed: false,
			label: label.into(),
			backward_label: None,
			created_at: 0.0,
		}
	}

	/// Same relationship marked directed, with an optional backward label.
	pub fn directed(mut self, backward_label: Option<&str>) -> Self {
		self.directed = true;
		self.backward_label = backward_label.map(str::to_string);
		self
	}
}

/// Payload a visual node carries for painting.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeData {
	/// Display name.
	pub name: String,
	/// Image reference, if any.
	pub image: Option<String>,
	/// Position stored on the entity, exactly as stored.
	pub stored_position: Option<Point>,
}

/// Renderable image of an [`Entity`].
#[derive(Clone, Debug, PartialEq)]
pub struct VisualNode {
	/// Entity id.
	pub id: String,
	/// Kind tag.
	pub kind: NodeKind,
	/// Painting payload.
	pub data: NodeData,
	/// Top-left corner on the canvas.
	pub position: Point,
	/// Selection flag.
	pub selected: bool,
	/// Size reported by the renderer once painted.
	pub measured: Option<Size>,
}

impl VisualNode {
	/// Measured size, or the kind's default box.
	pub fn size(&self) -> Size {
		self.measured.unwrap_or_else(|| self.kind.default_size())
	}

	/// Bounding box at the current position.
	pub fn rect(&self) -> Rect {
		let size = self.size();
		Rect {
			x: self.position.x,
			y: self.position.y,
			w: size.w,
			h: size.h,
		}
	}

	/// Center of the bounding box.
	pub fn center(&self) -> Point {
		self.rect().center()
	}
}

/// How an edge is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeDisplay {
	/// Arrows on both ends, one shared label.
	Bidirectional,
	/// Arrows on both ends, a label per direction.
	DualDirected,
	/// Arrow on the target end only.
	OneWay,
	/// Plain line.
	Undirected,
}

/// Renderable image of a [`Relationship`].
#[derive(Clone, Debug, PartialEq)]
pub struct VisualEdge {
	/// Relationship id.
	pub id: String,
	/// Source entity id.
	pub source: String,
	/// Target entity id.
	pub target: String,
	/// Display-type tag.
	pub display: EdgeDisplay,
	/// Forward label.
	pub label: Option<String>,
	/// Backward label, only for dual-directed edges.
	pub backward_label: Option<String>,
	/// Selection flag, derived from node selection.
	pub selected: bool,
}

/// Tunables of the continuous force layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceParams {
	/// Rest length of relationship springs.
	pub link_distance: f64,
	/// Spring stiffness in `[0, 1]`.
	pub link_strength: f64,
	/// Pairwise charge; negative repels.
	pub charge_strength: f64,
}

impl Default for ForceParams {
	fn default() -> Self {
		Self {
			link_distance: 180.0,
			link_strength: 0.5,
			charge_strength: -400.0,
		}
	}
}

/// Tunables of the radial ego layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EgoLayoutParams {
	/// Radius added per hop.
	pub ring_spacing: f64,
	/// Arc covered by each ring, in degrees.
	pub angular_spread: f64,
}

impl Default for EgoLayoutParams {
	fn default() -> Self {
		Self {
			ring_spacing: 220.0,
			angular_spread: 360.0,
		}
	}
}

/// Engine-wide constants that are not part of the domain store.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Gap kept between boxes by the collision resolver and the force engine.
	pub collision_margin: f64,
	/// Default capture radius for drag-to-connect.
	pub capture_radius: f64,
	/// Duration of the ego layout animation, in milliseconds.
	pub ego_duration_ms: f64,
	/// Fixed canvas point the force engine centers on.
	pub center: Point,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			collision_margin: 16.0,
			capture_radius: 60.0,
			ego_duration_ms: 300.0,
			center: Point::new(400.0, 300.0),
		}
	}
}
