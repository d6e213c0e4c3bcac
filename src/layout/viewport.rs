//! Pan/zoom transform between screen and canvas coordinates.

use super::types::Point;

/// Minimum zoom factor.
pub const MIN_ZOOM: f64 = 0.1;
/// Maximum zoom factor.
pub const MAX_ZOOM: f64 = 10.0;

/// Current pan/zoom and the size of the visible area, in screen pixels.
///
/// A canvas point `p` appears on screen at `p * zoom + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	/// Horizontal pan.
	pub x: f64,
	/// Vertical pan.
	pub y: f64,
	/// Zoom factor.
	pub zoom: f64,
	/// Visible width.
	pub width: f64,
	/// Visible height.
	pub height: f64,
}

impl Viewport {
	/// Unpanned, unzoomed view of the given size.
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			zoom: 1.0,
			width,
			height,
		}
	}

	/// Map a screen point to canvas coordinates.
	pub fn screen_to_canvas(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.zoom, (sy - self.y) / self.zoom)
	}

	/// Map a canvas point to screen coordinates.
	pub fn canvas_to_screen(&self, p: Point) -> (f64, f64) {
		(p.x * self.zoom + self.x, p.y * self.zoom + self.y)
	}

	/// Canvas point under the middle of the visible area.
	pub fn visible_center(&self) -> Point {
		self.screen_to_canvas(self.width / 2.0, self.height / 2.0)
	}

	/// Zoom by `factor` keeping the canvas point under `(sx, sy)` in place.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = zoom / self.zoom;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.zoom = zoom;
	}

	/// Shift the view by a screen-space delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.x += dx;
		self.y += dy;
	}

	/// Track a resized visible area.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_visible_center_follows_pan_and_zoom() {
		let mut vp = Viewport::new(800.0, 600.0);
		assert_eq!(vp.visible_center(), Point::new(400.0, 300.0));

		vp.pan_by(-400.0, -300.0);
		assert_eq!(vp.visible_center(), Point::new(800.0, 600.0));

		vp.zoom = 2.0;
		assert_eq!(vp.visible_center(), Point::new(400.0, 300.0));
	}

	#[test]
	fn test_zoom_keeps_anchor_fixed() {
		let mut vp = Viewport::new(800.0, 600.0);
		vp.pan_by(37.0, -12.0);
		let before = vp.screen_to_canvas(250.0, 120.0);
		vp.zoom_at(250.0, 120.0, 1.1);
		let after = vp.screen_to_canvas(250.0, 120.0);
		assert!((before.x - after.x).abs() < 1e-9);
		assert!((before.y - after.y).abs() < 1e-9);
		assert_eq!(vp.canvas_to_screen(after).0.round(), 250.0);
	}

	#[test]
	fn test_zoom_is_clamped() {
		let mut vp = Viewport::new(100.0, 100.0);
		for _ in 0..100 {
			vp.zoom_at(0.0, 0.0, 0.5);
		}
		assert_eq!(vp.zoom, MIN_ZOOM);
	}
}
