//! Layout and view-synchronization core.
//!
//! Everything here is plain data and synchronous functions; the canvas
//! component drives it once per animation frame through [`LayoutController`].

pub mod collision;
pub mod connect;
pub mod controller;
pub mod ego;
pub mod mapper;
pub mod simulation;
pub mod sync;
pub mod types;
pub mod viewport;

pub use controller::{Authority, LayoutController, TaskHandle};
pub use types::{
	EdgeDisplay, EgoLayoutParams, Entity, ForceParams, LayoutConfig, NodeKind, Point, Relationship,
	Size, VisualEdge, VisualNode,
};
pub use viewport::Viewport;
