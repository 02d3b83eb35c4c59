//! Force-directed layout simulation.
//!
//! The experiment only sees the [`LayoutSimulator`] trait: hand it a graph
//! and parameters, and it eventually writes settled positions into the
//! graph. [`ForceLayout`] runs the simulation headless; the canvas-backed
//! simulator in `components::force_graph` runs the same [`LayoutState`]
//! one step per animation frame.

mod simulator;
mod state;

pub use simulator::{ForceLayout, LayoutParams, LayoutSimulator};
pub use state::{ForceLayoutOptions, LayoutState, NODE_RADIUS, NodeInfo};
