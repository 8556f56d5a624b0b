//! Interactive nested network map: a small set of cluster nodes positioned
//! by an outer force layout, each containing its own independently simulated
//! sub-graph, with drag gestures that can hand a child node's drag over to
//! its parent cluster while the pointer is still down.

pub mod diagram;
pub mod graph_utils;
pub mod gui;
pub mod interaction;
pub mod sim;
