pub mod events;
pub mod state;

use egui::Pos2;

/// Visual side effects the interaction core requests from the drawing
/// surface. The frontend owns the retained visual state; the core only
/// announces what should change.
pub trait Scene {
    /// Tint (or untint) every member node of a cluster, signalling that the
    /// whole cluster is about to be grabbed.
    fn set_cluster_highlight(&mut self, cluster: usize, highlighted: bool);

    /// Route the remainder of the physical pointer gesture to the cluster's
    /// outer node, as if the pointer had gone down on it natively.
    fn attach_pointer_capture(&mut self, cluster: usize, client: Pos2);
}
