use egui::Pos2;

use crate::interaction::Scene;
use crate::interaction::events::{DragEvent, EventSource};
use crate::interaction::state::{
    InteractionError, InteractionState, LayoutScope, NodeHandle, SessionPatch,
};
use crate::sim::layout::DRAG_ALPHA_TARGET;

use super::Netmap;

impl Netmap {
    /// Pointer-down on a draggable node, real or synthesized replay.
    pub fn on_drag_start(
        &mut self,
        ev: DragEvent,
        node: NodeHandle,
        scope: LayoutScope,
        scene: &mut dyn Scene,
    ) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        self.log_drag_event("start", ev, node, scope);

        let Some(id) = self.node_key(node) else {
            log::warn!("drag start for a node that does not resolve: {node:?}");
            return Ok(());
        };

        {
            let Some(layout) = self.layout_mut(scope) else {
                log::warn!("drag start for an unknown layout scope: {scope:?}");
                return Ok(());
            };
            // A settled layout would leave the node unresponsive mid-drag.
            if !layout.active() {
                layout.set_alpha_target(DRAG_ALPHA_TARGET);
                layout.restart();
            }
            layout.pin_in_place(&id);
        }

        let start = self
            .layout(scope)
            .and_then(|l| l.resolved_position(&id))
            .unwrap_or(Pos2::ZERO);
        let patch = SessionPatch {
            dragged: Some(node),
            scope: Some(scope),
            drag_start: Some(start),
            pointer: Some(ev.client().unwrap_or(Pos2::ZERO)),
            ..SessionPatch::default()
        };

        if node.is_parent() {
            if ev.is_synthetic() {
                // Second half of a handoff that has already been committed;
                // the modifier state no longer matters.
                self.machine
                    .transition(InteractionState::HandoffInProgress, patch)?;
            } else if ev.shift() || self.machine.current() == InteractionState::ShiftPressed {
                self.machine
                    .transition(InteractionState::DraggingParentWithShift, patch)?;
            } else {
                self.machine
                    .transition(InteractionState::DraggingParent, patch)?;
            }
        } else if ev.shift() || self.machine.current() == InteractionState::ShiftPressed {
            self.machine
                .transition(InteractionState::DraggingChildWithShift, patch)?;
            if let LayoutScope::Cluster(cluster) = scope {
                scene.set_cluster_highlight(cluster, true);
            }
        } else {
            self.machine
                .transition(InteractionState::DraggingChild, patch)?;
        }
        Ok(())
    }

    /// Pointer movement during a drag: the pin follows the pointer. No state
    /// transition.
    pub fn on_drag_move(&mut self, ev: DragEvent, node: NodeHandle, scope: LayoutScope) {
        if self.destroyed {
            return;
        }
        self.log_drag_event("drag", ev, node, scope);
        if let Some(id) = self.node_key(node) {
            if let Some(layout) = self.layout_mut(scope) {
                layout.pin(&id, ev.position);
            }
        }
        if let EventSource::Real { client, .. } = ev.source {
            self.machine.session_mut().pointer = client;
        }
    }

    /// Pointer release (or synthesized gesture end) on a dragged node.
    pub fn on_drag_end(
        &mut self,
        ev: DragEvent,
        node: NodeHandle,
        scope: LayoutScope,
        scene: &mut dyn Scene,
    ) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        self.log_drag_event("end", ev, node, scope);

        if let Some(id) = self.node_key(node) {
            if let Some(layout) = self.layout_mut(scope) {
                if ev.active == 0 {
                    layout.set_alpha_target(0.0);
                }
                layout.unpin(&id);
            }
        }

        // Synthetic replays keep the highlight: the cluster stays marked
        // through the handoff it is part of.
        if !node.is_parent() && !ev.is_synthetic() {
            if let LayoutScope::Cluster(cluster) = scope {
                scene.set_cluster_highlight(cluster, false);
            }
        }

        if !ev.is_synthetic() {
            match self.machine.current() {
                InteractionState::HandoffInProgress => {
                    // The real release completes the handoff's second half.
                    self.machine.transition(
                        InteractionState::DraggingParent,
                        SessionPatch {
                            dragged: Some(node),
                            scope: Some(scope),
                            ..SessionPatch::default()
                        },
                    )?;
                }
                InteractionState::DraggingChildWithShift => {
                    // Pointer released before the modifier: commit, then
                    // promote the gesture to a handoff.
                    self.machine.transition(
                        InteractionState::DraggingChildWithShiftCommitted,
                        SessionPatch::default(),
                    )?;
                    if let LayoutScope::Cluster(cluster) = scope {
                        self.begin_child_to_parent_handoff(cluster, scene)?;
                    }
                }
                InteractionState::DraggingParentWithShift => {
                    // Pointer released before the modifier: commit to ending
                    // the gesture.
                    self.machine.transition(
                        InteractionState::DraggingParentWithShiftCommitted,
                        SessionPatch::default(),
                    )?;
                    self.machine.reset();
                }
                _ => {
                    if node.is_parent() && self.machine.session().origin_cluster.is_some() {
                        self.restart_origin_child(scene);
                    }
                    self.machine.reset();
                }
            }
        } else if matches!(
            self.machine.current(),
            InteractionState::DraggingParent | InteractionState::DraggingParentWithShift
        ) {
            // Synthetic end of an outer drag.
            self.machine.reset();
        } else {
            // First half of a handoff; the handoff's own logic completes the
            // machine, so a synthetic end must not short-circuit it to idle.
            log::debug!(
                "synthetic drag end in {}: leaving state untouched",
                self.machine.current()
            );
        }
        Ok(())
    }

    fn log_drag_event(&self, phase: &str, ev: DragEvent, node: NodeHandle, scope: LayoutScope) {
        let kind = match scope {
            LayoutScope::Outer => "parent",
            LayoutScope::Cluster(_) => "child",
        };
        log::debug!(
            "{phase} event on {kind} node {node:?} at ({:.1}, {:.1}) active={} synthetic={}",
            ev.position.x,
            ev.position.y,
            ev.active,
            ev.is_synthetic(),
        );
    }
}
