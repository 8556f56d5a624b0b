use egui::Pos2;

use crate::interaction::Scene;
use crate::interaction::events::DragEvent;
use crate::interaction::state::{
    InteractionError, InteractionState, LayoutScope, NodeHandle, SessionPatch,
};
use crate::sim::layout::{DRAG_ALPHA_TARGET, DRAGGABLE_ALPHA_FLOOR, RESTART_ALPHA};

use super::{Deferred, HandbackTrigger, Netmap};

impl Netmap {
    /// First half of a child-to-parent handoff: close out the child's
    /// gesture synthetically and queue the matching outer-layout start for
    /// after the current dispatch turn.
    pub fn begin_child_to_parent_handoff(
        &mut self,
        cluster: usize,
        scene: &mut dyn Scene,
    ) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        if !matches!(
            self.machine.current(),
            InteractionState::DraggingChild
                | InteractionState::DraggingChildWithShift
                | InteractionState::DraggingChildWithShiftCommitted
        ) {
            log::debug!("handoff requested in {}: ignored", self.machine.current());
            return Ok(());
        }
        // The gesture may legitimately have ended under us; not an error.
        let Some(node) = self.machine.session().dragged else {
            log::warn!("handoff requested with no dragged node");
            return Ok(());
        };
        if node.is_parent() || node.cluster() != cluster {
            log::warn!("handoff requested for cluster {cluster} but the dragged node is {node:?}");
            return Ok(());
        }
        let Some(id) = self.node_key(node) else {
            log::warn!("handoff requested for a node that does not resolve: {node:?}");
            return Ok(());
        };

        // Where the user has dragged the node to, in the cluster's frame.
        let scope = LayoutScope::Cluster(cluster);
        let local = self
            .layout(scope)
            .and_then(|l| l.resolved_position(&id))
            .unwrap_or(Pos2::ZERO);
        if let Some(layout) = self.layout_mut(scope) {
            layout.set_position(&id, local);
        }
        let pointer = self.machine.session().pointer;

        self.on_drag_end(DragEvent::synthetic_end(local, pointer), node, scope, scene)?;

        // Freeze the member layout while its cluster is being dragged.
        if let Some(layout) = self.layout_mut(scope) {
            layout.set_alpha(0.0);
        }

        let session = self.machine.session_mut();
        session.origin_child = Some(node);
        session.origin_cluster = Some(cluster);

        // The paired outer start runs only once the synthetic end above has
        // been observed by everyone; two layouts must never report an active
        // gesture for the same physical pointer.
        self.deferred.push_back(Deferred::CompleteHandoff {
            cluster,
            local,
            pointer,
        });
        Ok(())
    }

    /// Drain work queued for after the current dispatch turn.
    pub fn pump_deferred(&mut self, scene: &mut dyn Scene) -> Result<(), InteractionError> {
        while let Some(task) = self.deferred.pop_front() {
            match task {
                Deferred::CompleteHandoff {
                    cluster,
                    local,
                    pointer,
                } => {
                    self.complete_handoff_to_parent(cluster, local, pointer, scene)?;
                }
            }
        }
        Ok(())
    }

    /// Second half of a handoff: start an equivalent outer-layout drag at
    /// the handed-off node's position mapped into the outer frame.
    pub fn complete_handoff_to_parent(
        &mut self,
        cluster: usize,
        local: Pos2,
        pointer: Pos2,
        scene: &mut dyn Scene,
    ) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        let Some(cluster_id) = self.clusters.get(cluster).map(|c| c.id.clone()) else {
            log::warn!("handoff completion for an unknown cluster: {cluster}");
            return Ok(());
        };
        let outer_node = NodeHandle::Parent { cluster };

        // Child-local coordinates map into the outer frame through the
        // container's stored translation offset.
        let target = self.clusters[cluster].offset + local.to_vec2();

        self.on_drag_start(
            DragEvent::synthetic_start(target, pointer),
            outer_node,
            LayoutScope::Outer,
            scene,
        )?;

        // Hold the outer node at the transformed position and heat the outer
        // layout so it responds to the drag.
        self.outer.pin(&cluster_id, target);
        self.outer.set_alpha_target(DRAG_ALPHA_TARGET);
        self.outer.restart();

        // Let the drawing surface's own gesture recognizer take over the
        // rest of the user's physical gesture.
        scene.attach_pointer_capture(cluster, pointer);

        // `on_drag_start` above may already have moved the machine; only
        // transition when not yet in a parent drag.
        if matches!(
            self.machine.current(),
            InteractionState::DraggingParent | InteractionState::DraggingParentWithShift
        ) {
            let drag_start = self.outer.position(&cluster_id).unwrap_or(target);
            let session = self.machine.session_mut();
            session.dragged = Some(outer_node);
            session.scope = Some(LayoutScope::Outer);
            session.drag_start = drag_start;
        } else {
            let drag_start = self.outer.position(&cluster_id).unwrap_or(target);
            self.machine.transition(
                InteractionState::DraggingParent,
                SessionPatch {
                    dragged: Some(outer_node),
                    scope: Some(LayoutScope::Outer),
                    drag_start: Some(drag_start),
                    ..SessionPatch::default()
                },
            )?;
        }
        Ok(())
    }

    /// Close out whichever outer drag is logically active and give control
    /// back to the originating cluster's member layout.
    pub fn end_parent_handoff_back_to_child(
        &mut self,
        trigger: HandbackTrigger,
        scene: &mut dyn Scene,
    ) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        if !matches!(
            self.machine.current(),
            InteractionState::DraggingParent
                | InteractionState::DraggingParentWithShift
                | InteractionState::HandoffInProgress
        ) {
            log::debug!(
                "parent handback requested in {}: ignored",
                self.machine.current()
            );
            return Ok(());
        }
        let Some(node) = self.machine.session().dragged else {
            log::warn!("parent handback with no dragged node");
            return Ok(());
        };
        if !node.is_parent() {
            log::warn!("parent handback but the dragged node is {node:?}");
            return Ok(());
        }
        let Some(id) = self.node_key(node) else {
            log::warn!("parent handback for a node that does not resolve: {node:?}");
            return Ok(());
        };

        let pos = self.outer.resolved_position(&id).unwrap_or(Pos2::ZERO);
        self.outer.set_position(&id, pos);
        let pointer = self.machine.session().pointer;
        // The synthetic end below resets the session; keep the provenance.
        let origin = self.machine.session().origin_cluster;
        log::debug!("ending parent drag for {id} ({trigger:?})");

        self.on_drag_end(
            DragEvent::synthetic_end(pos, pointer),
            node,
            LayoutScope::Outer,
            scene,
        )?;
        self.outer.set_alpha(0.0);

        if let Some(cluster) = origin {
            self.restart_child_layout(cluster, scene);
        }
        Ok(())
    }

    /// Re-attach the drag to the member node a handoff originated from, once
    /// its cluster has been handed back. The product keeps this behavior
    /// disabled, so nothing calls it; the handback flow ends with the member
    /// layout merely reheated.
    pub fn resume_child_after_handback(
        &mut self,
        node: NodeHandle,
        _scene: &mut dyn Scene,
    ) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        let LayoutScope::Cluster(_) = node.scope() else {
            log::warn!("child resume requested for a parent node: {node:?}");
            return Ok(());
        };
        let Some(id) = self.node_key(node) else {
            log::warn!("child resume for a node that does not resolve: {node:?}");
            return Ok(());
        };
        let scope = node.scope();
        let Some(pos) = self.layout(scope).and_then(|l| l.position(&id)) else {
            return Ok(());
        };

        if matches!(
            self.machine.current(),
            InteractionState::DraggingChild | InteractionState::DraggingChildWithShift
        ) {
            let session = self.machine.session_mut();
            session.dragged = Some(node);
            session.scope = Some(scope);
            session.drag_start = pos;
        } else {
            self.machine.transition(
                InteractionState::DraggingChild,
                SessionPatch {
                    dragged: Some(node),
                    scope: Some(scope),
                    drag_start: Some(pos),
                    ..SessionPatch::default()
                },
            )?;
        }

        if let Some(layout) = self.layout_mut(scope) {
            layout.pin(&id, pos);
            layout.set_alpha_target(DRAG_ALPHA_TARGET);
            layout.restart();
        }
        Ok(())
    }

    /// Wake a cluster's member layout after its container drag ends, with
    /// enough floor temperature that its members stay draggable.
    pub(crate) fn restart_child_layout(&mut self, cluster: usize, scene: &mut dyn Scene) {
        let Some(c) = self.clusters.get_mut(cluster) else {
            log::warn!("member layout {cluster} not found for restart");
            return;
        };
        log::debug!("restarting member layout of {}", c.id);
        c.layout.set_alpha(RESTART_ALPHA);
        c.layout.restart();
        c.layout.set_alpha_min(DRAGGABLE_ALPHA_FLOOR);
        scene.set_cluster_highlight(cluster, false);
    }

    pub(crate) fn restart_origin_child(&mut self, scene: &mut dyn Scene) {
        if let Some(cluster) = self.machine.session().origin_cluster {
            self.restart_child_layout(cluster, scene);
        }
    }
}
