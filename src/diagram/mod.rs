mod drag;
mod handoff;

use std::collections::VecDeque;

use egui::Pos2;

use crate::graph_utils::graph::{ClusterRecord, LinkRecord, NodeRecord};
use crate::interaction::Scene;
use crate::interaction::state::{
    InteractionError, InteractionState, LayoutScope, NodeHandle, SessionPatch, StateInfo,
    StateMachine,
};
use crate::sim::layout::{Layout, LayoutOptions, RESTART_ALPHA};

/// Payload delivered to the click-notification callback.
pub struct NodeClick {
    pub node: NodeRecord,
}

pub type NodeClickHandler = Box<dyn FnMut(NodeClick)>;

/// Construction configuration recognized by the component.
pub struct NetmapOptions {
    /// Forwarded for future highlighting; not read yet.
    pub selected_item: Option<String>,
    /// Not read yet.
    pub show_all_devices: bool,
    pub on_node_click: Option<NodeClickHandler>,
    /// Diagram identifier, cosmetic.
    pub graph_id: String,
}

impl Default for NetmapOptions {
    fn default() -> Self {
        Self {
            selected_item: None,
            show_all_devices: true,
            on_node_click: None,
            graph_id: "graph".to_owned(),
        }
    }
}

/// One parent cluster: its member records, the member layout simulating them
/// in a frame local to the cluster, and the container's translation in the
/// outer frame.
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
    pub layout: Layout,
    /// Kept in sync with the cluster's outer node on every outer tick, so
    /// coordinate transforms never have to read the visual transform back.
    pub offset: Pos2,
}

/// Why an outer drag is being closed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandbackTrigger {
    PointerUp,
    ModifierUp,
}

enum Deferred {
    /// Second half of a child-to-parent handoff, run only after the dispatch
    /// turn that synthesized the child's gesture end has completed.
    CompleteHandoff {
        cluster: usize,
        local: Pos2,
        pointer: Pos2,
    },
}

/// The interactive nested network map: a fixed set of clusters positioned by
/// one outer layout, each simulating its own members in a local frame, plus
/// the state machine governing drags and handoffs between the two scopes.
pub struct Netmap {
    clusters: Vec<Cluster>,
    outer: Layout,
    machine: StateMachine,
    deferred: VecDeque<Deferred>,
    width: f32,
    height: f32,
    destroyed: bool,
    on_node_click: Option<NodeClickHandler>,
    pub selected_item: Option<String>,
    pub show_all_devices: bool,
    pub graph_id: String,
}

impl Netmap {
    pub fn new(records: Vec<ClusterRecord>, width: f32, height: f32, options: NetmapOptions) -> Self {
        let count = records.len().max(1);
        let clusters: Vec<Cluster> = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                // Side-by-side placement: each cluster gets the middle of an
                // equal horizontal band.
                let offset = Pos2::new(
                    width * (2 * i + 1) as f32 / (2 * count) as f32,
                    height / 2.0,
                );
                let mut layout = Layout::new(Pos2::ZERO, LayoutOptions::inner());
                for (j, node) in record.nodes.iter().enumerate() {
                    layout.add_node(&node.id, seed_position(j, record.nodes.len()));
                }
                for link in &record.links {
                    layout.add_link(&link.source, &link.target);
                }
                Cluster {
                    id: record.id,
                    name: record.name,
                    nodes: record.nodes,
                    links: record.links,
                    layout,
                    offset,
                }
            })
            .collect();

        let mut outer = Layout::new(Pos2::new(width / 2.0, height / 2.0), LayoutOptions::outer());
        for cluster in &clusters {
            outer.add_node(&cluster.id, cluster.offset);
        }

        Self {
            clusters,
            outer,
            machine: StateMachine::new(),
            deferred: VecDeque::new(),
            width,
            height,
            destroyed: false,
            on_node_click: options.on_node_click,
            selected_item: options.selected_item,
            show_all_devices: options.show_all_devices,
            graph_id: options.graph_id,
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster_mut(&mut self, index: usize) -> Option<&mut Cluster> {
        self.clusters.get_mut(index)
    }

    pub fn outer(&self) -> &Layout {
        &self.outer
    }

    pub fn current_state(&self) -> InteractionState {
        self.machine.current()
    }

    /// Diagnostics snapshot: current and previous state, session data, and
    /// the bounded transition history.
    pub fn info(&self) -> StateInfo {
        self.machine.info()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn any_layout_active(&self) -> bool {
        self.outer.active() || self.clusters.iter().any(|c| c.layout.active())
    }

    /// Rebind the subset of construction options that may change after
    /// construction; currently only the click callback.
    pub fn update_props(&mut self, on_node_click: Option<NodeClickHandler>) {
        if let Some(handler) = on_node_click {
            self.on_node_click = Some(handler);
        }
    }

    /// Invoke the click notification for a non-drag click on a member node.
    pub fn notify_node_click(&mut self, node: NodeHandle) {
        if self.destroyed {
            return;
        }
        let NodeHandle::Child { cluster, node } = node else {
            return;
        };
        let Some(record) = self
            .clusters
            .get(cluster)
            .and_then(|c| c.nodes.get(node))
            .cloned()
        else {
            return;
        };
        if let Some(handler) = self.on_node_click.as_mut() {
            handler(NodeClick { node: record });
        }
    }

    /// Advance both simulations one frame, keeping each cluster's stored
    /// container offset in sync with its outer node.
    pub fn tick(&mut self, dt: f32) {
        if self.destroyed {
            return;
        }
        self.outer.tick(dt);
        for i in 0..self.clusters.len() {
            let id = self.clusters[i].id.clone();
            if let Some(pos) = self.outer.position(&id) {
                self.clusters[i].offset = pos;
            }
            self.clusters[i].layout.tick(dt);
        }
    }

    /// Container resized: re-center the outer layout and wake both layouts
    /// at a moderate temperature so the diagram reflows.
    pub fn handle_resize(&mut self, width: f32, height: f32) {
        if self.destroyed || (width == self.width && height == self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.outer.set_center(Pos2::new(width / 2.0, height / 2.0));
        self.outer.set_alpha(RESTART_ALPHA);
        self.outer.restart();
        for cluster in &mut self.clusters {
            cluster.layout.set_alpha(RESTART_ALPHA);
            cluster.layout.restart();
        }
    }

    /// Global modifier key pressed.
    pub fn on_modifier_down(&mut self, scene: &mut dyn Scene) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        self.machine.session_mut().shift_pressed = true;
        match self.machine.current() {
            InteractionState::Idle => {
                self.machine
                    .transition(InteractionState::ShiftPressed, SessionPatch::default())?;
            }
            InteractionState::DraggingChild => {
                self.machine.transition(
                    InteractionState::DraggingChildWithShift,
                    SessionPatch::default(),
                )?;
                if let Some(LayoutScope::Cluster(cluster)) = self.machine.session().scope {
                    scene.set_cluster_highlight(cluster, true);
                }
            }
            InteractionState::DraggingParent => {
                self.machine.transition(
                    InteractionState::DraggingParentWithShift,
                    SessionPatch::default(),
                )?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Global modifier key released.
    pub fn on_modifier_up(&mut self, scene: &mut dyn Scene) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        self.machine.session_mut().shift_pressed = false;
        match self.machine.current() {
            InteractionState::ShiftPressed => {
                self.machine
                    .transition(InteractionState::Idle, SessionPatch::default())?;
            }
            InteractionState::DraggingChildWithShift => {
                // Modifier released before the pointer: back to a plain drag.
                self.machine
                    .transition(InteractionState::DraggingChild, SessionPatch::default())?;
                if let Some(LayoutScope::Cluster(cluster)) = self.machine.session().scope {
                    scene.set_cluster_highlight(cluster, false);
                }
            }
            InteractionState::DraggingParentWithShift => {
                self.machine
                    .transition(InteractionState::DraggingParent, SessionPatch::default())?;
            }
            InteractionState::HandoffInProgress => {
                // Modifier released mid-handoff finalizes it as a plain
                // parent drag.
                self.machine
                    .transition(InteractionState::DraggingParent, SessionPatch::default())?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Unconditional cleanup for a pointer release observed anywhere.
    /// Ignored exactly while a handoff is mid-flight, since the handoff
    /// machinery finishes its own bookkeeping.
    pub fn on_global_pointer_up(&mut self, scene: &mut dyn Scene) -> Result<(), InteractionError> {
        if self.destroyed {
            return Ok(());
        }
        if self.machine.current() == InteractionState::HandoffInProgress {
            log::debug!("global pointer up ignored: handoff in progress");
            return Ok(());
        }
        self.end_parent_handoff_back_to_child(HandbackTrigger::PointerUp, scene)
    }

    /// Idempotent teardown: stop both layout engines, reset the machine, and
    /// turn every entry point inert.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.outer.stop();
        for cluster in &mut self.clusters {
            cluster.layout.stop();
        }
        self.machine.reset();
        self.deferred.clear();
    }

    fn node_key(&self, node: NodeHandle) -> Option<String> {
        match node {
            NodeHandle::Child { cluster, node } => self
                .clusters
                .get(cluster)
                .and_then(|c| c.nodes.get(node))
                .map(|n| n.id.clone()),
            NodeHandle::Parent { cluster } => self.clusters.get(cluster).map(|c| c.id.clone()),
        }
    }

    fn layout(&self, scope: LayoutScope) -> Option<&Layout> {
        match scope {
            LayoutScope::Outer => Some(&self.outer),
            LayoutScope::Cluster(i) => self.clusters.get(i).map(|c| &c.layout),
        }
    }

    fn layout_mut(&mut self, scope: LayoutScope) -> Option<&mut Layout> {
        match scope {
            LayoutScope::Outer => Some(&mut self.outer),
            LayoutScope::Cluster(i) => self.clusters.get_mut(i).map(|c| &mut c.layout),
        }
    }
}

fn seed_position(i: usize, total: usize) -> Pos2 {
    let angle = i as f32 * std::f32::consts::TAU / total.max(1) as f32;
    Pos2::new(60.0 * angle.cos(), 60.0 * angle.sin())
}
