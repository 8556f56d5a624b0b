use std::collections::HashMap;

use egui::{Pos2, Vec2};
use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

/// Temperature target while a gesture holds a node.
pub const DRAG_ALPHA_TARGET: f32 = 0.3;
/// Temperature a layout is reheated to when it needs to reflow.
pub const RESTART_ALPHA: f32 = 0.3;
/// Floor temperature that keeps a member layout responsive to new drags.
pub const DRAGGABLE_ALPHA_FLOOR: f32 = 0.1;

/// Tuning for one layout instance.
#[derive(Clone, Copy, Debug)]
pub struct LayoutOptions {
    pub alpha: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub center_strength: f32,
    pub collide_radius: f32,
    pub force_charge: f32,
}

impl LayoutOptions {
    /// Tuning for a cluster's member layout, simulated in the cluster's
    /// local frame.
    pub fn inner() -> Self {
        Self {
            alpha: 0.3,
            alpha_decay: 0.05,
            alpha_min: DRAGGABLE_ALPHA_FLOOR,
            center_strength: 0.4,
            collide_radius: 18.0,
            force_charge: 150.0,
        }
    }

    /// Tuning for the outer layout positioning the cluster nodes themselves.
    pub fn outer() -> Self {
        Self {
            alpha: 0.3,
            alpha_decay: 0.05,
            alpha_min: 0.001,
            center_strength: 0.1,
            collide_radius: 150.0,
            force_charge: 600.0,
        }
    }
}

struct Body {
    id: String,
    pin: Option<Pos2>,
}

/// Driver for one force-layout instance. Force resolution and integration
/// are the engine's business; this wrapper owns the temperature envelope
/// (alpha decays toward a target, the layout goes dormant below the floor),
/// pin bookkeeping, a soft pull toward the layout center, and a
/// minimum-separation pass between free bodies.
pub struct Layout {
    graph: ForceGraph<Body, ()>,
    index: HashMap<String, DefaultNodeIdx>,
    center: Pos2,
    alpha: f32,
    alpha_min: f32,
    alpha_decay: f32,
    alpha_target: f32,
    center_strength: f32,
    collide_radius: f32,
    running: bool,
}

impl Layout {
    pub fn new(center: Pos2, opts: LayoutOptions) -> Self {
        let graph = ForceGraph::new(SimulationParameters {
            force_charge: opts.force_charge,
            force_spring: 0.05,
            force_max: 100.0,
            node_speed: 3000.0,
            damping_factor: 0.9,
        });
        Self {
            graph,
            index: HashMap::new(),
            center,
            alpha: opts.alpha,
            alpha_min: opts.alpha_min,
            alpha_decay: opts.alpha_decay,
            alpha_target: 0.0,
            center_strength: opts.center_strength,
            collide_radius: opts.collide_radius,
            running: true,
        }
    }

    pub fn add_node(&mut self, id: &str, pos: Pos2) {
        let idx = self.graph.add_node(NodeData {
            x: pos.x,
            y: pos.y,
            mass: 10.0,
            is_anchor: false,
            user_data: Body {
                id: id.to_owned(),
                pin: None,
            },
        });
        self.index.insert(id.to_owned(), idx);
    }

    /// Resolve a link into an engine edge. A link naming an unknown node is
    /// dropped; the rest of the graph keeps its shape.
    pub fn add_link(&mut self, source: &str, target: &str) {
        if let (Some(&src), Some(&tgt)) = (self.index.get(source), self.index.get(target)) {
            self.graph.add_edge(src, tgt, EdgeData::default());
        }
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Free position of a node.
    pub fn position(&self, id: &str) -> Option<Pos2> {
        let Some(&idx) = self.index.get(id) else {
            return None;
        };
        let mut found = None;
        self.graph.visit_nodes(|node| {
            if node.index() == idx {
                found = Some(Pos2::new(node.x(), node.y()));
            }
        });
        found
    }

    pub fn set_position(&mut self, id: &str, pos: Pos2) {
        let Some(&idx) = self.index.get(id) else {
            return;
        };
        self.graph.visit_nodes_mut(|node| {
            if node.index() == idx {
                node.data.x = pos.x;
                node.data.y = pos.y;
            }
        });
    }

    /// Pin override, if the node is currently held.
    pub fn pinned(&self, id: &str) -> Option<Pos2> {
        let Some(&idx) = self.index.get(id) else {
            return None;
        };
        let mut found = None;
        self.graph.visit_nodes(|node| {
            if node.index() == idx {
                found = node.data.user_data.pin;
            }
        });
        found
    }

    /// Pinned position if held, else the free position.
    pub fn resolved_position(&self, id: &str) -> Option<Pos2> {
        self.pinned(id).or_else(|| self.position(id))
    }

    /// Hold a node at a fixed position; the engine stops integrating it.
    pub fn pin(&mut self, id: &str, pos: Pos2) {
        let Some(&idx) = self.index.get(id) else {
            return;
        };
        self.graph.visit_nodes_mut(|node| {
            if node.index() == idx {
                node.data.x = pos.x;
                node.data.y = pos.y;
                node.data.is_anchor = true;
                node.data.user_data.pin = Some(pos);
            }
        });
    }

    /// Pin a node where it currently sits (gesture start).
    pub fn pin_in_place(&mut self, id: &str) {
        if let Some(pos) = self.position(id) {
            self.pin(id, pos);
        }
    }

    /// Release a pin so the engine resumes free integration of the node.
    pub fn unpin(&mut self, id: &str) {
        let Some(&idx) = self.index.get(id) else {
            return;
        };
        self.graph.visit_nodes_mut(|node| {
            if node.index() == idx {
                node.data.is_anchor = false;
                node.data.user_data.pin = None;
            }
        });
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn alpha_min(&self) -> f32 {
        self.alpha_min
    }

    pub fn set_alpha_min(&mut self, alpha_min: f32) {
        self.alpha_min = alpha_min;
    }

    pub fn set_alpha_target(&mut self, alpha_target: f32) {
        self.alpha_target = alpha_target;
    }

    pub fn set_center(&mut self, center: Pos2) {
        self.center = center;
    }

    pub fn restart(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Engine-reported activity: false once the temperature has decayed past
    /// the floor or the layout has been stopped.
    pub fn active(&self) -> bool {
        self.running
    }

    /// One simulation step. The temperature schedule decides how much energy
    /// the engine gets to spend; a layout whose alpha falls under the floor
    /// goes dormant until restarted.
    pub fn tick(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        if self.alpha < self.alpha_min {
            self.running = false;
            return;
        }
        let heat = self.alpha.min(1.0);
        self.graph.update(dt * heat);
        self.apply_center_pull(dt, heat);
        self.apply_separation();
        self.reassert_pins();
    }

    pub fn for_each_position(&self, mut f: impl FnMut(&str, Pos2)) {
        self.graph.visit_nodes(|node| {
            f(&node.data.user_data.id, Pos2::new(node.x(), node.y()));
        });
    }

    // Soft pull of free bodies toward the layout center, scaled by
    // temperature, so a sub-graph stays gathered around its frame origin.
    fn apply_center_pull(&mut self, dt: f32, heat: f32) {
        let center = self.center;
        let k = self.center_strength * heat * dt;
        self.graph.visit_nodes_mut(|node| {
            if node.data.is_anchor {
                return;
            }
            node.data.x += (center.x - node.data.x) * k;
            node.data.y += (center.y - node.data.y) * k;
        });
    }

    // Minimum-separation pass standing in for a collision constraint:
    // free bodies closer than twice the collide radius get pushed apart.
    fn apply_separation(&mut self) {
        if self.collide_radius <= 0.0 {
            return;
        }
        let min_sep = self.collide_radius * 2.0;
        let mut bodies: Vec<(DefaultNodeIdx, Pos2, bool)> = Vec::new();
        self.graph.visit_nodes(|node| {
            bodies.push((
                node.index(),
                Pos2::new(node.x(), node.y()),
                node.data.is_anchor,
            ));
        });
        let mut push: HashMap<DefaultNodeIdx, Vec2> = HashMap::new();
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (ia, pa, anchored_a) = bodies[i];
                let (ib, pb, anchored_b) = bodies[j];
                let delta = pb - pa;
                let dist = delta.length();
                if dist <= f32::EPSILON || dist >= min_sep {
                    continue;
                }
                let shove = delta / dist * ((min_sep - dist) * 0.5);
                if !anchored_a {
                    *push.entry(ia).or_insert(Vec2::ZERO) -= shove;
                }
                if !anchored_b {
                    *push.entry(ib).or_insert(Vec2::ZERO) += shove;
                }
            }
        }
        if push.is_empty() {
            return;
        }
        self.graph.visit_nodes_mut(|node| {
            if let Some(v) = push.get(&node.index()) {
                node.data.x += v.x;
                node.data.y += v.y;
            }
        });
    }

    // Held nodes sit exactly at their pin, whatever the passes above did.
    fn reassert_pins(&mut self) {
        self.graph.visit_nodes_mut(|node| {
            if let Some(pin) = node.data.user_data.pin {
                node.data.x = pin.x;
                node.data.y = pin.y;
            }
        });
    }
}
