use std::collections::{HashMap, HashSet};

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Vec2};

use crate::diagram::{Netmap, NetmapOptions};
use crate::graph_utils::graph::ClusterRecord;
use crate::interaction::Scene;
use crate::interaction::events::{DragEvent, GesturePhase};
use crate::interaction::state::{LayoutScope, NodeHandle};

const NODE_COLOR: Color32 = Color32::from_rgb(0x4e, 0xcd, 0xc4);
const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(0xff, 0x6b, 0x6b);
const RING_COLOR: Color32 = Color32::from_rgb(0x4c, 0xaf, 0x50);
const LINK_COLOR: Color32 = Color32::from_rgb(0x99, 0x99, 0x99);
const LABEL_COLOR: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);
const BACKGROUND: Color32 = Color32::from_rgb(0xf8, 0xf9, 0xfa);

const NODE_RADIUS: f32 = 12.0;
const RING_RADIUS: f32 = 150.0;

/// Retained visual interaction state owned by the frontend: which clusters
/// are tinted, and whether the pointer has been captured on behalf of an
/// outer node after a handoff.
#[derive(Default)]
pub struct SceneState {
    highlighted: HashSet<usize>,
    captured: Option<usize>,
}

impl SceneState {
    pub fn is_highlighted(&self, cluster: usize) -> bool {
        self.highlighted.contains(&cluster)
    }

    pub fn captured(&self) -> Option<usize> {
        self.captured
    }

    pub fn release_capture(&mut self) {
        self.captured = None;
    }
}

impl Scene for SceneState {
    fn set_cluster_highlight(&mut self, cluster: usize, highlighted: bool) {
        if highlighted {
            self.highlighted.insert(cluster);
        } else {
            self.highlighted.remove(&cluster);
        }
    }

    fn attach_pointer_capture(&mut self, cluster: usize, _client: Pos2) {
        self.captured = Some(cluster);
    }
}

pub struct NetmapApp {
    netmap: Netmap,
    scene: SceneState,
    pan: Vec2,
    zoom: f32,
    shift_down: bool,
    last_canvas_rect: Option<Rect>,
}

impl NetmapApp {
    pub fn new(records: Vec<ClusterRecord>, options: NetmapOptions) -> Self {
        Self {
            netmap: Netmap::new(records, 1200.0, 660.0, options),
            scene: SceneState::default(),
            pan: Vec2::ZERO,
            zoom: 0.8,
            shift_down: false,
            last_canvas_rect: None,
        }
    }

    pub fn netmap(&self) -> &Netmap {
        &self.netmap
    }
}

impl eframe::App for NetmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Global modifier tracking feeds the keyboard half of the machine.
        let shift = ctx.input(|i| i.modifiers.shift);
        if shift != self.shift_down {
            self.shift_down = shift;
            let result = if shift {
                self.netmap.on_modifier_down(&mut self.scene)
            } else {
                self.netmap.on_modifier_up(&mut self.scene)
            };
            if let Err(err) = result {
                log::error!("modifier handling failed: {err}");
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            if self.last_canvas_rect != Some(available) {
                self.last_canvas_rect = Some(available);
                self.netmap
                    .handle_resize(available.width(), available.height());
            }

            let dt = ctx.input(|i| i.stable_dt).clamp(0.001, 0.033);
            self.netmap.tick(dt);

            // Background gets what the nodes leave over: panning and zoom.
            let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
            if bg_resp.hovered() {
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let factor = if scroll > 0.0 { 1.1 } else { 0.9 };
                    self.zoom = (self.zoom * factor).clamp(0.1, 10.0);
                }
            }

            let painter = ui.painter_at(available);
            painter.rect_filled(available, 0.0, BACKGROUND);

            let origin = available.min;
            let zoom = self.zoom;
            let pan = self.pan;
            let to_screen = move |p: Pos2| -> Pos2 {
                Pos2::new(p.x * zoom + origin.x + pan.x, p.y * zoom + origin.y + pan.y)
            };
            let from_screen = move |p: Pos2| -> Pos2 {
                Pos2::new((p.x - origin.x - pan.x) / zoom, (p.y - origin.y - pan.y) / zoom)
            };

            let pointer = ui.input(|i| i.pointer.latest_pos());
            let primary_down = ui.input(|i| i.pointer.primary_down());
            let any_released = ui.input(|i| i.pointer.any_released());

            // Cluster rings first so member nodes draw and hit-test on top.
            for c in 0..self.netmap.clusters().len() {
                let offset = self.netmap.clusters()[c].offset;
                let ring_center = to_screen(offset);
                let ring_radius = RING_RADIUS * zoom;
                painter.circle_stroke(
                    ring_center,
                    ring_radius,
                    Stroke::new(20.0 * zoom, RING_COLOR),
                );

                let rect = Rect::from_center_size(ring_center, Vec2::splat(ring_radius * 2.0));
                let resp = ui.allocate_rect(rect, Sense::click_and_drag());
                if self.scene.captured().is_some() {
                    continue;
                }
                let handle = NodeHandle::Parent { cluster: c };
                if resp.drag_started() {
                    let client = pointer.unwrap_or(ring_center);
                    let ev = DragEvent::real(GesturePhase::Start, offset, shift, client);
                    if let Err(err) =
                        self.netmap
                            .on_drag_start(ev, handle, LayoutScope::Outer, &mut self.scene)
                    {
                        log::error!("parent drag start failed: {err}");
                    }
                } else if resp.dragged() {
                    if let Some(p) = pointer {
                        let ev = DragEvent::real(GesturePhase::Drag, from_screen(p), shift, p);
                        self.netmap.on_drag_move(ev, handle, LayoutScope::Outer);
                    }
                } else if resp.drag_stopped() {
                    let pos = pointer.map(from_screen).unwrap_or(offset);
                    let client = pointer.unwrap_or(ring_center);
                    let ev = DragEvent::real(GesturePhase::End, pos, shift, client);
                    if let Err(err) =
                        self.netmap
                            .on_drag_end(ev, handle, LayoutScope::Outer, &mut self.scene)
                    {
                        log::error!("parent drag end failed: {err}");
                    }
                }
            }

            // Member sub-graphs: links underneath, then nodes with labels.
            for c in 0..self.netmap.clusters().len() {
                let (offset, highlighted, segments, nodes) = {
                    let cluster = &self.netmap.clusters()[c];
                    let mut positions: HashMap<String, Pos2> = HashMap::new();
                    cluster
                        .layout
                        .for_each_position(|id, p| {
                            positions.insert(id.to_owned(), p);
                        });
                    let segments: Vec<(Pos2, Pos2)> = cluster
                        .links
                        .iter()
                        .filter_map(|link| {
                            Some((
                                *positions.get(&link.source)?,
                                *positions.get(&link.target)?,
                            ))
                        })
                        .collect();
                    let nodes: Vec<(usize, String, Pos2)> = cluster
                        .nodes
                        .iter()
                        .enumerate()
                        .map(|(i, node)| {
                            (
                                i,
                                node.name.clone(),
                                positions.get(&node.id).copied().unwrap_or(Pos2::ZERO),
                            )
                        })
                        .collect();
                    (
                        cluster.offset,
                        self.scene.is_highlighted(c),
                        segments,
                        nodes,
                    )
                };

                let link_stroke = Stroke::new(2.0 * zoom, LINK_COLOR.gamma_multiply(0.6));
                for (a, b) in segments {
                    painter.line_segment(
                        [
                            to_screen(offset + a.to_vec2()),
                            to_screen(offset + b.to_vec2()),
                        ],
                        link_stroke,
                    );
                }

                for (i, name, local) in nodes {
                    let screen = to_screen(offset + local.to_vec2());
                    let rect =
                        Rect::from_center_size(screen, Vec2::splat(NODE_RADIUS * 2.0 * zoom));
                    let resp = ui.allocate_rect(rect, Sense::click_and_drag());

                    let fill = if highlighted || resp.hovered() {
                        HIGHLIGHT_COLOR
                    } else {
                        NODE_COLOR
                    };
                    painter.circle_filled(screen, NODE_RADIUS * zoom, fill);
                    painter.circle_stroke(
                        screen,
                        NODE_RADIUS * zoom,
                        Stroke::new(2.0 * zoom, Color32::WHITE),
                    );
                    painter.text(
                        screen + Vec2::new(0.0, 20.0 * zoom),
                        Align2::CENTER_CENTER,
                        &name,
                        FontId::proportional((10.0 * zoom).max(6.0)),
                        LABEL_COLOR,
                    );

                    let handle = NodeHandle::Child { cluster: c, node: i };
                    if resp.clicked() {
                        self.netmap.notify_node_click(handle);
                    }
                    if self.scene.captured().is_some() {
                        continue;
                    }
                    let scope = LayoutScope::Cluster(c);
                    if resp.drag_started() {
                        let client = pointer.unwrap_or(screen);
                        let ev = DragEvent::real(GesturePhase::Start, local, shift, client);
                        if let Err(err) = self.netmap.on_drag_start(ev, handle, scope, &mut self.scene)
                        {
                            log::error!("child drag start failed: {err}");
                        }
                    } else if resp.dragged() {
                        if let Some(p) = pointer {
                            let local_p = from_screen(p) - offset.to_vec2();
                            let ev = DragEvent::real(GesturePhase::Drag, local_p, shift, p);
                            self.netmap.on_drag_move(ev, handle, scope);
                        }
                    } else if resp.drag_stopped() {
                        let pos = pointer
                            .map(|p| from_screen(p) - offset.to_vec2())
                            .unwrap_or(local);
                        let client = pointer.unwrap_or(screen);
                        let ev = DragEvent::real(GesturePhase::End, pos, shift, client);
                        if let Err(err) = self.netmap.on_drag_end(ev, handle, scope, &mut self.scene)
                        {
                            log::error!("child drag end failed: {err}");
                        }
                    }
                }
            }

            // After a handoff the gesture belongs to the outer node; follow
            // the raw pointer until it is released.
            if let Some(c) = self.scene.captured() {
                let handle = NodeHandle::Parent { cluster: c };
                if any_released {
                    let pos = pointer
                        .map(from_screen)
                        .unwrap_or(self.netmap.clusters()[c].offset);
                    let client = pointer.unwrap_or(Pos2::ZERO);
                    let ev = DragEvent::real(GesturePhase::End, pos, shift, client);
                    if let Err(err) =
                        self.netmap
                            .on_drag_end(ev, handle, LayoutScope::Outer, &mut self.scene)
                    {
                        log::error!("captured drag end failed: {err}");
                    }
                    self.scene.release_capture();
                } else if primary_down {
                    if let Some(p) = pointer {
                        let ev = DragEvent::real(GesturePhase::Drag, from_screen(p), shift, p);
                        self.netmap.on_drag_move(ev, handle, LayoutScope::Outer);
                    }
                }
            }

            // Releasing the mouse anywhere always terminates whatever drag is
            // logically active.
            if any_released {
                if let Err(err) = self.netmap.on_global_pointer_up(&mut self.scene) {
                    log::error!("global pointer up failed: {err}");
                }
            }

            if bg_resp.dragged() && !self.netmap.current_state().is_dragging() {
                self.pan += bg_resp.drag_delta();
            }
        });

        // Deferred cross-layout starts run once this dispatch turn is over.
        if let Err(err) = self.netmap.pump_deferred(&mut self.scene) {
            log::error!("handoff completion failed: {err}");
        }

        if self.netmap.any_layout_active() {
            ctx.request_repaint();
        }
    }
}
