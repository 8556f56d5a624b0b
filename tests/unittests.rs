use std::cell::RefCell;
use std::rc::Rc;

use egui::Pos2;

use netmap::diagram::{Netmap, NetmapOptions, NodeClick};
use netmap::graph_utils::sample::sample_clusters;
use netmap::interaction::Scene;
use netmap::interaction::events::{DragEvent, GesturePhase};
use netmap::interaction::state::{
    ALL_STATES, InteractionError, InteractionState, LayoutScope, NodeHandle, Session,
    SessionPatch, StateMachine,
};
use netmap::sim::layout::{Layout, LayoutOptions};

// Scene double that records what the core asked of the drawing surface.
#[derive(Default)]
struct RecordingScene {
    highlights: Vec<(usize, bool)>,
    captures: Vec<(usize, Pos2)>,
}

impl RecordingScene {
    fn highlighted(&self, cluster: usize) -> bool {
        self.highlights
            .iter()
            .rev()
            .find(|(c, _)| *c == cluster)
            .map(|(_, on)| *on)
            .unwrap_or(false)
    }
}

impl Scene for RecordingScene {
    fn set_cluster_highlight(&mut self, cluster: usize, highlighted: bool) {
        self.highlights.push((cluster, highlighted));
    }

    fn attach_pointer_capture(&mut self, cluster: usize, client: Pos2) {
        self.captures.push((cluster, client));
    }
}

fn fixture() -> (Netmap, RecordingScene) {
    let clusters = sample_clusters().expect("sample dataset");
    (
        Netmap::new(clusters, 1200.0, 600.0, NetmapOptions::default()),
        RecordingScene::default(),
    )
}

// The full transition table, spelled out independently of the
// implementation's own allow-list.
fn expected_targets(from: InteractionState) -> &'static [InteractionState] {
    use InteractionState::*;
    match from {
        Idle => &[ShiftPressed, DraggingChild, DraggingParent],
        ShiftPressed => &[Idle, DraggingChildWithShift, DraggingParentWithShift],
        DraggingChild => &[Idle, DraggingChildWithShift, HandoffInProgress],
        DraggingParent => &[Idle, DraggingParentWithShift],
        DraggingChildWithShift => &[
            DraggingChild,
            HandoffInProgress,
            Idle,
            DraggingChildWithShiftCommitted,
        ],
        DraggingParentWithShift => &[DraggingParent, Idle, DraggingParentWithShiftCommitted],
        HandoffInProgress => &[DraggingParent, DraggingParentWithShift, Idle],
        DraggingChildWithShiftCommitted => &[HandoffInProgress, Idle],
        DraggingParentWithShiftCommitted => &[Idle],
    }
}

// Walk a fresh machine to `target` along legal transitions only.
fn drive_to(machine: &mut StateMachine, target: InteractionState) {
    use InteractionState::*;
    machine.reset();
    let path: &[InteractionState] = match target {
        Idle => &[],
        ShiftPressed => &[ShiftPressed],
        DraggingChild => &[DraggingChild],
        DraggingParent => &[DraggingParent],
        DraggingChildWithShift => &[DraggingChild, DraggingChildWithShift],
        DraggingParentWithShift => &[DraggingParent, DraggingParentWithShift],
        HandoffInProgress => &[DraggingChild, HandoffInProgress],
        DraggingChildWithShiftCommitted => &[
            DraggingChild,
            DraggingChildWithShift,
            DraggingChildWithShiftCommitted,
        ],
        DraggingParentWithShiftCommitted => &[
            DraggingParent,
            DraggingParentWithShift,
            DraggingParentWithShiftCommitted,
        ],
    };
    for &step in path {
        machine
            .transition(step, SessionPatch::default())
            .expect("legal path step");
    }
}

#[test]
fn transition_allow_list_is_enforced() {
    for &from in ALL_STATES.iter() {
        for &to in ALL_STATES.iter() {
            let mut machine = StateMachine::new();
            drive_to(&mut machine, from);
            assert_eq!(machine.current(), from);

            let allowed = expected_targets(from).contains(&to);
            let result = machine.transition(to, SessionPatch::default());
            if allowed {
                assert!(result.is_ok(), "expected {from} -> {to} to be legal");
                assert_eq!(machine.current(), to);
            } else {
                assert_eq!(
                    result,
                    Err(InteractionError::InvalidTransition { from, to }),
                    "expected {from} -> {to} to be rejected"
                );
                assert_eq!(
                    machine.current(),
                    from,
                    "a rejected transition must leave the state unchanged"
                );
            }
        }
    }
}

#[test]
fn invalid_transition_error_names_both_states() {
    let mut machine = StateMachine::new();
    let err = machine
        .transition(
            InteractionState::HandoffInProgress,
            SessionPatch::default(),
        )
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("idle"), "got: {message}");
    assert!(message.contains("handoff_in_progress"), "got: {message}");
}

#[test]
fn reset_is_idempotent() {
    let mut machine = StateMachine::new();
    drive_to(&mut machine, InteractionState::DraggingChildWithShift);
    machine.session_mut().dragged = Some(NodeHandle::Child {
        cluster: 0,
        node: 3,
    });

    machine.reset();
    assert_eq!(machine.current(), InteractionState::Idle);
    let first = *machine.session();
    machine.reset();
    assert_eq!(machine.current(), InteractionState::Idle);
    assert_eq!(*machine.session(), first);
    assert_eq!(first, Session::default());
}

#[test]
fn transition_history_is_bounded() {
    use InteractionState::*;
    let mut machine = StateMachine::new();
    // 12 legal transitions by bouncing between idle and shift-pressed.
    for _ in 0..6 {
        machine.transition(ShiftPressed, SessionPatch::default()).unwrap();
        machine.transition(Idle, SessionPatch::default()).unwrap();
    }
    assert_eq!(machine.info().history.len(), 10);
}

#[test]
fn session_invariant_holds_through_a_drag_lifecycle() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 0,
        node: 0,
    };
    let assert_invariant = |map: &Netmap| {
        let info = map.info();
        assert_eq!(
            info.session.dragged.is_some(),
            info.current.is_dragging(),
            "dragged must be set exactly in the dragging states (state: {})",
            info.current
        );
    };

    assert_invariant(&map);
    map.on_modifier_down(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::ShiftPressed);
    assert_invariant(&map);
    map.on_modifier_up(&mut scene).unwrap();
    assert_invariant(&map);

    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::new(0.0, 0.0),
        false,
        Pos2::new(100.0, 100.0),
    );
    map.on_drag_start(start, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingChild);
    assert_eq!(map.info().session.dragged, Some(node));
    assert_invariant(&map);

    let end = DragEvent::real(
        GesturePhase::End,
        Pos2::new(0.0, 0.0),
        false,
        Pos2::new(100.0, 100.0),
    );
    map.on_drag_end(end, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    assert_eq!(map.current_state(), InteractionState::Idle);
    assert_invariant(&map);
}

#[test]
fn shift_first_sequence_promotes_the_child_drag() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 0,
        node: 2,
    };

    map.on_modifier_down(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::ShiftPressed);

    // The pointer event itself carries no modifier flag; the machine already
    // knows shift went down first.
    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::ZERO,
        false,
        Pos2::new(50.0, 50.0),
    );
    map.on_drag_start(start, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    assert_eq!(
        map.current_state(),
        InteractionState::DraggingChildWithShift
    );
    assert!(scene.highlighted(0));
}

#[test]
fn modifier_is_reversible_during_a_child_drag() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 0,
        node: 0,
    };

    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::ZERO,
        false,
        Pos2::new(80.0, 90.0),
    );
    map.on_drag_start(start, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingChild);

    map.on_modifier_down(&mut scene).unwrap();
    assert_eq!(
        map.current_state(),
        InteractionState::DraggingChildWithShift
    );
    assert!(scene.highlighted(0));

    map.on_modifier_up(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingChild);
    assert_eq!(map.info().session.dragged, Some(node));
    assert!(!scene.highlighted(0));
}

#[test]
fn pointer_release_with_shift_commits_irreversibly_to_a_handoff() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 0,
        node: 0,
    };

    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::ZERO,
        false,
        Pos2::new(80.0, 90.0),
    );
    map.on_drag_start(start, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    map.on_modifier_down(&mut scene).unwrap();

    // Pointer released while the modifier is still held.
    let end = DragEvent::real(GesturePhase::End, Pos2::ZERO, true, Pos2::new(80.0, 90.0));
    map.on_drag_end(end, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    assert_eq!(
        map.current_state(),
        InteractionState::DraggingChildWithShiftCommitted
    );
    map.pump_deferred(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingParent);

    let transitions: Vec<(InteractionState, InteractionState)> = map
        .info()
        .history
        .iter()
        .map(|record| (record.from, record.to))
        .collect();
    let commit_at = transitions
        .iter()
        .position(|&(from, to)| {
            from == InteractionState::DraggingChildWithShift
                && to == InteractionState::DraggingChildWithShiftCommitted
        })
        .expect("the commit must be recorded");
    assert!(transitions[commit_at..].contains(&(
        InteractionState::DraggingChildWithShiftCommitted,
        InteractionState::HandoffInProgress,
    )));
    // Once committed, the gesture never reverts to a plain child drag.
    assert!(
        transitions[commit_at..]
            .iter()
            .all(|&(_, to)| to != InteractionState::DraggingChild)
    );
}

#[test]
fn handoff_round_trip_pins_the_outer_node_at_the_transformed_position() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 0,
        node: 0,
    };
    let child_id = map.clusters()[0].nodes[0].id.clone();
    let cluster_id = map.clusters()[0].id.clone();
    let offset = map.clusters()[0].offset;

    map.cluster_mut(0)
        .unwrap()
        .layout
        .set_position(&child_id, Pos2::new(10.0, 10.0));

    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::new(10.0, 10.0),
        false,
        Pos2::new(300.0, 200.0),
    );
    map.on_drag_start(start, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    assert_eq!(map.info().session.drag_start, Pos2::new(10.0, 10.0));
    map.on_modifier_down(&mut scene).unwrap();

    // Displace by (+50, +30).
    let drag = DragEvent::real(
        GesturePhase::Drag,
        Pos2::new(60.0, 40.0),
        true,
        Pos2::new(350.0, 230.0),
    );
    map.on_drag_move(drag, node, LayoutScope::Cluster(0));

    let end = DragEvent::real(
        GesturePhase::End,
        Pos2::new(60.0, 40.0),
        true,
        Pos2::new(350.0, 230.0),
    );
    map.on_drag_end(end, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    map.pump_deferred(&mut scene).unwrap();

    let pinned = map
        .outer()
        .pinned(&cluster_id)
        .expect("the outer node must be pinned after the handoff");
    assert!((pinned.x - (offset.x + 60.0)).abs() < 1e-3, "got {pinned:?}");
    assert!((pinned.y - (offset.y + 40.0)).abs() < 1e-3, "got {pinned:?}");
    assert_eq!(map.current_state(), InteractionState::DraggingParent);
    assert_eq!(scene.captures.len(), 1);

    // The member layout is frozen while its cluster is being dragged.
    assert_eq!(map.clusters()[0].layout.alpha(), 0.0);

    // Ending the outer drag restarts the originating member layout.
    let parent = NodeHandle::Parent { cluster: 0 };
    let parent_end = DragEvent::real(GesturePhase::End, pinned, false, Pos2::new(350.0, 230.0));
    map.on_drag_end(parent_end, parent, LayoutScope::Outer, &mut scene)
        .unwrap();
    assert_eq!(map.current_state(), InteractionState::Idle);
    let inner = &map.clusters()[0].layout;
    assert!(inner.alpha() > 0.0);
    assert!(inner.alpha_min() >= 0.1);
    assert!(inner.active());
    assert_eq!(map.outer().pinned(&cluster_id), None);
}

#[test]
fn synthetic_end_during_a_handoff_leaves_the_state_untouched() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 1,
        node: 4,
    };

    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::ZERO,
        false,
        Pos2::new(900.0, 300.0),
    );
    map.on_drag_start(start, node, LayoutScope::Cluster(1), &mut scene)
        .unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingChild);

    // Mid-gesture handoff: the synthesized child end must not short-circuit
    // the machine back to idle.
    map.begin_child_to_parent_handoff(1, &mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingChild);
    assert_eq!(map.info().session.origin_cluster, Some(1));

    map.pump_deferred(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::DraggingParent);
    assert_eq!(
        map.info().session.dragged,
        Some(NodeHandle::Parent { cluster: 1 })
    );
    assert_eq!(scene.captures.len(), 1);
}

#[test]
fn handoff_request_without_an_active_drag_is_a_logged_noop() {
    let (mut map, mut scene) = fixture();
    map.begin_child_to_parent_handoff(0, &mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::Idle);
    assert!(map.info().history.is_empty());
    map.pump_deferred(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::Idle);
    let cluster_id = map.clusters()[0].id.clone();
    assert_eq!(map.outer().pinned(&cluster_id), None);
}

#[test]
fn global_pointer_up_while_idle_is_a_noop() {
    let (mut map, mut scene) = fixture();
    map.on_global_pointer_up(&mut scene).unwrap();
    assert_eq!(map.current_state(), InteractionState::Idle);
    assert!(map.info().history.is_empty());
    assert!(scene.highlights.is_empty());
    assert!(scene.captures.is_empty());
}

#[test]
fn shift_parent_release_commits_and_ends_the_gesture() {
    let (mut map, mut scene) = fixture();
    let parent = NodeHandle::Parent { cluster: 1 };

    // Shift goes down first, so the machine is already in the shift-pressed
    // state when the pointer lands on the cluster.
    map.on_modifier_down(&mut scene).unwrap();
    let start = DragEvent::real(
        GesturePhase::Start,
        Pos2::new(900.0, 300.0),
        true,
        Pos2::new(900.0, 300.0),
    );
    map.on_drag_start(start, parent, LayoutScope::Outer, &mut scene)
        .unwrap();
    assert_eq!(
        map.current_state(),
        InteractionState::DraggingParentWithShift
    );

    let end = DragEvent::real(
        GesturePhase::End,
        Pos2::new(920.0, 320.0),
        true,
        Pos2::new(920.0, 320.0),
    );
    map.on_drag_end(end, parent, LayoutScope::Outer, &mut scene)
        .unwrap();
    assert_eq!(map.current_state(), InteractionState::Idle);

    let transitions: Vec<(InteractionState, InteractionState)> = map
        .info()
        .history
        .iter()
        .map(|record| (record.from, record.to))
        .collect();
    assert!(transitions.contains(&(
        InteractionState::DraggingParentWithShift,
        InteractionState::DraggingParentWithShiftCommitted,
    )));
}

#[test]
fn destroy_makes_every_entry_point_inert() {
    let (mut map, mut scene) = fixture();
    let node = NodeHandle::Child {
        cluster: 0,
        node: 0,
    };
    let child_id = map.clusters()[0].nodes[0].id.clone();
    let before = map.clusters()[0].layout.position(&child_id);

    map.destroy();
    assert!(map.is_destroyed());
    assert!(!map.any_layout_active());

    let start = DragEvent::real(GesturePhase::Start, Pos2::ZERO, false, Pos2::ZERO);
    map.on_drag_start(start, node, LayoutScope::Cluster(0), &mut scene)
        .unwrap();
    map.on_drag_move(
        DragEvent::real(GesturePhase::Drag, Pos2::new(99.0, 99.0), false, Pos2::ZERO),
        node,
        LayoutScope::Cluster(0),
    );
    map.on_modifier_down(&mut scene).unwrap();
    map.on_global_pointer_up(&mut scene).unwrap();
    map.begin_child_to_parent_handoff(0, &mut scene).unwrap();
    map.pump_deferred(&mut scene).unwrap();
    map.tick(0.016);
    map.handle_resize(640.0, 480.0);

    assert_eq!(map.current_state(), InteractionState::Idle);
    assert!(map.info().history.is_empty());
    assert_eq!(map.info().session, Session::default());
    assert_eq!(map.clusters()[0].layout.position(&child_id), before);
    assert_eq!(map.clusters()[0].layout.pinned(&child_id), None);
    assert!(scene.highlights.is_empty());
    assert!(scene.captures.is_empty());
    assert!(!map.any_layout_active());

    // Second teardown is a no-op.
    map.destroy();
    assert!(map.is_destroyed());
}

#[test]
fn click_callback_receives_the_node_record_and_can_be_rebound() {
    let clicked: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = clicked.clone();
    let options = NetmapOptions {
        on_node_click: Some(Box::new(move |click: NodeClick| {
            sink.borrow_mut().push(click.node.id);
        })),
        ..NetmapOptions::default()
    };
    let mut map = Netmap::new(sample_clusters().unwrap(), 1200.0, 600.0, options);

    map.notify_node_click(NodeHandle::Child {
        cluster: 0,
        node: 0,
    });
    assert_eq!(clicked.borrow().as_slice(), ["node1".to_owned()]);

    // Parent nodes do not notify.
    map.notify_node_click(NodeHandle::Parent { cluster: 0 });
    assert_eq!(clicked.borrow().len(), 1);

    // `update_props` rebinds only the click callback.
    let count: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));
    let counter = count.clone();
    map.update_props(Some(Box::new(move |_click: NodeClick| {
        *counter.borrow_mut() += 1;
    })));
    map.notify_node_click(NodeHandle::Child {
        cluster: 1,
        node: 2,
    });
    assert_eq!(*count.borrow(), 1);
    assert_eq!(clicked.borrow().len(), 1);
}

#[test]
fn sample_dataset_parses_and_every_link_resolves() {
    let clusters = sample_clusters().expect("embedded sample dataset");
    assert_eq!(clusters.len(), 2);
    for cluster in &clusters {
        assert_eq!(cluster.nodes.len(), 10);
        for link in &cluster.links {
            assert!(
                cluster.node_index(&link.source).is_some(),
                "link source {} missing in {}",
                link.source,
                cluster.id
            );
            assert!(
                cluster.node_index(&link.target).is_some(),
                "link target {} missing in {}",
                link.target,
                cluster.id
            );
        }
    }
}

#[test]
fn layout_pins_override_free_integration() {
    let mut layout = Layout::new(Pos2::ZERO, LayoutOptions::inner());
    layout.add_node("a", Pos2::new(5.0, 6.0));
    layout.add_node("b", Pos2::new(-5.0, -6.0));
    layout.add_link("a", "b");
    // A link naming an unknown node is dropped without complaint.
    layout.add_link("a", "ghost");

    assert_eq!(layout.position("a"), Some(Pos2::new(5.0, 6.0)));
    assert_eq!(layout.pinned("a"), None);

    layout.pin("a", Pos2::new(40.0, 50.0));
    assert_eq!(layout.pinned("a"), Some(Pos2::new(40.0, 50.0)));
    assert_eq!(layout.resolved_position("a"), Some(Pos2::new(40.0, 50.0)));

    layout.set_alpha_target(0.3);
    for _ in 0..10 {
        layout.tick(0.016);
    }
    // The held node has not moved; the free one has.
    assert_eq!(layout.position("a"), Some(Pos2::new(40.0, 50.0)));
    assert_ne!(layout.position("b"), Some(Pos2::new(-5.0, -6.0)));

    layout.unpin("a");
    assert_eq!(layout.pinned("a"), None);
    assert_eq!(layout.resolved_position("a"), Some(Pos2::new(40.0, 50.0)));
}

#[test]
fn layout_goes_dormant_below_the_alpha_floor_and_wakes_on_restart() {
    let mut layout = Layout::new(Pos2::ZERO, LayoutOptions::inner());
    layout.add_node("a", Pos2::new(5.0, 5.0));
    assert!(layout.active());

    for _ in 0..200 {
        layout.tick(0.016);
    }
    assert!(!layout.active(), "temperature must decay past the floor");

    // The warm-up a drag start performs.
    layout.set_alpha_target(0.3);
    layout.restart();
    layout.tick(0.016);
    assert!(layout.active());
}

#[test]
fn resize_recenters_and_reheats_both_layouts() {
    let (mut map, _scene) = fixture();
    // Let everything settle to dormancy first.
    for _ in 0..400 {
        map.tick(0.016);
    }
    assert!(!map.clusters()[0].layout.active());

    // Same dimensions: nothing to do.
    map.handle_resize(1200.0, 600.0);
    assert!(!map.clusters()[0].layout.active());

    map.handle_resize(900.0, 500.0);
    assert!(map.outer().active());
    for cluster in map.clusters() {
        assert!(cluster.layout.active());
        assert!(cluster.layout.alpha() > 0.0);
    }
}
