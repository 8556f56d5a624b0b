use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use egui::Pos2;
use thiserror::Error;

/// Which layout instance a gesture is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutScope {
    /// The outer layout positioning the cluster nodes themselves.
    Outer,
    /// The member layout of the cluster at this index.
    Cluster(usize),
}

/// A node addressed by its place in the diagram. Parent nodes are the ones
/// that own a sub-graph container; child nodes belong to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeHandle {
    Child { cluster: usize, node: usize },
    Parent { cluster: usize },
}

impl NodeHandle {
    pub fn is_parent(&self) -> bool {
        matches!(self, NodeHandle::Parent { .. })
    }

    pub fn cluster(&self) -> usize {
        match *self {
            NodeHandle::Child { cluster, .. } | NodeHandle::Parent { cluster } => cluster,
        }
    }

    /// The layout that owns this node.
    pub fn scope(&self) -> LayoutScope {
        match *self {
            NodeHandle::Child { cluster, .. } => LayoutScope::Cluster(cluster),
            NodeHandle::Parent { .. } => LayoutScope::Outer,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionState {
    Idle,
    ShiftPressed,
    DraggingChild,
    DraggingParent,
    DraggingChildWithShift,
    DraggingParentWithShift,
    HandoffInProgress,
    DraggingChildWithShiftCommitted,
    DraggingParentWithShiftCommitted,
}

pub const ALL_STATES: [InteractionState; 9] = [
    InteractionState::Idle,
    InteractionState::ShiftPressed,
    InteractionState::DraggingChild,
    InteractionState::DraggingParent,
    InteractionState::DraggingChildWithShift,
    InteractionState::DraggingParentWithShift,
    InteractionState::HandoffInProgress,
    InteractionState::DraggingChildWithShiftCommitted,
    InteractionState::DraggingParentWithShiftCommitted,
];

impl InteractionState {
    /// States this one may legally move to. The committed states keep a
    /// released-then-re-pressed modifier from reopening a gesture that has
    /// already been handed off or ended.
    pub fn allowed_targets(self) -> &'static [InteractionState] {
        use InteractionState::*;
        match self {
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

    /// True for every state in which a node is held by the pointer.
    pub fn is_dragging(self) -> bool {
        !matches!(self, InteractionState::Idle | InteractionState::ShiftPressed)
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionState::Idle => "idle",
            InteractionState::ShiftPressed => "shift_pressed",
            InteractionState::DraggingChild => "dragging_child",
            InteractionState::DraggingParent => "dragging_parent",
            InteractionState::DraggingChildWithShift => "dragging_child_with_shift",
            InteractionState::DraggingParentWithShift => "dragging_parent_with_shift",
            InteractionState::HandoffInProgress => "handoff_in_progress",
            InteractionState::DraggingChildWithShiftCommitted => {
                "dragging_child_with_shift_committed"
            }
            InteractionState::DraggingParentWithShiftCommitted => {
                "dragging_parent_with_shift_committed"
            }
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    /// A transition outside the allow-list: a sequencing bug in the caller,
    /// never a recoverable runtime condition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: InteractionState,
        to: InteractionState,
    },
}

/// Mutable data carried alongside the current state for the active gesture.
/// At most one node is dragged process-wide; `dragged` is `Some` exactly in
/// the dragging states and is cleared on every transition back to idle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Session {
    pub shift_pressed: bool,
    pub dragged: Option<NodeHandle>,
    /// Layout instance that currently owns the drag.
    pub scope: Option<LayoutScope>,
    pub drag_start: Pos2,
    /// Latest pointer client coordinates.
    pub pointer: Pos2,
    /// During a handoff: the child node the gesture was lifted from.
    pub origin_child: Option<NodeHandle>,
    pub origin_cluster: Option<usize>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            shift_pressed: false,
            dragged: None,
            scope: None,
            drag_start: Pos2::ZERO,
            pointer: Pos2::ZERO,
            origin_child: None,
            origin_cluster: None,
        }
    }
}

impl Session {
    fn clear_gesture(&mut self) {
        self.dragged = None;
        self.scope = None;
        self.origin_child = None;
        self.origin_cluster = None;
    }
}

/// What a successful transition merges into the session; `Some` sets the
/// field, `None` leaves it alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionPatch {
    pub dragged: Option<NodeHandle>,
    pub scope: Option<LayoutScope>,
    pub drag_start: Option<Pos2>,
    pub pointer: Option<Pos2>,
    pub origin_child: Option<NodeHandle>,
    pub origin_cluster: Option<usize>,
}

impl SessionPatch {
    fn apply(self, session: &mut Session) {
        if let Some(dragged) = self.dragged {
            session.dragged = Some(dragged);
        }
        if let Some(scope) = self.scope {
            session.scope = Some(scope);
        }
        if let Some(drag_start) = self.drag_start {
            session.drag_start = drag_start;
        }
        if let Some(pointer) = self.pointer {
            session.pointer = pointer;
        }
        if let Some(origin_child) = self.origin_child {
            session.origin_child = Some(origin_child);
        }
        if let Some(origin_cluster) = self.origin_cluster {
            session.origin_cluster = Some(origin_cluster);
        }
    }
}

/// One recorded transition, kept for diagnostics only.
#[derive(Clone, Copy, Debug)]
pub struct TransitionRecord {
    pub from: InteractionState,
    pub to: InteractionState,
    pub at: Instant,
    /// Session contents at the moment of the transition, before the patch.
    pub session: Session,
}

const HISTORY_CAPACITY: usize = 10;

/// Bounded ring of recent transitions. Append and evict are O(1).
#[derive(Clone, Debug, Default)]
pub struct TransitionLog {
    entries: VecDeque<TransitionRecord>,
}

impl TransitionLog {
    fn push(&mut self, record: TransitionRecord) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.entries.iter()
    }
}

/// Read-only snapshot of the machine for diagnostics and tests.
#[derive(Clone, Debug)]
pub struct StateInfo {
    pub current: InteractionState,
    pub previous: Option<InteractionState>,
    pub session: Session,
    pub history: Vec<TransitionRecord>,
}

/// The interaction state machine: a current state, the allow-list contract
/// for moving between states, and the session data the drag machinery keys
/// off.
pub struct StateMachine {
    current: InteractionState,
    previous: Option<InteractionState>,
    session: Session,
    history: TransitionLog,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: InteractionState::Idle,
            previous: None,
            session: Session::default(),
            history: TransitionLog::default(),
        }
    }

    pub fn current(&self) -> InteractionState {
        self.current
    }

    pub fn previous(&self) -> Option<InteractionState> {
        self.previous
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn can_transition(&self, target: InteractionState) -> bool {
        self.current.allowed_targets().contains(&target)
    }

    /// Move to `target`, merging `patch` into the session. Fails without
    /// mutating anything when `target` is not reachable from the current
    /// state; the caller must abort whatever operation attempted it.
    pub fn transition(
        &mut self,
        target: InteractionState,
        patch: SessionPatch,
    ) -> Result<(), InteractionError> {
        if !self.can_transition(target) {
            return Err(InteractionError::InvalidTransition {
                from: self.current,
                to: target,
            });
        }
        let from = self.current;
        self.history.push(TransitionRecord {
            from,
            to: target,
            at: Instant::now(),
            session: self.session,
        });
        self.previous = Some(from);
        self.current = target;
        if target == InteractionState::Idle {
            self.session.clear_gesture();
        }
        patch.apply(&mut self.session);
        log::debug!("state transition {from} -> {target}");
        Ok(())
    }

    /// Force the machine back to idle with a fresh session. Always legal,
    /// idempotent.
    pub fn reset(&mut self) {
        log::debug!("state machine reset from {}", self.current);
        self.previous = Some(self.current);
        self.current = InteractionState::Idle;
        self.session = Session::default();
    }

    pub fn info(&self) -> StateInfo {
        StateInfo {
            current: self.current,
            previous: self.previous,
            session: self.session,
            history: self.history.iter().copied().collect(),
        }
    }
}
