use egui::Pos2;

/// Where a gesture event came from. Synthetic replays are programmatically
/// constructed events fed through the same handling path as genuine input,
/// used to stitch the two legs of a handoff together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventSource {
    /// Genuine user input, with the modifier state and client coordinates
    /// read off the source event.
    Real { shift: bool, client: Pos2 },
    /// Programmatic replay carrying the best-known client coordinates.
    Synthetic { client: Option<Pos2> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Start,
    Drag,
    End,
}

/// A pointer gesture event, positioned in the owning layout's coordinate
/// frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvent {
    pub phase: GesturePhase,
    pub position: Pos2,
    /// Count of concurrently active gestures on the layout; zero once the
    /// gesture ends.
    pub active: u32,
    pub source: EventSource,
}

impl DragEvent {
    pub fn real(phase: GesturePhase, position: Pos2, shift: bool, client: Pos2) -> Self {
        let active = match phase {
            GesturePhase::Drag => 1,
            GesturePhase::Start | GesturePhase::End => 0,
        };
        Self {
            phase,
            position,
            active,
            source: EventSource::Real { shift, client },
        }
    }

    /// The synthesized gesture end that closes out the first half of a
    /// handoff.
    pub fn synthetic_end(position: Pos2, client: Pos2) -> Self {
        Self {
            phase: GesturePhase::End,
            position,
            active: 0,
            source: EventSource::Synthetic {
                client: Some(client),
            },
        }
    }

    /// The synthesized gesture start that opens the second half of a
    /// handoff.
    pub fn synthetic_start(position: Pos2, client: Pos2) -> Self {
        Self {
            phase: GesturePhase::Start,
            position,
            active: 1,
            source: EventSource::Synthetic {
                client: Some(client),
            },
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, EventSource::Synthetic { .. })
    }

    /// Modifier state from the source event; synthetic replays carry none.
    pub fn shift(&self) -> bool {
        match self.source {
            EventSource::Real { shift, .. } => shift,
            EventSource::Synthetic { .. } => false,
        }
    }

    pub fn client(&self) -> Option<Pos2> {
        match self.source {
            EventSource::Real { client, .. } => Some(client),
            EventSource::Synthetic { client } => client,
        }
    }
}
