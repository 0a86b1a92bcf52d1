use crate::core::models::ids::NucleonId;
use nalgebra::Point3;

/// The state of a nucleon and of the collection just before one recorded move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JournalEntry {
    pub nucleon: NucleonId,
    pub position: Point3<f64>,
    pub likelihood: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalState {
    #[default]
    Idle,
    Recording,
}

/// The moves that undo a journal, oldest state last.
#[derive(Debug, Clone, PartialEq)]
pub struct RevertPlan {
    /// Positions to restore, applied in order.
    pub moves: Vec<(NucleonId, Point3<f64>)>,
    /// The likelihood recorded by the oldest entry, i.e. the value at the checkpoint.
    pub likelihood: f64,
}

/// A one-level undo log of position changes.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    state: JournalState,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JournalState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == JournalState::Recording
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Discards all entries and starts recording.
    pub fn begin(&mut self) {
        self.entries.clear();
        self.state = JournalState::Recording;
    }

    /// Appends an entry if recording; otherwise does nothing.
    pub fn record(&mut self, entry: JournalEntry) {
        if self.is_recording() {
            self.entries.push(entry);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn set_state(&mut self, state: JournalState) {
        self.state = state;
    }

    /// Drains the journal into the moves that restore the checkpointed positions.
    ///
    /// Entries are consumed newest to oldest. Consecutive entries for the same nucleon
    /// collapse into one move to the oldest of them, so a nucleon moved `N` times in a row
    /// is moved back once. Returns `None` if there is nothing to undo.
    pub fn take_revert_plan(&mut self) -> Option<RevertPlan> {
        let mut moves = Vec::new();
        let mut pending: Option<JournalEntry> = None;

        while let Some(entry) = self.entries.pop() {
            if let Some(previous) = pending {
                if previous.nucleon != entry.nucleon {
                    moves.push((previous.nucleon, previous.position));
                }
            }
            pending = Some(entry);
        }

        let oldest = pending?;
        moves.push((oldest.nucleon, oldest.position));
        Some(RevertPlan {
            moves,
            likelihood: oldest.likelihood,
        })
    }
}
