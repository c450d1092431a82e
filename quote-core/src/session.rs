//! The owner of one calculator's entries while it is being edited.
//!
//! A [`CalculatorSession`] keeps three things in lockstep:
//!
//! - the [`EntryCollection`],
//! - the [`Summary`], recomputed synchronously after every change,
//! - the save state, derived by comparing the current snapshot with the
//!   snapshot last loaded or saved.
//!
//! ```text
//! load ──► Clean ──edit──► Dirty ──save──► Saving ──ok──► Clean
//!            ▲               │                 │
//!            └──edit back────┘                 └──err──► SaveFailed ──save──► Saving
//! ```

use tracing::{info, warn};

use crate::collection::{Change, EntryCollection};
use crate::db::{CalculatorRepository, RepositoryError};
use crate::identity::{IdGenerator, UuidGenerator};
use crate::models::{CalculatorSnapshot, DefaultSettings, EntryId, FieldUpdate, LineItem, Summary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaveState {
    /// Matches the last loaded or saved snapshot.
    #[default]
    Clean,
    /// Has changes that are not persisted.
    Dirty,
    /// A save is in flight.
    Saving,
    /// The last save failed; the changes are still pending.
    SaveFailed,
}

pub struct CalculatorSession {
    defaults: DefaultSettings,
    ids: Box<dyn IdGenerator>,
    entries: EntryCollection,
    summary: Summary,
    saved: CalculatorSnapshot,
    state: SaveState,
}

impl CalculatorSession {
    /// An empty session that mints UUIDs for new entries.
    pub fn new(defaults: DefaultSettings) -> Self {
        Self::with_id_generator(defaults, UuidGenerator)
    }

    pub fn with_id_generator(
        defaults: DefaultSettings,
        ids: impl IdGenerator + 'static,
    ) -> Self {
        Self {
            defaults,
            ids: Box::new(ids),
            entries: EntryCollection::new(),
            summary: Summary::default(),
            saved: CalculatorSnapshot::default(),
            state: SaveState::Clean,
        }
    }

    pub fn defaults(&self) -> &DefaultSettings {
        &self.defaults
    }

    /// New defaults apply to entries added from now on.
    pub fn set_defaults(
        &mut self,
        defaults: DefaultSettings,
    ) {
        self.defaults = defaults;
    }

    pub fn entries(&self) -> &EntryCollection {
        &self.entries
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Whether the entries or summary differ from the last loaded or saved
    /// snapshot.
    pub fn is_dirty(&self) -> bool {
        !self.matches_saved()
    }

    pub fn snapshot(&self) -> CalculatorSnapshot {
        CalculatorSnapshot {
            entries: self.entries.to_vec(),
            summary: self.summary,
        }
    }

    /// Replaces everything with a freshly loaded snapshot.
    ///
    /// Rows are recalculated and the summary rebuilt from them; the stored
    /// summary is only compared, never trusted. The result becomes the new
    /// clean baseline.
    pub fn load(
        &mut self,
        snapshot: CalculatorSnapshot,
    ) {
        let stored_summary = snapshot.summary;
        self.entries = EntryCollection::from_entries(snapshot.entries);
        self.summary = self.entries.summary();

        if self.summary != stored_summary {
            warn!(
                stored_total = %stored_summary.total_sum,
                recomputed_total = %self.summary.total_sum,
                "Stored summary differs from recomputed summary"
            );
        }

        self.saved = self.snapshot();
        self.state = SaveState::Clean;
    }

    pub fn update_field(
        &mut self,
        id: &EntryId,
        update: FieldUpdate,
    ) -> Change {
        let change = self.entries.update_field(id, update);
        self.after(change)
    }

    pub fn add_entry(&mut self) -> EntryId {
        let id = self.entries.add_entry(&self.defaults, self.ids.as_ref());
        let _ = self.after(Change::Modified);
        id
    }

    pub fn delete_entry(
        &mut self,
        id: &EntryId,
    ) -> Change {
        let change = self.entries.delete_entry(id);
        self.after(change)
    }

    pub fn duplicate_entry(
        &mut self,
        source: &EntryId,
    ) -> Option<EntryId> {
        let id = self.entries.duplicate_entry(source, self.ids.as_ref())?;
        let _ = self.after(Change::Modified);
        Some(id)
    }

    pub fn reorder(
        &mut self,
        start: usize,
        end: usize,
    ) -> Change {
        let change = self.entries.reorder(start, end);
        self.after(change)
    }

    pub fn move_up(
        &mut self,
        id: &EntryId,
    ) -> Change {
        let change = self.entries.move_up(id);
        self.after(change)
    }

    pub fn move_down(
        &mut self,
        id: &EntryId,
    ) -> Change {
        let change = self.entries.move_down(id);
        self.after(change)
    }

    /// Swaps in a whole new list of entries, as an import does. Every row is
    /// recalculated.
    pub fn replace_entries(
        &mut self,
        entries: Vec<LineItem>,
    ) -> Change {
        let replacement = EntryCollection::from_entries(entries);
        if replacement == self.entries {
            return Change::Unchanged;
        }
        self.entries = replacement;
        self.after(Change::Modified)
    }

    /// Persists the current snapshot for calculator `calculator_id`.
    ///
    /// On success the snapshot becomes the clean baseline. On failure the
    /// session stays dirty in [`SaveState::SaveFailed`] and the error is
    /// returned.
    pub async fn save(
        &mut self,
        repo: &dyn CalculatorRepository,
        calculator_id: i64,
    ) -> Result<(), RepositoryError> {
        let snapshot = self.snapshot();
        self.state = SaveState::Saving;

        match repo.save_snapshot(calculator_id, &snapshot).await {
            Ok(()) => {
                info!(
                    calculator_id,
                    entries = snapshot.entries.len(),
                    total_sum = %snapshot.summary.total_sum,
                    "Calculator saved"
                );
                self.saved = snapshot;
                self.state = SaveState::Clean;
                Ok(())
            }
            Err(err) => {
                warn!(calculator_id, error = %err, "Saving calculator failed");
                self.state = SaveState::SaveFailed;
                Err(err)
            }
        }
    }

    fn after(
        &mut self,
        change: Change,
    ) -> Change {
        if change.is_modified() {
            self.summary = self.entries.summary();
            self.state = if self.matches_saved() {
                SaveState::Clean
            } else {
                SaveState::Dirty
            };
        }
        change
    }

    fn matches_saved(&self) -> bool {
        self.summary == self.saved.summary && self.entries.iter().eq(self.saved.entries.iter())
    }
}
