//! The ordered list of line items and every operation allowed on it.
//!
//! An [`EntryCollection`] is the only place entries change. Each operation
//! that touches an input field runs [`calculate_row`] on the affected entry
//! before it lands back in the list, so no entry is ever stored with stale
//! `enhetspris` or `sum`.
//!
//! Entries are held behind [`Arc`]. Operations swap in a new `Arc` for the
//! entry they change and leave every other slot pointing at the same
//! allocation, so a consumer holding an earlier clone of the collection can
//! detect exactly which rows changed with [`Arc::ptr_eq`].
//!
//! Every mutating operation returns a [`Change`] so the owner can observe the
//! transition to "unsaved changes".

use std::sync::Arc;

use tracing::debug;

use crate::calculations::{calculate_row, calculate_summary};
use crate::identity::IdGenerator;
use crate::models::{DefaultSettings, EntryId, FieldUpdate, LineItem, Summary};

/// Appended to `post` on a duplicated entry.
pub const COPY_POST_SUFFIX: &str = "-kopi";

/// Appended to `beskrivelse` on a duplicated entry.
pub const COPY_DESCRIPTION_SUFFIX: &str = " (Kopi)";

/// Whether an operation altered the collection.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Modified,
    Unchanged,
}

impl Change {
    pub fn is_modified(self) -> bool {
        self == Self::Modified
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryCollection {
    entries: Vec<Arc<LineItem>>,
}

impl EntryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from loaded or imported entries, recalculating
    /// every row on the way in.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LineItem>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| Arc::new(calculate_row(entry)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> + '_ {
        self.entries.iter().map(Arc::as_ref)
    }

    /// Shared handles to the entries, for pointer-level change detection.
    pub fn handles(&self) -> &[Arc<LineItem>] {
        &self.entries
    }

    pub fn get(
        &self,
        id: &EntryId,
    ) -> Option<&LineItem> {
        self.iter().find(|entry| entry.id == *id)
    }

    pub fn position(
        &self,
        id: &EntryId,
    ) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == *id)
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn to_vec(&self) -> Vec<LineItem> {
        self.iter().cloned().collect()
    }

    pub fn summary(&self) -> Summary {
        calculate_summary(self.iter())
    }

    /// Overwrites one input field of the entry with identity `id` and
    /// recalculates that entry in place.
    ///
    /// Unknown ids and edits that leave the entry identical are no-ops.
    pub fn update_field(
        &mut self,
        id: &EntryId,
        update: FieldUpdate,
    ) -> Change {
        let Some(index) = self.position(id) else {
            debug!(entry_id = %id, "update_field: no entry with this id");
            return Change::Unchanged;
        };

        let field = update.field();
        let mut entry = LineItem::clone(&self.entries[index]);
        update.apply_to(&mut entry);
        let entry = calculate_row(entry);

        if entry == *self.entries[index] {
            return Change::Unchanged;
        }

        debug!(
            entry_id = %id,
            field = field.as_str(),
            enhetspris = %entry.enhetspris,
            sum = %entry.sum,
            "Entry updated"
        );
        self.entries[index] = Arc::new(entry);
        Change::Modified
    }

    /// Appends a new entry seeded from `defaults` and returns its id.
    pub fn add_entry(
        &mut self,
        defaults: &DefaultSettings,
        ids: &dyn IdGenerator,
    ) -> EntryId {
        let entry = calculate_row(LineItem::new(ids.next_id(), defaults));
        let id = entry.id.clone();

        debug!(entry_id = %id, position = self.entries.len(), "Entry added");
        self.entries.push(Arc::new(entry));
        id
    }

    /// Removes the entry with identity `id`.
    pub fn delete_entry(
        &mut self,
        id: &EntryId,
    ) -> Change {
        match self.position(id) {
            Some(index) => {
                self.entries.remove(index);
                debug!(entry_id = %id, position = index, "Entry deleted");
                Change::Modified
            }
            None => Change::Unchanged,
        }
    }

    /// Inserts a copy of the entry `source` directly after it and returns the
    /// copy's id.
    ///
    /// The copy gets a fresh identity and labelled `post` and `beskrivelse`.
    /// Every numeric input, and therefore the derived fields, is carried over.
    /// Returns `None` when `source` is not in the collection.
    pub fn duplicate_entry(
        &mut self,
        source: &EntryId,
        ids: &dyn IdGenerator,
    ) -> Option<EntryId> {
        let index = self.position(source)?;
        let original = &self.entries[index];

        let copy = LineItem {
            id: ids.next_id(),
            post: format!("{}{}", original.post, COPY_POST_SUFFIX),
            beskrivelse: format!("{}{}", original.beskrivelse, COPY_DESCRIPTION_SUFFIX),
            ..LineItem::clone(original)
        };
        let id = copy.id.clone();

        debug!(source_id = %source, entry_id = %id, position = index + 1, "Entry duplicated");
        self.entries.insert(index + 1, Arc::new(copy));
        Some(id)
    }

    /// Moves the entry at `start` to `end`, shifting the entries in between.
    ///
    /// Indices outside the collection, or equal indices, leave it unchanged.
    pub fn reorder(
        &mut self,
        start: usize,
        end: usize,
    ) -> Change {
        let len = self.entries.len();
        if start >= len || end >= len || start == end {
            return Change::Unchanged;
        }

        let entry = self.entries.remove(start);
        self.entries.insert(end, entry);
        debug!(from = start, to = end, "Entry moved");
        Change::Modified
    }

    /// Swaps the entry with the one above it. The first entry stays put.
    pub fn move_up(
        &mut self,
        id: &EntryId,
    ) -> Change {
        match self.position(id) {
            Some(index) if index > 0 => self.reorder(index, index - 1),
            _ => Change::Unchanged,
        }
    }

    /// Swaps the entry with the one below it. The last entry stays put.
    pub fn move_down(
        &mut self,
        id: &EntryId,
    ) -> Change {
        match self.position(id) {
            Some(index) => self.reorder(index, index + 1),
            None => Change::Unchanged,
        }
    }
}
