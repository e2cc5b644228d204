//! Mark/jump/change merger (C4).
//!
//! Bundles four related structures, all following the newest-timestamp-wins
//! rule from §3's invariant 2, with the tie-break "editor wins on an exact
//! timestamp match" applied wherever a record competes against a live
//! editor value:
//!
//! - [`GlobalMarks`] — one slot per letter A-Z.
//! - [`NumberedMarks`] — a 10-slot digit-rotating array.
//! - [`LocalMarkTable`] — per-file named marks plus unrecognized-letter
//!   passthrough.
//! - [`PositionRing`] — the shared shape behind the jump list and each
//!   file's change list.


use std::collections::HashMap;

use crate::editor::MarkEntry;
use crate::record::MarkPayload;

/// Default jump list capacity. The original tool's build-time constant
/// could not be recovered from the filtered source pack; this mirrors the
/// long-standing default of the editor this format was distilled from.
pub const JUMPLISTSIZE: usize = 100;

/// Fixed slot count for numbered global marks ('0'-'9').
pub const NUMBERED_MARK_COUNT: usize = 10;

/// True if `new` should replace `existing` under the newest-wins rule,
/// with ties broken in favor of the live editor. Shared by every
/// entity-comparison in this module.
fn wins(new_ts: u64, new_is_editor: bool, existing_ts: u64, existing_is_editor: bool) -> bool {
    match new_ts.cmp(&existing_ts) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => new_is_editor && !existing_is_editor,
    }
}

// ------------------------------------------------------------------------------------------------
// Global named marks (A-Z)
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct GlobalMarks {
    slots: HashMap<char, (MarkEntry, bool)>,
}

impl GlobalMarks {
    pub fn new() -> GlobalMarks {
        GlobalMarks::default()
    }

    /// Offers a candidate value for mark `name`. `is_editor` marks this
    /// value as coming from the live editor rather than a file record.
    pub fn offer(&mut self, name: char, entry: MarkEntry, is_editor: bool) {
        match self.slots.get(&name) {
            Some((existing, existing_is_editor)) => {
                if wins(entry.timestamp, is_editor, existing.timestamp, *existing_is_editor) {
                    self.slots.insert(name, (entry, is_editor));
                }
            }
            None => {
                self.slots.insert(name, (entry, is_editor));
            }
        }
    }

    pub fn get(&self, name: char) -> Option<&MarkEntry> {
        self.slots.get(&name).map(|(entry, _)| entry)
    }

    /// All slots, letters ascending.
    pub fn entries(&self) -> Vec<(char, MarkEntry)> {
        let mut out: Vec<(char, MarkEntry)> = self
            .slots
            .iter()
            .map(|(name, (entry, _))| (*name, entry.clone()))
            .collect();
        out.sort_by_key(|(name, _)| *name);
        out
    }
}

// ------------------------------------------------------------------------------------------------
// Numbered global marks ('0'-'9')
// ------------------------------------------------------------------------------------------------

/// The ten numbered-mark slots, always kept sorted descending by
/// timestamp so slot 0 is the newest (§4.4).
#[derive(Debug, Clone, Default)]
pub struct NumberedMarks {
    slots: Vec<MarkEntry>,
}

impl NumberedMarks {
    pub fn new() -> NumberedMarks {
        NumberedMarks {
            slots: Vec::with_capacity(NUMBERED_MARK_COUNT),
        }
    }

    /// Inserts one candidate, shifting (and potentially evicting) existing
    /// slots. Exact duplicates (same timestamp, position, and file) are
    /// discarded rather than re-inserted.
    pub fn insert(&mut self, entry: MarkEntry) {
        let is_exact_duplicate = self.slots.iter().any(|s| {
            s.timestamp == entry.timestamp
                && s.line == entry.line
                && s.col == entry.col
                && s.file == entry.file
        });
        if is_exact_duplicate {
            return;
        }
        let pos = self
            .slots
            .iter()
            .position(|s| s.timestamp < entry.timestamp)
            .unwrap_or(self.slots.len());
        self.slots.insert(pos, entry);
        self.slots.truncate(NUMBERED_MARK_COUNT);
    }

    /// Slots paired with their digit name, `'0'` (newest) through `'9'`.
    pub fn entries(&self) -> Vec<(char, MarkEntry)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, entry)| (char::from_digit(i as u32, 10).expect("i < 10"), entry.clone()))
            .collect()
    }
}

// ------------------------------------------------------------------------------------------------
// Local marks, per file
// ------------------------------------------------------------------------------------------------

/// Per-file record: a fixed named-mark table for recognized letters
/// (`a`-`z`) plus a passthrough list for anything else (§4.4,
/// "Additional local marks").
#[derive(Debug, Clone, Default)]
pub struct FileMarks {
    named: HashMap<char, (MarkEntry, bool)>,
    additional: Vec<MarkPayload>,
    changes: PositionRing,
}

impl FileMarks {
    fn new() -> FileMarks {
        FileMarks {
            named: HashMap::new(),
            additional: Vec::new(),
            changes: PositionRing::new(JUMPLISTSIZE),
        }
    }

    pub fn greatest_timestamp(&self) -> u64 {
        let named_max = self.named.values().map(|(e, _)| e.timestamp).max().unwrap_or(0);
        let changes_max = self.changes.entries().iter().map(|e| e.timestamp).max().unwrap_or(0);
        named_max.max(changes_max)
    }

    pub fn named(&self) -> Vec<(char, MarkEntry)> {
        let mut out: Vec<(char, MarkEntry)> = self
            .named
            .iter()
            .map(|(name, (entry, _))| (*name, entry.clone()))
            .collect();
        out.sort_by_key(|(name, _)| *name);
        out
    }

    pub fn additional(&self) -> &[MarkPayload] {
        &self.additional
    }

    pub fn changes(&self) -> &PositionRing {
        &self.changes
    }
}

fn is_recognized_local_letter(c: char) -> bool {
    c.is_ascii_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct LocalMarkTable {
    files: HashMap<Vec<u8>, FileMarks>,
}

impl LocalMarkTable {
    pub fn new() -> LocalMarkTable {
        LocalMarkTable::default()
    }

    fn entry(&mut self, file: &[u8]) -> &mut FileMarks {
        self.files.entry(file.to_vec()).or_insert_with(FileMarks::new)
    }

    pub fn offer_named(&mut self, file: &[u8], name: char, mark_entry: MarkEntry, is_editor: bool) {
        if !is_recognized_local_letter(name) {
            self.entry(file).additional.push(MarkPayload {
                file: file.to_vec(),
                line: mark_entry.line,
                col: mark_entry.col,
                name: Some(name),
                extras: Vec::new(),
            });
            return;
        }
        let record = self.entry(file);
        match record.named.get(&name) {
            Some((existing, existing_is_editor)) => {
                if wins(mark_entry.timestamp, is_editor, existing.timestamp, *existing_is_editor) {
                    record.named.insert(name, (mark_entry, is_editor));
                }
            }
            None => {
                record.named.insert(name, (mark_entry, is_editor));
            }
        }
    }

    pub fn insert_change(&mut self, file: &[u8], entry: MarkEntry) {
        self.entry(file).changes.insert(entry);
    }

    pub fn file(&self, file: &[u8]) -> Option<&FileMarks> {
        self.files.get(file)
    }

    /// Files ordered by their greatest contained timestamp, descending —
    /// the order §4.4's "File ordering for emission" calls for. `limit =
    /// None` means unbounded.
    pub fn files_by_recency(&self, limit: Option<usize>) -> Vec<(&[u8], &FileMarks)> {
        let mut files: Vec<(&[u8], &FileMarks)> =
            self.files.iter().map(|(f, m)| (f.as_slice(), m)).collect();
        files.sort_by(|a, b| b.1.greatest_timestamp().cmp(&a.1.greatest_timestamp()));
        if let Some(limit) = limit {
            files.truncate(limit);
        }
        files
    }
}

// ------------------------------------------------------------------------------------------------
// Jump list / change list shared shape
// ------------------------------------------------------------------------------------------------

/// A bounded, timestamp-ascending list of positions with same-entity
/// dedup, shared by the jump list (file+position identity) and each
/// file's change list (position-only identity, since file is implicit).
#[derive(Debug, Clone)]
pub struct PositionRing {
    capacity: usize,
    entries: Vec<MarkEntry>,
}

impl Default for PositionRing {
    fn default() -> Self {
        PositionRing::new(JUMPLISTSIZE)
    }
}

impl PositionRing {
    pub fn new(capacity: usize) -> PositionRing {
        PositionRing {
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[MarkEntry] {
        &self.entries
    }

    /// Inserts one entry per §4.4's jump-list rules: the entry is placed in
    /// timestamp order, evicting the oldest entry if the ring is already
    /// full. A duplicate (file, position) is dropped outright only when it
    /// lands immediately adjacent to an identical entry already at the
    /// insertion point — matching the original's `marklist_insert`, which
    /// only ever compares against the single neighbor found while scanning
    /// for where the new entry belongs, not the whole list.
    pub fn insert(&mut self, entry: MarkEntry) {
        let mut idx = self.entries.len();
        while idx > 0 && self.entries[idx - 1].timestamp > entry.timestamp {
            idx -= 1;
        }

        let same_position = |e: &MarkEntry| {
            e.file == entry.file && e.line == entry.line && e.col == entry.col
        };
        if self.entries.get(idx).is_some_and(same_position) {
            return;
        }
        if idx > 0 && same_position(&self.entries[idx - 1]) {
            return;
        }

        if self.entries.len() >= self.capacity {
            if idx == 0 {
                return;
            }
            self.entries.remove(0);
            idx -= 1;
        }
        self.entries.insert(idx, entry);
    }
}
