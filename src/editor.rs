//! The abstract editor surface (§6).
//!
//! The history ring buffers, register bank, mark/jump/change lists, and
//! global variable table all live in the host editor, not in this crate —
//! §1 calls them out as external collaborators. This module only specifies
//! the producer/consumer interfaces the mergers in [`crate::history`],
//! [`crate::marks`], [`crate::registers`], and [`crate::variables`] need
//! against them, plus a minimal in-memory [`TestEditor`] fixture used by
//! those modules' own test suites.

use crate::record::{HistKind, MotionType};

/// One entry the editor can hand over from a history ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub text: Vec<u8>,
    /// Only meaningful for [`HistKind::Search`].
    pub sep: Option<u8>,
    pub timestamp: u64,
}

/// Read access to the editor's history rings.
pub trait HistoryProvider {
    /// Entries for one ring, oldest first. The merger consumes this lazily
    /// (§4.3's "lazy cursor"), so implementations should be cheap to
    /// partially drain.
    fn iter_history(&self, kind: HistKind) -> Box<dyn Iterator<Item = HistoryItem> + '_>;
}

/// A mark-shaped position: file + line/col + the timestamp it was last
/// touched, used for global/local marks, jumps, and changes alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkEntry {
    pub file: Vec<u8>,
    pub line: u64,
    pub col: u64,
    pub timestamp: u64,
}

/// Read access to the editor's mark tables, jump list, change lists, and
/// open buffer list.
pub trait MarksProvider {
    /// Named global marks (letters only — numbered marks '0'-'9' are never
    /// editor-owned, they are populated purely from file records and from
    /// [`MarksProvider::current_cursor`]'s promotion on write).
    fn global_marks(&self) -> Vec<(char, MarkEntry)>;
    fn local_marks(&self, file: &[u8]) -> Vec<(char, MarkEntry)>;
    fn jumplist(&self) -> Vec<MarkEntry>;
    fn changelist(&self, file: &[u8]) -> Vec<MarkEntry>;
    fn buffer_list(&self) -> Vec<Vec<u8>>;

    /// The editor's current cursor position, if it has one open. Promoted
    /// to numbered mark '0' on write (§4.8 step 11). `None` by default
    /// since most collaborators (and every record-sourced mark) have no
    /// such notion.
    fn current_cursor(&self) -> Option<MarkEntry> {
        None
    }
}

/// One candidate global variable, already filtered to the
/// shada-eligibility predicate (§4.6) by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: Vec<u8>,
    pub value: VariableValue,
}

/// A variable's value as the dumper needs to see it: either a flat byte
/// payload (string or blob) or an opaque container that might be cyclic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    Str(Vec<u8>),
    Blob(Vec<u8>),
    /// A function, partial, or other value kind the format cannot
    /// represent; always skipped by the dumper.
    Unrepresentable,
    Container(Box<dyn Reachable>),
}

impl Clone for Box<dyn Reachable> {
    fn clone(&self) -> Box<dyn Reachable> {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn Reachable> {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl Eq for Box<dyn Reachable> {}

impl std::fmt::Debug for Box<dyn Reachable> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Container(..)")
    }
}

/// A reach-check on a container-shaped variable value, per §9's
/// recommendation: a reimplementation should expose this on its variable
/// representation rather than hand-rolling mark-and-sweep here.
pub trait Reachable: std::fmt::Debug {
    /// True if this container's reference graph contains a cycle reachable
    /// from itself.
    fn has_cycle(&self) -> bool;

    /// Serializes this container to the byte blob the dumper will store
    /// in the Variable record's value field. Only called when
    /// [`Reachable::has_cycle`] returns `false`.
    fn encode(&self) -> Vec<u8>;

    fn clone_box(&self) -> Box<dyn Reachable>;
}

/// Read access to the editor's global variable table.
pub trait VariablesProvider {
    fn iter_globals(&self) -> Box<dyn Iterator<Item = VariableEntry> + '_>;
}

/// Write access back into the live editor, used by the read driver (C8)
/// to install merged/file-sourced state.
pub trait EditorSink {
    fn set_register(
        &mut self,
        name: char,
        lines: Vec<Vec<u8>>,
        motion_type: MotionType,
        block_width: Option<u64>,
    );
    fn set_mark_global(&mut self, name: char, entry: MarkEntry);
    fn set_mark_local(&mut self, file: &[u8], name: char, entry: MarkEntry);
    fn insert_jump(&mut self, entry: MarkEntry);
    fn insert_change(&mut self, file: &[u8], entry: MarkEntry);
    fn set_search_pattern(&mut self, pat: Vec<u8>, is_last_used: bool, highlighted: bool);
    fn set_substitute_pattern(&mut self, pat: Vec<u8>, is_last_used: bool, highlighted: bool);
    fn set_replacement(&mut self, text: Vec<u8>);
    fn set_global_variable(&mut self, name: Vec<u8>, value: VariableValue);
    /// Replaces one history ring wholesale with the merged result, oldest
    /// first. Used only by the read driver (C8); the write path only ever
    /// reads history via [`HistoryProvider`].
    fn set_history(&mut self, kind: HistKind, items: Vec<HistoryItem>);
}

/// A minimal in-memory editor used by this crate's own test suites. Not
/// part of the public API surface a real host would implement against,
/// though it happens to satisfy all four traits.
#[derive(Debug, Default, Clone)]
pub struct TestEditor {
    pub history: std::collections::HashMap<HistKind, Vec<HistoryItem>>,
    pub global_marks: Vec<(char, MarkEntry)>,
    pub local_marks: std::collections::HashMap<Vec<u8>, Vec<(char, MarkEntry)>>,
    pub jumplist: Vec<MarkEntry>,
    pub changelist: std::collections::HashMap<Vec<u8>, Vec<MarkEntry>>,
    pub buffers: Vec<Vec<u8>>,
    pub globals: Vec<VariableEntry>,
    pub cursor: Option<MarkEntry>,

    pub registers_set: Vec<(char, Vec<Vec<u8>>, MotionType, Option<u64>)>,
    pub replacement: Option<Vec<u8>>,
}

impl TestEditor {
    pub fn new() -> TestEditor {
        TestEditor::default()
    }

    pub fn with_history(mut self, kind: HistKind, items: Vec<HistoryItem>) -> TestEditor {
        self.history.insert(kind, items);
        self
    }
}

impl HistoryProvider for TestEditor {
    fn iter_history(&self, kind: HistKind) -> Box<dyn Iterator<Item = HistoryItem> + '_> {
        match self.history.get(&kind) {
            Some(items) => Box::new(items.iter().cloned()),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl MarksProvider for TestEditor {
    fn global_marks(&self) -> Vec<(char, MarkEntry)> {
        self.global_marks.clone()
    }

    fn local_marks(&self, file: &[u8]) -> Vec<(char, MarkEntry)> {
        self.local_marks.get(file).cloned().unwrap_or_default()
    }

    fn jumplist(&self) -> Vec<MarkEntry> {
        self.jumplist.clone()
    }

    fn changelist(&self, file: &[u8]) -> Vec<MarkEntry> {
        self.changelist.get(file).cloned().unwrap_or_default()
    }

    fn buffer_list(&self) -> Vec<Vec<u8>> {
        self.buffers.clone()
    }

    fn current_cursor(&self) -> Option<MarkEntry> {
        self.cursor.clone()
    }
}

impl VariablesProvider for TestEditor {
    fn iter_globals(&self) -> Box<dyn Iterator<Item = VariableEntry> + '_> {
        Box::new(self.globals.iter().cloned())
    }
}

impl EditorSink for TestEditor {
    fn set_register(
        &mut self,
        name: char,
        lines: Vec<Vec<u8>>,
        motion_type: MotionType,
        block_width: Option<u64>,
    ) {
        self.registers_set.push((name, lines, motion_type, block_width));
    }

    fn set_mark_global(&mut self, name: char, entry: MarkEntry) {
        self.global_marks.retain(|(n, _)| *n != name);
        self.global_marks.push((name, entry));
    }

    fn set_mark_local(&mut self, file: &[u8], name: char, entry: MarkEntry) {
        let marks = self.local_marks.entry(file.to_vec()).or_default();
        marks.retain(|(n, _)| *n != name);
        marks.push((name, entry));
    }

    fn insert_jump(&mut self, entry: MarkEntry) {
        self.jumplist.push(entry);
    }

    fn insert_change(&mut self, file: &[u8], entry: MarkEntry) {
        self.changelist.entry(file.to_vec()).or_default().push(entry);
    }

    fn set_search_pattern(&mut self, _pat: Vec<u8>, _is_last_used: bool, _highlighted: bool) {}

    fn set_substitute_pattern(&mut self, _pat: Vec<u8>, _is_last_used: bool, _highlighted: bool) {}

    fn set_replacement(&mut self, text: Vec<u8>) {
        self.replacement = Some(text);
    }

    fn set_global_variable(&mut self, name: Vec<u8>, value: VariableValue) {
        self.globals.retain(|e| e.name != name);
        self.globals.push(VariableEntry { name, value });
    }

    fn set_history(&mut self, kind: HistKind, items: Vec<HistoryItem>) {
        self.history.insert(kind, items);
    }
}
