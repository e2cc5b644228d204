//! Variable dumper (C6).
//!
//! Iterates the editor's global variable table and emits a
//! [`VariablePayload`] for each survivor, per §4.6: function values and
//! partials ([`VariableValue::Unrepresentable`]) are always skipped, and a
//! container is skipped if its [`Reachable::has_cycle`] check trips.
//! `already_dumped` tracks names seen so far within one write so a caller
//! iterating multiple variable sources (e.g. the editor plus a previous
//! file) never emits the same name twice.

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use tracing::warn;

use crate::editor::{VariableEntry, VariableValue, VariablesProvider};
use crate::error::ShadaError;
use crate::record::VariablePayload;

#[derive(Debug, Default)]
pub struct VariableDumper {
    already_dumped: HashSet<Vec<u8>>,
}

impl VariableDumper {
    pub fn new() -> VariableDumper {
        VariableDumper::default()
    }

    /// True if `name` has already been dumped in this dumper's lifetime.
    pub fn already_dumped(&self, name: &[u8]) -> bool {
        self.already_dumped.contains(name)
    }

    /// Dumps every eligible variable from `provider` not already seen.
    pub fn dump(&mut self, provider: &impl VariablesProvider) -> Vec<VariablePayload> {
        let mut out = Vec::new();
        for entry in provider.iter_globals() {
            if self.already_dumped.contains(&entry.name) {
                continue;
            }
            if let Some(payload) = self.to_payload(&entry) {
                self.already_dumped.insert(entry.name.clone());
                out.push(payload);
            }
        }
        out
    }

    fn to_payload(&self, entry: &VariableEntry) -> Option<VariablePayload> {
        let (value, is_blob) = match &entry.value {
            VariableValue::Str(bytes) => (bytes.clone(), false),
            VariableValue::Blob(bytes) => (bytes.clone(), true),
            VariableValue::Unrepresentable => {
                warn!(
                    "{}",
                    ShadaError::IgnorableWrite(format!(
                        "variable {:?} has a value this format cannot represent; skipping",
                        String::from_utf8_lossy(&entry.name)
                    ))
                );
                return None;
            }
            VariableValue::Container(container) => {
                if container.has_cycle() {
                    warn!(
                        "{}",
                        ShadaError::IgnorableWrite(format!(
                            "variable {:?} contains a reference cycle; skipping",
                            String::from_utf8_lossy(&entry.name)
                        ))
                    );
                    return None;
                }
                (container.encode(), true)
            }
        };
        Some(VariablePayload {
            name: entry.name.clone(),
            value,
            is_blob,
            trailing: Vec::new(),
        })
    }
}
