//! Register merger (C5).
//!
//! A fixed-size table indexed by [`register_index`], a bijection from
//! register name to a dense slot. Newest-wins against editor state;
//! registers whose line count exceeds the configured cap are skipped
//! entirely rather than truncated (§4.5).

#[cfg(test)]
mod tests;

use crate::record::MotionType;

/// Total number of addressable register slots: `a`-`z` (26), `0`-`9`
/// (10), and the ten special registers (`"` `-` `:` `.` `%` `#` `=` `*`
/// `+` `/`). The source's exact constant could not be recovered from the
/// filtered pack; this is sized to exactly the name set §6 and common
/// editor documentation enumerate.
pub const NUM_SAVED_REGISTERS: usize = 46;

/// Maps a register name to its slot index, or `None` if the name is not
/// an addressable register.
pub fn register_index(name: char) -> Option<usize> {
    match name {
        'a'..='z' => Some(name as usize - 'a' as usize),
        '0'..='9' => Some(26 + (name as usize - '0' as usize)),
        '"' => Some(36),
        '-' => Some(37),
        ':' => Some(38),
        '.' => Some(39),
        '%' => Some(40),
        '#' => Some(41),
        '=' => Some(42),
        '*' => Some(43),
        '+' => Some(44),
        '/' => Some(45),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    pub lines: Vec<Vec<u8>>,
    pub motion_type: MotionType,
    pub block_width: Option<u64>,
    pub is_unnamed: bool,
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct RegisterBank {
    slots: Vec<Option<(RegisterEntry, bool)>>,
}

impl Default for RegisterBank {
    fn default() -> Self {
        RegisterBank::new()
    }
}

impl RegisterBank {
    pub fn new() -> RegisterBank {
        RegisterBank {
            slots: vec![None; NUM_SAVED_REGISTERS],
        }
    }

    /// Offers a candidate value for `name`. Skipped outright (not
    /// installed at all) if its line count exceeds `max_reg_lines`, per
    /// §4.5 and scenario S2. Returns `false` if `name` is not an
    /// addressable register or the candidate was skipped for size.
    pub fn offer(&mut self, name: char, entry: RegisterEntry, is_editor: bool, max_reg_lines: Option<u64>) -> bool {
        let Some(idx) = register_index(name) else {
            return false;
        };
        if let Some(cap) = max_reg_lines {
            if entry.lines.len() as u64 > cap {
                return false;
            }
        }
        match &self.slots[idx] {
            Some((existing, existing_is_editor)) => {
                let replace = match entry.timestamp.cmp(&existing.timestamp) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => is_editor && !existing_is_editor,
                };
                if replace {
                    self.slots[idx] = Some((entry, is_editor));
                }
            }
            None => {
                self.slots[idx] = Some((entry, is_editor));
            }
        }
        true
    }

    pub fn get(&self, name: char) -> Option<&RegisterEntry> {
        let idx = register_index(name)?;
        self.slots[idx].as_ref().map(|(entry, _)| entry)
    }

    /// All installed registers, by name ascending.
    pub fn entries(&self) -> Vec<(char, &RegisterEntry)> {
        const NAMES: &str = "abcdefghijklmnopqrstuvwxyz0123456789\"-:.%#=*+/";
        let mut out = Vec::new();
        for name in NAMES.chars() {
            if let Some(entry) = self.get(name) {
                out.push((name, entry));
            }
        }
        out
    }
}
