//! Per-type record payloads: the typed layer on top of [`crate::msgpack::Value`].
//!
//! Each known record type (§3 of the format) is a Rust struct with a
//! `from_value`/`to_value` pair. Decoding never panics: a structural
//! mismatch, a missing required key, or an out-of-range field produces
//! [`MalformedError`], which the read driver turns into "skip this record,
//! keep going" (§4.2's decoding discipline).
//!
//! Unknown map keys and unknown trailing array elements are preserved
//! verbatim as `Value`s in each payload's `extras`/`trailing` field and
//! re-emitted after the known fields on write — this is what gives the
//! format its forward/backward compatibility guarantee.

#[cfg(test)]
mod tests;

use crate::msgpack::Value;

/// Numeric type tags from §3. `Unknown` carries through any tag outside the
/// range this crate understands so the record can be preserved verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordType {
    Header,
    SearchPattern,
    SubString,
    HistoryEntry,
    Register,
    Variable,
    GlobalMark,
    Jump,
    BufferList,
    LocalMark,
    Change,
    Unknown(u64),
}

impl RecordType {
    pub fn from_tag(tag: u64) -> RecordType {
        match tag {
            1 => RecordType::Header,
            2 => RecordType::SearchPattern,
            3 => RecordType::SubString,
            4 => RecordType::HistoryEntry,
            5 => RecordType::Register,
            6 => RecordType::Variable,
            7 => RecordType::GlobalMark,
            8 => RecordType::Jump,
            9 => RecordType::BufferList,
            10 => RecordType::LocalMark,
            11 => RecordType::Change,
            other => RecordType::Unknown(other),
        }
    }

    pub fn tag(self) -> u64 {
        match self {
            RecordType::Header => 1,
            RecordType::SearchPattern => 2,
            RecordType::SubString => 3,
            RecordType::HistoryEntry => 4,
            RecordType::Register => 5,
            RecordType::Variable => 6,
            RecordType::GlobalMark => 7,
            RecordType::Jump => 8,
            RecordType::BufferList => 9,
            RecordType::LocalMark => 10,
            RecordType::Change => 11,
            RecordType::Unknown(tag) => tag,
        }
    }
}

/// History ring kind, matching the original tool's `HIST_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HistKind {
    Cmd,
    Search,
    Expr,
    Input,
    Debug,
}

impl HistKind {
    pub const ALL: [HistKind; 5] = [
        HistKind::Cmd,
        HistKind::Search,
        HistKind::Expr,
        HistKind::Input,
        HistKind::Debug,
    ];

    fn from_tag(tag: u64) -> Option<HistKind> {
        match tag {
            0 => Some(HistKind::Cmd),
            1 => Some(HistKind::Search),
            2 => Some(HistKind::Expr),
            3 => Some(HistKind::Input),
            4 => Some(HistKind::Debug),
            _ => None,
        }
    }

    fn tag(self) -> u64 {
        match self {
            HistKind::Cmd => 0,
            HistKind::Search => 1,
            HistKind::Expr => 2,
            HistKind::Input => 3,
            HistKind::Debug => 4,
        }
    }
}

/// A record-level decoding failure. Never propagates past the record it
/// names — see §4.2's "decoding discipline".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedError(pub String);

impl std::fmt::Display for MalformedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed record: {}", self.0)
    }
}

fn malformed(msg: impl Into<String>) -> MalformedError {
    MalformedError(msg.into())
}

// ------------------------------------------------------------------------------------------------
// Map helper: pulls known keys out of a Value::Map, collecting the rest as extras.
// ------------------------------------------------------------------------------------------------

struct MapCursor {
    pairs: Vec<(Value, Value)>,
}

impl MapCursor {
    fn from_value(value: Value) -> Result<MapCursor, MalformedError> {
        match value {
            Value::Map(pairs) => Ok(MapCursor { pairs }),
            _ => Err(malformed("expected a map payload")),
        }
    }

    /// Removes and returns the value for `key`, if present.
    fn take(&mut self, key: &str) -> Option<Value> {
        let idx = self
            .pairs
            .iter()
            .position(|(k, _)| k.as_str_tag() == Some(key.as_bytes()))?;
        Some(self.pairs.remove(idx).1)
    }

    /// Whatever keys remain after all known ones have been `take`n.
    fn into_extras(self) -> Vec<(Value, Value)> {
        self.pairs
    }
}

fn encode_extras(extras: &[(Value, Value)], pairs: &mut Vec<(Value, Value)>) {
    for (k, v) in extras {
        pairs.push((k.clone(), v.clone()));
    }
}

// ------------------------------------------------------------------------------------------------
// Header
// ------------------------------------------------------------------------------------------------

/// Informational and never consumed on read (§3); carried through verbatim
/// so a write can still emit a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderPayload {
    pub fields: Vec<(Value, Value)>,
}

impl HeaderPayload {
    pub fn generator(generator: &str, version: &str, max_kbyte: u64, pid: u64) -> HeaderPayload {
        HeaderPayload {
            fields: vec![
                (Value::str("generator"), Value::str(generator)),
                (Value::str("version"), Value::str(version)),
                (Value::str("max_kbyte"), Value::UInt(max_kbyte)),
                (Value::str("pid"), Value::UInt(pid)),
                (Value::str("encoding"), Value::str("utf-8")),
            ],
        }
    }

    fn from_value(value: Value) -> Result<HeaderPayload, MalformedError> {
        match value {
            Value::Map(fields) => Ok(HeaderPayload { fields }),
            _ => Err(malformed("header payload must be a map")),
        }
    }

    fn to_value(&self) -> Value {
        Value::Map(self.fields.clone())
    }
}

// ------------------------------------------------------------------------------------------------
// SearchPattern
// ------------------------------------------------------------------------------------------------

/// Defaults from §6; any key matching its default is omitted on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPatternPayload {
    pub pat: Vec<u8>,
    pub magic: bool,
    pub smartcase: bool,
    pub has_line_offset: bool,
    pub place_cursor_at_end: bool,
    pub offset: i64,
    pub is_last_used: bool,
    pub is_substitute_pattern: bool,
    pub highlighted: bool,
    pub search_backward: bool,
    pub extras: Vec<(Value, Value)>,
}

impl Default for SearchPatternPayload {
    fn default() -> Self {
        SearchPatternPayload {
            pat: Vec::new(),
            magic: true,
            smartcase: false,
            has_line_offset: false,
            place_cursor_at_end: false,
            offset: 0,
            is_last_used: true,
            is_substitute_pattern: false,
            highlighted: false,
            search_backward: false,
            extras: Vec::new(),
        }
    }
}

impl SearchPatternPayload {
    fn from_value(value: Value) -> Result<SearchPatternPayload, MalformedError> {
        let mut cursor = MapCursor::from_value(value)?;
        let pat = cursor
            .take("sp")
            .and_then(Value::into_bin)
            .ok_or_else(|| malformed("SearchPattern missing required key 'sp'"))?;
        let mut payload = SearchPatternPayload {
            pat,
            ..SearchPatternPayload::default()
        };
        if let Some(v) = cursor.take("sm") {
            payload.magic = v.as_bool().ok_or_else(|| malformed("'sm' must be bool"))?;
        }
        if let Some(v) = cursor.take("sc") {
            payload.smartcase = v.as_bool().ok_or_else(|| malformed("'sc' must be bool"))?;
        }
        if let Some(v) = cursor.take("sl") {
            payload.has_line_offset =
                v.as_bool().ok_or_else(|| malformed("'sl' must be bool"))?;
        }
        if let Some(v) = cursor.take("se") {
            payload.place_cursor_at_end =
                v.as_bool().ok_or_else(|| malformed("'se' must be bool"))?;
        }
        if let Some(v) = cursor.take("so") {
            payload.offset = v.as_int().ok_or_else(|| malformed("'so' must be int"))?;
        }
        if let Some(v) = cursor.take("su") {
            payload.is_last_used = v.as_bool().ok_or_else(|| malformed("'su' must be bool"))?;
        }
        if let Some(v) = cursor.take("ss") {
            payload.is_substitute_pattern =
                v.as_bool().ok_or_else(|| malformed("'ss' must be bool"))?;
        }
        if let Some(v) = cursor.take("sh") {
            payload.highlighted = v.as_bool().ok_or_else(|| malformed("'sh' must be bool"))?;
        }
        if let Some(v) = cursor.take("sb") {
            payload.search_backward =
                v.as_bool().ok_or_else(|| malformed("'sb' must be bool"))?;
        }
        payload.extras = cursor.into_extras();
        Ok(payload)
    }

    fn to_value(&self) -> Value {
        let defaults = SearchPatternPayload::default();
        let mut pairs = vec![(Value::str("sp"), Value::Bin(self.pat.clone()))];
        if self.magic != defaults.magic {
            pairs.push((Value::str("sm"), Value::Bool(self.magic)));
        }
        if self.smartcase != defaults.smartcase {
            pairs.push((Value::str("sc"), Value::Bool(self.smartcase)));
        }
        if self.has_line_offset != defaults.has_line_offset {
            pairs.push((Value::str("sl"), Value::Bool(self.has_line_offset)));
        }
        if self.place_cursor_at_end != defaults.place_cursor_at_end {
            pairs.push((Value::str("se"), Value::Bool(self.place_cursor_at_end)));
        }
        if self.offset != defaults.offset {
            pairs.push((Value::str("so"), Value::Int(self.offset)));
        }
        if self.is_last_used != defaults.is_last_used {
            pairs.push((Value::str("su"), Value::Bool(self.is_last_used)));
        }
        if self.is_substitute_pattern != defaults.is_substitute_pattern {
            pairs.push((
                Value::str("ss"),
                Value::Bool(self.is_substitute_pattern),
            ));
        }
        if self.highlighted != defaults.highlighted {
            pairs.push((Value::str("sh"), Value::Bool(self.highlighted)));
        }
        if self.search_backward != defaults.search_backward {
            pairs.push((Value::str("sb"), Value::Bool(self.search_backward)));
        }
        encode_extras(&self.extras, &mut pairs);
        Value::Map(pairs)
    }
}

// ------------------------------------------------------------------------------------------------
// SubString
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStringPayload {
    pub sub: Vec<u8>,
    pub trailing: Vec<Value>,
}

impl SubStringPayload {
    fn from_value(value: Value) -> Result<SubStringPayload, MalformedError> {
        let mut items = value
            .into_array()
            .ok_or_else(|| malformed("SubString payload must be an array"))?;
        if items.is_empty() {
            return Err(malformed("SubString payload must have at least 1 element"));
        }
        let trailing = items.split_off(1);
        let sub = items
            .remove(0)
            .into_bin()
            .ok_or_else(|| malformed("SubString[0] must be bin/str"))?;
        Ok(SubStringPayload { sub, trailing })
    }

    fn to_value(&self) -> Value {
        let mut items = vec![Value::Bin(self.sub.clone())];
        items.extend(self.trailing.iter().cloned());
        Value::Array(items)
    }
}

// ------------------------------------------------------------------------------------------------
// HistoryEntry
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntryPayload {
    pub hist: HistKind,
    pub text: Vec<u8>,
    pub sep: Option<u8>,
    pub trailing: Vec<Value>,
}

impl HistoryEntryPayload {
    fn from_value(value: Value) -> Result<HistoryEntryPayload, MalformedError> {
        let mut items = value
            .into_array()
            .ok_or_else(|| malformed("HistoryEntry payload must be an array"))?;
        if items.len() < 2 {
            return Err(malformed("HistoryEntry payload needs at least 2 elements"));
        }
        let histtype = items[0]
            .as_uint()
            .and_then(HistKind::from_tag)
            .ok_or_else(|| malformed("HistoryEntry[0] is not a known histtype"))?;
        let text = items[1]
            .clone()
            .into_bin()
            .ok_or_else(|| malformed("HistoryEntry[1] must be bin/str"))?;

        let (sep, rest_start) = if histtype == HistKind::Search && items.len() >= 3 {
            let sep_val = items[2]
                .as_uint()
                .ok_or_else(|| malformed("HistoryEntry[2] sepchar must be an integer"))?;
            (Some(sep_val as u8), 3)
        } else {
            (None, 2)
        };
        let trailing = items.split_off(rest_start);
        Ok(HistoryEntryPayload {
            hist: histtype,
            text,
            sep,
            trailing,
        })
    }

    fn to_value(&self) -> Value {
        let mut items = vec![Value::UInt(self.hist.tag()), Value::Bin(self.text.clone())];
        if self.hist == HistKind::Search {
            if let Some(sep) = self.sep {
                items.push(Value::UInt(sep as u64));
            }
        }
        items.extend(self.trailing.iter().cloned());
        Value::Array(items)
    }
}

// ------------------------------------------------------------------------------------------------
// Register
// ------------------------------------------------------------------------------------------------

/// Motion type of a register's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    Characterwise,
    Linewise,
    Blockwise,
}

impl MotionType {
    fn from_tag(tag: u64) -> Option<MotionType> {
        match tag {
            0 => Some(MotionType::Characterwise),
            1 => Some(MotionType::Linewise),
            2 => Some(MotionType::Blockwise),
            _ => None,
        }
    }

    fn tag(self) -> u64 {
        match self {
            MotionType::Characterwise => 0,
            MotionType::Linewise => 1,
            MotionType::Blockwise => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPayload {
    pub name: char,
    pub lines: Vec<Vec<u8>>,
    pub motion_type: MotionType,
    pub block_width: Option<u64>,
    pub is_unnamed: bool,
    pub extras: Vec<(Value, Value)>,
}

impl RegisterPayload {
    fn from_value(value: Value) -> Result<RegisterPayload, MalformedError> {
        let mut cursor = MapCursor::from_value(value)?;
        let rc = cursor
            .take("rc")
            .and_then(Value::into_array)
            .ok_or_else(|| malformed("Register missing required key 'rc'"))?;
        if rc.is_empty() {
            return Err(malformed("Register 'rc' must be non-empty"));
        }
        let mut lines = Vec::with_capacity(rc.len());
        for item in rc {
            lines.push(
                item.into_bin()
                    .ok_or_else(|| malformed("Register 'rc' entries must be bin/str"))?,
            );
        }
        let name = cursor
            .take("n")
            .and_then(|v| v.as_uint())
            .and_then(|v| char::from_u32(v as u32))
            .ok_or_else(|| malformed("Register missing required key 'n'"))?;
        let motion_type = match cursor.take("rt") {
            Some(v) => MotionType::from_tag(
                v.as_uint()
                    .ok_or_else(|| malformed("'rt' must be an integer"))?,
            )
            .ok_or_else(|| malformed("unknown register motion type"))?,
            None => MotionType::Characterwise,
        };
        let block_width = match cursor.take("rw") {
            Some(v) => Some(v.as_uint().ok_or_else(|| malformed("'rw' must be uint"))?),
            None => None,
        };
        let is_unnamed = match cursor.take("ru") {
            Some(v) => v.as_bool().ok_or_else(|| malformed("'ru' must be bool"))?,
            None => false,
        };
        Ok(RegisterPayload {
            name,
            lines,
            motion_type,
            block_width,
            is_unnamed,
            extras: cursor.into_extras(),
        })
    }

    fn to_value(&self) -> Value {
        let mut pairs = vec![(
            Value::str("rc"),
            Value::Array(self.lines.iter().cloned().map(Value::Bin).collect()),
        )];
        pairs.push((Value::str("n"), Value::UInt(self.name as u64)));
        if !matches!(self.motion_type, MotionType::Characterwise) {
            pairs.push((Value::str("rt"), Value::UInt(self.motion_type.tag())));
        }
        if let Some(width) = self.block_width {
            pairs.push((Value::str("rw"), Value::UInt(width)));
        }
        if self.is_unnamed {
            pairs.push((Value::str("ru"), Value::Bool(true)));
        }
        encode_extras(&self.extras, &mut pairs);
        Value::Map(pairs)
    }
}

// ------------------------------------------------------------------------------------------------
// Variable
// ------------------------------------------------------------------------------------------------

/// Trailing array element tag that marks a Variable's value as a byte blob
/// rather than a text string (§3) — both are encoded identically as
/// MessagePack `bin` on the wire.
pub const VAR_TYPE_BLOB: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePayload {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub is_blob: bool,
    pub trailing: Vec<Value>,
}

impl VariablePayload {
    fn from_value(value: Value) -> Result<VariablePayload, MalformedError> {
        let mut items = value
            .into_array()
            .ok_or_else(|| malformed("Variable payload must be an array"))?;
        if items.len() < 2 {
            return Err(malformed("Variable payload needs at least 2 elements"));
        }
        let is_blob = items
            .get(2)
            .and_then(|v| v.as_uint())
            .map(|tag| tag == VAR_TYPE_BLOB)
            .unwrap_or(false);
        let trailing_start = if items.len() >= 3 && is_blob { 3 } else { 2 };
        let trailing = items.split_off(trailing_start.min(items.len()));
        let value_bytes = items
            .remove(1)
            .into_bin()
            .ok_or_else(|| malformed("Variable[1] must be bin/str"))?;
        let name = items
            .remove(0)
            .into_bin()
            .ok_or_else(|| malformed("Variable[0] must be bin/str"))?;
        Ok(VariablePayload {
            name,
            value: value_bytes,
            is_blob,
            trailing,
        })
    }

    fn to_value(&self) -> Value {
        let mut items = vec![
            Value::Bin(self.name.clone()),
            Value::Bin(self.value.clone()),
        ];
        if self.is_blob {
            items.push(Value::UInt(VAR_TYPE_BLOB));
        }
        items.extend(self.trailing.iter().cloned());
        Value::Array(items)
    }
}

// ------------------------------------------------------------------------------------------------
// Mark-shaped payloads: GlobalMark / LocalMark / Jump / Change
// ------------------------------------------------------------------------------------------------

/// Shared shape behind GlobalMark, LocalMark, Jump, and Change records
/// (§3). `name` is required for marks and forbidden for Jump/Change; that
/// distinction is enforced by the caller, not by this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkPayload {
    pub file: Vec<u8>,
    pub line: u64,
    pub col: u64,
    pub name: Option<char>,
    pub extras: Vec<(Value, Value)>,
}

impl MarkPayload {
    fn from_value(value: Value, name_allowed: bool) -> Result<MarkPayload, MalformedError> {
        let mut cursor = MapCursor::from_value(value)?;
        let file = cursor
            .take("f")
            .and_then(Value::into_bin)
            .ok_or_else(|| malformed("mark missing required key 'f'"))?;
        let line = match cursor.take("l") {
            Some(v) => v.as_uint().ok_or_else(|| malformed("'l' must be uint"))?,
            None => 1,
        };
        if line < 1 {
            return Err(malformed("mark line must be >= 1"));
        }
        let col = match cursor.take("c") {
            Some(v) => v.as_uint().ok_or_else(|| malformed("'c' must be uint"))?,
            None => 0,
        };
        let name = match cursor.take("n") {
            Some(v) => {
                if !name_allowed {
                    return Err(malformed("'n' is forbidden for this record type"));
                }
                Some(
                    v.as_uint()
                        .and_then(|v| char::from_u32(v as u32))
                        .ok_or_else(|| malformed("'n' must be a character"))?,
                )
            }
            None => {
                if name_allowed {
                    return Err(malformed("mark missing required key 'n'"));
                }
                None
            }
        };
        Ok(MarkPayload {
            file,
            line,
            col,
            name,
            extras: cursor.into_extras(),
        })
    }

    fn to_value(&self) -> Value {
        let mut pairs = vec![(Value::str("f"), Value::Bin(self.file.clone()))];
        if self.line != 1 {
            pairs.push((Value::str("l"), Value::UInt(self.line)));
        }
        if self.col != 0 {
            pairs.push((Value::str("c"), Value::UInt(self.col)));
        }
        if let Some(name) = self.name {
            pairs.push((Value::str("n"), Value::UInt(name as u64)));
        }
        encode_extras(&self.extras, &mut pairs);
        Value::Map(pairs)
    }
}

// ------------------------------------------------------------------------------------------------
// BufferList
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferListPayload {
    pub entries: Vec<MarkPayload>,
}

impl BufferListPayload {
    fn from_value(value: Value) -> Result<BufferListPayload, MalformedError> {
        let items = value
            .into_array()
            .ok_or_else(|| malformed("BufferList payload must be an array"))?;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            entries.push(MarkPayload::from_value(item, false)?);
        }
        Ok(BufferListPayload { entries })
    }

    fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().map(MarkPayload::to_value).collect())
    }
}

// ------------------------------------------------------------------------------------------------
// Record — the top-level decoded unit
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    Header(HeaderPayload),
    SearchPattern(SearchPatternPayload),
    SubString(SubStringPayload),
    HistoryEntry(HistoryEntryPayload),
    Register(RegisterPayload),
    Variable(VariablePayload),
    GlobalMark(MarkPayload),
    Jump(MarkPayload),
    BufferList(BufferListPayload),
    LocalMark(MarkPayload),
    Change(MarkPayload),
    /// A record of a type this crate does not interpret. Carries the raw
    /// type tag alongside the decoded value so both can be re-emitted
    /// byte-for-byte.
    Unknown(u64, Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: u64,
    pub payload: RecordPayload,
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match &self.payload {
            RecordPayload::Header(_) => RecordType::Header,
            RecordPayload::SearchPattern(_) => RecordType::SearchPattern,
            RecordPayload::SubString(_) => RecordType::SubString,
            RecordPayload::HistoryEntry(_) => RecordType::HistoryEntry,
            RecordPayload::Register(_) => RecordType::Register,
            RecordPayload::Variable(_) => RecordType::Variable,
            RecordPayload::GlobalMark(_) => RecordType::GlobalMark,
            RecordPayload::Jump(_) => RecordType::Jump,
            RecordPayload::BufferList(_) => RecordType::BufferList,
            RecordPayload::LocalMark(_) => RecordType::LocalMark,
            RecordPayload::Change(_) => RecordType::Change,
            RecordPayload::Unknown(tag, _) => RecordType::Unknown(*tag),
        }
    }

    /// Decodes a record's payload bytes given its type tag.
    ///
    /// `rtype` must be the raw tag so that an out-of-range/unknown type can
    /// still be wrapped as [`RecordPayload::Unknown`] for verbatim re-emit,
    /// per §4.2's "wrapped as-is" rule for unknown-type records.
    pub fn decode(
        rtype: u64,
        timestamp: u64,
        payload_bytes: &[u8],
    ) -> Result<Record, MalformedError> {
        let (value, consumed) = Value::decode_from(payload_bytes)
            .map_err(|e| malformed(format!("payload did not parse: {e}")))?;
        if consumed != payload_bytes.len() {
            return Err(malformed("payload has trailing unparsed bytes"));
        }
        let payload = match RecordType::from_tag(rtype) {
            RecordType::Header => RecordPayload::Header(HeaderPayload::from_value(value)?),
            RecordType::SearchPattern => {
                RecordPayload::SearchPattern(SearchPatternPayload::from_value(value)?)
            }
            RecordType::SubString => RecordPayload::SubString(SubStringPayload::from_value(value)?),
            RecordType::HistoryEntry => {
                RecordPayload::HistoryEntry(HistoryEntryPayload::from_value(value)?)
            }
            RecordType::Register => RecordPayload::Register(RegisterPayload::from_value(value)?),
            RecordType::Variable => RecordPayload::Variable(VariablePayload::from_value(value)?),
            RecordType::GlobalMark => {
                RecordPayload::GlobalMark(MarkPayload::from_value(value, true)?)
            }
            RecordType::Jump => RecordPayload::Jump(MarkPayload::from_value(value, false)?),
            RecordType::BufferList => {
                RecordPayload::BufferList(BufferListPayload::from_value(value)?)
            }
            RecordType::LocalMark => {
                RecordPayload::LocalMark(MarkPayload::from_value(value, true)?)
            }
            RecordType::Change => RecordPayload::Change(MarkPayload::from_value(value, false)?),
            RecordType::Unknown(_) => RecordPayload::Unknown(rtype, value),
        };
        Ok(Record { timestamp, payload })
    }

    /// Encodes this record's payload back to bytes (not including the
    /// outer `[type][timestamp][length]` header — see [`crate::msgpack`]).
    pub fn encode_payload(&self) -> Vec<u8> {
        let value = match &self.payload {
            RecordPayload::Header(p) => p.to_value(),
            RecordPayload::SearchPattern(p) => p.to_value(),
            RecordPayload::SubString(p) => p.to_value(),
            RecordPayload::HistoryEntry(p) => p.to_value(),
            RecordPayload::Register(p) => p.to_value(),
            RecordPayload::Variable(p) => p.to_value(),
            RecordPayload::GlobalMark(p) => p.to_value(),
            RecordPayload::Jump(p) => p.to_value(),
            RecordPayload::BufferList(p) => p.to_value(),
            RecordPayload::LocalMark(p) => p.to_value(),
            RecordPayload::Change(p) => p.to_value(),
            RecordPayload::Unknown(_, v) => v.clone(),
        };
        let mut buf = Vec::new();
        value.encode_to(&mut buf);
        buf
    }
}
