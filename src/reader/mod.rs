//! Read driver (C8).
//!
//! Builds the same per-category merge structures [`crate::writer`] uses,
//! seeds them from the live editor's current state, streams records from
//! disk through them, then installs the merged winners back into the
//! editor via [`EditorSink`]. This mirrors §4.9's "dispatch rules mirror
//! the write-merger newest-wins rules but compare against live editor
//! state."

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, warn};

use crate::editor::{EditorSink, HistoryProvider, MarksProvider, VariablesProvider};
use crate::error::ShadaError;
use crate::history::HistoryMerger;
use crate::marks::{GlobalMarks, JUMPLISTSIZE, LocalMarkTable, NumberedMarks, PositionRing};
use crate::msgpack;
use crate::record::{HistKind, Record, RecordPayload};
use crate::registers::{RegisterBank, RegisterEntry};
use crate::writer::ShadaOptions;

/// Outcome of decoding one record or reaching the end of the stream,
/// mirroring the source's `kSDReadStatus` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Success,
    Malformed,
    NotShaDa,
    ReadError,
    Finished,
}

/// The `srni_flags` mask from §4.9: which categories the caller wants
/// installed, plus the `force` flag. `force` is an outright override, not
/// a tie-breaker: it discards the live editor's marks before merging so
/// the file's values win even when the editor's timestamp is newer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFlags {
    pub want_info: bool,
    pub want_marks: bool,
    pub get_oldfiles: bool,
    pub force: bool,
}

#[derive(Debug, Default)]
pub struct ReadReport {
    pub status: ReadStatus,
    /// Files referenced by local marks/changes — candidates for the
    /// editor's `v:oldfiles` list (§4.9).
    pub oldfiles: Vec<Vec<u8>>,
}

impl Default for ReadStatus {
    fn default() -> ReadStatus {
        ReadStatus::Finished
    }
}

/// True only for a genuine OS-level read failure — as opposed to a
/// truncated/malformed header, which `read_header` reports through the
/// same [`msgpack::CodecError`] type but which §4.9 treats as "not ShaDa"
/// rather than a read error.
fn is_os_read_failure(e: &msgpack::CodecError) -> bool {
    matches!(e, msgpack::CodecError::Io(io_err) if io_err.kind() != std::io::ErrorKind::UnexpectedEof)
}

/// Reads `path` and installs merged state into `editor`. A framing
/// violation or read failure never aborts this call outright — it stops
/// the loop early, logs the numeric-coded [`ShadaError`] that describes
/// what went wrong, and records it on [`ReadReport::status`], but whatever
/// was already merged is still installed (§4.9: "retain whatever was
/// already applied"). Only a failure to open `path` itself surfaces as an
/// `Err`.
pub fn read_shada<E>(
    path: &Path,
    flags: &ReadFlags,
    options: &ShadaOptions,
    editor: &mut E,
) -> Result<ReadReport, ShadaError>
where
    E: EditorSink + MarksProvider + HistoryProvider + VariablesProvider,
{
    let file = File::open(path).map_err(ShadaError::System)?;
    let mut reader = BufReader::new(file);

    let mut global_marks = GlobalMarks::new();
    let mut numbered_marks = NumberedMarks::new();
    let mut registers = RegisterBank::new();
    let mut jumps = PositionRing::new(JUMPLISTSIZE);
    let mut local_marks = LocalMarkTable::new();
    let mut search_pattern: Option<(crate::record::SearchPatternPayload, u64)> = None;
    let mut substitute_pattern: Option<(crate::record::SearchPatternPayload, u64)> = None;
    let mut replacement: Option<(Vec<u8>, u64)> = None;
    let mut variables: std::collections::HashMap<Vec<u8>, (crate::record::VariablePayload, u64)> =
        std::collections::HashMap::new();
    let mut oldfiles: Vec<Vec<u8>> = Vec::new();

    // `force` means the file's marks replace the editor's outright, even
    // when the editor's own timestamp is newer (§4.9: "force" is an
    // override, not a tie-breaker). The simplest way to get that behavior
    // out of the same newest-wins mergers the writer uses is to skip
    // seeding them from the editor at all when `force` is set — with
    // nothing to compete against, every file record for a given name just
    // installs.
    if flags.want_marks && !flags.force {
        for (name, entry) in editor.global_marks() {
            global_marks.offer(name, entry, true);
        }
        for entry in editor.jumplist() {
            jumps.insert(entry);
        }
        for file in editor.buffer_list() {
            for (name, entry) in editor.local_marks(&file) {
                local_marks.offer_named(&file, name, entry, true);
            }
            for entry in editor.changelist(&file) {
                local_marks.insert_change(&file, entry);
            }
        }
    }

    let mut histories: Vec<HistoryMerger<Box<dyn Iterator<Item = crate::editor::HistoryItem>>>> =
        HistKind::ALL
            .into_iter()
            .map(|kind| {
                let iter: Box<dyn Iterator<Item = crate::editor::HistoryItem>> =
                    Box::new(editor.iter_history(kind).collect::<Vec<_>>().into_iter());
                HistoryMerger::new(kind, options.history_cap(kind), iter)
            })
            .collect();

    let mut status = ReadStatus::Finished;
    let mut first = true;

    loop {
        let header = match msgpack::read_header(&mut reader) {
            Ok(Some(h)) => h,
            Ok(None) => break,
            Err(e) => {
                // A truncated header or an unrecognized tag byte is a
                // framing violation, not an OS-level read failure — a hard
                // "not ShaDa" regardless of how many records already
                // succeeded (§4.9). Only a genuine non-EOF I/O error counts
                // as a read failure.
                let err = if is_os_read_failure(&e) {
                    ShadaError::ReadError(e.to_string())
                } else {
                    ShadaError::NotShaDa(e.to_string())
                };
                warn!("{err}");
                status = if is_os_read_failure(&e) {
                    ReadStatus::ReadError
                } else {
                    ReadStatus::NotShaDa
                };
                break;
            }
        };

        if options.max_kbyte != 0 && header.length > options.max_kbyte * 1024 {
            msgpack::skip_payload(&mut reader, header.length).map_err(ShadaError::System)?;
            first = false;
            continue;
        }

        let len = match msgpack::checked_length(header.length) {
            Ok(len) => len,
            Err(e) => {
                let err = ShadaError::ReadError(e.to_string());
                warn!("{err}");
                status = ReadStatus::ReadError;
                break;
            }
        };
        let mut payload_bytes = vec![0u8; len];
        if let Err(e) = std::io::Read::read_exact(&mut reader, &mut payload_bytes) {
            // EOF partway through a payload is a framing violation (§4.9);
            // anything else is a genuine OS-level read failure.
            let is_eof = e.kind() == std::io::ErrorKind::UnexpectedEof;
            let err = if is_eof {
                ShadaError::NotShaDa(e.to_string())
            } else {
                ShadaError::ReadError(e.to_string())
            };
            warn!("{err}");
            status = if is_eof { ReadStatus::NotShaDa } else { ReadStatus::ReadError };
            break;
        }

        if first && header.rtype == 0 {
            let err = ShadaError::NotShaDa("first record has type 0".to_string());
            warn!("{err}");
            status = ReadStatus::NotShaDa;
            break;
        }
        first = false;

        let record = match Record::decode(header.rtype, header.timestamp, &payload_bytes) {
            Ok(record) => record,
            Err(e) => {
                debug!("skipping malformed record: {e}");
                continue;
            }
        };

        dispatch(
            record,
            flags,
            options,
            &mut global_marks,
            &mut numbered_marks,
            &mut registers,
            &mut jumps,
            &mut local_marks,
            &mut search_pattern,
            &mut substitute_pattern,
            &mut replacement,
            &mut variables,
            &mut histories,
            &mut oldfiles,
        );
    }

    install(
        editor,
        flags,
        global_marks,
        numbered_marks,
        registers,
        jumps,
        local_marks,
        search_pattern,
        substitute_pattern,
        replacement,
        variables,
        histories,
    );

    let oldfiles = if flags.get_oldfiles {
        for file in editor.buffer_list() {
            if !oldfiles.contains(&file) {
                oldfiles.push(file);
            }
        }
        oldfiles
    } else {
        Vec::new()
    };

    Ok(ReadReport { status, oldfiles })
}

#[allow(clippy::too_many_arguments)]
fn dispatch(
    record: Record,
    flags: &ReadFlags,
    options: &ShadaOptions,
    global_marks: &mut GlobalMarks,
    numbered_marks: &mut NumberedMarks,
    registers: &mut RegisterBank,
    jumps: &mut PositionRing,
    local_marks: &mut LocalMarkTable,
    search_pattern: &mut Option<(crate::record::SearchPatternPayload, u64)>,
    substitute_pattern: &mut Option<(crate::record::SearchPatternPayload, u64)>,
    replacement: &mut Option<(Vec<u8>, u64)>,
    variables: &mut std::collections::HashMap<Vec<u8>, (crate::record::VariablePayload, u64)>,
    histories: &mut [HistoryMerger<Box<dyn Iterator<Item = crate::editor::HistoryItem>>>],
    oldfiles: &mut Vec<Vec<u8>>,
) {
    let ts = record.timestamp;
    match record.payload {
        RecordPayload::BufferList(list) => {
            for entry in list.entries {
                if !oldfiles.contains(&entry.file) {
                    oldfiles.push(entry.file);
                }
            }
        }
        RecordPayload::HistoryEntry(entry) => {
            if let Some(merger) = histories.iter_mut().find(|m| m.kind() == entry.hist) {
                merger.insert_file_record(entry.text, entry.sep, ts);
            }
        }
        RecordPayload::GlobalMark(mark) if flags.want_marks => {
            if let Some(name) = mark.name {
                let entry = crate::editor::MarkEntry {
                    file: mark.file,
                    line: mark.line,
                    col: mark.col,
                    timestamp: ts,
                };
                if name.is_ascii_digit() {
                    numbered_marks.insert(entry);
                } else {
                    global_marks.offer(name, entry, false);
                }
            }
        }
        RecordPayload::LocalMark(mark) if flags.want_marks => {
            if !oldfiles.contains(&mark.file) {
                oldfiles.push(mark.file.clone());
            }
            if let Some(name) = mark.name {
                local_marks.offer_named(
                    &mark.file,
                    name,
                    crate::editor::MarkEntry {
                        file: mark.file.clone(),
                        line: mark.line,
                        col: mark.col,
                        timestamp: ts,
                    },
                    false,
                );
            }
        }
        RecordPayload::Jump(mark) if flags.want_marks => {
            if !oldfiles.contains(&mark.file) {
                oldfiles.push(mark.file.clone());
            }
            jumps.insert(crate::editor::MarkEntry {
                file: mark.file,
                line: mark.line,
                col: mark.col,
                timestamp: ts,
            });
        }
        RecordPayload::Change(mark) if flags.want_marks => {
            if !oldfiles.contains(&mark.file) {
                oldfiles.push(mark.file.clone());
            }
            local_marks.insert_change(
                &mark.file.clone(),
                crate::editor::MarkEntry {
                    file: mark.file,
                    line: mark.line,
                    col: mark.col,
                    timestamp: ts,
                },
            );
        }
        RecordPayload::Register(reg) => {
            // No register-read accessor exists on the editor traits, so
            // registers are never seeded from the editor here; `is_editor`
            // is always false and ties can only occur between file records.
            registers.offer(
                reg.name,
                RegisterEntry {
                    lines: reg.lines,
                    motion_type: reg.motion_type,
                    block_width: reg.block_width,
                    is_unnamed: reg.is_unnamed,
                    timestamp: ts,
                },
                false,
                options.max_reg_lines,
            );
        }
        RecordPayload::SearchPattern(pat) => {
            let slot = if !pat.is_substitute_pattern {
                search_pattern
            } else {
                substitute_pattern
            };
            let newer = slot.as_ref().map(|(_, t)| ts > *t).unwrap_or(true);
            if newer {
                *slot = Some((pat, ts));
            }
        }
        RecordPayload::SubString(sub) => {
            let newer = replacement.as_ref().map(|(_, t)| ts > *t).unwrap_or(true);
            if newer {
                *replacement = Some((sub.sub, ts));
            }
        }
        RecordPayload::Variable(var) => {
            let newer = variables.get(&var.name).map(|(_, t)| ts > *t).unwrap_or(true);
            if newer {
                variables.insert(var.name.clone(), (var, ts));
            }
        }
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn install<E>(
    editor: &mut E,
    flags: &ReadFlags,
    global_marks: GlobalMarks,
    numbered_marks: NumberedMarks,
    registers: RegisterBank,
    jumps: PositionRing,
    local_marks: LocalMarkTable,
    search_pattern: Option<(crate::record::SearchPatternPayload, u64)>,
    substitute_pattern: Option<(crate::record::SearchPatternPayload, u64)>,
    replacement: Option<(Vec<u8>, u64)>,
    variables: std::collections::HashMap<Vec<u8>, (crate::record::VariablePayload, u64)>,
    histories: Vec<HistoryMerger<Box<dyn Iterator<Item = crate::editor::HistoryItem>>>>,
) where
    E: EditorSink,
{
    if flags.want_marks {
        for (name, entry) in global_marks.entries() {
            editor.set_mark_global(name, entry);
        }
        for (name, entry) in numbered_marks.entries() {
            editor.set_mark_global(name, entry);
        }
        for entry in jumps.entries() {
            editor.insert_jump(entry.clone());
        }
        for (file, marks) in local_marks.files_by_recency(None) {
            for (name, entry) in marks.named() {
                editor.set_mark_local(file, name, entry);
            }
            for entry in marks.changes().entries() {
                editor.insert_change(file, entry.clone());
            }
        }
    }

    for (name, entry) in registers.entries() {
        editor.set_register(name, entry.lines.clone(), entry.motion_type, entry.block_width);
    }

    if let Some((pat, _)) = search_pattern {
        editor.set_search_pattern(pat.pat, pat.is_last_used, pat.highlighted);
    }
    if let Some((pat, _)) = substitute_pattern {
        editor.set_substitute_pattern(pat.pat, pat.is_last_used, pat.highlighted);
    }
    if let Some((text, _)) = replacement {
        editor.set_replacement(text);
    }

    for (name, (var, _)) in variables {
        let value = if var.is_blob {
            crate::editor::VariableValue::Blob(var.value)
        } else {
            crate::editor::VariableValue::Str(var.value)
        };
        editor.set_global_variable(name, value);
    }

    for merger in histories {
        let kind = merger.kind();
        let ring = merger.finish();
        let items: Vec<crate::editor::HistoryItem> = ring
            .into_nodes()
            .into_iter()
            .map(|node| crate::editor::HistoryItem {
                text: node.text,
                sep: node.sep,
                timestamp: node.timestamp,
            })
            .collect();
        editor.set_history(kind, items);
    }
}
