use super::*;

use std::io::Write as _;

use tempfile::tempdir;

use crate::editor::{MarkEntry, TestEditor};
use crate::msgpack::{self, RecordHeader, Value};
use crate::record::{HistoryEntryPayload, MarkPayload, RecordType};

fn write_record_file(path: &Path, records: &[(u64, RecordType, RecordPayload)]) {
    let mut file = std::fs::File::create(path).unwrap();
    for (timestamp, rtype, payload) in records {
        let record = Record { timestamp: *timestamp, payload: payload.clone() };
        let bytes = record.encode_payload();
        msgpack::write_header(
            &mut file,
            &RecordHeader { rtype: rtype.tag(), timestamp: *timestamp, length: bytes.len() as u64 },
        )
        .unwrap();
        file.write_all(&bytes).unwrap();
    }
}

fn mark(file: &str, line: u64, col: u64, name: Option<char>) -> MarkPayload {
    MarkPayload { file: file.as_bytes().to_vec(), line, col, name, extras: Vec::new() }
}

#[test]
fn missing_file_is_a_system_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist");
    let mut editor = TestEditor::new();
    let result = read_shada(&path, &ReadFlags::default(), &ShadaOptions::default(), &mut editor);
    assert!(matches!(result, Err(ShadaError::System(_))));
}

#[test]
fn leading_zero_type_tag_is_reported_as_not_shada() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(
        &path,
        &[(1, RecordType::Unknown(0), RecordPayload::Unknown(0, Value::Nil))],
    );

    let mut editor = TestEditor::new();
    let report = read_shada(&path, &ReadFlags::default(), &ShadaOptions::default(), &mut editor).unwrap();
    assert_eq!(report.status, ReadStatus::NotShaDa);
}

#[test]
fn global_marks_install_into_the_editor_when_requested() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(
        &path,
        &[(10, RecordType::GlobalMark, RecordPayload::GlobalMark(mark("/tmp/a.txt", 5, 2, Some('a'))))],
    );

    let mut editor = TestEditor::new();
    let flags = ReadFlags { want_marks: true, ..ReadFlags::default() };
    read_shada(&path, &flags, &ShadaOptions::default(), &mut editor).unwrap();

    assert_eq!(
        editor.global_marks,
        vec![('a', MarkEntry { file: b"/tmp/a.txt".to_vec(), line: 5, col: 2, timestamp: 10 })]
    );
}

#[test]
fn marks_are_skipped_entirely_when_want_marks_is_false() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(
        &path,
        &[(10, RecordType::GlobalMark, RecordPayload::GlobalMark(mark("/tmp/a.txt", 5, 2, Some('a'))))],
    );

    let mut editor = TestEditor::new();
    let flags = ReadFlags { want_marks: false, ..ReadFlags::default() };
    read_shada(&path, &flags, &ShadaOptions::default(), &mut editor).unwrap();
    assert!(editor.global_marks.is_empty());
}

#[test]
fn live_editor_mark_beats_an_equal_timestamp_file_mark_without_force() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(
        &path,
        &[(5, RecordType::GlobalMark, RecordPayload::GlobalMark(mark("/tmp/from-file.txt", 1, 0, Some('a'))))],
    );

    let mut editor = TestEditor::new();
    editor
        .global_marks
        .push(('a', MarkEntry { file: b"/tmp/from-editor.txt".to_vec(), line: 9, col: 0, timestamp: 5 }));

    let flags = ReadFlags { want_marks: true, force: false, ..ReadFlags::default() };
    read_shada(&path, &flags, &ShadaOptions::default(), &mut editor).unwrap();

    let (_, entry) = editor.global_marks.iter().find(|(n, _)| *n == 'a').unwrap();
    assert_eq!(entry.file, b"/tmp/from-editor.txt");
}

#[test]
fn force_flag_overrides_a_newer_editor_mark_scenario_s3() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(
        &path,
        &[(50, RecordType::GlobalMark, RecordPayload::GlobalMark(mark("/g", 7, 4, Some('A'))))],
    );

    let mut editor = TestEditor::new();
    editor
        .global_marks
        .push(('A', MarkEntry { file: b"/f".to_vec(), line: 3, col: 0, timestamp: 100 }));

    // Without force the editor's mark is strictly newer (100 > 50) and
    // naturally wins — force is what's actually under test here.
    let without_force = ReadFlags { want_marks: true, force: false, ..ReadFlags::default() };
    let mut unforced = editor.clone();
    read_shada(&path, &without_force, &ShadaOptions::default(), &mut unforced).unwrap();
    let (_, entry) = unforced.global_marks.iter().find(|(n, _)| *n == 'A').unwrap();
    assert_eq!(entry.file, b"/f");

    let with_force = ReadFlags { want_marks: true, force: true, ..ReadFlags::default() };
    read_shada(&path, &with_force, &ShadaOptions::default(), &mut editor).unwrap();
    let (_, entry) = editor.global_marks.iter().find(|(n, _)| *n == 'A').unwrap();
    assert_eq!((entry.file.clone(), entry.line, entry.col), (b"/g".to_vec(), 7, 4));
}

#[test]
fn history_entries_merge_with_the_live_ring() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(
        &path,
        &[(
            20,
            RecordType::HistoryEntry,
            RecordPayload::HistoryEntry(HistoryEntryPayload {
                hist: crate::record::HistKind::Cmd,
                text: b"from-file".to_vec(),
                sep: None,
                trailing: Vec::new(),
            }),
        )],
    );

    let mut editor = TestEditor::new().with_history(
        crate::record::HistKind::Cmd,
        vec![crate::editor::HistoryItem { text: b"from-editor".to_vec(), sep: None, timestamp: 5 }],
    );

    read_shada(&path, &ReadFlags::default(), &ShadaOptions::default(), &mut editor).unwrap();

    let merged = editor.history.get(&crate::record::HistKind::Cmd).unwrap();
    assert_eq!(merged.len(), 2);
    assert!(merged.iter().any(|i| i.text == b"from-editor"));
    assert!(merged.iter().any(|i| i.text == b"from-file"));
}

#[test]
fn malformed_record_is_skipped_and_later_records_still_install() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    let mut file = std::fs::File::create(&path).unwrap();
    // A GlobalMark payload with no "f" (file) key is structurally invalid.
    let bad_payload = Value::Map(vec![(Value::Str(b"n".to_vec()), Value::UInt(b'a' as u64))]);
    let mut bad_bytes = Vec::new();
    bad_payload.encode_to(&mut bad_bytes);
    msgpack::write_header(&mut file, &RecordHeader { rtype: RecordType::GlobalMark.tag(), timestamp: 1, length: bad_bytes.len() as u64 }).unwrap();
    file.write_all(&bad_bytes).unwrap();
    drop(file);

    // Append a good record after the bad one.
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    let good = Record {
        timestamp: 2,
        payload: RecordPayload::GlobalMark(mark("/tmp/ok.txt", 1, 0, Some('b'))),
    };
    let good_bytes = good.encode_payload();
    msgpack::write_header(&mut file, &RecordHeader { rtype: RecordType::GlobalMark.tag(), timestamp: 2, length: good_bytes.len() as u64 }).unwrap();
    file.write_all(&good_bytes).unwrap();

    let mut editor = TestEditor::new();
    let flags = ReadFlags { want_marks: true, ..ReadFlags::default() };
    let report = read_shada(&path, &flags, &ShadaOptions::default(), &mut editor).unwrap();
    assert_eq!(report.status, ReadStatus::Finished);
    assert_eq!(editor.global_marks.len(), 1);
    assert_eq!(editor.global_marks[0].0, 'b');
}

#[test]
fn get_oldfiles_reports_the_buffer_list_when_requested() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shada");
    write_record_file(&path, &[]);

    let mut editor = TestEditor::new();
    editor.buffers.push(b"/tmp/seen.txt".to_vec());

    let flags = ReadFlags { get_oldfiles: true, ..ReadFlags::default() };
    let report = read_shada(&path, &flags, &ShadaOptions::default(), &mut editor).unwrap();
    assert_eq!(report.oldfiles, vec![b"/tmp/seen.txt".to_vec()]);
}
