use super::*;

fn encode_decode(r: &Record) -> Record {
    let bytes = r.encode_payload();
    Record::decode(r.record_type().tag(), r.timestamp, &bytes).unwrap()
}

#[test]
fn search_pattern_omits_defaults_on_write() {
    let payload = SearchPatternPayload {
        pat: b"foo".to_vec(),
        ..SearchPatternPayload::default()
    };
    let value = payload.to_value();
    let pairs = value.as_map().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0.as_str_tag(), Some(&b"sp"[..]));
}

#[test]
fn search_pattern_roundtrips_nondefault_fields() {
    let payload = SearchPatternPayload {
        pat: b"bar".to_vec(),
        magic: false,
        smartcase: true,
        has_line_offset: true,
        place_cursor_at_end: true,
        offset: -5,
        is_last_used: false,
        is_substitute_pattern: true,
        highlighted: true,
        search_backward: true,
        extras: vec![(Value::str("zz"), Value::UInt(9))],
    };
    let record = Record {
        timestamp: 1,
        payload: RecordPayload::SearchPattern(payload.clone()),
    };
    let decoded = encode_decode(&record);
    match decoded.payload {
        RecordPayload::SearchPattern(p) => assert_eq!(p, payload),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn search_pattern_missing_required_key_is_malformed() {
    let value = Value::Map(vec![(Value::str("sm"), Value::Bool(true))]);
    assert!(SearchPatternPayload::from_value(value).is_err());
}

#[test]
fn history_entry_search_carries_sepchar() {
    let payload = HistoryEntryPayload {
        hist: HistKind::Search,
        text: b"pattern".to_vec(),
        sep: Some(b'/'),
        trailing: Vec::new(),
    };
    let record = Record {
        timestamp: 42,
        payload: RecordPayload::HistoryEntry(payload.clone()),
    };
    let decoded = encode_decode(&record);
    match decoded.payload {
        RecordPayload::HistoryEntry(p) => assert_eq!(p, payload),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn history_entry_non_search_has_no_sepchar() {
    let payload = HistoryEntryPayload {
        hist: HistKind::Cmd,
        text: b"echo hi".to_vec(),
        sep: None,
        trailing: Vec::new(),
    };
    let value = payload.to_value();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn history_entry_unknown_histtype_is_malformed() {
    let value = Value::Array(vec![Value::UInt(99), Value::Bin(b"x".to_vec())]);
    assert!(HistoryEntryPayload::from_value(value).is_err());
}

#[test]
fn register_roundtrips_with_block_width() {
    let payload = RegisterPayload {
        name: 'a',
        lines: vec![b"one".to_vec(), b"two".to_vec()],
        motion_type: MotionType::Blockwise,
        block_width: Some(4),
        is_unnamed: true,
        extras: Vec::new(),
    };
    let record = Record {
        timestamp: 7,
        payload: RecordPayload::Register(payload.clone()),
    };
    let decoded = encode_decode(&record);
    match decoded.payload {
        RecordPayload::Register(p) => assert_eq!(p, payload),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn register_default_motion_type_is_characterwise_and_omitted() {
    let payload = RegisterPayload {
        name: 'x',
        lines: vec![b"only".to_vec()],
        motion_type: MotionType::Characterwise,
        block_width: None,
        is_unnamed: false,
        extras: Vec::new(),
    };
    let value = payload.to_value();
    let pairs = value.as_map().unwrap();
    assert!(pairs.iter().all(|(k, _)| k.as_str_tag() != Some(&b"rt"[..])));
}

#[test]
fn register_empty_lines_is_malformed() {
    let value = Value::Map(vec![
        (Value::str("rc"), Value::Array(Vec::new())),
        (Value::str("n"), Value::UInt('a' as u64)),
    ]);
    assert!(RegisterPayload::from_value(value).is_err());
}

#[test]
fn register_unknown_motion_type_is_malformed() {
    let value = Value::Map(vec![
        (Value::str("rc"), Value::Array(vec![Value::Bin(b"x".to_vec())])),
        (Value::str("n"), Value::UInt('a' as u64)),
        (Value::str("rt"), Value::UInt(77)),
    ]);
    assert!(RegisterPayload::from_value(value).is_err());
}

#[test]
fn variable_roundtrips_blob_flag() {
    let payload = VariablePayload {
        name: b"g:foo".to_vec(),
        value: vec![0, 1, 2, 255],
        is_blob: true,
        trailing: Vec::new(),
    };
    let record = Record {
        timestamp: 3,
        payload: RecordPayload::Variable(payload.clone()),
    };
    let decoded = encode_decode(&record);
    match decoded.payload {
        RecordPayload::Variable(p) => assert_eq!(p, payload),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn mark_payload_requires_name_for_global_marks() {
    let value = Value::Map(vec![(Value::str("f"), Value::Bin(b"file".to_vec()))]);
    assert!(MarkPayload::from_value(value, true).is_err());
}

#[test]
fn mark_payload_forbids_name_for_jumps() {
    let value = Value::Map(vec![
        (Value::str("f"), Value::Bin(b"file".to_vec())),
        (Value::str("n"), Value::UInt('a' as u64)),
    ]);
    assert!(MarkPayload::from_value(value, false).is_err());
}

#[test]
fn mark_payload_defaults_line_and_col() {
    let value = Value::Map(vec![(Value::str("f"), Value::Bin(b"file".to_vec()))]);
    let mark = MarkPayload::from_value(value, false).unwrap();
    assert_eq!(mark.line, 1);
    assert_eq!(mark.col, 0);
}

#[test]
fn mark_payload_rejects_line_zero() {
    let value = Value::Map(vec![
        (Value::str("f"), Value::Bin(b"file".to_vec())),
        (Value::str("l"), Value::UInt(0)),
    ]);
    assert!(MarkPayload::from_value(value, false).is_err());
}

#[test]
fn buffer_list_roundtrips_multiple_entries() {
    let payload = BufferListPayload {
        entries: vec![
            MarkPayload {
                file: b"/a".to_vec(),
                line: 1,
                col: 0,
                name: None,
                extras: Vec::new(),
            },
            MarkPayload {
                file: b"/b".to_vec(),
                line: 42,
                col: 3,
                name: None,
                extras: Vec::new(),
            },
        ],
    };
    let record = Record {
        timestamp: 5,
        payload: RecordPayload::BufferList(payload.clone()),
    };
    let decoded = encode_decode(&record);
    match decoded.payload {
        RecordPayload::BufferList(p) => assert_eq!(p, payload),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn unknown_record_type_is_preserved_verbatim() {
    let value = Value::Array(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]);
    let mut bytes = Vec::new();
    value.encode_to(&mut bytes);
    let record = Record::decode(200, 99, &bytes).unwrap();
    assert!(matches!(record.record_type(), RecordType::Unknown(200)));
    let reencoded = record.encode_payload();
    assert_eq!(reencoded, bytes);
}

#[test]
fn unknown_map_keys_survive_roundtrip() {
    let value = Value::Map(vec![
        (Value::str("sp"), Value::Bin(b"x".to_vec())),
        (Value::str("totally_unknown_key"), Value::UInt(12345)),
    ]);
    let mut bytes = Vec::new();
    value.encode_to(&mut bytes);
    let record = Record::decode(RecordType::SearchPattern.tag(), 1, &bytes).unwrap();
    let reencoded = record.encode_payload();
    let (redecoded, _) = Value::decode_from(&reencoded).unwrap();
    let pairs = redecoded.as_map().unwrap();
    assert!(pairs
        .iter()
        .any(|(k, v)| k.as_str_tag() == Some(b"totally_unknown_key")
            && v.as_uint() == Some(12345)));
}

#[test]
fn payload_with_trailing_unparsed_bytes_is_malformed() {
    let mut bytes = Vec::new();
    Value::UInt(1).encode_to(&mut bytes);
    bytes.push(0xFF); // stray byte after a complete value
    assert!(Record::decode(RecordType::Header.tag(), 1, &bytes).is_err());
}
