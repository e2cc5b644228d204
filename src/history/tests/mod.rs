use super::*;

fn item(text: &[u8], sep: Option<u8>, timestamp: u64) -> HistoryItem {
    HistoryItem {
        text: text.to_vec(),
        sep,
        timestamp,
    }
}

#[test]
fn s1_history_merge_scenario() {
    let editor = vec![item(b"one-and-half", None, 1500)];
    let mut merger = HistoryMerger::new(HistKind::Cmd, 3, editor.into_iter());
    merger.insert_file_record(b"one".to_vec(), None, 1000);
    merger.insert_file_record(b"two".to_vec(), None, 2000);
    let ring = merger.finish();

    let texts: Vec<Vec<u8>> = ring.iter().map(|n| n.text.clone()).collect();
    assert_eq!(texts, vec![b"one".to_vec(), b"one-and-half".to_vec(), b"two".to_vec()]);
}

#[test]
fn newest_wins_merge_of_same_string() {
    let mut ring = HistoryRing::new(10);
    ring.insert(b"same".to_vec(), None, 100, HistoryOwner::File);
    ring.insert(b"same".to_vec(), None, 200, HistoryOwner::File);
    assert_eq!(ring.len(), 1);
    assert_eq!(ring.iter().next().unwrap().timestamp, 200);
}

#[test]
fn older_insert_does_not_displace_newer() {
    let mut ring = HistoryRing::new(10);
    ring.insert(b"same".to_vec(), None, 200, HistoryOwner::File);
    ring.insert(b"same".to_vec(), None, 100, HistoryOwner::File);
    assert_eq!(ring.iter().next().unwrap().timestamp, 200);
}

#[test]
fn tie_prefers_live_editor() {
    let mut ring = HistoryRing::new(10);
    ring.insert(b"same".to_vec(), None, 100, HistoryOwner::File);
    ring.insert(b"same".to_vec(), None, 100, HistoryOwner::Editor);
    assert_eq!(ring.iter().next().unwrap().owner, HistoryOwner::Editor);
}

#[test]
fn tie_keeps_existing_editor_entry_over_new_file_entry() {
    let mut ring = HistoryRing::new(10);
    ring.insert(b"same".to_vec(), None, 100, HistoryOwner::Editor);
    ring.insert(b"same".to_vec(), None, 100, HistoryOwner::File);
    assert_eq!(ring.iter().next().unwrap().owner, HistoryOwner::Editor);
}

#[test]
fn history_bound_keeps_newest_n() {
    let mut ring = HistoryRing::new(3);
    for (i, ts) in (0u32..5).zip(10u64..15) {
        ring.insert(format!("item{i}").into_bytes(), None, ts, HistoryOwner::File);
    }
    assert_eq!(ring.len(), 3);
    let timestamps: Vec<u64> = ring.iter().map(|n| n.timestamp).collect();
    assert_eq!(timestamps, vec![12, 13, 14]);
}

#[test]
fn full_ring_drops_entry_older_than_everything() {
    let mut ring = HistoryRing::new(2);
    ring.insert(b"a".to_vec(), None, 10, HistoryOwner::File);
    ring.insert(b"b".to_vec(), None, 20, HistoryOwner::File);
    ring.insert(b"older".to_vec(), None, 5, HistoryOwner::File);
    assert_eq!(ring.len(), 2);
    assert!(ring.iter().all(|n| n.text != b"older"));
}

#[test]
fn search_history_preserves_separator_char() {
    let mut ring = HistoryRing::new(5);
    ring.insert(b"pattern".to_vec(), Some(b'/'), 1, HistoryOwner::File);
    assert_eq!(ring.iter().next().unwrap().sep, Some(b'/'));
}

#[test]
fn zero_capacity_ring_drops_everything() {
    let mut ring = HistoryRing::new(0);
    ring.insert(b"x".to_vec(), None, 1, HistoryOwner::File);
    assert!(ring.is_empty());
}

#[test]
fn merger_drains_editor_entries_interleaved_by_timestamp() {
    let editor = vec![item(b"e1", None, 5), item(b"e2", None, 15), item(b"e3", None, 25)];
    let mut merger = HistoryMerger::new(HistKind::Search, 10, editor.into_iter());
    merger.insert_file_record(b"f1".to_vec(), None, 10);
    merger.insert_file_record(b"f2".to_vec(), None, 20);
    let ring = merger.finish();
    let texts: Vec<Vec<u8>> = ring.iter().map(|n| n.text.clone()).collect();
    assert_eq!(
        texts,
        vec![
            b"e1".to_vec(),
            b"f1".to_vec(),
            b"e2".to_vec(),
            b"f2".to_vec(),
            b"e3".to_vec(),
        ]
    );
}
