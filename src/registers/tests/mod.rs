use super::*;

fn entry(lines: &[&str], ts: u64) -> RegisterEntry {
    RegisterEntry {
        lines: lines.iter().map(|s| s.as_bytes().to_vec()).collect(),
        motion_type: MotionType::Linewise,
        block_width: None,
        is_unnamed: false,
        timestamp: ts,
    }
}

#[test]
fn s2_register_cap_skips_installation() {
    let mut bank = RegisterBank::new();
    let installed = bank.offer('a', entry(&["x", "y", "z"], 5), false, Some(2));
    assert!(!installed);
    assert!(bank.get('a').is_none());
}

#[test]
fn register_within_cap_is_installed() {
    let mut bank = RegisterBank::new();
    let installed = bank.offer('a', entry(&["x", "y"], 5), false, Some(2));
    assert!(installed);
    assert!(bank.get('a').is_some());
}

#[test]
fn newest_wins_against_existing() {
    let mut bank = RegisterBank::new();
    bank.offer('a', entry(&["old"], 1), false, None);
    bank.offer('a', entry(&["new"], 2), false, None);
    assert_eq!(bank.get('a').unwrap().lines, vec![b"new".to_vec()]);
}

#[test]
fn tie_prefers_editor() {
    let mut bank = RegisterBank::new();
    bank.offer('a', entry(&["file"], 10), false, None);
    bank.offer('a', entry(&["editor"], 10), true, None);
    assert_eq!(bank.get('a').unwrap().lines, vec![b"editor".to_vec()]);
}

#[test]
fn unaddressable_name_is_rejected() {
    let mut bank = RegisterBank::new();
    assert!(!bank.offer('\u{0}', entry(&["x"], 1), false, None));
}

#[test]
fn register_index_covers_letters_digits_and_specials() {
    assert_eq!(register_index('a'), Some(0));
    assert_eq!(register_index('z'), Some(25));
    assert_eq!(register_index('0'), Some(26));
    assert_eq!(register_index('9'), Some(35));
    assert!(register_index('"').is_some());
    assert!(register_index('/').is_some());
    assert_eq!(register_index('!'), None);
}

#[test]
fn entries_lists_only_installed_registers() {
    let mut bank = RegisterBank::new();
    bank.offer('a', entry(&["one"], 1), false, None);
    bank.offer('z', entry(&["two"], 1), false, None);
    let names: Vec<char> = bank.entries().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!['a', 'z']);
}
