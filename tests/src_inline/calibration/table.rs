use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ErrorKind;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_qpcr_efftable_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn table(entries: &[(&str, f64)]) -> EfficiencyTable {
    let mut t = EfficiencyTable::new();
    for (id, eff) in entries {
        t.insert(*id, *eff);
    }
    t
}

#[test]
fn save_then_load_keeps_mapping() {
    let dir = make_temp_dir();
    for name in ["eff.csv", "eff.tsv"] {
        let path = dir.join(name);
        let original = table(&[("actb", 0.98766), ("gapdh", 1.0), ("hprt", 0.9)]);
        original.save(&path, SaveMode::Write).unwrap();
        let loaded = EfficiencyTable::from_file(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        for (id, eff) in original.iter() {
            let back = loaded.get(id).unwrap();
            assert!((back - eff).abs() <= 5e-5, "{id}: {back} vs {eff}");
        }
    }
    let text = fs::read_to_string(dir.join("eff.csv")).unwrap();
    assert!(text.starts_with("id,efficiency\n"));
    assert!(text.contains("actb,0.9877\n"));
}

#[test]
fn load_merge_respects_supersede() {
    let dir = make_temp_dir();
    let path = dir.join("incoming.csv");
    table(&[("a", 0.5), ("b", 0.6)]).save(&path, SaveMode::Write).unwrap();

    let mut kept = table(&[("a", 0.9)]);
    kept.load(&path, true, false).unwrap();
    assert_eq!(kept.get("a"), Some(0.9));
    assert_eq!(kept.get("b"), Some(0.6));

    let mut replaced = table(&[("a", 0.9)]);
    replaced.load(&path, true, true).unwrap();
    assert_eq!(replaced.get("a"), Some(0.5));

    let mut fresh = table(&[("z", 0.1)]);
    fresh.load(&path, false, false).unwrap();
    assert_eq!(fresh.get("z"), None);
    assert_eq!(fresh.len(), 2);
}

#[test]
fn append_keeps_file_entries_and_prefers_memory() {
    let dir = make_temp_dir();
    let path = dir.join("eff.csv");
    table(&[("a", 0.5), ("b", 0.6)]).save(&path, SaveMode::Write).unwrap();
    table(&[("b", 0.7), ("c", 0.8)]).save(&path, SaveMode::Append).unwrap();
    let loaded = EfficiencyTable::from_file(&path).unwrap();
    assert_eq!(loaded.get("a"), Some(0.5));
    assert_eq!(loaded.get("b"), Some(0.7));
    assert_eq!(loaded.get("c"), Some(0.8));
}

#[test]
fn merge_files_later_wins() {
    let dir = make_temp_dir();
    let first = dir.join("first.csv");
    let second = dir.join("second.tsv");
    table(&[("a", 0.5), ("b", 0.6)]).save(&first, SaveMode::Write).unwrap();
    table(&[("b", 0.9)]).save(&second, SaveMode::Write).unwrap();
    let merged = EfficiencyTable::merge_files(&[first, second]).unwrap();
    assert_eq!(merged.get("a"), Some(0.5));
    assert_eq!(merged.get("b"), Some(0.9));
}

#[test]
fn bad_value_reports_line() {
    let dir = make_temp_dir();
    let path = dir.join("bad.csv");
    fs::write(&path, "id,efficiency\na,0.5\nb,oops\n").unwrap();
    let err = EfficiencyTable::from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("line 3"));
}
