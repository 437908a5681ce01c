use super::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::ErrorKind;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_qpcr_input_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn reads_headered_csv() {
    let dir = make_temp_dir();
    let path = dir.join("actb.csv");
    fs::write(&path, "Name,Ct\nctrl,20.1\nctrl,Undetermined\nkd,22.5\n").unwrap();
    let raw = read_ct_table(&path).unwrap();
    assert_eq!(raw.id, "actb");
    assert_eq!(raw.rows.len(), 3);
    assert_eq!(raw.rows[0], ("ctrl".to_string(), 20.1));
    assert!(raw.rows[1].1.is_nan());
}

#[test]
fn locates_columns_by_header() {
    let dir = make_temp_dir();
    let path = dir.join("gapdh.tsv");
    fs::write(&path, "Well\tCq\tSample\nA1\t18.5\tx\nA2\t18.7\tx\n").unwrap();
    let raw = read_ct_table(&path).unwrap();
    assert_eq!(raw.rows[1], ("x".to_string(), 18.7));
}

#[test]
fn headerless_and_semicolon_tables() {
    let dir = make_temp_dir();
    let plain = dir.join("plain.txt");
    fs::write(&plain, "a\t20\na\t21\n").unwrap();
    assert_eq!(read_ct_table(&plain).unwrap().rows.len(), 2);

    let csv2 = dir.join("csv2.csv");
    fs::write(&csv2, "Name;Ct\na;20,5\n").unwrap();
    let raw = read_ct_table(&csv2).unwrap();
    assert!((raw.rows[0].1 - 20.5).abs() < 1e-12);
}

#[test]
fn reads_gzipped_tables() {
    let dir = make_temp_dir();
    let path = dir.join("hprt.csv.gz");
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    enc.write_all(b"id,ct\ns,30.0\ns,30.2\n").unwrap();
    enc.finish().unwrap();
    let raw = read_ct_table(&path).unwrap();
    assert_eq!(raw.id, "hprt");
    assert_eq!(raw.rows.len(), 2);
}

#[test]
fn bad_ct_is_a_parse_error() {
    let dir = make_temp_dir();
    let path = dir.join("bad.csv");
    fs::write(&path, "id,ct\na,20\na,twenty\n").unwrap();
    let err = read_ct_table(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("line 3"));
}
