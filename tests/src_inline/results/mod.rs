use super::*;
use crate::error::ErrorKind;

fn rows(groups: &[(usize, &str)]) -> Vec<Row> {
    groups
        .iter()
        .enumerate()
        .map(|(i, (g, name))| {
            let mut r = Row::new(format!("r{i}"), 20.0);
            r.group = *g;
            r.group_name = name.to_string();
            r
        })
        .collect()
}

fn table() -> Results {
    let mut results = Results::new();
    results.setup_from_rows(&rows(&[(0, "ctrl"), (0, "ctrl"), (0, "ctrl"), (1, "kd"), (1, "kd"), (1, "kd")]));
    results
        .add_column("a_rel_n", vec![1.0, 2.0, f64::NAN, 4.0, 4.0, 4.0], false)
        .unwrap();
    results
        .add_column("b_rel_n", vec![0.5, 0.5, 0.5, 0.25, 0.5, 0.75], false)
        .unwrap();
    results
}

#[test]
fn duplicate_columns_need_overwrite() {
    let mut results = table();
    let err = results.add_column("a_rel_n", vec![0.0; 6], false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    results.add_column("a_rel_n", vec![0.0; 6], true).unwrap();
    assert_eq!(results.column("a_rel_n").unwrap().values, vec![0.0; 6]);

    let err = results.add_column("group", vec![0.0; 6], true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    let err = results.add_column("short", vec![0.0; 2], false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn stats_exclude_nan_and_sort_by_assay() {
    let mut results = Results::new();
    results.setup_from_rows(&rows(&[(0, "ctrl"), (0, "ctrl"), (0, "ctrl")]));
    results.add_column("z", vec![1.0, 1.0, 1.0], false).unwrap();
    results.add_column("a", vec![1.0, 3.0, f64::NAN], false).unwrap();
    let stats = results.stats(&StatsOptions::default()).clone();
    assert_eq!(stats.rows.len(), 2);
    assert_eq!(stats.rows[0].assay, "a");
    let a = &stats.rows[0];
    assert_eq!(a.n, 2);
    assert!((a.mean - 2.0).abs() < 1e-12);
    assert!((a.stdev - 1.0).abs() < 1e-12);
    assert!((a.median - 2.0).abs() < 1e-12);
    assert!(a.ci.0 < 2.0 && a.ci.1 > 2.0);
    assert_eq!(
        stats.header(),
        vec!["group", "group_name", "assay", "n", "mean", "stdev", "median", "IQR_0.25_0.75", "CI_0.95"]
    );
}

#[test]
fn stats_are_cached_until_structural_change() {
    let mut results = table();
    let options = StatsOptions::default();
    let first = results.stats(&options).clone();
    assert!(results.stats_cached());
    let second = results.stats(&options).clone();
    assert_eq!(first.rows.len(), second.rows.len());
    for (a, b) in first.rows.iter().zip(&second.rows) {
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.stdev.to_bits(), b.stdev.to_bits());
        assert_eq!(a.ci.0.to_bits(), b.ci.0.to_bits());
    }

    results
        .rename_columns(&[("a_rel_n".to_string(), "alpha".to_string())])
        .unwrap();
    assert!(!results.stats_cached());
    let renamed = results.stats(&options).clone();
    assert!(renamed.find("alpha", "ctrl").is_some());
    assert!(renamed.find("a_rel_n", "ctrl").is_none());
}

#[test]
fn rename_rejects_unknown_and_colliding_names() {
    let mut results = table();
    let err = results
        .rename_columns(&[("missing".to_string(), "x".to_string())])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let err = results
        .rename_columns(&[("a_rel_n".to_string(), "b_rel_n".to_string())])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(results.column_names(), vec!["a_rel_n", "b_rel_n"]);
}

#[test]
fn drop_rel_and_drop_groups() {
    let mut results = table();
    results.drop_rel().unwrap();
    assert_eq!(results.column_names(), vec!["a", "b"]);

    results.drop_groups(&[GroupRef::Name("ctrl".to_string())]);
    assert_eq!(results.n_rows(), 3);
    assert_eq!(results.column("a").unwrap().values, vec![4.0, 4.0, 4.0]);
    assert!(results.group_names().iter().all(|n| n == "kd"));
}

#[test]
fn merge_joins_columns() {
    let mut left = table();
    let mut right = Results::new();
    right.setup_from_rows(&rows(&[(0, "ctrl"); 6]));
    right.add_column("c_rel_n", vec![1.0; 6], false).unwrap();
    left.merge(&right).unwrap();
    assert_eq!(left.columns().len(), 3);
    let err = left.merge(&right).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}
