use super::*;
use crate::error::ErrorKind;

fn raw(ids: &[&str], cts: &[f64]) -> RawAssay {
    RawAssay::new(
        "gene",
        ids.iter()
            .zip(cts)
            .map(|(i, c)| (i.to_string(), *c))
            .collect(),
    )
}

#[test]
fn explicit_replicates_assign_generic_names() {
    let ids = ["s1", "s2", "s3", "s4", "s5", "s6"];
    let cts = [20.0, 20.1, 20.2, 25.0, 25.1, 25.2];
    let assay = Assay::new(raw(&ids, &cts), Some(&Replicates::Uniform(3))).unwrap();
    assert_eq!(assay.groups(), vec![0, 1]);
    assert_eq!(assay.names(), vec!["Group0", "Group1"]);
    assert_eq!(assay.group_sizes(), vec![3, 3]);
    assert_eq!(assay.efficiency(), 1.0);
    assert_eq!(assay.doubling_factor(), 2.0);
}

#[test]
fn identical_identifiers_become_group_names() {
    let ids = ["ctrl", "ctrl", "kd", "kd"];
    let assay = Assay::new(raw(&ids, &[1.0, 2.0, 3.0, 4.0]), None).unwrap();
    assert_eq!(assay.names(), vec!["ctrl", "kd"]);
    assert_eq!(assay.group_column(), vec![0, 0, 1, 1]);
}

#[test]
fn inference_failure_needs_explicit_replicates() {
    let ids = ["a", "b", "c"];
    let err = Assay::new(raw(&ids, &[1.0, 2.0, 3.0]), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);
}

#[test]
fn uncovered_rows_are_structural() {
    let ids = ["a", "a", "a", "b", "b"];
    let err = Assay::new(raw(&ids, &[1.0; 5]), Some(&Replicates::Uniform(3))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn rename_covers_ddct_layouts() {
    let ids = ["a", "a", "b", "b"];
    let mut assay = Assay::new(raw(&ids, &[1.0, 2.0, 3.0, 4.0]), None).unwrap();
    let column = DdCtColumn {
        normaliser: "ref".into(),
        rows: assay.rows().to_vec(),
        values: vec![1.0; 4],
    };
    assay.add_ddct(column, false).unwrap();
    assay
        .rename(&GroupNames::Positional(vec!["ctrl".into(), "kd".into()]))
        .unwrap();
    assert_eq!(assay.names(), vec!["ctrl", "kd"]);
    assert_eq!(assay.ddct("ref").unwrap().rows[3].group_name, "kd");
}

#[test]
fn duplicate_ddct_requires_overwrite() {
    let ids = ["a", "a"];
    let mut assay = Assay::new(raw(&ids, &[1.0, 2.0]), None).unwrap();
    let column = DdCtColumn {
        normaliser: "ref".into(),
        rows: assay.rows().to_vec(),
        values: vec![1.0, 2.0],
    };
    assay.add_ddct(column.clone(), false).unwrap();
    let err = assay.add_ddct(column.clone(), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(err.to_string().contains("gene_rel_ref"));
    assay.add_ddct(column, true).unwrap();
    assert_eq!(assay.ddct_columns().len(), 1);
}

#[test]
fn ignore_masks_or_drops() {
    let ids = ["a", "a", "b", "b", "c", "c"];
    let cts = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut assay = Assay::new(raw(&ids, &cts), None).unwrap();
    assay.ignore(&[1], false);
    assert!(assay.rows()[1].ct.is_nan());
    assert_eq!(assay.len(), 6);

    assay.ignore(&[2, 3], true);
    assert_eq!(assay.len(), 4);
    assert_eq!(assay.group_column(), vec![0, 0, 1, 1]);
    assert_eq!(assay.names(), vec!["a", "c"]);
    assert_eq!(assay.replicates(), Some(&Replicates::Sizes(vec![2, 2])));
}

#[test]
fn set_dct_checks_length() {
    let ids = ["a", "a"];
    let mut assay = Assay::new(raw(&ids, &[1.0, 2.0]), None).unwrap();
    assert!(!assay.has_dct());
    let err = assay.set_dct(vec![1.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assay.set_dct(vec![0.5, f64::NAN]).unwrap();
    assert!(assay.has_dct());
    let dcts = assay.dcts().unwrap();
    assert!(dcts[1].is_nan());
}

#[test]
fn display_lists_rows() {
    let ids = ["a", "a"];
    let assay = Assay::new(raw(&ids, &[1.0, f64::NAN]), None).unwrap();
    let text = assay.to_string();
    assert!(text.starts_with("Assay(id=gene, efficiency=1.0000"));
    assert!(text.contains("NaN"));
}
