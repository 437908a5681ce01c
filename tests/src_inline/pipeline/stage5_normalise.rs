use super::*;
use crate::error::ErrorKind;
use crate::model::replicates::Replicates;
use crate::model::row::RawAssay;

fn with_dct(id: &str, dcts: &[f64], reps: usize) -> Assay {
    let raw = RawAssay::new(
        id,
        dcts.iter()
            .enumerate()
            .map(|(i, _)| (format!("w{i}"), 20.0))
            .collect(),
    );
    let mut assay = Assay::new(raw, Some(&Replicates::Uniform(reps))).unwrap();
    assay.set_dct(dcts.to_vec()).unwrap();
    assay
}

fn pseudo(dcts: &[f64], reps: usize) -> PseudoNormaliser {
    Normaliser::new()
        .prepare(&[with_dct("gapdh", dcts, reps)])
        .unwrap()
}

#[test]
fn normalisers_are_averaged_row_wise() {
    let a = with_dct("gapdh", &[1.0, f64::NAN, 3.0, 4.0], 2);
    let b = with_dct("actb", &[3.0, 2.0, f64::NAN, 8.0], 2);
    let norm = Normaliser::new().prepare(&[a, b]).unwrap();
    assert_eq!(norm.id(), "gapdh+actb");
    assert_eq!(norm.values(), &[2.0, 2.0, 3.0, 6.0]);

    let short = with_dct("hprt", &[1.0, 1.0], 1);
    let err = Normaliser::new()
        .prepare(&[with_dct("gapdh", &[1.0, 1.0, 1.0, 1.0], 2), short])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);

    let raw = RawAssay::new("bare", vec![("w0".to_string(), 20.0)]);
    let bare = Assay::new(raw, Some(&Replicates::Uniform(1))).unwrap();
    let err = Normaliser::new().prepare(&[bare]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn pair_wise_divides_aligned_rows() {
    let sample = with_dct("target", &[1.0, 2.0, f64::NAN, 4.0], 2);
    let norm = pseudo(&[0.5, 0.5, 2.0, 2.0], 2);
    let column = Normaliser::new()
        .normalise(&sample, &norm, NormMode::PairWise)
        .unwrap();
    assert_eq!(column.normaliser, "gapdh");
    assert_eq!(column.values[0], 2.0);
    assert_eq!(column.values[1], 4.0);
    assert!(column.values[2].is_nan());
    assert_eq!(column.values[3], 2.0);
    let ids: Vec<&str> = column.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["w0", "w1", "w2", "w3"]);
}

#[test]
fn pair_wise_rejects_mismatched_lengths() {
    let sample = with_dct("target", &[1.0, 2.0, 3.0], 1);
    let norm = pseudo(&[1.0, 1.0], 1);
    let err = Normaliser::new()
        .normalise(&sample, &norm, NormMode::PairWise)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn combinatoric_yields_n_squared_rows_per_group() {
    let sample = with_dct("target", &[1.0, 2.0, 3.0, 10.0, 20.0, 30.0], 3);
    let norm = pseudo(&[1.0, 2.0, 4.0, 10.0, 10.0, 10.0], 3);
    let column = Normaliser::new()
        .normalise(&sample, &norm, NormMode::Combinatoric)
        .unwrap();
    assert_eq!(column.values.len(), 18);
    assert_eq!(column.rows.len(), 18);
    assert!(column.rows[..9].iter().all(|r| r.group == 0));
    assert!(column.rows[9..].iter().all(|r| r.group == 1));
    // tile j holds the sample block over normaliser replicate j
    assert_eq!(&column.values[..3], &[1.0, 2.0, 3.0]);
    assert_eq!(&column.values[3..6], &[0.5, 1.0, 1.5]);
    assert_eq!(&column.values[6..9], &[0.25, 0.5, 0.75]);
    assert_eq!(&column.values[9..12], &[1.0, 2.0, 3.0]);
}

#[test]
fn permutative_yields_n_times_k_rows_and_is_reproducible() {
    let sample = with_dct("target", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
    let norm = pseudo(&[1.0, 2.0, 4.0, 8.0, 16.0, 32.0], 3);
    let mode = NormMode::Permutative { k: 3, replace: false };
    let first = Normaliser::new().normalise(&sample, &norm, mode).unwrap();
    assert_eq!(first.values.len(), 18);
    assert!(first.rows[..9].iter().all(|r| r.group == 0));

    // each repetition pairs every sample replicate with a permutation of the normaliser group
    for rep in 0..3 {
        let block = &first.values[rep * 3..rep * 3 + 3];
        let mut divisors: Vec<f64> = block
            .iter()
            .zip([1.0, 2.0, 3.0])
            .map(|(v, s)| s / v)
            .collect();
        divisors.sort_by(f64::total_cmp);
        for (d, expected) in divisors.iter().zip([1.0, 2.0, 4.0]) {
            assert!((d - expected).abs() < 1e-9);
        }
    }

    let second = Normaliser::new().normalise(&sample, &norm, mode).unwrap();
    let bits = |c: &DdCtColumn| c.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn permutative_with_replacement_draws_from_the_group() {
    let sample = with_dct("target", &[1.0, 1.0, 1.0, 1.0], 4);
    let norm = pseudo(&[1.0, 2.0, 3.0, 4.0], 4);
    let mode = NormMode::Permutative { k: 5, replace: true };
    let column = Normaliser::new().with_seed(42).normalise(&sample, &norm, mode).unwrap();
    assert_eq!(column.values.len(), 20);
    for v in &column.values {
        let divisor = 1.0 / v;
        assert!([1.0, 2.0, 3.0, 4.0].iter().any(|d| (d - divisor).abs() < 1e-9));
    }

    // constant pool falls back to uniform draws
    let flat = pseudo(&[2.0, 2.0, 2.0, 2.0], 4);
    let column = Normaliser::new().normalise(&sample, &flat, mode).unwrap();
    assert!(column.values.iter().all(|v| (v - 0.5).abs() < 1e-12));
}

#[test]
fn permutative_requires_equal_group_sizes() {
    let sample = with_dct("target", &[1.0, 2.0, 3.0, 4.0], 2);
    let norm = Normaliser::new()
        .prepare(&[{
            let raw = RawAssay::new(
                "gapdh",
                (0..4).map(|i| (format!("w{i}"), 20.0)).collect(),
            );
            let mut a = Assay::new(raw, Some(&Replicates::Sizes(vec![3, 1]))).unwrap();
            a.set_dct(vec![1.0; 4]).unwrap();
            a
        }])
        .unwrap();
    let err = Normaliser::new()
        .normalise(&sample, &norm, NormMode::Permutative { k: 2, replace: false })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn nan_propagates_through_every_mode() {
    let sample = with_dct("target", &[f64::NAN, 2.0], 2);
    let norm = pseudo(&[1.0, 1.0], 2);
    for mode in [
        NormMode::PairWise,
        NormMode::Combinatoric,
        NormMode::Permutative { k: 2, replace: false },
    ] {
        let column = Normaliser::new().normalise(&sample, &norm, mode).unwrap();
        assert_eq!(column.values.iter().filter(|v| v.is_nan()).count(), column.values.len() / 2);
    }
}

#[test]
fn custom_division_is_pair_wise_only() {
    let sample = with_dct("target", &[4.0, 9.0], 1);
    let norm = pseudo(&[2.0, 3.0], 1);
    let normaliser = Normaliser::new().with_division(|s, n| s - n);
    let column = normaliser
        .normalise(&sample, &norm, NormMode::PairWise)
        .unwrap();
    assert_eq!(column.values, vec![2.0, 6.0]);
    let err = normaliser
        .normalise(&sample, &norm, NormMode::Combinatoric)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn custom_prep_replaces_the_mean() {
    let normaliser = Normaliser::new().with_prep(|assays: &[Assay]| {
        let mut first = assays[0].clone();
        first.set_id("first-only");
        Ok(first)
    });
    let norm = normaliser
        .prepare(&[
            with_dct("gapdh", &[1.0, 2.0], 1),
            with_dct("actb", &[9.0, 9.0], 1),
        ])
        .unwrap();
    assert_eq!(norm.id(), "first-only");
    assert_eq!(norm.values(), &[1.0, 2.0]);
}

#[test]
fn pipe_records_columns_and_skips_failures() {
    let norm = pseudo(&[1.0, 2.0], 1);
    let good = with_dct("target", &[2.0, 2.0], 1);
    let bad = with_dct("short", &[2.0], 1);
    let mut results = Results::new();
    let err = Normaliser::new()
        .pipe(
            vec![good.clone(), bad.clone()],
            &norm,
            NormMode::PairWise,
            BatchPolicy::Abort,
            &mut results,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);

    let mut results = Results::new();
    let outcome = Normaliser::new()
        .pipe(vec![good, bad], &norm, NormMode::PairWise, BatchPolicy::Skip, &mut results)
        .unwrap();
    assert_eq!(outcome.assays.len(), 1);
    assert!(outcome.assays[0].ddct("gapdh").is_some());
    assert_eq!(outcome.skipped[0].assay, "short");
    assert_eq!(results.column("target_rel_gapdh").unwrap().values, vec![2.0, 1.0]);
}

#[test]
fn modes_parse_from_tokens() {
    assert_eq!(NormMode::from_token("Pair-Wise", 1, false).unwrap(), NormMode::PairWise);
    assert_eq!(
        NormMode::from_token("permutative", 4, true).unwrap(),
        NormMode::Permutative { k: 4, replace: true }
    );
    let err = NormMode::from_token("bootstrap", 1, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
