use super::*;
use crate::error::ErrorKind;

#[test]
fn step_expands_over_groups() {
    let d = Dilution::Step(2.0).per_row(&[0, 0, 1, 1, 2]).unwrap();
    assert_eq!(d, vec![1.0, 1.0, 0.5, 0.5, 0.25]);
    let d = Dilution::Step(0.1).per_row(&[0, 1]).unwrap();
    assert!((d[1] - 0.1).abs() < 1e-12);
}

#[test]
fn series_per_group_or_per_row() {
    let groups = [0, 0, 1, 1];
    let per_group = Dilution::Series(vec![1.0, 4.0]).per_row(&groups).unwrap();
    assert_eq!(per_group, vec![1.0, 1.0, 0.25, 0.25]);
    let per_row = Dilution::Series(vec![1.0, 1.0, 0.5, 0.5]).per_row(&groups).unwrap();
    assert_eq!(per_row, vec![1.0, 1.0, 0.5, 0.5]);
    let err = Dilution::Series(vec![1.0, 2.0, 3.0]).per_row(&groups).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn malformed_input_is_configuration_error() {
    assert_eq!("abc".parse::<Dilution>().unwrap_err().kind(), ErrorKind::Configuration);
    assert_eq!("0".parse::<Dilution>().unwrap_err().kind(), ErrorKind::Configuration);
    assert_eq!("2".parse::<Dilution>().unwrap(), Dilution::Step(2.0));
    assert_eq!(
        "1,2,4".parse::<Dilution>().unwrap(),
        Dilution::Series(vec![1.0, 2.0, 4.0])
    );
}

#[test]
fn group_names_carry_inverse_steps() {
    assert_eq!(dilution_from_group_name("calibrator: hela : 4").unwrap(), 0.25);
    assert_eq!(dilution_from_group_name("calibrator:hela:1").unwrap(), 1.0);
    let err = dilution_from_group_name("calibrator:hela").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);
}
