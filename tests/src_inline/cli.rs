use super::*;
use crate::error::ErrorKind;

#[test]
fn run_flags_override_defaults() {
    let cli = Cli::try_parse_from([
        "kira-qpcr",
        "-v",
        "run",
        "--assay",
        "a.csv",
        "b.csv",
        "--normaliser",
        "gapdh.csv",
        "--out",
        "out",
        "--replicates",
        "3:2,1",
        "--mode",
        "permutative",
        "--k",
        "4",
        "--replace",
        "--anchor",
        "mean",
        "--ref-group",
        "ctrl",
        "--skip-failed",
    ])
    .unwrap();
    assert_eq!(cli.verbose, 1);
    let Commands::Run(args) = cli.command else {
        panic!("expected run");
    };
    assert_eq!(args.assay.len(), 2);
    let settings = args.settings().unwrap();
    assert_eq!(settings.replicates, Some(Replicates::Sizes(vec![3, 3, 1])));
    assert_eq!(settings.mode, "permutative");
    assert_eq!(settings.k, 4);
    assert!(settings.replace);
    assert_eq!(settings.ref_group.as_deref(), Some("ctrl"));
    assert_eq!(settings.batch, BatchPolicy::Skip);
    assert!(!settings.calibration.is_enabled());
}

#[test]
fn unknown_tokens_fail_before_running() {
    let cli = Cli::try_parse_from([
        "kira-qpcr", "run", "--assay", "a.csv", "--normaliser", "n.csv", "--out", "o", "--delta",
        "cubic",
    ])
    .unwrap();
    let Commands::Run(args) = cli.command else {
        panic!("expected run");
    };
    assert_eq!(args.settings().unwrap_err().kind(), ErrorKind::Configuration);
}

#[test]
fn calibrate_and_merge_parse() {
    let cli = Cli::try_parse_from([
        "kira-qpcr", "calibrate", "--assay", "a.csv", "--out", "eff.csv", "--dilution", "2",
        "--append",
    ])
    .unwrap();
    let Commands::Calibrate(args) = cli.command else {
        panic!("expected calibrate");
    };
    assert!(args.append);
    let settings = args.setup.settings().unwrap();
    assert_eq!(settings.calibration.dilution, Some(Dilution::Step(2.0)));

    let cli = Cli::try_parse_from([
        "kira-qpcr", "efficiencies", "merge", "a.csv", "b.csv", "--out", "m.csv",
    ])
    .unwrap();
    let Commands::Efficiencies(EfficienciesArgs {
        command: EfficienciesCommand::Merge(merge),
    }) = cli.command
    else {
        panic!("expected merge");
    };
    assert_eq!(merge.tables.len(), 2);
}
