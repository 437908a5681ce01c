use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::calibration::Calibrator;
use crate::error::Result;
use crate::math::format_f64_6;
use crate::pipeline::stage2_filter::FilterReport;
use crate::report::{format_ci, format_indices};
use crate::results::Results;
use crate::results::stats::StatsTable;

/// One row per replicate: setup columns then every value column in insertion order.
pub fn write_results_tsv(results: &Results, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let mut header = String::from("id\tgroup\tgroup_name");
    for column in results.columns() {
        header.push('\t');
        header.push_str(&column.name);
    }
    writeln!(w, "{header}")?;
    for i in 0..results.n_rows() {
        let mut line = format!(
            "{}\t{}\t{}",
            results.ids()[i],
            results.groups()[i],
            results.group_names()[i]
        );
        for column in results.columns() {
            line.push('\t');
            line.push_str(&format_f64_6(column.values[i]));
        }
        writeln!(w, "{line}")?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_stats_tsv(stats: &StatsTable, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "{}", stats.header().join("\t"))?;
    for row in &stats.rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.group,
            row.group_name,
            row.assay,
            row.n,
            format_f64_6(row.mean),
            format_f64_6(row.stdev),
            format_f64_6(row.median),
            format_f64_6(row.iqr),
            format_ci(row.ci)
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_filter_report(reports: &[FilterReport], path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "assay\tgroup\tgroup_name\tanchor\tlower\tupper\tn_masked\tmasked_rows")?;
    for r in reports {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.assay,
            r.group,
            r.group_name,
            format_f64_6(r.anchor),
            format_f64_6(r.lower),
            format_f64_6(r.upper),
            r.masked.len(),
            format_indices(&r.masked)
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Fitted standard curves, one line per calibrated assay.
pub fn write_curves_tsv(calibrator: &Calibrator, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "assay\tn_points\tslope\tintercept\tr\tp_value\tstderr\tefficiency")?;
    for curve in calibrator.curves() {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}",
            curve.assay,
            curve.ct_values.len(),
            format_f64_6(curve.fit.slope),
            format_f64_6(curve.fit.intercept),
            format_f64_6(curve.fit.r),
            format_f64_6(curve.fit.p_value),
            format_f64_6(curve.fit.stderr),
            curve.efficiency
        )?;
    }
    w.flush()?;
    Ok(())
}
