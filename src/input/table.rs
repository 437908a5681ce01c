use std::io::BufRead;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{QpcrError, Result};
use crate::input::{Delimiter, assay_id_from_path, open_maybe_gz};
use crate::model::row::RawAssay;

const ID_HEADERS: [&str; 4] = ["id", "name", "sample", "sample name"];
const CT_HEADERS: [&str; 2] = ["ct", "cq"];

/// Parse a Ct cell; instrument placeholders for "no signal" become NaN.
pub fn parse_ct(value: &str) -> Option<f64> {
    let v = value.trim();
    let lower = v.to_ascii_lowercase();
    if v.is_empty()
        || lower == "nan"
        || lower == "na"
        || lower == "undetermined"
        || lower == "no ct"
        || lower == "-"
    {
        return Some(f64::NAN);
    }
    v.replace(',', ".").parse::<f64>().ok()
}

/// Read a two-column `{identifier, Ct}` table. The assay id is the file stem.
///
/// Columns are located by header name (`id`/`name`/`sample` and `Ct`/`Cq`,
/// case-insensitive); without a recognised header the first two columns are used.
pub fn read_ct_table(path: &Path) -> Result<RawAssay> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();
    let read = reader.read_line(&mut buf)?;
    if read == 0 {
        return Err(QpcrError::Parse {
            path: path.to_path_buf(),
            line: 1,
            msg: "table is empty".to_string(),
        });
    }
    let header_line = buf.trim_end().to_string();
    let delimiter = Delimiter::sniff(&header_line);
    let header: Vec<String> = delimiter
        .split(&header_line)
        .iter()
        .map(|s| s.trim().trim_matches('"').to_ascii_lowercase())
        .collect();

    let id_col = header.iter().position(|h| ID_HEADERS.contains(&h.as_str()));
    let ct_col = header.iter().position(|h| CT_HEADERS.contains(&h.as_str()));
    let has_header = id_col.is_some() || ct_col.is_some();
    let id_col = id_col.unwrap_or(0);
    let ct_col = ct_col.unwrap_or(if id_col == 1 { 0 } else { 1 });

    let mut rows = Vec::new();
    let mut line_no = 1usize;
    let mut pending = if has_header { None } else { Some(header_line) };
    loop {
        let line = match pending.take() {
            Some(l) => l,
            None => {
                buf.clear();
                if reader.read_line(&mut buf)? == 0 {
                    break;
                }
                line_no += 1;
                buf.trim_end().to_string()
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let fields = delimiter.split(&line);
        let (Some(id), Some(ct)) = (fields.get(id_col), fields.get(ct_col)) else {
            return Err(QpcrError::Parse {
                path: path.to_path_buf(),
                line: line_no,
                msg: format!("expected at least {} columns", id_col.max(ct_col) + 1),
            });
        };
        let id = id.trim().trim_matches('"').to_string();
        let ct = match parse_ct(ct.trim_matches('"')) {
            Some(v) => v,
            None => {
                return Err(QpcrError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    msg: format!("Ct value '{}' is not a number", ct.trim()),
                });
            }
        };
        rows.push((id, ct));
    }

    let n_missing = rows.iter().filter(|(_, ct)| ct.is_nan()).count();
    if n_missing > 0 {
        warn!(path = %path.display(), n_missing, "table contains missing Ct values");
    }
    let id = assay_id_from_path(path);
    debug!(assay = %id, n_rows = rows.len(), "Ct table read");
    Ok(RawAssay::new(id, rows))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/table.rs"]
mod tests;
