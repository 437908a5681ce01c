use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::Result;

pub mod table;

pub use table::read_ct_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    Semicolon,
}

impl Delimiter {
    /// `.tsv`/`.txt`/`.tab` (optionally gzipped) are tab separated, anything else comma.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".tsv") || name.ends_with(".txt") || name.ends_with(".tab") {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    /// Guess from a header line; csv2 exports use `;`.
    pub fn sniff(line: &str) -> Self {
        if line.contains('\t') {
            Delimiter::Tab
        } else if line.contains(';') && !line.contains(',') {
            Delimiter::Semicolon
        } else {
            Delimiter::Comma
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
            Delimiter::Semicolon => ';',
        }
    }

    pub fn split(self, line: &str) -> Vec<&str> {
        line.split(self.as_char()).collect()
    }
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Assay id derived from a file name: the stem without `.gz` and the table extension.
pub fn assay_id_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("assay");
    let name = name.strip_suffix(".gz").unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}
