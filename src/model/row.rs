/// One replicate measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    /// NaN marks an unreadable well.
    pub ct: f64,
    pub group: usize,
    pub group_name: String,
    pub dct: Option<f64>,
}

impl Row {
    pub fn new(id: impl Into<String>, ct: f64) -> Self {
        Self {
            id: id.into(),
            ct,
            group: 0,
            group_name: String::new(),
            dct: None,
        }
    }

    pub fn dct_or_nan(&self) -> f64 {
        self.dct.unwrap_or(f64::NAN)
    }
}

/// Raw `{identifier, Ct}` rows as delivered by the input stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAssay {
    pub id: String,
    pub rows: Vec<(String, f64)>,
}

impl RawAssay {
    pub fn new(id: impl Into<String>, rows: Vec<(String, f64)>) -> Self {
        Self {
            id: id.into(),
            rows,
        }
    }
}
