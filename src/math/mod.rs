pub mod regression;
pub mod seed;
pub mod stats;

pub fn format_f64_6(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.6}", v)
    }
}
