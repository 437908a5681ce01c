use crate::model::row::Row;

/// Contiguous blocks of rows sharing a group id, in row order.
pub fn group_blocks(rows: &[Row]) -> Vec<(usize, &[Row])> {
    let mut blocks = Vec::new();
    let mut start = 0usize;
    for i in 1..=rows.len() {
        if i == rows.len() || rows[i].group != rows[start].group {
            if start < i {
                blocks.push((rows[start].group, &rows[start..i]));
            }
            start = i;
        }
    }
    blocks
}

/// Repeat each group block `factor(group)` times, keeping group order.
///
/// With `factor` returning the group size this squares every group, the
/// layout used for combinatoric normalisation.
pub fn tile<F>(rows: &[Row], factor: F) -> Vec<Row>
where
    F: Fn(usize) -> usize,
{
    let mut out = Vec::new();
    for (group, block) in group_blocks(rows) {
        for _ in 0..factor(group) {
            out.extend_from_slice(block);
        }
    }
    out
}

/// Repeat each group block `k` times. `k <= 1` returns the rows unchanged.
pub fn stack(rows: &[Row], k: usize) -> Vec<Row> {
    if k <= 1 {
        return rows.to_vec();
    }
    tile(rows, |_| k)
}
