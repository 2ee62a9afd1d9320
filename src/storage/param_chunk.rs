//! Splits row batches into groups whose total bound-parameter count stays
//! under `param_limit` (spec.md §4.5: "...chunked so that no single
//! `INSERT` exceeds the configured parameter limit").

pub fn chunk_by_param_limit<T>(rows: &[T], columns_per_row: usize, param_limit: usize) -> Vec<&[T]> {
    if rows.is_empty() {
        return vec![];
    }
    let rows_per_chunk = (param_limit / columns_per_row.max(1)).max(1);
    rows.chunks(rows_per_chunk).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_param_limit() {
        let rows: Vec<u32> = (0..10_000).collect();
        let chunks = chunk_by_param_limit(&rows, 19, 65_535);
        for chunk in &chunks {
            assert!(chunk.len() * 19 <= 65_535);
        }
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), rows.len());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let rows: Vec<u32> = vec![];
        assert!(chunk_by_param_limit(&rows, 10, 100).is_empty());
    }
}
