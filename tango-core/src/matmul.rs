//! Shard carving and reassembly for the reference operation `scaled_matmul`.
//!
//! Everything here is operation-specific; a future binary-block operation
//! would plug in a different carver/reassembler keyed on `Job::operation`
//! (spec.md §9). The worker-side multiplication itself is out of scope
//! (spec.md §1) — this module only slices operands and stitches results.

use crate::error::TangoError;

pub type Matrix = Vec<Vec<f32>>;

pub fn parse_matrix(bytes: &[u8]) -> Result<Matrix, TangoError> {
    serde_json::from_slice(bytes)
        .map_err(|e| TangoError::Malformed(format!("invalid operand matrix: {e}")))
}

pub fn serialize_matrix(matrix: &Matrix) -> Vec<u8> {
    serde_json::to_vec(matrix).expect("matrix serialization is infallible")
}

/// Ceiling distribution of `total` items across `num_blocks` contiguous
/// blocks: the first `total % num_blocks` blocks get one extra item.
/// Returns the half-open `[start, end)` range for `block_idx`.
pub fn block_range(total: u32, num_blocks: u32, block_idx: u32) -> (u32, u32) {
    assert!(num_blocks > 0 && block_idx < num_blocks);
    let base = total / num_blocks;
    let remainder = total % num_blocks;
    if block_idx < remainder {
        let start = block_idx * (base + 1);
        (start, start + base + 1)
    } else {
        let start = remainder * (base + 1) + (block_idx - remainder) * base;
        (start, start + base)
    }
}

/// `(rowBlock, colBlock)` for a 1-based shard index in a `gridRows x
/// gridCols` grid (spec.md §4.C).
pub fn shard_coords(idx: u32, grid_cols: u32) -> (u32, u32) {
    let zero_based = idx - 1;
    (zero_based / grid_cols, zero_based % grid_cols)
}

/// The operand slices a given shard sees: rows `[startRow, endRow)` of A,
/// columns `[startCol, endCol)` of every row of B.
pub struct Shard {
    pub a_slice: Matrix,
    pub b_slice: Matrix,
}

pub fn carve(
    full_a: &Matrix,
    full_b: &Matrix,
    grid_rows: u32,
    grid_cols: u32,
    idx: u32,
) -> Result<Shard, TangoError> {
    let total_rows = full_a.len() as u32;
    let total_cols = full_b.first().map(|row| row.len()).unwrap_or(0) as u32;
    let (row_block, col_block) = shard_coords(idx, grid_cols);

    let (start_row, end_row) = block_range(total_rows, grid_rows, row_block);
    let (start_col, end_col) = block_range(total_cols, grid_cols, col_block);

    let a_slice = full_a[start_row as usize..end_row as usize].to_vec();
    let b_slice = full_b
        .iter()
        .map(|row| row[start_col as usize..end_col as usize].to_vec())
        .collect();

    Ok(Shard { a_slice, b_slice })
}

/// Stitch per-shard text results (space-separated numeric tokens, one line
/// per output row) into the final `C` matrix text, per spec.md §4.D.
///
/// Fails if any row-block is missing a shard or has inconsistent line
/// counts across its column-blocks.
pub fn reassemble(
    results: &std::collections::HashMap<u32, Vec<u8>>,
    grid_rows: u32,
    grid_cols: u32,
) -> Result<String, TangoError> {
    let mut out_lines: Vec<String> = Vec::new();

    for row_block in 0..grid_rows {
        let mut per_col_lines: Vec<Vec<&str>> = Vec::with_capacity(grid_cols as usize);
        for col_block in 0..grid_cols {
            let idx = row_block * grid_cols + col_block + 1;
            let bytes = results.get(&idx).ok_or_else(|| {
                TangoError::ReassemblyFailed(
                    "job".into(),
                    format!("missing shard {idx} for row-block {row_block}"),
                )
            })?;
            let text = std::str::from_utf8(bytes).map_err(|e| {
                TangoError::ReassemblyFailed("job".into(), format!("shard {idx} not utf8: {e}"))
            })?;
            let lines: Vec<&str> = text.trim().lines().collect();
            if lines.is_empty() {
                return Err(TangoError::ReassemblyFailed(
                    "job".into(),
                    format!("shard {idx} is empty"),
                ));
            }
            per_col_lines.push(lines);
        }

        let lines_per_block = per_col_lines[0].len();
        if per_col_lines
            .iter()
            .any(|lines| lines.len() != lines_per_block)
        {
            return Err(TangoError::ReassemblyFailed(
                "job".into(),
                format!("inconsistent line counts in row-block {row_block}"),
            ));
        }

        for line_idx in 0..lines_per_block {
            let joined = per_col_lines
                .iter()
                .map(|lines| lines[line_idx])
                .collect::<Vec<_>>()
                .join(" ");
            out_lines.push(joined);
        }
    }

    Ok(out_lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_range_ceiling_distribution() {
        // 16 rows over 3 blocks: 6, 5, 5 — first 16%3=1 block is taller.
        assert_eq!(block_range(16, 3, 0), (0, 6));
        assert_eq!(block_range(16, 3, 1), (6, 11));
        assert_eq!(block_range(16, 3, 2), (11, 16));
    }

    #[test]
    fn block_range_covers_input_disjointly() {
        let total = 17;
        let num_blocks = 4;
        let mut covered = Vec::new();
        for block_idx in 0..num_blocks {
            let (start, end) = block_range(total, num_blocks, block_idx);
            covered.push((start, end));
        }
        // Pairwise disjoint and contiguous, covering [0, total).
        assert_eq!(covered[0].0, 0);
        assert_eq!(covered[num_blocks as usize - 1].1, total);
        for w in covered.windows(2) {
            assert_eq!(w[0].1, w[1].0);
        }
    }

    #[test]
    fn shard_coords_row_major() {
        // 2x2 grid: idx 1..4 -> (0,0) (0,1) (1,0) (1,1)
        assert_eq!(shard_coords(1, 2), (0, 0));
        assert_eq!(shard_coords(2, 2), (0, 1));
        assert_eq!(shard_coords(3, 2), (1, 0));
        assert_eq!(shard_coords(4, 2), (1, 1));
    }

    fn naive_matmul(a: &Matrix, b: &Matrix) -> Matrix {
        let rows = a.len();
        let inner = b.len();
        let cols = b[0].len();
        let mut out = vec![vec![0.0f32; cols]; rows];
        for i in 0..rows {
            for j in 0..cols {
                let mut sum = 0.0f32;
                for k in 0..inner {
                    sum += a[i][k] * b[k][j];
                }
                out[i][j] = sum;
            }
        }
        out
    }

    fn matrix_to_text(m: &Matrix) -> Vec<u8> {
        m.iter()
            .map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes()
    }

    #[test]
    fn reassembly_inverts_carving_2x2() {
        let a: Matrix = (0..16)
            .map(|r| (0..8).map(|c| (r * 8 + c) as f32).collect())
            .collect();
        let b: Matrix = (0..8)
            .map(|r| (0..16).map(|c| (r * 16 + c) as f32).collect())
            .collect();
        let expected = naive_matmul(&a, &b);

        let grid_rows = 2;
        let grid_cols = 2;
        let mut results = std::collections::HashMap::new();
        for idx in 1..=(grid_rows * grid_cols) {
            let shard = carve(&a, &b, grid_rows, grid_cols, idx).unwrap();
            let block = naive_matmul(&shard.a_slice, &shard.b_slice);
            results.insert(idx, matrix_to_text(&block));
        }

        let reassembled_text = reassemble(&results, grid_rows, grid_cols).unwrap();
        let reassembled: Matrix = reassembled_text
            .lines()
            .map(|line| {
                line.split_whitespace()
                    .map(|tok| tok.parse::<f32>().unwrap())
                    .collect()
            })
            .collect();

        assert_eq!(reassembled.len(), expected.len());
        for (got_row, want_row) in reassembled.iter().zip(expected.iter()) {
            for (got, want) in got_row.iter().zip(want_row.iter()) {
                assert!((got - want).abs() < 5e-3, "{got} != {want}");
            }
        }
    }

    #[test]
    fn reassembly_fails_on_missing_shard() {
        let results = std::collections::HashMap::new();
        assert!(reassemble(&results, 2, 2).is_err());
    }

    #[test]
    fn reassembly_fails_on_inconsistent_line_counts() {
        let mut results = std::collections::HashMap::new();
        results.insert(1, b"1 2\n3 4".to_vec());
        results.insert(2, b"5 6".to_vec());
        assert!(reassemble(&results, 1, 2).is_err());
    }
}
