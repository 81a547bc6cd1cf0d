//! Row-compressed sparse matrix of `f64` features.

use crate::models::{InferlabError, Result};

/// Sparse matrix stored as one sorted `(column, value)` list per row.
///
/// K_i: Column indices within a row are strictly increasing and `< n_cols`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseMatrix {
    n_cols: usize,
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    /// Empty matrix with `n_cols` columns.
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            rows: Vec::new(),
        }
    }

    /// Append a row; entries are sorted and explicit zeros dropped.
    pub fn push_row(&mut self, mut entries: Vec<(usize, f64)>) -> Result<()> {
        entries.retain(|&(_, v)| v != 0.0);
        entries.sort_by_key(|&(c, _)| c);
        if let Some(&(c, _)) = entries.last()
            && c >= self.n_cols
        {
            return Err(InferlabError::InvalidInput(format!(
                "column {c} out of range for {} columns",
                self.n_cols
            )));
        }
        if entries.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(InferlabError::InvalidInput(
                "duplicate column in sparse row".to_string(),
            ));
        }
        self.rows.push(entries);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Non-zero entries of row `i`.
    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[(usize, f64)]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// New matrix holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            n_cols: self.n_cols,
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Dense copy of row `i`.
    pub fn dense_row(&self, i: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_cols];
        for &(c, v) in &self.rows[i] {
            dense[c] = v;
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_sorts_and_drops_zeros() {
        let mut m = SparseMatrix::new(4);
        m.push_row(vec![(3, 1.0), (0, 2.0), (1, 0.0)]).unwrap();
        assert_eq!(m.row(0), &[(0, 2.0), (3, 1.0)]);
        assert_eq!(m.dense_row(0), vec![2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_out_of_range_and_duplicate_columns() {
        let mut m = SparseMatrix::new(2);
        assert!(m.push_row(vec![(2, 1.0)]).is_err());
        assert!(m.push_row(vec![(1, 1.0), (1, 2.0)]).is_err());
        assert_eq!(m.n_rows(), 0);
    }

    #[test]
    fn test_select_rows() {
        let mut m = SparseMatrix::new(2);
        m.push_row(vec![(0, 1.0)]).unwrap();
        m.push_row(vec![(1, 2.0)]).unwrap();
        m.push_row(vec![]).unwrap();
        let s = m.select_rows(&[2, 0]);
        assert_eq!(s.n_rows(), 2);
        assert!(s.row(0).is_empty());
        assert_eq!(s.row(1), &[(0, 1.0)]);
    }
}
