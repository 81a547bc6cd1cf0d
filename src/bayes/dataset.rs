//! Sample tables produced by sampling and consumed by estimators.

use super::factor::Variable;
use crate::models::{InferlabError, Result};
use serde::{Deserialize, Serialize};

/// Rows of state indices over a fixed set of variables.
///
/// K_i: Every row has one state per column, within that column's cardinality.
/// B_i: Weights exist only for likelihood-weighted samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    columns: Vec<Variable>,
    rows: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weights: Option<Vec<f64>>,
}

/// Unchecked wire form; rows are replayed through `push`/`push_weighted`.
#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<Variable>,
    rows: Vec<Vec<usize>>,
    #[serde(default)]
    weights: Option<Vec<f64>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = InferlabError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        match raw.weights {
            None => {
                let mut data = Self::new(raw.columns);
                for row in raw.rows {
                    data.push(row)?;
                }
                Ok(data)
            }
            Some(weights) => {
                if weights.len() != raw.rows.len() {
                    return Err(InferlabError::InvalidInput(format!(
                        "{} weights for {} rows",
                        weights.len(),
                        raw.rows.len()
                    )));
                }
                let mut data = Self::weighted(raw.columns);
                for (row, weight) in raw.rows.into_iter().zip(weights) {
                    data.push_weighted(row, weight)?;
                }
                Ok(data)
            }
        }
    }
}

impl Dataset {
    /// Empty dataset over `columns`.
    pub fn new(columns: Vec<Variable>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            weights: None,
        }
    }

    /// Empty weighted dataset over `columns`.
    pub fn weighted(columns: Vec<Variable>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            weights: Some(Vec::new()),
        }
    }

    fn check_row(&self, row: &[usize]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(InferlabError::InvalidInput(format!(
                "row has {} values, dataset has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (v, s) in self.columns.iter().zip(row) {
            v.check_state(*s)?;
        }
        Ok(())
    }

    /// Append an unweighted row.
    pub fn push(&mut self, row: Vec<usize>) -> Result<()> {
        self.check_row(&row)?;
        if let Some(weights) = &mut self.weights {
            weights.push(1.0);
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a row with a likelihood weight.
    pub fn push_weighted(&mut self, row: Vec<usize>, weight: f64) -> Result<()> {
        self.check_row(&row)?;
        if weight < 0.0 || !weight.is_finite() {
            return Err(InferlabError::InvalidInput(format!("invalid weight {weight}")));
        }
        self.weights
            .get_or_insert_with(|| vec![1.0; self.rows.len()])
            .push(weight);
        self.rows.push(row);
        Ok(())
    }

    /// Column variables.
    pub fn columns(&self) -> &[Variable] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// Row weights, if the dataset is weighted.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Weight of row `i` (1 for unweighted datasets).
    pub fn weight(&self, i: usize) -> f64 {
        self.weights
            .as_ref()
            .and_then(|w| w.get(i).copied())
            .unwrap_or(1.0)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Project onto the named columns, keeping weights.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| InferlabError::UnknownVariable(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i]).collect())
                .collect(),
            weights: self.weights.clone(),
        })
    }

    /// Text table of state indices, optionally truncated to head and tail.
    pub fn render(&self, preview: Option<usize>) -> String {
        let mut header: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        if self.weights.is_some() {
            header.push("_weight".to_string());
        }
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut cells: Vec<String> = row.iter().map(usize::to_string).collect();
                if self.weights.is_some() {
                    cells.push(format!("{:.6}", self.weight(i)));
                }
                cells
            })
            .collect();
        super::table::render_frame(&header, &body, preview)
    }
}
