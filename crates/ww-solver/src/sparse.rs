//! Row-wise sparse storage for the assembled equations.
//!
//! Row `r` reads `x[r] - Σ c_j x[j] = rhs[r]`. Coefficients stay generic so the
//! process matrix can hold symbolic flow ratios until the hydraulics are known.

use nalgebra::{DMatrix, DVector};

use crate::system::Growth;

#[derive(Debug, Clone)]
pub(crate) struct Row<C> {
    pub entries: Vec<(usize, C)>,
    pub rhs: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct SparseRows<C> {
    rows: Vec<Option<Row<C>>>,
}

impl<C> SparseRows<C> {
    pub fn with_capacity(dim: usize) -> Self {
        let mut rows = Vec::with_capacity(dim);
        rows.resize_with(dim, || None);
        Self { rows }
    }

    /// Current logical size (rows and columns).
    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    /// Grow so that `required` rows exist. Never shrinks.
    pub fn ensure(&mut self, required: usize, growth: Growth) {
        let len = self.rows.len();
        if required <= len {
            return;
        }
        let target = match growth {
            Growth::Doubling => required.max(len.saturating_mul(2)),
            Growth::Exact => required,
        };
        self.rows.resize_with(target, || None);
    }

    pub fn is_defined(&self, row: usize) -> bool {
        matches!(self.rows.get(row), Some(Some(_)))
    }

    /// Store a row; returns `false` (leaving the old row) if it was already
    /// defined.
    pub fn insert(&mut self, row: usize, value: Row<C>) -> bool {
        match self.rows.get_mut(row) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Fit storage to exactly `dim` rows. Only undefined rows are dropped;
    /// returns the first defined row past `dim` if there is one.
    pub fn fit(&mut self, dim: usize) -> Result<(), usize> {
        if let Some(extra) = (dim..self.rows.len()).find(|r| self.is_defined(*r)) {
            return Err(extra);
        }
        self.rows.resize_with(dim, || None);
        self.rows.shrink_to_fit();
        Ok(())
    }

    /// First undefined row, if any.
    pub fn first_gap(&self) -> Option<usize> {
        self.rows.iter().position(Option::is_none)
    }

    pub fn clear(&mut self, dim: usize) {
        self.rows.clear();
        self.rows.resize_with(dim, || None);
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().flatten().map(|r| r.entries.len() + 1).sum()
    }

    /// Expand to a dense system, evaluating each coefficient with `eval`.
    /// Undefined rows become identity rows with a zero right-hand side.
    pub fn to_dense<E>(
        &self,
        mut eval: impl FnMut(usize, &C) -> Result<f64, E>,
    ) -> Result<(DMatrix<f64>, DVector<f64>), E> {
        let n = self.rows.len();
        let mut a = DMatrix::<f64>::identity(n, n);
        let mut b = DVector::<f64>::zeros(n);
        for (r, row) in self.rows.iter().enumerate() {
            let Some(row) = row else { continue };
            b[r] = row.rhs;
            for (col, coef) in &row.entries {
                a[(r, *col)] -= eval(r, coef)?;
            }
        }
        Ok((a, b))
    }
}
