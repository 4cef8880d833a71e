//! Sparse matrix assembly buffer, dense/sparse LU factorization, and the
//! dense-vector operations used throughout the solver.
//!
//! During assembly, entries accumulate in a COO-like triplet list so that
//! repeated `add(r, c, Δ)` calls at the same position never require a
//! linear scan or dedup pass; [`SparseMatrix::factorize`] sums duplicates
//! and builds either a dense LU (small systems) or a sparse LU via `faer`
//! (systems at or above [`SPARSE_THRESHOLD`]), matching the pivot-tolerance
/// contract in the module docs below.
use faer::prelude::Solve;
use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Systems with this many or more unknowns use the sparse LU path.
pub const SPARSE_THRESHOLD: usize = 50;

/// Pivot tolerance below which a factorization is declared singular.
pub const PIVOT_TOLERANCE: f64 = 1e-14;

/// A sparse matrix under assembly: a COO-style accumulator that becomes a
/// CSR/dense factorization on [`SparseMatrix::factorize`].
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    size: usize,
    /// `(row, col, value)` triplets; duplicates at the same `(row, col)`
    /// are valid and are summed at finalize time.
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            entries: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Add `delta` to the `(row, col)` entry. Out-of-range indices are a
    /// programmer error (caught by assertion) rather than silently dropped,
    /// since a bad node index would otherwise corrupt KCL invisibly.
    pub fn add(&mut self, row: usize, col: usize, delta: f64) {
        debug_assert!(row < self.size && col < self.size, "matrix index out of range");
        if delta != 0.0 {
            self.entries.push((row, col, delta));
        }
    }

    /// Sum of all accumulated entries at `(row, col)`. O(nnz); intended for
    /// tests and small debugging circuits, not the hot assembly path.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.entries
            .iter()
            .filter(|&&(r, c, _)| r == row && c == col)
            .map(|&(_, _, v)| v)
            .sum()
    }

    /// Discard all accumulated entries, ready for the next assembly pass.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn triplets(&self) -> &[(usize, usize, f64)] {
        &self.entries
    }

    /// Materialize a dense matrix (duplicates summed). Used for the small-
    /// system solve path and for tests.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.size, self.size);
        for &(r, c, v) in &self.entries {
            m[(r, c)] += v;
        }
        m
    }

    /// Factorize the accumulated matrix, choosing the dense or sparse LU
    /// path based on [`SPARSE_THRESHOLD`]. Fails with
    /// [`Error::SingularMatrix`] if a pivot falls below [`PIVOT_TOLERANCE`].
    pub fn factorize(&self) -> Result<LuFactorization> {
        if self.size >= SPARSE_THRESHOLD {
            LuFactorization::sparse(self.size, &self.entries)
        } else {
            LuFactorization::dense(self.to_dense())
        }
    }

    /// Convenience: factorize then solve in one call.
    pub fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        self.factorize()?.solve(rhs)
    }

    /// Matrix-vector product `M*x`, used to form the Newton residual
    /// `F(x) = G*x - rhs` without densifying the matrix.
    pub fn multiply(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.size);
        for &(r, c, v) in &self.entries {
            out[r] += v * x[c];
        }
        out
    }
}

/// A completed LU factorization, ready to solve against one or more RHS
/// vectors without re-factoring (re-factorization is required whenever any
/// matrix entry changes, per the `SparseMatrix` contract).
pub enum LuFactorization {
    Dense(Box<nalgebra::LU<f64, nalgebra::Dyn, nalgebra::Dyn>>),
    Sparse(Box<faer::sparse::linalg::solvers::Lu<usize, f64>>, usize),
}

impl LuFactorization {
    fn dense(m: DMatrix<f64>) -> Result<Self> {
        let size = m.nrows();
        let lu = m.lu();
        let u = lu.u();
        for i in 0..size {
            if u[(i, i)].abs() < PIVOT_TOLERANCE {
                return Err(Error::SingularMatrix { row: i });
            }
        }
        Ok(LuFactorization::Dense(Box::new(lu)))
    }

    fn sparse(size: usize, entries: &[(usize, usize, f64)]) -> Result<Self> {
        use faer::sparse::{SparseColMat, Triplet};

        let triplets: Vec<_> = entries
            .iter()
            .map(|&(r, c, v)| Triplet::new(r, c, v))
            .collect();
        let mat = SparseColMat::<usize, f64>::try_new_from_triplets(size, size, &triplets)
            .map_err(|_| Error::SingularMatrix { row: 0 })?;
        let lu = mat.sp_lu().map_err(|_| Error::SingularMatrix { row: 0 })?;
        Ok(LuFactorization::Sparse(Box::new(lu), size))
    }

    pub fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        match self {
            LuFactorization::Dense(lu) => lu
                .solve(rhs)
                .ok_or(Error::SingularMatrix { row: usize::MAX }),
            LuFactorization::Sparse(lu, size) => {
                if rhs.len() != *size {
                    return Err(Error::DimensionMismatch {
                        expected: *size,
                        actual: rhs.len(),
                    });
                }
                let faer_rhs = faer::Col::<f64>::from_fn(*size, |i| rhs[i]);
                let x = lu.solve(&faer_rhs);
                Ok(DVector::from_fn(*size, |i, _| x[i]))
            }
        }
    }
}

/// Named vector operations over `nalgebra::DVector<f64>`: norms, scaling,
/// dot product, in-place add/subtract. Most already exist on `DVector`
/// under other names; this trait gives convergence-check code a stable
/// vocabulary without wrapping the type.
pub trait VectorOps {
    fn norm_inf(&self) -> f64;
    fn norm_2(&self) -> f64;
    fn plus(&mut self, other: &DVector<f64>);
    fn minus(&mut self, other: &DVector<f64>);
}

impl VectorOps for DVector<f64> {
    fn norm_inf(&self) -> f64 {
        self.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()))
    }

    fn norm_2(&self) -> f64 {
        self.norm()
    }

    fn plus(&mut self, other: &DVector<f64>) {
        *self += other;
    }

    fn minus(&mut self, other: &DVector<f64>) {
        *self -= other;
    }
}
