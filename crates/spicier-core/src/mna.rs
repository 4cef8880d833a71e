//! Modified Nodal Analysis system assembly.
//!
//! `MnaSystem` owns the node map, the extra branch-current unknowns
//! (voltage sources, inductors, coupled-inductor groups, and any other
//! element that needs one), and the matrix/RHS accumulators. Devices never
//! see `SparseMatrix` directly; they stamp through the helpers here, using
//! the usual `mna.stamp_conductance(...)` / `mna.matrix_mut()[(i, j)] += v`
//! calling convention.

use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::node::{NodeId, NodeMap};
use crate::sparse::SparseMatrix;

/// A reserved row/column for a branch-current unknown (KVL source current,
/// inductor current, ...), distinct from node-voltage unknowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchId(usize);

impl BranchId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The assembled unknown vector is `[node voltages ; branch currents]`.
pub struct MnaSystem {
    nodes: NodeMap,
    num_branches: usize,
    next_branch: usize,
    matrix: SparseMatrix,
    rhs: DVector<f64>,
    assembling: bool,
}

impl MnaSystem {
    /// Begin building a system over `nodes` (already populated with every
    /// node name the netlist references) and `num_branches` extra
    /// branch-current unknowns.
    pub fn new(nodes: NodeMap, num_branches: usize) -> Self {
        let size = nodes.num_nodes() + num_branches;
        Self {
            nodes,
            num_branches,
            next_branch: 0,
            matrix: SparseMatrix::new(size),
            rhs: DVector::zeros(size),
            assembling: false,
        }
    }

    /// Allocate the next unused branch row/column. Panics if more branches
    /// are reserved than `num_branches` passed to `new`, which would mean
    /// the builder miscounted branch-owning components.
    pub fn reserve_branch(&mut self) -> BranchId {
        assert!(
            self.next_branch < self.num_branches,
            "reserved more branches than the system was sized for"
        );
        let id = BranchId(self.nodes.num_nodes() + self.next_branch);
        self.next_branch += 1;
        id
    }

    pub fn size(&self) -> usize {
        self.nodes.num_nodes() + self.num_branches
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.num_nodes()
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    /// Clear the matrix and RHS for a fresh stamping pass (a new Newton
    /// iteration or a new timestep); the node map and branch count are
    /// unchanged.
    pub fn begin_assembly(&mut self) {
        self.matrix.clear();
        self.rhs.fill(0.0);
        self.assembling = true;
    }

    pub fn finalize_assembly(&mut self) {
        self.assembling = false;
    }

    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    pub fn to_dense_matrix(&self) -> nalgebra::DMatrix<f64> {
        self.matrix.to_dense()
    }

    /// `F(x) = G*x - rhs`, the residual of the currently assembled
    /// linearized system at `x`.
    pub fn residual(&self, x: &DVector<f64>) -> DVector<f64> {
        self.matrix.multiply(x) - &self.rhs
    }

    pub fn solve(&self) -> Result<DVector<f64>> {
        self.matrix.solve(&self.rhs).map_err(|e| match e {
            crate::error::Error::SingularMatrix { row } => Error::SingularMatrix { row },
            other => other,
        })
    }

    /// Add `delta` at `(row, col)`, where `row`/`col` are either a node's
    /// `mna_index()` or a branch's `index()`. A `None` node index (ground)
    /// is silently dropped, matching ground's elision from the system.
    pub fn stamp(&mut self, row: Option<usize>, col: Option<usize>, delta: f64) {
        if let (Some(r), Some(c)) = (row, col) {
            self.matrix.add(r, c, delta);
        }
    }

    pub fn stamp_rhs(&mut self, row: Option<usize>, delta: f64) {
        if let Some(r) = row {
            self.rhs[r] += delta;
        }
    }

    /// Stamp a two-terminal conductance `g` between `pos` and `neg`
    /// (standard four-quadrant MNA resistor pattern).
    pub fn stamp_conductance(&mut self, pos: NodeId, neg: NodeId, g: f64) {
        let p = pos.mna_index();
        let n = neg.mna_index();
        self.stamp(p, p, g);
        self.stamp(n, n, g);
        self.stamp(p, n, -g);
        self.stamp(n, p, -g);
    }

    /// Stamp an independent current source of `value` amps flowing from
    /// `neg` to `pos` (i.e. into `pos`).
    pub fn stamp_current_source(&mut self, pos: NodeId, neg: NodeId, value: f64) {
        self.stamp_rhs(pos.mna_index(), value);
        self.stamp_rhs(neg.mna_index(), -value);
    }

    /// Stamp a voltage-controlled current source: a current of
    /// `gm * (v(ctrl_pos) - v(ctrl_neg))` flows into `out_pos` and out of
    /// `out_neg`. Used directly by VCCS and as the transconductance term
    /// of a linearized MOSFET.
    pub fn stamp_vccs(&mut self, out_pos: NodeId, out_neg: NodeId, ctrl_pos: NodeId, ctrl_neg: NodeId, gm: f64) {
        let op = out_pos.mna_index();
        let on = out_neg.mna_index();
        let cp = ctrl_pos.mna_index();
        let cn = ctrl_neg.mna_index();
        self.stamp(op, cp, gm);
        self.stamp(op, cn, -gm);
        self.stamp(on, cp, -gm);
        self.stamp(on, cn, gm);
    }

    /// Stamp a branch-current unknown `branch` as the current flowing
    /// `pos -> neg` through a two-terminal element (shared KCL/KVL pattern
    /// used by independent voltage sources and inductors alike).
    pub fn stamp_branch_kcl(&mut self, pos: NodeId, neg: NodeId, branch: BranchId) {
        let b = Some(branch.index());
        self.stamp(pos.mna_index(), b, 1.0);
        self.stamp(neg.mna_index(), b, -1.0);
        self.stamp(b, pos.mna_index(), 1.0);
        self.stamp(b, neg.mna_index(), -1.0);
    }

    /// Stamp the KVL row for a branch carrying a fixed voltage constraint
    /// `v_pos - v_neg - branch_resistance * i_branch = rhs_value`, e.g. an
    /// independent source (`branch_resistance = 0`) or an inductor's
    /// Backward-Euler/Trapezoidal companion (`branch_resistance = Req`).
    pub fn stamp_branch_kvl(&mut self, branch: BranchId, branch_resistance: f64, rhs_value: f64) {
        let b = branch.index();
        self.matrix.add(b, b, -branch_resistance);
        self.rhs[b] += rhs_value;
    }
}
