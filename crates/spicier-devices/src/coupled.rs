//! Coupled multi-winding transformer model: a group of inductors sharing
//! a mutual-inductance matrix, stamped together so the cross terms land
//! on both windings' branch rows.
//!
//! Windings hold indices into the group rather than references to each
//! other, avoiding cyclic ownership between element objects.

use spicier_core::{AssemblyContext, Element, Error, MnaSystem, NodeMap, Reactive, Result, Stamper};

use crate::passive::Inductor;

pub struct CoupledInductorGroup {
    pub name: String,
    windings: Vec<Inductor>,
    /// Symmetric coupling coefficients `k[i][j] in [-1, 1]`; diagonal is
    /// unused (self-inductance comes from each winding).
    coupling: Vec<Vec<f64>>,
}

impl CoupledInductorGroup {
    /// Build a group, validating that the effective inductance matrix
    /// (self-inductances on the diagonal, `M_ij = k_ij * sqrt(L_i * L_j)`
    /// off-diagonal) is symmetric positive semi-definite.
    pub fn new(
        name: impl Into<String>,
        windings: Vec<Inductor>,
        coupling: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        let n = windings.len();
        if coupling.len() != n || coupling.iter().any(|row| row.len() != n) {
            return Err(Error::InvalidCoupling(name));
        }
        let l_eff = effective_inductance_matrix(&windings, &coupling);
        if !is_symmetric_psd(&l_eff) {
            return Err(Error::InvalidCoupling(name));
        }
        Ok(Self {
            name,
            windings,
            coupling,
        })
    }

    pub fn windings(&self) -> &[Inductor] {
        &self.windings
    }

    fn mutual(&self, i: usize, j: usize) -> f64 {
        self.coupling[i][j] * (self.windings[i].inductance * self.windings[j].inductance).sqrt()
    }
}

fn effective_inductance_matrix(windings: &[Inductor], coupling: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = windings.len();
    let mut m = vec![vec![0.0; n]; n];
    for i in 0..n {
        m[i][i] = windings[i].inductance;
        for j in 0..n {
            if i != j {
                m[i][j] = coupling[i][j] * (windings[i].inductance * windings[j].inductance).sqrt();
            }
        }
    }
    m
}

/// Cholesky-style PSD check: symmetric, and every leading principal minor
/// determinant is nonnegative (computed directly since groups are small,
/// typically 2-4 windings).
fn is_symmetric_psd(m: &[Vec<f64>]) -> bool {
    let n = m.len();
    for i in 0..n {
        for j in 0..n {
            if (m[i][j] - m[j][i]).abs() > 1e-9 {
                return false;
            }
        }
    }
    // Symmetric Gaussian elimination with no pivoting; bail out on a
    // negative or (numerically) zero pivot.
    let mut a = m.to_vec();
    for k in 0..n {
        if a[k][k] < -1e-12 {
            return false;
        }
        let pivot = a[k][k].max(1e-300);
        for i in (k + 1)..n {
            let factor = a[i][k] / pivot;
            for j in k..n {
                a[i][j] -= factor * a[k][j];
            }
        }
    }
    true
}

impl Element for CoupledInductorGroup {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        for winding in &mut self.windings {
            winding.resolve_nodes(nodes);
        }
    }

    fn num_branches(&self) -> usize {
        self.windings.len()
    }
}

impl Stamper for CoupledInductorGroup {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext) {
        for winding in &self.windings {
            winding.stamp(mna, ctx);
        }
        let dt = ctx
            .dt
            .expect("coupled inductor group requires a timestep (DC solve treats windings as wires)");
        let n = self.windings.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let m_ij = self.mutual(i, j);
                if m_ij == 0.0 {
                    continue;
                }
                let meq = match ctx.integrator {
                    spicier_core::IntegratorMethod::BackwardEuler => m_ij / dt,
                    spicier_core::IntegratorMethod::Trapezoidal => 2.0 * m_ij / dt,
                };
                let bi = self.windings[i].branch();
                let bj = self.windings[j].branch();
                mna.stamp(Some(bi.index()), Some(bj.index()), -meq);
                mna.stamp(Some(bj.index()), Some(bi.index()), -meq);

                let (i_prev_j, v_prev_j) = self.windings[j].history_state();
                let (i_prev_i, v_prev_i) = self.windings[i].history_state();
                let cross_i = match ctx.integrator {
                    spicier_core::IntegratorMethod::BackwardEuler => meq * i_prev_j,
                    spicier_core::IntegratorMethod::Trapezoidal => meq * i_prev_j + v_prev_j,
                };
                let cross_j = match ctx.integrator {
                    spicier_core::IntegratorMethod::BackwardEuler => meq * i_prev_i,
                    spicier_core::IntegratorMethod::Trapezoidal => meq * i_prev_i + v_prev_i,
                };
                mna.stamp_rhs(Some(bi.index()), cross_i);
                mna.stamp_rhs(Some(bj.index()), cross_j);
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn branch_currents(&self) -> Vec<(String, usize)> {
        self.windings
            .iter()
            .map(|w| (w.name.clone(), w.branch().index()))
            .collect()
    }
}

impl Reactive for CoupledInductorGroup {
    fn advance(&self, ctx: &AssemblyContext) {
        for winding in &self.windings {
            winding.advance(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfectly_coupled_equal_windings_are_psd() {
        let a = Inductor::new("La", "p1", "s1", 1e-3, None);
        let b = Inductor::new("Lb", "p2", "s2", 1e-3, None);
        let group = CoupledInductorGroup::new("T1", vec![a, b], vec![vec![0.0, 0.99], vec![0.99, 0.0]]);
        assert!(group.is_ok());
    }

    #[test]
    fn overcoupled_windings_are_rejected() {
        let a = Inductor::new("La", "p1", "s1", 1e-3, None);
        let b = Inductor::new("Lb", "p2", "s2", 1e-3, None);
        // k > 1 makes the effective matrix indefinite.
        let group = CoupledInductorGroup::new("T1", vec![a, b], vec![vec![0.0, 1.5], vec![1.5, 0.0]]);
        assert!(matches!(group, Err(Error::InvalidCoupling(_))));
    }
}
