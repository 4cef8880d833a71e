//! Linear two-terminal devices: resistor, capacitor, inductor.
//!
//! Capacitor and inductor carry their own companion-model history
//! (`v_prev`/`i_prev`) in a `Cell` so `stamp` can take `&self` like every
//! other device, while `advance` (called once per accepted step) updates
//! it. This keeps per-device state colocated with the device instead of
//! needing a side table keyed by name.

use std::cell::Cell;

use spicier_core::{AssemblyContext, BranchId, Element, IntegratorMethod, MnaSystem, NodeId, NodeMap, Reactive, Stamper};

pub struct Resistor {
    pub name: String,
    n1: String,
    n2: String,
    a: NodeId,
    b: NodeId,
    pub resistance: f64,
}

impl Resistor {
    pub fn new(name: impl Into<String>, n1: impl Into<String>, n2: impl Into<String>, resistance: f64) -> Self {
        Self {
            name: name.into(),
            n1: n1.into(),
            n2: n2.into(),
            a: NodeId::GROUND,
            b: NodeId::GROUND,
            resistance,
        }
    }
}

impl Element for Resistor {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.a = nodes.resolve(&self.n1);
        self.b = nodes.resolve(&self.n2);
    }
}

impl Stamper for Resistor {
    fn stamp(&self, mna: &mut MnaSystem, _ctx: &AssemblyContext) {
        mna.stamp_conductance(self.a, self.b, 1.0 / self.resistance);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Capacitor with Backward-Euler/Trapezoidal companion model, history
/// stored as `(v_prev, i_prev)`.
pub struct Capacitor {
    pub name: String,
    n1: String,
    n2: String,
    a: NodeId,
    b: NodeId,
    pub capacitance: f64,
    ic: Option<f64>,
    history: Cell<(f64, f64)>,
}

impl Capacitor {
    pub fn new(
        name: impl Into<String>,
        n1: impl Into<String>,
        n2: impl Into<String>,
        capacitance: f64,
        ic: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            n1: n1.into(),
            n2: n2.into(),
            a: NodeId::GROUND,
            b: NodeId::GROUND,
            capacitance,
            ic,
            history: Cell::new((ic.unwrap_or(0.0), 0.0)),
        }
    }

    /// The user-declared initial voltage, if any (distinct from history,
    /// which defaults to 0 even when no `ic` was given).
    pub fn initial_condition(&self) -> Option<f64> {
        self.ic
    }

    pub fn nodes(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    /// Companion (Geq, Ieq) per spec §3: BE uses `Geq = C/dt`, TR uses
    /// `Geq = 2C/dt`; `Ieq` folds in history so that stamping it as a
    /// current source at the rhs reproduces `i = Geq*v + Ieq`.
    fn companion(&self, dt: f64, method: IntegratorMethod) -> (f64, f64) {
        let (v_prev, i_prev) = self.history.get();
        match method {
            IntegratorMethod::BackwardEuler => {
                let geq = self.capacitance / dt;
                (geq, -geq * v_prev)
            }
            IntegratorMethod::Trapezoidal => {
                let geq = 2.0 * self.capacitance / dt;
                (geq, -geq * v_prev - i_prev)
            }
        }
    }

    /// Called once per accepted step with the converged terminal voltage
    /// and the current computed from the companion relation.
    pub fn record_history(&self, v: f64, dt: f64, method: IntegratorMethod) {
        let (geq, ieq) = self.companion(dt, method);
        let i = geq * v + ieq;
        self.history.set((v, i));
    }

    pub fn voltage_history(&self) -> f64 {
        self.history.get().0
    }
}

impl Element for Capacitor {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.a = nodes.resolve(&self.n1);
        self.b = nodes.resolve(&self.n2);
    }
}

impl Stamper for Capacitor {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext) {
        let dt = ctx.dt.expect("capacitor requires a timestep (DC solve treats it as open)");
        let (geq, ieq) = self.companion(dt, ctx.integrator);
        mna.stamp_conductance(self.a, self.b, geq);
        // Current source Ieq flows from b to a (matches i = Geq*v + Ieq with
        // v = v(a) - v(b)).
        mna.stamp_current_source(self.a, self.b, ieq);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Reactive for Capacitor {
    fn advance(&self, ctx: &AssemblyContext) {
        let v = ctx.voltage_at(self.a) - ctx.voltage_at(self.b);
        let dt = ctx.dt.expect("advance requires a timestep");
        self.record_history(v, dt, ctx.integrator);
    }

    fn seed_initial_condition(&self, x: &mut nalgebra::DVector<f64>) -> bool {
        let Some(ic) = self.ic else { return false };
        // Only the single-grounded-terminal case can be seeded by writing
        // one node voltage directly; a floating capacitor's ic constrains a
        // voltage difference, not a node value, and is left to the DC solve.
        match (self.a.mna_index(), self.b.mna_index()) {
            (Some(i), None) => {
                x[i] = ic;
                true
            }
            (None, Some(i)) => {
                x[i] = -ic;
                true
            }
            _ => false,
        }
    }
}

/// Inductor with a branch-current unknown and Thevenin companion model
/// (`Req`, `Veq`), per spec §3/§4.2 -- unlike a Norton-form capacitor, an
/// inductor's branch current is an explicit MNA unknown so mutual
/// couplings between inductors can stamp directly against it.
pub struct Inductor {
    pub name: String,
    n1: String,
    n2: String,
    a: NodeId,
    b: NodeId,
    branch: Cell<Option<BranchId>>,
    pub inductance: f64,
    ic: Option<f64>,
    history: Cell<(f64, f64)>, // (i_prev, v_prev)
}

impl Inductor {
    pub fn new(
        name: impl Into<String>,
        n1: impl Into<String>,
        n2: impl Into<String>,
        inductance: f64,
        ic: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            n1: n1.into(),
            n2: n2.into(),
            a: NodeId::GROUND,
            b: NodeId::GROUND,
            branch: Cell::new(None),
            inductance,
            ic,
            history: Cell::new((ic.unwrap_or(0.0), 0.0)),
        }
    }

    /// The user-declared initial current, if any.
    pub fn initial_condition(&self) -> Option<f64> {
        self.ic
    }

    pub fn nodes(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    pub fn set_branch(&self, branch: BranchId) {
        self.branch.set(Some(branch));
    }

    pub fn branch(&self) -> BranchId {
        self.branch.get().expect("inductor branch not assigned before assembly")
    }

    pub(crate) fn history_state(&self) -> (f64, f64) {
        self.history.get()
    }

    /// `(Req, Veq)` per spec §3: BE uses `Req = L/dt`, TR uses
    /// `Req = 2L/dt`.
    pub(crate) fn companion(&self, dt: f64, method: IntegratorMethod) -> (f64, f64) {
        let (i_prev, v_prev) = self.history.get();
        match method {
            IntegratorMethod::BackwardEuler => {
                let req = self.inductance / dt;
                (req, req * i_prev)
            }
            IntegratorMethod::Trapezoidal => {
                let req = 2.0 * self.inductance / dt;
                (req, req * i_prev + v_prev)
            }
        }
    }

    pub fn record_history(&self, i: f64, v: f64) {
        self.history.set((i, v));
    }

    pub fn current_history(&self) -> f64 {
        self.history.get().0
    }
}

impl Element for Inductor {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.a = nodes.resolve(&self.n1);
        self.b = nodes.resolve(&self.n2);
    }

    fn num_branches(&self) -> usize {
        1
    }
}

impl Stamper for Inductor {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext) {
        let dt = ctx.dt.expect("inductor requires a timestep (DC solve treats it as a wire)");
        let branch = self.branch();
        mna.stamp_branch_kcl(self.a, self.b, branch);
        let (req, veq) = self.companion(dt, ctx.integrator);
        mna.stamp_branch_kvl(branch, req, veq);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn branch_currents(&self) -> Vec<(String, usize)> {
        vec![(self.name.clone(), self.branch().index())]
    }
}

impl Reactive for Inductor {
    fn advance(&self, ctx: &AssemblyContext) {
        let i = ctx.branch_current(self.branch().index());
        let v = ctx.voltage_at(self.a) - ctx.voltage_at(self.b);
        self.record_history(i, v);
    }

    fn seed_initial_condition(&self, x: &mut nalgebra::DVector<f64>) -> bool {
        let Some(ic) = self.ic else { return false };
        x[self.branch().index()] = ic;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicier_core::{MnaSystem, NodeMap};

    #[test]
    fn resistor_stamp_matches_four_quadrant_pattern() {
        let mut nodes = NodeMap::new();
        nodes.resolve("a");
        nodes.resolve("b");
        nodes.freeze();
        let mut r = Resistor::new("R1", "a", "b", 100.0);
        r.resolve_nodes(&mut nodes);

        let mut mna = MnaSystem::new(nodes, 0);
        mna.begin_assembly();
        let solution = nalgebra::DVector::zeros(2);
        let ctx = AssemblyContext::new(&solution, 0.0, None, IntegratorMethod::BackwardEuler, 0.0);
        r.stamp(&mut mna, &ctx);
        mna.finalize_assembly();

        assert_eq!(mna.matrix().get(0, 0), 0.01);
        assert_eq!(mna.matrix().get(0, 1), -0.01);
    }

    #[test]
    fn capacitor_backward_euler_companion_matches_formula() {
        let cap = Capacitor::new("C1", "a", "0", 1e-6, Some(2.0));
        let (geq, ieq) = cap.companion(1e-3, IntegratorMethod::BackwardEuler);
        assert!((geq - 1e-3).abs() < 1e-12);
        assert!((ieq - (-1e-3 * 2.0)).abs() < 1e-12);
    }
}
