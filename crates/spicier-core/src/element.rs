//! The device/solver seam: every component (linear or nonlinear) implements
//! [`Stamper`] to contribute its entries into the assembled system.
//!
//! This mirrors the trait boundary between device crates and the MNA
//! assembler: devices never touch `SparseMatrix` directly, only through
//! the handle an [`AssemblyContext`] hands them, so the assembler stays
//! free to change its internal representation without breaking devices.

use nalgebra::DVector;

use crate::mna::MnaSystem;
use crate::node::NodeId;

/// Which implicit integration formula is currently active. Reactive
/// devices use this to pick their companion-model coefficients; it is
/// shared vocabulary between the device crate and the solver so neither
/// needs to depend on the other's internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorMethod {
    BackwardEuler,
    Trapezoidal,
}

/// Everything a device needs to know to stamp itself at a given instant:
/// the current solution guess (for nonlinear devices evaluating at the
/// Newton iterate), the simulation time (for sources), the timestep and
/// integrator method (for companion models), and a shared conductance
/// floor (`gmin`) applied across all nonlinear devices during Gmin
/// stepping.
pub struct AssemblyContext<'a> {
    pub solution: &'a DVector<f64>,
    pub time: f64,
    pub dt: Option<f64>,
    pub integrator: IntegratorMethod,
    pub gmin: f64,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(
        solution: &'a DVector<f64>,
        time: f64,
        dt: Option<f64>,
        integrator: IntegratorMethod,
        gmin: f64,
    ) -> Self {
        Self {
            solution,
            time,
            dt,
            integrator,
            gmin,
        }
    }

    /// Voltage at `node` under the current solution guess (0 at ground).
    pub fn voltage_at(&self, node: NodeId) -> f64 {
        match node.mna_index() {
            Some(i) => self.solution[i],
            None => 0.0,
        }
    }

    /// Branch current carried by an extra MNA unknown at row `index`.
    pub fn branch_current(&self, index: usize) -> f64 {
        self.solution[index]
    }
}

/// A component contributes matrix/RHS entries for one assembly pass.
///
/// `stamp` is called once per Newton iteration (or once, for purely linear
/// devices with no dependence on `ctx.solution`); implementations should be
/// idempotent given the same `ctx`, since the assembler may re-stamp after
/// a rejected step or a Gmin increment.
pub trait Stamper {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext);

    /// Human-readable name used in error messages (`RegionInconsistency`,
    /// convergence diagnostics).
    fn name(&self) -> &str;

    /// Named branch-current unknowns this device owns, if any (a voltage
    /// source or inductor reports its own branch; a coupled winding group
    /// reports one per winding). Used to label result samples by name
    /// instead of raw MNA row index. Most devices own no branch.
    fn branch_currents(&self) -> Vec<(String, usize)> {
        Vec::new()
    }
}

/// A device with per-step companion-model history (capacitor, inductor,
/// coupled-inductor group). Called exactly once per accepted step, after
/// the solution has converged, so it can push `(v, i)` onto its history.
pub trait Reactive {
    fn advance(&self, ctx: &AssemblyContext);

    /// If this device carries a user-declared initial condition, write it
    /// directly into `x` and return `true`. Used by the DC operating-point
    /// solver to seed an undriven reactive circuit's initial energy instead
    /// of discovering it through a resistive solve, which would see an
    /// open-circuit capacitor or a shorted inductor and settle on zero.
    /// The default implementation declares no initial condition.
    fn seed_initial_condition(&self, _x: &mut DVector<f64>) -> bool {
        false
    }
}

/// Marker trait for anything that can be registered into a [`crate::netlist::Circuit`]
/// and later produce a [`Stamper`]. Kept separate from `Stamper` so device
/// crates can build a component (which must know its node names) before the
/// node map exists, then resolve it into a stamped form once assembly begins.
pub trait Element {
    /// Resolve symbolic node names against `nodes`, registering any unseen
    /// names if the map is not yet frozen.
    fn resolve_nodes(&mut self, nodes: &mut crate::node::NodeMap);

    /// Number of extra branch-current unknowns this element contributes
    /// (0 for elements with no internal branch variable).
    fn num_branches(&self) -> usize {
        0
    }
}
