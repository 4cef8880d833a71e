//! The event-function contract switching devices implement so the solver's
//! event detector can scan for region crossings without knowing device
//! internals.

use spicier_core::AssemblyContext;

/// Tie-break ordering when multiple events fire within `EventTol` of each
/// other: ideal switches settle first, then diodes, then MOSFETs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DevicePriority {
    Switch,
    Diode,
    Mosfet,
}

/// A device that can change its piecewise-linear region. Each event
/// function's sign indicates which side of a region boundary the device
/// currently sits on; the solver compares signs before/after a step to
/// detect a crossing.
pub trait Switching {
    /// One scalar per region boundary (diodes have one, MOSFETs have two:
    /// `Vgs - Vth` and `(Vgs - Vth) - Vds`).
    fn event_functions(&self, ctx: &AssemblyContext) -> Vec<f64>;

    fn priority(&self) -> DevicePriority;

    /// Commit to the region implied by the current event-function signs.
    /// Called by the solver after a confirmed crossing, immediately before
    /// the step is re-solved.
    fn latch_region(&self, ctx: &AssemblyContext);

    /// MNA row indices of this device's terminal voltages, whose Newton
    /// update should be clamped to `V_clamp` per step (ground terminals
    /// are `None` and never clamped).
    fn clamped_node_indices(&self) -> Vec<Option<usize>>;
}
