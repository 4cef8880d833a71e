//! Tracks the active integration method and timestep, and decides when a
//! Δt change is large enough to require re-stamping companion models from
//! scratch versus reusing cached coefficients.
//!
//! Per-element companion history (`v_prev`, `i_prev`) lives on the device
//! objects themselves (see `spicier_devices::passive`); this type only
//! holds the method/Δt state that is global to a step.

use spicier_core::IntegratorMethod;

/// Relative tolerance below which a Δt change is considered
/// insignificant and cached companion coefficients may be reused.
pub const DT_REUSE_TOLERANCE: f64 = 1e-9;

pub struct Integrator {
    method: IntegratorMethod,
    last_dt: Option<f64>,
}

impl Integrator {
    pub fn new(method: IntegratorMethod) -> Self {
        Self { method, last_dt: None }
    }

    pub fn method(&self) -> IntegratorMethod {
        self.method
    }

    /// Record the Δt used for the step about to be assembled. Returns
    /// `true` if this counts as a "new" Δt (outside `DT_REUSE_TOLERANCE`
    /// of the last one), which devices may use to know a full
    /// re-linearization (rather than a cached companion) is required.
    pub fn set_dt(&mut self, dt: f64) -> bool {
        let changed = match self.last_dt {
            None => true,
            Some(prev) => ((dt - prev) / prev).abs() > DT_REUSE_TOLERANCE,
        };
        self.last_dt = Some(dt);
        changed
    }

    pub fn last_dt(&self) -> Option<f64> {
        self.last_dt
    }
}

/// Local truncation error estimate via the "Milne device": the
/// discrepancy between a Backward-Euler and a Trapezoidal solution taken
/// over the same step is proportional to the per-step error of the
/// (lower-order) method, and gives a cheap step-size-control signal
/// without computing a third, higher-order solution.
pub fn estimate_lte(be_solution: &nalgebra::DVector<f64>, tr_solution: &nalgebra::DVector<f64>) -> f64 {
    use spicier_core::VectorOps;
    let mut diff = be_solution.clone();
    diff.minus(tr_solution);
    diff.norm_inf()
}
