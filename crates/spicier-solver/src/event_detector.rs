//! Zero-crossing scan and bisection localization for device-region
//! transitions.

use nalgebra::DVector;
use spicier_core::{AssemblyContext, IntegratorMethod};

use crate::circuit::RuntimeCircuit;
use crate::error::{Error, Result};
use crate::newton::{self, NewtonParams};

pub const EVENT_TOL: f64 = 1e-12;
pub const MAX_BISECTIONS: usize = 50;
pub const MIN_DT: f64 = 1e-15;

pub struct PendingEvent {
    pub device_index: usize,
}

/// Sign of every event function across every switching device, in a
/// flattened, device-priority order (ties broken by insertion index,
/// matching the deterministic ordering contract).
fn signs(circuit: &RuntimeCircuit, x: &DVector<f64>, time: f64, integrator: IntegratorMethod) -> Vec<Vec<bool>> {
    let ctx = AssemblyContext::new(x, time, None, integrator, 0.0);
    circuit
        .switching
        .iter()
        .map(|d| d.event_functions(&ctx).into_iter().map(|g| g >= 0.0).collect())
        .collect()
}

/// Compare device region signs between the start and end of a converged
/// step; any device whose sign flipped is a pending event. Devices are
/// returned ordered by priority (switch > diode > MOSFET) then insertion
/// index, matching the deterministic tie-break contract.
pub fn scan(
    circuit: &RuntimeCircuit,
    x0: &DVector<f64>,
    x1: &DVector<f64>,
    t0: f64,
    t1: f64,
    integrator: IntegratorMethod,
) -> Vec<PendingEvent> {
    let before = signs(circuit, x0, t0, integrator);
    let after = signs(circuit, x1, t1, integrator);

    let mut pending: Vec<PendingEvent> = before
        .iter()
        .zip(after.iter())
        .enumerate()
        .filter(|(_, (b, a))| b != a)
        .map(|(i, _)| PendingEvent { device_index: i })
        .collect();

    pending.sort_by_key(|e| (circuit.switching[e.device_index].priority(), e.device_index));
    pending
}

pub struct LocatedEvent {
    pub t_star: f64,
    pub x_star: DVector<f64>,
}

/// Bisect `[t0, t1]` to locate the earliest confirmed event, re-solving
/// at the midpoint each iteration with the solver's own Newton loop
/// (a one-step re-solve stands in for the integrator's linear
/// interpolation between samples).
pub fn locate(
    circuit: &mut RuntimeCircuit,
    x0: &DVector<f64>,
    t0: f64,
    t1: f64,
    integrator: IntegratorMethod,
    params: &NewtonParams,
) -> Result<LocatedEvent> {
    let mut lo = t0;
    let mut hi = t1;
    let mut x_lo = x0.clone();
    let mut x_hi_result = newton::solve(circuit, t1, Some(t1 - t0), integrator, x0, params)?.x;

    for _ in 0..MAX_BISECTIONS {
        if hi - lo < EVENT_TOL {
            break;
        }
        if hi - lo < MIN_DT {
            return Err(Error::TimestepTooSmall { t: lo, dt: hi - lo });
        }
        let mid = 0.5 * (lo + hi);
        let dt_mid = mid - lo;
        if dt_mid < MIN_DT {
            return Err(Error::TimestepTooSmall { t: mid, dt: dt_mid });
        }
        let x_mid = newton::solve(circuit, mid, Some(dt_mid), integrator, &x_lo, params)?.x;

        let before = signs(circuit, &x_lo, lo, integrator);
        let mid_signs = signs(circuit, &x_mid, mid, integrator);
        if before == mid_signs {
            lo = mid;
            x_lo = x_mid;
        } else {
            hi = mid;
            x_hi_result = x_mid;
        }
    }

    Ok(LocatedEvent {
        t_star: hi,
        x_star: x_hi_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicier_core::{Circuit, ComponentSpec};

    #[test]
    fn no_switching_devices_means_no_pending_events() {
        let mut circuit = Circuit::new();
        circuit.push(ComponentSpec::Resistor {
            name: "R1".into(),
            n1: "a".into(),
            n2: "0".into(),
            resistance: 100.0,
        });
        let runtime = crate::circuit::build(&circuit).unwrap();
        let x0 = DVector::zeros(runtime.mna.size());
        let x1 = x0.clone();
        let pending = scan(&runtime, &x0, &x1, 0.0, 1e-6, IntegratorMethod::BackwardEuler);
        assert!(pending.is_empty());
    }
}
