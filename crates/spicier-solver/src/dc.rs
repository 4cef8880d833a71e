//! DC operating-point solve: the starting point for every transient run.
//!
//! The general case reuses the Newton loop at a synthetic, very large `dt`
//! so that every reactive companion model degenerates to its DC limit
//! (`Geq -> 0` opens a capacitor, `Req -> 0` shorts an inductor) without a
//! separate `dt = None` stamping path. A circuit with no explicit initial
//! conditions on any reactive device always takes this path.
//!
//! A circuit where at least one capacitor or inductor declares an `ic`
//! skips the resistive solve entirely and seeds the starting guess directly
//! from the declared conditions, then uses that seeded point as the Newton
//! warm start. This is what lets an undriven LC circuit keep the energy its
//! `ic` describes instead of being discovered as zero by a DC solve that
//! sees only an open capacitor and a shorted inductor.

use nalgebra::DVector;
use spicier_core::IntegratorMethod;

use crate::circuit::RuntimeCircuit;
use crate::error::Result;
use crate::newton::{self, NewtonParams};

/// Synthetic timestep used for the resistive DC solve; large enough that
/// `C/dt` and `L/dt` companion terms vanish relative to any realistic
/// circuit conductance.
pub const DC_DT: f64 = 1e12;

/// Solve for the operating point at `t = 0`.
///
/// If any reactive device declares an explicit initial condition, `x(0)` is
/// seeded directly from those conditions (the "uic" path) and returned as
/// is, with the resistive solve skipped entirely. Running that seeded point
/// through a companion-model solve at [`DC_DT`] would not reproduce it: a
/// huge-but-finite `Geq = C/dt` still dominates any real conductance a
/// capacitor is shunted by, pulling its voltage back toward whatever a pure
/// resistive divide would give rather than holding the declared value. Any
/// node voltage the ic doesn't pin is left at zero here and picked up
/// correctly by the first real transient step, which solves with the
/// actual `dt` and this vector as the previous state.
///
/// Otherwise a Newton solve at [`DC_DT`] finds the usual resistive
/// operating point.
pub fn solve(circuit: &mut RuntimeCircuit, integrator: IntegratorMethod, params: &NewtonParams) -> Result<DVector<f64>> {
    let size = circuit.mna.size();
    let mut seeded = DVector::zeros(size);
    let has_explicit_ic = circuit
        .reactive
        .iter()
        .map(|device| device.seed_initial_condition(&mut seeded))
        .fold(false, |any, did| any || did);

    if has_explicit_ic {
        return Ok(seeded);
    }

    let x0 = DVector::zeros(size);
    newton::solve(circuit, 0.0, Some(DC_DT), integrator, &x0, params).map(|r| r.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicier_core::{Circuit, ComponentSpec, Waveform};

    #[test]
    fn resistor_divider_dc_point_matches_voltage_division() {
        let mut circuit = Circuit::new();
        circuit
            .push(ComponentSpec::VoltageSource {
                name: "V1".into(),
                n1: "in".into(),
                n2: "0".into(),
                waveform: Waveform::Const(10.0),
            })
            .push(ComponentSpec::Resistor {
                name: "R1".into(),
                n1: "in".into(),
                n2: "out".into(),
                resistance: 10_000.0,
            })
            .push(ComponentSpec::Resistor {
                name: "R2".into(),
                n1: "out".into(),
                n2: "0".into(),
                resistance: 5_000.0,
            });
        let mut runtime = crate::circuit::build(&circuit).unwrap();
        let x = solve(&mut runtime, IntegratorMethod::BackwardEuler, &NewtonParams::default()).unwrap();
        let out_idx = runtime.mna.nodes().get("out").unwrap().mna_index().unwrap();
        assert!((x[out_idx] - 3.3333).abs() < 1e-2);
    }

    #[test]
    fn undriven_capacitor_with_ic_keeps_its_declared_voltage() {
        let mut circuit = Circuit::new();
        circuit
            .push(ComponentSpec::Capacitor {
                name: "C1".into(),
                n1: "a".into(),
                n2: "0".into(),
                capacitance: 1e-6,
                ic: Some(5.0),
            })
            .push(ComponentSpec::Resistor {
                name: "R1".into(),
                n1: "a".into(),
                n2: "0".into(),
                resistance: 1_000.0,
            });
        let mut runtime = crate::circuit::build(&circuit).unwrap();
        let x = solve(&mut runtime, IntegratorMethod::BackwardEuler, &NewtonParams::default()).unwrap();
        let a_idx = runtime.mna.nodes().get("a").unwrap().mna_index().unwrap();
        assert!((x[a_idx] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn undriven_inductor_with_ic_keeps_its_declared_current() {
        let mut circuit = Circuit::new();
        circuit
            .push(ComponentSpec::Inductor {
                name: "L1".into(),
                n1: "a".into(),
                n2: "0".into(),
                inductance: 1e-3,
                ic: Some(2.0),
            })
            .push(ComponentSpec::Resistor {
                name: "R1".into(),
                n1: "a".into(),
                n2: "0".into(),
                resistance: 1.0,
            });
        let mut runtime = crate::circuit::build(&circuit).unwrap();
        let x = solve(&mut runtime, IntegratorMethod::BackwardEuler, &NewtonParams::default()).unwrap();
        // The inductor's branch-current unknown sits right after the
        // node-voltage block.
        let num_nodes = runtime.mna.num_nodes();
        assert!((x[num_nodes] - 2.0).abs() < 1e-6);
    }
}
