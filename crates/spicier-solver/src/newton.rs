//! Nonlinear solve loop: re-linearize every device at the current guess,
//! solve the resulting linear MNA system for the next guess, apply
//! device-declared step limiting, and check convergence. Falls back to
//! Gmin stepping when plain Newton fails to converge.

use log::warn;
use nalgebra::DVector;
use spicier_core::{AssemblyContext, IntegratorMethod, NodeId, Stamper, VectorOps};

use crate::circuit::RuntimeCircuit;
use crate::error::{Error, Result};

/// Conductance (S) stamped from every node to ground during the one-shot
/// rescue attempt after a singular matrix. Distinct from `ctx.gmin`, which
/// only ever reaches nonlinear device stamping (diodes, MOSFETs) and leaves
/// a node with no such device entirely unrescued.
pub const RESCUE_GROUND_SHUNT: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct NewtonParams {
    pub max_iter: usize,
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub res_tol: f64,
    pub v_clamp: f64,
    pub gmin_start: f64,
    pub gmin_min: f64,
}

impl Default for NewtonParams {
    fn default() -> Self {
        Self {
            max_iter: 50,
            rel_tol: 1e-3,
            abs_tol: 1e-6,
            res_tol: 1e-9,
            v_clamp: 0.5,
            gmin_start: 1e-3,
            gmin_min: 1e-12,
        }
    }
}

pub struct NewtonResult {
    pub x: DVector<f64>,
    pub iterations: usize,
    pub gmin_used: bool,
}

/// Assemble the circuit once at `x`, with `gmin` added to every nonlinear
/// device's conductance and `ground_shunt` added to every node as a blanket
/// conductance to ground, then return the freshly solved guess plus the
/// residual of the *previous* guess under this linearization.
fn assemble_and_solve(
    circuit: &mut RuntimeCircuit,
    x: &DVector<f64>,
    time: f64,
    dt: Option<f64>,
    integrator: IntegratorMethod,
    gmin: f64,
    ground_shunt: f64,
) -> Result<(DVector<f64>, f64)> {
    circuit.mna.begin_assembly();
    {
        let ctx = AssemblyContext::new(x, time, dt, integrator, gmin);
        for stamper in &circuit.stampers {
            stamper.stamp(&mut circuit.mna, &ctx);
        }
    }
    if ground_shunt > 0.0 {
        let node_ids: Vec<NodeId> = circuit.mna.nodes().iter().map(|(_, id)| id).collect();
        for node in node_ids {
            circuit.mna.stamp_conductance(node, NodeId::GROUND, ground_shunt);
        }
    }
    circuit.mna.finalize_assembly();

    let residual = circuit.mna.residual(x).norm_inf();
    let x_next = circuit
        .mna
        .solve()
        .map_err(|_| Error::SingularMatrix { row: usize::MAX })?;
    Ok((x_next, residual))
}

/// Clamp `x_next` so that every switching device's declared terminal
/// voltages move by at most `v_clamp` from `x_prev` in one iteration.
fn limit_update(circuit: &RuntimeCircuit, x_prev: &DVector<f64>, x_next: &mut DVector<f64>, v_clamp: f64) {
    for device in &circuit.switching {
        for idx in device.clamped_node_indices().into_iter().flatten() {
            let delta = x_next[idx] - x_prev[idx];
            if delta.abs() > v_clamp {
                x_next[idx] = x_prev[idx] + delta.signum() * v_clamp;
            }
        }
    }
}

fn converged(x_prev: &DVector<f64>, x_next: &DVector<f64>, residual: f64, params: &NewtonParams) -> bool {
    let mut delta = x_next.clone();
    delta.minus(x_prev);
    let step_ok = delta.norm_inf() < params.rel_tol * x_next.norm_inf() + params.abs_tol;
    step_ok && residual < params.res_tol
}

fn newton_fixed_gmin(
    circuit: &mut RuntimeCircuit,
    time: f64,
    dt: Option<f64>,
    integrator: IntegratorMethod,
    warm_start: &DVector<f64>,
    gmin: f64,
    ground_shunt: f64,
    params: &NewtonParams,
) -> Result<Option<(DVector<f64>, usize)>> {
    let mut x = warm_start.clone();
    for iter in 0..params.max_iter {
        let (mut x_next, _residual_at_x) = assemble_and_solve(circuit, &x, time, dt, integrator, gmin, ground_shunt)?;
        limit_update(circuit, &x, &mut x_next, params.v_clamp);

        // Residual of the *new* guess under a fresh linearization is what
        // decides convergence, since the solve above was linear in x_next.
        let (_, residual_at_next) = assemble_and_solve(circuit, &x_next, time, dt, integrator, gmin, ground_shunt)?;

        if converged(&x, &x_next, residual_at_next, params) {
            return Ok(Some((x_next, iter + 1)));
        }
        x = x_next;
    }
    Ok(None)
}

/// Run Newton iteration, optionally with a blanket `ground_shunt` stamped on
/// every node throughout. Falls back to Gmin stepping (homotopy from
/// `gmin_start` down to `gmin_min`) if plain Newton fails to converge.
fn solve_inner(
    circuit: &mut RuntimeCircuit,
    time: f64,
    dt: Option<f64>,
    integrator: IntegratorMethod,
    warm_start: &DVector<f64>,
    ground_shunt: f64,
    params: &NewtonParams,
) -> Result<NewtonResult> {
    if let Some((x, iterations)) = newton_fixed_gmin(circuit, time, dt, integrator, warm_start, 0.0, ground_shunt, params)? {
        return Ok(NewtonResult {
            x,
            iterations,
            gmin_used: ground_shunt > 0.0,
        });
    }

    let mut gmin = params.gmin_start;
    let mut last_x = warm_start.clone();
    loop {
        match newton_fixed_gmin(circuit, time, dt, integrator, &last_x, gmin, ground_shunt, params)? {
            Some((x, _iterations)) => {
                last_x = x;
                if gmin <= params.gmin_min {
                    return Ok(NewtonResult {
                        x: last_x,
                        iterations: params.max_iter,
                        gmin_used: true,
                    });
                }
                gmin = (gmin * 0.1).max(params.gmin_min);
            }
            None => {
                return Err(Error::NonConvergence {
                    residual: f64::NAN,
                    iterations: params.max_iter,
                });
            }
        }
    }
}

/// Run Newton iteration to find the circuit's solution at `(time, dt)`,
/// starting from `warm_start`. A [`Error::SingularMatrix`] on the first
/// attempt triggers a single local rescue: every node gets a
/// [`RESCUE_GROUND_SHUNT`] conductance to ground and the whole solve (Newton
/// plus its Gmin homotopy fallback) is retried once from the same warm
/// start. A matrix that is still singular under that shunt, or any other
/// error, is propagated as is.
pub fn solve(
    circuit: &mut RuntimeCircuit,
    time: f64,
    dt: Option<f64>,
    integrator: IntegratorMethod,
    warm_start: &DVector<f64>,
    params: &NewtonParams,
) -> Result<NewtonResult> {
    match solve_inner(circuit, time, dt, integrator, warm_start, 0.0, params) {
        Err(Error::SingularMatrix { .. }) => {
            warn!("singular matrix at t={time:.6e}, rescuing with a {RESCUE_GROUND_SHUNT:.0e} S shunt to ground on every node");
            solve_inner(circuit, time, dt, integrator, warm_start, RESCUE_GROUND_SHUNT, params)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use spicier_core::{Circuit, ComponentSpec, Element, NodeMap, Waveform};
    use spicier_devices::Resistor;

    use crate::circuit::RuntimeCircuit;

    #[test]
    fn resistor_divider_converges_in_one_iteration() {
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
        let x0 = DVector::zeros(runtime.mna.size());
        let result = solve(
            &mut runtime,
            0.0,
            None,
            IntegratorMethod::BackwardEuler,
            &x0,
            &NewtonParams::default(),
        )
        .unwrap();
        let out_idx = runtime.mna.nodes().get("out").unwrap().mna_index().unwrap();
        assert!((result.x[out_idx] - 3.3333).abs() < 1e-3);
        // First iteration jumps straight to the exact linear solution but
        // still registers as a large Δx from the zero warm start; the
        // second iteration confirms it is a fixed point.
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn singular_matrix_is_rescued_by_a_blanket_ground_shunt() {
        // Node "a" is tied to ground through R1; node "b" has no stamper
        // touching it at all, so its row and column are entirely zero and
        // the assembled matrix is singular. `circuit::build` would catch
        // this as a disconnected node before it ever reaches the solver,
        // so the runtime circuit is assembled by hand here to exercise the
        // rescue path directly.
        let mut nodes = NodeMap::new();
        nodes.resolve("a");
        nodes.resolve("b");
        nodes.freeze();

        let mut r1 = Resistor::new("R1", "a", "0", 1_000.0);
        r1.resolve_nodes(&mut nodes);

        let mna = spicier_core::MnaSystem::new(nodes, 0);
        let mut runtime = RuntimeCircuit {
            mna,
            stampers: vec![Rc::new(r1)],
            reactive: Vec::new(),
            switching: Vec::new(),
        };

        let x0 = DVector::zeros(runtime.mna.size());
        let result = solve(
            &mut runtime,
            0.0,
            None,
            IntegratorMethod::BackwardEuler,
            &x0,
            &NewtonParams::default(),
        )
        .unwrap();

        assert!(result.gmin_used);
        let b_idx = runtime.mna.nodes().get("b").unwrap().mna_index().unwrap();
        // The only thing holding node "b" at a value is the rescue shunt
        // itself, so it settles right at the reference potential.
        assert!(result.x[b_idx].abs() < 1e-6);
    }
}
