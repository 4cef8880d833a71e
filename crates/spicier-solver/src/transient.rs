//! Fixed-grid time-stepping engine: the main Newton-solve / event-scan /
//! advance loop, plus an adaptive variant layering LTE-controlled step
//! sizing on top of the same machinery.

use std::time::{Duration, Instant};

use log::debug;
use nalgebra::DVector;
use spicier_core::IntegratorMethod;

use crate::circuit::RuntimeCircuit;
use crate::dc;
use crate::error::{Error, Result};
use crate::event_detector::{self, MIN_DT};
use crate::integrator::{estimate_lte, Integrator};
use crate::newton::{self, NewtonParams};
use crate::result::{ResultSink, StepSample};

/// Largest Δt the growth rule will reach.
pub const DT_MAX: f64 = 1e-3;
/// Grow Δt after this many consecutive clean, fast-converging steps.
const GROWTH_STREAK: usize = 3;
/// A step converging within this many iterations counts toward the streak.
const FAST_ITER_THRESHOLD: usize = 3;
/// A step taking more than this many iterations is treated like a slow
/// convergence and shrinks Δt even though it technically succeeded.
const SLOW_ITER_THRESHOLD: usize = 20;
const GROWTH_FACTOR: f64 = 1.5;
const SHRINK_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    LocatingEvent,
    Done,
    Failed,
}

/// Optional halting conditions checked between steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunBudget {
    pub max_steps: Option<usize>,
    pub wall_clock: Option<Duration>,
}

pub struct TransientEngine {
    integrator: Integrator,
    params: NewtonParams,
    state: EngineState,
    clean_streak: usize,
}

impl TransientEngine {
    pub fn new(method: IntegratorMethod, params: NewtonParams) -> Self {
        Self {
            integrator: Integrator::new(method),
            params,
            state: EngineState::Idle,
            clean_streak: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Run a fixed-grid transient from `t=0` to `t_end`, starting from the
    /// DC operating point, with Δt adapting between `dt_init` and
    /// [`DT_MAX`] per the growth/shrink rule.
    pub fn run(
        &mut self,
        circuit: &mut RuntimeCircuit,
        t_end: f64,
        dt_init: f64,
        sink: &mut dyn ResultSink,
        budget: RunBudget,
    ) -> Result<()> {
        if dt_init <= 0.0 {
            return Err(Error::InvalidParameter("Δt_init must be positive".into()));
        }

        self.state = EngineState::Running;
        let method = self.integrator.method();

        let mut x = match dc::solve(circuit, method, &self.params) {
            Ok(x) => x,
            Err(e) => {
                self.state = EngineState::Failed;
                return Err(e);
            }
        };
        sink.accept(StepSample::from_solution(circuit, 0.0, &x, false))?;

        let mut t = 0.0;
        let mut dt = dt_init;
        let started = Instant::now();
        let mut steps_taken = 0usize;

        while t < t_end {
            if let Some(max_steps) = budget.max_steps {
                if steps_taken >= max_steps {
                    self.state = EngineState::Done;
                    return Err(Error::Cancelled {
                        reason: format!("step budget of {max_steps} exhausted at t={t:.3e}"),
                    });
                }
            }
            if let Some(deadline) = budget.wall_clock {
                if started.elapsed() > deadline {
                    self.state = EngineState::Done;
                    return Err(Error::Cancelled {
                        reason: format!("wall-clock deadline exceeded at t={t:.3e}"),
                    });
                }
            }

            let dt_step = dt.min(t_end - t);
            let step = self.take_step(circuit, t, dt_step, &x, method);
            let (t_next, x_next, gmin_used, event_fired, iterations) = match step {
                Ok(outcome) => outcome,
                Err(Error::NonConvergence { .. }) => {
                    dt *= SHRINK_FACTOR;
                    if dt < MIN_DT {
                        self.state = EngineState::Failed;
                        return Err(Error::TimestepTooSmall { t, dt });
                    }
                    self.clean_streak = 0;
                    continue;
                }
                Err(e) => {
                    self.state = EngineState::Failed;
                    return Err(e);
                }
            };

            self.integrator.set_dt(t_next - t);
            advance_reactive(circuit, &x_next, t_next, dt, method);
            sink.accept(StepSample::from_solution(circuit, t_next, &x_next, gmin_used))?;

            t = t_next;
            x = x_next;
            steps_taken += 1;

            if event_fired || iterations > SLOW_ITER_THRESHOLD {
                self.clean_streak = 0;
                dt = (dt * SHRINK_FACTOR).max(MIN_DT);
            } else if iterations <= FAST_ITER_THRESHOLD {
                self.clean_streak += 1;
                if self.clean_streak >= GROWTH_STREAK {
                    dt = (dt * GROWTH_FACTOR).min(DT_MAX);
                }
            } else {
                self.clean_streak = 0;
            }
        }

        self.state = EngineState::Done;
        Ok(())
    }

    /// Attempt one trial step of `dt` from `(t, x)`, locating and resolving
    /// any device region crossing before returning the accepted sample.
    /// Returns `(t_accepted, x_accepted, gmin_used, event_fired, iterations)`.
    fn take_step(
        &mut self,
        circuit: &mut RuntimeCircuit,
        t: f64,
        dt: f64,
        x: &DVector<f64>,
        method: IntegratorMethod,
    ) -> Result<(f64, DVector<f64>, bool, bool, usize)> {
        let trial = newton::solve(circuit, t + dt, Some(dt), method, x, &self.params)?;

        let pending = event_detector::scan(circuit, x, &trial.x, t, t + dt, method);
        if pending.is_empty() {
            return Ok((t + dt, trial.x, trial.gmin_used, false, trial.iterations));
        }

        self.state = EngineState::LocatingEvent;
        let located = event_detector::locate(circuit, x, t, t + dt, method, &self.params)?;
        for event in &pending {
            let ctx = spicier_core::AssemblyContext::new(&located.x_star, located.t_star, Some(located.t_star - t), method, 0.0);
            circuit.switching[event.device_index].latch_region(&ctx);
        }
        // Re-solve once more at the located time now that regions are
        // latched, so the accepted sample is consistent with the new
        // piecewise-linear segment rather than the pre-latch guess.
        let resolved = newton::solve(circuit, located.t_star, Some(located.t_star - t), method, &located.x_star, &self.params)?;
        self.state = EngineState::Running;
        debug!("event at t={:.6e}, {} device(s) crossed", located.t_star, pending.len());
        Ok((located.t_star, resolved.x, resolved.gmin_used, true, resolved.iterations))
    }

    /// Adaptive variant: the same event handling and Newton machinery, but
    /// Δt is controlled by the Backward-Euler/Trapezoidal discrepancy
    /// (Milne device) rather than the fixed iteration-count heuristic.
    pub fn run_adaptive(
        &mut self,
        circuit: &mut RuntimeCircuit,
        t_end: f64,
        dt_init: f64,
        lte_tol: f64,
        sink: &mut dyn ResultSink,
        budget: RunBudget,
    ) -> Result<AdaptiveStats> {
        if dt_init <= 0.0 {
            return Err(Error::InvalidParameter("Δt_init must be positive".into()));
        }
        self.state = EngineState::Running;

        let mut x = dc::solve(circuit, IntegratorMethod::BackwardEuler, &self.params)?;
        sink.accept(StepSample::from_solution(circuit, 0.0, &x, false))?;

        let mut t = 0.0;
        let mut dt = dt_init;
        let mut stats = AdaptiveStats::default();
        let started = Instant::now();

        while t < t_end {
            if let Some(max_steps) = budget.max_steps {
                if stats.accepted_steps >= max_steps {
                    return Err(Error::Cancelled {
                        reason: format!("step budget of {max_steps} exhausted at t={t:.3e}"),
                    });
                }
            }
            if let Some(deadline) = budget.wall_clock {
                if started.elapsed() > deadline {
                    return Err(Error::Cancelled {
                        reason: format!("wall-clock deadline exceeded at t={t:.3e}"),
                    });
                }
            }

            let dt_step = dt.min(t_end - t);
            let be = newton::solve(circuit, t + dt_step, Some(dt_step), IntegratorMethod::BackwardEuler, &x, &self.params)?;
            let tr = newton::solve(circuit, t + dt_step, Some(dt_step), IntegratorMethod::Trapezoidal, &x, &self.params)?;
            let lte = estimate_lte(&be.x, &tr.x);

            if lte > lte_tol && dt_step > MIN_DT {
                dt = (dt_step * SHRINK_FACTOR).max(MIN_DT);
                stats.rejected_steps += 1;
                continue;
            }

            let pending = event_detector::scan(circuit, &x, &tr.x, t, t + dt_step, IntegratorMethod::Trapezoidal);
            let (t_next, x_next) = if pending.is_empty() {
                (t + dt_step, tr.x)
            } else {
                let located = event_detector::locate(circuit, &x, t, t + dt_step, IntegratorMethod::Trapezoidal, &self.params)?;
                for event in &pending {
                    let ctx = spicier_core::AssemblyContext::new(
                        &located.x_star,
                        located.t_star,
                        Some(located.t_star - t),
                        IntegratorMethod::Trapezoidal,
                        0.0,
                    );
                    circuit.switching[event.device_index].latch_region(&ctx);
                }
                (located.t_star, located.x_star)
            };

            advance_reactive(circuit, &x_next, t_next, t_next - t, IntegratorMethod::Trapezoidal);
            sink.accept(StepSample::from_solution(circuit, t_next, &x_next, tr.gmin_used))?;

            t = t_next;
            x = x_next;
            stats.accepted_steps += 1;

            if lte < lte_tol * 0.1 {
                dt = (dt_step * GROWTH_FACTOR).min(DT_MAX);
            } else {
                dt = dt_step;
            }
        }

        self.state = EngineState::Done;
        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

fn advance_reactive(circuit: &RuntimeCircuit, x: &DVector<f64>, t: f64, dt: f64, method: IntegratorMethod) {
    let ctx = spicier_core::AssemblyContext::new(x, t, Some(dt), method, 0.0);
    for device in &circuit.reactive {
        device.advance(&ctx);
    }
}
