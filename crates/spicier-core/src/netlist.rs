//! The external, data-only netlist representation: `Circuit` and
//! `ComponentSpec`. This is the stable boundary a text parser, a JSON
//! loader, or a hand-built test fixture all produce the same shape
//! against; nothing in this module knows how to stamp itself into an
//! `MnaSystem` — that lives with the concrete device implementations.

use serde::{Deserialize, Serialize};

/// A source waveform evaluated at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Waveform {
    Const(f64),
    Sine {
        offset: f64,
        amplitude: f64,
        freq_hz: f64,
        phase_rad: f64,
    },
    Pulse {
        v1: f64,
        v2: f64,
        td: f64,
        tr: f64,
        tf: f64,
        pw: f64,
        per: f64,
    },
    Pwl(Vec<(f64, f64)>),
}

impl Waveform {
    pub fn sine(offset: f64, amplitude: f64, freq_hz: f64) -> Self {
        Waveform::Sine {
            offset,
            amplitude,
            freq_hz,
            phase_rad: 0.0,
        }
    }

    pub fn pulse(v1: f64, v2: f64, td: f64, tr: f64, tf: f64, pw: f64, per: f64) -> Self {
        Waveform::Pulse {
            v1,
            v2,
            td,
            tr,
            tf,
            pw,
            per,
        }
    }

    pub fn pwl(points: Vec<(f64, f64)>) -> Self {
        Waveform::Pwl(points)
    }

    /// Evaluate the waveform at time `t` (seconds).
    pub fn eval(&self, t: f64) -> f64 {
        match self {
            Waveform::Const(v) => *v,
            Waveform::Sine {
                offset,
                amplitude,
                freq_hz,
                phase_rad,
            } => offset + amplitude * (std::f64::consts::TAU * freq_hz * t + phase_rad).sin(),
            Waveform::Pulse {
                v1,
                v2,
                td,
                tr,
                tf,
                pw,
                per,
            } => eval_pulse(*v1, *v2, *td, *tr, *tf, *pw, *per, t),
            Waveform::Pwl(points) => eval_pwl(points, t),
        }
    }
}

fn eval_pulse(v1: f64, v2: f64, td: f64, tr: f64, tf: f64, pw: f64, per: f64, t: f64) -> f64 {
    if t < td {
        return v1;
    }
    let phase = if per > 0.0 { (t - td) % per } else { t - td };
    if phase < tr {
        if tr <= 0.0 {
            v2
        } else {
            v1 + (v2 - v1) * (phase / tr)
        }
    } else if phase < tr + pw {
        v2
    } else if phase < tr + pw + tf {
        if tf <= 0.0 {
            v1
        } else {
            v2 + (v1 - v2) * ((phase - tr - pw) / tf)
        }
    } else {
        v1
    }
}

fn eval_pwl(points: &[(f64, f64)], t: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    if t <= points[0].0 {
        return points[0].1;
    }
    if let Some(&(_, last_v)) = points.last() {
        if t >= points[points.len() - 1].0 {
            return last_v;
        }
    }
    for w in points.windows(2) {
        let (t0, v0) = w[0];
        let (t1, v1) = w[1];
        if t >= t0 && t <= t1 {
            if (t1 - t0).abs() < f64::EPSILON {
                return v1;
            }
            return v0 + (v1 - v0) * (t - t0) / (t1 - t0);
        }
    }
    points.last().unwrap().1
}

/// A single coupled-inductor winding within a [`ComponentSpec::CoupledInductors`] group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winding {
    pub name: String,
    pub n1: String,
    pub n2: String,
    pub inductance: f64,
}

/// One circuit element, named, with ordered node references and immutable
/// device parameters. Per-step mutable state lives with the concrete
/// device object built from this spec, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentSpec {
    Resistor {
        name: String,
        n1: String,
        n2: String,
        resistance: f64,
    },
    Capacitor {
        name: String,
        n1: String,
        n2: String,
        capacitance: f64,
        ic: Option<f64>,
    },
    Inductor {
        name: String,
        n1: String,
        n2: String,
        inductance: f64,
        ic: Option<f64>,
    },
    CoupledInductors {
        name: String,
        windings: Vec<Winding>,
        /// Symmetric coupling-coefficient matrix, `k[i][j] in [-1, 1]`.
        coupling: Vec<Vec<f64>>,
    },
    VoltageSource {
        name: String,
        n1: String,
        n2: String,
        waveform: Waveform,
    },
    CurrentSource {
        name: String,
        n1: String,
        n2: String,
        waveform: Waveform,
    },
    Diode {
        name: String,
        anode: String,
        cathode: String,
        vf: f64,
        ron: f64,
        roff: f64,
    },
    Mosfet {
        name: String,
        drain: String,
        gate: String,
        source: String,
        vth: f64,
        kp: f64,
        ron: f64,
        roff: f64,
    },
}

impl ComponentSpec {
    pub fn name(&self) -> &str {
        match self {
            ComponentSpec::Resistor { name, .. }
            | ComponentSpec::Capacitor { name, .. }
            | ComponentSpec::Inductor { name, .. }
            | ComponentSpec::CoupledInductors { name, .. }
            | ComponentSpec::VoltageSource { name, .. }
            | ComponentSpec::CurrentSource { name, .. }
            | ComponentSpec::Diode { name, .. }
            | ComponentSpec::Mosfet { name, .. } => name,
        }
    }

    /// Node names this component references, in canonical order.
    pub fn nodes(&self) -> Vec<&str> {
        match self {
            ComponentSpec::Resistor { n1, n2, .. }
            | ComponentSpec::Capacitor { n1, n2, .. }
            | ComponentSpec::Inductor { n1, n2, .. }
            | ComponentSpec::VoltageSource { n1, n2, .. }
            | ComponentSpec::CurrentSource { n1, n2, .. } => vec![n1, n2],
            ComponentSpec::CoupledInductors { windings, .. } => {
                windings.iter().flat_map(|w| vec![w.n1.as_str(), w.n2.as_str()]).collect()
            }
            ComponentSpec::Diode { anode, cathode, .. } => vec![anode, cathode],
            ComponentSpec::Mosfet {
                drain,
                gate,
                source,
                ..
            } => vec![drain, gate, source],
        }
    }
}

/// An ordered sequence of components: the full, parser-independent
/// netlist representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Circuit {
    pub components: Vec<ComponentSpec>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: ComponentSpec) -> &mut Self {
        self.components.push(component);
        self
    }
}
