//! End-to-end transient scenarios exercising the full
//! netlist -> RuntimeCircuit -> TransientEngine pipeline.

use spicier_core::{Circuit, ComponentSpec, IntegratorMethod, Waveform};
use spicier_solver::{circuit, NewtonParams, ResultSink, RunBudget, TransientEngine, TransientResult};

fn voltage_at(result: &TransientResult, t_index: usize, node: &str) -> f64 {
    result.steps[t_index].node_voltages[node]
}

fn nearest_index(result: &TransientResult, t: f64) -> usize {
    result
        .steps
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.t - t).abs().partial_cmp(&(b.t - t).abs()).unwrap())
        .map(|(i, _)| i)
        .unwrap()
}

#[test]
fn resistor_divider_dc_one_step() {
    let mut c = Circuit::new();
    c.push(ComponentSpec::VoltageSource {
        name: "V1".into(),
        n1: "in".into(),
        n2: "0".into(),
        waveform: Waveform::Const(10.0),
    })
    .push(ComponentSpec::Resistor {
        name: "R1".into(),
        n1: "in".into(),
        n2: "a".into(),
        resistance: 10_000.0,
    })
    .push(ComponentSpec::Resistor {
        name: "R2".into(),
        n1: "a".into(),
        n2: "0".into(),
        resistance: 5_000.0,
    });

    let mut runtime = circuit::build(&c).unwrap();
    let mut engine = TransientEngine::new(IntegratorMethod::BackwardEuler, NewtonParams::default());
    let mut result = TransientResult::new();
    engine
        .run(&mut runtime, 1e-6, 1e-6, &mut result, RunBudget::default())
        .unwrap();

    let last = result.steps.last().unwrap();
    assert!((last.node_voltages["a"] - 3.3333).abs() < 1e-3);
}

#[test]
fn rc_step_response_reaches_one_time_constant() {
    let mut c = Circuit::new();
    c.push(ComponentSpec::VoltageSource {
        name: "V1".into(),
        n1: "in".into(),
        n2: "0".into(),
        waveform: Waveform::Const(10.0),
    })
    .push(ComponentSpec::Resistor {
        name: "R1".into(),
        n1: "in".into(),
        n2: "a".into(),
        resistance: 1_000.0,
    })
    .push(ComponentSpec::Capacitor {
        name: "C1".into(),
        n1: "a".into(),
        n2: "0".into(),
        capacitance: 1e-6,
        ic: Some(0.0),
    });

    let mut runtime = circuit::build(&c).unwrap();
    let mut engine = TransientEngine::new(IntegratorMethod::Trapezoidal, NewtonParams::default());
    let mut result = TransientResult::new();
    let tau = 1e-3;
    engine
        .run(&mut runtime, 5.0 * tau, tau / 50.0, &mut result, RunBudget::default())
        .unwrap();

    let idx_tau = nearest_index(&result, tau);
    let v_tau = voltage_at(&result, idx_tau, "a");
    assert!((v_tau - 6.3212).abs() < 0.06, "v(tau)={v_tau}");

    let last = result.steps.last().unwrap();
    assert!(last.node_voltages["a"] > 9.93, "v(5tau)={}", last.node_voltages["a"]);
}

#[test]
fn lc_oscillator_conserves_peak_voltage() {
    let inductance: f64 = 25e-6;
    let capacitance: f64 = 1e-6;
    let f0 = 1.0 / (2.0 * std::f64::consts::PI * (inductance * capacitance).sqrt());
    let period = 1.0 / f0;

    let mut c = Circuit::new();
    c.push(ComponentSpec::Capacitor {
        name: "C1".into(),
        n1: "a".into(),
        n2: "0".into(),
        capacitance,
        ic: Some(1.0),
    })
    .push(ComponentSpec::Inductor {
        name: "L1".into(),
        n1: "a".into(),
        n2: "0".into(),
        inductance,
        ic: Some(0.0),
    });

    let mut runtime = circuit::build(&c).unwrap();
    let mut engine = TransientEngine::new(IntegratorMethod::Trapezoidal, NewtonParams::default());
    let mut result = TransientResult::new();
    engine
        .run(&mut runtime, 10.0 * period, period / 50.0, &mut result, RunBudget::default())
        .unwrap();

    let peak = result
        .steps
        .iter()
        .map(|s| s.node_voltages["a"].abs())
        .fold(0.0_f64, f64::max);
    assert!((peak - 1.0).abs() / 1.0 <= 0.01, "peak drift too large: {peak}");
}

#[test]
fn diode_half_wave_rectifier_blocks_negative_half() {
    let mut c = Circuit::new();
    c.push(ComponentSpec::VoltageSource {
        name: "V1".into(),
        n1: "in".into(),
        n2: "0".into(),
        waveform: Waveform::sine(0.0, 10.0, 60.0),
    })
    .push(ComponentSpec::Diode {
        name: "D1".into(),
        anode: "in".into(),
        cathode: "load".into(),
        vf: 0.7,
        ron: 1.0,
        roff: 1e9,
    })
    .push(ComponentSpec::Resistor {
        name: "Rload".into(),
        n1: "load".into(),
        n2: "0".into(),
        resistance: 1_000.0,
    });

    let mut runtime = circuit::build(&c).unwrap();
    let mut engine = TransientEngine::new(IntegratorMethod::BackwardEuler, NewtonParams::default());
    let mut result = TransientResult::new();
    let period = 1.0 / 60.0;
    engine
        .run(&mut runtime, period, period / 200.0, &mut result, RunBudget::default())
        .unwrap();

    let peak = result
        .steps
        .iter()
        .map(|s| s.node_voltages["load"])
        .fold(f64::MIN, f64::max);
    let trough = result
        .steps
        .iter()
        .map(|s| s.node_voltages["load"])
        .fold(f64::MAX, f64::min);

    assert!((peak - 9.3).abs() < 0.5, "peak={peak}");
    assert!(trough >= -0.1, "trough={trough}");
}

/// Buck converter with a switched MOSFET (gate driven by a Pulse source at
/// 100 kHz, 50% duty) and an ideal PWL diode freewheel, settling toward the
/// expected duty-cycle-scaled output over several switching periods.
#[test]
fn buck_converter_settles_near_duty_scaled_output() {
    let switching_freq = 100_000.0;
    let period = 1.0 / switching_freq;
    let duty = 0.5;

    let mut c = Circuit::new();
    c.push(ComponentSpec::VoltageSource {
        name: "Vin".into(),
        n1: "in".into(),
        n2: "0".into(),
        waveform: Waveform::Const(12.0),
    })
    .push(ComponentSpec::VoltageSource {
        name: "Vgate".into(),
        n1: "gate".into(),
        n2: "0".into(),
        waveform: Waveform::pulse(0.0, 10.0, 0.0, period * 0.01, period * 0.01, period * duty, period),
    })
    .push(ComponentSpec::Mosfet {
        name: "M1".into(),
        drain: "in".into(),
        gate: "gate".into(),
        source: "sw".into(),
        vth: 2.0,
        kp: 20.0,
        ron: 0.01,
        roff: 1e9,
    })
    .push(ComponentSpec::Diode {
        name: "Dfw".into(),
        anode: "0".into(),
        cathode: "sw".into(),
        vf: 0.0,
        ron: 0.01,
        roff: 1e9,
    })
    .push(ComponentSpec::Inductor {
        name: "L1".into(),
        n1: "sw".into(),
        n2: "out".into(),
        inductance: 100e-6,
        ic: Some(0.0),
    })
    .push(ComponentSpec::Capacitor {
        name: "Cout".into(),
        n1: "out".into(),
        n2: "0".into(),
        capacitance: 220e-6,
        ic: Some(0.0),
    })
    .push(ComponentSpec::Resistor {
        name: "Rload".into(),
        n1: "out".into(),
        n2: "0".into(),
        resistance: 5.0,
    });

    let mut runtime = circuit::build(&c).unwrap();
    let mut engine = TransientEngine::new(IntegratorMethod::BackwardEuler, NewtonParams::default());
    let mut result = TransientResult::new();
    let t_end = 5e-3;
    let outcome = engine.run(&mut runtime, t_end, period / 40.0, &mut result, RunBudget::default());
    assert!(outcome.is_ok(), "transient run failed: {outcome:?}");

    let last_20pct_start = (result.steps.len() as f64 * 0.8) as usize;
    let tail = &result.steps[last_20pct_start..];
    assert!(!tail.is_empty());
    let mean: f64 = tail.iter().map(|s| s.node_voltages["out"]).sum::<f64>() / tail.len() as f64;
    assert!((mean - 6.0).abs() < 1.0, "mean v_out={mean}");
}

/// Half-bridge with complementary gate drives (100 kHz, 50% duty, a small
/// dead time so neither MOSFET ever has an overlapping ON pulse) swinging a
/// resistively loaded mid-node between the rails.
#[test]
fn half_bridge_mid_node_swings_near_both_rails() {
    let switching_freq = 100_000.0;
    let period = 1.0 / switching_freq;
    let dead_time = period * 0.02;

    let mut c = Circuit::new();
    c.push(ComponentSpec::VoltageSource {
        name: "Vin".into(),
        n1: "rail".into(),
        n2: "0".into(),
        waveform: Waveform::Const(800.0),
    })
    .push(ComponentSpec::VoltageSource {
        name: "VgateHigh".into(),
        n1: "gate_hi".into(),
        n2: "mid".into(),
        waveform: Waveform::pulse(0.0, 12.0, 0.0, period * 0.01, period * 0.01, period * 0.48 - dead_time, period),
    })
    .push(ComponentSpec::VoltageSource {
        name: "VgateLow".into(),
        n1: "gate_lo".into(),
        n2: "0".into(),
        waveform: Waveform::pulse(0.0, 12.0, period * 0.5, period * 0.01, period * 0.01, period * 0.48 - dead_time, period),
    })
    .push(ComponentSpec::Mosfet {
        name: "Mhigh".into(),
        drain: "rail".into(),
        gate: "gate_hi".into(),
        source: "mid".into(),
        vth: 2.0,
        kp: 20.0,
        ron: 0.02,
        roff: 1e9,
    })
    .push(ComponentSpec::Mosfet {
        name: "Mlow".into(),
        drain: "mid".into(),
        gate: "gate_lo".into(),
        source: "0".into(),
        vth: 2.0,
        kp: 20.0,
        ron: 0.02,
        roff: 1e9,
    })
    .push(ComponentSpec::Resistor {
        name: "Rload".into(),
        n1: "mid".into(),
        n2: "0".into(),
        resistance: 1_000.0,
    });

    let mut runtime = circuit::build(&c).unwrap();
    let mut engine = TransientEngine::new(IntegratorMethod::BackwardEuler, NewtonParams::default());
    let mut result = TransientResult::new();
    let outcome = engine.run(&mut runtime, 3.0 * period, period / 100.0, &mut result, RunBudget::default());
    assert!(outcome.is_ok(), "transient run failed: {outcome:?}");

    let peak = result
        .steps
        .iter()
        .map(|s| s.node_voltages["mid"])
        .fold(f64::MIN, f64::max);
    let trough = result
        .steps
        .iter()
        .map(|s| s.node_voltages["mid"])
        .fold(f64::MAX, f64::min);

    assert!(peak > 700.0, "mid peak={peak}");
    assert!(trough < 100.0, "mid trough={trough}");
}
