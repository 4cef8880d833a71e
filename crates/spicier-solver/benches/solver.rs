use criterion::{criterion_group, criterion_main, Criterion};
use spicier_core::{Circuit, ComponentSpec, IntegratorMethod, Waveform};
use spicier_solver::{circuit, dc, newton, NewtonParams};

fn resistive_ladder(stages: usize) -> Circuit {
    let mut circuit = Circuit::new();
    circuit.push(ComponentSpec::VoltageSource {
        name: "V1".into(),
        n1: "n0".into(),
        n2: "0".into(),
        waveform: Waveform::Const(10.0),
    });
    for i in 0..stages {
        circuit.push(ComponentSpec::Resistor {
            name: format!("R{i}"),
            n1: format!("n{i}"),
            n2: format!("n{}", i + 1),
            resistance: 1_000.0,
        });
    }
    circuit.push(ComponentSpec::Resistor {
        name: "Rload".into(),
        n1: format!("n{stages}"),
        n2: "0".into(),
        resistance: 1_000.0,
    });
    circuit
}

fn bench_dc_solve(c: &mut Criterion) {
    for &stages in &[5usize, 40usize] {
        let spec = resistive_ladder(stages);
        c.bench_function(&format!("dc_solve_{stages}_stage_ladder"), |b| {
            b.iter(|| {
                let mut runtime = circuit::build(&spec).unwrap();
                dc::solve(&mut runtime, IntegratorMethod::BackwardEuler, &NewtonParams::default()).unwrap();
            });
        });
    }
}

fn bench_newton_step(c: &mut Criterion) {
    let spec = resistive_ladder(10);
    let mut runtime = circuit::build(&spec).unwrap();
    let x0 = nalgebra::DVector::zeros(runtime.mna.size());
    c.bench_function("newton_step_10_stage_ladder", |b| {
        b.iter(|| {
            newton::solve(
                &mut runtime,
                1e-6,
                Some(1e-6),
                IntegratorMethod::BackwardEuler,
                &x0,
                &NewtonParams::default(),
            )
            .unwrap();
        });
    });
}

criterion_group!(benches, bench_dc_solve, bench_newton_step);
criterion_main!(benches);
