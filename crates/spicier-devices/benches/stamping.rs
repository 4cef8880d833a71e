use criterion::{criterion_group, criterion_main, Criterion};
use spicier_core::{AssemblyContext, Element, IntegratorMethod, MnaSystem, NodeMap, Stamper};
use spicier_devices::{Capacitor, Resistor};

fn bench_stamp(c: &mut Criterion) {
    let mut nodes = NodeMap::new();
    nodes.resolve("a");
    nodes.resolve("b");
    nodes.freeze();

    let mut r = Resistor::new("R1", "a", "b", 100.0);
    r.resolve_nodes(&mut nodes.clone());
    let mut cap = Capacitor::new("C1", "a", "0", 1e-6, None);
    cap.resolve_nodes(&mut nodes.clone());

    let mna = MnaSystem::new(nodes, 0);
    let solution = nalgebra::DVector::zeros(mna.size());

    c.bench_function("resistor_stamp", |b| {
        b.iter(|| {
            let mut mna = MnaSystem::new(mna.nodes().clone(), 0);
            mna.begin_assembly();
            let ctx = AssemblyContext::new(&solution, 0.0, None, IntegratorMethod::BackwardEuler, 0.0);
            r.stamp(&mut mna, &ctx);
        });
    });

    c.bench_function("capacitor_stamp", |b| {
        b.iter(|| {
            let mut mna = MnaSystem::new(mna.nodes().clone(), 0);
            mna.begin_assembly();
            let ctx = AssemblyContext::new(&solution, 0.0, Some(1e-6), IntegratorMethod::Trapezoidal, 0.0);
            cap.stamp(&mut mna, &ctx);
        });
    });
}

criterion_group!(benches, bench_stamp);
criterion_main!(benches);
