//! Bridges the data-only [`spicier_core::Circuit`] netlist representation
//! to a runtime set of stampable device objects.
//!
//! Construction is two-pass: first every node name referenced anywhere in
//! the netlist is registered and the map is frozen, then concrete device
//! objects are built and resolved against the now-stable map. Branch
//! rows are reserved from the `MnaSystem` only after its size is known,
//! so no component ever sees a branch index that later needs to move.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use spicier_core::{Circuit, ComponentSpec, Element, Error, MnaSystem, NodeId, NodeMap, Reactive, Result, Stamper};
use spicier_devices::{
    Capacitor, CoupledInductorGroup, CurrentSource, Diode, Inductor, Mosfet, Resistor, Switching, VoltageSource,
};

/// Reject a netlist where two components (or two coupled-inductor windings)
/// share a name; every stamped quantity and error message is keyed by name,
/// so a collision would make two distinct devices indistinguishable.
fn check_unique_names(circuit: &Circuit) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in &circuit.components {
        if !seen.insert(spec.name()) {
            return Err(Error::DuplicateName(spec.name().to_string()));
        }
        if let ComponentSpec::CoupledInductors { windings, .. } = spec {
            for w in windings {
                if !seen.insert(w.name.as_str()) {
                    return Err(Error::DuplicateName(w.name.clone()));
                }
            }
        }
    }
    Ok(())
}

fn link(nodes: &NodeMap, adjacency: &mut HashMap<NodeId, Vec<NodeId>>, a: &str, b: &str) {
    let a = nodes.get(a).expect("node resolved in build()'s first pass");
    let b = nodes.get(b).expect("node resolved in build()'s first pass");
    adjacency.entry(a).or_default().push(b);
    adjacency.entry(b).or_default().push(a);
}

/// Every node must have some DC-conductive path to ground: a resistor, an
/// inductor or coupled-inductor winding (a short at DC), a voltage source,
/// a diode's anode-cathode channel, or a MOSFET's drain-source channel.
/// Capacitors are DC-open and current sources present infinite DC
/// impedance, so neither counts as an edge; a MOSFET's gate draws no DC
/// current either and is deliberately excluded, so a floating gate is still
/// reported rather than masked by its drain/source connectivity.
fn check_grounded(circuit: &Circuit, nodes: &NodeMap) -> Result<()> {
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for spec in &circuit.components {
        match spec {
            ComponentSpec::Resistor { n1, n2, .. }
            | ComponentSpec::Inductor { n1, n2, .. }
            | ComponentSpec::VoltageSource { n1, n2, .. } => link(nodes, &mut adjacency, n1, n2),
            ComponentSpec::CoupledInductors { windings, .. } => {
                for w in windings {
                    link(nodes, &mut adjacency, &w.n1, &w.n2);
                }
            }
            ComponentSpec::Diode { anode, cathode, .. } => link(nodes, &mut adjacency, anode, cathode),
            ComponentSpec::Mosfet { drain, source, .. } => link(nodes, &mut adjacency, drain, source),
            ComponentSpec::Capacitor { .. } | ComponentSpec::CurrentSource { .. } => {}
        }
    }

    let mut reached: HashSet<NodeId> = HashSet::new();
    reached.insert(NodeId::GROUND);
    let mut queue = VecDeque::new();
    queue.push_back(NodeId::GROUND);
    while let Some(n) = queue.pop_front() {
        for &neighbor in adjacency.get(&n).into_iter().flatten() {
            if reached.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    for (name, id) in nodes.iter() {
        if !reached.contains(&id) {
            return Err(Error::DisconnectedNode(name.to_string()));
        }
    }
    Ok(())
}

/// Everything the solver needs to assemble and step a circuit: the MNA
/// system plus the device objects grouped by the capabilities the engine
/// drives them through.
pub struct RuntimeCircuit {
    pub mna: MnaSystem,
    pub stampers: Vec<Rc<dyn Stamper>>,
    pub reactive: Vec<Rc<dyn Reactive>>,
    pub switching: Vec<Rc<dyn Switching>>,
}

pub fn build(circuit: &Circuit) -> Result<RuntimeCircuit> {
    check_unique_names(circuit)?;

    let mut nodes = NodeMap::new();
    for spec in &circuit.components {
        for n in spec.nodes() {
            nodes.resolve(n);
        }
    }
    nodes.freeze();

    check_grounded(circuit, &nodes)?;

    let mut stampers: Vec<Rc<dyn Stamper>> = Vec::new();
    let mut reactive: Vec<Rc<dyn Reactive>> = Vec::new();
    let mut switching: Vec<Rc<dyn Switching>> = Vec::new();
    let mut total_branches = 0usize;

    // Built devices stashed until the MnaSystem exists, since branch
    // reservation needs the final node count.
    enum Built {
        Resistor(Rc<Resistor>),
        Capacitor(Rc<Capacitor>),
        Inductor(Rc<Inductor>),
        Coupled(Rc<CoupledInductorGroup>),
        VoltageSource(Rc<VoltageSource>),
        CurrentSource(Rc<CurrentSource>),
        Diode(Rc<Diode>),
        Mosfet(Rc<Mosfet>),
    }

    let mut built = Vec::with_capacity(circuit.components.len());

    for spec in &circuit.components {
        match spec {
            ComponentSpec::Resistor { name, n1, n2, resistance } => {
                if *resistance <= 0.0 {
                    return Err(Error::InvalidParameter {
                        component: name.clone(),
                        message: "resistance must be positive".into(),
                    });
                }
                let mut r = Resistor::new(name.clone(), n1.clone(), n2.clone(), *resistance);
                r.resolve_nodes(&mut nodes);
                built.push(Built::Resistor(Rc::new(r)));
            }
            ComponentSpec::Capacitor { name, n1, n2, capacitance, ic } => {
                if *capacitance <= 0.0 {
                    return Err(Error::InvalidParameter {
                        component: name.clone(),
                        message: "capacitance must be positive".into(),
                    });
                }
                let mut c = Capacitor::new(name.clone(), n1.clone(), n2.clone(), *capacitance, *ic);
                c.resolve_nodes(&mut nodes);
                built.push(Built::Capacitor(Rc::new(c)));
            }
            ComponentSpec::Inductor { name, n1, n2, inductance, ic } => {
                if *inductance <= 0.0 {
                    return Err(Error::InvalidParameter {
                        component: name.clone(),
                        message: "inductance must be positive".into(),
                    });
                }
                let mut l = Inductor::new(name.clone(), n1.clone(), n2.clone(), *inductance, *ic);
                l.resolve_nodes(&mut nodes);
                total_branches += 1;
                built.push(Built::Inductor(Rc::new(l)));
            }
            ComponentSpec::CoupledInductors { name, windings, coupling } => {
                let mut ls: Vec<Inductor> = Vec::with_capacity(windings.len());
                for w in windings {
                    if w.inductance <= 0.0 {
                        return Err(Error::InvalidParameter {
                            component: name.clone(),
                            message: format!("winding '{}' inductance must be positive", w.name),
                        });
                    }
                    let mut l = Inductor::new(w.name.clone(), w.n1.clone(), w.n2.clone(), w.inductance, None);
                    l.resolve_nodes(&mut nodes);
                    ls.push(l);
                }
                total_branches += ls.len();
                let group = CoupledInductorGroup::new(name.clone(), ls, coupling.clone())?;
                built.push(Built::Coupled(Rc::new(group)));
            }
            ComponentSpec::VoltageSource { name, n1, n2, waveform } => {
                let mut v = VoltageSource::new(name.clone(), n1.clone(), n2.clone(), waveform.clone());
                v.resolve_nodes(&mut nodes);
                total_branches += 1;
                built.push(Built::VoltageSource(Rc::new(v)));
            }
            ComponentSpec::CurrentSource { name, n1, n2, waveform } => {
                let mut i = CurrentSource::new(name.clone(), n1.clone(), n2.clone(), waveform.clone());
                i.resolve_nodes(&mut nodes);
                built.push(Built::CurrentSource(Rc::new(i)));
            }
            ComponentSpec::Diode { name, anode, cathode, vf, ron, roff } => {
                if *ron <= 0.0 || *roff <= 0.0 {
                    return Err(Error::InvalidParameter {
                        component: name.clone(),
                        message: "Ron and Roff must be positive".into(),
                    });
                }
                let mut d = Diode::new(name.clone(), anode.clone(), cathode.clone(), *vf, *ron, *roff);
                d.resolve_nodes(&mut nodes);
                built.push(Built::Diode(Rc::new(d)));
            }
            ComponentSpec::Mosfet {
                name,
                drain,
                gate,
                source,
                vth,
                kp,
                ron,
                roff,
            } => {
                if *ron <= 0.0 || *roff <= 0.0 {
                    return Err(Error::InvalidParameter {
                        component: name.clone(),
                        message: "Ron and Roff must be positive".into(),
                    });
                }
                let mut m = Mosfet::new(name.clone(), drain.clone(), gate.clone(), source.clone(), *vth, *kp, *ron, *roff);
                m.resolve_nodes(&mut nodes);
                built.push(Built::Mosfet(Rc::new(m)));
            }
        }
    }

    let mut mna = MnaSystem::new(nodes, total_branches);

    for item in built {
        match item {
            Built::Resistor(r) => stampers.push(r),
            Built::Capacitor(c) => {
                stampers.push(c.clone());
                reactive.push(c);
            }
            Built::Inductor(l) => {
                l.set_branch(mna.reserve_branch());
                stampers.push(l.clone());
                reactive.push(l);
            }
            Built::Coupled(group) => {
                for w in group.windings() {
                    w.set_branch(mna.reserve_branch());
                }
                stampers.push(group.clone());
                reactive.push(group);
            }
            Built::VoltageSource(v) => {
                v.set_branch(mna.reserve_branch());
                stampers.push(v);
            }
            Built::CurrentSource(i) => stampers.push(i),
            Built::Diode(d) => {
                stampers.push(d.clone());
                switching.push(d);
            }
            Built::Mosfet(m) => {
                stampers.push(m.clone());
                switching.push(m);
            }
        }
    }

    Ok(RuntimeCircuit {
        mna,
        stampers,
        reactive,
        switching,
    })
}
