//! Per-step samples and the sink contract the transient engine emits
//! through. Samples are keyed by node/branch name rather than raw MNA
//! index, since the index assignment is an assembly-time implementation
//! detail the caller should never need to know.

use indexmap::IndexMap;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::circuit::RuntimeCircuit;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSample {
    pub t: f64,
    pub node_voltages: IndexMap<String, f64>,
    pub branch_currents: IndexMap<String, f64>,
    /// Set if this step required Gmin stepping to converge, per the
    /// no-silent-degradation requirement on the error/diagnostics surface.
    pub gmin_used: bool,
}

impl StepSample {
    pub fn from_solution(circuit: &RuntimeCircuit, t: f64, x: &DVector<f64>, gmin_used: bool) -> Self {
        let mut node_voltages = IndexMap::new();
        for (name, id) in circuit.mna.nodes().iter() {
            if let Some(idx) = id.mna_index() {
                node_voltages.insert(name.to_string(), x[idx]);
            }
        }
        let mut branch_currents = IndexMap::new();
        for stamper in &circuit.stampers {
            for (name, idx) in stamper.branch_currents() {
                branch_currents.insert(name, x[idx]);
            }
        }
        Self {
            t,
            node_voltages,
            branch_currents,
            gmin_used,
        }
    }
}

/// The accumulated output of a transient run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransientResult {
    pub steps: Vec<StepSample>,
}

impl TransientResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: StepSample) {
        self.steps.push(sample);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A caller-supplied destination for accepted steps, decoupling the engine
/// from any particular storage or export format. `TransientResult` itself
/// implements this trivially by buffering in memory.
pub trait ResultSink {
    fn accept(&mut self, sample: StepSample) -> crate::error::Result<()>;
}

impl ResultSink for TransientResult {
    fn accept(&mut self, sample: StepSample) -> crate::error::Result<()> {
        self.push(sample);
        Ok(())
    }
}
