//! Independent voltage and current sources.

use std::cell::Cell;

use spicier_core::{AssemblyContext, BranchId, Element, MnaSystem, NodeId, NodeMap, Stamper, Waveform};

pub struct VoltageSource {
    pub name: String,
    n1: String,
    n2: String,
    a: NodeId,
    b: NodeId,
    branch: Cell<Option<BranchId>>,
    pub waveform: Waveform,
}

impl VoltageSource {
    pub fn new(
        name: impl Into<String>,
        n1: impl Into<String>,
        n2: impl Into<String>,
        waveform: Waveform,
    ) -> Self {
        Self {
            name: name.into(),
            n1: n1.into(),
            n2: n2.into(),
            a: NodeId::GROUND,
            b: NodeId::GROUND,
            branch: Cell::new(None),
            waveform,
        }
    }

    pub fn set_branch(&self, branch: BranchId) {
        self.branch.set(Some(branch));
    }

    pub fn branch(&self) -> BranchId {
        self.branch.get().expect("voltage source branch not assigned before assembly")
    }
}

impl Element for VoltageSource {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.a = nodes.resolve(&self.n1);
        self.b = nodes.resolve(&self.n2);
    }

    fn num_branches(&self) -> usize {
        1
    }
}

impl Stamper for VoltageSource {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext) {
        let branch = self.branch();
        mna.stamp_branch_kcl(self.a, self.b, branch);
        mna.stamp_branch_kvl(branch, 0.0, self.waveform.eval(ctx.time));
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn branch_currents(&self) -> Vec<(String, usize)> {
        vec![(self.name.clone(), self.branch().index())]
    }
}

pub struct CurrentSource {
    pub name: String,
    n1: String,
    n2: String,
    a: NodeId,
    b: NodeId,
    pub waveform: Waveform,
}

impl CurrentSource {
    pub fn new(
        name: impl Into<String>,
        n1: impl Into<String>,
        n2: impl Into<String>,
        waveform: Waveform,
    ) -> Self {
        Self {
            name: name.into(),
            n1: n1.into(),
            n2: n2.into(),
            a: NodeId::GROUND,
            b: NodeId::GROUND,
            waveform,
        }
    }
}

impl Element for CurrentSource {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.a = nodes.resolve(&self.n1);
        self.b = nodes.resolve(&self.n2);
    }
}

impl Stamper for CurrentSource {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext) {
        mna.stamp_current_source(self.a, self.b, self.waveform.eval(ctx.time));
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicier_core::{IntegratorMethod, MnaSystem, NodeMap};

    #[test]
    fn voltage_source_rhs_follows_waveform_at_time() {
        let mut nodes = NodeMap::new();
        nodes.resolve("a");
        nodes.freeze();
        let mut vs = VoltageSource::new("V1", "a", "0", Waveform::Const(10.0));
        vs.resolve_nodes(&mut nodes);
        let mut mna = MnaSystem::new(nodes, 1);
        let branch = mna.reserve_branch();
        vs.set_branch(branch);

        mna.begin_assembly();
        let solution = nalgebra::DVector::zeros(2);
        let ctx = AssemblyContext::new(&solution, 0.25, None, IntegratorMethod::BackwardEuler, 0.0);
        vs.stamp(&mut mna, &ctx);
        mna.finalize_assembly();

        assert_eq!(mna.rhs()[branch.index()], 10.0);
    }
}
