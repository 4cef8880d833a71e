//! Linear controlled sources: VCVS, VCCS, CCCS, CCVS.
//!
//! Not part of the closed device set §4.2 names, but common enough in
//! power-electronics control-loop models (feedback compensators, ideal
//! current mirrors) that they are included alongside the core devices.
//! CCCS/CCVS are controlled by another branch's current, so they take a
//! reference to that branch's `BranchId` rather than a node pair.

use spicier_core::{AssemblyContext, BranchId, Element, MnaSystem, NodeId, NodeMap, Stamper};
use std::cell::Cell;

/// Voltage-controlled voltage source: `v(out+) - v(out-) = gain * (v(ctrl+) - v(ctrl-))`.
pub struct Vcvs {
    pub name: String,
    out_pos_name: String,
    out_neg_name: String,
    ctrl_pos_name: String,
    ctrl_neg_name: String,
    out_pos: NodeId,
    out_neg: NodeId,
    ctrl_pos: NodeId,
    ctrl_neg: NodeId,
    branch: Cell<Option<BranchId>>,
    pub gain: f64,
}

impl Vcvs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<String>,
        out_neg: impl Into<String>,
        ctrl_pos: impl Into<String>,
        ctrl_neg: impl Into<String>,
        gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            out_pos_name: out_pos.into(),
            out_neg_name: out_neg.into(),
            ctrl_pos_name: ctrl_pos.into(),
            ctrl_neg_name: ctrl_neg.into(),
            out_pos: NodeId::GROUND,
            out_neg: NodeId::GROUND,
            ctrl_pos: NodeId::GROUND,
            ctrl_neg: NodeId::GROUND,
            branch: Cell::new(None),
            gain,
        }
    }

    pub fn set_branch(&self, branch: BranchId) {
        self.branch.set(Some(branch));
    }
}

impl Element for Vcvs {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.out_pos = nodes.resolve(&self.out_pos_name);
        self.out_neg = nodes.resolve(&self.out_neg_name);
        self.ctrl_pos = nodes.resolve(&self.ctrl_pos_name);
        self.ctrl_neg = nodes.resolve(&self.ctrl_neg_name);
    }

    fn num_branches(&self) -> usize {
        1
    }
}

impl Stamper for Vcvs {
    fn stamp(&self, mna: &mut MnaSystem, _ctx: &AssemblyContext) {
        let branch = self.branch.get().expect("VCVS branch not assigned before assembly");
        mna.stamp_branch_kcl(self.out_pos, self.out_neg, branch);
        let b = Some(branch.index());
        mna.stamp(b, self.ctrl_pos.mna_index(), -self.gain);
        mna.stamp(b, self.ctrl_neg.mna_index(), self.gain);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Voltage-controlled current source: `i(out+ -> out-) = gain * (v(ctrl+) - v(ctrl-))`.
pub struct Vccs {
    pub name: String,
    out_pos_name: String,
    out_neg_name: String,
    ctrl_pos_name: String,
    ctrl_neg_name: String,
    out_pos: NodeId,
    out_neg: NodeId,
    ctrl_pos: NodeId,
    ctrl_neg: NodeId,
    pub gain: f64,
}

impl Vccs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<String>,
        out_neg: impl Into<String>,
        ctrl_pos: impl Into<String>,
        ctrl_neg: impl Into<String>,
        gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            out_pos_name: out_pos.into(),
            out_neg_name: out_neg.into(),
            ctrl_pos_name: ctrl_pos.into(),
            ctrl_neg_name: ctrl_neg.into(),
            out_pos: NodeId::GROUND,
            out_neg: NodeId::GROUND,
            ctrl_pos: NodeId::GROUND,
            ctrl_neg: NodeId::GROUND,
            gain,
        }
    }
}

impl Element for Vccs {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.out_pos = nodes.resolve(&self.out_pos_name);
        self.out_neg = nodes.resolve(&self.out_neg_name);
        self.ctrl_pos = nodes.resolve(&self.ctrl_pos_name);
        self.ctrl_neg = nodes.resolve(&self.ctrl_neg_name);
    }
}

impl Stamper for Vccs {
    fn stamp(&self, mna: &mut MnaSystem, _ctx: &AssemblyContext) {
        mna.stamp_vccs(self.out_pos, self.out_neg, self.ctrl_pos, self.ctrl_neg, self.gain);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Current-controlled current source: `i(out+ -> out-) = gain * i(ctrl_branch)`.
pub struct Cccs {
    pub name: String,
    out_pos_name: String,
    out_neg_name: String,
    out_pos: NodeId,
    out_neg: NodeId,
    ctrl_branch: BranchId,
    pub gain: f64,
}

impl Cccs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<String>,
        out_neg: impl Into<String>,
        ctrl_branch: BranchId,
        gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            out_pos_name: out_pos.into(),
            out_neg_name: out_neg.into(),
            out_pos: NodeId::GROUND,
            out_neg: NodeId::GROUND,
            ctrl_branch,
            gain,
        }
    }
}

impl Element for Cccs {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.out_pos = nodes.resolve(&self.out_pos_name);
        self.out_neg = nodes.resolve(&self.out_neg_name);
    }
}

impl Stamper for Cccs {
    fn stamp(&self, mna: &mut MnaSystem, _ctx: &AssemblyContext) {
        let c = Some(self.ctrl_branch.index());
        mna.stamp(self.out_pos.mna_index(), c, self.gain);
        mna.stamp(self.out_neg.mna_index(), c, -self.gain);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Current-controlled voltage source: `v(out+) - v(out-) = gain * i(ctrl_branch)`.
pub struct Ccvs {
    pub name: String,
    out_pos_name: String,
    out_neg_name: String,
    out_pos: NodeId,
    out_neg: NodeId,
    ctrl_branch: BranchId,
    branch: Cell<Option<BranchId>>,
    pub gain: f64,
}

impl Ccvs {
    pub fn new(
        name: impl Into<String>,
        out_pos: impl Into<String>,
        out_neg: impl Into<String>,
        ctrl_branch: BranchId,
        gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            out_pos_name: out_pos.into(),
            out_neg_name: out_neg.into(),
            out_pos: NodeId::GROUND,
            out_neg: NodeId::GROUND,
            ctrl_branch,
            branch: Cell::new(None),
            gain,
        }
    }

    pub fn set_branch(&self, branch: BranchId) {
        self.branch.set(Some(branch));
    }
}

impl Element for Ccvs {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.out_pos = nodes.resolve(&self.out_pos_name);
        self.out_neg = nodes.resolve(&self.out_neg_name);
    }

    fn num_branches(&self) -> usize {
        1
    }
}

impl Stamper for Ccvs {
    fn stamp(&self, mna: &mut MnaSystem, _ctx: &AssemblyContext) {
        let branch = self.branch.get().expect("CCVS branch not assigned before assembly");
        mna.stamp_branch_kcl(self.out_pos, self.out_neg, branch);
        mna.stamp(Some(branch.index()), Some(self.ctrl_branch.index()), -self.gain);
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
    fn vccs_stamps_transconductance_between_output_and_control_nodes() {
        let mut nodes = NodeMap::new();
        nodes.resolve("out");
        nodes.resolve("ctrl");
        nodes.freeze();
        let mut vccs = Vccs::new("G1", "out", "0", "ctrl", "0", 2.0);
        vccs.resolve_nodes(&mut nodes);
        let mut mna = MnaSystem::new(nodes, 0);
        mna.begin_assembly();
        let solution = nalgebra::DVector::zeros(2);
        let ctx = AssemblyContext::new(&solution, 0.0, None, IntegratorMethod::BackwardEuler, 0.0);
        vccs.stamp(&mut mna, &ctx);
        mna.finalize_assembly();
        assert_eq!(mna.matrix().get(0, 1), 2.0);
    }
}
