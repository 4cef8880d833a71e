//! Three-terminal, region-switched piecewise MOSFET model: a square-law
//! Id(Vgs, Vds) Newton-linearized into a drain-source conductance plus a
//! gate-controlled current source. Gate current is always zero.

use std::cell::Cell;

use spicier_core::{AssemblyContext, Element, MnaSystem, NodeId, NodeMap, Stamper};

use crate::event::{DevicePriority, Switching};

/// Thermal voltage used to size the hysteresis band around `Vth`
/// (band width is `5 * THERMAL_VOLTAGE` per the region-chatter guard).
const THERMAL_VOLTAGE: f64 = 0.02585;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosfetRegion {
    Cutoff,
    Linear,
    Saturation,
}

pub struct Mosfet {
    pub name: String,
    drain_name: String,
    gate_name: String,
    source_name: String,
    drain: NodeId,
    gate: NodeId,
    source: NodeId,
    pub vth: f64,
    pub kp: f64,
    pub ron: f64,
    pub roff: f64,
    region: Cell<MosfetRegion>,
}

impl Mosfet {
    pub fn new(
        name: impl Into<String>,
        drain: impl Into<String>,
        gate: impl Into<String>,
        source: impl Into<String>,
        vth: f64,
        kp: f64,
        ron: f64,
        roff: f64,
    ) -> Self {
        Self {
            name: name.into(),
            drain_name: drain.into(),
            gate_name: gate.into(),
            source_name: source.into(),
            drain: NodeId::GROUND,
            gate: NodeId::GROUND,
            source: NodeId::GROUND,
            vth,
            kp,
            ron,
            roff,
            region: Cell::new(MosfetRegion::Cutoff),
        }
    }

    pub fn region(&self) -> MosfetRegion {
        self.region.get()
    }

    fn terminal_voltages(&self, ctx: &AssemblyContext) -> (f64, f64) {
        let vgs = ctx.voltage_at(self.gate) - ctx.voltage_at(self.source);
        let vds = ctx.voltage_at(self.drain) - ctx.voltage_at(self.source);
        (vgs, vds)
    }

    /// `g1 = Vgs - Vth`, `g2 = (Vgs - Vth) - Vds`; sign pair determines
    /// the active region per spec §4.2.
    fn event_functions_raw(&self, ctx: &AssemblyContext) -> (f64, f64) {
        let (vgs, vds) = self.terminal_voltages(ctx);
        (vgs - self.vth, (vgs - self.vth) - vds)
    }

    fn region_for(&self, vgs: f64, vds: f64) -> MosfetRegion {
        if vgs < self.vth {
            MosfetRegion::Cutoff
        } else if vds < vgs - self.vth {
            MosfetRegion::Linear
        } else {
            MosfetRegion::Saturation
        }
    }

    /// `(Id, gm, gds)` for the latched region, evaluated at `(vgs, vds)`.
    fn square_law(&self, vgs: f64, vds: f64) -> (f64, f64, f64) {
        let overdrive = (vgs - self.vth).max(0.0);
        match self.region.get() {
            MosfetRegion::Cutoff => {
                let goff = 1.0 / self.roff;
                (goff * vds, 0.0, goff)
            }
            MosfetRegion::Linear => {
                // Channel resistance from the square law, floored at Ron so
                // a fully-enhanced device (the common power-switch case)
                // behaves as the datasheet on-resistance rather than an
                // unbounded square-law conductance.
                let square_law_conductance = self.kp * overdrive.max(1e-12);
                let gds = square_law_conductance.min(1.0 / self.ron);
                (gds * vds, 0.0, gds)
            }
            MosfetRegion::Saturation => {
                let id = 0.5 * self.kp * overdrive * overdrive;
                let gm = self.kp * overdrive;
                let gds = 1e-9; // finite output conductance avoids a singular Jacobian
                (id, gm, gds)
            }
        }
    }
}

impl Element for Mosfet {
    fn resolve_nodes(&mut self, nodes: &mut NodeMap) {
        self.drain = nodes.resolve(&self.drain_name);
        self.gate = nodes.resolve(&self.gate_name);
        self.source = nodes.resolve(&self.source_name);
    }
}

impl Stamper for Mosfet {
    fn stamp(&self, mna: &mut MnaSystem, ctx: &AssemblyContext) {
        let (vgs, vds) = self.terminal_voltages(ctx);
        let (id, gm, gds) = self.square_law(vgs, vds);
        let ieq = id - gm * vgs - gds * vds;

        mna.stamp_vccs(self.drain, self.source, self.gate, self.source, gm);
        mna.stamp_conductance(self.drain, self.source, gds + ctx.gmin);
        mna.stamp_current_source(self.source, self.drain, ieq);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Switching for Mosfet {
    fn event_functions(&self, ctx: &AssemblyContext) -> Vec<f64> {
        let (g1, g2) = self.event_functions_raw(ctx);
        vec![g1, g2]
    }

    fn priority(&self) -> DevicePriority {
        DevicePriority::Mosfet
    }

    fn latch_region(&self, ctx: &AssemblyContext) {
        let (vgs, vds) = self.terminal_voltages(ctx);
        // Hysteresis: within the band around Vth, keep the previous region
        // unless the overdrive has moved unambiguously past the band.
        let band = 5.0 * THERMAL_VOLTAGE;
        if (vgs - self.vth).abs() < band && self.region.get() != MosfetRegion::Cutoff {
            return;
        }
        self.region.set(self.region_for(vgs, vds));
    }

    fn clamped_node_indices(&self) -> Vec<Option<usize>> {
        vec![self.gate.mna_index(), self.drain.mna_index(), self.source.mna_index()]
    }
}
