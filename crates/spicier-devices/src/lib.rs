//! Device models: the closed set from the circuit data model (resistor,
//! capacitor, inductor, coupled-inductor groups, sources, diode, MOSFET)
//! plus linear controlled sources.

pub mod controlled;
pub mod coupled;
pub mod diode;
pub mod event;
pub mod mosfet;
pub mod passive;
pub mod sources;

pub use controlled::{Cccs, Ccvs, Vccs, Vcvs};
pub use coupled::CoupledInductorGroup;
pub use diode::{Diode, DiodeRegion};
pub use event::{DevicePriority, Switching};
pub use mosfet::{Mosfet, MosfetRegion};
pub use passive::{Capacitor, Inductor, Resistor};
pub use sources::{CurrentSource, VoltageSource};

pub use spicier_core::Reactive;
