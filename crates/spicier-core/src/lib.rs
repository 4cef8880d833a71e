//! Circuit representation and MNA assembly primitives: node identity,
//! sparse matrix/vector operations, the stamping contract devices
//! implement, and the external netlist data model.

pub mod element;
pub mod error;
pub mod mna;
pub mod netlist;
pub mod node;
pub mod sparse;

pub use element::{AssemblyContext, Element, IntegratorMethod, Reactive, Stamper};
pub use error::{Error, Result};
pub use mna::{BranchId, MnaSystem};
pub use netlist::{Circuit, ComponentSpec, Waveform, Winding};
pub use node::{NodeId, NodeMap};
pub use sparse::{LuFactorization, SparseMatrix, VectorOps, PIVOT_TOLERANCE, SPARSE_THRESHOLD};
