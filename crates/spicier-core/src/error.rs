//! Construction-time and assembly-time error taxonomy.
//!
//! Errors that surface while building a [`crate::netlist::Circuit`] or
//! stamping devices into an [`crate::mna::MnaSystem`]. Solver-time errors
//! (singular matrix, non-convergence, timestep underflow) live in
//! `spicier-solver::Error` instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("unknown node '{0}' referenced by a component")]
    UnknownNode(String),

    #[error("duplicate component name '{0}'")]
    DuplicateName(String),

    #[error("invalid parameter for '{component}': {message}")]
    InvalidParameter { component: String, message: String },

    #[error(
        "coupling matrix for coupled-inductor group '{0}' is not symmetric positive semi-definite"
    )]
    InvalidCoupling(String),

    #[error("circuit has no path to ground from node '{0}'")]
    DisconnectedNode(String),

    #[error("region inconsistency in device '{0}': {1}")]
    RegionInconsistency(String, String),

    #[error("index {index} out of range for dimension {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("matrix is singular at pivot row {row}")]
    SingularMatrix { row: usize },
}
