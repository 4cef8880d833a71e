//! Solver-time error taxonomy: failures that can only occur once a
//! transient analysis is running, as opposed to `spicier_core::Error`'s
//! construction-time taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("circuit construction failed: {0}")]
    Circuit(#[from] spicier_core::Error),

    #[error("matrix is singular at pivot row {row}")]
    SingularMatrix { row: usize },

    #[error("Newton iteration did not converge: residual {residual:.3e} after {iterations} iterations")]
    NonConvergence { residual: f64, iterations: usize },

    #[error("timestep underflowed below MinΔt at t={t:.3e} (Δt={dt:.3e})")]
    TimestepTooSmall { t: f64, dt: f64 },

    #[error("analysis cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("result sink rejected a sample: {0}")]
    SinkError(String),

    #[error("zero Δt requested")]
    InvalidParameter(String),
}
