//! Nonlinear transient solver: Newton iteration over Modified Nodal
//! Analysis systems assembled from `spicier-devices` components, with
//! event-driven piecewise-linear switching and adaptive time stepping.

pub mod circuit;
pub mod dc;
pub mod error;
pub mod event_detector;
pub mod integrator;
pub mod newton;
pub mod result;
pub mod transient;

pub use circuit::{build, RuntimeCircuit};
pub use error::{Error, Result};
pub use event_detector::{LocatedEvent, PendingEvent};
pub use integrator::{estimate_lte, Integrator};
pub use newton::{NewtonParams, NewtonResult};
pub use result::{ResultSink, StepSample, TransientResult};
pub use transient::{AdaptiveStats, EngineState, RunBudget, TransientEngine};
