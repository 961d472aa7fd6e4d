//! Camera path validation against local star density, with best-effort
//! rerouting around sparse regions.

mod guardrail;
mod path;

pub use guardrail::{GuardrailConfig, PathGuardrail, ValidationFailure, ValidationReport};
pub use path::{CameraState, PathOutcome, PathPlan};
