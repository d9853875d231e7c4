//! Domain model (identity, task records, status, outcomes, errors).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod state;
pub mod task;

pub use errors::{SpoolError, SpoolResult};
pub use ids::{Fingerprint, canonical_json};
pub use outcome::{Artifact, Outcome};
pub use state::TaskStatus;
pub use task::{TaskEnvelope, TaskKind, TaskRecord};
