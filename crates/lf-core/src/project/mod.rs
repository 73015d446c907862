//! Project lifecycle attributes as observed by the client.
//!
//! Everything in here is owned and mutated by the backend; the client only
//! reads it.

mod integration;
mod snapshot;
mod stage;

pub use integration::{IntegrationRecord, IntegrationSummary};
pub use snapshot::ProjectSnapshot;
pub use stage::{Stage, StageCatalog, StageStep};
