//! Port interfaces for the application layer
//!
//! Ports define the contract between the readiness use cases and the
//! collaborators they read from. The engine only ever reads backend state;
//! no port here mutates a project.
//!
//! ## Port Placement Guidelines
//!
//! A port belongs here when it represents a backend capability, is used by
//! more than one use case, and is implemented by the infrastructure layer.

mod clock;
pub mod decision;
pub mod errors;
pub mod identity;
pub mod integration;
pub mod output;
pub mod project_directory;
pub mod project_status;
pub mod realtime;
pub mod selection;

pub use clock::*;
pub use decision::{DisplayDecisionPort, RemoteDecision};
pub use errors::{ProbeError, RealtimeError};
pub use identity::{Identity, IdentityPort};
pub use integration::IntegrationPort;
pub use output::OutputExistencePort;
pub use project_directory::{ProjectDirectoryPort, ProjectSummary};
pub use project_status::{ProjectStatusPort, ProjectStatusRecord};
pub use realtime::{RealtimeMessage, RealtimePort, RealtimeTopic};
pub use selection::SelectionStorePort;
