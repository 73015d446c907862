//! # lf-core
//!
//! Core domain models and readiness decision logic for Liftlio.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

// Public module exports
pub mod config;
pub mod display;
pub mod ids;
pub mod ports;
pub mod project;
pub mod readiness;

// Re-export commonly used types at the crate root
pub use config::ReadinessConfig;
pub use display::{DisplayComponent, DisplayState, ReadinessView};
pub use ids::{ProjectId, SubscriptionId};
pub use ports::ProbeError;
pub use project::{IntegrationRecord, IntegrationSummary, ProjectSnapshot, Stage, StageCatalog};
pub use readiness::{AuthState, ResolverInput, RouteKind, StateResolver, TransitionGuard};
