//! Liftlio readiness application layer
//!
//! This crate contains the readiness use cases and the engine that turns
//! asynchronous backend signals into one published display state.

pub mod deps;
pub mod usecases;

pub use deps::ReadinessDeps;
pub use usecases::readiness::{EngineError, ReadinessEngine, ReadinessHandle};
