//! # liftlio
//!
//! Shell around the readiness engine: bootstrap (config, tracing, wiring)
//! and a console renderer for the published view.

pub mod bootstrap;
pub mod console;
pub mod renderer;
