//! # lf-infra
//!
//! Adapters for the readiness engine's ports: the hosted backend over HTTP,
//! an in-process realtime hub, an in-memory backend, selection stores and
//! the system clock.

pub mod memory;
pub mod realtime;
pub mod selection;
pub mod supabase;
pub mod time;

pub use time::SystemClock;
