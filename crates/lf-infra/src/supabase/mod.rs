//! Hosted backend adapters (PostgREST tables, auth and RPC over HTTP).
//! 托管后端适配器（通过 HTTP 访问 PostgREST 表、认证与 RPC）。
//!
//! Status mapping shared by every adapter:
//! - 401/403 → [`ProbeError::AuthExpired`](lf_core::ProbeError::AuthExpired)
//! - 408/429/5xx and network failures → `Transient`
//! - other 4xx and undecodable bodies → `InvariantViolation`

mod client;
mod decision;
mod directory;
mod identity;
mod integrations;
mod output;
mod status;

pub use client::{SupabaseBackend, SupabaseError};
