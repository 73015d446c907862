//! Realtime transports.
//! 实时推送传输。

mod disabled;
mod hub;

pub use disabled::DisabledRealtime;
pub use hub::InMemoryRealtimeHub;
