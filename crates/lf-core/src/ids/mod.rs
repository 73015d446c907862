//! ID type wrappers for type safety.

mod id_macro;
pub mod project_id;
pub mod subscription_id;

pub use project_id::ProjectId;
pub use subscription_id::SubscriptionId;
