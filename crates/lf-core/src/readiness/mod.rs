//! Readiness decision logic.
//!
//! Defines the pure resolver that maps project attributes to a
//! [`DisplayState`](crate::display::DisplayState) and the transition state
//! machine that decides which probe results may still be published.

mod resolver;
mod transition;

pub use resolver::{AuthState, ResolverInput, RouteKind, StateResolver};
pub use transition::{BeginOutcome, ProbeOrigin, TransitionGuard, TransitionTicket};
