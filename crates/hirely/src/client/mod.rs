//! Client-side session handling.
//!
//! - [`IdentityStore`]: who the client believes is signed in
//! - [`RouteGuard`]: navigation decisions from a store snapshot
//! - [`AuthClient`]: HTTP calls that drive the store

mod http;
mod route_guard;
mod store;

pub use http::{AuthClient, ClientError};
pub use route_guard::{RouteDecision, RouteGuard, RouteRequirement};
pub use store::{IdentitySnapshot, IdentityStore, PendingAuth};
