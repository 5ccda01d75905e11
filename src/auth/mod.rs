//! Bearer token authentication.
//!
//! The gate middleware verifies `Authorization: Bearer` access tokens and
//! stores the resolved identity in the request's extensions. Handlers read it
//! back through the extractors; nothing about the caller outlives the request.

mod bearer;
mod errors;
mod extractors;
mod gate;
mod state;

pub use bearer::bearer_token;
pub use errors::AuthError;
pub use extractors::{AdminOnly, AnyRole, Auth, OptionalAuth, RoleConstraint};
pub use gate::authenticate;
pub use state::AuthGate;
