//! Request-time security guards.
//!
//! Every inbound request passes the [`RateLimiter`] and the [`BruteForceGuard`]
//! before routing. Protected routes additionally require a session minted by
//! [`SessionSigner`] and, for state-changing methods, a matching CSRF token.

pub mod brute_force;
pub mod client_ip;
pub mod csrf;
pub mod rate_limit;
pub mod session;

pub use brute_force::{BlockRecord, BruteForceGuard};
pub use rate_limit::{Admission, RateLimiter};
pub use session::{Session, SessionError, SessionSigner};
