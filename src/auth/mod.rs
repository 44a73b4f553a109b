//! Session lifecycle against the remote service.
//!
//! [`Authenticator`] creates [`Session`]s (anonymous or credentialed),
//! installs and rotates the anti-forgery token, and logs sessions out.

mod authenticator;
mod error;
mod session;

pub use authenticator::{Authenticator, LoginAttempt, LogoutOutcome};
pub use error::{AuthError, LoginRejected};
pub use session::{CSRF_COOKIE, CSRF_HEADER, Session};
