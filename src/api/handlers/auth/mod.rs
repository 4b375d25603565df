//! Registration and login handlers.
//!
//! Both handlers share one [`AuthState`] injected as an `Extension`: the user
//! store, the bcrypt hasher and the JWT issuer are built once at startup.
//!
//! ## Failure responses
//!
//! Every failure is a JSON body `{ "success": false, "message": ... }`:
//!
//! - Missing or empty fields: `400`.
//! - Duplicate email on register: `400` "User already exists!".
//! - Unknown email or wrong password on login: `401` "Invalid email or password",
//!   the same body for both cases.
//! - Store, hashing or signing failures: `500` "Server error". The cause is only
//!   logged.

mod error;
pub mod login;
pub mod register;
mod session;
mod state;
pub mod types;

pub use error::AuthError;
pub use login::login;
pub use register::register;
pub use session::SESSION_COOKIE_NAME;
pub use state::{AuthConfig, AuthState};

/// Treat absent and empty strings the same way.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
