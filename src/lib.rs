//! # Passgate (username/password authentication)
//!
//! `passgate` registers users, verifies their credentials and issues short
//! lived session tokens.
//!
//! ## Flow
//!
//! - **Register** (`POST /api/v1/register`): validates `{username, email, password}`,
//!   hashes the password with bcrypt and inserts the user with role `user`.
//!   Email uniqueness is enforced by the store's unique index, not only by the
//!   pre-insert lookup, so concurrent registrations cannot create duplicates.
//! - **Login** (`POST /api/v1/login`): verifies the password and returns an
//!   HS256 JWT carrying `email` and `role`, both in the body and in an
//!   `HttpOnly`, `SameSite=Strict` cookie named `token`.
//!
//! Unknown emails and wrong passwords produce the same `401` body, and an
//! unknown email still pays for a bcrypt verification.

pub mod api;
pub mod cli;
pub mod credentials;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
