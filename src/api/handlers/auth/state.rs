//! Shared configuration and dependencies for the auth handlers.

use crate::{credentials::PasswordHasher, store::UserStore, token::TokenIssuer};
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Add `Secure` to the session cookie (production only).
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub const fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    passwords: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        passwords: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            config,
            store,
            passwords,
            tokens,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("passwords", &self.passwords)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
