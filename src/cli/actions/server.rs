use crate::{
    api::{self, handlers::auth::{AuthConfig, AuthState}},
    credentials::PasswordHasher,
    store::PgUserStore,
    token::TokenIssuer,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, error, info};
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub token_ttl: Duration,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub cors_origin: String,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(&self.dsn))
            .field("jwt_secret", &self.jwt_secret)
            .field("token_ttl", &self.token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the configuration is invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    // Validate token and hashing settings before touching the database.
    let tokens = TokenIssuer::new(&args.jwt_secret, args.token_ttl)
        .context("Invalid session token configuration")?;
    let passwords =
        PasswordHasher::new(args.bcrypt_cost).context("Invalid bcrypt configuration")?;

    let store = match PgUserStore::connect(&args.dsn).await {
        Ok(store) => store,
        Err(err) => {
            error!("Database connection error: {err:#}");
            return Err(err);
        }
    };

    store.ensure_schema().await?;

    info!("Connected to database");

    let auth_config = AuthConfig::new().with_cookie_secure(args.cookie_secure);
    let auth_state = Arc::new(AuthState::new(
        auth_config,
        Arc::new(store.clone()),
        passwords,
        tokens,
    ));

    api::new(args.port, auth_state, &args.cors_origin, store).await
}

/// Hide the password part of a connection string.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
