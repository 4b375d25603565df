use crate::credentials::{DEFAULT_COST, MAX_COST, MIN_COST};
use anyhow::{Context, Result};
use clap::{builder::ValueParser, Arg, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_TOKEN_TTL: &str = "token-ttl";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

const PRODUCTION: &str = "production";

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub token_ttl: Duration,
    pub environment: String,
    pub bcrypt_cost: u32,
    pub cors_origin: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --jwt-secret")?;

        Ok(Self {
            jwt_secret,
            token_ttl: matches
                .get_one::<Duration>(ARG_TOKEN_TTL)
                .copied()
                .unwrap_or(Duration::from_secs(30 * 60)),
            environment: matches
                .get_one::<String>(ARG_ENVIRONMENT)
                .cloned()
                .unwrap_or_else(|| "development".to_string()),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(DEFAULT_COST),
            cors_origin: matches
                .get_one::<String>(ARG_CORS_ORIGIN)
                .cloned()
                .context("missing required argument: --cors-origin")?,
        })
    }
}

/// Only `production` turns on `Secure` cookies.
#[must_use]
pub fn is_production(environment: &str) -> bool {
    environment.eq_ignore_ascii_case(PRODUCTION)
}

/// Parse `30m`, `2h`, `1d`, `45s` or a bare number of seconds.
///
/// # Errors
/// Returns an error for unknown units, overflow, or a zero duration.
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();
    let (amount, unit) = value
        .find(|c: char| !c.is_ascii_digit())
        .map_or((value, "s"), |index| value.split_at(index));

    let amount = amount
        .parse::<u64>()
        .map_err(|_| format!("invalid duration: {value}"))?;

    let multiplier = match unit.trim() {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => return Err(format!("invalid duration unit: {other} (use s, m, h or d)")),
    };

    let seconds = amount
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration too large: {value}"))?;

    if seconds == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(Duration::from_secs(seconds))
}

#[must_use]
pub fn validator_duration() -> ValueParser {
    ValueParser::from(parse_duration)
}

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (HS256)")
                .env("PASSGATE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL)
                .long(ARG_TOKEN_TTL)
                .help("Session token and cookie lifetime, e.g. 30m, 2h, 1d or seconds")
                .env("PASSGATE_TOKEN_TTL")
                .default_value("30m")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Runtime environment; `production` marks the session cookie Secure")
                .env("PASSGATE_ENV")
                .default_value("development"),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt cost factor")
                .env("PASSGATE_BCRYPT_COST")
                .default_value("12")
                .value_parser(clap::value_parser!(u32).range(i64::from(MIN_COST)..=i64::from(MAX_COST))),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Browser origin allowed to call the API with credentials")
                .env("PASSGATE_CORS_ORIGIN")
                .default_value("http://localhost:5173"),
        )
}
