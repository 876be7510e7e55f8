use crate::{
    auth::AuthConfig,
    cli::{
        actions::{server::Args, Action},
        commands::{auth, ARG_DSN, ARG_PORT},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_config = auth_config(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        auth_config,
    }))
}

fn auth_config(matches: &clap::ArgMatches) -> Result<AuthConfig> {
    let token_secret = matches
        .get_one::<String>(auth::ARG_TOKEN_SECRET)
        .cloned()
        .context("missing required argument: --token-secret")?;
    let polka_key = matches
        .get_one::<String>(auth::ARG_POLKA_KEY)
        .cloned()
        .context("missing required argument: --polka-key")?;

    let mut config = AuthConfig::new(
        SecretString::from(token_secret),
        SecretString::from(polka_key),
    );

    if let Some(seconds) = matches.get_one::<u64>(auth::ARG_ACCESS_TOKEN_TTL).copied() {
        config = config.with_access_token_ttl(Duration::from_secs(seconds));
    }
    if let Some(days) = matches.get_one::<i64>(auth::ARG_REFRESH_TOKEN_TTL).copied() {
        let ttl = chrono::Duration::try_days(days)
            .with_context(|| format!("refresh token TTL out of range: {days} days"))?;
        config = config.with_refresh_token_ttl(ttl);
    }
    if let Some(cost) = matches.get_one::<u32>(auth::ARG_PASSWORD_COST).copied() {
        config = config.with_password_cost(cost);
    }
    if let Some(seconds) = matches
        .get_one::<u64>(auth::ARG_PASSWORD_HASH_TIMEOUT)
        .copied()
    {
        config = config.with_password_hash_timeout(Duration::from_secs(seconds));
    }

    Ok(config)
}
