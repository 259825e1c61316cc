use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result, bail};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub rest_port: u16,
    /// HMAC key for screen auth tokens. Tokens minted with one secret are
    /// rejected after it changes.
    pub token_secret: String,
    /// Bearer key guarding the administrative endpoints. `None` disables them.
    pub admin_api_key: Option<String>,
    pub pairing_ttl: Duration,
    pub paired_retention: Duration,
    pub sweep_interval: Duration,
    pub require_identify_token: bool,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_address: "0.0.0.0".to_string(),
            rest_port: 8080,
            token_secret: random_secret(),
            admin_api_key: None,
            pairing_ttl: Duration::from_secs(15 * 60),
            paired_retention: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
            require_identify_token: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source so tests don't
    /// have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let token_secret = match lookup("SIGNAGE_TOKEN_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("SIGNAGE_TOKEN_SECRET not set; issued tokens will not survive a restart");
                defaults.token_secret
            }
        };

        Ok(AppConfig {
            bind_address: lookup("SIGNAGE_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            rest_port: parse_or(&lookup, "SIGNAGE_PORT", defaults.rest_port)?,
            token_secret,
            admin_api_key: lookup("SIGNAGE_ADMIN_KEY").filter(|k| !k.is_empty()),
            pairing_ttl: secs_or(&lookup, "SIGNAGE_PAIRING_TTL_SECS", defaults.pairing_ttl)?,
            paired_retention: secs_or(
                &lookup,
                "SIGNAGE_PAIRED_RETENTION_SECS",
                defaults.paired_retention,
            )?,
            sweep_interval: secs_or(
                &lookup,
                "SIGNAGE_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval,
            )?,
            require_identify_token: parse_or(
                &lookup,
                "SIGNAGE_REQUIRE_IDENTIFY_TOKEN",
                defaults.require_identify_token,
            )?,
            request_timeout: secs_or(
                &lookup,
                "SIGNAGE_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default.as_secs())?;
    if secs == 0 {
        bail!("{key} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

fn random_secret() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}
