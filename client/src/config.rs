use std::time::Duration;

use crate::{ClientError, Credentials, Result};

pub const ENV_HTTP_TIMEOUT_SECS: &str = "CLOUDFLARE_HTTP_TIMEOUT_SECS";

/// Settings for a [`crate::Client`] using the default reqwest transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Total time allowed for one request, including reading the body.
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            timeout: None,
            user_agent: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Read credentials (see [`Credentials::from_env`]) and the optional
    /// `CLOUDFLARE_HTTP_TIMEOUT_SECS` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(Credentials::from_lookup(&lookup)?);

        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "{ENV_HTTP_TIMEOUT_SECS} must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}
