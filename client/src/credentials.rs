use std::collections::HashMap;
use std::fmt;

use crate::{ClientError, Result};

pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_API_KEY: &str = "CLOUDFLARE_API_KEY";
pub const ENV_EMAIL: &str = "CLOUDFLARE_EMAIL";

static HEADER_AUTHORIZATION: &str = "Authorization";
static HEADER_AUTH_KEY: &str = "X-Auth-Key";
static HEADER_AUTH_EMAIL: &str = "X-Auth-Email";

/// Account credentials. A client holds exactly one of the two schemes.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API token, sent as `Authorization: Bearer <token>`.
    Token {
        account_id: String,
        access_token: String,
    },
    /// Global API key, sent as `X-Auth-Key` plus `X-Auth-Email`.
    Key {
        account_id: String,
        auth_key: String,
        auth_email: String,
    },
}

impl Credentials {
    pub fn token(account_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Credentials::Token {
            account_id: account_id.into(),
            access_token: access_token.into(),
        }
    }

    pub fn key(
        account_id: impl Into<String>,
        auth_key: impl Into<String>,
        auth_email: impl Into<String>,
    ) -> Self {
        Credentials::Key {
            account_id: account_id.into(),
            auth_key: auth_key.into(),
            auth_email: auth_email.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        match self {
            Credentials::Token { account_id, .. } | Credentials::Key { account_id, .. } => {
                account_id
            }
        }
    }

    /// Load credentials from `CLOUDFLARE_ACCOUNT_ID` and either
    /// `CLOUDFLARE_API_TOKEN` or `CLOUDFLARE_API_KEY` + `CLOUDFLARE_EMAIL`.
    /// The token wins when both schemes are configured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let account_id = get(ENV_ACCOUNT_ID)
            .ok_or_else(|| ClientError::Config(format!("{ENV_ACCOUNT_ID} is not set")))?;

        if let Some(token) = get(ENV_API_TOKEN) {
            return Ok(Self::token(account_id, token));
        }

        match (get(ENV_API_KEY), get(ENV_EMAIL)) {
            (Some(key), Some(email)) => Ok(Self::key(account_id, key, email)),
            (Some(_), None) => Err(ClientError::Config(format!(
                "{ENV_API_KEY} is set but {ENV_EMAIL} is not"
            ))),
            _ => Err(ClientError::Config(format!(
                "neither {ENV_API_TOKEN} nor {ENV_API_KEY}/{ENV_EMAIL} is set"
            ))),
        }
    }

    /// Write the authentication headers for this scheme.
    pub(crate) fn apply(&self, headers: &mut HashMap<String, String>) {
        match self {
            Credentials::Token { access_token, .. } => {
                headers.insert(
                    HEADER_AUTHORIZATION.to_string(),
                    format!("Bearer {}", access_token),
                );
            }
            Credentials::Key {
                auth_key,
                auth_email,
                ..
            } => {
                headers.insert(HEADER_AUTH_KEY.to_string(), auth_key.clone());
                headers.insert(HEADER_AUTH_EMAIL.to_string(), auth_email.clone());
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token { account_id, .. } => f
                .debug_struct("Token")
                .field("account_id", account_id)
                .field("access_token", &"<redacted>")
                .finish(),
            Credentials::Key {
                account_id,
                auth_email,
                ..
            } => f
                .debug_struct("Key")
                .field("account_id", account_id)
                .field("auth_key", &"<redacted>")
                .field("auth_email", auth_email)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_token_sets_only_bearer_header() {
        let mut headers = HashMap::new();
        Credentials::token("acct", "secret").apply(&mut headers);

        assert_eq!(headers.get("Authorization"), Some(&"Bearer secret".to_string()));
        assert!(!headers.contains_key("X-Auth-Key"));
        assert!(!headers.contains_key("X-Auth-Email"));
    }

    #[test]
    fn test_key_sets_both_key_headers() {
        let mut headers = HashMap::new();
        Credentials::key("acct", "k", "me@example.com").apply(&mut headers);

        assert_eq!(headers.get("X-Auth-Key"), Some(&"k".to_string()));
        assert_eq!(headers.get("X-Auth-Email"), Some(&"me@example.com".to_string()));
        assert!(!headers.contains_key("Authorization"));
    }

    #[test]
    fn test_from_lookup_prefers_token() {
        let vars = [
            (ENV_ACCOUNT_ID, "acct"),
            (ENV_API_TOKEN, "tok"),
            (ENV_API_KEY, "key"),
            (ENV_EMAIL, "me@example.com"),
        ];
        let creds = Credentials::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(creds, Credentials::token("acct", "tok"));
    }

    #[test]
    fn test_from_lookup_key_scheme() {
        let vars = [
            (ENV_ACCOUNT_ID, "acct"),
            (ENV_API_KEY, "key"),
            (ENV_EMAIL, "me@example.com"),
        ];
        let creds = Credentials::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(creds, Credentials::key("acct", "key", "me@example.com"));
        assert_eq!(creds.account_id(), "acct");
    }

    #[test]
    fn test_from_lookup_missing_values() {
        let no_account = [(ENV_API_TOKEN, "tok")];
        assert!(matches!(
            Credentials::from_lookup(lookup(&no_account)),
            Err(ClientError::Config(_))
        ));

        let key_without_email = [(ENV_ACCOUNT_ID, "acct"), (ENV_API_KEY, "key")];
        assert!(matches!(
            Credentials::from_lookup(lookup(&key_without_email)),
            Err(ClientError::Config(_))
        ));

        let blank_token = [(ENV_ACCOUNT_ID, "acct"), (ENV_API_TOKEN, "  ")];
        assert!(Credentials::from_lookup(lookup(&blank_token)).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", Credentials::key("acct", "hunter2", "me@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("acct"));

        let debug = format!("{:?}", Credentials::token("acct", "tok-secret"));
        assert!(!debug.contains("tok-secret"));
    }
}
