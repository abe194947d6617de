use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{api::TablesApi, config::Settings, error::LeadError};

/// Scheme prefix the tables API expects in the `Authorization` header.
pub const AUTH_SCHEME: &str = "Zoho-oauthtoken";

/// Refresh-token grant parameters.
pub struct TokenRequest<'a> {
    pub refresh_token: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn from_settings(settings: &'a Settings) -> Self {
        Self {
            refresh_token: settings.refresh_token.expose(),
            client_id: &settings.client_id,
            client_secret: settings.client_secret.expose(),
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, &'a str); 4] {
        [
            ("refresh_token", self.refresh_token),
            ("client_id", self.client_id),
            ("client_secret", self.client_secret),
            ("grant_type", "refresh_token"),
        ]
    }
}

/// Short-lived bearer credential, valid for the current invocation only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn header_value(&self) -> String {
        format!("{AUTH_SCHEME} {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Extract a usable `access_token` from a token-endpoint reply.
fn access_token_from(body: &Value) -> Option<AccessToken> {
    body.get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(AccessToken::new)
}

/// Exchange the configured refresh token for an access token.
///
/// The reply's status is only reported; a reply counts as successful as long
/// as it carries a non-empty `access_token`.
pub async fn fetch_access_token(
    api: &dyn TablesApi,
    settings: &Settings,
) -> Result<AccessToken, LeadError> {
    let reply = api
        .exchange_token(&TokenRequest::from_settings(settings))
        .await?;
    match access_token_from(&reply.body) {
        Some(token) => {
            debug!(http_status = reply.status, "access token issued");
            Ok(token)
        }
        None => {
            warn!(http_status = reply.status, "token reply carried no access_token");
            Err(LeadError::Authentication {
                status: reply.status,
                body: reply.body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_uses_oauth_scheme() {
        let token = AccessToken::new("1000.abc");
        assert_eq!(token.header_value(), "Zoho-oauthtoken 1000.abc");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
    }

    #[test]
    fn token_requires_non_empty_string() {
        assert_eq!(
            access_token_from(&json!({ "access_token": "t-1", "expires_in": 3600 })),
            Some(AccessToken::new("t-1"))
        );
        assert_eq!(access_token_from(&json!({ "access_token": "" })), None);
        assert_eq!(access_token_from(&json!({ "access_token": 42 })), None);
        assert_eq!(access_token_from(&json!({ "error": "invalid_code" })), None);
        assert_eq!(access_token_from(&json!("not json")), None);
    }

    #[test]
    fn grant_parameters_are_complete() {
        let request = TokenRequest {
            refresh_token: "r",
            client_id: "c",
            client_secret: "s",
        };
        assert_eq!(
            request.query_pairs(),
            [
                ("refresh_token", "r"),
                ("client_id", "c"),
                ("client_secret", "s"),
                ("grant_type", "refresh_token"),
            ]
        );
    }
}
