use std::{env, fmt};

use crate::error::SettingsError;

pub const CLIENT_ID_ENV: &str = "ZOHO_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "ZOHO_CLIENT_SECRET";
pub const REFRESH_TOKEN_ENV: &str = "ZOHO_REFRESH_TOKEN";
pub const DATA_CENTER_ENV: &str = "ZOHO_DC";
pub const BASE_ID_ENV: &str = "ZOHO_TABLES_BASE_ID";
pub const TABLE_ID_ENV: &str = "ZOHO_TABLES_TABLE_ID";
pub const VIEW_ID_ENV: &str = "ZOHO_TABLES_VIEW_ID";
pub const LEAD_SOURCE_ENV: &str = "DEFAULT_LEAD_SOURCE";
pub const ACCOUNTS_URL_ENV: &str = "ZOHO_ACCOUNTS_URL";
pub const TABLES_API_URL_ENV: &str = "ZOHO_TABLES_API_URL";

const DEFAULT_DATA_CENTER: &str = "us";
const DEFAULT_LEAD_SOURCE: &str = "Website";
const DEFAULT_TABLES_API_URL: &str = "https://tables.zoho.com/api/v1";

/// Where a secret value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    ParameterStore,
    EnvVar,
    EnvFallback,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::ParameterStore => write!(f, "SSM parameter"),
            ResolutionSource::EnvVar => write!(f, "env var"),
            ResolutionSource::EnvFallback => write!(f, "env var fallback after SSM failure"),
        }
    }
}

/// A credential that must never end up in logs.
#[derive(Clone)]
pub struct Secret {
    value: String,
    source: ResolutionSource,
}

impl Secret {
    pub fn new(value: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    /// Read the secret from a plain environment variable.
    pub fn from_env(name: &'static str, source: ResolutionSource) -> Result<Self, SettingsError> {
        required(name).map(|value| Self::new(value, source))
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> ResolutionSource {
        self.source
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<redacted>, {})", self.source)
    }
}

/// Base/table/view coordinates addressing the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCoordinates {
    pub base_id: String,
    pub table_id: String,
    pub view_id: Option<String>,
}

impl TableCoordinates {
    pub fn new(
        base_id: impl Into<String>,
        table_id: impl Into<String>,
        view_id: Option<String>,
    ) -> Self {
        Self {
            base_id: base_id.into(),
            table_id: table_id.into(),
            view_id: view_id.filter(|v| !v.trim().is_empty()),
        }
    }

    /// Key/value pairs sent with every tables request; `view_id` only when set.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("base_id", self.base_id.clone()),
            ("table_id", self.table_id.clone()),
        ];
        if let Some(view_id) = &self.view_id {
            params.push(("view_id", view_id.clone()));
        }
        params
    }
}

/// Everything the handler needs to talk to the token and tables services.
///
/// Built once at cold start and injected through `AppContext`; request
/// processing never reads the environment directly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: Secret,
    pub refresh_token: Secret,
    pub data_center: String,
    pub table: TableCoordinates,
    pub default_lead_source: String,
    pub accounts_url: String,
    pub tables_api_url: String,
}

impl Settings {
    /// Load settings with both secrets taken from plain env vars.
    pub fn from_env() -> Result<Self, SettingsError> {
        let client_secret = Secret::from_env(CLIENT_SECRET_ENV, ResolutionSource::EnvVar)?;
        let refresh_token = Secret::from_env(REFRESH_TOKEN_ENV, ResolutionSource::EnvVar)?;
        Self::from_env_with_secrets(client_secret, refresh_token)
    }

    /// Load the non-secret settings from the environment around already resolved secrets.
    pub fn from_env_with_secrets(
        client_secret: Secret,
        refresh_token: Secret,
    ) -> Result<Self, SettingsError> {
        let data_center = optional(DATA_CENTER_ENV)
            .unwrap_or_else(|| DEFAULT_DATA_CENTER.to_owned())
            .to_ascii_lowercase();
        if data_center.contains('/') {
            return Err(SettingsError::Invalid {
                name: DATA_CENTER_ENV,
                reason: format!("`{data_center}` is not a domain suffix"),
            });
        }
        let accounts_url = optional(ACCOUNTS_URL_ENV)
            .unwrap_or_else(|| accounts_url_for(&data_center));
        let tables_api_url =
            optional(TABLES_API_URL_ENV).unwrap_or_else(|| DEFAULT_TABLES_API_URL.to_owned());

        Ok(Self {
            client_id: required(CLIENT_ID_ENV)?,
            client_secret,
            refresh_token,
            data_center,
            table: TableCoordinates::new(
                required(BASE_ID_ENV)?,
                required(TABLE_ID_ENV)?,
                optional(VIEW_ID_ENV),
            ),
            default_lead_source: optional(LEAD_SOURCE_ENV)
                .unwrap_or_else(|| DEFAULT_LEAD_SOURCE.to_owned()),
            accounts_url: accounts_url.trim_end_matches('/').to_owned(),
            tables_api_url: tables_api_url.trim_end_matches('/').to_owned(),
        })
    }
}

/// Accounts host for a data-center selector; `us` is served from `.com`.
pub fn accounts_url_for(data_center: &str) -> String {
    let suffix = match data_center {
        "us" | "" => "com",
        other => other,
    };
    format!("https://accounts.zoho.{suffix}")
}

pub(crate) fn required(name: &'static str) -> Result<String, SettingsError> {
    optional(name).ok_or(SettingsError::Missing(name))
}

pub(crate) fn optional(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}
