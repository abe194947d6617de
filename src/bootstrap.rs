//! Cold-start secret resolution.
//!
//! The client secret and refresh token may live in SSM Parameter Store. When
//! the matching `*_PARAMETER` variable names a parameter it is read with
//! decryption; if that lookup fails the plain env var is used instead.

use aws_sdk_ssm::Client;
use tracing::{info, warn};

use crate::{
    config::{
        optional, required, ResolutionSource, Secret, Settings, CLIENT_SECRET_ENV,
        REFRESH_TOKEN_ENV,
    },
    error::SettingsError,
};

pub const CLIENT_SECRET_PARAMETER_ENV: &str = "ZOHO_CLIENT_SECRET_PARAMETER";
pub const REFRESH_TOKEN_PARAMETER_ENV: &str = "ZOHO_REFRESH_TOKEN_PARAMETER";

/// Whether any secret is configured to come from Parameter Store.
pub fn uses_parameter_store() -> bool {
    optional(CLIENT_SECRET_PARAMETER_ENV).is_some()
        || optional(REFRESH_TOKEN_PARAMETER_ENV).is_some()
}

/// Resolve both secrets, then load the rest of the settings from the environment.
pub async fn load_settings(ssm: Option<&Client>) -> Result<Settings, SettingsError> {
    if ssm.is_none() {
        return Settings::from_env();
    }
    let client_secret = resolve_secret(ssm, CLIENT_SECRET_PARAMETER_ENV, CLIENT_SECRET_ENV).await?;
    let refresh_token = resolve_secret(ssm, REFRESH_TOKEN_PARAMETER_ENV, REFRESH_TOKEN_ENV).await?;
    Settings::from_env_with_secrets(client_secret, refresh_token)
}

async fn resolve_secret(
    ssm: Option<&Client>,
    parameter_env: &'static str,
    fallback_env: &'static str,
) -> Result<Secret, SettingsError> {
    let (Some(ssm), Some(parameter)) = (ssm, optional(parameter_env)) else {
        return Secret::from_env(fallback_env, ResolutionSource::EnvVar);
    };

    let lookup = ssm
        .get_parameter()
        .name(&parameter)
        .with_decryption(true)
        .send()
        .await;
    match lookup {
        Ok(resp) => {
            let value = resp
                .parameter
                .and_then(|p| p.value)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SettingsError::Invalid {
                    name: parameter_env,
                    reason: format!("parameter `{parameter}` has no value"),
                })?;
            info!(%parameter, "loaded secret from SSM");
            Ok(Secret::new(value.trim(), ResolutionSource::ParameterStore))
        }
        Err(err) => {
            warn!(
                %parameter,
                "failed to fetch secret from SSM ({}); falling back to {} env var",
                err,
                fallback_env
            );
            required(fallback_env)
                .map(|value| Secret::new(value, ResolutionSource::EnvFallback))
                .map_err(|_| SettingsError::Missing(fallback_env))
        }
    }
}
