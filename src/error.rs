use lambda_http::{http::StatusCode, Error as LambdaError};
use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// Failures raised while turning a form submission into a table row.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("token exchange failed with status {status}")]
    Authentication { status: u16, body: Value },
    #[error("field list request failed with status {status}")]
    SchemaFetch { status: u16, body: Value },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("record creation failed with status {status}")]
    Submission { status: u16, body: Value },
    #[error("{0}")]
    Unexpected(String),
}

impl LeadError {
    /// Short classification string used for logging.
    pub fn category(&self) -> &'static str {
        match self {
            LeadError::Authentication { .. } => "auth",
            LeadError::SchemaFetch { .. } => "schema",
            LeadError::Validation(_) => "validation",
            LeadError::Submission { .. } => "submission",
            LeadError::Unexpected(_) => "unexpected",
        }
    }

    /// Pipeline stage reported back to the caller.
    pub fn step(&self) -> &'static str {
        match self {
            LeadError::Authentication { .. } => "token",
            LeadError::SchemaFetch { .. } => "fields",
            LeadError::Validation(_) => "validate",
            LeadError::Submission { .. } => "create",
            LeadError::Unexpected(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LeadError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            LeadError::SchemaFetch { .. }
            | LeadError::Validation(_)
            | LeadError::Submission { .. } => StatusCode::BAD_REQUEST,
            LeadError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream status, when the failure came from an upstream reply.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            LeadError::Authentication { status, .. }
            | LeadError::SchemaFetch { status, .. }
            | LeadError::Submission { status, .. } => Some(*status),
            LeadError::Validation(_) | LeadError::Unexpected(_) => None,
        }
    }

    /// Diagnostic payload: the upstream body verbatim, or the message.
    pub fn detail(&self) -> Value {
        match self {
            LeadError::Authentication { body, .. }
            | LeadError::SchemaFetch { body, .. }
            | LeadError::Submission { body, .. } => body.clone(),
            LeadError::Validation(message) | LeadError::Unexpected(message) => {
                Value::String(message.clone())
            }
        }
    }
}

impl From<reqwest::Error> for LeadError {
    fn from(err: reqwest::Error) -> Self {
        // The token call carries credentials in its query string.
        LeadError::Unexpected(format!("upstream request failed: {}", err.without_url()))
    }
}

/// Configuration problems detected while the function cold-starts.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing {0} env var")]
    Missing(&'static str),
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Convert a cold-start configuration error into the Lambda runtime error type.
pub fn lambda_error(err: SettingsError) -> LambdaError {
    let message = err.to_string();
    error!(error = ?err, message = %message, "configuration error forwarded to Lambda runtime");
    LambdaError::from(message)
}
