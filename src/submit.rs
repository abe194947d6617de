use serde_json::Value;
use tracing::info;

use crate::{
    api::TablesApi, auth::AccessToken, config::TableCoordinates, error::LeadError,
    lead::SubmissionRecord,
};

/// Create one row and hand back the service's reply verbatim.
pub async fn submit_record(
    api: &dyn TablesApi,
    token: &AccessToken,
    table: &TableCoordinates,
    record: &SubmissionRecord,
) -> Result<Value, LeadError> {
    let reply = api.create_record(token, table, record).await?;
    if !reply.is_success() {
        return Err(LeadError::Submission {
            status: reply.status,
            body: reply.body,
        });
    }
    let status = reply.status;
    let out = reply.into_json().map_err(|raw| {
        LeadError::Unexpected(format!("record creation response is not JSON: {raw}"))
    })?;
    info!(http_status = status, fields = record.len(), "record created");
    Ok(out)
}
