//! Boundary with the OAuth token service and the tables REST API.

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client};
use serde_json::Value;
use tracing::debug;

use crate::{
    auth::{AccessToken, TokenRequest},
    config::{Settings, TableCoordinates},
    error::LeadError,
    lead::SubmissionRecord,
};

/// Status and decoded body of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    /// Parsed JSON, or the raw text as a JSON string when it did not parse.
    pub body: Value,
    is_json: bool,
}

impl UpstreamReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            is_json: true,
        }
    }

    pub fn from_text(status: u16, text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(body) => Self::json(status, body),
            Err(_) => Self {
                status,
                body: Value::String(text.to_owned()),
                is_json: false,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The decoded body, or the raw text when the reply was not JSON.
    pub fn into_json(self) -> Result<Value, String> {
        match (self.is_json, self.body) {
            (true, body) => Ok(body),
            (false, Value::String(raw)) => Err(raw),
            (false, other) => Err(other.to_string()),
        }
    }
}

/// The three upstream operations a submission needs.
#[async_trait]
pub trait TablesApi: Send + Sync {
    /// Trade the refresh credential for a short-lived access token.
    async fn exchange_token(
        &self,
        request: &TokenRequest<'_>,
    ) -> Result<UpstreamReply, LeadError>;

    /// List the destination table's fields.
    async fn list_fields(
        &self,
        token: &AccessToken,
        table: &TableCoordinates,
    ) -> Result<UpstreamReply, LeadError>;

    /// Insert one row.
    async fn create_record(
        &self,
        token: &AccessToken,
        table: &TableCoordinates,
        record: &SubmissionRecord,
    ) -> Result<UpstreamReply, LeadError>;
}

/// `reqwest` implementation talking to the real services.
#[derive(Clone)]
pub struct HttpTablesClient {
    http: Client,
    accounts_url: String,
    tables_api_url: String,
}

impl HttpTablesClient {
    pub fn new(
        http: Client,
        accounts_url: impl Into<String>,
        tables_api_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            accounts_url: accounts_url.into(),
            tables_api_url: tables_api_url.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Client::new(),
            settings.accounts_url.clone(),
            settings.tables_api_url.clone(),
        )
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/v2/token", self.accounts_url)
    }

    pub fn fields_url(&self) -> String {
        format!("{}/fields", self.tables_api_url)
    }

    pub fn records_url(&self) -> String {
        format!("{}/records", self.tables_api_url)
    }
}

async fn read_reply(response: reqwest::Response) -> Result<UpstreamReply, LeadError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    Ok(UpstreamReply::from_text(status, &text))
}

#[async_trait]
impl TablesApi for HttpTablesClient {
    async fn exchange_token(
        &self,
        request: &TokenRequest<'_>,
    ) -> Result<UpstreamReply, LeadError> {
        let url = self.token_url();
        debug!(%url, "requesting access token");
        let response = self
            .http
            .post(&url)
            .query(&request.query_pairs())
            .send()
            .await?;
        read_reply(response).await
    }

    async fn list_fields(
        &self,
        token: &AccessToken,
        table: &TableCoordinates,
    ) -> Result<UpstreamReply, LeadError> {
        let url = self.fields_url();
        debug!(%url, table_id = %table.table_id, "listing table fields");
        let response = self
            .http
            .get(&url)
            .query(&table.params())
            .header(AUTHORIZATION, token.header_value())
            .send()
            .await?;
        read_reply(response).await
    }

    async fn create_record(
        &self,
        token: &AccessToken,
        table: &TableCoordinates,
        record: &SubmissionRecord,
    ) -> Result<UpstreamReply, LeadError> {
        let url = self.records_url();
        let mut form = table.params();
        form.push(("field_ids_with_values", record.to_json_string()?));
        debug!(%url, fields = record.len(), "creating record");
        let response = self
            .http
            .post(&url)
            .form(&form)
            .header(AUTHORIZATION, token.header_value())
            .send()
            .await?;
        read_reply(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_keeps_raw_text_when_not_json() {
        let reply = UpstreamReply::from_text(502, "<html>Bad Gateway</html>");
        assert!(!reply.is_success());
        assert_eq!(reply.body, json!("<html>Bad Gateway</html>"));
        assert_eq!(reply.into_json(), Err("<html>Bad Gateway</html>".to_owned()));
    }

    #[test]
    fn reply_decodes_json() {
        let reply = UpstreamReply::from_text(201, r#"{"status":"success"}"#);
        assert!(reply.is_success());
        assert_eq!(reply.into_json(), Ok(json!({ "status": "success" })));
    }

    #[test]
    fn endpoint_urls_are_derived_from_roots() {
        let client = HttpTablesClient::new(
            Client::new(),
            "https://accounts.zoho.eu",
            "https://tables.zoho.com/api/v1",
        );
        assert_eq!(client.token_url(), "https://accounts.zoho.eu/oauth/v2/token");
        assert_eq!(client.fields_url(), "https://tables.zoho.com/api/v1/fields");
        assert_eq!(client.records_url(), "https://tables.zoho.com/api/v1/records");
    }
}
