use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lambda_http::{Body, Request};
use lead_capture_lambda::{
    api::{TablesApi, UpstreamReply},
    auth::{AccessToken, TokenRequest},
    config::{ResolutionSource, Secret, Settings, TableCoordinates},
    lead::SubmissionRecord,
    AppContext, LeadError,
};
use serde_json::{json, Value};

pub fn body_as_string(body: &Body) -> String {
    match body {
        Body::Text(s) => s.clone(),
        Body::Binary(b) => String::from_utf8_lossy(b).to_string(),
        Body::Empty => String::new(),
    }
}

pub fn body_json(body: &Body) -> Value {
    serde_json::from_str(&body_as_string(body)).unwrap_or(Value::Null)
}

/// One recorded upstream call.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Token {
        refresh_token: String,
        client_id: String,
        client_secret: String,
    },
    Fields {
        authorization: String,
        table: TableCoordinates,
    },
    Create {
        authorization: String,
        table: TableCoordinates,
        record: Value,
    },
}

/// Canned-reply stand-in for the token and tables services.
pub struct FakeTablesApi {
    token_reply: UpstreamReply,
    fields_reply: UpstreamReply,
    create_reply: UpstreamReply,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl FakeTablesApi {
    pub fn new() -> Self {
        Self {
            token_reply: UpstreamReply::json(
                200,
                json!({ "access_token": "tok-1", "expires_in": 3600, "token_type": "Bearer" }),
            ),
            fields_reply: UpstreamReply::json(200, standard_fields()),
            create_reply: UpstreamReply::json(
                200,
                json!({ "status": "success", "data": { "record_id": "rec-42" } }),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_token_reply(mut self, reply: UpstreamReply) -> Self {
        self.token_reply = reply;
        self
    }

    pub fn with_fields_reply(mut self, reply: UpstreamReply) -> Self {
        self.fields_reply = reply;
        self
    }

    pub fn with_create_reply(mut self, reply: UpstreamReply) -> Self {
        self.create_reply = reply;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn created_records(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create { record, .. } => Some(record),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl TablesApi for FakeTablesApi {
    async fn exchange_token(
        &self,
        request: &TokenRequest<'_>,
    ) -> Result<UpstreamReply, LeadError> {
        self.record(Call::Token {
            refresh_token: request.refresh_token.to_owned(),
            client_id: request.client_id.to_owned(),
            client_secret: request.client_secret.to_owned(),
        });
        Ok(self.token_reply.clone())
    }

    async fn list_fields(
        &self,
        token: &AccessToken,
        table: &TableCoordinates,
    ) -> Result<UpstreamReply, LeadError> {
        self.record(Call::Fields {
            authorization: token.header_value(),
            table: table.clone(),
        });
        Ok(self.fields_reply.clone())
    }

    async fn create_record(
        &self,
        token: &AccessToken,
        table: &TableCoordinates,
        record: &SubmissionRecord,
    ) -> Result<UpstreamReply, LeadError> {
        let record = serde_json::from_str(&record.to_json_string()?)
            .map_err(|e| LeadError::Unexpected(e.to_string()))?;
        self.record(Call::Create {
            authorization: token.header_value(),
            table: table.clone(),
            record,
        });
        Ok(self.create_reply.clone())
    }
}

/// A field list covering every semantic role, in the bare-array shape.
pub fn standard_fields() -> Value {
    json!([
        { "display_name": "Lead Name", "column_name": "lead_name", "fieldID": "f-name" },
        { "display_name": "Lead Number", "fieldID": "f-phone" },
        { "display_name": "Lead Email ID", "fieldID": "f-email" },
        { "display_name": "Lead Source", "fieldID": "f-source" },
        { "display_name": "ZIP", "fieldID": "f-zip" },
        { "display_name": "Requested Service", "fieldID": "f-service" },
        { "display_name": "Notes", "fieldID": "f-details" },
        { "display_name": "Page URL", "fieldID": "f-page" },
        { "display_name": "Route", "fieldID": "f-route" },
        { "display_name": "Submitted At", "fieldID": "f-ts" },
    ])
}

pub fn test_settings() -> Settings {
    Settings {
        client_id: "client-1".into(),
        client_secret: Secret::new("secret-1", ResolutionSource::EnvVar),
        refresh_token: Secret::new("refresh-1", ResolutionSource::EnvVar),
        data_center: "us".into(),
        table: TableCoordinates::new("base-1", "table-1", Some("view-1".into())),
        default_lead_source: "Website".into(),
        accounts_url: "http://accounts.invalid".into(),
        tables_api_url: "http://tables.invalid/api/v1".into(),
    }
}

pub struct TestSetup {
    pub ctx: Arc<AppContext>,
    pub api: Arc<FakeTablesApi>,
}

pub fn setup_with(api: FakeTablesApi) -> TestSetup {
    let api = Arc::new(api);
    let ctx = Arc::new(AppContext::new(test_settings(), api.clone()));
    TestSetup { ctx, api }
}

#[allow(dead_code)]
pub fn setup() -> TestSetup {
    setup_with(FakeTablesApi::new())
}

pub fn request(method: &str, body: Body) -> Request {
    lambda_http::http::Request::builder()
        .method(method)
        .uri("/api/lead")
        .header("content-type", "application/json")
        .body(body)
        .expect("request")
}

#[allow(dead_code)]
pub fn post_json(payload: Value) -> Request {
    request("POST", Body::Text(payload.to_string()))
}
