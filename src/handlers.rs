use std::sync::Arc;

use lambda_http::{
    http::{header, Method, StatusCode},
    Body, Error as LambdaError, Request, RequestExt, Response,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    auth::fetch_access_token,
    context::AppContext,
    error::LeadError,
    lead::{iso_timestamp, LeadPayload, LeadRecord, RoleBindings},
    schema::resolve_schema,
    submit::submit_record,
};

const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "Content-Type, Authorization"),
    ("access-control-allow-methods", "POST, OPTIONS"),
];

/// Top-level request dispatcher used by the Lambda runtime.
pub async fn handle_request(
    ctx: Arc<AppContext>,
    event: Request,
) -> Result<Response<Body>, LambdaError> {
    let request_id = event
        .lambda_context_ref()
        .map(|lambda| lambda.request_id.clone())
        .unwrap_or_default();
    let span = info_span!("lead", %request_id, method = %event.method());

    async move {
        match *event.method() {
            Method::OPTIONS => Ok(empty_response(StatusCode::NO_CONTENT)),
            Method::POST => Ok(capture_lead(ctx.as_ref(), event.body()).await),
            _ => Ok(json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "ok": false, "error": "Method not allowed" }),
            )),
        }
    }
    .instrument(span)
    .await
}

async fn capture_lead(ctx: &AppContext, body: &Body) -> Response<Body> {
    match process_lead(ctx, body).await {
        Ok(out) => json_response(StatusCode::OK, json!({ "ok": true, "out": out })),
        Err(err) => error_response(&err),
    }
}

/// Run the token, schema and submission stages for one form post.
pub async fn process_lead(ctx: &AppContext, body: &Body) -> Result<Value, LeadError> {
    let settings = ctx.settings();

    debug!("exchanging refresh token");
    let token = fetch_access_token(ctx.api(), settings).await?;

    debug!("resolving table schema");
    let lookup = resolve_schema(ctx.api(), &token, &settings.table).await?;
    let payload = parse_payload(body);

    let bindings = RoleBindings::resolve(&lookup);
    info!(
        keys = lookup.len(),
        roles = ?bindings.roles(),
        "resolved semantic roles"
    );

    let lead = LeadRecord::build(
        &payload,
        &bindings,
        &settings.default_lead_source,
        iso_timestamp,
    );
    lead.validate()?;

    debug!("submitting record");
    submit_record(ctx.api(), &token, &settings.table, &lead.record).await
}

/// Decode the request body; anything unreadable becomes an empty payload.
pub fn parse_payload(body: &Body) -> LeadPayload {
    let parsed: Option<Value> = match body {
        Body::Text(text) => serde_json::from_str(text).ok(),
        Body::Binary(bytes) => serde_json::from_slice(bytes).ok(),
        Body::Empty => None,
    };
    let value = match parsed {
        // Double-encoded body: a JSON string holding the actual object.
        Some(Value::String(inner)) => serde_json::from_str(&inner).unwrap_or(Value::Null),
        Some(value) => value,
        None => {
            warn!("request body is not JSON; treating it as empty");
            Value::Null
        }
    };
    LeadPayload::from_value(value)
}

fn error_response(err: &LeadError) -> Response<Body> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(category = %err.category(), error = %err, "lead capture failed");
        return json_response(status, json!({ "ok": false, "error": err.to_string() }));
    }
    warn!(category = %err.category(), step = err.step(), error = %err, "lead rejected");
    json_response(
        status,
        json!({
            "ok": false,
            "step": err.step(),
            "status": err.upstream_status().unwrap_or_else(|| status.as_u16()),
            "detail": err.detail(),
        }),
    )
}

fn with_cors(
    builder: lambda_http::http::response::Builder,
) -> lambda_http::http::response::Builder {
    CORS_HEADERS
        .iter()
        .fold(builder, |builder, (name, value)| builder.header(*name, *value))
}

fn empty_response(status: StatusCode) -> Response<Body> {
    with_cors(Response::builder().status(status))
        .body(Body::Empty)
        .unwrap_or_else(|_| fallback_response(status))
}

fn json_response<T: Serialize>(status: StatusCode, value: T) -> Response<Body> {
    let body = serde_json::to_string(&value).unwrap_or_else(|_| "{}".into());

    if status.is_server_error() {
        error!(
            http_status = status.as_u16(),
            body = %body,
            "returning server error response"
        );
    } else if status.is_client_error() {
        warn!(
            http_status = status.as_u16(),
            body = %body,
            "returning client error response"
        );
    }

    with_cors(Response::builder().status(status))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::Text(body))
        .unwrap_or_else(|_| fallback_response(status))
}

fn fallback_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_response_sets_content_type_and_cors() {
        let response = json_response(StatusCode::OK, json!({ "ok": true }));
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "POST, OPTIONS"
        );
    }

    #[test]
    fn parses_text_binary_and_double_encoded_bodies() {
        let text = parse_payload(&Body::Text(r#"{"phone":"1"}"#.into()));
        assert_eq!(text.phone.as_deref(), Some("1"));

        let binary = parse_payload(&Body::Binary(br#"{"name":"Ann"}"#.to_vec()));
        assert_eq!(binary.name.as_deref(), Some("Ann"));

        let wrapped = parse_payload(&Body::Text(r#""{\"zip\":\"90210\"}""#.into()));
        assert_eq!(wrapped.zip.as_deref(), Some("90210"));
    }

    #[test]
    fn unparsable_bodies_are_empty() {
        for body in [
            Body::Empty,
            Body::Text("firstName=Jane".into()),
            Body::Text("[1,2,3]".into()),
            Body::Binary(vec![0xff, 0xfe]),
        ] {
            let payload = parse_payload(&body);
            assert_eq!(payload.full_name(), "");
            assert!(payload.phone.is_none());
        }
    }

    #[test]
    fn validation_error_reports_step_and_status() {
        let response = error_response(&LeadError::Validation("name or phone is required".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let Body::Text(body) = response.body() else {
            panic!("expected text body");
        };
        let value: Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["step"], "validate");
        assert_eq!(value["status"], 400);
        assert_eq!(value["detail"], "name or phone is required");
    }
}
