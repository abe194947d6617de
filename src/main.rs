//! Lambda entrypoint.
//!
//! The binary initialises logging, resolves configuration (pulling secrets
//! from SSM when asked to), builds the HTTP client for the token and tables
//! services, and then hands execution to `lambda_http`. The `AppContext` is
//! reused across invocations; access tokens and table schemas are not.

use std::sync::Arc;

use lambda_http::{run, service_fn, Error as LambdaError};
use lead_capture_lambda::{
    api::HttpTablesClient,
    bootstrap::{load_settings, uses_parameter_store},
    error::lambda_error,
    handle_request, AppContext,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .json()
        .with_current_span(false)
        .init();

    let ssm = if uses_parameter_store() {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Some(aws_sdk_ssm::Client::new(&config))
    } else {
        None
    };
    let settings = load_settings(ssm.as_ref()).await.map_err(lambda_error)?;

    info!(
        data_center = %settings.data_center,
        base_id = %settings.table.base_id,
        table_id = %settings.table.table_id,
        view_id = settings.table.view_id.as_deref().unwrap_or(""),
        client_secret = %settings.client_secret.source(),
        refresh_token = %settings.refresh_token.source(),
        "initialising Lambda runtime"
    );

    let api = Arc::new(HttpTablesClient::from_settings(&settings));
    let ctx = Arc::new(AppContext::new(settings, api));

    run(service_fn(move |event| {
        let ctx = ctx.clone();
        async move { handle_request(ctx, event).await }
    }))
    .await
}
