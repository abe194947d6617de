//! Application-scoped context shared across invocations.

use std::sync::Arc;

use crate::{api::TablesApi, config::Settings};

/// Holds the resolved settings and the upstream client.
///
/// Only cold-start state lives here; tokens and schemas are rebuilt per request.
#[derive(Clone)]
pub struct AppContext {
    settings: Settings,
    api: Arc<dyn TablesApi>,
}

impl AppContext {
    pub fn new(settings: Settings, api: Arc<dyn TablesApi>) -> Self {
        Self { settings, api }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Borrow the client used for token, field and record calls.
    pub fn api(&self) -> &dyn TablesApi {
        self.api.as_ref()
    }
}
