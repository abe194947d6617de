pub mod config;

pub mod api;
pub mod auth;
pub mod bootstrap;
mod context;
pub mod error;
mod handlers;
pub mod lead;
pub mod schema;
pub mod submit;

pub use context::AppContext;
pub use error::LeadError;
pub use handlers::{handle_request, parse_payload, process_lead};
