//! Field discovery and fuzzy column matching.
//!
//! Column labels in the destination table are chosen by whoever maintains it,
//! so the handler never hardcodes field ids. Instead every name variant of
//! every field is normalized (lowercase, ASCII alphanumerics only) and stored
//! in an [`AliasLookup`], which semantic roles then query with a prioritized
//! list of aliases.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    api::TablesApi, auth::AccessToken, config::TableCoordinates, error::LeadError,
};

/// Keys that may carry a human-readable field name, in lookup order.
const NAME_KEYS: [&str; 5] = ["display_name", "column_name", "name", "field_name", "label"];
/// Keys that may carry the field identifier, first non-empty wins.
const ID_KEYS: [&str; 3] = ["fieldID", "field_id", "id"];

/// Lowercase (full Unicode) and drop everything outside `a-z` / `0-9`.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Opaque column key used by the tables service.
pub type FieldId = String;

/// One column as described by the field-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub names: Vec<String>,
    pub id: Option<FieldId>,
}

impl FieldDescriptor {
    fn from_json(raw: &Map<String, Value>) -> Self {
        let names = NAME_KEYS
            .iter()
            .filter_map(|key| raw.get(*key).and_then(scalar_text))
            .collect();
        let id = ID_KEYS
            .iter()
            .find_map(|key| raw.get(*key).and_then(scalar_text));
        Self { names, id }
    }
}

/// Textual form of a truthy JSON scalar; empty strings and zero are skipped.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_owned()),
        _ => None,
    }
}

/// Field-list reply: a bare array, an object wrapping `fields`, or anything else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldListResponse {
    Bare(Vec<Value>),
    Wrapped { fields: Vec<Value> },
    Other(Value),
}

impl FieldListResponse {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or(FieldListResponse::Bare(Vec::new()))
    }

    /// Collapse either shape into descriptors; unknown shapes yield none.
    pub fn into_descriptors(self) -> Vec<FieldDescriptor> {
        let items = match self {
            FieldListResponse::Bare(items) | FieldListResponse::Wrapped { fields: items } => items,
            FieldListResponse::Other(_) => Vec::new(),
        };
        items
            .iter()
            .filter_map(Value::as_object)
            .map(FieldDescriptor::from_json)
            .collect()
    }
}

/// Normalized name to field id, kept in first-insertion order.
///
/// Re-inserting a key overwrites its id in place, so the last descriptor that
/// normalizes to a key wins while the key keeps its original scan position.
#[derive(Debug, Default, Clone)]
pub struct AliasLookup {
    entries: Vec<(String, Option<FieldId>)>,
    positions: HashMap<String, usize>,
}

impl AliasLookup {
    pub fn from_descriptors<'a>(fields: impl IntoIterator<Item = &'a FieldDescriptor>) -> Self {
        let mut lookup = Self::default();
        for field in fields {
            for name in &field.names {
                lookup.insert(normalize(name), field.id.clone());
            }
        }
        lookup
    }

    fn insert(&mut self, key: String, id: Option<FieldId>) {
        match self.positions.get(&key) {
            Some(&index) => self.entries[index].1 = id,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, id));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup of an already normalized key.
    pub fn get(&self, key: &str) -> Option<&FieldId> {
        self.positions
            .get(key)
            .and_then(|&index| self.entries[index].1.as_ref())
    }

    /// Resolve the first matching field for a prioritized alias list.
    ///
    /// Exact matches are tried alias by alias. Only when none hits, keys are
    /// scanned in insertion order and the first one containing any alias is
    /// returned, even if that key was recorded without an id.
    pub fn pick(&self, aliases: &[&str]) -> Option<FieldId> {
        let normalized: Vec<String> = aliases.iter().map(|alias| normalize(alias)).collect();

        if let Some(id) = normalized.iter().find_map(|alias| self.get(alias)) {
            return Some(id.clone());
        }

        self.entries
            .iter()
            .find(|(key, _)| normalized.iter().any(|alias| key.contains(alias.as_str())))
            .and_then(|(_, id)| id.clone())
    }
}

/// Fetch the table's fields and index them by normalized name.
pub async fn resolve_schema(
    api: &dyn TablesApi,
    token: &AccessToken,
    table: &TableCoordinates,
) -> Result<AliasLookup, LeadError> {
    let reply = api.list_fields(token, table).await?;
    if !reply.is_success() {
        return Err(LeadError::SchemaFetch {
            status: reply.status,
            body: reply.body,
        });
    }
    let body = reply.into_json().map_err(|raw| {
        LeadError::Unexpected(format!("field list response is not JSON: {raw}"))
    })?;

    let fields = FieldListResponse::from_value(body).into_descriptors();
    let lookup = AliasLookup::from_descriptors(&fields);
    debug!(
        fields = fields.len(),
        keys = lookup.len(),
        "built alias lookup"
    );
    Ok(lookup)
}
