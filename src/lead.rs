use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    error::LeadError,
    schema::{AliasLookup, FieldId},
};

/// Incoming form submission. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LeadPayload {
    #[serde(rename = "firstName", deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zip: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub service: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub details: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub page: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub route: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ts: Option<String>,
}

/// Accept strings, numbers and booleans; anything else counts as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl LeadPayload {
    /// Decode a JSON value; anything that is not a usable object is empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// `firstName lastName` when either is present, otherwise `name`.
    pub fn full_name(&self) -> String {
        let joined = [non_empty(&self.first_name), non_empty(&self.last_name)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let joined = joined.trim();
        if !joined.is_empty() {
            return joined.to_owned();
        }
        non_empty(&self.name).unwrap_or_default().to_owned()
    }
}

/// Logical slot a table column can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticRole {
    LeadName,
    Phone,
    Email,
    Source,
    Zip,
    Service,
    Details,
    Page,
    Route,
    Timestamp,
}

impl SemanticRole {
    /// All roles, in binding order.
    pub const ALL: [SemanticRole; 10] = [
        SemanticRole::LeadName,
        SemanticRole::Phone,
        SemanticRole::Email,
        SemanticRole::Source,
        SemanticRole::Zip,
        SemanticRole::Service,
        SemanticRole::Details,
        SemanticRole::Page,
        SemanticRole::Route,
        SemanticRole::Timestamp,
    ];

    /// Candidate column labels, highest priority first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            SemanticRole::LeadName => &["Lead Name", "Name", "Full Name"],
            SemanticRole::Phone => &["Lead Number", "Phone", "Phone Number", "Mobile"],
            SemanticRole::Email => &["Lead Email ID", "Email", "Email Address"],
            SemanticRole::Source => &["Lead Source", "Source"],
            SemanticRole::Zip => &["ZIP", "Zip Code", "Postal Code"],
            SemanticRole::Service => &["Service", "Requested Service"],
            SemanticRole::Details => &["Details", "Notes", "Message"],
            SemanticRole::Page => &["Page", "Page URL", "URL"],
            SemanticRole::Route => &["Route", "Path"],
            SemanticRole::Timestamp => &["Timestamp", "Submitted At", "Created At"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SemanticRole::LeadName => "name",
            SemanticRole::Phone => "phone",
            SemanticRole::Email => "email",
            SemanticRole::Source => "source",
            SemanticRole::Zip => "zip",
            SemanticRole::Service => "service",
            SemanticRole::Details => "details",
            SemanticRole::Page => "page",
            SemanticRole::Route => "route",
            SemanticRole::Timestamp => "timestamp",
        }
    }
}

/// Role to field id, for the roles that resolved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoleBindings(Vec<(SemanticRole, FieldId)>);

impl RoleBindings {
    pub fn resolve(lookup: &AliasLookup) -> Self {
        Self(
            SemanticRole::ALL
                .into_iter()
                .filter_map(|role| lookup.pick(role.aliases()).map(|id| (role, id)))
                .collect(),
        )
    }

    pub fn get(&self, role: SemanticRole) -> Option<&FieldId> {
        self.0.iter().find(|(r, _)| *r == role).map(|(_, id)| id)
    }

    pub fn roles(&self) -> Vec<&'static str> {
        self.0.iter().map(|(role, _)| role.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SemanticRole, FieldId)> {
        self.0.iter()
    }
}

impl FromIterator<(SemanticRole, FieldId)> for RoleBindings {
    fn from_iter<I: IntoIterator<Item = (SemanticRole, FieldId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Field id to cell value, ready for the create-record call.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionRecord(BTreeMap<FieldId, String>);

impl SubmissionRecord {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn to_json_string(&self) -> Result<String, LeadError> {
        serde_json::to_string(&self.0)
            .map_err(|e| LeadError::Unexpected(format!("failed to encode record: {e}")))
    }
}

/// A lead ready to be written, plus the name/phone pair used for validation.
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub full_name: String,
    pub phone: String,
    pub record: SubmissionRecord,
}

impl LeadRecord {
    /// Map the payload onto the resolved roles.
    ///
    /// A later role bound to the same field id overwrites an earlier one.
    /// `now` supplies the timestamp when the payload carries no `ts`.
    pub fn build(
        payload: &LeadPayload,
        bindings: &RoleBindings,
        default_source: &str,
        now: impl FnOnce() -> String,
    ) -> Self {
        let full_name = payload.full_name();
        let phone = payload.phone.clone().unwrap_or_default();
        let mut timestamp = non_empty(&payload.ts).map(str::to_owned);
        let mut now = Some(now);

        let mut cells = BTreeMap::new();
        for (role, id) in bindings.iter() {
            let value = match role {
                SemanticRole::LeadName => full_name.clone(),
                SemanticRole::Phone => phone.clone(),
                SemanticRole::Email => payload.email.clone().unwrap_or_default(),
                SemanticRole::Source => default_source.to_owned(),
                SemanticRole::Zip => payload.zip.clone().unwrap_or_default(),
                SemanticRole::Service => payload.service.clone().unwrap_or_default(),
                SemanticRole::Details => payload.details.clone().unwrap_or_default(),
                SemanticRole::Page => payload.page.clone().unwrap_or_default(),
                SemanticRole::Route => payload.route.clone().unwrap_or_default(),
                SemanticRole::Timestamp => timestamp
                    .get_or_insert_with(|| now.take().map(|f| f()).unwrap_or_default())
                    .clone(),
            };
            cells.insert(id.clone(), value);
        }

        Self {
            full_name,
            phone,
            record: SubmissionRecord(cells),
        }
    }

    /// Reject empty records and leads with neither a name nor a phone.
    pub fn validate(&self) -> Result<(), LeadError> {
        if self.record.is_empty() {
            return Err(LeadError::Validation(
                "no table columns matched the submitted fields".into(),
            ));
        }
        if self.full_name.is_empty() && self.phone.is_empty() {
            return Err(LeadError::Validation("name or phone is required".into()));
        }
        Ok(())
    }
}

/// Current UTC time in `toISOString` form.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
