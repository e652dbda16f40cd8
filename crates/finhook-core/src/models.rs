//! Webhook envelope, stored record, and derived metadata types.
//!
//! The envelope is the provider-defined payload; a `Submission` is an
//! envelope that passed shape validation and keeps the raw JSON so the stored
//! `data` field is exactly what the provider sent.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Sentinel used in metadata when a value is unavailable.
pub const NOT_AVAILABLE: &str = "N/A";

/// File-name component used when the envelope carries no account number.
pub const PARTNER_SENTINEL: &str = "partner";

/// Classification of a webhook by payload shape.
///
/// Each variant is also a storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookType {
    /// Envelope carries a non-empty account number.
    OperationsByAccount,
    /// Envelope has no account number; partner-wide positions file.
    PositionsByPartner,
}

impl WebhookType {
    /// Every known webhook type, in listing order.
    pub const ALL: [Self; 2] = [Self::OperationsByAccount, Self::PositionsByPartner];

    /// Classifies a response block.
    ///
    /// `operations-by-account` iff `accountNumber` is present and non-empty.
    pub fn classify(response: &WebhookResponse) -> Self {
        if response.account_number().is_some() {
            Self::OperationsByAccount
        } else {
            Self::PositionsByPartner
        }
    }

    /// Wire and directory name of the type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OperationsByAccount => "operations-by-account",
            Self::PositionsByPartner => "positions-by-partner",
        }
    }
}

impl fmt::Display for WebhookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error entry reported by the provider inside the envelope.
///
/// Scalar codes and messages are kept as text; anything else reads as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderError {
    /// Provider error code
    #[serde(default, deserialize_with = "lenient::text")]
    pub code: Option<String>,
    /// Provider error description
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
}

/// The `response` block of a provider envelope.
///
/// Only `url` is required. Optional fields with an unexpected JSON type are
/// treated as absent rather than failing the whole envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// Account the file refers to, absent for partner-wide files
    #[serde(default, deserialize_with = "lenient::text")]
    pub account_number: Option<String>,
    /// Size of the file as reported by the provider, kept as sent
    #[serde(default, deserialize_with = "lenient::present")]
    pub file_size: Option<Value>,
    /// Start of the reported period
    #[serde(default, deserialize_with = "lenient::text")]
    pub start_date: Option<String>,
    /// End of the reported period
    #[serde(default, deserialize_with = "lenient::text")]
    pub end_date: Option<String>,
    /// Download URL of the generated file
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    /// Last modification time of the file as reported by the provider
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_modified: Option<String>,
}

impl WebhookResponse {
    /// Account number, if present and non-empty.
    pub fn account_number(&self) -> Option<&str> {
        non_empty(self.account_number.as_deref())
    }

    /// Formats the reported period, or `N/A` unless both ends are present.
    pub fn period(&self) -> String {
        match (non_empty(self.start_date.as_deref()), non_empty(self.end_date.as_deref())) {
            (Some(start), Some(end)) => format!("{start} até {end}"),
            _ => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Provider-defined webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Errors reported by the provider, in order
    #[serde(default, deserialize_with = "lenient::errors")]
    pub errors: Vec<ProviderError>,
    /// Description of the generated file
    pub response: Option<WebhookResponse>,
}

/// Field readers that never fail on a type mismatch.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::ProviderError;

    /// Strings as-is; numbers and booleans in their JSON text form.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    /// Strings only.
    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    /// Any non-null value, untouched.
    pub fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.filter(|v| !v.is_null()))
    }

    /// An array of error entries; entries that are not objects read as empty.
    pub fn errors<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ProviderError>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| ProviderError::deserialize(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Summary derived from an envelope at receipt time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Account number, or `N/A`
    pub account_number: String,
    /// File size as reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<Value>,
    /// `"<start> até <end>"`, or `N/A`
    pub period: String,
    /// Download URL of the generated file
    pub download_url: String,
}

/// Envelope that passed shape validation.
///
/// Holds the raw JSON alongside the typed view so unknown provider fields
/// survive into storage untouched.
#[derive(Debug, Clone)]
pub struct Submission {
    raw: Value,
    response: WebhookResponse,
    download_url: String,
    provider_errors: Vec<ProviderError>,
}

impl Submission {
    /// Validates a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPayload` if the body is not an object, does
    /// not match the envelope shape, or lacks a non-empty `response.url`.
    pub fn parse(raw: Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(CoreError::InvalidPayload("envelope must be a JSON object".into()));
        }

        let envelope = WebhookEnvelope::deserialize(&raw)
            .map_err(|e| CoreError::InvalidPayload(e.to_string()))?;

        let response = envelope
            .response
            .ok_or_else(|| CoreError::InvalidPayload("missing response".into()))?;

        let download_url = non_empty(response.url.as_deref())
            .map(str::to_string)
            .ok_or_else(|| CoreError::InvalidPayload("missing response.url".into()))?;

        Ok(Self { raw, response, download_url, provider_errors: envelope.errors })
    }

    /// Classification of this submission.
    pub fn webhook_type(&self) -> WebhookType {
        WebhookType::classify(&self.response)
    }

    /// Account number, if present and non-empty.
    pub fn account_number(&self) -> Option<&str> {
        self.response.account_number()
    }

    /// Errors the provider reported alongside the file.
    pub fn provider_errors(&self) -> &[ProviderError] {
        &self.provider_errors
    }

    /// Derives the receipt metadata.
    pub fn metadata(&self) -> Metadata {
        Metadata {
            account_number: self.account_number().unwrap_or(NOT_AVAILABLE).to_string(),
            file_size: self.response.file_size.clone(),
            period: self.response.period(),
            download_url: self.download_url.clone(),
        }
    }

    /// Storage name for this submission at the given millisecond stamp.
    pub fn file_name(&self, stamp_ms: i64) -> String {
        record_file_name(self.webhook_type(), self.account_number(), stamp_ms)
    }

    /// Builds the record to persist, consuming the raw envelope.
    pub fn into_record(self, timestamp: DateTime<Utc>) -> StoredRecord {
        let webhook_type = self.webhook_type();
        let metadata = self.metadata();
        StoredRecord { timestamp, webhook_type, data: self.raw, metadata }
    }
}

/// Builds `<type>-<account|partner>-<millis>.json`.
///
/// The account component is restricted to `[A-Za-z0-9_-]`; anything else
/// becomes `_` so the name cannot leave its partition.
pub fn record_file_name(webhook_type: WebhookType, account: Option<&str>, stamp_ms: i64) -> String {
    let account = match non_empty(account) {
        Some(account) => sanitize_component(account),
        None => PARTNER_SENTINEL.to_string(),
    };
    format!("{webhook_type}-{account}-{stamp_ms}.json")
}

fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// A persisted webhook. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Receipt time
    #[serde(with = "millis_rfc3339")]
    pub timestamp: DateTime<Utc>,
    /// Classification of the envelope
    pub webhook_type: WebhookType,
    /// The envelope exactly as received
    pub data: Value,
    /// Derived summary
    pub metadata: Metadata,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Name the record was stored under
    pub file_name: String,
    /// Classification of the envelope
    pub webhook_type: WebhookType,
    /// Derived summary
    pub metadata: Metadata,
}

/// A stored record together with its name, as returned by listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedRecord {
    /// Name the record is stored under
    pub file_name: String,
    /// The stored record
    pub data: StoredRecord,
}

/// Stored records grouped by webhook type.
pub type Listing = BTreeMap<WebhookType, Vec<ListedRecord>>;

mod millis_rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
