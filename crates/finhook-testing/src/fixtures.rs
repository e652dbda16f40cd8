//! Envelope builders for test setup.
//!
//! Builds provider envelopes as raw JSON so tests can also produce shapes the
//! typed model would refuse.

use serde_json::{json, Map, Value};

/// Builder for provider webhook envelopes.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder {
    account_number: Option<String>,
    file_size: Option<Value>,
    start_date: Option<String>,
    end_date: Option<String>,
    url: Option<String>,
    last_modified: Option<String>,
    errors: Vec<Value>,
    extra: Map<String, Value>,
}

impl EnvelopeBuilder {
    /// Creates an envelope with no fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-account operations envelope with a download URL.
    pub fn operations(account: &str) -> Self {
        Self::new().account(account).file_size(1024).url(format!("https://files.example/{account}.csv"))
    }

    /// Partner-wide positions envelope with a download URL.
    pub fn positions() -> Self {
        Self::new().file_size(2048).url("https://files.example/positions.csv")
    }

    /// Sets `response.accountNumber`.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account_number = Some(account.into());
        self
    }

    /// Sets `response.fileSize`.
    #[must_use]
    pub fn file_size(mut self, size: u64) -> Self {
        self.file_size = Some(json!(size));
        self
    }

    /// Sets `response.fileSize` to an arbitrary JSON value.
    #[must_use]
    pub fn file_size_value(mut self, size: Value) -> Self {
        self.file_size = Some(size);
        self
    }

    /// Sets both period bounds.
    #[must_use]
    pub fn period(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    /// Sets `response.url`.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets `response.lastModified`.
    #[must_use]
    pub fn last_modified(mut self, value: impl Into<String>) -> Self {
        self.last_modified = Some(value.into());
        self
    }

    /// Appends a provider error.
    #[must_use]
    pub fn error(mut self, code: &str, message: &str) -> Self {
        self.errors.push(json!({"code": code, "message": message}));
        self
    }

    /// Adds a field the model does not know about to `response`.
    #[must_use]
    pub fn extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Builds the envelope JSON.
    pub fn build(self) -> Value {
        let mut response = self.extra;
        let fields = [
            ("accountNumber", self.account_number.map(Value::String)),
            ("fileSize", self.file_size),
            ("startDate", self.start_date.map(Value::String)),
            ("endDate", self.end_date.map(Value::String)),
            ("url", self.url.map(Value::String)),
            ("lastModified", self.last_modified.map(Value::String)),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                response.insert(key.to_string(), value);
            }
        }

        json!({ "errors": self.errors, "response": response })
    }
}
