//! JSON field extraction shared by every record decoder.
//!
//! Records are decoded by walking a `serde_json::Value` rather than through
//! `#[derive(Deserialize)]` so that every failure names both the missing key
//! and the record being built. Optional accessors treat an absent key and an
//! explicit `null` the same way.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Parse a response body as JSON, attributing syntax errors to `record`.
pub(crate) fn parse_body(body: &str, record: &'static str) -> Result<Value, DecodeError> {
    serde_json::from_str(body).map_err(|e| DecodeError::Malformed {
        record,
        message: e.to_string(),
    })
}

/// Borrowed view over one JSON object while decoding `record`.
pub(crate) struct Fields<'a> {
    record: &'static str,
    object: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(value: &'a Value, record: &'static str) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or_else(|| DecodeError::Malformed {
            record,
            message: format!("expected JSON object, got {}", kind_of(value)),
        })?;
        Ok(Self { record, object })
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.present(key).ok_or_else(|| DecodeError::MissingField {
            record: self.record,
            field: key.to_owned(),
        })
    }

    fn invalid(&self, key: &str, expected: &'static str) -> DecodeError {
        DecodeError::InvalidField {
            record: self.record,
            field: key.to_owned(),
            expected,
        }
    }

    pub(crate) fn str(&self, key: &str) -> Result<String, DecodeError> {
        self.required(key)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.invalid(key, "string"))
    }

    pub(crate) fn opt_str(&self, key: &str) -> Result<Option<String>, DecodeError> {
        match self.present(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_owned()))
                .ok_or_else(|| self.invalid(key, "string")),
        }
    }

    pub(crate) fn u64(&self, key: &str) -> Result<u64, DecodeError> {
        self.required(key)?
            .as_u64()
            .ok_or_else(|| self.invalid(key, "unsigned integer"))
    }

    pub(crate) fn opt_u64(&self, key: &str) -> Result<Option<u64>, DecodeError> {
        match self.present(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "unsigned integer")),
        }
    }

    pub(crate) fn u32(&self, key: &str) -> Result<u32, DecodeError> {
        u32::try_from(self.u64(key)?).map_err(|_| self.invalid(key, "32-bit unsigned integer"))
    }

    pub(crate) fn opt_u32(&self, key: &str) -> Result<Option<u32>, DecodeError> {
        self.opt_u64(key)?
            .map(|n| u32::try_from(n).map_err(|_| self.invalid(key, "32-bit unsigned integer")))
            .transpose()
    }

    pub(crate) fn i64(&self, key: &str) -> Result<i64, DecodeError> {
        self.required(key)?
            .as_i64()
            .ok_or_else(|| self.invalid(key, "integer"))
    }

    pub(crate) fn opt_i64(&self, key: &str) -> Result<Option<i64>, DecodeError> {
        match self.present(key) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "integer")),
        }
    }

    pub(crate) fn f64(&self, key: &str) -> Result<f64, DecodeError> {
        self.required(key)?
            .as_f64()
            .ok_or_else(|| self.invalid(key, "number"))
    }

    pub(crate) fn opt_f64(&self, key: &str) -> Result<Option<f64>, DecodeError> {
        match self.present(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "number")),
        }
    }

    /// A coin amount that some Insight versions render as a decimal string
    /// (`"0.01000000"`) and others as a JSON number.
    pub(crate) fn amount(&self, key: &str) -> Result<f64, DecodeError> {
        match self.required(key)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| self.invalid(key, "number")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| self.invalid(key, "numeric string")),
            _ => Err(self.invalid(key, "number or numeric string")),
        }
    }

    pub(crate) fn bool(&self, key: &str) -> Result<bool, DecodeError> {
        self.required(key)?
            .as_bool()
            .ok_or_else(|| self.invalid(key, "boolean"))
    }

    pub(crate) fn opt_bool(&self, key: &str) -> Result<Option<bool>, DecodeError> {
        match self.present(key) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "boolean")),
        }
    }

    pub(crate) fn timestamp(&self, key: &str) -> Result<DateTime<Utc>, DecodeError> {
        let secs = self.i64(key)?;
        DateTime::from_timestamp(secs, 0).ok_or_else(|| self.invalid(key, "unix timestamp"))
    }

    pub(crate) fn opt_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, DecodeError> {
        self.opt_i64(key)?
            .map(|secs| {
                DateTime::from_timestamp(secs, 0).ok_or_else(|| self.invalid(key, "unix timestamp"))
            })
            .transpose()
    }

    pub(crate) fn array(&self, key: &str) -> Result<&'a [Value], DecodeError> {
        self.required(key)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid(key, "array"))
    }

    /// Like [`Fields::array`] but yields an empty slice when the key is absent.
    pub(crate) fn opt_array(&self, key: &str) -> Result<&'a [Value], DecodeError> {
        match self.present(key) {
            None => Ok(&[]),
            Some(v) => v
                .as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| self.invalid(key, "array")),
        }
    }

    pub(crate) fn strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        collect_strings(self.array(key)?, || self.invalid(key, "array of strings"))
    }

    pub(crate) fn opt_strings(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        collect_strings(self.opt_array(key)?, || {
            self.invalid(key, "array of strings")
        })
    }

    /// Nested object decoded under a different record name.
    pub(crate) fn opt_object(
        &self,
        key: &str,
        record: &'static str,
    ) -> Result<Option<Fields<'a>>, DecodeError> {
        self.present(key).map(|v| Fields::new(v, record)).transpose()
    }

    /// Raw nested value, for decoders that dispatch on it themselves.
    pub(crate) fn value(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.required(key)
    }
}

fn collect_strings(
    items: &[Value],
    invalid: impl Fn() -> DecodeError,
) -> Result<Vec<String>, DecodeError> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(&invalid))
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
