//! Typed telemetry samples.
//!
//! A [`Sample`] is the unit of storage: a decoded value tagged with the name
//! of the schema that produced it and the instant it was observed. The value
//! is opaque to the store and returned verbatim.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Partition key: one per distinct sample schema (e.g. a fully-qualified
/// channel name such as `cdh.blockDrv.BD_Cycles`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An immutable, timestamped, decoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    type_name: TypeName,
    timestamp: DateTime<Utc>,
    value: Value,
}

impl Sample {
    pub fn new(type_name: impl Into<TypeName>, timestamp: DateTime<Utc>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            timestamp,
            value,
        }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the sample, yielding its raw value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Same type and timestamp, different value. Used when materializing a
    /// stored raw value into its consumer-facing form.
    pub fn with_value(self, value: Value) -> Self {
        Self { value, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_name_display_and_borrow() {
        let name = TypeName::from("Temp");
        assert_eq!(name.to_string(), "Temp");
        let borrowed: &str = name.borrow();
        assert_eq!(borrowed, "Temp");
    }

    #[test]
    fn test_type_name_serializes_as_plain_string() {
        let name = TypeName::new("Pressure");
        assert_eq!(serde_json::to_value(&name).unwrap(), json!("Pressure"));
    }

    #[test]
    fn test_with_value_keeps_type_and_time() {
        let ts = Utc::now();
        let sample = Sample::new("Temp", ts, json!(1)).with_value(json!({"degC": 1}));
        assert_eq!(sample.type_name().as_str(), "Temp");
        assert_eq!(sample.timestamp(), ts);
        assert_eq!(sample.value(), &json!({"degC": 1}));
    }
}
