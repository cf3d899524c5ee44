//! Schema dictionary boundary.
//!
//! Stored values are raw; a [`Dictionary`] turns them back into the form
//! consumers expect. Types without a registered schema are unknown to the
//! dictionary and their partitions are skipped by incremental reads.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::sample::TypeName;

/// Decode function for one sample type.
pub type Decoder = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Maps a type name to the reconstruction of its raw values.
pub trait Dictionary: Send + Sync {
    /// Reconstruct `raw` for `type_name`, or `None` if the type has no schema.
    fn reconstruct(&self, type_name: &TypeName, raw: Value) -> Option<Value>;

    fn contains(&self, type_name: &TypeName) -> bool;
}

/// Dictionary built from registered type names.
///
/// Types added with [`TemplateDictionary::with_type`] reconstruct to the raw
/// value unchanged.
#[derive(Default, Clone)]
pub struct TemplateDictionary {
    templates: HashMap<TypeName, Option<Decoder>>,
}

impl TemplateDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type whose stored value is already consumer-ready.
    pub fn with_type(mut self, type_name: impl Into<TypeName>) -> Self {
        self.templates.insert(type_name.into(), None);
        self
    }

    /// Register a type with a decode function.
    pub fn with_decoder<F>(mut self, type_name: impl Into<TypeName>, decoder: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.templates
            .insert(type_name.into(), Some(Arc::new(decoder)));
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<T: Into<TypeName>> FromIterator<T> for TemplateDictionary {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |dictionary, name| dictionary.with_type(name))
    }
}

impl Dictionary for TemplateDictionary {
    fn reconstruct(&self, type_name: &TypeName, raw: Value) -> Option<Value> {
        match self.templates.get(type_name)? {
            Some(decoder) => Some(decoder(raw)),
            None => Some(raw),
        }
    }

    fn contains(&self, type_name: &TypeName) -> bool {
        self.templates.contains_key(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_type_has_no_reconstruction() {
        let dictionary = TemplateDictionary::new().with_type("Temp");
        assert!(dictionary
            .reconstruct(&TypeName::from("Pressure"), json!(1))
            .is_none());
    }

    #[test]
    fn test_plain_type_returns_raw_value() {
        let dictionary: TemplateDictionary = ["Temp"].into_iter().collect();
        assert_eq!(
            dictionary.reconstruct(&TypeName::from("Temp"), json!(21.5)),
            Some(json!(21.5))
        );
    }

    #[test]
    fn test_decoder_applied() {
        let dictionary = TemplateDictionary::new().with_decoder("Temp", |raw| {
            json!({ "degC": raw, "units": "C" })
        });
        assert_eq!(
            dictionary.reconstruct(&TypeName::from("Temp"), json!(21)),
            Some(json!({ "degC": 21, "units": "C" }))
        );
        assert!(dictionary.contains(&TypeName::from("Temp")));
        assert_eq!(dictionary.len(), 1);
    }
}
