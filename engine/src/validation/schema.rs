//! JSON Schema validation of mapped records (draft 7).
//!
//! Records are serialized with serde, `null` members are dropped (so
//! optional fields that were left empty count as missing), and the result
//! is checked against the schema. Failures are attributed per property:
//! the property name becomes the field and the schema keyword the rule,
//! which lets the row mapper point each failure at a column.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::{ValidationFailure, Validator};
use crate::error::ConfigError;

/// Keywords that never reject an instance.
const ANNOTATIONS: &[&str] = &[
    "title",
    "description",
    "default",
    "examples",
    "$comment",
    "readOnly",
    "writeOnly",
];

struct PropertyCheck {
    property: String,
    keyword: String,
    validator: jsonschema::Validator,
}

/// Validates `Serialize` records against a JSON schema.
pub struct SchemaValidator {
    whole: jsonschema::Validator,
    required: Vec<String>,
    checks: Vec<PropertyCheck>,
}

impl SchemaValidator {
    /// Compile a schema.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSchema`] if the schema does not compile.
    pub fn new(schema: &Value) -> Result<Self, ConfigError> {
        let whole =
            jsonschema::draft7::new(schema).map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;

        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut checks = Vec::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (property, subschema) in properties {
                checks.extend(property_checks(property, subschema));
            }
        }

        Ok(Self {
            whole,
            required,
            checks,
        })
    }

    /// Parse and compile a schema from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let schema: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;
        Self::new(&schema)
    }

    /// Validate an arbitrary JSON value.
    pub fn validate_value(&self, instance: &Value) -> Vec<ValidationFailure> {
        let instance = strip_nulls(instance.clone());
        let mut failures = Vec::new();

        if let Some(object) = instance.as_object() {
            for name in &self.required {
                if !object.contains_key(name) {
                    failures.push(ValidationFailure::new(
                        name.as_str(),
                        "required",
                        "is a required property",
                    ));
                }
            }

            for check in &self.checks {
                let Some(value) = object.get(&check.property) else {
                    continue;
                };
                if !check.validator.is_valid(value) {
                    let message = check
                        .validator
                        .iter_errors(value)
                        .next()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    failures.push(ValidationFailure::new(
                        check.property.as_str(),
                        check.keyword.as_str(),
                        message,
                    ));
                }
            }
        }

        if failures.is_empty() && !self.whole.is_valid(&instance) {
            failures.extend(
                self.whole
                    .iter_errors(&instance)
                    .map(|e| ValidationFailure::new("", "schema", e.to_string())),
            );
        }

        failures
    }
}

impl<R: Serialize> Validator<R> for SchemaValidator {
    fn validate(&self, record: &R) -> Vec<ValidationFailure> {
        match serde_json::to_value(record) {
            Ok(value) => self.validate_value(&value),
            Err(e) => vec![ValidationFailure::new("", "serialize", e.to_string())],
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("required", &self.required)
            .field("checks", &self.checks.len())
            .finish()
    }
}

/// One single-keyword validator per keyword of a property's subschema.
///
/// Keywords that only make sense together with a sibling fall back to the
/// whole subschema under the `schema` rule.
fn property_checks(property: &str, subschema: &Value) -> Vec<PropertyCheck> {
    let Some(keywords) = subschema.as_object() else {
        return Vec::new();
    };

    let mut checks = Vec::new();
    let mut needs_whole = false;
    for (keyword, value) in keywords {
        if ANNOTATIONS.contains(&keyword.as_str()) {
            continue;
        }
        let mut single = Map::new();
        single.insert(keyword.clone(), value.clone());
        match jsonschema::draft7::new(&Value::Object(single)) {
            Ok(validator) => checks.push(PropertyCheck {
                property: property.to_string(),
                keyword: keyword.clone(),
                validator,
            }),
            Err(_) => needs_whole = true,
        }
    }

    if needs_whole {
        match jsonschema::draft7::new(subschema) {
            Ok(validator) => checks.push(PropertyCheck {
                property: property.to_string(),
                keyword: "schema".to_string(),
                validator,
            }),
            Err(e) => tracing::debug!(property, error = %e, "Property left to whole-schema check"),
        }
    }

    checks
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}
