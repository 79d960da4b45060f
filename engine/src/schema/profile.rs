//! JSON mapping profiles for records that are only known at runtime.
//!
//! A profile lists the fields of a [`DynamicRecord`] together with their
//! mapping hints, and can embed [`ReadOptions`] and a JSON schema. The CLI
//! uses profiles so sheets can be checked without compiling a record type.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::{CellValue, FieldDescriptor, FieldKind, TypeDescriptor};
use crate::error::{ConfigError, ConvertError};
use crate::reader::ReadOptions;

/// One field of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    /// 1-based column number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

/// A named set of field specs plus optional read options and schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ReadOptions>,
    pub fields: Vec<FieldSpec>,
    /// JSON schema applied to each populated record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Profile {
    /// Parse a profile from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::InvalidProfile(e.to_string()))
    }

    /// Build the descriptor of the records this profile describes.
    pub fn descriptor(&self) -> Result<TypeDescriptor<DynamicRecord>, ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::InvalidProfile(format!(
                "profile '{}' has no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let name = spec.name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidProfile("field with empty name".into()));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::InvalidProfile(format!(
                    "duplicate field '{}'",
                    name
                )));
            }
            fields.push(spec.to_descriptor());
        }

        Ok(TypeDescriptor::new(self.name.clone(), fields))
    }
}

impl FieldSpec {
    fn to_descriptor(&self) -> FieldDescriptor<DynamicRecord> {
        let name = self.name.trim().to_string();
        let get_key = name.clone();
        let set_key = name.clone();
        let kind = self.kind;
        let optional = self.optional;

        let mut field = FieldDescriptor::from_accessors(
            name,
            kind,
            optional,
            Arc::new(move |record: &DynamicRecord| {
                record.get(&get_key).cloned().unwrap_or(CellValue::Absent)
            }),
            Arc::new(move |record: &mut DynamicRecord, value: CellValue| {
                if value.is_absent() && !optional {
                    return Err(ConvertError::Unsupported {
                        kind: kind.to_string(),
                        value: String::new(),
                    });
                }
                record.insert(set_key.clone(), value);
                Ok(())
            }),
        )
        .headers(self.headers.iter().cloned());

        if let Some(column) = self.column {
            field = field.column(column);
        }
        if let Some(letter) = &self.letter {
            field = field.letter(letter.clone());
        }
        if self.required {
            field = field.required();
        }
        if let Some(format) = &self.format {
            field = field.format(format.clone());
        }
        if let Some(rules) = &self.rules {
            field = field.rules(rules.clone());
        }
        field
    }
}

// =============================================================================
// Dynamic Record
// =============================================================================

/// Field values of a profile-described record, keyed by field name.
///
/// Serializes as a JSON object; absent values become `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: BTreeMap<String, CellValue>,
}

impl DynamicRecord {
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.values.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: CellValue) {
        self.values.insert(field.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.values.iter())
    }
}

/// Sample profile printed by `sheetbind example-profile`.
pub fn example_profile() -> Profile {
    Profile {
        name: "products".into(),
        options: Some(ReadOptions::default().error_column(10)),
        fields: vec![
            FieldSpec {
                name: "sku".into(),
                kind: FieldKind::Text,
                optional: false,
                headers: vec!["SKU".into(), "Code".into()],
                column: None,
                letter: None,
                required: true,
                format: None,
                rules: Some("len=8".into()),
            },
            FieldSpec {
                name: "price".into(),
                kind: FieldKind::Float,
                optional: false,
                headers: vec!["Price".into()],
                column: None,
                letter: None,
                required: true,
                format: None,
                rules: Some("gt=0".into()),
            },
            FieldSpec {
                name: "active".into(),
                kind: FieldKind::Bool,
                optional: true,
                headers: vec!["Active".into()],
                column: None,
                letter: None,
                required: false,
                format: None,
                rules: None,
            },
            FieldSpec {
                name: "released".into(),
                kind: FieldKind::DateTime,
                optional: true,
                headers: vec!["Released".into()],
                column: None,
                letter: Some("E".into()),
                required: false,
                format: Some("%d.%m.%Y".into()),
                rules: None,
            },
        ],
        schema: Some(serde_json::json!({
            "type": "object",
            "properties": {
                "sku": { "type": "string", "pattern": "^[A-Z]{3}-\\d{4}$" }
            }
        })),
    }
}
