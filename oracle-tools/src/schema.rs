//! Parameter schemas for typed capabilities and validation against them

use std::collections::BTreeMap;

use oracle_core::ValidationError;
use serde::{Deserialize, Serialize};

use crate::value::{Arguments, Value};

/// Primitive type tag of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Integer => "integer",
            PropertyType::Boolean => "boolean",
            PropertyType::Array => "array",
            PropertyType::Object => "object",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (PropertyType::String, Value::String(_)) => true,
            (PropertyType::Number, Value::Number(_) | Value::Integer(_)) => true,
            (PropertyType::Integer, v) => v.as_i64().is_some(),
            (PropertyType::Boolean, Value::Boolean(_)) => true,
            (PropertyType::Array, Value::Array(_)) => true,
            (PropertyType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

/// A single declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: PropertyType,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Item schema, required for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Property>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Property {
    pub fn new(kind: PropertyType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            enum_values: None,
            items: None,
            default: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(PropertyType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(PropertyType::Number, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(PropertyType::Integer, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(PropertyType::Boolean, description)
    }

    pub fn array(description: impl Into<String>, items: Property) -> Self {
        let mut property = Self::new(PropertyType::Array, description);
        property.items = Some(Box::new(items));
        property
    }

    pub fn with_enum<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Check the declaration itself is well formed
    fn check(&self, field: &str) -> Result<(), ValidationError> {
        if let Some(values) = &self.enum_values {
            if values.is_empty() {
                return Err(ValidationError::new(field, "enum must list at least one value"));
            }
            if let Some(bad) = values.iter().find(|v| !self.kind.accepts(v)) {
                return Err(ValidationError::new(
                    field,
                    format!("enum value does not match declared type {}", self.kind.as_str()),
                )
                .with_value(bad.to_json()));
            }
        }
        match (&self.kind, &self.items) {
            (PropertyType::Array, None) => Err(ValidationError::new(
                field,
                "array property must declare an item schema",
            )),
            (PropertyType::Array, Some(items)) => items.check(&format!("{field}[]")),
            _ => Ok(()),
        }
    }

    /// Validate a supplied value against this property
    pub fn validate(&self, field: &str, value: &Value) -> Result<(), ValidationError> {
        if !self.kind.accepts(value) {
            let message = match self.kind {
                PropertyType::Integer if matches!(value, Value::Number(_)) => {
                    "expected a whole number".to_string()
                }
                _ => format!("expected {}, got {}", self.kind.as_str(), value.type_name()),
            };
            return Err(ValidationError::new(field, message).with_value(value.to_json()));
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.iter().any(|candidate| enum_matches(candidate, value)) {
                return Err(ValidationError::new(field, "not one of the allowed values")
                    .with_value(value.to_json()));
            }
        }

        if let (Value::Array(items), Some(item_schema)) = (value, &self.items) {
            for (index, item) in items.iter().enumerate() {
                item_schema.validate(&format!("{field}[{index}]"), item)?;
            }
        }

        Ok(())
    }
}

fn enum_matches(candidate: &Value, value: &Value) -> bool {
    match (candidate.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => candidate == value,
    }
}

/// Object schema describing a typed capability's parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, Property>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional parameter
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Declare a required parameter
    pub fn required_property(mut self, name: impl Into<String>, property: Property) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), property);
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// True when every declared property is required
    pub fn all_required(&self) -> bool {
        self.properties.keys().all(|name| self.required.contains(name))
    }

    /// Check the schema invariants
    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(ValidationError::new(
                    name.as_str(),
                    "required parameter is not declared in properties",
                ));
            }
        }
        for (name, property) in &self.properties {
            property.check(name)?;
            if let Some(default) = &property.default {
                property.validate(name, default)?;
            }
        }
        Ok(())
    }

    /// Validate supplied arguments. Undeclared names are ignored.
    pub fn validate_args(&self, args: &Arguments) -> Result<(), ValidationError> {
        for name in &self.required {
            if !args.contains_key(name) {
                return Err(ValidationError::new(name.as_str(), "required parameter is missing"));
            }
        }
        for (name, value) in args {
            if let Some(property) = self.properties.get(name) {
                property.validate(name, value)?;
            }
        }
        Ok(())
    }

    /// Fill absent parameters from declared defaults
    pub fn apply_defaults(&self, args: &mut Arguments) {
        for (name, property) in &self.properties {
            if let Some(default) = &property.default {
                args.entry(name.clone()).or_insert_with(|| default.clone());
            }
        }
    }

    /// JSON Schema object used in tool definitions
    pub fn to_json_schema(&self, strict: bool) -> serde_json::Value {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        });
        if strict {
            schema["additionalProperties"] = serde_json::Value::Bool(false);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .required_property(
                "unit",
                Property::string("Time unit").with_enum(["hours", "days"]),
            )
            .required_property("amount", Property::integer("How many units"))
            .property(
                "values",
                Property::array("Samples", Property::number("Sample")),
            )
            .property("verbose", Property::boolean("Chatty output").with_default(false))
    }

    fn args(json: serde_json::Value) -> Arguments {
        crate::value::arguments_from_json(&json).unwrap()
    }

    #[test]
    fn test_valid_schema() {
        assert!(schema().validate().is_ok());
        assert!(!schema().all_required());
    }

    #[test]
    fn test_required_must_be_declared() {
        let mut s = schema();
        s.required.push("ghost".into());
        let err = s.validate().unwrap_err();
        assert_eq!(err.field, "ghost");
    }

    #[test]
    fn test_array_requires_items() {
        let s = ParameterSchema::new()
            .property("list", Property::new(PropertyType::Array, "no items"));
        assert_eq!(s.validate().unwrap_err().field, "list");

        let nested = ParameterSchema::new().property(
            "matrix",
            Property::array("rows", Property::new(PropertyType::Array, "row")),
        );
        assert_eq!(nested.validate().unwrap_err().field, "matrix[]");
    }

    #[test]
    fn test_enum_type_mismatch_rejected() {
        let s = ParameterSchema::new()
            .property("n", Property::integer("n").with_enum(vec![Value::from("one")]));
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_args() {
        let s = schema();
        assert!(s.validate_args(&args(json!({"unit": "days", "amount": 3}))).is_ok());
        // Whole floats count as integers
        assert!(s.validate_args(&args(json!({"unit": "days", "amount": 3.0}))).is_ok());
        // Undeclared names are ignored
        assert!(s
            .validate_args(&args(json!({"unit": "days", "amount": 1, "extra": "x"})))
            .is_ok());

        let err = s.validate_args(&args(json!({"unit": "days"}))).unwrap_err();
        assert_eq!(err.field, "amount");

        let err = s.validate_args(&args(json!({"unit": "days", "amount": 2.5}))).unwrap_err();
        assert_eq!(err.field, "amount");
        assert_eq!(err.message, "expected a whole number");
        assert_eq!(err.value, Some(json!(2.5)));

        let err = s.validate_args(&args(json!({"unit": "weeks", "amount": 1}))).unwrap_err();
        assert_eq!(err.field, "unit");
        assert_eq!(err.value, Some(json!("weeks")));

        let err = s
            .validate_args(&args(json!({"unit": "days", "amount": 1, "values": [1, "two"]})))
            .unwrap_err();
        assert_eq!(err.field, "values[1]");
    }

    #[test]
    fn test_apply_defaults() {
        let s = schema();
        let mut a = args(json!({"unit": "days", "amount": 1}));
        s.apply_defaults(&mut a);
        assert_eq!(a["verbose"], Value::Boolean(false));
    }

    #[test]
    fn test_json_schema_shape() {
        let json = schema().to_json_schema(false);
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["unit"]["enum"], json!(["hours", "days"]));
        assert_eq!(json["properties"]["values"]["items"]["type"], "number");
        assert!(json.get("additionalProperties").is_none());
        assert_eq!(schema().to_json_schema(true)["additionalProperties"], false);
    }
}
