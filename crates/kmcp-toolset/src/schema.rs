//! Parameter schemas and argument validation
//!
//! Each operation declares an ordered list of [`ParamSpec`]. Incoming JSON
//! arguments are checked once against that list and turned into an
//! [`Arguments`] record, so handlers never deal with missing or mistyped
//! values themselves.

use crate::error::{ToolError, ValidationError};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Primitive type tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Descriptor for a single parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub allowed: Option<Vec<Value>>,
}

impl ParamSpec {
    fn new(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            param_type,
            required: false,
            default: None,
            allowed: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, ParamType::Number)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.param_type.as_str()));
        if !self.description.is_empty() {
            prop.insert("description".into(), json!(self.description));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        if let Some(allowed) = &self.allowed {
            prop.insert("enum".into(), Value::Array(allowed.clone()));
        }
        Value::Object(prop)
    }

    fn allowed_display(allowed: &[Value]) -> Vec<String> {
        allowed
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Ordered parameter list of an operation
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// JSON Schema object advertised during discovery
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Check raw arguments and build the typed record.
    ///
    /// `null` counts as absent. Unknown keys are ignored. Optional
    /// parameters with a default are filled in.
    pub fn validate(&self, raw: &Value) -> Result<Arguments, ValidationError> {
        let empty = Map::new();
        let object = match raw {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => return Err(ValidationError::NotAnObject(json_type_name(other))),
        };

        let mut values = BTreeMap::new();
        for spec in &self.params {
            let value = match object.get(&spec.name).filter(|v| !v.is_null()) {
                Some(v) => v,
                None => match &spec.default {
                    Some(default) => default,
                    None if spec.required => {
                        return Err(ValidationError::MissingParameter(spec.name.clone()))
                    }
                    None => continue,
                },
            };

            if !spec.param_type.matches(value) {
                return Err(ValidationError::InvalidParameterType {
                    name: spec.name.clone(),
                    expected: spec.param_type,
                    actual: json_type_name(value),
                });
            }

            if let Some(allowed) = &spec.allowed {
                if !allowed.contains(value) {
                    return Err(ValidationError::InvalidParameterValue {
                        name: spec.name.clone(),
                        allowed: ParamSpec::allowed_display(allowed),
                    });
                }
            }

            values.insert(spec.name.clone(), ArgValue::from_checked(value));
        }

        Ok(Arguments { values })
    }
}

/// A validated argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl ArgValue {
    // Only called after the type check, so the fallthrough is never taken.
    fn from_checked(value: &Value) -> Self {
        match value {
            Value::Bool(b) => ArgValue::Boolean(*b),
            Value::Number(n) => ArgValue::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => ArgValue::String(s.clone()),
            other => ArgValue::String(other.to_string()),
        }
    }
}

/// Typed argument record handed to handlers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<String, ArgValue>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Accessor for parameters the schema marks as required
    pub fn require_string(&self, name: &str) -> Result<&str, ToolError> {
        self.string(name)
            .ok_or_else(|| ToolError::failed(format!("parameter {name} not found")))
    }

    pub fn require_boolean(&self, name: &str) -> Result<bool, ToolError> {
        self.boolean(name)
            .ok_or_else(|| ToolError::failed(format!("parameter {name} not found")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace_schema() -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string("name").required().describe("name for the namespace"))
            .param(ParamSpec::boolean("skipAutoPropagation").required())
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = namespace_schema()
            .validate(&json!({"name": "demo"}))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingParameter("skipAutoPropagation".into()));
    }

    #[test]
    fn test_wrong_type() {
        let err = namespace_schema()
            .validate(&json!({"name": "demo", "skipAutoPropagation": "yes"}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidParameterType {
                name: "skipAutoPropagation".into(),
                expected: ParamType::Boolean,
                actual: "string",
            }
        );
    }

    #[test]
    fn test_enum_violation() {
        let schema = ToolSchema::new().param(
            ParamSpec::string("operation")
                .required()
                .one_of(["add", "subtract"]),
        );
        let err = schema.validate(&json!({"operation": "divide"})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidParameterValue {
                name: "operation".into(),
                allowed: vec!["add".into(), "subtract".into()],
            }
        );
    }

    #[test]
    fn test_defaults_and_null() {
        let schema = ToolSchema::new()
            .param(ParamSpec::string("namespace"))
            .param(ParamSpec::boolean("deleteNow").default_value(true));

        let args = schema.validate(&json!({"namespace": null})).unwrap();
        assert_eq!(args.string("namespace"), None);
        assert_eq!(args.boolean("deleteNow"), Some(true));

        let args = schema.validate(&Value::Null).unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_not_an_object() {
        let err = namespace_schema().validate(&json!(["demo"])).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject("array"));
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = namespace_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["skipAutoPropagation"]["type"], "boolean");
        assert_eq!(schema["required"], json!(["name", "skipAutoPropagation"]));

        let empty = ToolSchema::new().to_json_schema();
        assert!(empty.get("required").is_none());
    }
}
