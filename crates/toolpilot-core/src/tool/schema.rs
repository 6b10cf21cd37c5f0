use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonSchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl JsonSchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonSchemaType::String => "string",
            JsonSchemaType::Number => "number",
            JsonSchemaType::Integer => "integer",
            JsonSchemaType::Boolean => "boolean",
            JsonSchemaType::Array => "array",
            JsonSchemaType::Object => "object",
            JsonSchemaType::Null => "null",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            JsonSchemaType::String => value.is_string(),
            JsonSchemaType::Number => value.is_number(),
            JsonSchemaType::Integer => value.is_i64() || value.is_u64(),
            JsonSchemaType::Boolean => value.is_boolean(),
            JsonSchemaType::Array => value.is_array(),
            JsonSchemaType::Object => value.is_object(),
            JsonSchemaType::Null => value.is_null(),
        }
    }
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

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolParameter {
    #[serde(rename = "type")]
    pub schema_type: JsonSchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ToolParameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ToolParameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ToolParameter {
    pub fn string() -> Self {
        Self {
            schema_type: JsonSchemaType::String,
            description: None,
            default: None,
            enum_values: None,
            items: None,
            properties: None,
            required: None,
        }
    }

    pub fn number() -> Self {
        Self {
            schema_type: JsonSchemaType::Number,
            ..Self::string()
        }
    }

    pub fn integer() -> Self {
        Self {
            schema_type: JsonSchemaType::Integer,
            ..Self::string()
        }
    }

    pub fn boolean() -> Self {
        Self {
            schema_type: JsonSchemaType::Boolean,
            ..Self::string()
        }
    }

    pub fn array(items: ToolParameter) -> Self {
        Self {
            schema_type: JsonSchemaType::Array,
            items: Some(Box::new(items)),
            ..Self::string()
        }
    }

    pub fn object() -> Self {
        Self {
            schema_type: JsonSchemaType::Object,
            properties: Some(BTreeMap::new()),
            required: Some(vec![]),
            ..Self::string()
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, param: ToolParameter) -> Self {
        if let Some(props) = &mut self.properties {
            props.insert(name.into(), param);
        }
        self
    }

    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        if let Some(req) = &mut self.required {
            req.push(name.into());
        }
        self
    }

    /// Checks `value` against this schema. An object schema accepts `null` as `{}`.
    /// Properties the schema does not declare are allowed.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.validate_at("input", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), String> {
        if self.schema_type == JsonSchemaType::Object && value.is_null() {
            return self.validate_at(path, &Value::Object(Default::default()));
        }

        if !self.schema_type.matches(value) {
            return Err(format!(
                "{}: expected {}, got {}",
                path,
                self.schema_type.as_str(),
                kind_of(value)
            ));
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
                return Err(format!("{}: must be one of {}", path, options.join(", ")));
            }
        }

        match value {
            Value::Object(map) => {
                for name in self.required.iter().flatten() {
                    if map.get(name).map_or(true, Value::is_null) {
                        return Err(format!("{}: missing required property '{}'", path, name));
                    }
                }
                if let Some(props) = &self.properties {
                    for (name, schema) in props {
                        match map.get(name) {
                            Some(Value::Null) | None => {}
                            Some(v) => schema.validate_at(&format!("{}.{}", path, name), v)?,
                        }
                    }
                }
            }
            Value::Array(items) => {
                if let Some(schema) = &self.items {
                    for (i, item) in items.iter().enumerate() {
                        schema.validate_at(&format!("{}[{}]", path, i), item)?;
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameter,
    #[serde(default)]
    pub dangerous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameter::object(),
            dangerous: false,
            category: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, param: ToolParameter) -> Self {
        if let Some(props) = &mut self.parameters.properties {
            props.insert(name.into(), param);
        }
        self
    }

    pub fn with_required_param(self, name: impl Into<String>, param: ToolParameter) -> Self {
        let name = name.into();
        self.with_param(name.clone(), param).require_param(name)
    }

    pub fn require_param(mut self, name: impl Into<String>) -> Self {
        if let Some(req) = &mut self.parameters.required {
            req.push(name.into());
        }
        self
    }

    pub fn dangerous(mut self) -> Self {
        self.dangerous = true;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn validate_input(&self, input: &Value) -> Result<(), String> {
        self.parameters.validate(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn install_package() -> ToolDefinition {
        ToolDefinition::new("install_python_package", "Install a package with pip")
            .with_required_param(
                "package_name",
                ToolParameter::string().with_description("Package to install"),
            )
            .with_param("version", ToolParameter::string())
            .with_category("python")
            .dangerous()
    }

    #[test]
    fn test_tool_definition() {
        let tool = install_package();

        assert_eq!(tool.name, "install_python_package");
        assert!(tool.dangerous);
        assert_eq!(tool.category, Some("python".to_string()));

        let props = tool.parameters.properties.as_ref().unwrap();
        assert!(props.contains_key("package_name"));
        assert!(props.contains_key("version"));

        let required = tool.parameters.required.as_ref().unwrap();
        assert!(required.contains(&"package_name".to_string()));
    }

    #[test]
    fn test_validate_accepts_valid_input() {
        let tool = install_package();
        assert!(tool.validate_input(&json!({"package_name": "requests"})).is_ok());
        assert!(tool
            .validate_input(&json!({"package_name": "requests", "version": "2.31.0", "extra": 1}))
            .is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let err = install_package().validate_input(&json!({})).unwrap_err();
        assert!(err.contains("package_name"), "{}", err);

        let err = install_package()
            .validate_input(&json!({"package_name": null}))
            .unwrap_err();
        assert!(err.contains("missing required"));
    }

    #[test]
    fn test_validate_wrong_type() {
        let err = install_package()
            .validate_input(&json!({"package_name": 42}))
            .unwrap_err();
        assert_eq!(err, "input.package_name: expected string, got number");

        let err = install_package().validate_input(&json!("requests")).unwrap_err();
        assert_eq!(err, "input: expected object, got string");
    }

    #[test]
    fn test_validate_null_is_empty_object() {
        let tool = ToolDefinition::new("list_files", "List workspace entries");
        assert!(tool.validate_input(&Value::Null).is_ok());
        assert!(install_package().validate_input(&Value::Null).is_err());
    }

    #[test]
    fn test_validate_enum_and_nested() {
        let schema = ToolParameter::object()
            .with_property(
                "mode",
                ToolParameter::string().with_enum(vec![json!("updates"), json!("custom")]),
            )
            .with_property("steps", ToolParameter::array(ToolParameter::integer()))
            .with_property(
                "target",
                ToolParameter::object()
                    .with_property("path", ToolParameter::string())
                    .with_required("path"),
            );

        assert!(schema
            .validate(&json!({"mode": "custom", "steps": [1, 2], "target": {"path": "a"}}))
            .is_ok());

        let err = schema.validate(&json!({"mode": "values"})).unwrap_err();
        assert!(err.starts_with("input.mode: must be one of"));

        let err = schema.validate(&json!({"steps": [1, 2.5]})).unwrap_err();
        assert_eq!(err, "input.steps[1]: expected integer, got number");

        let err = schema.validate(&json!({"target": {}})).unwrap_err();
        assert_eq!(err, "input.target: missing required property 'path'");
    }
}
