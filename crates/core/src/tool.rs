//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are named handlers the model may ask for mid-turn. Each tool
//! advertises a parameter schema; the registry checks arguments against it
//! before invoking the handler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::ToolError;
use crate::message::ToolArguments;
use crate::provider::ToolDefinition;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Whether `value` is acceptable for this type.
    ///
    /// Integral floats (`1.0`) count as integers; some backends emit them.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            (ParamType::Number, Value::Number(_)) => true,
            (ParamType::Boolean, Value::Bool(_)) => true,
            (ParamType::Object, Value::Object(_)) => true,
            (ParamType::Array, Value::Array(_)) => true,
            _ => false,
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
}

/// Parameter schema advertised to the model: named properties plus the
/// subset that is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: Vec<ParameterProperty>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an optional property.
    pub fn property(mut self, name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        self.properties.push(ParameterProperty {
            name: name.into(),
            kind,
            description: description.into(),
        });
        self
    }

    /// Add a required property.
    pub fn required_property(
        self,
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut schema = self.property(name.clone(), kind, description);
        schema.required.push(name);
        schema
    }

    /// Render as a JSON Schema object.
    pub fn to_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.kind.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// Check that every required property is present and that every declared
    /// property which is present has the declared type. Unknown keys pass.
    pub fn validate(&self, arguments: &ToolArguments) -> std::result::Result<(), ToolError> {
        if let Some(missing) = self.required.iter().find(|r| !arguments.contains_key(r.as_str())) {
            return Err(ToolError::InvalidArguments(format!(
                "missing required argument '{missing}'"
            )));
        }

        for prop in &self.properties {
            if let Some(value) = arguments.get(&prop.name)
                && !prop.kind.accepts(value)
            {
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{}' must be of type {}",
                    prop.name,
                    prop.kind.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// The core Tool trait.
///
/// Tools are registered in the ToolRegistry once at startup and made
/// available to the turn engine.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "GetCalendar").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The parameters this tool accepts.
    fn schema(&self) -> ParameterSchema;

    /// Run the tool and return its result text.
    async fn invoke(&self, arguments: &ToolArguments) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema().to_json(),
        }
    }
}

type ToolHandler = dyn Fn(&ToolArguments) -> std::result::Result<String, ToolError> + Send + Sync;

/// A tool backed by a plain closure.
pub struct FnTool {
    name: String,
    description: String,
    schema: ParameterSchema,
    handler: Box<ToolHandler>,
}

impl FnTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(&ToolArguments) -> std::result::Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> ParameterSchema {
        self.schema.clone()
    }

    async fn invoke(&self, arguments: &ToolArguments) -> std::result::Result<String, ToolError> {
        (self.handler)(arguments)
    }
}

/// A registry of available tools.
///
/// The turn engine uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and dispatch tools when the LLM requests them
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Register a closure as a tool. Replaces any existing tool with the same name.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) where
        F: Fn(&ToolArguments) -> std::result::Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(Box::new(FnTool::new(name, description, schema, handler)));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, ordered by name (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Validate the arguments against the tool's schema and invoke it.
    pub async fn dispatch(&self, name: &str, arguments: &ToolArguments) -> std::result::Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.schema().validate(arguments)?;
        tool.invoke(arguments).await
    }

    /// List all registered tool names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn schema(&self) -> ParameterSchema {
            ParameterSchema::new().required_property("text", ParamType::String, "Text to echo")
        }
        async fn invoke(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
            Ok(arguments["text"].as_str().unwrap_or("").to_string())
        }
    }

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("zeta", "last", ParameterSchema::new(), |_| Ok(String::new()));
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "zeta");
        assert_eq!(defs[0].parameters["required"], json!(["text"]));
        assert_eq!(defs[0].parameters["properties"]["text"]["type"], "string");
    }

    #[tokio::test]
    async fn dispatch_returns_handler_output() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let out = registry.dispatch("echo", &args(json!({"text": "hello world"}))).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn dispatch_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry.dispatch("nonexistent", &ToolArguments::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref n) if n == "nonexistent"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry.register_fn("Foo", "first", ParameterSchema::new(), |_| Ok("1".into()));
        registry.register_fn("Foo", "second", ParameterSchema::new(), |_| Ok("2".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.dispatch("Foo", &ToolArguments::new()).await.unwrap(), "2");
    }

    #[tokio::test]
    async fn dispatch_rejects_missing_required_argument() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry.dispatch("echo", &ToolArguments::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(ref m) if m.contains("text")));
    }

    #[tokio::test]
    async fn dispatch_rejects_wrong_type() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry.dispatch("echo", &args(json!({"text": 5}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn integer_accepts_integral_floats() {
        assert!(ParamType::Integer.accepts(&json!(1)));
        assert!(ParamType::Integer.accepts(&json!(1.0)));
        assert!(!ParamType::Integer.accepts(&json!(1.5)));
        assert!(ParamType::Number.accepts(&json!(1.5)));
        assert!(!ParamType::Boolean.accepts(&json!("true")));
    }
}
