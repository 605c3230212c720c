//! Tool-calling plumbing for DeepSeek function calling.
//!
//! Covers the wire side of tool use: rendering tool definitions in the
//! chat API's function format, generating parameter schemas from typed
//! argument structs, and parsing the tool calls the model requests.
//! Dispatching a parsed call to real code is the caller's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use deepseek_client::{args_schema, ToolDefinition};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct SearchArgs {
//!     query: String,
//! }
//!
//! let def = ToolDefinition {
//!     name: "web_search".to_string(),
//!     description: "Search the web for information".to_string(),
//!     parameters: args_schema::<SearchArgs>(),
//! };
//! let tools = serde_json::json!([def.to_api_format()]);
//! ```

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Generate a JSON schema for a tool's argument type.
///
/// Strips the `$schema` and `title` fields schemars adds, which the chat
/// API does not want in `parameters`.
pub fn args_schema<T: JsonSchema>() -> serde_json::Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_default();
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

/// Tool definition in the chat API's function format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// The name of the tool.
    pub name: String,

    /// A description of what the tool does.
    pub description: String,

    /// JSON schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Convert to the wire format expected in the `tools` request field.
    pub fn to_api_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// The ID of this tool call (for matching responses).
    pub id: String,

    /// The name of the tool to call.
    pub name: String,

    /// The arguments as a JSON string.
    pub arguments: String,
}

impl ToolCall {
    /// Parse a tool call from an assistant message's `tool_calls` entry.
    ///
    /// Arguments usually arrive as a JSON-encoded string, but some models
    /// emit a bare object; both forms are accepted.
    pub fn from_message_value(value: &serde_json::Value) -> Option<Self> {
        let function = value.get("function")?;
        let arguments = match function.get("arguments")? {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        Some(Self {
            id: value.get("id")?.as_str()?.to_string(),
            name: function.get("name")?.as_str()?.to_string(),
            arguments,
        })
    }

    /// Parse arguments into a typed struct.
    pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        message: String,
    }

    #[test]
    fn test_args_schema_strips_meta_fields() {
        let schema = args_schema::<EchoArgs>();

        assert!(schema.is_object());
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert!(schema["properties"]["message"].is_object());
    }

    #[test]
    fn test_tool_definition_api_format() {
        let def = ToolDefinition {
            name: "echo".to_string(),
            description: "Echo back the input message".to_string(),
            parameters: args_schema::<EchoArgs>(),
        };
        let wire = def.to_api_format();

        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "echo");
        assert!(wire["function"]["parameters"]["properties"]["message"].is_object());
    }

    #[test]
    fn test_tool_call_parsing() {
        let value = serde_json::json!({
            "id": "call_123",
            "function": {
                "name": "echo",
                "arguments": "{\"message\": \"hello\"}"
            }
        });

        let call = ToolCall::from_message_value(&value).unwrap();
        assert_eq!(call.id, "call_123");
        assert_eq!(call.name, "echo");

        let args: EchoArgs = call.parse_args().unwrap();
        assert_eq!(args.message, "hello");
    }

    #[test]
    fn test_tool_call_object_arguments() {
        let value = serde_json::json!({
            "id": "call_456",
            "function": {
                "name": "echo",
                "arguments": {"message": "hello"}
            }
        });

        let call = ToolCall::from_message_value(&value).unwrap();
        let args: EchoArgs = call.parse_args().unwrap();
        assert_eq!(args.message, "hello");
    }

    #[test]
    fn test_tool_call_missing_function_is_none() {
        let value = serde_json::json!({ "id": "call_789" });
        assert!(ToolCall::from_message_value(&value).is_none());
    }

    #[test]
    fn test_tool_call_bad_arguments_error() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "echo".to_string(),
            arguments: "not json".to_string(),
        };
        assert!(call.parse_args::<EchoArgs>().is_err());
    }
}
