//! Tool registry.
//!
//! Maps tool names to [`ToolDescriptor`]s: a stable name, a description for
//! the model, an ordered parameter list, and a statically typed handler.
//! The registry validates call arguments against the parameter list before a
//! handler ever sees them.
//!
//! # Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use async_trait::async_trait;
//! # use serde_json::{Map, Value, json};
//! # use toolchat_agent::registry::*;
//! # use toolchat_agent::Result;
//! struct Echo;
//!
//! #[async_trait]
//! impl ToolHandler for Echo {
//!     async fn call(&self, _ctx: ToolContext<'_>, args: &Map<String, Value>) -> Result<ToolOutcome> {
//!         Ok(ToolOutcome::Completed(json!(args)))
//!     }
//! }
//!
//! let mut registry = ToolRegistry::new();
//! registry
//!     .register(
//!         ToolDescriptor::new("echo", "Echo the arguments back", Arc::new(Echo))
//!             .with_param(ToolParameter::required("text", ParamKind::String, "Text to echo")),
//!     )
//!     .unwrap();
//! assert!(registry.resolve("echo").is_ok());
//! assert_eq!(registry.definitions()[0].input_schema["required"][0], "text");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::console::Console;
use crate::error::{AgentError, Result};
use crate::llm::types::ToolDefinition;
use crate::message_log::MessageLog;

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Boolean,
    Integer,
    Number,
}

impl ParamKind {
    /// The JSON Schema `type` keyword for this kind.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
        }
    }
}

/// One named, typed parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// What a tool handler may touch while it runs.
pub struct ToolContext<'a> {
    /// The conversation so far, read-only.
    pub log: &'a MessageLog,
    pub console: &'a mut dyn Console,
}

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The tool finished; the value is reported back to the model.
    Completed(Value),
    /// The tool asks the session to end.  No further turns are processed.
    Terminate,
}

/// The operation behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool.  `args` has already been validated against the
    /// descriptor's parameter list.
    async fn call(&self, ctx: ToolContext<'_>, args: &Map<String, Value>) -> Result<ToolOutcome>;
}

/// Metadata plus handler for one invocable tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler,
        }
    }

    pub fn with_param(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The definition sent to the model, with a JSON Schema for the input.
    pub fn definition(&self) -> ToolDefinition {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.kind.json_type(), "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Check `arguments` against the parameter list.
    ///
    /// `null` is treated as an empty argument object, and a `null` value for
    /// an optional parameter as absent.
    pub fn validate(&self, arguments: &Value) -> Result<Map<String, Value>> {
        let args = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(self.invalid(format!("arguments must be an object, got {other}")));
            }
        };

        for (key, value) in &args {
            let Some(param) = self.parameters.iter().find(|p| &p.name == key) else {
                return Err(self.invalid(format!("unknown parameter `{key}`")));
            };
            if value.is_null() && !param.required {
                continue;
            }
            if !param.kind.accepts(value) {
                return Err(self.invalid(format!(
                    "parameter `{key}` must be a {}, got {value}",
                    param.kind.json_type()
                )));
            }
        }

        if let Some(missing) = self
            .parameters
            .iter()
            .find(|p| p.required && args.get(&p.name).is_none_or(Value::is_null))
        {
            return Err(self.invalid(format!("missing required parameter `{}`", missing.name)));
        }

        Ok(args)
    }

    fn invalid(&self, reason: String) -> AgentError {
        AgentError::InvalidArgument {
            reason: format!("{}: {reason}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-keyed collection of tools.  Iteration follows registration order.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// [`AgentError::DuplicateTool`] if the name is taken; the existing
    /// descriptor is left in place.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if descriptor.name.trim().is_empty() {
            return Err(AgentError::InvalidArgument {
                reason: "tool name must not be empty".into(),
            });
        }
        if self.tools.contains_key(&descriptor.name) {
            return Err(AgentError::DuplicateTool {
                name: descriptor.name,
            });
        }

        tracing::debug!(tool = %descriptor.name, params = descriptor.parameters.len(), "tool registered");
        self.order.push(descriptor.name.clone());
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools.get(name).ok_or_else(|| AgentError::ToolNotFound {
            name: name.to_owned(),
        })
    }

    /// Validate `arguments` and run the named tool.
    ///
    /// # Errors
    ///
    /// - [`AgentError::ToolNotFound`] for an unknown name.
    /// - [`AgentError::InvalidArgument`] when the arguments do not match.
    /// - [`AgentError::ToolExecutionFailed`] when the handler fails.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        ctx: ToolContext<'_>,
    ) -> Result<ToolOutcome> {
        let descriptor = self.resolve(name)?;
        let args = descriptor.validate(arguments)?;

        tracing::debug!(tool = %name, "invoking tool");

        descriptor
            .handler
            .call(ctx, &args)
            .await
            .map_err(|e| match e {
                AgentError::ToolExecutionFailed { .. } => e,
                other => AgentError::ToolExecutionFailed {
                    tool_name: name.to_owned(),
                    reason: other.to_string(),
                },
            })
    }

    /// Definitions for every tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.iter().map(ToolDescriptor::definition).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    struct NullConsole;

    impl Console for NullConsole {
        fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            Ok(None)
        }
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Ok(())
        }
        fn clear(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl ToolHandler for Fixed {
        async fn call(&self, _ctx: ToolContext<'_>, args: &Map<String, Value>) -> Result<ToolOutcome> {
            Ok(ToolOutcome::Completed(json!({ "tag": self.0, "args": args })))
        }
    }

    struct Failing;

    #[async_trait]
    impl ToolHandler for Failing {
        async fn call(&self, _ctx: ToolContext<'_>, _args: &Map<String, Value>) -> Result<ToolOutcome> {
            Err(AgentError::Io(io::Error::other("disk on fire")))
        }
    }

    fn confirm_tool(tag: &'static str) -> ToolDescriptor {
        ToolDescriptor::new("clear_display", "Clear the console", Arc::new(Fixed(tag)))
            .with_param(ToolParameter::required(
                "confirm",
                ParamKind::Boolean,
                "Must be true to clear",
            ))
            .with_param(ToolParameter::optional(
                "lines",
                ParamKind::Integer,
                "Lines to keep",
            ))
    }

    async fn invoke(registry: &ToolRegistry, name: &str, args: Value) -> Result<ToolOutcome> {
        let log = MessageLog::new();
        let mut console = NullConsole;
        registry
            .invoke(
                name,
                &args,
                ToolContext {
                    log: &log,
                    console: &mut console,
                },
            )
            .await
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new();
        registry.register(confirm_tool("first")).unwrap();

        let err = registry.register(confirm_tool("second")).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool { name } if name == "clear_display"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("clear_display").unwrap().parameters.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_first_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(confirm_tool("first")).unwrap();
        let _ = registry.register(confirm_tool("second"));

        let outcome = invoke(&registry, "clear_display", json!({ "confirm": true }))
            .await
            .unwrap();
        match outcome {
            ToolOutcome::Completed(v) => assert_eq!(v["tag"], "first"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.resolve("nope"),
            Err(AgentError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        let descriptor = ToolDescriptor::new(" ", "blank", Arc::new(Fixed("x")));
        assert!(matches!(
            registry.register(descriptor),
            Err(AgentError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn invoke_validates_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(confirm_tool("t")).unwrap();

        for bad in [
            json!({}),
            json!({ "confirm": "yes" }),
            json!({ "confirm": true, "extra": 1 }),
            json!({ "confirm": true, "lines": 1.5 }),
            json!({ "confirm": null }),
            json!([true]),
        ] {
            let err = invoke(&registry, "clear_display", bad.clone())
                .await
                .unwrap_err();
            assert!(
                matches!(err, AgentError::InvalidArgument { .. }),
                "{bad} gave {err:?}"
            );
        }

        assert!(
            invoke(&registry, "clear_display", json!({ "confirm": false, "lines": null }))
                .await
                .is_ok()
        );
        assert!(
            invoke(&registry, "clear_display", json!({ "confirm": true, "lines": 3 }))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn null_arguments_mean_no_arguments() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDescriptor::new(
                "count_messages",
                "Count",
                Arc::new(Fixed("n")),
            ))
            .unwrap();

        assert!(invoke(&registry, "count_messages", Value::Null).await.is_ok());
        assert!(matches!(
            invoke(&registry, "missing", Value::Null).await,
            Err(AgentError::ToolNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn handler_failure_is_wrapped() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDescriptor::new("save", "Save", Arc::new(Failing)))
            .unwrap();

        let err = invoke(&registry, "save", json!({})).await.unwrap_err();
        match err {
            AgentError::ToolExecutionFailed { tool_name, reason } => {
                assert_eq!(tool_name, "save");
                assert!(reason.contains("disk on fire"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn definitions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["b_tool", "a_tool", "c_tool"] {
            registry
                .register(ToolDescriptor::new(name, "t", Arc::new(Fixed("x"))))
                .unwrap();
        }
        registry.register(confirm_tool("t")).unwrap();

        assert_eq!(
            registry.names(),
            ["b_tool", "a_tool", "c_tool", "clear_display"]
        );

        let defs = registry.definitions();
        let schema = &defs[3].input_schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["confirm"]["type"], "boolean");
        assert_eq!(schema["properties"]["lines"]["type"], "integer");
        assert_eq!(schema["required"], json!(["confirm"]));
        assert_eq!(defs[0].input_schema["required"], json!([]));
    }
}
