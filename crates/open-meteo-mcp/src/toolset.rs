//! The capability registry: a fixed set of named tools built once at
//! startup, read-only afterwards.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;

use crate::model::{Content, JsonObject, Tool};

/// Failure raised by a tool lookup or invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    /// Displays as the raw failure text so it can be surfaced verbatim in a
    /// tool result.
    #[error("{0}")]
    Execution(String),
}

/// Failure raised while building a [`ToolSet`].
#[derive(Debug, thiserror::Error)]
pub enum ToolSetError {
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
}

pub type ToolHandlerFn =
    Arc<dyn Fn(Option<JsonObject>) -> BoxFuture<'static, Result<Vec<Content>, ToolError>> + Send + Sync>;

pub struct ToolSet {
    tools: Vec<Tool>,
    handlers: HashMap<String, ToolHandlerFn>,
}

pub struct ToolSetBuilder {
    tools: Vec<Tool>,
    handlers: HashMap<String, ToolHandlerFn>,
}

impl ToolSetBuilder {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool under its declared name. Duplicate names are rejected
    /// rather than silently replaced.
    pub fn register<F>(mut self, tool: Tool, handler: F) -> Result<Self, ToolSetError>
    where
        F: Fn(Option<JsonObject>) -> BoxFuture<'static, Result<Vec<Content>, ToolError>>
            + Send
            + Sync
            + 'static,
    {
        let name = tool.name.to_string();
        if self.handlers.contains_key(&name) {
            return Err(ToolSetError::DuplicateName(name));
        }
        self.tools.push(tool);
        self.handlers.insert(name, Arc::new(handler));
        Ok(self)
    }

    pub fn build(self) -> ToolSet {
        ToolSet {
            tools: self.tools,
            handlers: self.handlers,
        }
    }
}

impl Default for ToolSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolSet {
    pub fn builder() -> ToolSetBuilder {
        ToolSetBuilder::new()
    }

    /// Tools in registration order, as served by `tools/list`.
    pub fn list(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<Vec<Content>, ToolError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        handler(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::model::schema_for_type;

    fn echo_tool(name: &'static str) -> Tool {
        Tool::new(name, "echoes its arguments", schema_for_type::<JsonObject>())
    }

    fn echo_handler(
        arguments: Option<JsonObject>,
    ) -> BoxFuture<'static, Result<Vec<Content>, ToolError>> {
        async move {
            let text = serde_json::to_string(&arguments.unwrap_or_default())
                .map_err(|e| ToolError::Execution(e.to_string()))?;
            Ok(vec![Content::text(text)])
        }
        .boxed()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let builder = ToolSet::builder()
            .register(echo_tool("echo"), echo_handler)
            .expect("first registration");
        let result = builder.register(echo_tool("echo"), echo_handler);
        assert!(matches!(result, Err(ToolSetError::DuplicateName(name)) if name == "echo"));
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let set = ToolSet::builder()
            .register(echo_tool("echo"), echo_handler)
            .expect("register")
            .build();
        let mut arguments = JsonObject::new();
        arguments.insert("k".to_string(), json!("v"));
        let content = set.call("echo", Some(arguments)).await.expect("call");
        assert_eq!(content[0].as_text(), Some(r#"{"k":"v"}"#));
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let set = ToolSet::builder().build();
        let result = set.call("missing", None).await;
        assert!(matches!(result, Err(ToolError::NotFound(name)) if name == "missing"));
    }
}
