//! Concurrent catalogue of capabilities keyed by name

use std::collections::HashMap;
use std::sync::Arc;

use oracle_core::{OracleError, OracleResult};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::tool::{Invocation, Tool, ToolResult};
use crate::wire::ToolDefinition;

/// Registry of capabilities.
///
/// Lookups take a shared lock and never block each other; register and
/// unregister are exclusive. Construct one per process and pass it around.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a capability, returning the shared handle.
    ///
    /// The middleware chain is composed here so calls never pay for it.
    pub fn register(&self, tool: Tool) -> OracleResult<Arc<Tool>> {
        tool.validate()?;
        tool.handler();

        let tool = Arc::new(tool);
        let mut tools = self.tools.write();
        if tools.contains_key(tool.name()) {
            return Err(OracleError::already_registered(format!(
                "tool '{}' is already registered",
                tool.name()
            )));
        }
        tools.insert(tool.name().to_string(), Arc::clone(&tool));

        info!(
            tool = %tool.name(),
            kind = ?tool.kind(),
            middleware = tool.middleware_count(),
            "Registered tool"
        );
        Ok(tool)
    }

    pub fn unregister(&self, name: &str) -> OracleResult<Arc<Tool>> {
        let removed = self.tools.write().remove(name);
        match removed {
            Some(tool) => {
                info!(tool = %name, "Unregistered tool");
                Ok(tool)
            }
            None => Err(not_found(name)),
        }
    }

    pub fn get(&self, name: &str) -> OracleResult<Arc<Tool>> {
        self.tools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.read().contains_key(name)
    }

    /// All tools, sorted by name
    pub fn list(&self) -> Vec<Arc<Tool>> {
        let mut tools: Vec<_> = self.tools.read().values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Look up a tool and run it
    pub async fn execute(
        &self,
        name: &str,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> OracleResult<ToolResult> {
        let tool = self.get(name)?;
        debug!(tool = %name, call_id = %invocation.call_id, "Dispatching tool call");
        Ok(tool.execute(invocation, cancel).await)
    }

    /// Wire definitions of every tool, optionally leaving out hosted ones
    pub fn definitions(&self, include_delegated: bool) -> Vec<ToolDefinition> {
        // Hosted tools project to identical definitions; advertise at most one
        let mut hosted_seen = false;
        self.list()
            .iter()
            .map(|tool| tool.definition())
            .filter(|definition| {
                if !definition.is_hosted() {
                    return true;
                }
                let keep = include_delegated && !hosted_seen;
                hosted_seen = true;
                keep
            })
            .collect()
    }
}

fn not_found(name: &str) -> OracleError {
    OracleError::not_found(format!("tool '{name}' is not registered"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParameterSchema, Property};
    use serde_json::json;

    fn noop(name: &str) -> Tool {
        Tool::free_text(name, "does nothing", |_, _| async { Ok(json!(null)) })
    }

    #[test]
    fn test_register_and_get_same_instance() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        let registered = registry.register(noop("a")).unwrap();
        let fetched = registry.get("a").unwrap();

        assert!(Arc::ptr_eq(&registered, &fetched));
        assert_eq!(registry.list().len(), 1);
        assert!(registry.contains("a"));
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ToolRegistry::new();
        let first = registry.register(noop("dup")).unwrap();

        let err = registry.register(noop("dup")).unwrap_err();
        assert!(matches!(err, OracleError::AlreadyRegistered(_)));
        assert!(Arc::ptr_eq(&first, &registry.get("dup").unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_tools_rejected_before_insert() {
        let registry = ToolRegistry::new();
        assert!(registry.register(noop("")).unwrap_err().is_validation());

        let bad_schema = Tool::function(
            "bad",
            "",
            ParameterSchema {
                properties: Default::default(),
                required: vec!["missing".into()],
            },
            |_, _| async { Ok(json!(null)) },
        );
        assert!(registry.register(bad_schema).unwrap_err().is_validation());

        let untyped_array = Tool::function(
            "bad_array",
            "",
            ParameterSchema::new().property(
                "xs",
                Property::new(crate::schema::PropertyType::Array, "no items"),
            ),
            |_, _| async { Ok(json!(null)) },
        );
        assert!(registry.register(untyped_array).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = ToolRegistry::new();
        registry.register(noop("gone")).unwrap();
        registry.unregister("gone").unwrap();
        assert!(matches!(registry.get("gone").unwrap_err(), OracleError::NotFound(_)));
        assert!(matches!(
            registry.unregister("never").unwrap_err(),
            OracleError::NotFound(_)
        ));
    }

    #[test]
    fn test_list_sorted_and_definitions_filter_hosted() {
        let registry = ToolRegistry::new();
        registry.register(noop("zeta")).unwrap();
        registry.register(Tool::delegated("web_search", "")).unwrap();
        registry.register(noop("alpha")).unwrap();

        let names: Vec<_> = registry.list().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "web_search", "zeta"]);

        assert_eq!(registry.definitions(true).len(), 3);
        let local = registry.definitions(false);
        assert_eq!(local.len(), 2);
        assert!(local.iter().all(|d| !d.is_hosted()));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("missing", Invocation::empty(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_and_executions() {
        let registry = Arc::new(ToolRegistry::new());
        registry
            .register(Tool::free_text("len", "", |text, _| async move {
                Ok(json!(text.len()))
            }))
            .unwrap();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .execute(
                            "len",
                            Invocation::with_input("x".repeat(i + 1)),
                            CancellationToken::new(),
                        )
                        .await
                        .unwrap()
                        .into_result()
                        .unwrap()
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap(), json!(i + 1));
        }
    }
}
