//! Built-in tool implementations for baton agents.
//!
//! These exercise the [`Tool`](baton_core::Tool) seam with practical
//! capabilities; most deployments add their own domain tools alongside.

pub mod calculator;
pub mod current_time;
pub mod http_request;

use std::sync::Arc;

use baton_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;
pub use current_time::CurrentTimeTool;
pub use http_request::HttpRequestTool;

/// A registry with all built-in tools registered.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool));
    registry.register(Arc::new(CurrentTimeTool));
    registry.register(Arc::new(HttpRequestTool::new()));
    registry
}

/// Look up a single built-in tool by name, for building per-agent
/// registries from configuration.
pub fn builtin_tool(name: &str) -> Option<Arc<dyn baton_core::Tool>> {
    match name {
        "calculator" => Some(Arc::new(CalculatorTool)),
        "current_time" => Some(Arc::new(CurrentTimeTool)),
        "http_request" => Some(Arc::new(HttpRequestTool::new())),
        _ => None,
    }
}
