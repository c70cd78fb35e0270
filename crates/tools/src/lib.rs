//! Built-in tool implementations for Palaver.
//!
//! Tools give the model a way to look things up mid-turn. Each one
//! implements `palaver_core::Tool` and is advertised to the model through
//! the registry's definitions.

pub mod calendar;
pub mod clock;

pub use calendar::CalendarTool;
pub use clock::CurrentTimeTool;

use palaver_core::tool::ToolRegistry;

/// Create a tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CalendarTool));
    registry.register(Box::new(CurrentTimeTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtins() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["CurrentTime", "GetCalendar"]);
    }

    #[tokio::test]
    async fn dispatch_validates_before_invoking() {
        let registry = default_registry();
        let err = registry
            .dispatch("GetCalendar", &palaver_core::ToolArguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, palaver_core::ToolError::InvalidArguments(ref m) if m.contains("date")));
    }
}
