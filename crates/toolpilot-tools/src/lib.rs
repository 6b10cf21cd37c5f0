pub mod error;
pub mod executor;
pub mod process;
pub mod registry;
pub mod traits;

#[cfg(feature = "builtin")]
pub mod builtin;
#[cfg(feature = "builtin")]
pub mod catalog;

pub use error::{Result, ToolError};
pub use executor::ToolExecutor;
pub use process::{
    CommandError, CommandOutput, CommandSpec, FallbackExecutor, Invocation, Status,
};
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolOutput};

#[cfg(feature = "builtin")]
pub use builtin::Workspace;
#[cfg(feature = "builtin")]
pub use catalog::Catalog;

pub mod prelude {
    pub use crate::error::{Result, ToolError};
    pub use crate::executor::ToolExecutor;
    pub use crate::process::{CommandSpec, FallbackExecutor, Invocation, Status};
    pub use crate::registry::ToolRegistry;
    pub use crate::traits::{Tool, ToolOutput};

    #[cfg(feature = "builtin")]
    pub use crate::builtin::Workspace;
    #[cfg(feature = "builtin")]
    pub use crate::catalog::Catalog;
}

#[cfg(all(test, feature = "builtin"))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use toolpilot_core::Context;

    #[tokio::test]
    async fn test_executor_with_catalog() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let ws = Workspace::new(dir.path(), Duration::from_secs(5));
        let executor = ToolExecutor::new(Arc::new(Catalog::Scripting.build(&ws).unwrap()));

        let output = executor
            .execute(&Context::new(), "list_files", serde_json::Value::Null)
            .await
            .unwrap();
        assert!(output.content.contains("notes.txt (file)"));
    }

    #[tokio::test]
    async fn test_schema_rejects_before_handler() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path(), Duration::from_secs(5));
        let executor = ToolExecutor::new(Arc::new(Catalog::Scripting.build(&ws).unwrap()));

        let err = executor
            .execute(&Context::new(), "write_python_script", json!({"filename": "a.py"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(!dir.path().join("a.py").exists());
    }
}
