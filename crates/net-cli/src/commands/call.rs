//! Run a named logical operation with JSON arguments

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use l2net_orchestrator::LogicalOperation;

use crate::context::AppContext;

pub struct CallCommand {
    context: Arc<AppContext>,
}

impl CallCommand {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Always prints JSON
    pub async fn execute(&self, operation: &str, args: Option<&str>) -> Result<String> {
        let operation: LogicalOperation = operation.parse()?;
        let args = match args {
            Some(raw) => serde_json::from_str(raw)
                .with_context(|| format!("Arguments for {} are not valid JSON", operation))?,
            None => Value::Null,
        };

        let result = self.context.orchestrator.dispatch(operation, args).await?;
        Ok(serde_json::to_string_pretty(&result)?)
    }

    pub fn operations() -> String {
        LogicalOperation::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
