//! Console tools -- clear the screen and leave the application.
//!
//! Both tools take a required boolean `confirm` and do nothing unless it is
//! true.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::info;

use toolchat_agent::{
    ParamKind, ToolContext, ToolDescriptor, ToolHandler, ToolOutcome, ToolParameter,
};

use crate::error::AdapterError;
use crate::params::require_bool;

struct ClearDisplay;

#[async_trait]
impl ToolHandler for ClearDisplay {
    async fn call(
        &self,
        ctx: ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> toolchat_agent::Result<ToolOutcome> {
        let confirm = require_bool(args, "confirm", "clear_display")?;
        if confirm {
            ctx.console
                .clear()
                .map_err(|e| AdapterError::ExecutionFailed {
                    tool_name: "clear_display".into(),
                    reason: format!("failed to clear console: {e}"),
                })?;
        }
        Ok(ToolOutcome::Completed(json!({ "cleared": confirm })))
    }
}

pub fn clear_display() -> ToolDescriptor {
    ToolDescriptor::new(
        "clear_display",
        "Clears the console display",
        Arc::new(ClearDisplay),
    )
    .with_param(ToolParameter::required(
        "confirm",
        ParamKind::Boolean,
        "Must be true for the display to be cleared",
    ))
}

struct ExitApplication;

#[async_trait]
impl ToolHandler for ExitApplication {
    async fn call(
        &self,
        _ctx: ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> toolchat_agent::Result<ToolOutcome> {
        if require_bool(args, "confirm", "exit_application")? {
            info!("exit requested by the model");
            Ok(ToolOutcome::Terminate)
        } else {
            Ok(ToolOutcome::Completed(json!({ "exiting": false })))
        }
    }
}

pub fn exit_application() -> ToolDescriptor {
    ToolDescriptor::new(
        "exit_application",
        "Exits the application. Keep in mind that the user may say bye, or good bye, \
         or similar, and then too the application should exit.",
        Arc::new(ExitApplication),
    )
    .with_param(ToolParameter::required(
        "confirm",
        ParamKind::Boolean,
        "Must be true for the application to exit",
    ))
}

#[cfg(test)]
mod tests {
    use toolchat_agent::{MessageLog, ToolRegistry};

    use super::*;
    use crate::testing::RecordingConsole;

    async fn run(
        descriptor: ToolDescriptor,
        console: &mut RecordingConsole,
        args: Value,
    ) -> toolchat_agent::Result<ToolOutcome> {
        let mut registry = ToolRegistry::new();
        let name = descriptor.name.clone();
        registry.register(descriptor)?;
        let log = MessageLog::new();
        registry
            .invoke(&name, &args, ToolContext { log: &log, console })
            .await
    }

    #[tokio::test]
    async fn clear_display_only_clears_when_confirmed() {
        let mut console = RecordingConsole::default();

        let outcome = run(clear_display(), &mut console, json!({ "confirm": false }))
            .await
            .unwrap();
        assert_eq!(outcome, ToolOutcome::Completed(json!({ "cleared": false })));
        assert_eq!(console.clears, 0);

        let outcome = run(clear_display(), &mut console, json!({ "confirm": true }))
            .await
            .unwrap();
        assert_eq!(outcome, ToolOutcome::Completed(json!({ "cleared": true })));
        assert_eq!(console.clears, 1);
    }

    #[tokio::test]
    async fn clear_failure_is_a_tool_failure() {
        let mut console = RecordingConsole {
            fail_clear: true,
            ..RecordingConsole::default()
        };
        let err = run(clear_display(), &mut console, json!({ "confirm": true }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            toolchat_agent::AgentError::ToolExecutionFailed { ref tool_name, .. }
                if tool_name == "clear_display"
        ));
    }

    #[tokio::test]
    async fn exit_application_terminates_only_when_confirmed() {
        let mut console = RecordingConsole::default();
        assert_eq!(
            run(exit_application(), &mut console, json!({ "confirm": true }))
                .await
                .unwrap(),
            ToolOutcome::Terminate
        );
        assert_eq!(
            run(exit_application(), &mut console, json!({ "confirm": false }))
                .await
                .unwrap(),
            ToolOutcome::Completed(json!({ "exiting": false }))
        );
        assert!(
            run(exit_application(), &mut console, json!({}))
                .await
                .is_err()
        );
    }
}
