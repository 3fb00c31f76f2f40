//! `current_timestamp` -- report the wall-clock time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, SecondsFormat};
use serde_json::{Map, Value, json};

use toolchat_agent::{ToolContext, ToolDescriptor, ToolHandler, ToolOutcome};

struct CurrentTimestamp;

#[async_trait]
impl ToolHandler for CurrentTimestamp {
    async fn call(
        &self,
        _ctx: ToolContext<'_>,
        _args: &Map<String, Value>,
    ) -> toolchat_agent::Result<ToolOutcome> {
        let now = Local::now();
        Ok(ToolOutcome::Completed(json!({
            "rfc3339": now.to_rfc3339_opts(SecondsFormat::Secs, false),
            "unix_seconds": now.timestamp(),
        })))
    }
}

pub fn current_timestamp() -> ToolDescriptor {
    ToolDescriptor::new(
        "current_timestamp",
        "Returns the current local date and time",
        Arc::new(CurrentTimestamp),
    )
}
