use crate::task::{BotTask, TaskContext};
use anyhow::Result;
use async_trait::async_trait;
use bot_core::TaskResult;

/// Daily share, once per wallet per sweep.
pub struct ShareTask;

impl ShareTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BotTask for ShareTask {
    fn name(&self) -> &str {
        "06_share"
    }

    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<TaskResult> {
        ctx.client.share(ctx.session).await?;
        Ok(TaskResult::ok("daily share completed"))
    }
}
