use crate::api::models::truncate_8;
use crate::task::{BotTask, TaskContext};
use anyhow::Result;
use async_trait::async_trait;
use bot_core::TaskResult;
use rand::seq::SliceRandom;

pub struct SupplyTask;

impl SupplyTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BotTask for SupplyTask {
    fn name(&self) -> &str {
        "02_supply"
    }

    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<TaskResult> {
        let Some(token) = ctx.tokens.choose(&mut rand::thread_rng()) else {
            return Ok(TaskResult::failed("token list is empty"));
        };
        let amount = truncate_8(ctx.amounts.sample());
        ctx.client.supply(ctx.session, &token.symbol, amount).await?;
        Ok(TaskResult::ok(format!(
            "supplied {:.8} {}",
            amount, token.symbol
        )))
    }
}
