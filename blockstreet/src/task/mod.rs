use crate::api::{BlockStreetClient, Session, SupplyEntry, Token};
use anyhow::Result;
use async_trait::async_trait;
use bot_core::{AmountRange, TaskResult};

pub mod t01_swap;
pub mod t02_supply;
pub mod t03_withdraw;
pub mod t04_borrow;
pub mod t05_repay;
pub mod t06_share;

pub use self::t01_swap::SwapTask;
pub use self::t02_supply::SupplyTask;
pub use self::t03_withdraw::WithdrawTask;
pub use self::t04_borrow::BorrowTask;
pub use self::t05_repay::RepayTask;
pub use self::t06_share::ShareTask;

/// Per-wallet task state. The session is borrowed mutably because any call
/// may rotate the cookie; tasks never clone or stash it.
pub struct TaskContext<'a> {
    pub client: &'a BlockStreetClient,
    pub session: &'a mut Session,
    pub tokens: &'a [Token],
    pub owned: &'a [SupplyEntry],
    pub amounts: AmountRange,
}

#[async_trait]
pub trait BotTask: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<TaskResult>;
}
