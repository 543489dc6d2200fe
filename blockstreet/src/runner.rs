//! Wallet orchestration.
//!
//! The loop is strictly sequential on purpose: one wallet at a time, one
//! action at a time, with a jittered pause after every action. A wallet that
//! fails captcha or login is skipped, never retried inside the same sweep.

use crate::api::{swap_out_amount, BlockStreetClient, Session, Token};
use crate::captcha::CaptchaSolver;
use crate::config::BotConfig;
use crate::task::{
    BorrowTask, BotTask, RepayTask, ShareTask, SupplyTask, SwapTask, TaskContext, WithdrawTask,
};
use anyhow::{Context, Result};
use bot_core::{countdown, random_delay, sleep_ms, ProxyPool, TaskResult};
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Gap between wallets in single-action mode, shorter than the daily sweep's.
const SINGLE_WALLET_GAP_MS: u64 = 3_000;

/// Runs `body` for each wallet in order, pausing `gap_ms` between wallets.
/// A failing wallet is logged and skipped. Returns how many completed.
pub async fn for_each_wallet<W, F, Fut>(wallets: Vec<W>, gap_ms: u64, mut body: F) -> usize
where
    F: FnMut(usize, W) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let total = wallets.len();
    let mut completed = 0;
    for (index, wallet) in wallets.into_iter().enumerate() {
        match body(index, wallet).await {
            Ok(()) => completed += 1,
            Err(e) => warn!("wallet {}/{} skipped: {:#}", index + 1, total, e),
        }
        if index + 1 < total {
            sleep_ms(gap_ms).await;
        }
    }
    completed
}

/// One user-selected action, repeated verbatim across wallets.
pub enum SingleAction {
    Swap { from: Token, to: Token, amount: f64 },
    Supply { symbol: String, amount: f64 },
    Withdraw { symbol: String, amount: f64 },
    Borrow { symbol: String, amount: f64 },
    Repay { symbol: String, amount: f64 },
}

impl SingleAction {
    pub fn name(&self) -> &'static str {
        match self {
            SingleAction::Swap { .. } => "swap",
            SingleAction::Supply { .. } => "supply",
            SingleAction::Withdraw { .. } => "withdraw",
            SingleAction::Borrow { .. } => "borrow",
            SingleAction::Repay { .. } => "repay",
        }
    }

    async fn execute(
        &self,
        client: &BlockStreetClient,
        session: &mut Session,
    ) -> Result<TaskResult> {
        match self {
            SingleAction::Swap { from, to, amount } => {
                let Some(to_amount) =
                    swap_out_amount(*amount, from.price_f64(), to.price_f64())
                else {
                    return Ok(TaskResult::failed(format!(
                        "no usable price for {} -> {}",
                        from.symbol, to.symbol
                    )));
                };
                client
                    .swap(session, &from.symbol, &to.symbol, *amount, to_amount)
                    .await?;
                Ok(TaskResult::ok(format!(
                    "swapped {:.8} {} for {:.8} {}",
                    amount, from.symbol, to_amount, to.symbol
                )))
            }
            SingleAction::Supply { symbol, amount } => {
                client.supply(session, symbol, *amount).await?;
                Ok(TaskResult::ok(format!("supplied {:.8} {}", amount, symbol)))
            }
            SingleAction::Withdraw { symbol, amount } => {
                client.withdraw(session, symbol, *amount).await?;
                Ok(TaskResult::ok(format!("withdrew {:.8} {}", amount, symbol)))
            }
            SingleAction::Borrow { symbol, amount } => {
                client.borrow(session, symbol, *amount).await?;
                Ok(TaskResult::ok(format!("borrowed {:.8} {}", amount, symbol)))
            }
            SingleAction::Repay { symbol, amount } => {
                client.repay(session, symbol, *amount).await?;
                Ok(TaskResult::ok(format!("repaid {:.8} {}", amount, symbol)))
            }
        }
    }
}

pub struct Runner {
    config: BotConfig,
    solver: Box<dyn CaptchaSolver>,
    proxies: ProxyPool,
}

impl Runner {
    pub fn new(config: BotConfig, solver: Box<dyn CaptchaSolver>, proxies: ProxyPool) -> Self {
        Self {
            config,
            solver,
            proxies,
        }
    }

    /// Token list is public; fetched once per run with an anonymous session.
    pub async fn fetch_token_list(&self) -> Result<Vec<Token>> {
        let client = BlockStreetClient::new(&self.config.base_url, self.proxies.next())?;
        let mut session = Session::anonymous();
        let tokens = client
            .token_list(&mut session)
            .await
            .context("failed to fetch token list")?;
        info!("fetched {} tokens", tokens.len());
        Ok(tokens)
    }

    fn log_result(&self, index: usize, name: &str, outcome: Result<TaskResult>) {
        match outcome {
            Ok(res) if res.success => {
                info!(target: "task_result", "[WL:{}] Success [{}] {}", index + 1, name, res.message)
            }
            Ok(res) => {
                warn!(target: "task_result", "[WL:{}] Failed  [{}] {}", index + 1, name, res.message)
            }
            Err(e) => {
                warn!(target: "task_result", "[WL:{}] Failed  [{}] {:#}", index + 1, name, e)
            }
        }
    }

    async fn run_logged(&self, index: usize, task: &dyn BotTask, ctx: &mut TaskContext<'_>) {
        let outcome = task.run(ctx).await;
        self.log_result(index, task.name(), outcome);
    }

    /// Full daily treatment for one wallet: captcha, login, share, then
    /// `cycles` transaction cycles. Errors out only on captcha or login
    /// failure; individual action failures are logged and skipped.
    pub async fn process_wallet_daily(
        &self,
        index: usize,
        total: usize,
        wallet: LocalWallet,
        tokens: &[Token],
        cycles: u32,
    ) -> Result<()> {
        let address = to_checksum(&wallet.address(), None);
        info!("--- processing wallet {}/{}: {} ---", index + 1, total, address);

        let captcha = self
            .solver
            .solve_turnstile(&self.config.site_key, &self.config.page_url)
            .await
            .context("captcha solving failed")?;

        let client = BlockStreetClient::new(&self.config.base_url, self.proxies.next())?;
        let mut session = Session::anonymous();
        client
            .login(&wallet, &mut session, &captcha, "")
            .await
            .context("login failed")?;
        info!("wallet {} logged in", address);

        let delays = self.config.delays;
        let amounts = self.config.amounts;

        {
            let mut ctx = TaskContext {
                client: &client,
                session: &mut session,
                tokens,
                owned: &[],
                amounts,
            };
            self.run_logged(index, &ShareTask::new(), &mut ctx).await;
        }

        let plan = self.config.cycle;
        for cycle in 1..=cycles {
            info!("--- transaction cycle {} of {} ---", cycle, cycles);

            let owned = match client.my_supplies(&mut session).await {
                Ok(supplies) => supplies,
                Err(e) => {
                    warn!("could not fetch supplies: {}", e);
                    Vec::new()
                }
            };

            let mut ctx = TaskContext {
                client: &client,
                session: &mut session,
                tokens,
                owned: &owned,
                amounts,
            };

            if ctx.owned.iter().all(|s| s.amount_f64() <= 0.0) {
                warn!("no supplied assets found to swap from, skipping swaps");
            } else {
                for _ in 0..plan.swaps {
                    self.run_logged(index, &SwapTask::new(), &mut ctx).await;
                    random_delay(delays.action_min_ms, delays.action_max_ms).await;
                }
            }

            let (supply, withdraw, borrow, repay) = (
                SupplyTask::new(),
                WithdrawTask::new(),
                BorrowTask::new(),
                RepayTask::new(),
            );
            let actions: [(&dyn BotTask, u32); 4] = [
                (&supply, plan.supplies),
                (&withdraw, plan.withdraws),
                (&borrow, plan.borrows),
                (&repay, plan.repays),
            ];
            for (task, count) in actions {
                for _ in 0..count {
                    self.run_logged(index, task, &mut ctx).await;
                    random_delay(delays.action_min_ms, delays.action_max_ms).await;
                }
            }
        }

        info!("all cycles completed for wallet {}", address);
        Ok(())
    }

    /// Daily mode: sweep every wallet, then count down to the next sweep.
    /// Runs until the token is cancelled.
    pub async fn run_all_daily(
        &self,
        wallets: Vec<LocalWallet>,
        cycles: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let tokens = self.fetch_token_list().await?;
        let tokens = tokens.as_slice();
        info!("will run {} cycle(s) per wallet", cycles);

        loop {
            let total = wallets.len();
            let this = self;
            let completed = for_each_wallet(
                wallets.clone(),
                self.config.delays.wallet_ms,
                move |index, wallet| {
                    this.process_wallet_daily(index, total, wallet, tokens, cycles)
                },
            )
            .await;
            info!("daily sweep completed: {}/{} wallets processed", completed, total);

            if !countdown(self.config.delays.sweep_interval_secs, cancel).await {
                info!("daily loop stopped");
                return Ok(());
            }
        }
    }

    /// Single-action mode: one captcha solve up front, then each wallet logs
    /// in and repeats the chosen action.
    pub async fn run_single(
        &self,
        wallets: Vec<LocalWallet>,
        repeats: u32,
        action: SingleAction,
    ) -> Result<()> {
        let captcha = self
            .solver
            .solve_turnstile(&self.config.site_key, &self.config.page_url)
            .await
            .context("captcha solving failed")?;
        let captcha = captcha.as_str();

        let this = self;
        let action = &action;
        for_each_wallet(wallets, SINGLE_WALLET_GAP_MS, move |index, wallet| async move {
            let client = BlockStreetClient::new(&this.config.base_url, this.proxies.next())?;
            let address = to_checksum(&wallet.address(), None);
            info!("processing wallet: {}", address);

            let mut session = Session::anonymous();
            client
                .login(&wallet, &mut session, captcha, "")
                .await
                .context("login failed")?;
            info!("wallet {} logged in", address);

            for repeat in 1..=repeats {
                info!("--- running transaction {} of {} ---", repeat, repeats);
                let outcome = action.execute(&client, &mut session).await;
                this.log_result(index, action.name(), outcome);
                sleep_ms(this.config.delays.repeat_ms).await;
            }
            Ok(())
        })
        .await;

        info!("{} task has been run on all wallets", action.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_wallet_is_skipped_not_fatal() {
        let order = std::sync::Mutex::new(Vec::new());
        let order_ref = &order;
        let completed =
            for_each_wallet(vec!["a", "b", "c"], 0, move |index, wallet| async move {
                order_ref.lock().unwrap().push(wallet);
                if index == 1 {
                    anyhow::bail!("login failed");
                }
                Ok(())
            })
            .await;
        assert_eq!(completed, 2);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_wallet_list_completes_immediately() {
        let completed =
            for_each_wallet(Vec::<u32>::new(), 0, |_, _| async { Ok(()) }).await;
        assert_eq!(completed, 0);
    }
}
