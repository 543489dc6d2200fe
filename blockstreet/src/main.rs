use anyhow::Result;
use blockstreet::api::Token;
use blockstreet::captcha::{load_api_key, make_solver};
use blockstreet::config::BotConfig;
use blockstreet::runner::{Runner, SingleAction};
use bot_core::{setup_logger, ProxyPool, WalletError, WalletManager};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use dotenv::dotenv;
use ethers::signers::LocalWallet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

const MENU_ITEMS: &[&str] = &[
    "Swap Token",
    "Supply Token",
    "Withdraw Token",
    "Borrow Token",
    "Repay Token",
    "Run All Features Daily",
    "Exit",
];

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    // Keep guard alive for file logging
    std::mem::forget(_log_guard);
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);
    let config = match BotConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Ok(());
        }
    };

    let wallets = match load_wallets() {
        Ok(w) => w,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };
    info!("Loaded {} wallet(s)", wallets.len());

    let proxies = match ProxyPool::load() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to load proxies: {:#}", e);
            return Ok(());
        }
    };

    let api_key = match load_api_key(&config.captcha.key_file) {
        Ok(k) => k,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };
    let solver = make_solver(
        config.captcha.provider,
        api_key,
        proxies.pick_random().map(str::to_string),
    );
    let runner = Runner::new(config, solver, proxies);

    // Token list is needed for the menu choices, fetch it up front.
    let tokens = match runner.fetch_token_list().await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to fetch token list: {:#}", e);
            return Ok(());
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    loop {
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose a feature to run")
            .items(MENU_ITEMS)
            .default(0)
            .interact()?;

        match choice {
            6 => {
                info!("Exiting bot. Goodbye!");
                return Ok(());
            }
            5 => {
                let cycles: u32 = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("How many transaction cycles to run per wallet?")
                    .validate_with(|n: &u32| {
                        if *n >= 1 {
                            Ok(())
                        } else {
                            Err("must be at least 1")
                        }
                    })
                    .interact_text()?;
                if let Err(e) = runner.run_all_daily(wallets.clone(), cycles, &cancel).await {
                    error!("Daily run aborted: {:#}", e);
                }
                if cancel.is_cancelled() {
                    return Ok(());
                }
            }
            _ => {
                let Some(action) = build_single_action(choice, &tokens)? else {
                    continue;
                };
                let repeats: u32 = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("How many times to run per wallet?")
                    .validate_with(|n: &u32| {
                        if *n >= 1 {
                            Ok(())
                        } else {
                            Err("must be at least 1")
                        }
                    })
                    .interact_text()?;
                if let Err(e) = runner.run_single(wallets.clone(), repeats, action).await {
                    error!("Task aborted: {:#}", e);
                }
            }
        }
    }
}

fn parse_wallet(index: usize, key: &str) -> Result<LocalWallet, WalletError> {
    key.trim_start_matches("0x")
        .parse()
        .map_err(|e: ethers::signers::WalletError| WalletError::InvalidKey {
            index,
            reason: e.to_string(),
        })
}

fn load_wallets() -> Result<Vec<LocalWallet>> {
    let keys = WalletManager::load_keys()?;
    let mut wallets = Vec::new();
    for (index, key) in keys.iter().enumerate() {
        match parse_wallet(index, key) {
            Ok(wallet) => wallets.push(wallet),
            Err(e) => warn!("{}", e),
        }
    }
    if wallets.is_empty() {
        anyhow::bail!("No valid private keys found");
    }
    Ok(wallets)
}

fn select_token(tokens: &[Token], prompt: &str) -> Result<Token> {
    let symbols: Vec<&str> = tokens.iter().map(|t| t.symbol.as_str()).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&symbols)
        .default(0)
        .interact()?;
    Ok(tokens[index].clone())
}

fn prompt_amount(prompt: &str) -> Result<f64> {
    let amount: f64 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|a: &f64| {
            if *a > 0.0 {
                Ok(())
            } else {
                Err("amount must be positive")
            }
        })
        .interact_text()?;
    Ok(amount)
}

/// Maps a menu index to a concrete action, prompting for the details.
/// Returns None when the selection is inconsistent (e.g. self-swap).
fn build_single_action(choice: usize, tokens: &[Token]) -> Result<Option<SingleAction>> {
    if tokens.is_empty() {
        error!("Token list is empty");
        return Ok(None);
    }
    let action = match choice {
        0 => {
            let from = select_token(tokens, "Select token to swap FROM")?;
            let to = select_token(tokens, "Select token to swap TO")?;
            if from.symbol == to.symbol {
                error!("Cannot swap to the same token");
                return Ok(None);
            }
            let amount = prompt_amount(&format!("Amount of {} to swap", from.symbol))?;
            SingleAction::Swap { from, to, amount }
        }
        1 => {
            let token = select_token(tokens, "Select a token to supply")?;
            let amount = prompt_amount(&format!("Amount of {} to supply", token.symbol))?;
            SingleAction::Supply {
                symbol: token.symbol,
                amount,
            }
        }
        2 => {
            let token = select_token(tokens, "Select a token to withdraw")?;
            let amount = prompt_amount(&format!("Amount of {} to withdraw", token.symbol))?;
            SingleAction::Withdraw {
                symbol: token.symbol,
                amount,
            }
        }
        3 => {
            let token = select_token(tokens, "Select a token to borrow")?;
            let amount = prompt_amount(&format!("Amount of {} to borrow", token.symbol))?;
            SingleAction::Borrow {
                symbol: token.symbol,
                amount,
            }
        }
        4 => {
            let token = select_token(tokens, "Select a token to repay")?;
            let amount = prompt_amount(&format!("Amount of {} to repay", token.symbol))?;
            SingleAction::Repay {
                symbol: token.symbol,
                amount,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_with_and_without_prefix() {
        let key = "4c0883a69102937d6231471b5dbb6204fe512961708279f1d1e5b5b5b5b5b5b5";
        assert!(parse_wallet(0, key).is_ok());
        assert!(parse_wallet(0, &format!("0x{}", key)).is_ok());
    }

    #[test]
    fn bad_key_yields_invalid_key_with_index() {
        match parse_wallet(2, "not-a-key") {
            Err(WalletError::InvalidKey { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
