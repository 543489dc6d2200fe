//! Referral wallet factory: creates fresh wallets, registers them under an
//! invite code, persists them to the wallet store, then runs a light
//! interaction pass so the referral counts.

use anyhow::{Context, Result};
use blockstreet::api::{swap_out_amount, BlockStreetClient, Session};
use blockstreet::captcha::{load_api_key, make_solver, CaptchaSolver};
use blockstreet::config::BotConfig;
use bot_core::{
    setup_logger, sleep_ms, AmountRange, ConfigError, ProxyPool, WalletRecord, WalletStore,
};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Input};
use dotenv::dotenv;
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

const BASE_SYMBOL: &str = "BSD";
const WALLET_GAP_MS: u64 = 3_000;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    std::mem::forget(_log_guard);
    dotenv().ok();

    let args = Args::parse();
    let config = match BotConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Ok(());
        }
    };

    let invite_code = match read_invite_code(&config.invite_code_file) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
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

    let proxies = match ProxyPool::load() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to load proxies: {:#}", e);
            return Ok(());
        }
    };

    // The referral landing page carries the invite code in its URL.
    let page_url = format!(
        "https://blockstreet.money/dashboard?invite_code={}",
        invite_code
    );
    let store = WalletStore::new(&config.wallet_store);

    let count: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter number of wallets to create")
        .validate_with(|n: &u32| {
            if *n >= 1 {
                Ok(())
            } else {
                Err("must be at least 1")
            }
        })
        .interact_text()?;

    for index in 1..=count {
        let proxy = proxies.pick_random();
        let solver = make_solver(
            config.captcha.provider,
            api_key.clone(),
            proxy.map(str::to_string),
        );
        if let Err(e) = create_and_process_wallet(
            &config,
            solver.as_ref(),
            proxy,
            &page_url,
            &invite_code,
            &store,
            index,
            count,
        )
        .await
        {
            error!("Error processing wallet {}/{}: {:#}", index, count, e);
        }
        if index < count {
            info!("Waiting 3 seconds before next wallet...");
            sleep_ms(WALLET_GAP_MS).await;
        }
    }

    info!("All wallets created and interactions completed");
    Ok(())
}

fn read_invite_code(path: &str) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound {
                path: path.to_string(),
            }
        } else {
            ConfigError::IoError {
                path: path.to_string(),
                msg: e.to_string(),
            }
        }
    })?;
    let code = raw.trim().to_string();
    if code.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: path.to_string(),
            reason: "invite code is empty".to_string(),
        });
    }
    Ok(code)
}

#[allow(clippy::too_many_arguments)]
async fn create_and_process_wallet(
    config: &BotConfig,
    solver: &dyn CaptchaSolver,
    proxy: Option<&str>,
    page_url: &str,
    invite_code: &str,
    store: &WalletStore,
    index: u32,
    total: u32,
) -> Result<()> {
    let wallet = LocalWallet::new(&mut rand::thread_rng());
    let address = to_checksum(&wallet.address(), None);
    info!("Creating wallet {}/{} ({})", index, total, address);

    let client = BlockStreetClient::new(&config.base_url, proxy)?;

    info!("Solving Turnstile captcha...");
    let captcha = solver
        .solve_turnstile(&config.site_key, page_url)
        .await
        .context("captcha solving failed")?;

    let mut session = Session::anonymous();
    client
        .login(&wallet, &mut session, &captcha, invite_code)
        .await
        .context("registration failed")?;

    // Confirm the account exists before persisting anything.
    client
        .account_info(&mut session)
        .await
        .context("account info check failed")?;
    info!("Registered wallet: {}", address);

    let record = WalletRecord {
        address: address.clone(),
        private_key: format!("0x{}", hex::encode(wallet.signer().to_bytes())),
        session_id: session.id().map(str::to_string),
    };
    store.append(record)?;
    info!("Saved wallet to {}", store.path().display());

    if let Err(e) = run_interactions(&client, &mut session, &address, config.refer_amounts).await
    {
        error!("Interaction error for {}: {:#}", address, e);
    }
    Ok(())
}

/// Rounds the way the referral amounts are displayed, to 4 decimals.
fn round_4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

/// Light activity pass for a freshly registered wallet: one swap out of the
/// base token, a small supply, a borrow, a repay and a withdraw, each step
/// skipped when the balance does not cover it.
async fn run_interactions(
    client: &BlockStreetClient,
    session: &mut Session,
    address: &str,
    amounts: AmountRange,
) -> Result<()> {
    info!("Starting interactions for wallet {}...", address);
    let mut rng = rand::thread_rng();

    let assets = client.assets(session).await?;
    info!("User assets:");
    for asset in &assets {
        info!(
            "{}: Total {}, Available {}, Frozen {}",
            asset.symbol, asset.total_amount, asset.available_amount, asset.frozen_amount
        );
    }
    let base_available = assets
        .iter()
        .find(|a| a.symbol == BASE_SYMBOL)
        .map(|a| a.available_f64())
        .unwrap_or(0.0);

    let tokens = client.token_list(session).await?;
    let base_token = tokens.iter().find(|t| t.symbol == BASE_SYMBOL);
    let borrowable: Vec<_> = tokens.iter().filter(|t| t.is_borrowable()).collect();

    if let (Some(base), Some(to)) = (base_token, borrowable.choose(&mut rng)) {
        let from_amount = round_4(amounts.sample());
        if base_available >= from_amount {
            match swap_out_amount(from_amount, base.price_f64(), to.price_f64()) {
                Some(to_amount) => {
                    match client
                        .swap(session, BASE_SYMBOL, &to.symbol, from_amount, to_amount)
                        .await
                    {
                        Ok(_) => info!(
                            "Swapped {} {} to {} {}",
                            from_amount, BASE_SYMBOL, to_amount, to.symbol
                        ),
                        Err(e) => error!("Swap failed: {}", e),
                    }
                }
                None => warn!("No usable price for {} -> {}", BASE_SYMBOL, to.symbol),
            }
        } else {
            warn!("Not enough {} for swap", BASE_SYMBOL);
        }
    }

    if base_available >= 1.0 {
        match client.supply(session, BASE_SYMBOL, 1.0).await {
            Ok(_) => info!("Supplied 1 {}", BASE_SYMBOL),
            Err(e) => error!("Supply failed: {}", e),
        }
    } else {
        warn!("Not enough {} available for supply", BASE_SYMBOL);
    }

    let market = client.market_borrow(session).await?;
    let borrowables: Vec<_> = market.iter().filter(|t| t.is_borrowable()).collect();
    if let Some(to_borrow) = borrowables.choose(&mut rng) {
        let amount = round_4(amounts.sample());
        match client.borrow(session, &to_borrow.symbol, amount).await {
            Ok(_) => info!("Borrowed {} {}", amount, to_borrow.symbol),
            Err(e) => error!("Borrow failed: {}", e),
        }
    }

    let debts = client.my_borrows(session).await?;
    let open_debts: Vec<_> = debts.iter().filter(|b| b.amount_f64() > 0.0).collect();
    if let Some(to_repay) = open_debts.choose(&mut rng) {
        let repay_amount = round_4(amounts.sample());
        if to_repay.amount_f64() >= repay_amount {
            match client.repay(session, &to_repay.symbol, repay_amount).await {
                Ok(_) => info!("Repaid {} {}", repay_amount, to_repay.symbol),
                Err(e) => error!("Repay failed: {}", e),
            }
        }
    }

    let supplies = client.my_supplies(session).await?;
    let base_supplied: f64 = supplies
        .iter()
        .filter(|s| s.symbol == BASE_SYMBOL)
        .map(|s| s.amount_f64())
        .sum();
    if base_supplied >= 1.0 {
        match client.withdraw(session, BASE_SYMBOL, 1.0).await {
            Ok(_) => info!("Withdrew 1 {}", BASE_SYMBOL),
            Err(e) => error!("Withdraw failed: {}", e),
        }
    } else {
        warn!("Not enough {} supplied for withdraw", BASE_SYMBOL);
    }

    Ok(())
}
