use crate::api::models::{swap_out_amount, truncate_8, SupplyEntry, Token};
use crate::task::{BotTask, TaskContext};
use anyhow::Result;
use async_trait::async_trait;
use bot_core::TaskResult;
use rand::seq::SliceRandom;
use rand::Rng;

pub struct SwapTask;

impl SwapTask {
    pub fn new() -> Self {
        Self
    }
}

/// Picks a swap pair: FROM is a random priced token the wallet has supplied,
/// TO is a random priced token with a different symbol.
pub fn pick_swap_pair<'t, R: Rng>(
    tokens: &'t [Token],
    owned: &[SupplyEntry],
    rng: &mut R,
) -> Option<(&'t Token, &'t Token)> {
    let from_candidates: Vec<&Token> = owned
        .iter()
        .filter(|s| s.amount_f64() > 0.0)
        .filter_map(|s| tokens.iter().find(|t| t.symbol == s.symbol))
        .filter(|t| t.price_f64() > 0.0)
        .collect();
    let from = *from_candidates.choose(rng)?;

    let to_candidates: Vec<&Token> = tokens
        .iter()
        .filter(|t| t.symbol != from.symbol && t.price_f64() > 0.0)
        .collect();
    let to = *to_candidates.choose(rng)?;
    Some((from, to))
}

#[async_trait]
impl BotTask for SwapTask {
    fn name(&self) -> &str {
        "01_swap"
    }

    async fn run(&self, ctx: &mut TaskContext<'_>) -> Result<TaskResult> {
        let Some((from, to)) = pick_swap_pair(ctx.tokens, ctx.owned, &mut rand::thread_rng())
        else {
            return Ok(TaskResult::failed("no supplied assets to swap from"));
        };

        let from_amount = truncate_8(ctx.amounts.sample());
        let Some(to_amount) = swap_out_amount(from_amount, from.price_f64(), to.price_f64())
        else {
            return Ok(TaskResult::failed(format!(
                "no usable price for {} -> {}",
                from.symbol, to.symbol
            )));
        };

        ctx.client
            .swap(ctx.session, &from.symbol, &to.symbol, from_amount, to_amount)
            .await?;

        Ok(TaskResult::ok(format!(
            "swapped {:.8} {} for {:.8} {}",
            from_amount, from.symbol, to_amount, to.symbol
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(symbol: &str, price: &str) -> Token {
        Token {
            symbol: symbol.to_string(),
            price: price.to_string(),
            kind: "S".to_string(),
        }
    }

    fn supply(symbol: &str, amount: &str) -> SupplyEntry {
        SupplyEntry {
            symbol: symbol.to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn pair_comes_from_owned_and_never_self_swaps() {
        let tokens = vec![token("BSD", "1.0"), token("BTC", "60000"), token("ETH", "3000")];
        let owned = vec![supply("BSD", "5.0")];
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let (from, to) = pick_swap_pair(&tokens, &owned, &mut rng).unwrap();
            assert_eq!(from.symbol, "BSD");
            assert_ne!(to.symbol, from.symbol);
        }
    }

    #[test]
    fn no_pair_without_supplied_assets() {
        let tokens = vec![token("BSD", "1.0"), token("BTC", "60000")];
        let mut rng = rand::thread_rng();
        assert!(pick_swap_pair(&tokens, &[], &mut rng).is_none());
        // zero balance does not count as owned
        let owned = vec![supply("BSD", "0")];
        assert!(pick_swap_pair(&tokens, &owned, &mut rng).is_none());
    }

    #[test]
    fn no_pair_when_only_one_token_is_priced() {
        let tokens = vec![token("BSD", "1.0"), token("DUST", "0")];
        let owned = vec![supply("BSD", "5.0")];
        let mut rng = rand::thread_rng();
        assert!(pick_swap_pair(&tokens, &owned, &mut rng).is_none());
    }
}
