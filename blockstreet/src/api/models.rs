use serde::Deserialize;

/// One market asset from `/swap/token_list` (and `/market/borrow`, which
/// shares the shape). Prices come over the wire as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub symbol: String,
    #[serde(default)]
    pub price: String,
    /// `"B"` marks borrowable assets.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Token {
    pub fn price_f64(&self) -> f64 {
        self.price.parse().unwrap_or(0.0)
    }

    pub fn is_borrowable(&self) -> bool {
        self.kind == "B"
    }
}

/// One entry from `/my/supply`.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplyEntry {
    pub symbol: String,
    #[serde(default)]
    pub amount: String,
}

impl SupplyEntry {
    pub fn amount_f64(&self) -> f64 {
        self.amount.parse().unwrap_or(0.0)
    }
}

/// One entry from `/account/assets`.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub symbol: String,
    #[serde(default)]
    pub total_amount: String,
    #[serde(default)]
    pub available_amount: String,
    #[serde(default)]
    pub frozen_amount: String,
}

impl Asset {
    pub fn available_f64(&self) -> f64 {
        self.available_amount.parse().unwrap_or(0.0)
    }
}

/// One entry from `/my/borrow`.
#[derive(Debug, Clone, Deserialize)]
pub struct BorrowEntry {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub amount: String,
}

impl BorrowEntry {
    pub fn amount_f64(&self) -> f64 {
        self.amount.parse().unwrap_or(0.0)
    }
}

/// Truncates (not rounds) to 8 decimal digits, matching the precision the
/// API accepts for amounts.
pub fn truncate_8(x: f64) -> f64 {
    (x * 1e8).trunc() / 1e8
}

/// Destination amount for a swap: `amount * from_price / to_price`,
/// truncated to 8 decimals. Best-effort estimate, no slippage protection.
/// `None` when either price is missing or non-positive.
pub fn swap_out_amount(from_amount: f64, from_price: f64, to_price: f64) -> Option<f64> {
    if !(from_price > 0.0) || !(to_price > 0.0) {
        return None;
    }
    Some(truncate_8(from_amount * from_price / to_price))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_out_amount_basic() {
        assert_eq!(swap_out_amount(0.01, 2.0, 4.0), Some(0.005));
    }

    #[test]
    fn swap_out_amount_truncates_to_8_decimals() {
        // 1.0 * 1.0 / 3.0 = 0.333333333... -> 0.33333333
        assert_eq!(swap_out_amount(1.0, 1.0, 3.0), Some(0.33333333));
    }

    #[test]
    fn swap_out_amount_rejects_bad_prices() {
        assert_eq!(swap_out_amount(1.0, 0.0, 4.0), None);
        assert_eq!(swap_out_amount(1.0, 2.0, 0.0), None);
        assert_eq!(swap_out_amount(1.0, f64::NAN, 4.0), None);
    }

    #[test]
    fn token_price_parses_or_zero() {
        let t: Token =
            serde_json::from_str(r#"{"symbol":"BSD","price":"2.5","type":"B"}"#).unwrap();
        assert_eq!(t.price_f64(), 2.5);
        assert!(t.is_borrowable());

        let t: Token = serde_json::from_str(r#"{"symbol":"X"}"#).unwrap();
        assert_eq!(t.price_f64(), 0.0);
        assert!(!t.is_borrowable());
    }
}
