use anyhow::Result;
use bot_core::{AmountRange, CyclePlan, Delays};
use config::{Config, File};
use serde::Deserialize;

/// Bot configuration, loaded from `config.toml` (every field has a default
/// matching the live BlockStreet deployment, so the file is optional).
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_site_key")]
    pub site_key: String,
    #[serde(default = "default_page_url")]
    pub page_url: String,
    #[serde(default)]
    pub captcha: CaptchaSettings,
    /// Amount range for farming actions.
    #[serde(default)]
    pub amounts: AmountRange,
    /// Amount range for the referral interaction pass.
    #[serde(default = "default_refer_amounts")]
    pub refer_amounts: AmountRange,
    #[serde(default)]
    pub cycle: CyclePlan,
    #[serde(default)]
    pub delays: Delays,
    #[serde(default = "default_wallet_store")]
    pub wallet_store: String,
    #[serde(default = "default_invite_code_file")]
    pub invite_code_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaSettings {
    #[serde(default)]
    pub provider: CaptchaProvider,
    /// File holding the solving service API key.
    #[serde(default = "default_captcha_key_file")]
    pub key_file: String,
}

impl Default for CaptchaSettings {
    fn default() -> Self {
        Self {
            provider: CaptchaProvider::default(),
            key_file: default_captcha_key_file(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CaptchaProvider {
    #[default]
    #[serde(rename = "capmonster")]
    CapMonster,
    #[serde(rename = "2captcha")]
    TwoCaptcha,
}

impl BotConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;

        settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))
    }
}

fn default_base_url() -> String {
    "https://api.blockstreet.money/api".to_string()
}

fn default_site_key() -> String {
    "0x4AAAAAABpfyUqunlqwRBYN".to_string()
}

fn default_page_url() -> String {
    "https://blockstreet.money/dashboard".to_string()
}

fn default_refer_amounts() -> AmountRange {
    AmountRange {
        min: 0.01,
        max: 0.015,
    }
}

fn default_wallet_store() -> String {
    "wallets.json".to_string()
}

fn default_invite_code_file() -> String {
    "code.txt".to_string()
}

fn default_captcha_key_file() -> String {
    "key.txt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_field() {
        let cfg: BotConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.base_url, "https://api.blockstreet.money/api");
        assert_eq!(cfg.captcha.provider, CaptchaProvider::CapMonster);
        assert_eq!(cfg.cycle.swaps, 5);
        assert_eq!(cfg.wallet_store, "wallets.json");
    }

    #[test]
    fn captcha_provider_accepts_both_spellings() {
        let s: CaptchaSettings =
            serde_json::from_str(r#"{"provider": "2captcha"}"#).unwrap();
        assert_eq!(s.provider, CaptchaProvider::TwoCaptcha);
        let s: CaptchaSettings =
            serde_json::from_str(r#"{"provider": "capmonster"}"#).unwrap();
        assert_eq!(s.provider, CaptchaProvider::CapMonster);
    }
}
