//! BlockStreet session client.
//!
//! One [`BlockStreetClient`] is bound to a base URL and an optional proxy.
//! Authentication state lives in [`Session`], a value the caller owns and
//! threads through every call; the server may rotate the cookie on any
//! response, so callers must not cache the id across calls themselves.

pub mod models;

use anyhow::Result;
use bot_core::{ApiError, LoginError};
use chrono::{SecondsFormat, Utc};
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, SET_COOKIE,
    USER_AGENT,
};
use reqwest::{Client, Method, Proxy};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub use models::{swap_out_amount, truncate_8, Asset, BorrowEntry, SupplyEntry, Token};

const SESSION_COOKIE: &str = "gfsessionid";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Edg/141.0.0.0",
];

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// The `gfsessionid` cookie: the only mutable authentication state.
///
/// At most one active session exists per wallet; rotation happens in place
/// whenever a response carries a fresh `Set-Cookie`.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Cookie header value; the anonymous placeholder is `gfsessionid=`.
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE, self.id.as_deref().unwrap_or(""))
    }

    fn rotate(&mut self, id: String) {
        self.id = Some(id);
    }
}

fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or("");
        if let Some((name, id)) = pair.split_once('=') {
            if name.trim() == SESSION_COOKIE && !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

/// Uniform response wrapper: `{code, message|msg, data}`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// `data` when `code == 0`, otherwise an application error carrying the
    /// provider's `message` (falling back to `msg`).
    pub fn into_data(self, endpoint: &str) -> Result<Value, ApiError> {
        if self.code == 0 {
            return Ok(self.data);
        }
        let message = self
            .message
            .filter(|m| !m.is_empty())
            .or(self.msg)
            .unwrap_or_else(|| "API error".to_string());
        Err(ApiError::Application {
            endpoint: endpoint.to_string(),
            code: self.code,
            message,
        })
    }
}

/// Exact sign-in-with-Ethereum message BlockStreet expects. Deterministic
/// for a fixed (address, nonce, issued-at, expiration) tuple.
pub fn login_message(address: &str, nonce: &str, issued_at: &str, expiration: &str) -> String {
    format!(
        "blockstreet.money wants you to sign in with your Ethereum account:\n{}\n\nWelcome to Block Street\n\nURI: https://blockstreet.money\nVersion: 1\nChain ID: 1\nNonce: {}\nIssued At: {}\nExpiration Time: {}",
        address, nonce, issued_at, expiration
    )
}

/// HTTP client bound to one (base URL, proxy) pairing.
pub struct BlockStreetClient {
    http: Client,
    base_url: String,
}

impl BlockStreetClient {
    /// Builds the client with the browser header set, an explicit request
    /// timeout, and the given normalized proxy URL if any.
    pub fn new(base_url: impl Into<String>, proxy: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static("https://blockstreet.money/"));
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("empty"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("same-site"),
        );

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT);

        if let Some(url) = proxy {
            builder = builder.proxy(Proxy::all(url)?);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into(),
        })
    }

    async fn send(
        &self,
        session: &mut Session,
        method: Method,
        endpoint: &str,
        payload: Option<&Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .http
            .request(method, url)
            .header(USER_AGENT, random_user_agent())
            .header(COOKIE, session.cookie_header());

        if let Some(body) = payload {
            request = request.json(body);
        }
        if let Some(headers) = extra_headers {
            request = request.headers(headers);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        // Any response may silently rotate the session cookie.
        if let Some(id) = extract_session_id(response.headers()) {
            session.rotate(id);
        }

        let envelope: Envelope =
            response.json().await.map_err(|e| ApiError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        envelope.into_data(endpoint)
    }

    /// Raw envelope-unwrapped call with the session cookie attached.
    pub async fn call(
        &self,
        session: &mut Session,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.send(session, method, endpoint, payload.as_ref(), None)
            .await
    }

    /// Sign-in-with-Ethereum: nonce fetch, message signing with a 2-minute
    /// validity window, then verification with the captcha token attached.
    /// The session cookie captured along the way is left in `session`.
    pub async fn login(
        &self,
        wallet: &LocalWallet,
        session: &mut Session,
        captcha_token: &str,
        invite_code: &str,
    ) -> Result<Value, LoginError> {
        if captcha_token.is_empty() {
            return Err(LoginError::MissingCaptcha);
        }

        let data = self
            .call(session, Method::GET, "/account/signnonce", None)
            .await
            .map_err(LoginError::Nonce)?;
        let nonce = data
            .get("signnonce")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LoginError::Nonce(ApiError::InvalidResponse {
                    endpoint: "/account/signnonce".to_string(),
                    reason: "missing signnonce field".to_string(),
                })
            })?
            .to_string();

        let issued_at = Utc::now();
        let expiration = issued_at + chrono::Duration::minutes(2);
        let issued_at_s = issued_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let expiration_s = expiration.to_rfc3339_opts(SecondsFormat::Millis, true);

        let address = to_checksum(&wallet.address(), None);
        let message = login_message(&address, &nonce, &issued_at_s, &expiration_s);
        let signature = wallet
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| LoginError::Signing {
                reason: e.to_string(),
            })?;

        let payload = json!({
            "address": address,
            "nonce": nonce,
            "signature": format!("0x{}", signature),
            "chainId": 1,
            "issuedAt": issued_at_s,
            "expirationTime": expiration_s,
            "invite_code": invite_code,
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("cf-turnstile-response"),
            HeaderValue::from_str(captcha_token).map_err(|_| LoginError::MissingCaptcha)?,
        );

        self.send(
            session,
            Method::POST,
            "/account/signverify",
            Some(&payload),
            Some(headers),
        )
        .await
        .map_err(LoginError::Verify)
    }

    // --- Typed endpoint wrappers ---

    pub async fn token_list(&self, session: &mut Session) -> Result<Vec<Token>, ApiError> {
        let data = self
            .call(session, Method::GET, "/swap/token_list", None)
            .await?;
        parse_list("/swap/token_list", data)
    }

    pub async fn swap(
        &self,
        session: &mut Session,
        from_symbol: &str,
        to_symbol: &str,
        from_amount: f64,
        to_amount: f64,
    ) -> Result<Value, ApiError> {
        let payload = json!({
            "from_symbol": from_symbol,
            "to_symbol": to_symbol,
            "from_amount": format!("{:.8}", from_amount),
            "to_amount": format!("{:.8}", to_amount),
        });
        self.call(session, Method::POST, "/swap", Some(payload)).await
    }

    pub async fn supply(
        &self,
        session: &mut Session,
        symbol: &str,
        amount: f64,
    ) -> Result<Value, ApiError> {
        self.amount_call(session, "/supply", symbol, amount).await
    }

    pub async fn withdraw(
        &self,
        session: &mut Session,
        symbol: &str,
        amount: f64,
    ) -> Result<Value, ApiError> {
        self.amount_call(session, "/withdraw", symbol, amount).await
    }

    pub async fn borrow(
        &self,
        session: &mut Session,
        symbol: &str,
        amount: f64,
    ) -> Result<Value, ApiError> {
        self.amount_call(session, "/borrow", symbol, amount).await
    }

    pub async fn repay(
        &self,
        session: &mut Session,
        symbol: &str,
        amount: f64,
    ) -> Result<Value, ApiError> {
        self.amount_call(session, "/repay", symbol, amount).await
    }

    async fn amount_call(
        &self,
        session: &mut Session,
        endpoint: &str,
        symbol: &str,
        amount: f64,
    ) -> Result<Value, ApiError> {
        let payload = json!({
            "symbol": symbol,
            "amount": format!("{:.8}", amount),
        });
        self.call(session, Method::POST, endpoint, Some(payload)).await
    }

    pub async fn share(&self, session: &mut Session) -> Result<Value, ApiError> {
        self.call(session, Method::POST, "/share", None).await
    }

    pub async fn earn_info(&self, session: &mut Session) -> Result<Value, ApiError> {
        self.call(session, Method::GET, "/earn/info", None).await
    }

    pub async fn my_supplies(
        &self,
        session: &mut Session,
    ) -> Result<Vec<SupplyEntry>, ApiError> {
        let data = self.call(session, Method::GET, "/my/supply", None).await?;
        parse_list("/my/supply", data)
    }

    pub async fn assets(&self, session: &mut Session) -> Result<Vec<Asset>, ApiError> {
        let data = self
            .call(session, Method::GET, "/account/assets", None)
            .await?;
        parse_list("/account/assets", data)
    }

    pub async fn market_borrow(&self, session: &mut Session) -> Result<Vec<Token>, ApiError> {
        let data = self
            .call(session, Method::GET, "/market/borrow", None)
            .await?;
        parse_list("/market/borrow", data)
    }

    pub async fn my_borrows(
        &self,
        session: &mut Session,
    ) -> Result<Vec<BorrowEntry>, ApiError> {
        let data = self.call(session, Method::GET, "/my/borrow", None).await?;
        parse_list("/my/borrow", data)
    }

    pub async fn account_info(&self, session: &mut Session) -> Result<Value, ApiError> {
        self.call(session, Method::GET, "/account/info", None).await
    }
}

/// Null `data` means an empty list, the way the site's frontend treats it.
fn parse_list<T: DeserializeOwned>(endpoint: &str, data: Value) -> Result<Vec<T>, ApiError> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(data).map_err(|e| ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_returns_data_only_on_code_zero() {
        let env: Envelope =
            serde_json::from_str(r#"{"code":0,"message":"ok","data":{"x":1}}"#).unwrap();
        let data = env.into_data("/test").unwrap();
        assert_eq!(data["x"], 1);
    }

    #[test]
    fn envelope_nonzero_code_carries_message() {
        let env: Envelope =
            serde_json::from_str(r#"{"code":42,"message":"nope","data":null}"#).unwrap();
        match env.into_data("/test") {
            Err(ApiError::Application { code, message, .. }) => {
                assert_eq!(code, 42);
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn envelope_falls_back_to_msg_field() {
        let env: Envelope = serde_json::from_str(r#"{"code":1,"msg":"alt"}"#).unwrap();
        match env.into_data("/test") {
            Err(ApiError::Application { message, .. }) => assert_eq!(message, "alt"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn login_message_is_deterministic() {
        let addr = "0x1111111111111111111111111111111111111111";
        let a = login_message(addr, "n0nce", "2024-01-01T00:00:00.000Z", "2024-01-01T00:02:00.000Z");
        let b = login_message(addr, "n0nce", "2024-01-01T00:00:00.000Z", "2024-01-01T00:02:00.000Z");
        assert_eq!(a, b);
        assert_eq!(
            a,
            "blockstreet.money wants you to sign in with your Ethereum account:\n\
             0x1111111111111111111111111111111111111111\n\n\
             Welcome to Block Street\n\n\
             URI: https://blockstreet.money\n\
             Version: 1\n\
             Chain ID: 1\n\
             Nonce: n0nce\n\
             Issued At: 2024-01-01T00:00:00.000Z\n\
             Expiration Time: 2024-01-01T00:02:00.000Z"
        );
    }

    #[test]
    fn session_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("other=zzz; Path=/"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("gfsessionid=abc123; Path=/; HttpOnly"),
        );
        assert_eq!(extract_session_id(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn anonymous_session_sends_placeholder_cookie() {
        let session = Session::anonymous();
        assert_eq!(session.cookie_header(), "gfsessionid=");

        let mut session = Session::anonymous();
        session.rotate("xyz".to_string());
        assert_eq!(session.cookie_header(), "gfsessionid=xyz");
        assert_eq!(session.id(), Some("xyz"));
    }

    #[test]
    fn null_data_parses_as_empty_list() {
        let items: Vec<Token> = parse_list("/x", Value::Null).unwrap();
        assert!(items.is_empty());
    }
}
