//! Turnstile solving via CapMonster or 2Captcha.
//!
//! Both providers follow the same shape: submit a task, then poll on a fixed
//! cadence until the token is ready or the attempt budget runs out. Polling
//! is bounded; a stuck provider surfaces as [`CaptchaError::Timeout`] instead
//! of hanging the wallet loop forever.

use async_trait::async_trait;
use bot_core::{CaptchaError, ConfigError};
use reqwest::Client;
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CaptchaProvider;

const CAPMONSTER_BASE: &str = "https://api.capmonster.cloud";
const TWOCAPTCHA_BASE: &str = "http://2captcha.com";

/// One poll step: token ready, or try again later.
pub enum Poll {
    Ready(String),
    Pending,
}

/// Drives a poll closure on a fixed cadence with a hard attempt cap.
pub async fn poll_until_ready<F, Fut>(
    initial_wait: Duration,
    interval: Duration,
    max_attempts: u32,
    mut poll: F,
) -> Result<String, CaptchaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll, CaptchaError>>,
{
    tokio::time::sleep(initial_wait).await;
    for attempt in 1..=max_attempts {
        match poll().await? {
            Poll::Ready(token) => return Ok(token),
            Poll::Pending => {
                debug!(attempt, "captcha not ready yet");
                tokio::time::sleep(interval).await;
            }
        }
    }
    Err(CaptchaError::Timeout {
        attempts: max_attempts,
    })
}

#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Solves a Turnstile challenge for the given site, returning the token.
    async fn solve_turnstile(&self, site_key: &str, page_url: &str)
        -> Result<String, CaptchaError>;
}

pub struct CapMonster {
    http: Client,
    api_key: String,
}

/// Failure reason from a CapMonster reply: the error code plus the provider's
/// human-readable description when one is present.
fn create_task_error(reply: &Value) -> String {
    let code = reply
        .get("errorCode")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    match reply.get("errorDescription").and_then(Value::as_str) {
        Some(description) if !description.is_empty() => {
            format!("{}: {}", code, description)
        }
        _ => code.to_string(),
    }
}

impl CapMonster {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    async fn post_json(&self, endpoint: &str, body: Value) -> Result<Value, CaptchaError> {
        let url = format!("{}{}", CAPMONSTER_BASE, endpoint);
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CaptchaError::Transport {
                message: e.to_string(),
            })?;
        response.json().await.map_err(|e| CaptchaError::Transport {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CaptchaSolver for CapMonster {
    async fn solve_turnstile(
        &self,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, CaptchaError> {
        let created = self
            .post_json(
                "/createTask",
                json!({
                    "clientKey": self.api_key,
                    "task": {
                        "type": "TurnstileTaskProxyless",
                        "websiteKey": site_key,
                        "websiteURL": page_url,
                    },
                }),
            )
            .await?;

        if created.get("errorId").and_then(Value::as_i64).unwrap_or(0) != 0 {
            return Err(CaptchaError::Provider {
                message: format!("capmonster createTask: {}", create_task_error(&created)),
            });
        }
        let task_id = created
            .get("taskId")
            .and_then(Value::as_i64)
            .ok_or_else(|| CaptchaError::Provider {
                message: "capmonster createTask: missing taskId".to_string(),
            })?;

        let this = self;
        poll_until_ready(
            Duration::from_secs(5),
            Duration::from_secs(5),
            24,
            move || async move {
                let result = this
                    .post_json(
                        "/getTaskResult",
                        json!({ "clientKey": this.api_key, "taskId": task_id }),
                    )
                    .await?;
                match result.get("status").and_then(Value::as_str) {
                    Some("ready") => {
                        let token = result
                            .pointer("/solution/token")
                            .and_then(Value::as_str)
                            .ok_or_else(|| CaptchaError::Provider {
                                message: "capmonster: ready result without token".to_string(),
                            })?;
                        Ok(Poll::Ready(token.to_string()))
                    }
                    Some("processing") => Ok(Poll::Pending),
                    other => Err(CaptchaError::Provider {
                        message: format!(
                            "capmonster getTaskResult: unexpected status {:?}",
                            other
                        ),
                    }),
                }
            },
        )
        .await
    }
}

pub struct TwoCaptcha {
    http: Client,
    api_key: String,
    proxy: Option<String>,
}

impl TwoCaptcha {
    pub fn new(api_key: String, proxy: Option<String>) -> Self {
        Self {
            http: Client::new(),
            api_key,
            proxy,
        }
    }
}

/// 2Captcha wants the proxy without its scheme, plus a separate type field.
fn split_proxy_param(proxy: &str) -> (String, &'static str) {
    if let Some(rest) = proxy.strip_prefix("socks5://") {
        (rest.to_string(), "SOCKS5")
    } else if let Some(rest) = proxy.strip_prefix("https://") {
        (rest.to_string(), "HTTP")
    } else if let Some(rest) = proxy.strip_prefix("http://") {
        (rest.to_string(), "HTTP")
    } else {
        (proxy.to_string(), "HTTP")
    }
}

#[async_trait]
impl CaptchaSolver for TwoCaptcha {
    async fn solve_turnstile(
        &self,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, CaptchaError> {
        let mut params = vec![
            ("key", self.api_key.clone()),
            ("method", "turnstile".to_string()),
            ("sitekey", site_key.to_string()),
            ("pageurl", page_url.to_string()),
            ("json", "1".to_string()),
        ];
        if let Some(proxy) = &self.proxy {
            let (stripped, kind) = split_proxy_param(proxy);
            params.push(("proxy", stripped));
            params.push(("proxytype", kind.to_string()));
        }

        let submitted: Value = self
            .http
            .get(format!("{}/in.php", TWOCAPTCHA_BASE))
            .query(&params)
            .send()
            .await
            .map_err(|e| CaptchaError::Transport {
                message: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| CaptchaError::Transport {
                message: e.to_string(),
            })?;

        if submitted.get("status").and_then(Value::as_i64) != Some(1) {
            let reason = submitted
                .get("request")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(CaptchaError::Provider {
                message: format!("2captcha in.php: {}", reason),
            });
        }
        let request_id = submitted
            .get("request")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let http = &self.http;
        let api_key = self.api_key.as_str();
        let request_id = request_id.as_str();
        poll_until_ready(
            Duration::from_secs(10),
            Duration::from_secs(3),
            30,
            move || async move {
                let result = http
                    .get(format!("{}/res.php", TWOCAPTCHA_BASE))
                    .query(&[
                        ("key", api_key),
                        ("action", "get"),
                        ("id", request_id),
                        ("json", "1"),
                    ])
                    .send()
                    .await;

                // Transient poll failures retry against the attempt budget.
                let result: Value = match result {
                    Ok(r) => match r.json().await {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(error = %e, "2captcha poll returned bad body");
                            return Ok(Poll::Pending);
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "2captcha poll failed");
                        return Ok(Poll::Pending);
                    }
                };

                if result.get("status").and_then(Value::as_i64) == Some(1) {
                    let token = result
                        .get("request")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    return Ok(Poll::Ready(token.to_string()));
                }
                match result.get("request").and_then(Value::as_str) {
                    Some("CAPCHA_NOT_READY") => Ok(Poll::Pending),
                    Some(err) if err.starts_with("ERROR") => Err(CaptchaError::Provider {
                        message: format!("2captcha res.php: {}", err),
                    }),
                    other => Err(CaptchaError::Provider {
                        message: format!("2captcha res.php: unexpected reply {:?}", other),
                    }),
                }
            },
        )
        .await
    }
}

/// Builds the configured solver. The proxy is only forwarded to 2Captcha,
/// which solves through it; CapMonster tasks are proxyless.
pub fn make_solver(
    provider: CaptchaProvider,
    api_key: String,
    proxy: Option<String>,
) -> Box<dyn CaptchaSolver> {
    match provider {
        CaptchaProvider::CapMonster => Box::new(CapMonster::new(api_key)),
        CaptchaProvider::TwoCaptcha => Box::new(TwoCaptcha::new(api_key, proxy)),
    }
}

/// Reads the provider API key from a one-line key file.
pub fn load_api_key(path: impl AsRef<Path>) -> Result<String, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            ConfigError::IoError {
                path: path.display().to_string(),
                msg: e.to_string(),
            }
        }
    })?;
    raw.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: path.display().to_string(),
            reason: "no API key line found".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn poll_returns_token_when_ready() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let token = poll_until_ready(Duration::ZERO, Duration::ZERO, 10, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(Poll::Pending)
            } else {
                Ok(Poll::Ready("tok".to_string()))
            }
        })
        .await
        .unwrap();
        assert_eq!(token, "tok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_times_out_after_attempt_budget() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let err = poll_until_ready(Duration::ZERO, Duration::ZERO, 4, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Poll::Pending)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CaptchaError::Timeout { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn poll_propagates_provider_errors() {
        let err = poll_until_ready(Duration::ZERO, Duration::ZERO, 10, || async {
            Err::<Poll, _>(CaptchaError::Provider {
                message: "boom".to_string(),
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CaptchaError::Provider { .. }));
    }

    #[test]
    fn create_task_error_includes_description() {
        let reply = serde_json::json!({
            "errorId": 1,
            "errorCode": "ERROR_ZERO_BALANCE",
            "errorDescription": "Account has zero balance",
        });
        assert_eq!(
            create_task_error(&reply),
            "ERROR_ZERO_BALANCE: Account has zero balance"
        );

        let bare = serde_json::json!({ "errorId": 1, "errorCode": "ERROR_KEY" });
        assert_eq!(create_task_error(&bare), "ERROR_KEY");
        assert_eq!(create_task_error(&serde_json::json!({})), "unknown error");
    }

    #[test]
    fn proxy_param_drops_scheme() {
        assert_eq!(
            split_proxy_param("http://user:pw@1.2.3.4:8080"),
            ("user:pw@1.2.3.4:8080".to_string(), "HTTP")
        );
        assert_eq!(
            split_proxy_param("socks5://1.2.3.4:1080"),
            ("1.2.3.4:1080".to_string(), "SOCKS5")
        );
    }

    #[test]
    fn api_key_file_skips_blank_and_comment_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, "# provider key\n\n  abc123  \n").unwrap();
        assert_eq!(load_api_key(&path).unwrap(), "abc123");
    }

    #[test]
    fn empty_key_file_is_an_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, "\n# nothing\n").unwrap();
        assert!(matches!(
            load_api_key(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_key_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-key.txt");
        assert!(matches!(
            load_api_key(&path),
            Err(ConfigError::FileNotFound { .. })
        ));
    }
}
