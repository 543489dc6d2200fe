use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Normalizes one proxy line to `http://[user:pass@]host:port`.
///
/// Accepted forms:
/// - `scheme://...` (http/https re-normalized, `socks5://` passed through)
/// - `host:port`
/// - `host:port:user:pass`
/// - `user:pass@host:port`
/// - `host:port@user:pass` (malformed but seen in the wild)
///
/// Anything else (including empty lines and `#` comments) yields `None`.
pub fn parse_proxy(line: &str) -> Option<String> {
    let mut proxy = line.trim();
    if proxy.is_empty() || proxy.starts_with('#') {
        return None;
    }

    if proxy.starts_with("socks5://") {
        return Some(proxy.trim_end_matches('/').to_string());
    }

    // Strip an http(s) scheme and re-normalize the rest.
    for scheme in ["http://", "https://"] {
        if let Some(rest) = proxy.strip_prefix(scheme) {
            proxy = rest.trim_end_matches('/');
            break;
        }
    }

    if let Some((left, right)) = proxy.split_once('@') {
        let (l_head, l_tail) = left.split_once(':')?;
        if l_tail.parse::<u16>().is_ok() {
            // host:port@user:pass
            let (user, pass) = right.split_once(':')?;
            if user.is_empty() || pass.is_empty() {
                return None;
            }
            return Some(format!("http://{}:{}@{}:{}", user, pass, l_head, l_tail));
        }
        // user:pass@host:port
        let (host, port) = right.split_once(':')?;
        if l_head.is_empty() || l_tail.is_empty() || host.is_empty() {
            return None;
        }
        port.parse::<u16>().ok()?;
        return Some(format!("http://{}:{}@{}:{}", l_head, l_tail, host, port));
    }

    let parts: Vec<&str> = proxy.split(':').collect();
    match parts.as_slice() {
        [host, port] if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Some(format!("http://{}:{}", host, port))
        }
        [host, port, user, pass]
            if !host.is_empty()
                && port.parse::<u16>().is_ok()
                && !user.is_empty()
                && !pass.is_empty() =>
        {
            Some(format!("http://{}:{}@{}:{}", user, pass, host, port))
        }
        _ => None,
    }
}

/// A fixed set of normalized proxy URLs shared by all wallets.
///
/// The farming loop assigns proxies round-robin via [`ProxyPool::next`];
/// the referral flow picks uniformly at random via [`ProxyPool::pick_random`].
pub struct ProxyPool {
    proxies: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    const PROXY_FILE: &'static str = "proxies.txt";

    /// Loads and normalizes proxies from proxies.txt.
    /// A missing file is not an error: the bot runs without proxies.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::PROXY_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found. Running without proxies.", path.display());
            return Ok(Self::from_lines(std::iter::empty::<&str>()));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pool = Self::from_lines(content.lines());
        info!("Loaded {} proxies from {}", pool.len(), path.display());
        Ok(pool)
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let proxies = lines
            .into_iter()
            .filter_map(|l| parse_proxy(l.as_ref()))
            .collect();
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Deterministic round-robin selection (index modulo pool size).
    pub fn next(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(&self.proxies[idx])
    }

    /// Uniform random selection.
    pub fn pick_random(&self) -> Option<&str> {
        self.proxies
            .choose(&mut rand::thread_rng())
            .map(|s| s.as_str())
    }
}
