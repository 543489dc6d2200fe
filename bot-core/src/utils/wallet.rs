use crate::error::WalletError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Loads raw private keys for the farming loop.
///
/// Sources, in order: `PRIVATE_KEY_*` environment variables (the `.env` file
/// is loaded by the binaries before this runs), then a `pv.txt` fallback with
/// one key per line. Keys stay wrapped in [`Zeroizing`] so they are wiped
/// when dropped.
pub struct WalletManager;

impl WalletManager {
    const ENV_PREFIX: &'static str = "PRIVATE_KEY_";
    const PV_FILE: &'static str = "pv.txt";

    pub fn load_keys() -> Result<Vec<Zeroizing<String>>, WalletError> {
        let mut entries: Vec<(String, String)> = std::env::vars()
            .filter(|(k, v)| k.starts_with(Self::ENV_PREFIX) && !v.trim().is_empty())
            .collect();
        // Stable wallet order across runs
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut keys: Vec<Zeroizing<String>> = entries
            .into_iter()
            .map(|(_, v)| Zeroizing::new(v.trim().to_string()))
            .collect();

        if keys.is_empty() {
            let pv_path = Path::new(Self::PV_FILE);
            if pv_path.exists() {
                let content =
                    fs::read_to_string(pv_path).map_err(|e| WalletError::Store {
                        path: Self::PV_FILE.to_string(),
                        msg: e.to_string(),
                    })?;
                for line in content.lines() {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        keys.push(Zeroizing::new(trimmed.to_string()));
                    }
                }
            }
        }

        if keys.is_empty() {
            return Err(WalletError::NoWallets);
        }
        Ok(keys)
    }
}

/// One entry of the persisted `wallets.json` array.
///
/// Field names mirror the on-disk format: `address`, `privateKey`,
/// `sessionId`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: String,
    pub private_key: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("address", &self.address)
            .field("private_key", &"***REDACTED***")
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Append-only store of created wallets.
///
/// The file holds a JSON array. Appending is read-modify-write; existing
/// entries are never rewritten or deduplicated. Safe only because the
/// process is single-threaded and sequential.
pub struct WalletStore {
    path: PathBuf,
}

impl WalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all stored records. A missing file yields an empty list.
    pub fn load(&self) -> Result<Vec<WalletRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid wallet store {}", self.path.display()))
    }

    /// Appends one record, preserving everything already stored.
    pub fn append(&self, record: WalletRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
