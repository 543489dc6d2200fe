//! # Core Error Types
//!
//! Centralized error definitions for the bot.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Errors surfaced by the BlockStreet API client.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// Non-zero `code` in the response envelope, carrying the provider's
    /// `message` (or `msg`) field.
    #[error("api error {code} from {endpoint}: {message}")]
    Application {
        endpoint: String,
        code: i64,
        message: String,
    },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Captcha solving errors.
#[derive(Error, Debug, Clone)]
pub enum CaptchaError {
    #[error("captcha provider error: {message}")]
    Provider { message: String },

    #[error("captcha not solved after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("captcha transport error: {message}")]
    Transport { message: String },
}

/// Sign-in-with-Ethereum login errors.
#[derive(Error, Debug, Clone)]
pub enum LoginError {
    #[error("sign nonce fetch failed")]
    Nonce(#[source] ApiError),

    #[error("message signing failed: {reason}")]
    Signing { reason: String },

    #[error("sign verify rejected")]
    Verify(#[source] ApiError),

    #[error("captcha token is required for login")]
    MissingCaptcha,
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Wallet loading and persistence errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Invalid private key at index {index}: {reason}")]
    InvalidKey { index: usize, reason: String },

    #[error("No valid private keys found (checked PRIVATE_KEY_* env vars and pv.txt)")]
    NoWallets,

    #[error("Wallet store error at '{path}': {msg}")]
    Store { path: String, msg: String },
}
