//! # Bot Core - Shared Utilities for the BlockStreet Bot
//!
//! This crate provides the pieces shared between the farming binary and the
//! referral binary: configuration types, typed errors, proxy handling, wallet
//! loading/persistence, delay helpers and logging setup.
//!
//! ## Modules
//!
//! - [`config`] - Run configuration structures (delays, cycle plan, amounts)
//! - [`error`] - Typed error handling with thiserror
//! - [`traits`] - Task result type shared by all action implementations
//! - [`utils`] - Utility modules (proxy pool, wallet manager, delays, logger)

pub mod config;
pub mod error;
pub mod traits;
pub(crate) mod utils;

pub use config::{AmountRange, CyclePlan, Delays};
pub use error::{ApiError, CaptchaError, ConfigError, LoginError, WalletError};
pub use traits::TaskResult;

// Utils are pub(crate) - only export specific public utilities
pub use utils::delay::{countdown, random_delay, sleep_ms};
pub use utils::logger::setup_logger;
pub use utils::proxy::{parse_proxy, ProxyPool};
pub use utils::wallet::{WalletManager, WalletRecord, WalletStore};
