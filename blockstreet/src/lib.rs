//! # BlockStreet Bot
//!
//! Drives the BlockStreet REST API on behalf of many Ethereum wallets:
//! sign-in-with-Ethereum login behind a Turnstile captcha, then scripted
//! swap/supply/withdraw/borrow/repay activity. Wallets are processed strictly
//! one at a time; every per-wallet and per-action failure is logged and the
//! loop moves on.

pub mod api;
pub mod captcha;
pub mod config;
pub mod runner;
pub mod task;
