// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into a
//! typed [`AppConfig`]. Any missing or malformed variable is a
//! [`ConfigError`] and the server refuses to start.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `sale.redb` | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `SOLANA_RPC_URL` | Solana JSON-RPC endpoint (http/https) | Required |
//! | `SALE_TOKEN_MINT` | Mint of the token being sold | Required |
//! | `TREASURY_WALLET` | Wallet receiving payments and holding the allocation | Required |
//! | `USDC_MINT` | USDC mint | Mainnet USDC |
//! | `CROWDFUNDING_WALLET` | Owner of campaign vaults | `TREASURY_WALLET` |
//! | `SALE_TOKEN_DECIMALS` | Sale token decimals, skips the mint read | Read from chain |
//! | `SALE_PHASES_PATH` | JSON file with the phase schedule | Built-in schedule |
//! | `PAYMENT_TOKENS_PER_UNIT` | Sale tokens per SOL/USDC on `/payments` | `1000` |
//! | `RPC_TIMEOUT_MS` | Per-attempt ledger timeout | `5000` |
//! | `RPC_MAX_ATTEMPTS` | Ledger attempts per operation | `3` |
//! | `BUILD_TIMEOUT_MS` | Bound on a whole transaction build | `15000` |
//! | `CONFIRMATION_TIMEOUT_SECS` | Unseen signature becomes `failed` | `90` |
//! | `CONFIRMATION_POLL_INTERVAL_SECS` | Background poller interval | `5` |
//! | `CONFIRMATION_RETENTION_SECS` | Retention of settled records | `3600` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use url::Url;

use crate::blockchain::USDC_MAINNET_MINT;
use crate::sale::amount::Amount;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const SOLANA_RPC_URL_ENV: &str = "SOLANA_RPC_URL";
pub const SALE_TOKEN_MINT_ENV: &str = "SALE_TOKEN_MINT";
pub const TREASURY_WALLET_ENV: &str = "TREASURY_WALLET";
pub const USDC_MINT_ENV: &str = "USDC_MINT";
pub const CROWDFUNDING_WALLET_ENV: &str = "CROWDFUNDING_WALLET";
pub const SALE_TOKEN_DECIMALS_ENV: &str = "SALE_TOKEN_DECIMALS";
pub const SALE_PHASES_PATH_ENV: &str = "SALE_PHASES_PATH";
pub const PAYMENT_TOKENS_PER_UNIT_ENV: &str = "PAYMENT_TOKENS_PER_UNIT";
pub const RPC_TIMEOUT_MS_ENV: &str = "RPC_TIMEOUT_MS";
pub const RPC_MAX_ATTEMPTS_ENV: &str = "RPC_MAX_ATTEMPTS";
pub const BUILD_TIMEOUT_MS_ENV: &str = "BUILD_TIMEOUT_MS";
pub const CONFIRMATION_TIMEOUT_SECS_ENV: &str = "CONFIRMATION_TIMEOUT_SECS";
pub const CONFIRMATION_POLL_INTERVAL_SECS_ENV: &str = "CONFIRMATION_POLL_INTERVAL_SECS";
pub const CONFIRMATION_RETENTION_SECS_ENV: &str = "CONFIRMATION_RETENTION_SECS";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Ledger and timing settings.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: Url,
    pub rpc_timeout: Duration,
    pub rpc_max_attempts: u32,
    pub build_timeout: Duration,
}

/// On-chain addresses and token economics.
#[derive(Debug, Clone)]
pub struct SaleConfig {
    pub sale_mint: Pubkey,
    pub treasury: Pubkey,
    pub usdc_mint: Pubkey,
    pub crowdfunding_wallet: Pubkey,
    pub sale_decimals: Option<u8>,
    pub phases_path: Option<PathBuf>,
    pub payment_tokens_per_unit: Amount,
}

#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    pub timeout: chrono::Duration,
    pub poll_interval: Duration,
    pub retention: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub ledger: LedgerConfig,
    pub sale: SaleConfig,
    pub confirmation: ConfirmationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| invalid(HOST_ENV, e))?;

        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(invalid(LOG_FORMAT_ENV, format!("expected json or pretty, got {other}")))
            }
        };

        let rpc_url = required(&get, SOLANA_RPC_URL_ENV)?;
        let rpc_url = Url::parse(&rpc_url).map_err(|e| invalid(SOLANA_RPC_URL_ENV, e))?;
        if !matches!(rpc_url.scheme(), "http" | "https") {
            return Err(invalid(SOLANA_RPC_URL_ENV, "scheme must be http or https"));
        }

        let rpc_max_attempts: u32 = parse_or(&get, RPC_MAX_ATTEMPTS_ENV, 3)?;
        if rpc_max_attempts == 0 {
            return Err(invalid(RPC_MAX_ATTEMPTS_ENV, "must be at least 1"));
        }
        let ledger = LedgerConfig {
            rpc_url,
            rpc_timeout: Duration::from_millis(positive(&get, RPC_TIMEOUT_MS_ENV, 5_000)?),
            rpc_max_attempts,
            build_timeout: Duration::from_millis(positive(&get, BUILD_TIMEOUT_MS_ENV, 15_000)?),
        };

        let treasury = parse_required::<Pubkey, _>(&get, TREASURY_WALLET_ENV)?;
        let sale_decimals = match get(SALE_TOKEN_DECIMALS_ENV) {
            Some(raw) => {
                let decimals = raw.parse::<u8>().map_err(|e| invalid(SALE_TOKEN_DECIMALS_ENV, e))?;
                if decimals > 9 {
                    return Err(invalid(SALE_TOKEN_DECIMALS_ENV, "must be at most 9"));
                }
                Some(decimals)
            }
            None => None,
        };
        let payment_tokens_per_unit = match get(PAYMENT_TOKENS_PER_UNIT_ENV) {
            Some(raw) => Amount::parse(&raw).map_err(|e| invalid(PAYMENT_TOKENS_PER_UNIT_ENV, e))?,
            None => Amount::from_whole(1000),
        };
        if payment_tokens_per_unit.is_zero() {
            return Err(invalid(PAYMENT_TOKENS_PER_UNIT_ENV, "must be positive"));
        }
        let sale = SaleConfig {
            sale_mint: parse_required(&get, SALE_TOKEN_MINT_ENV)?,
            treasury,
            usdc_mint: match get(USDC_MINT_ENV) {
                Some(raw) => raw.parse::<Pubkey>().map_err(|e| invalid(USDC_MINT_ENV, e))?,
                None => Pubkey::from_str(USDC_MAINNET_MINT).map_err(|e| invalid(USDC_MINT_ENV, e))?,
            },
            crowdfunding_wallet: match get(CROWDFUNDING_WALLET_ENV) {
                Some(raw) => raw.parse::<Pubkey>().map_err(|e| invalid(CROWDFUNDING_WALLET_ENV, e))?,
                None => treasury,
            },
            sale_decimals,
            phases_path: get(SALE_PHASES_PATH_ENV).map(PathBuf::from),
            payment_tokens_per_unit,
        };

        let timeout_secs = positive(&get, CONFIRMATION_TIMEOUT_SECS_ENV, 90)?;
        let retention_secs = positive(&get, CONFIRMATION_RETENTION_SECS_ENV, 3_600)?;
        let confirmation = ConfirmationConfig {
            timeout: chrono::Duration::seconds(to_i64(CONFIRMATION_TIMEOUT_SECS_ENV, timeout_secs)?),
            poll_interval: Duration::from_secs(positive(&get, CONFIRMATION_POLL_INTERVAL_SECS_ENV, 5)?),
            retention: chrono::Duration::seconds(to_i64(CONFIRMATION_RETENTION_SECS_ENV, retention_secs)?),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            log_format,
            ledger,
            sale,
            confirmation,
        })
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn required<G>(get: &G, name: &'static str) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(name).ok_or(ConfigError::Missing(name))
}

fn parse_required<T, G>(get: &G, name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    G: Fn(&str) -> Option<String>,
{
    required(get, name)?.parse().map_err(|e: T::Err| invalid(name, e))
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(name, e)),
        None => Ok(default),
    }
}

fn positive<G>(get: &G, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, name, default)?;
    if value == 0 {
        return Err(invalid(name, "must be positive"));
    }
    Ok(value)
}

fn to_i64(name: &'static str, value: u64) -> Result<i64, ConfigError> {
    i64::try_from(value).map_err(|e| invalid(name, e))
}
