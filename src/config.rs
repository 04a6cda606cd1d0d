//! Runtime configuration.
//!
//! Priority: CLI args > environment variables > config file > defaults.
//! Required settings that are absent fail fast with a descriptive
//! `ConfigurationMissing` instead of surfacing later as an opaque network
//! error.

use crate::abi;
use crate::error::ClientError;
use crate::feed::POSTS_PER_PAGE;
use crate::pinning::DEFAULT_GATEWAY;
use crate::types::Address;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
pub struct CliArgs {
    /// Chain RPC endpoint URL
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Chain id used in cache keys and transaction context
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Social-graph contract address
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// Wallet account to connect at startup
    #[arg(long, env = "WALLET_ADDRESS")]
    pub wallet_address: Option<String>,

    /// Pinning-service credential (JWT)
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pub pinata_jwt: Option<String>,

    /// Pinning gateway host for content retrieval
    #[arg(long, env = "PINATA_GATEWAY")]
    pub pinata_gateway: Option<String>,

    /// RPC request timeout in milliseconds (1000-60000)
    #[arg(long, env = "RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,

    /// Cache freshness window in milliseconds (0 disables reuse)
    #[arg(long, env = "CACHE_TTL_MS")]
    pub cache_ttl_ms: Option<u64>,

    /// Receipt polling interval in milliseconds (100-10000)
    #[arg(long, env = "RECEIPT_POLL_MS")]
    pub receipt_poll_ms: Option<u64>,

    /// Posts per feed page (1-100)
    #[arg(long, env = "POSTS_PER_PAGE")]
    pub posts_per_page: Option<usize>,

    /// Concurrent post-detail fetches per page load (1-16)
    #[arg(long, env = "FETCH_CONCURRENCY")]
    pub fetch_concurrency: Option<usize>,

    /// Timeout for metadata fetches and content-type probes (ms)
    #[arg(long, env = "MEDIA_TIMEOUT_MS")]
    pub media_timeout_ms: Option<u64>,

    /// Optional TOML config file
    #[arg(long, env = "SOCIALCHAIN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Optional file layer, same field names as the CLI flags.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct FileConfig {
    rpc_url: Option<String>,
    chain_id: Option<u64>,
    contract_address: Option<String>,
    wallet_address: Option<String>,
    pinata_jwt: Option<String>,
    pinata_gateway: Option<String>,
    rpc_timeout_ms: Option<u64>,
    cache_ttl_ms: Option<u64>,
    receipt_poll_ms: Option<u64>,
    posts_per_page: Option<usize>,
    fetch_concurrency: Option<usize>,
    media_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub wallet_address: Option<Address>,
    pub pinata_jwt: Option<String>,
    pub pinata_gateway: String,
    pub rpc_timeout_ms: u64,
    pub cache_ttl_ms: u64,
    pub receipt_poll_ms: u64,
    pub posts_per_page: usize,
    pub fetch_concurrency: usize,
    pub media_timeout_ms: u64,
}

impl Default for Config {
    /// Local development defaults: an Anvil node and the fixed contract
    /// deployment.
    fn default() -> Self {
        Config {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            contract_address: Address::parse(abi::CONTRACT_ADDRESS).expect("contract address"),
            wallet_address: None,
            pinata_jwt: None,
            pinata_gateway: DEFAULT_GATEWAY.to_string(),
            rpc_timeout_ms: 8000,
            cache_ttl_ms: 30_000,
            receipt_poll_ms: 500,
            posts_per_page: POSTS_PER_PAGE,
            fetch_concurrency: 4,
            media_timeout_ms: 8000,
        }
    }
}

fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T, ClientError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(ClientError::InvalidInput(format!(
            "{name} must be in range [{min}, {max}], got {val}"
        )))
    } else {
        Ok(val)
    }
}

fn validate_url(url: &str, name: &str) -> Result<(), ClientError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ClientError::InvalidInput(format!(
            "{name} must start with http:// or https://"
        )))
    }
}

impl Config {
    /// Merge CLI/env args (clap resolves env fallbacks) over the optional
    /// file layer and defaults, then validate.
    pub fn from_args(args: &CliArgs) -> Result<Self, ClientError> {
        let file = match &args.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ClientError::InvalidInput(format!("cannot read {}: {e}", path.display()))
                })?;
                toml::from_str::<FileConfig>(&raw).map_err(|e| {
                    ClientError::InvalidInput(format!("bad config file {}: {e}", path.display()))
                })?
            }
            None => FileConfig::default(),
        };
        let defaults = Config::default();

        let rpc_url = args
            .rpc_url
            .clone()
            .or(file.rpc_url)
            .ok_or(ClientError::ConfigurationMissing("RPC_URL"))?;
        validate_url(&rpc_url, "RPC_URL")?;

        let contract_address = match args.contract_address.clone().or(file.contract_address) {
            Some(s) => Address::parse(&s)
                .map_err(|e| ClientError::InvalidInput(e.to_string()))?,
            None => defaults.contract_address.clone(),
        };

        let wallet_address = match args.wallet_address.clone().or(file.wallet_address) {
            Some(s) => Some(Address::parse(&s).map_err(|e| ClientError::InvalidInput(e.to_string()))?),
            None => None,
        };

        let rpc_timeout_ms = args
            .rpc_timeout_ms
            .or(file.rpc_timeout_ms)
            .unwrap_or(defaults.rpc_timeout_ms);
        let rpc_timeout_ms = validate_in_range(rpc_timeout_ms, 1000, 60_000, "RPC_TIMEOUT_MS")?;

        let receipt_poll_ms = args
            .receipt_poll_ms
            .or(file.receipt_poll_ms)
            .unwrap_or(defaults.receipt_poll_ms);
        let receipt_poll_ms = validate_in_range(receipt_poll_ms, 100, 10_000, "RECEIPT_POLL_MS")?;

        let posts_per_page = args
            .posts_per_page
            .or(file.posts_per_page)
            .unwrap_or(defaults.posts_per_page);
        let posts_per_page = validate_in_range(posts_per_page, 1, 100, "POSTS_PER_PAGE")?;

        let fetch_concurrency = args
            .fetch_concurrency
            .or(file.fetch_concurrency)
            .unwrap_or(defaults.fetch_concurrency);
        let fetch_concurrency = validate_in_range(fetch_concurrency, 1, 16, "FETCH_CONCURRENCY")?;

        let media_timeout_ms = args
            .media_timeout_ms
            .or(file.media_timeout_ms)
            .unwrap_or(defaults.media_timeout_ms);
        let media_timeout_ms =
            validate_in_range(media_timeout_ms, 1000, 60_000, "MEDIA_TIMEOUT_MS")?;

        Ok(Config {
            rpc_url,
            chain_id: args.chain_id.or(file.chain_id).unwrap_or(defaults.chain_id),
            contract_address,
            wallet_address,
            pinata_jwt: args.pinata_jwt.clone().or(file.pinata_jwt),
            pinata_gateway: args
                .pinata_gateway
                .clone()
                .or(file.pinata_gateway)
                .unwrap_or(defaults.pinata_gateway),
            rpc_timeout_ms,
            cache_ttl_ms: args
                .cache_ttl_ms
                .or(file.cache_ttl_ms)
                .unwrap_or(defaults.cache_ttl_ms),
            receipt_poll_ms,
            posts_per_page,
            fetch_concurrency,
            media_timeout_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rpc_url_is_a_configuration_error() {
        let err = Config::from_args(&CliArgs::default()).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationMissing("RPC_URL")));
    }

    #[test]
    fn args_override_defaults() {
        let args = CliArgs {
            rpc_url: Some("https://rpc.example".into()),
            chain_id: Some(1),
            posts_per_page: Some(25),
            ..CliArgs::default()
        };
        let cfg = Config::from_args(&args).unwrap();
        assert_eq!(cfg.rpc_url, "https://rpc.example");
        assert_eq!(cfg.chain_id, 1);
        assert_eq!(cfg.posts_per_page, 25);
        assert_eq!(cfg.pinata_gateway, DEFAULT_GATEWAY);
    }

    #[test]
    fn bad_url_scheme_is_rejected() {
        let args = CliArgs {
            rpc_url: Some("ftp://rpc.example".into()),
            ..CliArgs::default()
        };
        assert!(matches!(
            Config::from_args(&args),
            Err(ClientError::InvalidInput(_))
        ));
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let args = CliArgs {
            rpc_url: Some("http://127.0.0.1:8545".into()),
            rpc_timeout_ms: Some(10),
            ..CliArgs::default()
        };
        assert!(Config::from_args(&args).is_err());
    }
}
