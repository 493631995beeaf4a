//! Watcher configuration.
//!
//! Settings come from a TOML file, then from command-line flags (which also
//! read their environment variables). String values in the file may reference
//! the environment with `$VAR` or `${VAR}`.
//!
//! # Example Configuration
//!
//! ```toml
//! cluster = "devnet"
//! rpc_url = "$SOLANA_RPC_URL"
//! recipient = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"
//! currency = "USDC"
//! label = "Coffee Shop"
//!
//! [poll]
//! grace_delay_ms = 3000
//! interval_ms = 2000
//! max_attempts = 90
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG`: path to the configuration file (default: `paylink.toml`)
//! - `PAYLINK_RECIPIENT`: overrides the recipient address
//! - `PAYLINK_CLUSTER`: overrides the cluster
//! - `SOLANA_RPC_URL`: overrides the RPC endpoint

use std::path::{Path, PathBuf};

use clap::Parser;
use paylink::PollConfig;
use paylink::memo::DEFAULT_MEMO_PREFIX;
use paylink_svm::Cluster;
use serde::Deserialize;

use crate::error::ConfigError;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "paylink-watch")]
#[command(about = "Build a Solana payment request and wait for it to confirm")]
pub struct WatchArgs {
    /// Amount in major units, e.g. `10.50`.
    pub amount: String,

    /// Path to the TOML configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "paylink.toml")]
    pub config: PathBuf,

    /// Address receiving the payment.
    #[arg(long, env = "PAYLINK_RECIPIENT")]
    pub recipient: Option<String>,

    /// Currency symbol, e.g. `USDC` or `SOL`.
    #[arg(long)]
    pub currency: Option<String>,

    /// `mainnet` or `devnet`.
    #[arg(long, env = "PAYLINK_CLUSTER")]
    pub cluster: Option<Cluster>,

    /// RPC endpoint; defaults to the cluster's public node.
    #[arg(long, env = "SOLANA_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Merchant label shown by wallets.
    #[arg(long)]
    pub label: Option<String>,

    /// Overrides `poll.max_attempts`.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

/// Resolved watcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchConfig {
    /// Cluster the payment is made on.
    #[serde(default)]
    pub cluster: Cluster,

    /// RPC endpoint. Falls back to the cluster default when unset.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Address receiving the payment.
    #[serde(default)]
    pub recipient: Option<String>,

    /// Currency symbol (default: `USDC`).
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Prefix of generated memos.
    #[serde(default = "default_memo_prefix")]
    pub memo_prefix: String,

    /// Merchant label shown by wallets.
    #[serde(default)]
    pub label: Option<String>,

    /// Message shown by wallets.
    #[serde(default)]
    pub message: Option<String>,

    /// Confirmation polling parameters.
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_currency() -> String {
    "USDC".to_owned()
}

fn default_memo_prefix() -> String {
    DEFAULT_MEMO_PREFIX.to_owned()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::default(),
            rpc_url: None,
            recipient: None,
            currency: default_currency(),
            memo_prefix: default_memo_prefix(),
            label: None,
            message: None,
            poll: PollConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Loads the file at `path` with environment references expanded.
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&expand_env_vars(&content))
    }

    /// Parses already expanded TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_args(mut self, args: &WatchArgs) -> Self {
        if let Some(cluster) = args.cluster {
            self.cluster = cluster;
        }
        if let Some(url) = &args.rpc_url {
            self.rpc_url = Some(url.clone());
        }
        if let Some(recipient) = &args.recipient {
            self.recipient = Some(recipient.clone());
        }
        if let Some(currency) = &args.currency {
            self.currency.clone_from(currency);
        }
        if let Some(label) = &args.label {
            self.label = Some(label.clone());
        }
        if let Some(max_attempts) = args.max_attempts {
            self.poll.max_attempts = max_attempts;
        }
        self
    }

    /// The configured endpoint, or the cluster's public one.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .filter(|url| !url.trim().is_empty() && !url.starts_with('$'))
            .unwrap_or_else(|| self.cluster.default_rpc_url())
    }

    /// The recipient, required to build a request.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingRecipient`] if neither the file nor the flags
    /// set one, or if it is an unresolved `$VAR`.
    pub fn recipient(&self) -> Result<&str, ConfigError> {
        self.recipient
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty() && !r.starts_with('$'))
            .ok_or(ConfigError::MissingRecipient)
    }
}

/// Expands `$VAR` and `${VAR}` from the process environment.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name) {
            Some(value) if !name.is_empty() => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "RPC" => Some("https://rpc.example".to_owned()),
            "WHO" => Some("merchant".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_env_vars() {
        assert_eq!(expand_with("url = \"$RPC\"", lookup), "url = \"https://rpc.example\"");
        assert_eq!(expand_with("${WHO}_1", lookup), "merchant_1");
        assert_eq!(expand_with("$WHO-x", lookup), "merchant-x");
        assert_eq!(expand_with("$MISSING and ${GONE}", lookup), "$MISSING and ${GONE}");
        assert_eq!(expand_with("cost: 5$", lookup), "cost: 5$");
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config = WatchConfig::from_toml("").unwrap();
        assert_eq!(config, WatchConfig::default());
        assert_eq!(config.cluster, Cluster::Mainnet);
        assert_eq!(config.currency, "USDC");
        assert_eq!(config.memo_prefix, "pl");
        assert_eq!(config.rpc_url(), Cluster::Mainnet.default_rpc_url());
        assert!(matches!(config.recipient(), Err(ConfigError::MissingRecipient)));
    }

    #[test]
    fn test_parse_full_file() {
        let config = WatchConfig::from_toml(
            r#"
            cluster = "devnet"
            rpc_url = "https://rpc.example"
            recipient = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"
            currency = "SOL"
            memo_prefix = "shop"

            [poll]
            interval_ms = 500
            max_attempts = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.rpc_url(), "https://rpc.example");
        assert_eq!(
            config.recipient().unwrap(),
            "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"
        );
        assert_eq!(config.poll.interval, Duration::from_millis(500));
        assert_eq!(config.poll.max_attempts, 4);
        assert_eq!(config.poll.grace_delay, PollConfig::default().grace_delay);
    }

    #[test]
    fn test_unresolved_values_fall_back() {
        let config = WatchConfig::from_toml(
            r#"
            rpc_url = "$SOLANA_RPC_URL"
            recipient = "${PAYLINK_RECIPIENT}"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_url(), Cluster::Mainnet.default_rpc_url());
        assert!(matches!(config.recipient(), Err(ConfigError::MissingRecipient)));
    }

    #[test]
    fn test_args_override_file() {
        let args = WatchArgs::try_parse_from([
            "paylink-watch",
            "2.5",
            "--cluster",
            "devnet",
            "--currency",
            "sol",
            "--recipient",
            "merchant",
            "--max-attempts",
            "7",
        ])
        .unwrap();
        let config = WatchConfig::from_toml("currency = \"USDT\"\nlabel = \"Shop\"")
            .unwrap()
            .with_args(&args);
        assert_eq!(args.amount, "2.5");
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.currency, "sol");
        assert_eq!(config.recipient().unwrap(), "merchant");
        assert_eq!(config.label.as_deref(), Some("Shop"));
        assert_eq!(config.poll.max_attempts, 7);
    }

    #[test]
    fn test_rejects_malformed_file() {
        assert!(matches!(
            WatchConfig::from_toml("cluster = \"testnet\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
