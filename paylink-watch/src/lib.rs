//! Merchant-side payment watcher.
//!
//! Builds a Solana Pay request, prints what the customer needs to pay it,
//! then polls the recipient's signatures for the request memo until the
//! payment confirms, the attempt budget runs out, or the process is asked to
//! stop.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment expansion and CLI overrides
//! - [`error`]: watcher error types
//! - [`watch`]: the polling loop and its outcome
//! - [`util`]: signal handling

pub mod config;
pub mod error;
pub mod util;
pub mod watch;

pub use config::{WatchArgs, WatchConfig};
pub use error::{ConfigError, WatchError};
pub use watch::{Outcome, watch};
