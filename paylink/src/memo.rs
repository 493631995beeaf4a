//! Correlation memos.
//!
//! A [`Memo`] is attached to every payment request and is the only link
//! between the QR code or connect action the user saw and the transaction
//! that eventually lands on-chain.
//!
//! The memo program logs memos as `"[<len>] <memo>"`, and joins several memos
//! of one transaction with `"; "`. [`normalize_onchain_memo`] undoes both.

use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{RngExt, rng};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix used when none is configured.
pub const DEFAULT_MEMO_PREFIX: &str = "pl";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

static LENGTH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d+\]\s*").expect("valid memo prefix pattern"));

/// A process-unique payment correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memo(String);

impl Memo {
    /// Generates a fresh memo of the form `<prefix>-<seq>-<random hex>`.
    ///
    /// The sequence number makes memos unique within the process, the random
    /// part makes collisions across processes unlikely.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let random: u64 = rng().random();
        Self(format!("{prefix}-{seq}-{random:x}"))
    }

    /// Wraps an existing memo, e.g. one restored from storage.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The memo text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an on-chain memo log contains this memo.
    #[must_use]
    pub fn matches(&self, onchain: &str) -> bool {
        let expected = self.0.trim();
        strip_length_prefix(onchain) == expected
            || normalize_onchain_memo(onchain).any(|memo| memo == expected)
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits an on-chain memo log into the individual memos it carries, with
/// length prefixes and surrounding whitespace removed.
pub fn normalize_onchain_memo(raw: &str) -> impl Iterator<Item = &str> {
    raw.split("; ")
        .map(strip_length_prefix)
        .filter(|memo| !memo.is_empty())
}

fn strip_length_prefix(raw: &str) -> &str {
    let raw = raw.trim();
    LENGTH_PREFIX
        .find(raw)
        .map_or(raw, |m| &raw[m.end()..])
        .trim()
}
