//! Program ids and the built-in currency table.
//!
//! Payments are accepted in SOL and in a few dollar stablecoins. Each token
//! entry records its mint and the token program that owns it, since the
//! associated token account depends on both.

use paylink::CurrencySpec;
use solana_pubkey::{Pubkey, pubkey};

use crate::chain::{Address, Cluster};

/// The associated token account program.
pub const ATA_PROGRAM: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// The classic SPL Token program.
pub const TOKEN_PROGRAM: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// The Token-2022 program.
pub const TOKEN_2022_PROGRAM: Pubkey = pubkey!("TokenzQdBNbLqP5VveNzL2BZ6XfT2C4VtsWtVjL9c3Cm");

/// Decimals of native SOL (lamports).
pub const SOL_DECIMALS: u32 = 9;

/// Program owning a token mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenProgram {
    /// SPL Token.
    Spl,
    /// Token-2022.
    Token2022,
}

impl TokenProgram {
    /// The program id.
    #[must_use]
    pub const fn id(&self) -> Pubkey {
        match self {
            Self::Spl => TOKEN_PROGRAM,
            Self::Token2022 => TOKEN_2022_PROGRAM,
        }
    }
}

/// A currency accepted on a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Cluster the entry applies to.
    pub cluster: Cluster,
    /// Decimal precision.
    pub decimals: u32,
    /// Mint and owning program, `None` for SOL.
    pub token: Option<(Address, TokenProgram)>,
}

const fn native(cluster: Cluster) -> Currency {
    Currency {
        symbol: "SOL",
        cluster,
        decimals: SOL_DECIMALS,
        token: None,
    }
}

const fn token(
    symbol: &'static str,
    cluster: Cluster,
    mint: Pubkey,
    program: TokenProgram,
) -> Currency {
    Currency {
        symbol,
        cluster,
        decimals: 6,
        token: Some((Address::new(mint), program)),
    }
}

static CURRENCIES: &[Currency] = &[
    native(Cluster::Mainnet),
    native(Cluster::Devnet),
    token(
        "USDC",
        Cluster::Mainnet,
        pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
        TokenProgram::Spl,
    ),
    token(
        "USDC",
        Cluster::Devnet,
        pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
        TokenProgram::Spl,
    ),
    token(
        "USDT",
        Cluster::Mainnet,
        pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
        TokenProgram::Spl,
    ),
    token(
        "PYUSD",
        Cluster::Mainnet,
        pubkey!("2b1kV6DkPAnxd5ixfnxCpjxmKwqjjaYmCZfHsFu24GXo"),
        TokenProgram::Token2022,
    ),
];

impl Currency {
    /// Looks up `symbol` (case-insensitive) on `cluster`.
    #[must_use]
    pub fn lookup(cluster: Cluster, symbol: &str) -> Option<&'static Self> {
        let symbol = symbol.trim();
        CURRENCIES
            .iter()
            .find(|c| c.cluster == cluster && c.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Every currency known on `cluster`.
    pub fn all(cluster: Cluster) -> impl Iterator<Item = &'static Self> {
        CURRENCIES.iter().filter(move |c| c.cluster == cluster)
    }

    /// The token mint, `None` for SOL.
    #[must_use]
    pub fn mint(&self) -> Option<Address> {
        self.token.map(|(mint, _)| mint)
    }

    /// Whether this is the native asset.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        self.token.is_none()
    }
}

/// Builds the chain-agnostic view of a currency. `mint` must outlive it.
pub(crate) fn currency_spec<'a>(currency: &'a Currency, mint: Option<&'a str>) -> CurrencySpec<'a> {
    CurrencySpec {
        symbol: currency.symbol,
        decimals: currency.decimals,
        mint,
    }
}
