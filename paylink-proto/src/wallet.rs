//! Wallet metadata pushed into the widget by its host page.
//!
//! The host decides which wallets to advertise, so the list is attacker
//! influenceable. [`sanitize_wallets`] is the only way to obtain a
//! [`WalletInfo`]: it drops entries without a usable name and replaces any
//! icon outside the URL allowlist with [`FALLBACK_WALLET_ICON`].

use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Neutral wallet glyph used when a host-provided icon is not acceptable.
pub const FALLBACK_WALLET_ICON: &str = "data:image/svg+xml,%3Csvg%20xmlns%3D%27http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%27%20viewBox%3D%270%200%2024%2024%27%3E%3Crect%20width%3D%2724%27%20height%3D%2724%27%20rx%3D%276%27%20fill%3D%27%23E5E7EB%27%2F%3E%3Cpath%20d%3D%27M6%209h12v8H6z%27%20fill%3D%27%239CA3AF%27%2F%3E%3C%2Fsvg%3E";

/// MIME types accepted for `data:` icons.
const ALLOWED_DATA_ICON_TYPES: &[&str] = &[
    "image/png",
    "image/jpg",
    "image/jpeg",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    "image/bmp",
    "image/ico",
];

/// A wallet the host page can connect on the widget's behalf.
///
/// Fields are private: values only come out of [`sanitize_wallets`], which
/// guarantees a non-empty name and an icon that is either absent or allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    connectable: Option<bool>,
}

impl WalletInfo {
    /// Display name, trimmed and never empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Icon URL: an `https:` URL, an allowed `data:` image, or the fallback.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Whether the wallet extension is installed in the host browser.
    #[must_use]
    pub const fn installed(&self) -> bool {
        self.installed
    }

    /// Whether the host can connect this wallet, when it says so.
    #[must_use]
    pub const fn connectable(&self) -> Option<bool> {
        self.connectable
    }
}

/// Sanitizes a host-provided wallet list.
///
/// Never fails: a non-array input yields an empty list, and malformed entries
/// are skipped individually without affecting the rest of the batch.
#[must_use]
pub fn sanitize_wallets(input: &Value) -> Vec<WalletInfo> {
    let Some(entries) = input.as_array() else {
        return Vec::new();
    };
    entries.iter().filter_map(sanitize_wallet).collect()
}

fn sanitize_wallet(entry: &Value) -> Option<WalletInfo> {
    let obj = entry.as_object()?;
    let name = obj.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let icon = match obj.get("icon") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(sanitize_icon(raw)),
        Some(_) => Some(FALLBACK_WALLET_ICON.to_owned()),
    };

    Some(WalletInfo {
        name: name.to_owned(),
        icon,
        installed: obj.get("installed").and_then(Value::as_bool).unwrap_or(false),
        connectable: obj.get("connectable").and_then(Value::as_bool),
    })
}

/// Returns the icon URL if it passes the allowlist, otherwise the fallback.
///
/// Accepted: `https:` URLs, and `data:` URLs whose MIME type is one of the
/// allowed image types.
#[must_use]
pub fn sanitize_icon(raw: &str) -> String {
    if is_allowed_icon(raw.trim()) {
        raw.trim().to_owned()
    } else {
        FALLBACK_WALLET_ICON.to_owned()
    }
}

fn is_allowed_icon(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    match url.scheme() {
        "https" => url.host_str().is_some_and(|host| !host.is_empty()),
        "data" => data_url_mime(url.path()).is_some_and(|mime| {
            ALLOWED_DATA_ICON_TYPES
                .iter()
                .any(|allowed| mime.eq_ignore_ascii_case(allowed))
        }),
        _ => false,
    }
}

/// Extracts the MIME type of a `data:` URL body (`<mime>[;params],<data>`).
fn data_url_mime(body: &str) -> Option<&str> {
    let (header, _) = body.split_once(',')?;
    let mime = header.split(';').next()?.trim();
    (!mime.is_empty()).then_some(mime)
}
