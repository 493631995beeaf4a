//! Parent origin detection and validation.
//!
//! The widget frame has no authoritative way to learn who hosts it. The
//! resolver tries, in order:
//!
//! 1. the origin of `document.referrer`,
//! 2. direct access to `window.parent.location.origin` (fails cross-origin),
//! 3. the first entry of `location.ancestorOrigins`.
//!
//! A candidate is only accepted if it is an `http(s)` origin, or the literal
//! `"null"` when the frame itself was loaded through `srcDoc`.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Literal origin string browsers report for opaque origins.
pub const NULL_ORIGIN: &str = "null";

/// A validated frame origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Origin {
    /// The opaque `"null"` origin of `srcDoc` and sandboxed frames.
    Null,
    /// A `scheme://host[:port]` origin with an `http` or `https` scheme.
    Tuple(String),
}

impl Origin {
    /// Validates an origin candidate such as `"https://shop.example"`.
    ///
    /// Accepts the literal `"null"` and anything that parses as an `http` or
    /// `https` URL, normalized to its ASCII origin serialization.
    #[must_use]
    pub fn parse_candidate(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        if candidate == NULL_ORIGIN {
            return Some(Self::Null);
        }
        Self::from_url(candidate)
    }

    /// Extracts the origin of a full URL, such as a referrer.
    ///
    /// Returns `None` for anything that is not an `http(s)` URL with a host.
    #[must_use]
    pub fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        Some(Self::Tuple(url.origin().ascii_serialization()))
    }

    /// Returns the serialized origin, `"null"` for [`Origin::Null`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Null => NULL_ORIGIN,
            Self::Tuple(origin) => origin,
        }
    }

    /// Returns `true` for the opaque origin.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not an acceptable origin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid origin: {0}")]
pub struct InvalidOrigin(pub String);

impl TryFrom<String> for Origin {
    type Error = InvalidOrigin;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_candidate(&value).ok_or(InvalidOrigin(value))
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Null => NULL_ORIGIN.to_owned(),
            Origin::Tuple(origin) => origin,
        }
    }
}

/// Failure to read the parent frame's location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAccessError {
    /// The frame has no parent (it is the top-level window).
    #[error("frame has no parent")]
    NoParent,
    /// The browser blocked access across origins.
    #[error("parent location is not accessible: {0}")]
    CrossOrigin(String),
}

/// Read-only view of the browsing context the widget runs in.
pub trait FrameEnvironment {
    /// `document.referrer`, if non-empty.
    fn referrer(&self) -> Option<String>;

    /// `window.parent.location.origin`.
    ///
    /// # Errors
    ///
    /// Fails whenever the parent is cross-origin, which is the common case.
    fn parent_origin(&self) -> Result<String, FrameAccessError>;

    /// `location.ancestorOrigins`, nearest ancestor first. Empty when the
    /// browser does not support it.
    fn ancestor_origins(&self) -> Vec<String>;

    /// The frame's own `location.origin`.
    fn own_origin(&self) -> String;
}

/// Resolves a best-effort origin for the hosting page. Never fails.
///
/// An `http(s)` candidate wins immediately. `"null"` is only kept, as the
/// last resort, when the frame itself runs in `srcDoc` mode.
pub fn resolve_parent_origin<E: FrameEnvironment + ?Sized>(env: &E) -> Option<Origin> {
    let srcdoc = is_srcdoc(env);
    let mut fallback = None;

    let referrer = env
        .referrer()
        .filter(|r| !r.trim().is_empty())
        .and_then(|r| Origin::from_url(&r));
    let direct = env
        .parent_origin()
        .ok()
        .and_then(|o| Origin::parse_candidate(&o));
    let ancestor = env
        .ancestor_origins()
        .first()
        .and_then(|o| Origin::parse_candidate(o));

    for candidate in [referrer, direct, ancestor].into_iter().flatten() {
        match candidate {
            Origin::Tuple(_) => return Some(candidate),
            Origin::Null if srcdoc => fallback = Some(Origin::Null),
            Origin::Null => {}
        }
    }
    fallback
}

/// Whether the frame was loaded through `srcDoc`, i.e. its own origin is
/// the opaque `"null"`.
pub fn is_srcdoc<E: FrameEnvironment + ?Sized>(env: &E) -> bool {
    env.own_origin().trim() == NULL_ORIGIN
}

/// A fixed [`FrameEnvironment`], for hosts outside the browser and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticFrame {
    referrer: Option<String>,
    parent_origin: Option<String>,
    ancestor_origins: Vec<String>,
    own_origin: String,
}

impl StaticFrame {
    /// A frame with the given own origin and no parent information.
    #[must_use]
    pub fn new(own_origin: impl Into<String>) -> Self {
        Self {
            own_origin: own_origin.into(),
            ..Self::default()
        }
    }

    /// A `srcDoc` frame.
    #[must_use]
    pub fn srcdoc() -> Self {
        Self::new(NULL_ORIGIN)
    }

    /// Sets `document.referrer`.
    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Makes the parent location readable (same-origin parent).
    #[must_use]
    pub fn with_parent_origin(mut self, origin: impl Into<String>) -> Self {
        self.parent_origin = Some(origin.into());
        self
    }

    /// Sets `location.ancestorOrigins`.
    #[must_use]
    pub fn with_ancestor_origins<I, T>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ancestor_origins = origins.into_iter().map(Into::into).collect();
        self
    }
}

impl FrameEnvironment for StaticFrame {
    fn referrer(&self) -> Option<String> {
        self.referrer.clone()
    }

    fn parent_origin(&self) -> Result<String, FrameAccessError> {
        self.parent_origin
            .clone()
            .ok_or_else(|| FrameAccessError::CrossOrigin("blocked by the browser".to_owned()))
    }

    fn ancestor_origins(&self) -> Vec<String> {
        self.ancestor_origins.clone()
    }

    fn own_origin(&self) -> String {
        self.own_origin.clone()
    }
}
