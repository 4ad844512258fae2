use crate::cipher::EncryptedPayload;
use crate::eviction::{self, Verdict};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// The stored destination of a short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A URL stored as-is.
    Plain(String),
    /// A URL sealed under a caller-supplied passphrase.
    Encrypted(EncryptedPayload),
}

impl Target {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Target::Encrypted(_))
    }
}

/// A stored short link, keyed by its [`ShortCode`](crate::ShortCode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlinkRecord {
    /// Where the link points.
    pub target: Target,
    /// When the record expires, if ever.
    pub expires_at: Option<Timestamp>,
    /// How many more resolutions are allowed, if limited.
    pub uses_remaining: Option<u32>,
}

impl ShortlinkRecord {
    /// Creates an unconstrained record pointing at a plain URL.
    pub fn plain(url: impl Into<String>) -> Self {
        Self {
            target: Target::Plain(url.into()),
            expires_at: None,
            uses_remaining: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: Option<Timestamp>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_uses_remaining(mut self, uses_remaining: Option<u32>) -> Self {
        self.uses_remaining = uses_remaining;
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.target.is_encrypted()
    }

    /// Shorthand for [`eviction::evaluate`].
    pub fn verdict(&self, now: Timestamp) -> Verdict {
        eviction::evaluate(self, now)
    }

    /// Whether the record still blocks its code from being reused.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.verdict(now).is_resolvable()
    }
}
