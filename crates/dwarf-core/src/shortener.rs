use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, Default)]
pub enum ExpirationPolicy {
    /// The shortened URL never expires.
    #[default]
    Never,
    /// The shortened URL expires after a certain duration from now.
    AfterDuration(SignedDuration),
    /// The shortened URL expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

/// Parameters for creating a shortened URL.
///
/// ```
/// use dwarf_core::CreateParams;
///
/// let params = CreateParams::builder()
///     .url("example.com")
///     .code(Some("docs".to_string()))
///     .uses(Some(3))
///     .build();
/// assert_eq!(params.uses, Some(3));
/// ```
#[derive(Clone, TypedBuilder)]
pub struct CreateParams {
    /// The URL to shorten. A missing scheme defaults to `http://`.
    #[builder(setter(into))]
    pub url: String,
    /// Custom code; `None` or an empty string selects auto-allocation.
    #[builder(default)]
    pub code: Option<String>,
    /// The expiration policy for the shortened URL.
    #[builder(default)]
    pub expiration: ExpirationPolicy,
    /// How many times the link may be resolved before it is deleted.
    #[builder(default)]
    pub uses: Option<u32>,
    /// Non-empty passphrases encrypt the stored target.
    #[builder(default)]
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for CreateParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateParams")
            .field("url", &self.url)
            .field("code", &self.code)
            .field("expiration", &self.expiration)
            .field("uses", &self.uses)
            .field("encrypted", &self.passphrase.as_deref().is_some_and(|p| !p.is_empty()))
            .finish()
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a shortened URL and returns its short code.
    async fn create(&self, params: CreateParams) -> Result<ShortCode>;

    /// Resolves a short code to its target URL, consuming one use if the link
    /// is use-limited.
    ///
    /// Missing, expired, exhausted and malformed codes all yield `NotFound`.
    async fn resolve(&self, code: &str, passphrase: Option<&str>) -> Result<String>;

    /// Deletes a shortened URL by its short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &str) -> Result<bool>;
}
