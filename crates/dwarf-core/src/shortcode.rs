use crate::base62::{ShortCodeBase62, SIGIL};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A validated short code identifier for a shortened URL.
///
/// Custom codes are non-empty strings over `[a-zA-Z0-9_-]`. Generated codes
/// carry the [`SIGIL`] prefix, which custom codes can never contain, so the two
/// namespaces are disjoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShortCode {
    /// A system-generated short code, allocated from a sequence number.
    Generated(ShortCodeBase62),
    /// A user-provided custom short code.
    Custom(String),
}

impl ShortCode {
    /// Creates a generated `ShortCode` from a sequence number or an already
    /// encoded [`ShortCodeBase62`].
    ///
    /// ```
    /// use dwarf_core::ShortCode;
    ///
    /// let code = ShortCode::generated(0u64);
    /// assert_eq!(code.as_str(), "@0");
    /// ```
    pub fn generated(code: impl Into<ShortCodeBase62>) -> Self {
        Self::Generated(code.into())
    }

    /// Creates a custom `ShortCode` after validating the input.
    ///
    /// Valid codes contain only `[a-zA-Z0-9_-]`; the sigil is rejected.
    pub fn new(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self::Custom(code))
    }

    /// Parses a code received from a caller looking a link up.
    ///
    /// Accepts both namespaces: sigil-prefixed generated codes and custom
    /// codes.
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        if code.starts_with(SIGIL) {
            return ShortCodeBase62::parse(code)
                .map(Self::Generated)
                .ok_or_else(|| {
                    CoreError::InvalidShortCode(format!("malformed generated code: '{}'", code))
                });
        }
        Self::new(code)
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources such as
    /// rows already in the store.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        let code = code.into();
        match ShortCodeBase62::parse(&code) {
            Some(generated) => Self::Generated(generated),
            None => Self::Custom(code),
        }
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            ShortCode::Generated(generated) => generated.as_str(),
            ShortCode::Custom(s) => s.as_str(),
        }
    }

    /// Returns `true` for codes issued by the allocator.
    pub fn is_generated(&self) -> bool {
        matches!(self, ShortCode::Generated(_))
    }

    fn validate(code: &str) -> Result<(), CoreError> {
        if code.is_empty() {
            return Err(CoreError::InvalidShortCode(
                "code cannot be empty".to_string(),
            ));
        }

        if code.starts_with(SIGIL) {
            return Err(CoreError::InvalidShortCode(format!(
                "'{}' is reserved for generated codes: '{}'",
                SIGIL, code
            )));
        }

        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortCode::Generated(generated) => write!(f, "{}", generated),
            ShortCode::Custom(s) => f.write_str(s),
        }
    }
}

impl TryFrom<String> for ShortCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShortCode> for String {
    fn from(value: ShortCode) -> Self {
        match value {
            ShortCode::Generated(generated) => generated.as_str().to_owned(),
            ShortCode::Custom(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_codes() {
        assert!(ShortCode::new("x").is_ok());
        assert!(ShortCode::new("abc").is_ok());
        assert!(ShortCode::new("Abc-123_xyz").is_ok());
    }

    #[test]
    fn empty_is_rejected() {
        assert!(ShortCode::new("").is_err());
    }

    #[test]
    fn long_codes_are_accepted() {
        let long = "a-b_c".repeat(200);
        let code = ShortCode::new(long.clone()).unwrap();
        assert_eq!(code.as_str(), long);
        assert_eq!(ShortCode::parse(&long).unwrap(), code);
    }

    #[test]
    fn invalid_characters() {
        assert!(ShortCode::new("abc def").is_err());
        assert!(ShortCode::new("abc/def").is_err());
        assert!(ShortCode::new("abc!def").is_err());
        assert!(ShortCode::new("ab@c").is_err());
    }

    #[test]
    fn sigil_is_reserved() {
        let err = ShortCode::new("@evil").unwrap_err();
        assert!(matches!(err, CoreError::InvalidShortCode(_)));
        assert!(ShortCode::new("@0").is_err());
    }

    #[test]
    fn parse_accepts_both_namespaces() {
        let generated = ShortCode::parse("@1a").unwrap();
        assert!(generated.is_generated());
        assert_eq!(generated.as_str(), "@1a");

        let custom = ShortCode::parse("my-code").unwrap();
        assert!(!custom.is_generated());

        assert!(ShortCode::parse("@").is_err());
        assert!(ShortCode::parse("@a-b").is_err());
        assert!(ShortCode::parse("a b").is_err());
    }

    #[test]
    fn new_unchecked_recognises_generated_codes() {
        assert!(ShortCode::new_unchecked("@7").is_generated());
        assert!(!ShortCode::new_unchecked("plain").is_generated());
    }

    #[test]
    fn display_custom() {
        let code = ShortCode::new("my-code").unwrap();
        assert_eq!(code.to_string(), "my-code");
    }

    #[test]
    fn display_generated() {
        let code = ShortCode::generated(61u64);
        assert_eq!(code.to_string(), "@Z");
    }

    #[test]
    fn to_url_custom() {
        let code = ShortCode::new("abc123").unwrap();
        assert_eq!(code.to_url("https://dwarf.link"), "https://dwarf.link/abc123");
        assert_eq!(code.to_url("https://dwarf.link/"), "https://dwarf.link/abc123");
    }

    #[test]
    fn serde_uses_plain_strings() {
        let code = ShortCode::generated(10u64);
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"@a\"");

        let custom: ShortCode = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(custom, ShortCode::new("hello").unwrap());
        assert!(serde_json::from_str::<ShortCode>("\"no spaces\"").is_err());
    }
}
