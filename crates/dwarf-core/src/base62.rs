use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// Reserved prefix marking system-generated short codes.
///
/// User-chosen codes are restricted to `[a-zA-Z0-9_-]`, so a generated code can
/// never collide with a custom one.
pub const SIGIL: char = '@';

const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE: u64 = ALPHABET.len() as u64;

/// Encodes a sequence number in base62. Zero encodes to `"0"`.
pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::with_capacity(11);
    while value > 0 {
        digits.push(ALPHABET[(value % BASE) as usize]);
        value /= BASE;
    }
    digits.reverse();

    // every byte comes from ALPHABET
    digits.into_iter().map(char::from).collect()
}

/// Decodes a base62 string. Returns `None` for empty input, foreign symbols
/// or values that overflow a `u64`.
pub fn decode(encoded: &str) -> Option<u64> {
    if encoded.is_empty() {
        return None;
    }

    encoded.bytes().try_fold(0u64, |acc, byte| {
        let digit = symbol_value(byte)?;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

fn symbol_value(byte: u8) -> Option<u64> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as u64),
        b'a'..=b'z' => Some((byte - b'a') as u64 + 10),
        b'A'..=b'Z' => Some((byte - b'A') as u64 + 36),
        _ => None,
    }
}

/// A generated short code: the sigil followed by a base62 body.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShortCodeBase62(SmolStr);

impl ShortCodeBase62 {
    /// Creates a generated code from an allocation sequence number.
    ///
    /// # Examples
    ///
    /// ```
    /// use dwarf_core::base62::ShortCodeBase62;
    ///
    /// assert_eq!(ShortCodeBase62::new(0).as_str(), "@0");
    /// assert_eq!(ShortCodeBase62::new(62).as_str(), "@10");
    /// ```
    pub fn new(sequence: u64) -> Self {
        let mut code = String::with_capacity(12);
        code.push(SIGIL);
        code.push_str(&encode(sequence));
        Self(SmolStr::new(code))
    }

    /// Parses a sigil-prefixed code such as one taken from a request path.
    ///
    /// Only the shape is checked (sigil plus a non-empty body of alphabet
    /// symbols). The text is kept verbatim so a lookup matches exactly what was
    /// asked for.
    pub fn parse(code: &str) -> Option<Self> {
        let body = code.strip_prefix(SIGIL)?;
        if body.is_empty() || !body.bytes().all(|b| symbol_value(b).is_some()) {
            return None;
        }
        Some(Self(SmolStr::new(code)))
    }

    /// Returns the full code, sigil included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base62 body without the sigil.
    pub fn body(&self) -> &str {
        &self.0[SIGIL.len_utf8()..]
    }

    /// Decodes the sequence number this code was generated from.
    pub fn sequence(&self) -> Option<u64> {
        decode(self.body())
    }
}

impl std::fmt::Debug for ShortCodeBase62 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCodeBase62").field(&self.0).finish()
    }
}

impl Display for ShortCodeBase62 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ShortCodeBase62 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortCodeBase62 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("not a generated short code: '{}'", s))
        })
    }
}

impl From<u64> for ShortCodeBase62 {
    fn from(sequence: u64) -> Self {
        Self::new(sequence)
    }
}
