use crate::record::ShortlinkRecord;
use jiff::Timestamp;
use serde::Serialize;

/// Outcome of checking whether a stored record may still be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Resolvable,
    /// `expires_at` lies strictly before `now`.
    Expired,
    /// `uses_remaining` is set and already zero.
    Exhausted,
}

impl Verdict {
    pub fn is_resolvable(self) -> bool {
        self == Verdict::Resolvable
    }
}

/// Decides whether `record` is still resolvable at `now`.
///
/// Pure: callers act on the verdict. Expiry is checked before exhaustion.
/// A zero use count cannot arise from the store's atomic decrement, but is
/// still reported so hand-edited or corrupted rows are evicted.
pub fn evaluate(record: &ShortlinkRecord, now: Timestamp) -> Verdict {
    if record.expires_at.is_some_and(|expires_at| now > expires_at) {
        return Verdict::Expired;
    }

    if record.uses_remaining.is_some_and(|uses| uses == 0) {
        return Verdict::Exhausted;
    }

    Verdict::Resolvable
}
