/*!
 * Inline String
 * Short diagnostic messages without heap allocation
 */

use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;
use std::fmt;

/// String that keeps short messages (≤23 bytes) inline
///
/// Used for error payloads so that configuration errors raised while a
/// cell is being set up do not allocate for the common short messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct InlineString {
    inner: SmartString,
}

impl InlineString {
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Check if string is stored inline (no heap allocation)
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.inner.is_inline()
    }
}

impl From<&str> for InlineString {
    #[inline]
    fn from(s: &str) -> Self {
        Self {
            inner: SmartString::from(s),
        }
    }
}

impl From<String> for InlineString {
    #[inline]
    fn from(s: String) -> Self {
        Self {
            inner: SmartString::from(s),
        }
    }
}

impl AsRef<str> for InlineString {
    #[inline(always)]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for InlineString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_messages_stay_inline() {
        let s = InlineString::from("bad bandwidth");
        assert!(s.is_inline());
        assert_eq!(s.to_string(), "bad bandwidth");
    }

    #[test]
    fn test_long_messages_round_trip() {
        let msg = "cqi timers threshold must be at least one TTI for every policy";
        let s = InlineString::from(msg.to_string());
        assert!(!s.is_inline());
        assert_eq!(s.as_str(), msg);
    }
}
