//! Structural credential check run before any network round trip.
//!
//! Only the shape is inspected: a non-empty string made of exactly three
//! non-empty dot-separated segments. Signature and expiry belong to the
//! Auth collaborator.

/// Outcome of a structural credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    /// Three non-empty segments.
    Valid,
    /// Anything else, with the reason.
    Invalid(&'static str),
}

impl TokenShape {
    /// Whether the credential may be forwarded for verification.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Checks the structural shape of a bearer credential. Never fails.
pub fn validate(raw_token: &str) -> TokenShape {
    if raw_token.trim().is_empty() {
        return TokenShape::Invalid("credential is empty");
    }

    let segments: Vec<&str> = raw_token.split('.').collect();
    if segments.len() != 3 {
        return TokenShape::Invalid("credential must have exactly three segments");
    }

    if segments.iter().any(|s| s.is_empty()) {
        return TokenShape::Invalid("credential has an empty segment");
    }

    TokenShape::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_segments_valid() {
        assert!(validate("aaa.bbb.ccc").is_valid());
    }

    #[test]
    fn test_wrong_segment_counts_invalid() {
        for token in ["", "   ", "abc", "a.b", "a.b.c.d", "a.b.c.d.e"] {
            assert!(!validate(token).is_valid(), "{token:?} should be invalid");
        }
    }

    #[test]
    fn test_empty_segment_invalid() {
        assert_eq!(
            validate("a..c"),
            TokenShape::Invalid("credential has an empty segment")
        );
        assert!(!validate(".b.c").is_valid());
        assert!(!validate("a.b.").is_valid());
    }
}
