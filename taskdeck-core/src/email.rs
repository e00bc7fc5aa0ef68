//! Email address normalization and validation
//!
//! All lookups key on the normalized (trimmed, lowercased) form so that
//! `Alice@Example.com` and `alice@example.com` refer to the same identity.

use crate::error::Error;
use crate::Result;

/// Normalize an email address for storage and comparison.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Validate the shape of an email address and return its normalized form.
///
/// This is intentionally loose: one `@`, a non-empty local part, and a
/// domain containing a dot. Real deliverability is proven by the one-time
/// code, not by parsing.
pub fn validate(raw: &str) -> Result<String> {
    let normalized = normalize(raw);

    let (local, domain) = normalized
        .split_once('@')
        .ok_or_else(|| Error::InvalidEmail(raw.to_string()))?;

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || normalized.contains(char::is_whitespace)
        || normalized.matches('@').count() != 1
    {
        return Err(Error::InvalidEmail(raw.to_string()));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_validate_accepts_plain_addresses() {
        assert_eq!(
            validate("Carol@Example.com").unwrap(),
            "carol@example.com"
        );
        assert_eq!(validate("a.b+tag@sub.example.org").unwrap(), "a.b+tag@sub.example.org");
    }

    #[test]
    fn test_validate_rejects_malformed_addresses() {
        for bad in ["", "plain", "@example.com", "a@", "a@nodot", "a@.com", "a@b.com@c.com", "a b@example.com"] {
            assert!(validate(bad).is_err(), "expected rejection: {bad:?}");
        }
    }
}
