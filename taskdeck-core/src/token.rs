//! Token and one-time code generation

use rand::Rng;

/// Byte length of an invitation token before hex encoding (256 bits)
pub const INVITE_TOKEN_BYTES: usize = 32;

/// Default number of digits in a one-time code
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Generate an unguessable invitation token (64 hex characters).
///
/// The token is a bearer capability: anyone holding it can look up the
/// invitation, so it carries the full 256 bits of entropy.
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Generate a numeric one-time code of exactly `length` digits.
///
/// Each digit is drawn independently, so leading zeros are allowed. Low
/// entropy is compensated by short expiry and the attempt cap.
pub fn generate_numeric_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_token_length_and_charset() {
        let token = generate_invite_token();
        assert_eq!(token.len(), INVITE_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_invite_token_uniqueness() {
        let t1 = generate_invite_token();
        let t2 = generate_invite_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_numeric_code_format() {
        for _ in 0..100 {
            let code = generate_numeric_code(DEFAULT_CODE_LENGTH);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_numeric_code_custom_length() {
        assert_eq!(generate_numeric_code(4).len(), 4);
        assert_eq!(generate_numeric_code(8).len(), 8);
    }
}
