//! One-time code issuance and verification
//!
//! A code for an (email, purpose) pair moves through: no-code, active,
//! locked (attempts at the cap), expired, used. Issuing replaces whatever
//! existed for the pair; verification matches on the exact
//! (email, code, purpose) triple and consumes the code on success.

use chrono::Utc;
use taskdeck_core::expiry::is_expired;
use taskdeck_core::token::{generate_numeric_code, DEFAULT_CODE_LENGTH};
use taskdeck_core::ExpiryPolicy;

use crate::error::ApiError;
use crate::store::{CodePurpose, DirectoryStore, OneTimeCode, StoreResult};

/// Issue a fresh code for (email, purpose), replacing any prior one.
///
/// Returns the plaintext code for delivery. If delivery fails, the caller
/// must delete the code (and, for registrations, the pending record) so no
/// undeliverable active code is left behind.
pub fn issue<D: DirectoryStore>(
    store: &D,
    policy: &ExpiryPolicy,
    email: &str,
    purpose: CodePurpose,
) -> StoreResult<String> {
    let code = generate_numeric_code(DEFAULT_CODE_LENGTH);
    let now = Utc::now();

    store.replace_code(OneTimeCode {
        email: email.to_string(),
        purpose,
        code: code.clone(),
        attempts: 0,
        used: false,
        expires_at: policy.otp_expires_at(now),
        created_at: now,
    })?;

    tracing::info!(email = %email, purpose = purpose.as_str(), "One-time code issued");

    Ok(code)
}

/// Verify a code against the exact (email, code, purpose) triple.
///
/// `NotFound` means no record matches the triple; the caller decides
/// whether that counts as a failed attempt against the pair's active code
/// (see `record_failed_attempt`). A matching record that is used, expired
/// or locked fails with the corresponding error. Success consumes the code.
pub fn verify<D: DirectoryStore>(
    store: &D,
    email: &str,
    code: &str,
    purpose: CodePurpose,
) -> StoreResult<()> {
    let record = store
        .find_code(email, code, purpose)?
        .ok_or(ApiError::NotFound)?;

    if record.used {
        return Err(ApiError::AlreadyUsed);
    }
    if is_expired(record.expires_at, Utc::now()) {
        return Err(ApiError::Expired);
    }
    if record.locked() {
        tracing::warn!(email = %email, purpose = purpose.as_str(), "Code locked after too many attempts");
        return Err(ApiError::TooManyAttempts);
    }

    store.mark_code_used(email, code, purpose)?;

    tracing::info!(email = %email, purpose = purpose.as_str(), "One-time code verified");

    Ok(())
}

/// Count a failed attempt against the pair's active code, if one exists.
///
/// Called by routes after `verify` returns `NotFound`: a wrong code typed
/// for this (email, purpose) rate-limits guessing against the real code.
/// Attempts naming a different email or purpose touch no counter.
pub fn record_failed_attempt<D: DirectoryStore>(
    store: &D,
    email: &str,
    purpose: CodePurpose,
) -> StoreResult<()> {
    store.increment_code_attempts(email, purpose)?;

    tracing::debug!(email = %email, purpose = purpose.as_str(), "Failed verification attempt recorded");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::MAX_CODE_ATTEMPTS;
    use crate::store::MemoryStore;
    use chrono::Duration;

    const EMAIL: &str = "alice@example.com";

    #[test]
    fn test_issue_replaces_prior_code() {
        let store = MemoryStore::new();
        let policy = ExpiryPolicy::default();

        let first = issue(&store, &policy, EMAIL, CodePurpose::EmailVerification).unwrap();
        let second = issue(&store, &policy, EMAIL, CodePurpose::EmailVerification).unwrap();

        // Only the second code remains active for the pair
        let active = store
            .get_code(EMAIL, CodePurpose::EmailVerification)
            .unwrap()
            .unwrap();
        assert_eq!(active.code, second);
        assert_eq!(active.attempts, 0);

        if first != second {
            let err = verify(&store, EMAIL, &first, CodePurpose::EmailVerification).unwrap_err();
            assert!(matches!(err, ApiError::NotFound));
        }
        verify(&store, EMAIL, &second, CodePurpose::EmailVerification).unwrap();
    }

    #[test]
    fn test_verify_consumes_code_once() {
        let store = MemoryStore::new();
        let policy = ExpiryPolicy::default();

        let code = issue(&store, &policy, EMAIL, CodePurpose::EmailVerification).unwrap();

        verify(&store, EMAIL, &code, CodePurpose::EmailVerification).unwrap();
        let err = verify(&store, EMAIL, &code, CodePurpose::EmailVerification).unwrap_err();
        assert!(matches!(err, ApiError::AlreadyUsed));
    }

    #[test]
    fn test_expired_code_rejected() {
        let store = MemoryStore::new();
        let policy = ExpiryPolicy::default();

        let code = issue(&store, &policy, EMAIL, CodePurpose::EmailVerification).unwrap();
        store
            .set_code_expiry(
                EMAIL,
                CodePurpose::EmailVerification,
                Utc::now() - Duration::minutes(1),
            )
            .unwrap();

        let err = verify(&store, EMAIL, &code, CodePurpose::EmailVerification).unwrap_err();
        assert!(matches!(err, ApiError::Expired));
    }

    #[test]
    fn test_attempt_cap_locks_code() {
        let store = MemoryStore::new();
        let policy = ExpiryPolicy::default();

        let code = issue(&store, &policy, EMAIL, CodePurpose::EmailVerification).unwrap();

        for _ in 0..MAX_CODE_ATTEMPTS {
            record_failed_attempt(&store, EMAIL, CodePurpose::EmailVerification).unwrap();
        }

        // Even the correct code fails once the cap is reached
        let err = verify(&store, EMAIL, &code, CodePurpose::EmailVerification).unwrap_err();
        assert!(matches!(err, ApiError::TooManyAttempts));
    }

    #[test]
    fn test_purposes_are_independent() {
        let store = MemoryStore::new();
        let policy = ExpiryPolicy::default();

        let verification = issue(&store, &policy, EMAIL, CodePurpose::EmailVerification).unwrap();
        let reset = issue(&store, &policy, EMAIL, CodePurpose::PasswordReset).unwrap();

        // A failed attempt against one purpose never touches the other
        record_failed_attempt(&store, EMAIL, CodePurpose::PasswordReset).unwrap();
        let code = store
            .get_code(EMAIL, CodePurpose::EmailVerification)
            .unwrap()
            .unwrap();
        assert_eq!(code.attempts, 0);

        verify(&store, EMAIL, &verification, CodePurpose::EmailVerification).unwrap();
        verify(&store, EMAIL, &reset, CodePurpose::PasswordReset).unwrap();
    }

    #[test]
    fn test_missing_pair_attempt_is_harmless() {
        let store = MemoryStore::new();

        // No code exists; recording an attempt is a no-op
        record_failed_attempt(&store, "nobody@example.com", CodePurpose::EmailVerification)
            .unwrap();
        assert!(store
            .get_code("nobody@example.com", CodePurpose::EmailVerification)
            .unwrap()
            .is_none());
    }
}
