//! Tests for the expiry policy

use chrono::{Duration, Utc};
use taskdeck_core::expiry::{
    is_expired, ExpiryPolicy, DEFAULT_INVITATION_EXPIRY_HOURS, DEFAULT_OTP_EXPIRY_MINUTES,
    REGISTRATION_EXPIRY_HOURS,
};

#[test]
fn test_defaults() {
    let policy = ExpiryPolicy::default();
    assert_eq!(policy.otp_expiry_minutes, DEFAULT_OTP_EXPIRY_MINUTES);
    assert_eq!(
        policy.invitation_expiry_hours,
        DEFAULT_INVITATION_EXPIRY_HOURS
    );
}

#[test]
fn test_overrides_applied() {
    let policy = ExpiryPolicy::from_overrides(Some(5), Some(24));
    let now = Utc::now();
    assert_eq!(policy.otp_expires_at(now), now + Duration::minutes(5));
    assert_eq!(policy.invitation_expires_at(now), now + Duration::hours(24));
}

#[test]
fn test_invalid_overrides_fall_back() {
    let policy = ExpiryPolicy::from_overrides(Some(0), Some(-3));
    assert_eq!(policy.otp_expiry_minutes, DEFAULT_OTP_EXPIRY_MINUTES);
    assert_eq!(
        policy.invitation_expiry_hours,
        DEFAULT_INVITATION_EXPIRY_HOURS
    );

    let policy = ExpiryPolicy::from_overrides(None, None);
    assert_eq!(policy, ExpiryPolicy::default());
}

#[test]
fn test_registration_expiry_is_fixed() {
    let policy = ExpiryPolicy::from_overrides(Some(1), Some(1));
    let now = Utc::now();
    assert_eq!(
        policy.registration_expires_at(now),
        now + Duration::hours(REGISTRATION_EXPIRY_HOURS)
    );
}

#[test]
fn test_is_expired_boundary() {
    let now = Utc::now();
    assert!(!is_expired(now, now));
    assert!(!is_expired(now + Duration::seconds(1), now));
    assert!(is_expired(now - Duration::seconds(1), now));
}
