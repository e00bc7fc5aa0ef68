//! Expiry policy for time-limited records
//!
//! One-time codes, pending registrations and invitations all carry an
//! absolute `expires_at` timestamp. The policy computes those timestamps
//! from configured durations; callers check them lazily on every access
//! path, with a periodic sweep as advisory cleanup.

use chrono::{DateTime, Duration, Utc};

/// Default one-time code lifetime
pub const DEFAULT_OTP_EXPIRY_MINUTES: i64 = 10;

/// Default invitation lifetime
pub const DEFAULT_INVITATION_EXPIRY_HOURS: i64 = 72;

/// Pending registrations always expire after this many hours
pub const REGISTRATION_EXPIRY_HOURS: i64 = 24;

/// Configured expiry durations for the lifecycle entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub otp_expiry_minutes: i64,
    pub invitation_expiry_hours: i64,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            otp_expiry_minutes: DEFAULT_OTP_EXPIRY_MINUTES,
            invitation_expiry_hours: DEFAULT_INVITATION_EXPIRY_HOURS,
        }
    }
}

impl ExpiryPolicy {
    /// Build a policy from optional overrides.
    ///
    /// Absent or non-positive values fall back to the documented defaults,
    /// matching how the configuration layer treats absent or non-numeric
    /// environment values.
    pub fn from_overrides(otp_minutes: Option<i64>, invitation_hours: Option<i64>) -> Self {
        Self {
            otp_expiry_minutes: otp_minutes
                .filter(|m| *m > 0)
                .unwrap_or(DEFAULT_OTP_EXPIRY_MINUTES),
            invitation_expiry_hours: invitation_hours
                .filter(|h| *h > 0)
                .unwrap_or(DEFAULT_INVITATION_EXPIRY_HOURS),
        }
    }

    pub fn otp_expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.otp_expiry_minutes)
    }

    pub fn invitation_expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(self.invitation_expiry_hours)
    }

    pub fn registration_expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(REGISTRATION_EXPIRY_HOURS)
    }
}

/// A record is expired once `now` is strictly past its deadline.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}
