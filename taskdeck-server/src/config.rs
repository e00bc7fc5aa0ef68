//! Server configuration

use taskdeck_core::ExpiryPolicy;

use crate::email::SmtpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Domain this server is hosted at (used in invitation links)
    pub domain: String,

    /// SQLite database path; absent selects the in-memory backend
    pub database_path: Option<String>,

    /// One-time code lifetime override, minutes
    pub otp_expiry_minutes: Option<i64>,

    /// Invitation lifetime override, hours
    pub invitation_expiry_hours: Option<i64>,

    /// SMTP configuration; absent selects the console sender
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Recognized: PORT, DOMAIN, DATABASE_PATH, OTP_EXPIRY_MINUTES,
    /// INVITATION_EXPIRY_HOURS, plus the SMTP_* block. Absent or
    /// non-numeric duration values fall back to the documented defaults.
    pub fn from_env() -> Self {
        Self {
            port: parse_var(std::env::var("PORT").ok()).unwrap_or(3000),
            domain: std::env::var("DOMAIN").unwrap_or_else(|_| "localhost".to_string()),
            database_path: std::env::var("DATABASE_PATH").ok().filter(|s| !s.is_empty()),
            otp_expiry_minutes: parse_var(std::env::var("OTP_EXPIRY_MINUTES").ok()),
            invitation_expiry_hours: parse_var(std::env::var("INVITATION_EXPIRY_HOURS").ok()),
            smtp: SmtpConfig::from_env(),
        }
    }

    /// The expiry policy this configuration selects
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_overrides(self.otp_expiry_minutes, self.invitation_expiry_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            domain: "localhost".to_string(),
            database_path: None,
            otp_expiry_minutes: None,
            invitation_expiry_hours: None,
            smtp: None,
        }
    }
}

/// Parse an optional env value, treating non-numeric text as absent
fn parse_var<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::expiry::{DEFAULT_INVITATION_EXPIRY_HOURS, DEFAULT_OTP_EXPIRY_MINUTES};

    #[test]
    fn test_parse_var_accepts_numbers() {
        assert_eq!(parse_var::<i64>(Some("15".to_string())), Some(15));
        assert_eq!(parse_var::<u16>(Some(" 8080 ".to_string())), Some(8080));
    }

    #[test]
    fn test_parse_var_drops_non_numeric() {
        assert_eq!(parse_var::<i64>(Some("soon".to_string())), None);
        assert_eq!(parse_var::<i64>(Some("".to_string())), None);
        assert_eq!(parse_var::<i64>(None), None);
    }

    #[test]
    fn test_default_config_selects_default_policy() {
        let config = Config::default();
        let policy = config.expiry_policy();
        assert_eq!(policy.otp_expiry_minutes, DEFAULT_OTP_EXPIRY_MINUTES);
        assert_eq!(
            policy.invitation_expiry_hours,
            DEFAULT_INVITATION_EXPIRY_HOURS
        );
    }

    #[test]
    fn test_overrides_reach_policy() {
        let config = Config {
            otp_expiry_minutes: Some(5),
            invitation_expiry_hours: Some(24),
            ..Config::default()
        };
        let policy = config.expiry_policy();
        assert_eq!(policy.otp_expiry_minutes, 5);
        assert_eq!(policy.invitation_expiry_hours, 24);
    }
}
