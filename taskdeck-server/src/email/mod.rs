//! Email sending abstractions
//!
//! Delivery is an external collaborator: lifecycle callers treat a failure
//! here as a reason to roll back the token record they just created.

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for sending lifecycle emails
pub trait EmailSender: Send + Sync {
    /// Send a verification code to a freshly registered address
    fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        display_name: &str,
    ) -> Result<(), String>;

    /// Send a password reset code to an email address
    fn send_password_reset(&self, email: &str, code: &str) -> Result<(), String>;

    /// Send a workspace invitation carrying its acceptance token
    fn send_invitation(
        &self,
        email: &str,
        inviter_name: &str,
        workspace_name: &str,
        token: &str,
    ) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        display_name: &str,
    ) -> Result<(), String> {
        (**self).send_verification_code(email, code, display_name)
    }

    fn send_password_reset(&self, email: &str, code: &str) -> Result<(), String> {
        (**self).send_password_reset(email, code)
    }

    fn send_invitation(
        &self,
        email: &str,
        inviter_name: &str,
        workspace_name: &str,
        token: &str,
    ) -> Result<(), String> {
        (**self).send_invitation(email, inviter_name, workspace_name, token)
    }
}
