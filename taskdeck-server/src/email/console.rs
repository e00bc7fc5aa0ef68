//! Console-based email sender for development

use super::EmailSender;

/// Email sender that logs to console (for development)
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        display_name: &str,
    ) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  VERIFICATION CODE FOR: {} ({})", email, display_name);
        println!("  CODE: {}", code);
        println!("========================================");
        println!();

        tracing::info!(email = %email, code = %code, "Verification code sent");

        Ok(())
    }

    fn send_password_reset(&self, email: &str, code: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  PASSWORD RESET CODE FOR: {}", email);
        println!("  CODE: {}", code);
        println!("========================================");
        println!();

        tracing::info!(email = %email, code = %code, "Password reset code sent");

        Ok(())
    }

    fn send_invitation(
        &self,
        email: &str,
        inviter_name: &str,
        workspace_name: &str,
        token: &str,
    ) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  INVITATION FOR: {}", email);
        println!("  {} invited you to join {}", inviter_name, workspace_name);
        println!("  TOKEN: {}", token);
        println!("========================================");
        println!();

        tracing::info!(email = %email, workspace = %workspace_name, "Invitation sent");

        Ok(())
    }
}
