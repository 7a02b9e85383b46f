use async_trait::async_trait;

use crate::error::ApiResult;

/// Outbound email capability (welcome mail, password-reset tokens).
///
/// Implement this to plug in a real delivery service (SMTP, SES, ...).
/// Handlers treat delivery as best-effort: a failed send is logged and the
/// triggering operation still succeeds.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email. `html` and `text` may be empty.
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> ApiResult<()>;
}

/// Development provider that writes emails to stderr instead of sending
/// them. Password-reset tokens land in the process log, so never use this
/// outside local development.
pub struct ConsoleEmailProvider;

#[async_trait]
impl EmailProvider for ConsoleEmailProvider {
    async fn send(&self, to: &str, subject: &str, _html: &str, text: &str) -> ApiResult<()> {
        eprintln!("[EMAIL] To: {to} | Subject: {subject} | Body: {text}");
        Ok(())
    }
}
