use chrono::Duration;
use std::sync::Arc;

use crate::email::EmailProvider;
use crate::error::ApiError;
use crate::logger::{Logger, TracingLogger};
use crate::media::MediaStore;
use crate::verify::IdVerifier;

/// Main configuration for the attendance backend.
#[derive(Clone)]
pub struct AppConfig {
    /// Secret key for signing bearer tokens.
    pub secret: String,

    /// Application name, used in email subjects and log lines.
    pub app_name: String,

    /// Base path where the API routes are mounted. Defaults to `"/api"`.
    pub base_path: String,

    /// Logger implementation. Defaults to a [`TracingLogger`] that delegates
    /// to the `tracing` crate.
    pub logger: Arc<dyn Logger>,

    /// Bearer token configuration.
    pub token: TokenConfig,

    /// Password policy and hashing parameters.
    pub password: PasswordConfig,

    /// Login lockout policy.
    pub lockout: LockoutConfig,

    /// Workday and approval policy.
    pub workday: WorkdayConfig,

    /// Email collaborator. Failures are logged, never propagated.
    pub email_provider: Option<Arc<dyn EmailProvider>>,

    /// Face-photo storage collaborator. Failures are logged, never propagated.
    pub media_store: Option<Arc<dyn MediaStore>>,

    /// Identity-document OTP verifier. Selected here by configuration so the
    /// deterministic test double can be injected without code branches.
    pub id_verifier: Option<Arc<dyn IdVerifier>>,
}

/// Bearer token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Token lifetime.
    pub expires_in: Duration,

    /// Issuer claim, when set.
    pub issuer: Option<String>,
}

/// Password length policy. Hashing itself uses the argon2 defaults.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
}

/// Login lockout policy: `max_attempts` consecutive failures lock the
/// account for `lock_duration` from the failure that hit the limit.
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub lock_duration: Duration,
}

/// Workday arithmetic and approval policy.
#[derive(Debug, Clone)]
pub struct WorkdayConfig {
    /// Standard working day in minutes; time beyond this counts as overtime.
    pub standard_day_minutes: i64,

    /// Face-recognition events at or above this confidence are stored as
    /// auto-approved.
    pub auto_approve_confidence: f32,

    /// Maximum face enrollment attempts per user.
    pub max_enrollment_attempts: u8,

    /// Password-reset token validity window.
    pub reset_token_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            app_name: "Punchclock".to_string(),
            base_path: "/api".to_string(),
            logger: Arc::new(TracingLogger),
            token: TokenConfig::default(),
            password: PasswordConfig::default(),
            lockout: LockoutConfig::default(),
            workday: WorkdayConfig::default(),
            email_provider: None,
            media_store: None,
            id_verifier: None,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            expires_in: Duration::hours(24),
            issuer: None,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration: Duration::hours(2),
        }
    }
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        Self {
            standard_day_minutes: 480,
            auto_approve_confidence: 0.85,
            max_enrollment_attempts: 3,
            reset_token_ttl: Duration::minutes(10),
        }
    }
}

impl AppConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn token_expires_in(mut self, duration: Duration) -> Self {
        self.token.expires_in = duration;
        self
    }

    pub fn password_min_length(mut self, length: usize) -> Self {
        self.password.min_length = length;
        self
    }

    pub fn lockout(mut self, max_attempts: u32, lock_duration: Duration) -> Self {
        self.lockout = LockoutConfig {
            max_attempts,
            lock_duration,
        };
        self
    }

    pub fn standard_day_minutes(mut self, minutes: i64) -> Self {
        self.workday.standard_day_minutes = minutes;
        self
    }

    pub fn auto_approve_confidence(mut self, threshold: f32) -> Self {
        self.workday.auto_approve_confidence = threshold;
        self
    }

    pub fn email_provider(mut self, provider: Arc<dyn EmailProvider>) -> Self {
        self.email_provider = Some(provider);
        self
    }

    pub fn media_store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.media_store = Some(store);
        self
    }

    pub fn id_verifier(mut self, verifier: Arc<dyn IdVerifier>) -> Self {
        self.id_verifier = Some(verifier);
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.secret.is_empty() {
            return Err(ApiError::config("Secret key cannot be empty"));
        }

        if self.secret.len() < 32 {
            return Err(ApiError::config(
                "Secret key must be at least 32 characters",
            ));
        }

        if self.workday.standard_day_minutes <= 0 {
            return Err(ApiError::config(
                "Standard day length must be a positive number of minutes",
            ));
        }

        if !(0.0..=1.0).contains(&self.workday.auto_approve_confidence) {
            return Err(ApiError::config(
                "Auto-approve confidence must lie in [0, 1]",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_short_secret() {
        let config = AppConfig::new("short");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_default_policy() {
        let config = AppConfig::new("a-test-secret-key-of-sufficient-length");
        assert!(config.validate().is_ok());
        assert_eq!(config.lockout.max_attempts, 5);
        assert_eq!(config.lockout.lock_duration, Duration::hours(2));
        assert_eq!(config.workday.standard_day_minutes, 480);
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let config =
            AppConfig::new("a-test-secret-key-of-sufficient-length").auto_approve_confidence(1.5);
        assert!(config.validate().is_err());
    }
}
