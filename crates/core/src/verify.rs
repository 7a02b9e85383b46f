//! National-ID verification capability.
//!
//! Linking a national ID to an account goes through an external registry
//! that sends a one-time passcode to the phone number on file. The backend
//! never sees the phone number unmasked and never validates the passcode
//! itself; both stay behind the [`IdVerifier`] boundary.

use async_trait::async_trait;

use crate::error::{ApiError, ApiResult};

/// Result of asking the registry to start a verification.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    /// Opaque provider-side session reference, echoed back on confirm.
    pub provider_session: String,
    /// Masked phone number for display, e.g. `"*******123"`.
    pub masked_phone: String,
}

/// External identity-registry client.
///
/// Selected through configuration so the deterministic test double can be
/// injected without code branches.
#[async_trait]
pub trait IdVerifier: Send + Sync {
    /// Start a verification for a national ID. The registry sends an OTP
    /// to the registered phone.
    async fn send_otp(&self, national_id: &str) -> ApiResult<OtpChallenge>;

    /// Confirm a previously started verification. Returns `Ok(true)` on a
    /// matching code, `Ok(false)` on a wrong one.
    async fn confirm_otp(&self, provider_session: &str, otp: &str) -> ApiResult<bool>;
}

/// Deterministic verifier for tests and demos.
///
/// Accepts any national ID of at least three digits, always issues the
/// code `"123456"`, and masks all but the last three characters of a
/// synthetic phone number.
pub struct MockIdVerifier;

impl MockIdVerifier {
    pub const OTP: &'static str = "123456";
}

#[async_trait]
impl IdVerifier for MockIdVerifier {
    async fn send_otp(&self, national_id: &str) -> ApiResult<OtpChallenge> {
        if national_id.len() < 3 || !national_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::bad_request("Invalid national ID"));
        }

        let tail = &national_id[national_id.len() - 3..];
        Ok(OtpChallenge {
            provider_session: format!("mock-{}", national_id),
            masked_phone: format!("*******{}", tail),
        })
    }

    async fn confirm_otp(&self, provider_session: &str, otp: &str) -> ApiResult<bool> {
        if !provider_session.starts_with("mock-") {
            return Err(ApiError::dependency("Unknown verification session"));
        }
        Ok(otp == Self::OTP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_round_trip() {
        let verifier = MockIdVerifier;
        let challenge = verifier.send_otp("1234567890").await.unwrap();
        assert_eq!(challenge.masked_phone, "*******890");

        assert!(verifier
            .confirm_otp(&challenge.provider_session, MockIdVerifier::OTP)
            .await
            .unwrap());
        assert!(!verifier
            .confirm_otp(&challenge.provider_session, "000000")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn mock_rejects_non_numeric_id() {
        let verifier = MockIdVerifier;
        assert!(verifier.send_otp("abc").await.is_err());
    }
}
