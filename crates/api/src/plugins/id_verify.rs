//! National-ID linking via OTP verification.
//!
//! A pending verification lives in an in-process TTL cache keyed by the
//! user id; confirming consumes it. The national ID itself only lands on
//! the account after a successful confirm.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

use punchclock_core::adapters::Store;
use punchclock_core::{
    validate_request_body, ApiError, ApiRequest, ApiResponse, ApiResult, Context, HttpMethod,
    Plugin, Route, TtlCache, UpdateUser,
};

use super::helpers::get_authenticated_user;

/// How long a sent OTP stays confirmable.
const OTP_SESSION_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct OtpSession {
    national_id: String,
    provider_session: String,
}

/// Identity-verification plugin.
pub struct IdVerifyPlugin {
    sessions: TtlCache<String, OtpSession>,
}

#[derive(Debug, Deserialize, Validate)]
struct SendOtpRequest {
    #[validate(length(min = 3, message = "National ID is required"))]
    #[serde(rename = "nationalId")]
    national_id: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ConfirmOtpRequest {
    #[validate(length(min = 1, message = "OTP is required"))]
    otp: String,
}

impl IdVerifyPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            sessions: TtlCache::new(OTP_SESSION_TTL),
        }
    }

    async fn handle_send_otp<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        let body: SendOtpRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        if user.national_id_verified {
            return Err(ApiError::conflict(
                "A national ID is already linked to this account",
            ));
        }
        if let Some(holder) = ctx.store.get_user_by_national_id(&body.national_id).await? {
            if holder.id != user.id {
                return Err(ApiError::conflict(
                    "National ID is already linked to another account",
                ));
            }
        }

        let challenge = ctx.id_verifier()?.send_otp(&body.national_id).await?;

        // Re-sending replaces any pending session for this user.
        self.sessions.insert(
            user.id.clone(),
            OtpSession {
                national_id: body.national_id,
                provider_session: challenge.provider_session,
            },
        );

        ApiResponse::ok(
            200,
            "OTP sent",
            &serde_json::json!({ "maskedPhone": challenge.masked_phone }),
        )
        .map_err(ApiError::from)
    }

    async fn handle_confirm_otp<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        let body: ConfirmOtpRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        // Peek rather than take: a mistyped code must not burn the session.
        let session = self
            .sessions
            .get(&user.id)
            .ok_or_else(|| ApiError::bad_request("No pending verification; request a new OTP"))?;

        let confirmed = ctx
            .id_verifier()?
            .confirm_otp(&session.provider_session, &body.otp)
            .await?;
        if !confirmed {
            return Err(ApiError::bad_request("Incorrect OTP"));
        }

        self.sessions.remove(&user.id);

        let updated = ctx
            .store
            .update_user(
                &user.id,
                UpdateUser {
                    national_id: Some(Some(session.national_id)),
                    national_id_verified: Some(true),
                    national_id_verified_at: Some(Some(Utc::now())),
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok(200, "National ID verified", &updated).map_err(ApiError::from)
    }

    async fn handle_status<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;

        ApiResponse::ok(
            200,
            "OK",
            &serde_json::json!({
                "verified": user.national_id_verified,
                "verifiedAt": user.national_id_verified_at,
                "pendingOtp": self.sessions.get(&user.id).is_some(),
            }),
        )
        .map_err(ApiError::from)
    }

    async fn handle_unlink<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;

        if !user.national_id_verified && user.national_id.is_none() {
            return Err(ApiError::not_found("No national ID linked"));
        }

        self.sessions.remove(&user.id);

        ctx.store
            .update_user(
                &user.id,
                UpdateUser {
                    national_id: Some(None),
                    national_id_verified: Some(false),
                    national_id_verified_at: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok_message(200, "National ID unlinked").map_err(ApiError::from)
    }
}

#[async_trait]
impl<S: Store> Plugin<S> for IdVerifyPlugin {
    fn name(&self) -> &'static str {
        "id-verify"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::post("/verify/send-otp", "sendOtp"),
            Route::post("/verify/confirm-otp", "confirmOtp"),
            Route::get("/verify/status", "verificationStatus"),
            Route::delete("/verify/unlink", "unlinkNationalId"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Post, "/verify/send-otp") => {
                Ok(Some(self.handle_send_otp(req, ctx).await?))
            }
            (HttpMethod::Post, "/verify/confirm-otp") => {
                Ok(Some(self.handle_confirm_otp(req, ctx).await?))
            }
            (HttpMethod::Get, "/verify/status") => Ok(Some(self.handle_status(req, ctx).await?)),
            (HttpMethod::Delete, "/verify/unlink") => Ok(Some(self.handle_unlink(req, ctx).await?)),
            _ => Ok(None),
        }
    }
}
