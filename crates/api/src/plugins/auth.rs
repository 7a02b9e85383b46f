//! Account lifecycle: registration, login with lockout, profile,
//! password management, and face enrollment.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use punchclock_core::adapters::Store;
use punchclock_core::{
    hash_password, validate_request_body, verify_password, ApiError, ApiRequest, ApiResponse,
    ApiResult, Context, CreateUser, HttpMethod, Organization, OrgSettings, OrgType, Plugin, Role,
    Route, Subscription, UpdateUser, User,
};

use super::helpers::{
    create_organization_with_fresh_code, get_authenticated_user, send_email_best_effort,
    store_image_best_effort,
};

/// Authentication and account plugin.
pub struct AuthPlugin;

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    #[serde(rename = "firstName")]
    first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    #[serde(rename = "lastName")]
    last_name: String,
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    #[validate(length(min = 1, message = "Employee ID is required"))]
    #[serde(rename = "employeeId")]
    employee_id: String,
    #[validate(length(min = 1, message = "Invite code is required"))]
    #[serde(rename = "inviteCode")]
    invite_code: String,
    department: Option<String>,
    designation: Option<String>,
    #[serde(rename = "phoneNumber")]
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterOrganizationRequest {
    #[validate(length(min = 2, message = "Organization name is required"))]
    #[serde(rename = "organizationName")]
    organization_name: String,
    #[serde(rename = "orgType")]
    org_type: Option<OrgType>,
    #[validate(length(min = 1, message = "First name is required"))]
    #[serde(rename = "firstName")]
    first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    #[serde(rename = "lastName")]
    last_name: String,
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    #[serde(rename = "employeeId")]
    employee_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateProfileRequest {
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    department: Option<String>,
    designation: Option<String>,
    #[serde(rename = "phoneNumber")]
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    #[serde(rename = "currentPassword")]
    current_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    #[serde(rename = "newPassword")]
    new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "New password is required"))]
    #[serde(rename = "newPassword")]
    new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct EnrollFaceRequest {
    #[validate(length(min = 1, message = "Face descriptor is required"))]
    descriptor: Vec<f32>,
    #[serde(rename = "imageBase64")]
    image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

#[derive(Debug, Serialize)]
struct RegisterOrganizationResponse {
    token: String,
    user: User,
    organization: Organization,
}

impl AuthPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }

    fn check_password_policy<S: Store>(&self, password: &str, ctx: &Context<S>) -> ApiResult<()> {
        let policy = &ctx.config.password;
        if password.len() < policy.min_length {
            return Err(ApiError::bad_request(format!(
                "Password must be at least {} characters",
                policy.min_length
            )));
        }
        if password.len() > policy.max_length {
            return Err(ApiError::bad_request(format!(
                "Password must be at most {} characters",
                policy.max_length
            )));
        }
        Ok(())
    }

    async fn handle_register<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let body: RegisterRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let org = ctx
            .store
            .get_organization_by_invite_code(&body.invite_code)
            .await?
            .filter(|o| o.is_active)
            .ok_or(ApiError::InvalidInviteCode)?;

        // Advisory capacity check against a live count.
        let current = ctx.store.count_organization_users(&org.id).await?;
        if current as u64 >= u64::from(org.subscription.max_users) {
            return Err(ApiError::bad_request(
                "Organization has reached its user limit",
            ));
        }

        self.check_password_policy(&body.password, ctx)?;
        let password_hash = hash_password(&body.password)?;

        let mut create = CreateUser::new(
            &body.first_name,
            &body.last_name,
            body.email.to_lowercase(),
            &body.employee_id,
        )
        .with_password_hash(password_hash)
        .with_organization(&org.id);
        create.department = body.department;
        create.designation = body.designation;
        create.phone_number = body.phone_number;

        let user = ctx.store.create_user(create).await?;

        ctx.logger().info(&format!(
            "New registration {} pending approval in organization {}",
            user.email, org.name
        ));

        ApiResponse::ok(
            201,
            "Registration received; an administrator must approve the account",
            &user,
        )
        .map_err(ApiError::from)
    }

    async fn handle_register_organization<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let body: RegisterOrganizationRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        self.check_password_policy(&body.password, ctx)?;
        let password_hash = hash_password(&body.password)?;

        // The admin id is fixed up front so the organization's createdBy
        // can reference it.
        let admin_id = Uuid::new_v4().to_string();

        let org = create_organization_with_fresh_code(
            ctx,
            &body.organization_name,
            body.org_type.unwrap_or(OrgType::Company),
            OrgSettings::default(),
            Subscription::default(),
            &admin_id,
        )
        .await?;

        let mut create = CreateUser::new(
            &body.first_name,
            &body.last_name,
            body.email.to_lowercase(),
            body.employee_id.as_deref().unwrap_or("ADMIN-1"),
        )
        .with_password_hash(password_hash)
        .with_role(Role::Admin)
        .with_organization(&org.id)
        .approved();
        create.id = Some(admin_id);

        // The org and its first admin are one logical unit: roll the org
        // back if the admin cannot be created.
        let user = match ctx.store.create_user(create).await {
            Ok(user) => user,
            Err(e) => {
                if let Err(cleanup) = ctx.store.delete_organization(&org.id).await {
                    ctx.logger().error(&format!(
                        "Failed to roll back organization {}: {}",
                        org.id, cleanup
                    ));
                }
                return Err(e);
            }
        };

        let token = ctx.tokens.issue(&user.id)?;

        send_email_best_effort(
            ctx,
            &user.email,
            &format!("Welcome to {}", ctx.config.app_name),
            &format!(
                "Your organization {} is ready. Share invite code {} with your team.",
                org.name, org.invite_code
            ),
        )
        .await;

        ApiResponse::ok(
            201,
            "Organization created",
            &RegisterOrganizationResponse {
                token,
                user,
                organization: org,
            },
        )
        .map_err(ApiError::from)
    }

    async fn handle_login<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let body: LoginRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let user = ctx
            .store
            .get_user_by_email(&body.email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let now = Utc::now();

        // A live lock consumes no attempt, even with the right password.
        if user.is_locked(now) {
            return Err(ApiError::AccountLocked);
        }

        if !verify_password(&body.password, &user.password_hash)? {
            // An expired lock restarts the counter.
            let failed = if user.lock_until.is_some_and(|until| until <= now) {
                1
            } else {
                user.failed_logins + 1
            };

            let lockout = &ctx.config.lockout;
            let lock_until = (failed >= lockout.max_attempts).then(|| now + lockout.lock_duration);

            if lock_until.is_some() {
                ctx.logger().warn(&format!(
                    "Locking account {} after {} failed logins",
                    user.email, failed
                ));
            }

            ctx.store
                .update_user(
                    &user.id,
                    UpdateUser {
                        failed_logins: Some(failed),
                        lock_until: Some(lock_until),
                        ..Default::default()
                    },
                )
                .await?;

            // The failure that hits the limit already answers as locked.
            return Err(if lock_until.is_some() {
                ApiError::AccountLocked
            } else {
                ApiError::InvalidCredentials
            });
        }

        if !user.is_active {
            return Err(ApiError::AccountInactive);
        }

        let user = ctx
            .store
            .update_user(
                &user.id,
                UpdateUser {
                    failed_logins: Some(0),
                    lock_until: Some(None),
                    last_login: Some(now),
                    ..Default::default()
                },
            )
            .await?;

        let token = ctx.tokens.issue(&user.id)?;

        ApiResponse::ok(200, "Login successful", &LoginResponse { token, user })
            .map_err(ApiError::from)
    }

    async fn handle_me<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;

        let organization = match &user.organization_id {
            Some(org_id) => ctx.store.get_organization_by_id(org_id).await?,
            None => None,
        };

        ApiResponse::ok(
            200,
            "OK",
            &serde_json::json!({
                "user": user,
                "organization": organization,
            }),
        )
        .map_err(ApiError::from)
    }

    async fn handle_update_profile<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        let body: UpdateProfileRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let updated = ctx
            .store
            .update_user(
                &user.id,
                UpdateUser {
                    first_name: body.first_name,
                    last_name: body.last_name,
                    department: body.department,
                    designation: body.designation,
                    phone_number: body.phone_number,
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok(200, "Profile updated", &updated).map_err(ApiError::from)
    }

    async fn handle_change_password<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        let body: ChangePasswordRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        if !verify_password(&body.current_password, &user.password_hash)? {
            return Err(ApiError::InvalidCredentials);
        }

        self.check_password_policy(&body.new_password, ctx)?;
        let password_hash = hash_password(&body.new_password)?;

        ctx.store
            .update_user(
                &user.id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok_message(200, "Password changed").map_err(ApiError::from)
    }

    async fn handle_forgot_password<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let body: ForgotPasswordRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        // Always answer 200; whether the email exists is not disclosed.
        if let Some(user) = ctx.store.get_user_by_email(&body.email).await? {
            let raw_token = format!("{}.{}", user.id, Uuid::new_v4());
            let token_hash = hash_password(&raw_token)?;
            let expires = Utc::now() + ctx.config.workday.reset_token_ttl;

            ctx.store
                .update_user(
                    &user.id,
                    UpdateUser {
                        reset_token_hash: Some(Some(token_hash)),
                        reset_token_expires: Some(Some(expires)),
                        ..Default::default()
                    },
                )
                .await?;

            send_email_best_effort(
                ctx,
                &user.email,
                &format!("{} password reset", ctx.config.app_name),
                &format!(
                    "Use this token within 10 minutes to reset your password: {}",
                    raw_token
                ),
            )
            .await;
        }

        ApiResponse::ok_message(
            200,
            "If that email is registered, a reset link has been sent",
        )
        .map_err(ApiError::from)
    }

    async fn handle_reset_password<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        raw_token: &str,
    ) -> ApiResult<ApiResponse> {
        let body: ResetPasswordRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let invalid = || ApiError::bad_request("Reset token is invalid or expired");

        // Tokens are issued as `<user-id>.<secret>`; the stored hash covers
        // the whole token.
        let (user_id, _) = raw_token.split_once('.').ok_or_else(invalid)?;

        let user = ctx
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(invalid)?;

        let stored_hash = user.reset_token_hash.as_deref().ok_or_else(invalid)?;
        let expires = user.reset_token_expires.ok_or_else(invalid)?;

        if expires <= Utc::now() || !verify_password(raw_token, stored_hash)? {
            return Err(invalid());
        }

        self.check_password_policy(&body.new_password, ctx)?;
        let password_hash = hash_password(&body.new_password)?;

        // Single use: the token is cleared with the password change.
        ctx.store
            .update_user(
                &user.id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    reset_token_hash: Some(None),
                    reset_token_expires: Some(None),
                    failed_logins: Some(0),
                    lock_until: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok_message(200, "Password reset").map_err(ApiError::from)
    }

    async fn handle_enroll_face<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        let body: EnrollFaceRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        if user.enrollment_attempts >= ctx.config.workday.max_enrollment_attempts {
            return Err(ApiError::EnrollmentLimitReached);
        }

        let mut descriptors = user.face_descriptors.clone();
        descriptors.push(body.descriptor);

        let mut images = user.face_images.clone();
        if let Some(image_base64) = &body.image_base64 {
            let filename = format!("face-{}.jpg", descriptors.len() - 1);
            if let Some(reference) =
                store_image_best_effort(ctx, &user.id, &filename, image_base64).await
            {
                images.push(reference);
            }
        }

        let updated = ctx
            .store
            .update_user(
                &user.id,
                UpdateUser {
                    face_descriptors: Some(descriptors),
                    face_images: Some(images),
                    face_enrolled: Some(true),
                    enrollment_attempts: Some(user.enrollment_attempts + 1),
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok(200, "Face enrolled", &updated).map_err(ApiError::from)
    }
}

#[async_trait]
impl<S: Store> Plugin<S> for AuthPlugin {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::post("/auth/register", "register"),
            Route::post("/auth/register-organization", "registerOrganization"),
            Route::post("/auth/login", "login"),
            Route::get("/auth/me", "getCurrentUser"),
            Route::put("/auth/profile", "updateProfile"),
            Route::new(HttpMethod::Patch, "/auth/change-password", "changePassword"),
            Route::post("/auth/forgot-password", "forgotPassword"),
            Route::new(
                HttpMethod::Patch,
                "/auth/reset-password/{token}",
                "resetPassword",
            ),
            Route::post("/auth/enroll-face", "enrollFace"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Post, "/auth/register") => Ok(Some(self.handle_register(req, ctx).await?)),
            (HttpMethod::Post, "/auth/register-organization") => {
                Ok(Some(self.handle_register_organization(req, ctx).await?))
            }
            (HttpMethod::Post, "/auth/login") => Ok(Some(self.handle_login(req, ctx).await?)),
            (HttpMethod::Get, "/auth/me") => Ok(Some(self.handle_me(req, ctx).await?)),
            (HttpMethod::Put, "/auth/profile") => {
                Ok(Some(self.handle_update_profile(req, ctx).await?))
            }
            (HttpMethod::Patch, "/auth/change-password") => {
                Ok(Some(self.handle_change_password(req, ctx).await?))
            }
            (HttpMethod::Post, "/auth/forgot-password") => {
                Ok(Some(self.handle_forgot_password(req, ctx).await?))
            }
            (HttpMethod::Patch, path) if path.starts_with("/auth/reset-password/") => {
                match super::helpers::last_segment(path, "/auth/reset-password/") {
                    Some(token) => Ok(Some(self.handle_reset_password(req, ctx, token).await?)),
                    None => Ok(None),
                }
            }
            (HttpMethod::Post, "/auth/enroll-face") => {
                Ok(Some(self.handle_enroll_face(req, ctx).await?))
            }
            _ => Ok(None),
        }
    }
}
