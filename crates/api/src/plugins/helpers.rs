//! Shared helpers for plugin implementations.
//!
//! Extracted to avoid duplicating common patterns across plugins (DRY).

use chrono::NaiveDate;
use rand::distributions::Alphanumeric;
use rand::Rng;

use punchclock_core::adapters::Store;
use punchclock_core::{
    ApiError, ApiRequest, ApiResult, Context, CreateOrganization, Organization, OrgSettings,
    OrgType, Role, Subscription, User,
};

/// How many invite-code collisions to tolerate before giving up.
const INVITE_CODE_RETRIES: usize = 5;

/// Extract the authenticated user from a Bearer token in the
/// `Authorization` header.
///
/// Verifies the token, loads the account, and rejects deactivated
/// accounts. Approval gates are applied per endpoint.
pub async fn get_authenticated_user<S: Store>(
    req: &ApiRequest,
    ctx: &Context<S>,
) -> ApiResult<User> {
    let token = ctx
        .tokens
        .extract_bearer(req)
        .ok_or(ApiError::Unauthenticated)?;

    let claims = ctx.tokens.verify(token)?;

    let user = ctx
        .store
        .get_user_by_id(&claims.sub)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !user.is_active {
        return Err(ApiError::AccountInactive);
    }

    Ok(user)
}

/// The caller's organization id. Org-scoped roles always carry one; a
/// super-admin acting on org-scoped endpoints must name the organization
/// via the `organizationId` query parameter.
pub fn resolve_org_id<S: Store>(user: &User, req: &ApiRequest, _ctx: &Context<S>) -> ApiResult<String> {
    if let Some(org_id) = &user.organization_id {
        return Ok(org_id.clone());
    }
    if user.role == Role::SuperAdmin {
        if let Some(org_id) = req.query.get("organizationId") {
            return Ok(org_id.clone());
        }
        return Err(ApiError::bad_request(
            "organizationId query parameter is required",
        ));
    }
    Err(ApiError::forbidden("Account has no organization"))
}

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_day(value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Invalid date, expected YYYY-MM-DD"))
}

/// Trailing path segment after a fixed prefix, e.g.
/// `last_segment("/attendance/abc", "/attendance/")` → `Some("abc")`.
/// Rejects empty segments and anything containing further slashes.
pub fn last_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest)
}

/// Generate an 8-character uppercase alphanumeric invite code.
pub fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

/// Create an organization, regenerating the invite code on collision.
/// A name collision is not retryable and comes straight back.
pub async fn create_organization_with_fresh_code<S: Store>(
    ctx: &Context<S>,
    name: &str,
    org_type: OrgType,
    settings: OrgSettings,
    subscription: Subscription,
    created_by: &str,
) -> ApiResult<Organization> {
    let mut last_err = ApiError::internal("Invite code generation failed");
    for _ in 0..INVITE_CODE_RETRIES {
        let invite_code = generate_invite_code();
        match ctx
            .store
            .create_organization(CreateOrganization {
                id: None,
                name: name.to_string(),
                org_type,
                settings: settings.clone(),
                subscription: subscription.clone(),
                invite_code,
                created_by: created_by.to_string(),
            })
            .await
        {
            Ok(org) => return Ok(org),
            Err(ApiError::Conflict(msg)) if msg.contains("Invite code") => {
                last_err = ApiError::Conflict(msg);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

/// Fire-and-forget email. Missing provider or a send failure is logged
/// and swallowed; the triggering operation still succeeds.
pub async fn send_email_best_effort<S: Store>(
    ctx: &Context<S>,
    to: &str,
    subject: &str,
    text: &str,
) {
    match ctx.email_provider() {
        Some(provider) => {
            if let Err(e) = provider.send(to, subject, "", text).await {
                ctx.logger()
                    .warn(&format!("Failed to send email to {}: {}", to, e));
            }
        }
        None => ctx
            .logger()
            .debug(&format!("No email provider; skipped email to {}", to)),
    }
}

/// Decode a base64 image payload and store it, returning the reference.
/// Best-effort: any failure is logged and `None` comes back.
pub async fn store_image_best_effort<S: Store>(
    ctx: &Context<S>,
    user_id: &str,
    filename: &str,
    image_base64: &str,
) -> Option<String> {
    use base64::Engine;

    let bytes = match base64::engine::general_purpose::STANDARD.decode(image_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            ctx.logger()
                .warn(&format!("Discarding undecodable image payload: {}", e));
            return None;
        }
    };

    let store = match ctx.media_store() {
        Some(store) => store,
        None => {
            ctx.logger().debug("No media store; image payload dropped");
            return None;
        }
    };

    match store.store_image(user_id, filename, &bytes).await {
        Ok(reference) => Some(reference),
        Err(e) => {
            ctx.logger()
                .warn(&format!("Failed to store image for {}: {}", user_id, e));
            None
        }
    }
}
