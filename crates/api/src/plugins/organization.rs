//! Organization directory: CRUD, invite-code lookup, and derived stats.

use async_trait::async_trait;
use serde::Deserialize;
use validator::Validate;

use punchclock_core::adapters::Store;
use punchclock_core::{
    require_role, require_same_org, validate_request_body, ApiError, ApiRequest, ApiResponse,
    ApiResult, Context, HttpMethod, OrgSettings, OrgStats, OrgType, Plugin, Role, Route,
    Subscription, UpdateOrganization,
};

use super::helpers::{create_organization_with_fresh_code, get_authenticated_user, last_segment};

/// Organization management plugin.
pub struct OrganizationPlugin;

#[derive(Debug, Deserialize, Validate)]
struct CreateOrganizationRequest {
    #[validate(length(min = 2, message = "Organization name is required"))]
    name: String,
    #[serde(rename = "orgType")]
    org_type: Option<OrgType>,
    settings: Option<OrgSettings>,
    subscription: Option<Subscription>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateOrganizationRequest {
    name: Option<String>,
    #[serde(rename = "orgType")]
    org_type: Option<OrgType>,
    settings: Option<OrgSettings>,
    subscription: Option<Subscription>,
    #[serde(rename = "isActive")]
    is_active: Option<bool>,
}

impl OrganizationPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }

    async fn handle_create<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::SuperAdmin])?;

        let body: CreateOrganizationRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let org = create_organization_with_fresh_code(
            ctx,
            &body.name,
            body.org_type.unwrap_or(OrgType::Company),
            body.settings.unwrap_or_default(),
            body.subscription.unwrap_or_default(),
            &actor.id,
        )
        .await?;

        ctx.logger()
            .info(&format!("Organization {} created by {}", org.name, actor.email));

        ApiResponse::ok(201, "Organization created", &org).map_err(ApiError::from)
    }

    async fn handle_list<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;

        if actor.role == Role::SuperAdmin {
            let orgs = ctx.store.list_organizations().await?;
            return ApiResponse::ok(200, "OK", &orgs).map_err(ApiError::from);
        }

        require_role(&actor, Role::ORG_ADMINS)?;
        let org_id = actor
            .organization_id
            .as_deref()
            .ok_or_else(|| ApiError::forbidden("Account has no organization"))?;
        let org = ctx
            .store
            .get_organization_by_id(org_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;

        ApiResponse::ok(200, "OK", &vec![org]).map_err(ApiError::from)
    }

    /// Public lookup used by the registration flow. Returns a limited
    /// payload and hides inactive organizations behind a 404.
    async fn handle_by_invite<S: Store>(
        &self,
        ctx: &Context<S>,
        code: &str,
    ) -> ApiResult<ApiResponse> {
        let org = ctx
            .store
            .get_organization_by_invite_code(code)
            .await?
            .filter(|o| o.is_active)
            .ok_or(ApiError::InvalidInviteCode)?;

        ApiResponse::ok(
            200,
            "OK",
            &serde_json::json!({
                "id": org.id,
                "name": org.name,
                "orgType": org.org_type,
            }),
        )
        .map_err(ApiError::from)
    }

    async fn handle_get<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        org_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_same_org(&actor, org_id)?;

        let org = ctx
            .store
            .get_organization_by_id(org_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;

        ApiResponse::ok(200, "OK", &org).map_err(ApiError::from)
    }

    async fn handle_update<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        org_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::SuperAdmin])?;
        require_same_org(&actor, org_id)?;

        let body: UpdateOrganizationRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let updated = ctx
            .store
            .update_organization(
                org_id,
                UpdateOrganization {
                    name: body.name,
                    org_type: body.org_type,
                    settings: body.settings,
                    subscription: body.subscription,
                    is_active: body.is_active,
                    stats: None,
                },
            )
            .await?;

        ApiResponse::ok(200, "Organization updated", &updated).map_err(ApiError::from)
    }

    async fn handle_delete<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        org_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::SuperAdmin])?;

        ctx.store
            .get_organization_by_id(org_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;

        // Deleting a tenant never cascades over member accounts.
        let members = ctx.store.count_organization_users(org_id).await?;
        if members > 0 {
            return Err(ApiError::OrganizationNotEmpty);
        }

        ctx.store.delete_organization(org_id).await?;
        ApiResponse::ok_message(200, "Organization deleted").map_err(ApiError::from)
    }

    /// Recompute the derived counters from live data, persist the snapshot,
    /// and return it.
    async fn handle_stats<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        org_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;
        require_same_org(&actor, org_id)?;

        ctx.store
            .get_organization_by_id(org_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;

        let members = ctx.store.list_organization_users(org_id).await?;
        let stats = OrgStats {
            total_users: members.len() as u64,
            active_users: members.iter().filter(|u| u.is_active).count() as u64,
            total_attendance_records: ctx.store.count_organization_events(org_id).await? as u64,
        };

        ctx.store
            .update_organization(
                org_id,
                UpdateOrganization {
                    stats: Some(stats),
                    ..Default::default()
                },
            )
            .await?;

        ApiResponse::ok(200, "OK", &stats).map_err(ApiError::from)
    }
}

#[async_trait]
impl<S: Store> Plugin<S> for OrganizationPlugin {
    fn name(&self) -> &'static str {
        "organization"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::post("/organizations", "createOrganization"),
            Route::get("/organizations", "listOrganizations"),
            Route::get("/organizations/by-invite/{code}", "organizationByInvite"),
            Route::get("/organizations/{id}", "getOrganization"),
            Route::put("/organizations/{id}", "updateOrganization"),
            Route::delete("/organizations/{id}", "deleteOrganization"),
            Route::get("/organizations/{id}/stats", "organizationStats"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Post, "/organizations") => Ok(Some(self.handle_create(req, ctx).await?)),
            (HttpMethod::Get, "/organizations") => Ok(Some(self.handle_list(req, ctx).await?)),
            // The invite lookup shadows the id lookup, so match it first.
            (HttpMethod::Get, path) if path.starts_with("/organizations/by-invite/") => {
                match last_segment(path, "/organizations/by-invite/") {
                    Some(code) => Ok(Some(self.handle_by_invite(ctx, code).await?)),
                    None => Ok(None),
                }
            }
            (HttpMethod::Get, path)
                if path.starts_with("/organizations/") && path.ends_with("/stats") =>
            {
                let inner = &path["/organizations/".len()..path.len() - "/stats".len()];
                if inner.is_empty() || inner.contains('/') {
                    return Ok(None);
                }
                Ok(Some(self.handle_stats(req, ctx, inner).await?))
            }
            (HttpMethod::Get, path) if path.starts_with("/organizations/") => {
                match last_segment(path, "/organizations/") {
                    Some(id) => Ok(Some(self.handle_get(req, ctx, id).await?)),
                    None => Ok(None),
                }
            }
            (HttpMethod::Put, path) if path.starts_with("/organizations/") => {
                match last_segment(path, "/organizations/") {
                    Some(id) => Ok(Some(self.handle_update(req, ctx, id).await?)),
                    None => Ok(None),
                }
            }
            (HttpMethod::Delete, path) if path.starts_with("/organizations/") => {
                match last_segment(path, "/organizations/") {
                    Some(id) => Ok(Some(self.handle_delete(req, ctx, id).await?)),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}
