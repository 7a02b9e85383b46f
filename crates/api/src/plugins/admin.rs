//! Administrative user management inside one organization.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use punchclock_core::adapters::Store;
use punchclock_core::{
    check_admin_action, require_role, require_same_org, validate_request_body, AdminAction,
    ApiError, ApiRequest, ApiResponse, ApiResult, Context, HttpMethod, Plugin, Role, Route,
    UpdateUser,
};

use super::helpers::{get_authenticated_user, resolve_org_id};

/// User administration plugin.
pub struct AdminPlugin;

#[derive(Debug, Deserialize, Validate)]
struct AdminActionRequest {
    action: AdminAction,
}

impl AdminPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }

    async fn handle_action<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        user_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;

        let body: AdminActionRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let target = ctx
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        check_admin_action(&actor, &target, body.action)?;

        let now = Utc::now();
        let update = match body.action {
            AdminAction::Approve => UpdateUser {
                is_approved: Some(true),
                approved_by: Some(Some(actor.id.clone())),
                approved_at: Some(Some(now)),
                ..Default::default()
            },
            AdminAction::Reject => UpdateUser {
                is_approved: Some(false),
                is_active: Some(false),
                approved_by: Some(None),
                approved_at: Some(None),
                ..Default::default()
            },
            AdminAction::Activate => UpdateUser {
                is_active: Some(true),
                ..Default::default()
            },
            AdminAction::Deactivate => UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
            AdminAction::ResetFace => UpdateUser {
                face_descriptors: Some(Vec::new()),
                face_images: Some(Vec::new()),
                face_enrolled: Some(false),
                enrollment_attempts: Some(0),
                ..Default::default()
            },
        };

        let updated = ctx.store.update_user(user_id, update).await?;

        ctx.logger().info(&format!(
            "Admin {} applied {:?} to user {}",
            actor.email, body.action, updated.email
        ));

        ApiResponse::ok(200, "Action applied", &updated).map_err(ApiError::from)
    }

    async fn handle_list_users<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;
        let org_id = resolve_org_id(&actor, req, ctx)?;
        require_same_org(&actor, &org_id)?;

        let users = ctx.store.list_organization_users(&org_id).await?;
        ApiResponse::ok(200, "OK", &users).map_err(ApiError::from)
    }

    async fn handle_pending_users<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;
        let org_id = resolve_org_id(&actor, req, ctx)?;
        require_same_org(&actor, &org_id)?;

        let pending: Vec<_> = ctx
            .store
            .list_organization_users(&org_id)
            .await?
            .into_iter()
            .filter(|u| !u.is_approved && u.is_active)
            .collect();

        ApiResponse::ok(200, "OK", &pending).map_err(ApiError::from)
    }
}

#[async_trait]
impl<S: Store> Plugin<S> for AdminPlugin {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::post("/admin/users/{id}/action", "adminUserAction"),
            Route::get("/admin/users", "adminListUsers"),
            Route::get("/admin/users/pending", "adminPendingUsers"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Get, "/admin/users") => Ok(Some(self.handle_list_users(req, ctx).await?)),
            (HttpMethod::Get, "/admin/users/pending") => {
                Ok(Some(self.handle_pending_users(req, ctx).await?))
            }
            (HttpMethod::Post, path)
                if path.starts_with("/admin/users/") && path.ends_with("/action") =>
            {
                let inner = &path["/admin/users/".len()..path.len() - "/action".len()];
                if inner.is_empty() || inner.contains('/') {
                    return Ok(None);
                }
                Ok(Some(self.handle_action(req, ctx, inner).await?))
            }
            _ => Ok(None),
        }
    }
}
