#![allow(dead_code)]
//! Shared harness for integration tests.
//!
//! Builds a full application against the in-memory store with the
//! deterministic verifier and a capturing email provider, then drives it
//! through `handle_request` the way an HTTP binding would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use punchclock::plugins::{
    AdminPlugin, AttendancePlugin, AuthPlugin, IdVerifyPlugin, OrganizationPlugin, ReportsPlugin,
};
use punchclock::{
    ApiRequest, ApiResponse, ApiResult, App, AppBuilder, AppConfig, EmailProvider, HttpMethod,
    MemoryStore, MockIdVerifier, NoopMediaStore, RateLimitConfig,
};

static EMAIL_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const PASSWORD: &str = "correct-horse-9";

pub fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}@example.com",
        prefix,
        EMAIL_COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

/// Email provider that records every message for later inspection.
#[derive(Default)]
pub struct CapturingEmailProvider {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
impl EmailProvider for CapturingEmailProvider {
    async fn send(&self, to: &str, subject: &str, _html: &str, text: &str) -> ApiResult<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

impl CapturingEmailProvider {
    pub fn last_to(&self, to: &str) -> Option<SentEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::new("integration-test-secret-key-at-least-32-chars")
        .media_store(Arc::new(NoopMediaStore))
        .id_verifier(Arc::new(MockIdVerifier))
}

pub async fn build_app() -> App<MemoryStore> {
    build_app_with(test_config()).await
}

pub async fn build_app_with(config: AppConfig) -> App<MemoryStore> {
    AppBuilder::new(config)
        .store(MemoryStore::new())
        .rate_limit(RateLimitConfig::new().enabled(false))
        .plugin(AuthPlugin::new())
        .plugin(AttendancePlugin::new())
        .plugin(OrganizationPlugin::new())
        .plugin(AdminPlugin::new())
        .plugin(ReportsPlugin::new())
        .plugin(IdVerifyPlugin::new())
        .build()
        .await
        .expect("test app should build")
}

pub fn request(method: HttpMethod, path: &str) -> ApiRequest {
    ApiRequest::new(method, format!("/api{}", path))
}

pub fn json_request(method: HttpMethod, path: &str, body: &Value) -> ApiRequest {
    let mut req = request(method, path);
    req.body = Some(body.to_string().into_bytes());
    req.headers
        .insert("content-type".to_string(), "application/json".to_string());
    req
}

pub fn with_query(mut req: ApiRequest, key: &str, value: &str) -> ApiRequest {
    req.query.insert(key.to_string(), value.to_string());
    req
}

pub fn with_auth(mut req: ApiRequest, token: &str) -> ApiRequest {
    req.headers
        .insert("authorization".to_string(), format!("Bearer {}", token));
    req
}

pub async fn send(app: &App<MemoryStore>, req: ApiRequest) -> (u16, Value) {
    let response: ApiResponse = app.handle_request(req).await.expect("request handled");
    let body: Value = if response.body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&response.body).expect("JSON response body")
    };
    (response.status, body)
}

/// A registered organization with its first admin logged in.
pub struct OrgFixture {
    pub admin_token: String,
    pub admin_id: String,
    pub admin_email: String,
    pub org_id: String,
    pub invite_code: String,
}

pub async fn register_org(app: &App<MemoryStore>, name: &str) -> OrgFixture {
    let email = unique_email("admin");
    let (status, body) = send(
        app,
        json_request(
            HttpMethod::Post,
            "/auth/register-organization",
            &json!({
                "organizationName": name,
                "firstName": "Ada",
                "lastName": "Admin",
                "email": email,
                "password": PASSWORD,
            }),
        ),
    )
    .await;
    assert_eq!(status, 201, "organization registration failed: {}", body);

    OrgFixture {
        admin_token: body["data"]["token"].as_str().unwrap().to_string(),
        admin_id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        admin_email: email,
        org_id: body["data"]["organization"]["id"].as_str().unwrap().to_string(),
        invite_code: body["data"]["organization"]["inviteCode"]
            .as_str()
            .unwrap()
            .to_string(),
    }
}

/// Register an employee via invite code; the account comes back pending.
pub async fn register_employee(
    app: &App<MemoryStore>,
    invite_code: &str,
    email: &str,
) -> String {
    let (status, body) = send(
        app,
        json_request(
            HttpMethod::Post,
            "/auth/register",
            &json!({
                "firstName": "Eve",
                "lastName": "Employee",
                "email": email,
                "password": PASSWORD,
                "employeeId": format!("E-{}", EMAIL_COUNTER.fetch_add(1, Ordering::SeqCst)),
                "inviteCode": invite_code,
            }),
        ),
    )
    .await;
    assert_eq!(status, 201, "employee registration failed: {}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

pub async fn admin_action(
    app: &App<MemoryStore>,
    admin_token: &str,
    user_id: &str,
    action: &str,
) -> (u16, Value) {
    send(
        app,
        with_auth(
            json_request(
                HttpMethod::Post,
                &format!("/admin/users/{}/action", user_id),
                &json!({ "action": action }),
            ),
            admin_token,
        ),
    )
    .await
}

pub async fn login(app: &App<MemoryStore>, email: &str, password: &str) -> (u16, Value) {
    send(
        app,
        json_request(
            HttpMethod::Post,
            "/auth/login",
            &json!({ "email": email, "password": password }),
        ),
    )
    .await
}

/// Register, approve, and log in an employee, returning `(token, user_id)`.
pub async fn onboard_employee(app: &App<MemoryStore>, fixture: &OrgFixture) -> (String, String) {
    let email = unique_email("employee");
    let user_id = register_employee(app, &fixture.invite_code, &email).await;

    let (status, body) = admin_action(app, &fixture.admin_token, &user_id, "approve").await;
    assert_eq!(status, 200, "approval failed: {}", body);

    let (status, body) = login(app, &email, PASSWORD).await;
    assert_eq!(status, 200, "employee login failed: {}", body);
    (
        body["data"]["token"].as_str().unwrap().to_string(),
        user_id,
    )
}

/// Seed a platform operator account directly in the store and log it in.
/// No public route creates super-admins.
pub async fn create_super_admin(app: &App<MemoryStore>) -> String {
    use punchclock::{hash_password, CreateUser, Role, UserOps};

    let email = unique_email("root");
    let create = CreateUser::new("Root", "Operator", &email, "ROOT-1")
        .with_password_hash(hash_password(PASSWORD).expect("hash"))
        .with_role(Role::SuperAdmin)
        .approved();
    app.store().create_user(create).await.expect("seed super admin");

    let (status, body) = login(app, &email, PASSWORD).await;
    assert_eq!(status, 200, "super admin login failed: {}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Turn on offline attendance for an organization via the admin API.
pub async fn enable_offline(app: &App<MemoryStore>, fixture: &OrgFixture) {
    let (status, body) = send(
        app,
        with_auth(
            json_request(
                HttpMethod::Put,
                &format!("/organizations/{}", fixture.org_id),
                &json!({
                    "settings": {
                        "workStart": "09:00:00",
                        "workEnd": "18:00:00",
                        "workingDays": ["mon", "tue", "wed", "thu", "fri"],
                        "timezone": "UTC",
                        "lateThresholdMinutes": 15,
                        "requireFace": false,
                        "allowOffline": true,
                    }
                }),
            ),
            &fixture.admin_token,
        ),
    )
    .await;
    assert_eq!(status, 200, "enabling offline attendance failed: {}", body);
}

/// Mark an offline attendance event at a fixed timestamp.
pub async fn mark_offline(
    app: &App<MemoryStore>,
    token: &str,
    event_type: &str,
    timestamp: &str,
) -> (u16, Value) {
    send(
        app,
        with_auth(
            json_request(
                HttpMethod::Post,
                "/attendance/mark",
                &json!({
                    "eventType": event_type,
                    "isOffline": true,
                    "offlineTimestamp": timestamp,
                }),
            ),
            token,
        ),
    )
    .await
}
