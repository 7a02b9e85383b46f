use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::Store;
use crate::config::AppConfig;
use crate::email::EmailProvider;
use crate::error::{ApiError, ApiResult};
use crate::logger::Logger;
use crate::media::MediaStore;
use crate::token::TokenManager;
use crate::types::{ApiRequest, ApiResponse, HttpMethod};
use crate::verify::IdVerifier;

/// Plugin trait that every feature area (auth, attendance, organizations,
/// admin, reports, verification) implements.
///
/// Generic over `S` so handlers work against any [`Store`] implementation.
#[async_trait]
pub trait Plugin<S: Store>: Send + Sync {
    /// Plugin name - should be unique
    fn name(&self) -> &'static str;

    /// Routes that this plugin handles
    fn routes(&self) -> Vec<Route>;

    /// Called when the plugin is initialized
    async fn on_init(&self, ctx: &mut Context<S>) -> ApiResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called for each request - return Some(response) to handle, None to pass through
    async fn on_request(&self, req: &ApiRequest, ctx: &Context<S>)
        -> ApiResult<Option<ApiResponse>>;
}

/// Route definition for plugins
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub method: HttpMethod,
    /// Identifier used as the OpenAPI `operationId` for this route.
    pub operation_id: String,
}

impl Route {
    pub fn new(method: HttpMethod, path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: operation_id.into(),
        }
    }

    pub fn get(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, operation_id)
    }

    pub fn post(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path, operation_id)
    }

    pub fn put(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path, operation_id)
    }

    pub fn delete(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, operation_id)
    }
}

/// Context passed to plugin methods
pub struct Context<S: Store> {
    pub config: Arc<AppConfig>,
    pub store: Arc<S>,
    pub tokens: Arc<TokenManager>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl<S: Store> Context<S> {
    pub fn new(config: Arc<AppConfig>, store: Arc<S>) -> Self {
        let tokens = Arc::new(TokenManager::new(config.clone()));
        Self {
            config,
            store,
            tokens,
            metadata: HashMap::new(),
        }
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn logger(&self) -> &dyn Logger {
        self.config.logger.as_ref()
    }

    /// Get the email provider, if one is configured. Callers log and move
    /// on when it is absent.
    pub fn email_provider(&self) -> Option<&dyn EmailProvider> {
        self.config.email_provider.as_deref()
    }

    /// Get the media store, if one is configured.
    pub fn media_store(&self) -> Option<&dyn MediaStore> {
        self.config.media_store.as_deref()
    }

    /// Get the identity verifier, returning an error if none is configured.
    /// Unlike email and media, verification cannot degrade gracefully.
    pub fn id_verifier(&self) -> ApiResult<&dyn IdVerifier> {
        self.config
            .id_verifier
            .as_deref()
            .ok_or_else(|| ApiError::config("No identity verifier configured"))
    }
}
