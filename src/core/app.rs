use std::sync::Arc;

use punchclock_core::middleware::{self, Middleware, RateLimitConfig, RateLimitMiddleware};
use punchclock_core::{
    ApiError, ApiRequest, ApiResponse, ApiResult, AppConfig, Context, EmailProvider, IdVerifier,
    MediaStore, Plugin, Store,
};

/// The assembled punchclock application, generic over the store backend.
///
/// Owns the plugin list, the middleware chain, and the shared context.
/// Requests come in as framework-agnostic [`ApiRequest`] values; the
/// `axum` feature provides the HTTP binding.
pub struct App<S: Store> {
    config: Arc<AppConfig>,
    plugins: Vec<Box<dyn Plugin<S>>>,
    middlewares: Vec<Box<dyn Middleware>>,
    store: Arc<S>,
    context: Context<S>,
}

/// Initial builder. Call `.store(..)` to obtain a [`TypedAppBuilder`]
/// that accepts plugins.
pub struct AppBuilder {
    config: AppConfig,
    rate_limit_config: Option<RateLimitConfig>,
    custom_middlewares: Vec<Box<dyn Middleware>>,
}

/// Typed builder returned by [`AppBuilder::store`].
pub struct TypedAppBuilder<S: Store> {
    config: AppConfig,
    store: Arc<S>,
    plugins: Vec<Box<dyn Plugin<S>>>,
    rate_limit_config: Option<RateLimitConfig>,
    custom_middlewares: Vec<Box<dyn Middleware>>,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            rate_limit_config: None,
            custom_middlewares: Vec::new(),
        }
    }

    /// Set the store backend, returning a [`TypedAppBuilder`].
    pub fn store<S: Store>(self, store: S) -> TypedAppBuilder<S> {
        TypedAppBuilder {
            config: self.config,
            store: Arc::new(store),
            plugins: Vec::new(),
            rate_limit_config: self.rate_limit_config,
            custom_middlewares: self.custom_middlewares,
        }
    }

    /// Configure rate limiting.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = Some(config);
        self
    }

    /// Set the email provider.
    pub fn email_provider<E: EmailProvider + 'static>(mut self, provider: E) -> Self {
        self.config.email_provider = Some(Arc::new(provider));
        self
    }
}

impl<S: Store> TypedAppBuilder<S> {
    /// Mount a plugin.
    pub fn plugin<P: Plugin<S> + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Configure rate limiting.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = Some(config);
        self
    }

    /// Set the email provider.
    pub fn email_provider<E: EmailProvider + 'static>(mut self, provider: E) -> Self {
        self.config.email_provider = Some(Arc::new(provider));
        self
    }

    /// Set the media store for check-in photos and face images.
    pub fn media_store<M: MediaStore + 'static>(mut self, store: M) -> Self {
        self.config.media_store = Some(Arc::new(store));
        self
    }

    /// Set the national-ID verifier.
    pub fn id_verifier<V: IdVerifier + 'static>(mut self, verifier: V) -> Self {
        self.config.id_verifier = Some(Arc::new(verifier));
        self
    }

    /// Add a custom middleware.
    pub fn middleware<M: Middleware + 'static>(mut self, mw: M) -> Self {
        self.custom_middlewares.push(Box::new(mw));
        self
    }

    /// Build the application.
    pub async fn build(self) -> ApiResult<App<S>> {
        self.config.validate()?;

        let config = Arc::new(self.config);
        let store = self.store;

        let mut context = Context::new(config.clone(), store.clone());
        for plugin in &self.plugins {
            plugin.on_init(&mut context).await?;
        }

        // Rate limiting runs ahead of any custom middleware.
        let mut middlewares: Vec<Box<dyn Middleware>> = vec![Box::new(RateLimitMiddleware::new(
            self.rate_limit_config.unwrap_or_default(),
        ))];
        middlewares.extend(self.custom_middlewares);

        Ok(App {
            config,
            plugins: self.plugins,
            middlewares,
            store,
            context,
        })
    }
}

impl<S: Store> App<S> {
    /// Create a new application builder.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(config: AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Handle one request.
    ///
    /// Plugin errors are converted to the standard JSON envelope via
    /// [`ApiError::into_response`]; the after-request middleware chain runs
    /// on every outcome, including errors.
    pub async fn handle_request(&self, mut req: ApiRequest) -> ApiResult<ApiResponse> {
        self.strip_base_path(&mut req);

        match self.handle_request_inner(&req).await {
            Ok(response) => middleware::run_after(&self.middlewares, &req, response).await,
            Err(err) => {
                if err.status_code() >= 500 {
                    self.config
                        .logger
                        .error(&format!("{} {:?}: {}", req.path, req.method, err));
                }
                let response = err.into_response();
                middleware::run_after(&self.middlewares, &req, response).await
            }
        }
    }

    async fn handle_request_inner(&self, req: &ApiRequest) -> ApiResult<ApiResponse> {
        if let Some(response) = middleware::run_before(&self.middlewares, req).await? {
            return Ok(response);
        }

        for plugin in &self.plugins {
            if let Some(response) = plugin.on_request(req, &self.context).await? {
                return Ok(response);
            }
        }

        Err(ApiError::not_found("No handler found for this request"))
    }

    /// Plugins match paths without the mount prefix.
    fn strip_base_path(&self, req: &mut ApiRequest) {
        let base = &self.config.base_path;
        if !base.is_empty() && base != "/" {
            if let Some(rest) = req.path.strip_prefix(base.as_str()) {
                if rest.is_empty() {
                    req.path = "/".to_string();
                } else if rest.starts_with('/') {
                    req.path = rest.to_string();
                }
            }
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// All routes across mounted plugins, for router integration.
    pub fn routes(&self) -> Vec<(String, &dyn Plugin<S>)> {
        let mut routes = Vec::new();
        for plugin in &self.plugins {
            for route in plugin.routes() {
                routes.push((route.path, plugin.as_ref()));
            }
        }
        routes
    }

    pub fn plugins(&self) -> &[Box<dyn Plugin<S>>] {
        &self.plugins
    }

    pub fn get_plugin(&self, name: &str) -> Option<&dyn Plugin<S>> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}
