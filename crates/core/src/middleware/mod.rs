pub mod rate_limit;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::types::{ApiRequest, ApiResponse};

pub use rate_limit::{EndpointRateLimit, RateLimitConfig, RateLimitMiddleware};

/// Request/response hook running around plugin dispatch.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Runs before dispatch. Returning `Ok(Some(response))` short-circuits
    /// the request; `Ok(None)` lets it continue down the chain.
    async fn before_request(&self, req: &ApiRequest) -> ApiResult<Option<ApiResponse>>;

    /// Runs after a response exists and may rewrite it. Defaults to a
    /// pass-through.
    async fn after_request(
        &self,
        _req: &ApiRequest,
        response: ApiResponse,
    ) -> ApiResult<ApiResponse> {
        Ok(response)
    }
}

/// Run every before-hook in order, stopping at the first short-circuit.
pub async fn run_before(
    middlewares: &[Box<dyn Middleware>],
    req: &ApiRequest,
) -> ApiResult<Option<ApiResponse>> {
    for mw in middlewares {
        if let Some(response) = mw.before_request(req).await? {
            return Ok(Some(response));
        }
    }
    Ok(None)
}

/// Run the after-hooks innermost-first, i.e. in reverse registration order.
pub async fn run_after(
    middlewares: &[Box<dyn Middleware>],
    req: &ApiRequest,
    mut response: ApiResponse,
) -> ApiResult<ApiResponse> {
    for mw in middlewares.iter().rev() {
        response = mw.after_request(req, response).await?;
    }
    Ok(response)
}
