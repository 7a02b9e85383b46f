#[cfg(feature = "axum")]
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
#[cfg(feature = "axum")]
use std::sync::Arc;

#[cfg(feature = "axum")]
use crate::App;
#[cfg(feature = "axum")]
use punchclock_core::{ApiError, ApiRequest, ApiResponse, HttpMethod, Store};

/// Integration trait for the Axum web framework.
#[cfg(feature = "axum")]
pub trait AxumIntegration<S: Store> {
    /// Create an Axum router exposing all mounted plugin routes.
    fn axum_router(self) -> Router<Arc<App<S>>>;
}

#[cfg(feature = "axum")]
impl<S: Store> AxumIntegration<S> for Arc<App<S>> {
    fn axum_router(self) -> Router<Arc<App<S>>> {
        let mut router = Router::new();

        router = router.route("/health", get(health_check));

        let base = self.config().base_path.trim_end_matches('/').to_string();
        for plugin in self.plugins() {
            for route in plugin.routes() {
                let path = format!("{}{}", base, route.path);
                let handler_fn = create_plugin_handler::<S>();
                match route.method {
                    HttpMethod::Get => {
                        router = router.route(&path, get(handler_fn.clone()));
                    }
                    HttpMethod::Post => {
                        router = router.route(&path, axum::routing::post(handler_fn.clone()));
                    }
                    HttpMethod::Put => {
                        router = router.route(&path, axum::routing::put(handler_fn.clone()));
                    }
                    HttpMethod::Delete => {
                        router = router.route(&path, axum::routing::delete(handler_fn.clone()));
                    }
                    HttpMethod::Patch => {
                        router = router.route(&path, axum::routing::patch(handler_fn.clone()));
                    }
                    _ => {} // Skip unsupported methods
                }
            }
        }

        router.with_state(self)
    }
}

#[cfg(feature = "axum")]
async fn health_check() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "service": "punchclock"
    }))
}

#[cfg(feature = "axum")]
fn create_plugin_handler<S: Store>() -> impl Fn(
    State<Arc<App<S>>>,
    Request,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Response> + Send>,
> + Clone {
    |State(app): State<Arc<App<S>>>, req: Request| {
        Box::pin(async move {
            match convert_axum_request(req).await {
                Ok(api_req) => match app.handle_request(api_req).await {
                    Ok(api_response) => convert_api_response(api_response),
                    Err(err) => convert_api_error(err),
                },
                Err(err) => convert_api_error(err),
            }
        })
    }
}

#[cfg(feature = "axum")]
async fn convert_axum_request(req: Request) -> Result<ApiRequest, ApiError> {
    use std::collections::HashMap;

    let (parts, body) = req.into_parts();

    let method = match parts.method {
        axum::http::Method::GET => HttpMethod::Get,
        axum::http::Method::POST => HttpMethod::Post,
        axum::http::Method::PUT => HttpMethod::Put,
        axum::http::Method::DELETE => HttpMethod::Delete,
        axum::http::Method::PATCH => HttpMethod::Patch,
        axum::http::Method::OPTIONS => HttpMethod::Options,
        axum::http::Method::HEAD => HttpMethod::Head,
        _ => return Err(ApiError::bad_request("Unsupported HTTP method")),
    };

    let mut headers = HashMap::new();
    for (name, value) in parts.headers.iter() {
        if let Ok(value_str) = value.to_str() {
            headers.insert(name.to_string(), value_str.to_string());
        }
    }

    let path = parts.uri.path().to_string();

    let mut query = HashMap::new();
    if let Some(query_str) = parts.uri.query() {
        for (key, value) in url::form_urlencoded::parse(query_str.as_bytes()) {
            query.insert(key.to_string(), value.to_string());
        }
    }

    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            if bytes.is_empty() {
                None
            } else {
                Some(bytes.to_vec())
            }
        }
        Err(_) => None,
    };

    Ok(ApiRequest {
        method,
        path,
        headers,
        body: body_bytes,
        query,
    })
}

#[cfg(feature = "axum")]
fn convert_api_response(api_response: ApiResponse) -> Response {
    let mut response = Response::builder().status(
        StatusCode::from_u16(api_response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    );

    for (name, value) in api_response.headers {
        if let (Ok(header_name), Ok(header_value)) = (
            axum::http::HeaderName::from_bytes(name.as_bytes()),
            axum::http::HeaderValue::from_str(&value),
        ) {
            response = response.header(header_name, header_value);
        }
    }

    response
        .body(axum::body::Body::from(api_response.body))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(axum::body::Body::from("Internal server error"))
                .unwrap()
        })
}

#[cfg(feature = "axum")]
fn convert_api_error(err: ApiError) -> Response {
    let status_code =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match err.status_code() {
        500..=u16::MAX => "Internal server error".to_string(),
        _ => err.to_string(),
    };

    let body = serde_json::json!({
        "success": false,
        "message": message
    });

    (status_code, axum::Json(body)).into_response()
}
