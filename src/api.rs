//! REST API of the resolution service.
//!
//! Exposes the resolution chain over HTTP. Uses Axum as the web framework,
//! supports CORS and traces every request.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::chain::ResolutionChain;
use crate::config::ApiConfig;
use crate::error::ResolutionError;
use crate::model::{MinimalPackaging, RequestedItem};
use crate::products::ProductRegistry;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    products: ProductRegistry,
    chain: ResolutionChain,
}

impl AppState {
    pub fn new(products: ProductRegistry, chain: ResolutionChain) -> Self {
        Self { products, chain }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>packwise API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request body of the minimal packaging endpoint.
#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "products": [
        { "id": 1, "width": 1.1, "height": 2.2, "length": 3.3, "weight": 4.0 },
        { "id": 2, "width": 3.3, "height": 1.1, "length": 2.2, "weight": 4.0 }
    ]
}))]
pub struct MinimalPackagingRequest {
    pub products: Vec<RequestedItem>,
}

/// The packaging chosen for a product set.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PackagingBody {
    pub id: u64,
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub max_weight: f64,
    /// Fraction of the packaging volume in use, rounded to two decimals.
    pub volume_utilization: f64,
}

impl From<&MinimalPackaging> for PackagingBody {
    fn from(result: &MinimalPackaging) -> Self {
        let packaging = result.packaging();
        Self {
            id: packaging.id.get(),
            width: packaging.width,
            height: packaging.height,
            length: packaging.length,
            max_weight: packaging.max_weight,
            volume_utilization: result.volume_utilization(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MinimalPackagingResponse {
    pub minimal_packaging: PackagingBody,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            details,
        }),
    )
        .into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "Invalid JSON data",
        Some(err.body_text()),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "Invalid input data",
        Some(details.into()),
    )
}

fn resolution_error(err: ResolutionError) -> Response {
    match err {
        ResolutionError::InvalidInput(details) => validation_error(details),
        ResolutionError::EngineInconsistency(_) => {
            error!(code = err.code(), error = %err, "resolution aborted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Packing engine inconsistency",
                Some(err.to_string()),
            )
        }
        ResolutionError::Infrastructure(_) => {
            error!(code = err.code(), error = %err, "resolution aborted");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                None,
            )
        }
    }
}

fn parse_request(
    payload: Result<Json<MinimalPackagingRequest>, JsonRejection>,
) -> Result<Vec<RequestedItem>, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;

    if payload.products.is_empty() {
        return Err(validation_error("At least one product is required."));
    }
    for item in &payload.products {
        item.validate()
            .map_err(|err| validation_error(format!("Product {}: {}", item.id, err)))?;
    }
    Ok(payload.products)
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_minimal_packaging, handle_health),
    components(
        schemas(
            MinimalPackagingRequest,
            RequestedItem,
            MinimalPackagingResponse,
            PackagingBody,
            HealthResponse,
            ErrorResponse
        )
    ),
    tags((name = "packaging", description = "Minimal packaging resolution"))
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/minimal-packaging", post(handle_minimal_packaging))
        .route("/health", get(handle_health))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until the process is stopped.
pub async fn start_api_server(config: &ApiConfig, state: AppState) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("local access: http://localhost:{}", config.port());
    }
    info!("endpoints: POST /minimal-packaging, GET /health, GET /docs");

    axum::serve(listener, router(state)).await
}

/// Handler for POST /minimal-packaging.
///
/// Deduplicates the requested items into products and resolves the smallest
/// single packaging that holds all of them.
#[utoipa::path(
    post,
    path = "/minimal-packaging",
    request_body = MinimalPackagingRequest,
    responses(
        (status = 200, description = "Minimal packaging found", body = MinimalPackagingResponse),
        (status = BAD_REQUEST, description = "Invalid request", body = ErrorResponse),
        (status = NOT_FOUND, description = "No single packaging holds all products", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Packing backends disagree with the catalog", body = ErrorResponse),
        (status = SERVICE_UNAVAILABLE, description = "Storage unavailable", body = ErrorResponse)
    ),
    tag = "packaging"
)]
async fn handle_minimal_packaging(
    State(state): State<AppState>,
    payload: Result<Json<MinimalPackagingRequest>, JsonRejection>,
) -> Response {
    let items = match parse_request(payload) {
        Ok(items) => items,
        Err(response) => return response,
    };
    info!(items = items.len(), "minimal packaging requested");

    let products = match state.products.normalize(&items).await {
        Ok(products) => products,
        Err(err) => return resolution_error(err),
    };

    match state.chain.resolve(&products).await {
        Ok(Some(result)) => (
            StatusCode::OK,
            Json(MinimalPackagingResponse {
                minimal_packaging: PackagingBody::from(&result),
            }),
        )
            .into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "No possible minimal packaging found.",
            None,
        ),
        Err(err) => resolution_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "packaging"
)]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
