//! REST API for the load planning service.
//!
//! Provides HTTP endpoints for the dashboard frontend.
//! Uses Axum as the web framework and supports CORS.

use std::convert::Infallible;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PackingLimits};
use crate::fleet::FleetRegistry;
use crate::model::{CargoItem, Dimensions, PackError, Placement, Truck};
use crate::optimizer::{LoadMetrics, LoadResult, pack_truck, pack_truck_with_progress};

/// Shared state of all handlers.
#[derive(Clone)]
pub struct ApiState {
    registry: Arc<FleetRegistry>,
    limits: PackingLimits,
}

impl ApiState {
    pub fn new(registry: FleetRegistry, limits: PackingLimits) -> Self {
        Self {
            registry: Arc::new(registry),
            limits,
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>truckload API Docs</title>
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
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
///
/// An inline `truck` wins over `truck_id`. Without either, the catalog's
/// default truck is loaded.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "truck_id": "tata-407",
        "items": [
            {
                "id": "pallet-a",
                "name": "Euro pallet",
                "quantity": 4,
                "dimensions": { "length": 120.0, "width": 80.0, "height": 100.0 }
            }
        ]
    })
)]
pub struct PackRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub truck_id: Option<String>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub truck: Option<Truck>,
    pub items: Vec<CargoItem>,
}

impl PackRequest {
    /// Units the request expands to.
    fn unit_count(&self) -> usize {
        self.items
            .iter()
            .fold(0usize, |acc, item| acc.saturating_add(item.unit_count()))
    }

    /// Resolves the truck and checks the request against the limits.
    fn resolve(self, state: &ApiState) -> Result<(Truck, Vec<CargoItem>), ApiError> {
        let requested = self.unit_count();
        if requested > state.limits.max_units {
            return Err(ApiError::TooManyUnits {
                requested,
                limit: state.limits.max_units,
            });
        }

        let truck = match (self.truck, self.truck_id) {
            (Some(truck), _) => truck,
            (None, Some(id)) => state
                .registry
                .get(&id)
                .cloned()
                .ok_or(ApiError::UnknownTruck(id))?,
            (None, None) => state
                .registry
                .default_truck()
                .cloned()
                .ok_or(ApiError::NoTruckAvailable)?,
        };

        Ok((truck, self.items))
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Errors returned by the handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON data: {0}")]
    InvalidJson(#[from] JsonRejection),
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error("Unknown truck '{0}'")]
    UnknownTruck(String),
    #[error("No truck available in the fleet catalog")]
    NoTruckAvailable,
    #[error("Request expands to {requested} units, at most {limit} are allowed")]
    TooManyUnits { requested: usize, limit: usize },
    #[error("Packing worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = self.to_string();
        let (status, error) = match &self {
            ApiError::InvalidJson(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Invalid JSON data"),
            ApiError::Pack(PackError::InvalidContainer(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid container configuration",
            ),
            ApiError::TooManyUnits { .. } | ApiError::Pack(PackError::TooManyUnits { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Too many units")
            }
            ApiError::Pack(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Invalid input data"),
            ApiError::UnknownTruck(_) | ApiError::NoTruckAvailable => {
                (StatusCode::NOT_FOUND, "Unknown truck")
            }
            ApiError::Worker(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        (status, Json(ErrorResponse::new(error, details))).into_response()
    }
}

fn parse_pack_request(
    state: &ApiState,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<(Truck, Vec<CargoItem>), ApiError> {
    let Json(request) = payload?;
    request.resolve(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, list_trucks, get_truck, health),
    components(
        schemas(
            PackRequest,
            LoadResult,
            LoadMetrics,
            Placement,
            CargoItem,
            Truck,
            Dimensions,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "packing", description = "Endpoints for truck load optimization"),
        (name = "fleet", description = "Truck catalog")
    )
)]
struct ApiDoc;

/// Builds the application router.
pub fn build_router(state: ApiState, docs_enabled: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/trucks", get(list_trucks))
        .route("/trucks/{id}", get(get_truck))
        .route("/health", get(health));

    if docs_enabled {
        router = router
            .route("/docs/openapi.json", get(serve_openapi_json))
            .route("/docs", get(serve_openapi_ui));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<()> {
    let app = build_router(state, config.docs_enabled());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind API server to {addr}"))?;

    let display_host = config.display_host().to_string();
    info!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API endpoints: POST /pack, POST /pack_stream, GET /trucks, GET /health");
    if config.docs_enabled() {
        info!("📑 Documentation: GET /docs, GET /docs/openapi.json");
    }

    axum::serve(listener, app)
        .await
        .context("API server terminated with an error")
}

/// Handler for POST /pack endpoint.
///
/// Loads the given items into one truck.
///
/// # Returns
/// JSON `LoadResult` with placements, unplaced units and utilization
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Load plan computed", body = LoadResult),
        (status = NOT_FOUND, description = "Unknown truck id", body = ErrorResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        ),
        (
            status = INTERNAL_SERVER_ERROR,
            description = "Packing worker failed",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<Json<LoadResult>, ApiError> {
    let (truck, items) = parse_pack_request(&state, payload)?;

    info!(
        "📥 New pack request: {} items for truck '{}'",
        items.len(),
        truck.id
    );
    let result = tokio::task::spawn_blocking(move || pack_truck(&truck, &items)).await??;
    info!(
        "📦 Result: {} placed, {} unplaced, {:.1}% volume used",
        result.placed_count(),
        result.unplaced_count(),
        result.volume_utilization
    );

    Ok(Json(result))
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
/// The frontend can animate the placements without waiting for the complete result.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = NOT_FOUND, description = "Unknown truck id", body = ErrorResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (truck, items) = parse_pack_request(&state, payload)?;
    truck.validate()?;

    let (tx, rx) = mpsc::channel::<String>(state.limits.stream_buffer);

    tokio::task::spawn_blocking(move || {
        let outcome = pack_truck_with_progress(&truck, &items, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // Receiver has closed the stream; remaining events are discarded.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = outcome {
            warn!("⚠️ Streaming pack failed: {err}");
        }
    });

    let stream =
        ReceiverStream::new(rx).map(|msg| Ok::<_, Infallible>(Event::default().data(msg)));
    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response())
}

/// Handler for GET /trucks endpoint.
#[utoipa::path(
    get,
    path = "/trucks",
    responses((status = 200, description = "Fleet catalog", body = [Truck])),
    tag = "fleet"
)]
async fn list_trucks(State(state): State<ApiState>) -> Json<Vec<Truck>> {
    Json(state.registry.trucks().to_vec())
}

/// Handler for GET /trucks/{id} endpoint.
#[utoipa::path(
    get,
    path = "/trucks/{id}",
    params(("id" = String, Path, description = "Truck id")),
    responses(
        (status = 200, description = "Truck found", body = Truck),
        (status = NOT_FOUND, description = "Unknown truck id", body = ErrorResponse)
    ),
    tag = "fleet"
)]
async fn get_truck(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Truck>, ApiError> {
    state
        .registry
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::UnknownTruck(id))
}

/// Handler for GET /health endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "fleet"
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
