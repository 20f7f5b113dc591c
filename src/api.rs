//! REST API for the packing engine.
//!
//! Thin adapter over the library: requests carry quantity-tagged selections,
//! responses carry packed boxes, metrics and suggestions as plain JSON.
//! Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineConfig};
use crate::metrics::{ContainerTally, Metrics};
use crate::model::{ContainerType, Item, ValidationError};
use crate::optimizer::{PackEvent, PackingResult, pack_items, pack_items_with_progress};
use crate::store::{Selection, SelectionStore};
use crate::suggestions::{RejectReason, Suggestion, SuggestionReport};

#[derive(Clone)]
struct ApiState {
    engine: Arc<EngineConfig>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
///
/// Selections with the same item id are merged; the first record wins.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "item": { "id": "book", "label": "Book", "dims": [25.0, 18.0, 4.0], "weight": 0.8 }, "quantity": 1 },
            { "item": { "id": "mug", "label": "Mug", "dims": [12.0, 9.0, 10.0], "weight": 0.4 }, "quantity": 1 }
        ]
    })
)]
pub struct PackRequest {
    pub items: Vec<Selection>,
}

/// Request structure for the suggestion endpoint.
#[derive(Deserialize, ToSchema)]
pub struct SuggestionRequest {
    pub cart: Vec<Selection>,
    #[serde(default)]
    pub deferred: Vec<Selection>,
}

fn validate_selections(selections: &[Selection]) -> Result<(), ValidationError> {
    selections.iter().try_for_each(|s| s.item.validate())
}

impl PackRequest {
    fn into_store(self) -> Result<SelectionStore, ValidationError> {
        validate_selections(&self.items)?;
        let mut store = SelectionStore::new();
        for selection in self.items {
            store.add_to_cart(selection.item, selection.quantity);
        }
        Ok(store)
    }
}

impl SuggestionRequest {
    fn into_store(self) -> Result<SelectionStore, ValidationError> {
        validate_selections(&self.cart)?;
        validate_selections(&self.deferred)?;
        let mut store = SelectionStore::new();
        for selection in self.cart {
            store.add_to_cart(selection.item, selection.quantity);
        }
        for selection in self.deferred {
            store.add_to_deferred(selection.item, selection.quantity);
        }
        Ok(store)
    }
}

/// Response structure with all packed boxes and their metrics.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub results: Vec<PackedBox>,
    pub unpackable: Vec<UnpackableEntry>,
    pub is_complete: bool,
    pub metrics: Metrics,
    /// e.g. `"2x Medium, 1x Small"`
    pub breakdown_label: String,
}

/// Single box with its contents.
///
/// # Fields
/// * `id` - Box number (1-based)
/// * `name` - Container type name
/// * `fill_percent` - Filled volume over box volume
#[derive(Serialize, ToSchema)]
pub struct PackedBox {
    pub id: usize,
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([25.0, 20.0, 12.0]))]
    pub dims: (f64, f64, f64),
    pub volume: f64,
    pub max_weight: f64,
    pub filled_volume: f64,
    pub total_weight: f64,
    pub fill_percent: f64,
    pub items: Vec<Item>,
}

#[derive(Serialize, ToSchema)]
pub struct UnpackableEntry {
    pub item: Item,
    pub reason_code: String,
    pub reason: String,
}

/// Response of the suggestion endpoint.
#[derive(Serialize, ToSchema)]
pub struct SuggestionResponse {
    pub packing: PackResponse,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(err: ValidationError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        err.to_string(),
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<SelectionStore, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_store().map_err(validation_error)
}

impl PackResponse {
    /// Creates a PackResponse from a packing result and its metrics.
    pub fn from_packing_result(result: PackingResult, metrics: Metrics) -> Self {
        let is_complete = result.is_complete();
        let PackingResult {
            containers,
            unpackable,
        } = result;

        Self {
            results: containers
                .into_iter()
                .enumerate()
                .map(|(i, packed)| {
                    let ContainerType {
                        name,
                        dims,
                        volume,
                        max_weight,
                        ..
                    } = packed.container().clone();

                    PackedBox {
                        id: i + 1,
                        name,
                        dims,
                        volume,
                        max_weight,
                        filled_volume: packed.filled_volume(),
                        total_weight: packed.total_weight(),
                        fill_percent: packed.fill_percent(),
                        items: packed.items().to_vec(),
                    }
                })
                .collect(),
            unpackable: unpackable
                .into_iter()
                .map(|entry| UnpackableEntry {
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                    item: entry.item,
                })
                .collect(),
            is_complete,
            breakdown_label: metrics.breakdown_label(),
            metrics,
        }
    }
}

impl SuggestionResponse {
    pub fn from_report(report: SuggestionReport) -> Self {
        let SuggestionReport {
            packing,
            metrics,
            suggestions,
        } = report;
        Self {
            packing: PackResponse::from_packing_result(packing, metrics),
            suggestions,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_catalog, handle_pack, handle_pack_stream, handle_suggestions),
    components(
        schemas(
            PackRequest,
            SuggestionRequest,
            Selection,
            Item,
            ContainerType,
            PackResponse,
            PackedBox,
            UnpackableEntry,
            SuggestionResponse,
            Suggestion,
            RejectReason,
            Metrics,
            ContainerTally,
            PackEvent,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for packing and folding suggestions"))
)]
struct ApiDoc;

fn router(engine: EngineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        engine: Arc::new(engine),
    };

    Router::new()
        .route("/catalog", get(handle_catalog))
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/suggestions", post(handle_suggestions))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
///
/// Configures CORS for cross-origin requests from the frontend.
pub async fn start_api_server(config: ApiConfig, engine: EngineConfig) -> std::io::Result<()> {
    if let Some(largest) = engine.catalog().largest() {
        info!(
            "📦 Catalog: {} container types, largest {} ({:?}, {} kg)",
            engine.catalog().len(),
            largest.name,
            largest.dims,
            largest.max_weight
        );
    }

    let app = router(engine);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: GET /catalog, POST /pack, POST /pack_stream, POST /suggestions");
    info!("📑 Documentation: GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for GET /catalog.
#[utoipa::path(
    get,
    path = "/catalog",
    responses((status = 200, description = "Active container catalog, smallest first", body = [ContainerType])),
    tag = "packing"
)]
async fn handle_catalog(State(state): State<ApiState>) -> impl IntoResponse {
    let entries: Vec<ContainerType> = state.engine.catalog().ascending().cloned().collect();
    Json(entries)
}

/// Handler for POST /pack endpoint.
///
/// Packs the requested units and reports metrics plus any unpackable units.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Successfully packed items", body = PackResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let store = match parse_pack_request(payload) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let units = store.cart_units();
    info!("📥 New pack request: {} units", units.len());

    let catalog = state.engine.catalog();
    let result = pack_items(&units, catalog);
    let metrics = Metrics::for_result(&result, &units, catalog);
    if !result.is_complete() {
        warn!("⚠️ {} units could not be packed", result.unpackable_count());
    }
    info!(
        "📦 Result: {} ({:.1}% efficiency, {:.3} kg CO2e)",
        metrics.breakdown_label(),
        metrics.efficiency_percent,
        metrics.carbon_impact_kg
    );

    let response = PackResponse::from_packing_result(result, metrics);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams packing events as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let store = match parse_pack_request(payload) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let units = store.cart_units();
    let engine = Arc::clone(&state.engine);
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        pack_items_with_progress(&units, engine.catalog(), |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /suggestions.
///
/// Packs the cart and reports which deferred items could ride along.
#[utoipa::path(
    post,
    path = "/suggestions",
    request_body = SuggestionRequest,
    responses(
        (status = 200, description = "Baseline packing and folding suggestions", body = SuggestionResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_suggestions(
    State(state): State<ApiState>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Response {
    let store = match payload {
        Ok(Json(request)) => match request.into_store() {
            Ok(store) => store,
            Err(err) => return validation_error(err),
        },
        Err(err) => return json_deserialize_error(err),
    };

    info!(
        "📥 New suggestion request: {} cart types, {} deferred types",
        store.cart().len(),
        store.deferred().len()
    );
    let report = store.evaluate(state.engine.catalog(), &state.engine.suggestion_config());
    info!(
        "💡 {} suggestions ({} foldable)",
        report.suggestions.len(),
        report.suggestions.iter().filter(|s| s.is_foldable()).count()
    );

    (StatusCode::OK, Json(SuggestionResponse::from_report(report))).into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    fn state() -> ApiState {
        ApiState {
            engine: Arc::new(EngineConfig::default()),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn selection(id: &str, dims: (f64, f64, f64), weight: f64, quantity: u32) -> Selection {
        Selection {
            item: Item {
                id: id.to_string(),
                label: id.to_string(),
                dims,
                weight,
            },
            quantity,
        }
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/catalog", "/pack", "/pack_stream", "/suggestions"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["PackRequest", "PackResponse", "Suggestion", "ErrorResponse"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn suggestion_request_defaults_to_empty_pool() {
        let json = r#"{
            "cart": [{"item": {"id": "mug", "label": "Mug", "dims": [12.0, 9.0, 10.0], "weight": 0.4}, "quantity": 2}]
        }"#;
        let request: SuggestionRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(request.deferred.is_empty());
        let store = request.into_store().unwrap();
        assert_eq!(store.cart_units().len(), 2);
    }

    #[test]
    fn pack_request_rejects_invalid_items() {
        let request = PackRequest {
            items: vec![selection("broken", (0.0, 1.0, 1.0), 1.0, 1)],
        };
        assert!(matches!(
            request.into_store(),
            Err(ValidationError::InvalidDimension(_))
        ));
    }

    #[tokio::test]
    async fn pack_handler_reports_boxes_and_metrics() {
        let request = PackRequest {
            items: vec![
                selection("book", (25.0, 18.0, 4.0), 0.8, 1),
                selection("mug", (12.0, 9.0, 10.0), 0.4, 1),
                selection("anvil", (20.0, 10.0, 10.0), 30.0, 1),
            ],
        };

        let response = handle_pack(State(state()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["name"], "Small");
        assert_eq!(body["is_complete"], false);
        assert_eq!(body["unpackable"][0]["reason_code"], "too_heavy");
        assert_eq!(body["breakdown_label"], "1x Small");
    }

    #[tokio::test]
    async fn suggestion_handler_returns_tagged_suggestions() {
        let request = SuggestionRequest {
            cart: vec![selection("book", (25.0, 18.0, 4.0), 0.8, 1)],
            deferred: vec![
                selection("mug", (12.0, 9.0, 10.0), 0.4, 5),
                selection("keyboard", (45.0, 15.0, 4.0), 1.0, 1),
            ],
        };

        let response = handle_suggestions(State(state()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let suggestions = body["suggestions"].as_array().unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0]["kind"], "foldable");
        assert_eq!(suggestions[0]["quantity"], 3);
        assert_eq!(suggestions[1]["kind"], "rejected");
        assert_eq!(suggestions[1]["reason"], "no_free_capacity");
    }

    #[tokio::test]
    async fn catalog_handler_lists_smallest_first() {
        let response = handle_catalog(State(state())).await.into_response();
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Small", "Medium", "Large", "XLarge"]);
    }
}
