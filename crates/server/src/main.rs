use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use server_api::{
    check_health, create_counter, get_counter, update_counter, ApiContext, CounterPage,
    PageStatus,
};
use shared::{
    domain::{Counter, CounterAction, CounterCreate, CounterId, CounterUpdate, UnknownAction},
    error::{ApiError, ErrorCode},
    protocol::{ActionRequest, PageView},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod html;

use app_state::AppState;
use config::{load_settings, normalize_database_url};

const MAX_BODY_BYTES: usize = 16 * 1024;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url)
        .await
        .map_err(|error| {
            error!(
                %database_url,
                %error,
                "failed to open SQLite database; verify parent directory exists and permissions are correct"
            );
            error
        })?
        .with_updated_at_policy(settings.updated_at_policy);
    info!(
        counter = %settings.counter_name,
        updated_at_policy = %settings.updated_at_policy,
        "storage ready"
    );

    let state = AppState {
        api: ApiContext::new(storage, settings.counter_name.clone()),
        status_revert: settings.status_revert(),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/counter", get(counter_page))
        .route("/counter/:action", post(counter_action))
        .route("/api/counters", post(http_create_counter))
        .route(
            "/api/counters/:key",
            get(http_get_counter).patch(http_update_counter),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Redirect {
    Redirect::to("/counter")
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match check_health(&state.api).await {
        Ok(()) => "ok".into_response(),
        Err(err) => {
            error!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response()
        }
    }
}

async fn counter_page(State(state): State<Arc<AppState>>) -> Response {
    match CounterPage::load(&state.api).await {
        Ok(page) => {
            Html(html::render_counter_page(&page.view(state.status_revert))).into_response()
        }
        Err(err) => {
            error!(error = %err, "failed to load counter page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(html::render_error_page(&err.message)),
            )
                .into_response()
        }
    }
}

async fn counter_action(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    Json(req): Json<ActionRequest>,
) -> ApiResult<(StatusCode, Json<PageView>)> {
    let action: CounterAction = action
        .parse()
        .map_err(|e: UnknownAction| api_error(ApiError::not_found(e.to_string())))?;

    let mut page = CounterPage::resume(state.api.counter_name.clone(), req.displayed);
    let status = match page.apply(&state.api, action).await {
        PageStatus::Error(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PageStatus::Ready | PageStatus::Updated(_) => StatusCode::OK,
    };
    Ok((status, Json(page.view(state.status_revert))))
}

async fn http_get_counter(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Counter>> {
    get_counter(&state.api, &name).await.map(Json).map_err(api_error)
}

async fn http_create_counter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CounterCreate>,
) -> ApiResult<(StatusCode, Json<Counter>)> {
    let counter = create_counter(&state.api, req).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(counter)))
}

async fn http_update_counter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<CounterUpdate>,
) -> ApiResult<Json<Counter>> {
    update_counter(&state.api, CounterId(id), update)
        .await
        .map(Json)
        .map_err(api_error)
}

fn api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
