//! REST API surface for the process service
//!
//! Every endpoint answers with the uniform envelope
//! `{ "success": bool, "message": string, "data"?: T }`. Errors are
//! translated to a status + envelope in exactly one place, the
//! [`IntoResponse`] impl for [`Error`]; handlers stay free of transport
//! concerns beyond picking their success message.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::dto::{ProcessDto, ProcessRequest};
use crate::error::Error;
use crate::service::ProcessService;
use crate::storage::HealthStatus;

/// API server for the process endpoints
pub struct ApiServer {
    service: Arc<ProcessService>,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(service: Arc<ProcessService>, host: String, port: u16) -> Self {
        Self {
            service,
            host,
            port,
        }
    }

    /// Bind and serve until the task is cancelled
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let app = router(self.service);

        info!("Starting processos API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the application router. Public so tests can drive the surface
/// without binding a socket.
pub fn router(service: Arc<ProcessService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/processos", post(create_process).get(list_processes))
        .route("/processos/pesquisar", get(search_by_title))
        .route("/processos/buscar", get(search_by_term))
        .route("/processos/prioridade/{prioridade}", get(filter_by_priority))
        .route("/processos/status", get(filter_by_completed))
        .route(
            "/processos/{id}",
            get(get_process).put(update_process).delete(delete_process),
        )
        .route(
            "/processos/{id}/subpassos/{sub_passo_id}",
            patch(set_sub_step_completion),
        )
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Uniform response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    fn message_only(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// The single translation point from the error taxonomy to status + envelope.
/// Storage detail never reaches the client; it is logged and replaced by a
/// generic message.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            other => {
                warn!("Request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erro interno no servidor".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

// Query parameters

#[derive(Debug, Deserialize)]
struct TitleQuery {
    titulo: String,
}

#[derive(Debug, Deserialize)]
struct TermQuery {
    termo: String,
}

#[derive(Debug, Deserialize)]
struct CompletionQuery {
    concluido: bool,
}

// Handlers

async fn health_check(
    State(service): State<Arc<ProcessService>>,
) -> Result<Response, Error> {
    let health: HealthStatus = service.health().await?;
    if health.healthy {
        Ok(Json(ApiResponse::success("Serviço disponível", health)).into_response())
    } else {
        warn!("Storage health check failed: {:?}", health.error);
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Serviço indisponível")),
        )
            .into_response())
    }
}

async fn create_process(
    State(service): State<Arc<ProcessService>>,
    Json(payload): Json<ProcessRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProcessDto>>), Error> {
    let created = service.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Processo criado com sucesso!", created)),
    ))
}

async fn list_processes(
    State(service): State<Arc<ProcessService>>,
) -> Result<Json<ApiResponse<Vec<ProcessDto>>>, Error> {
    let processes = service.list_all().await?;
    Ok(Json(ApiResponse::success(
        "Processos recuperados com sucesso",
        processes,
    )))
}

async fn get_process(
    State(service): State<Arc<ProcessService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProcessDto>>, Error> {
    let process = service.get(id).await?;
    Ok(Json(ApiResponse::success("Processo encontrado", process)))
}

async fn update_process(
    State(service): State<Arc<ProcessService>>,
    Path(id): Path<i64>,
    Json(payload): Json<ProcessRequest>,
) -> Result<Json<ApiResponse<ProcessDto>>, Error> {
    let updated = service.update(id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Processo atualizado com sucesso!",
        updated,
    )))
}

async fn delete_process(
    State(service): State<Arc<ProcessService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, Error> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::message_only(
        "Processo excluído com sucesso!",
    )))
}

async fn search_by_title(
    State(service): State<Arc<ProcessService>>,
    Query(params): Query<TitleQuery>,
) -> Result<Json<ApiResponse<Vec<ProcessDto>>>, Error> {
    let processes = service.search_by_title(&params.titulo).await?;
    Ok(Json(ApiResponse::success(
        "Pesquisa realizada com sucesso",
        processes,
    )))
}

async fn search_by_term(
    State(service): State<Arc<ProcessService>>,
    Query(params): Query<TermQuery>,
) -> Result<Json<ApiResponse<Vec<ProcessDto>>>, Error> {
    let processes = service.search_by_term(&params.termo).await?;
    Ok(Json(ApiResponse::success(
        "Busca realizada com sucesso",
        processes,
    )))
}

async fn filter_by_priority(
    State(service): State<Arc<ProcessService>>,
    Path(prioridade): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProcessDto>>>, Error> {
    let processes = service.filter_by_priority(&prioridade).await?;
    Ok(Json(ApiResponse::success(
        "Filtro aplicado com sucesso",
        processes,
    )))
}

async fn filter_by_completed(
    State(service): State<Arc<ProcessService>>,
    Query(params): Query<CompletionQuery>,
) -> Result<Json<ApiResponse<Vec<ProcessDto>>>, Error> {
    let processes = service.filter_by_completed(params.concluido).await?;
    Ok(Json(ApiResponse::success(
        "Filtro aplicado com sucesso",
        processes,
    )))
}

async fn set_sub_step_completion(
    State(service): State<Arc<ProcessService>>,
    Path((processo_id, sub_passo_id)): Path<(i64, i64)>,
    Query(params): Query<CompletionQuery>,
) -> Result<Json<ApiResponse<ProcessDto>>, Error> {
    let updated = service
        .set_sub_step_completion(processo_id, sub_passo_id, params.concluido)
        .await?;
    Ok(Json(ApiResponse::success(
        "Status atualizado com sucesso!",
        updated,
    )))
}
