use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use grabber_core::{parse_links, QueueViewModel, SessionState};
use grabber_engine::{ResolutionError, TransferError, TransferId, ValidationError};
use grabber_logging::{grabber_error, grabber_info, grabber_warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::constants::{
    MSG_CONFIRM_CLEAR, MSG_DOWNLOAD_OK, MSG_NO_LINKS, MSG_QUEUE_CLEARED, STATUS_RUNNING,
};
use super::AppState;
use crate::platform::effects::RunnerGone;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const MSG_RUN_ACTIVE: &str = "A download run is already active";
const QUERY_URL: &str = "url";
const QUERY_FILE_NAME: &str = "fileName";

type ApiReply<T> = (StatusCode, Json<T>);

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessRequest {
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_id: Option<TransferId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ProcessResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadQuery {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "fileName")]
    file_name: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl DownloadResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_path: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueueRequest {
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    text: Option<String>,
}

impl QueueRequest {
    fn into_raw(self) -> String {
        let mut lines = self.links;
        lines.extend(self.text);
        lines.join("\n")
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClearRequest {
    #[serde(default)]
    confirm: bool,
    #[serde(default)]
    cancel: bool,
}

/// JSON projection of the queue view model.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueueView {
    running: bool,
    run_id: u64,
    total: usize,
    current_index: Option<usize>,
    current_link: Option<String>,
    completed: usize,
    skipped: usize,
    remaining: Vec<String>,
    awaiting_confirmation: bool,
    transfer_in_flight: bool,
    progress: String,
}

impl From<&QueueViewModel> for QueueView {
    fn from(view: &QueueViewModel) -> Self {
        Self {
            running: view.session == SessionState::Running,
            run_id: view.run_id,
            total: view.total,
            current_index: view.current_index,
            current_link: view.current_link.clone(),
            completed: view.completed,
            skipped: view.skipped,
            remaining: view.remaining.clone(),
            awaiting_confirmation: view.awaiting_confirmation,
            transfer_in_flight: view.transfer_in_flight,
            progress: view.progress_label(),
        }
    }
}

pub(crate) async fn api_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": STATUS_RUNNING,
        "version": VERSION,
        "environment": state.config.environment,
        "subscribers": state.engine.progress().subscriber_count(),
    }))
}

pub(crate) async fn process_link(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiReply<ProcessResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            grabber_warn!("rejected /api/process body: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(ProcessResponse::failure(rejection.body_text())),
            );
        }
    };
    let Some(link) = request
        .link
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
    else {
        let err = ValidationError::MissingField(vec!["link"]);
        grabber_warn!("rejected /api/process: {err}");
        return (
            StatusCode::BAD_REQUEST,
            Json(ProcessResponse::failure(err.to_string())),
        );
    };

    match state.engine.resolve(&link).await {
        Ok(target) => (
            StatusCode::OK,
            Json(ProcessResponse {
                success: true,
                file_name: Some(target.display_name),
                download_url: Some(target.direct_url),
                download_id: Some(target.transfer_id),
                message: None,
            }),
        ),
        Err(err) => {
            grabber_error!("{err}");
            let status = match err {
                ResolutionError::PatternNotFound => StatusCode::NOT_FOUND,
                ResolutionError::FetchFailed { .. } | ResolutionError::NetworkError { .. } => {
                    StatusCode::BAD_GATEWAY
                }
            };
            (status, Json(ProcessResponse::failure(err.to_string())))
        }
    }
}

pub(crate) async fn download_file(
    State(state): State<AppState>,
    Path(download_id): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> ApiReply<DownloadResponse> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            grabber_warn!("rejected /api/download query: {rejection}");
            return missing_download_params(vec![QUERY_URL, QUERY_FILE_NAME]);
        }
    };
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let (url, file_name) = match (present(query.url), present(query.file_name)) {
        (Some(url), Some(file_name)) => (url, file_name),
        (url, file_name) => {
            let missing = [(QUERY_URL, url.is_none()), (QUERY_FILE_NAME, file_name.is_none())]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
            return missing_download_params(missing);
        }
    };

    let transfer_id = TransferId::new(download_id);
    match state.engine.fetch(&transfer_id, &url, &file_name).await {
        Ok(report) => (
            StatusCode::OK,
            Json(DownloadResponse {
                success: true,
                file_path: Some(report.file_name),
                message: Some(MSG_DOWNLOAD_OK.to_string()),
            }),
        ),
        Err(err) => {
            let status = match err {
                TransferError::RemoteFetchFailed { .. } => StatusCode::BAD_GATEWAY,
                TransferError::SinkWriteFailed { .. } | TransferError::StreamInterrupted { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(DownloadResponse::failure(err.to_string())))
        }
    }
}

pub(crate) async fn queue_view(State(state): State<AppState>) -> Json<QueueView> {
    Json(QueueView::from(&state.queue.view()))
}

pub(crate) async fn queue_submit(
    State(state): State<AppState>,
    payload: Result<Json<QueueRequest>, JsonRejection>,
) -> ApiReply<Value> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return failure(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };
    let raw = request.into_raw();
    if parse_links(&raw).is_empty() {
        return failure(StatusCode::BAD_REQUEST, MSG_NO_LINKS);
    }

    let outcome = match state.queue.submit(raw).await {
        Ok(outcome) => outcome,
        Err(err) => return runner_unavailable(err),
    };
    if !outcome.run_started {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "message": MSG_RUN_ACTIVE,
                "queue": QueueView::from(&outcome.view),
            })),
        );
    }
    grabber_info!("queued {} links", outcome.view.total);
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "queue": QueueView::from(&outcome.view),
        })),
    )
}

pub(crate) async fn queue_clear(
    State(state): State<AppState>,
    payload: Option<Json<ClearRequest>>,
) -> ApiReply<Value> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let outcome = if request.cancel {
        state.queue.cancel_clear().await
    } else {
        state.queue.clear(request.confirm).await
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => return runner_unavailable(err),
    };

    if outcome.confirmation_required {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "confirmationRequired": true,
                "message": MSG_CONFIRM_CLEAR,
                "queue": QueueView::from(&outcome.view),
            })),
        );
    }
    let message = if request.cancel {
        None
    } else {
        Some(MSG_QUEUE_CLEARED)
    };
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message,
            "queue": QueueView::from(&outcome.view),
        })),
    )
}

fn missing_download_params(fields: Vec<&'static str>) -> ApiReply<DownloadResponse> {
    let err = ValidationError::MissingField(fields);
    grabber_warn!("rejected /api/download: {err}");
    (
        StatusCode::BAD_REQUEST,
        Json(DownloadResponse::failure(err.to_string())),
    )
}

fn failure(status: StatusCode, message: &str) -> ApiReply<Value> {
    (status, Json(json!({ "success": false, "message": message })))
}

fn runner_unavailable(err: RunnerGone) -> ApiReply<Value> {
    grabber_error!("{err}");
    failure(StatusCode::SERVICE_UNAVAILABLE, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_omits_empty_fields() {
        let body = serde_json::to_value(ProcessResponse::failure("nope")).unwrap();
        assert_eq!(body, json!({ "success": false, "message": "nope" }));
    }

    #[test]
    fn queue_request_merges_links_and_text() {
        let request = QueueRequest {
            links: vec!["https://a.test/1".to_string()],
            text: Some("https://a.test/2\n\n https://a.test/3 ".to_string()),
        };
        assert_eq!(parse_links(&request.into_raw()).len(), 3);
    }

    #[test]
    fn queue_view_reports_progress_label() {
        let view = QueueViewModel {
            session: SessionState::Running,
            total: 4,
            completed: 1,
            ..QueueViewModel::default()
        };
        let json = serde_json::to_value(QueueView::from(&view)).unwrap();
        assert_eq!(json["running"], true);
        assert_eq!(json["progress"], "1/4");
        assert_eq!(json["currentIndex"], Value::Null);
    }
}
