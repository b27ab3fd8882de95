use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::JobState;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker {0} already registered")]
    DuplicateWorker(Uuid),

    #[error("worker {0} not registered")]
    UnknownWorker(Uuid),

    #[error("location update for worker {0} is older than the stored one")]
    StaleUpdate(Uuid),

    /// Normal, retryable outcome of matching. Not a defect.
    #[error("no worker available")]
    NoWorkerAvailable,

    #[error("job {job_id} cannot be assigned in state {state}")]
    AlreadyAssigned { job_id: Uuid, state: JobState },

    #[error("cannot {action} job {job_id} in state {state}")]
    IllegalTransition {
        job_id: Uuid,
        state: JobState,
        action: &'static str,
    },

    #[error("ledger finalization failed for job {0}; transition rolled back")]
    FinalizationFailed(Uuid),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            DispatchError::DuplicateWorker(_) => StatusCode::CONFLICT,
            DispatchError::UnknownWorker(_) => StatusCode::NOT_FOUND,
            DispatchError::StaleUpdate(_) => StatusCode::CONFLICT,
            DispatchError::NoWorkerAvailable => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::AlreadyAssigned { .. } => StatusCode::CONFLICT,
            DispatchError::IllegalTransition { .. } => StatusCode::CONFLICT,
            DispatchError::FinalizationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
