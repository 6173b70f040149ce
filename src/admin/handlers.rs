use super::protocol::*;
use super::service::AdminService;
use crate::error::AdminError;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

fn error_status(error: &AdminError) -> StatusCode {
    match error {
        AdminError::IngressState(_) => StatusCode::CONFLICT,
        AdminError::Publish(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn admin_result(result: Result<(), AdminError>) -> (StatusCode, Json<AdminResponse>) {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(AdminResponse {
                success: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Admin operation failed: {}", e);
            (
                error_status(&e),
                Json(AdminResponse {
                    success: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_submit_diagnostic(
    Extension(admin): Extension<Arc<AdminService>>,
) -> (StatusCode, Json<SubmitJobResponse>) {
    match admin.submit_diagnostic() {
        Ok(job_id) => (
            StatusCode::OK,
            Json(SubmitJobResponse {
                success: true,
                job_id: Some(job_id),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to submit diagnostic job: {}", e);
            (
                error_status(&e),
                Json(SubmitJobResponse {
                    success: false,
                    job_id: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_ingress_start(
    Extension(admin): Extension<Arc<AdminService>>,
) -> (StatusCode, Json<AdminResponse>) {
    admin_result(admin.start_ingress())
}

pub async fn handle_ingress_stop(
    Extension(admin): Extension<Arc<AdminService>>,
) -> (StatusCode, Json<AdminResponse>) {
    admin_result(admin.stop_ingress())
}

pub async fn handle_status(Extension(admin): Extension<Arc<AdminService>>) -> Json<NodeStatus> {
    Json(admin.status())
}

pub async fn handle_submit_job(
    Extension(admin): Extension<Arc<AdminService>>,
    Json(req): Json<SubmitJobRequest>,
) -> (StatusCode, Json<SubmitJobResponse>) {
    let job = req.to_job();

    match admin.submit_job(&job, req.transport_priority) {
        Ok(()) => {
            tracing::info!(job_id = %job.id, kind = %job.kind, "Job submitted");
            (
                StatusCode::OK,
                Json(SubmitJobResponse {
                    success: true,
                    job_id: Some(job.id),
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Failed to submit job: {}", e);
            (
                error_status(&e),
                Json(SubmitJobResponse {
                    success: false,
                    job_id: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
