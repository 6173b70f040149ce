use super::protocol::{PartitionedExecuteRequest, PartitionedExecuteResponse};
use crate::error::JobError;
use crate::job::registry::{JobContext, JobHandlerRegistry};

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

/// Owner side of a forwarded partitioned call: runs it against the local registry.
pub async fn handle_partitioned_execute(
    Extension(registry): Extension<Arc<JobHandlerRegistry>>,
    Json(req): Json<PartitionedExecuteRequest>,
) -> (StatusCode, Json<PartitionedExecuteResponse>) {
    tracing::debug!(
        "Received forwarded call {} for shard '{}'",
        req.call.kind,
        req.shard_key
    );

    match registry
        .invoke(&req.call.kind, req.call.payload, &JobContext::default())
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(PartitionedExecuteResponse {
                result: Some(result),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Forwarded call for shard '{}' failed: {}", req.shard_key, e);
            let status = match e {
                JobError::UnknownHandler(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(PartitionedExecuteResponse {
                    result: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
