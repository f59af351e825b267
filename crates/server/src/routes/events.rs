use crate::error::{ServerError, ServerResult};
use crate::middleware::Tenant;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use ingest::BatchIngestionRequest;
use std::sync::Arc;

/// Ingest one batch of events (POST /v1/events/ingest).
///
/// The batch belongs to the caller's tenant: an empty `tenant_id` is filled
/// in, a different one is refused. Returns 202 with the batch response.
/// When the insert fails the `failed` batch response is returned with the
/// error status (503, or 500 if the insert task died).
pub async fn ingest_events(
    State(state): State<Arc<ServerState>>,
    Extension(Tenant(tenant)): Extension<Tenant>,
    payload: Result<Json<BatchIngestionRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(mut request) = payload?;

    if request.tenant_id.is_empty() {
        request.tenant_id = tenant.clone();
    } else if request.tenant_id != tenant {
        return Err(ServerError::Forbidden(format!(
            "API key is not allowed to ingest for tenant `{}`",
            request.tenant_id
        )));
    }

    let submitted = request.events.len() as u64;
    match state.ingestion.ingest_batch(&request).await {
        Ok(response) => {
            metrics::counter!("streamly_events_ingested_total", "tenant_id" => tenant)
                .increment(response.ingested_count as u64);
            Ok((StatusCode::ACCEPTED, Json(response)).into_response())
        }
        Err(err) => {
            metrics::counter!("streamly_events_failed_total", "tenant_id" => tenant)
                .increment(submitted);

            let Some(failed) = err.response().cloned() else {
                return Err(ServerError::Ingest(err));
            };
            let status = StatusCode::from_u16(err.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            tracing::warn!(error = %err, status = status.as_u16(), "ingest_batch_rejected");
            Ok((status, Json(failed)).into_response())
        }
    }
}
