use crate::error::ServerResult;
use crate::middleware::{RequestId, Tenant};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use query::{QueryAstRequest, QueryResponse};
use std::sync::Arc;

/// Run an analytical query (POST /v1/queries).
///
/// The body is a query AST. The caller's tenant and the request id are set
/// server-side, so a client can neither pick another tenant nor spoof ids.
pub async fn run_query(
    State(state): State<Arc<ServerState>>,
    Extension(Tenant(tenant)): Extension<Tenant>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    payload: Result<Json<QueryAstRequest>, JsonRejection>,
) -> ServerResult<Json<QueryResponse>> {
    let Json(mut request) = payload?;
    request.tenant_id = Some(tenant.clone());
    request.request_id = request_id;

    let outcome = state.queries.sync_query(request).await;
    let label = if outcome.is_ok() { "ok" } else { "error" };
    metrics::counter!("streamly_queries_total", "tenant_id" => tenant, "outcome" => label)
        .increment(1);

    Ok(Json(outcome?))
}
