use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    Actor, ApplicationId, ApplicationStatus, ApplicationSubmission, DocumentDescriptor,
    ReferenceNumber, Role,
};
use super::intake::WizardStep;
use super::repository::{
    ApplicationRecord, ApplicationRepository, NotificationPublisher, RepositoryError,
};
use super::service::{
    DecisionSubmission, LoanApplicationService, LoanServiceError, TransitionCommand,
    VoteSubmission,
};
use super::transitions::{next_statuses, TransitionError};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Router builder exposing HTTP endpoints for intake, review, and committee work.
pub fn application_router<R, N>(service: Arc<LoanApplicationService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/loans", post(submit_handler::<R, N>))
        .route("/api/v1/loans/queue", get(queue_handler::<R, N>))
        .route("/api/v1/loans/pipeline", get(pipeline_handler::<R, N>))
        .route(
            "/api/v1/loans/wizard/:step/validate",
            post(validate_step_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/reference/:reference",
            get(reference_handler::<R, N>),
        )
        .route("/api/v1/loans/:application_id", get(detail_handler::<R, N>))
        .route(
            "/api/v1/loans/:application_id/transitions",
            post(transition_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/:application_id/history",
            get(history_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/:application_id/documents",
            post(document_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/:application_id/decision",
            post(decide_handler::<R, N>).get(decision_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/:application_id/votes",
            post(vote_handler::<R, N>).get(votes_handler::<R, N>),
        )
        .with_state(service)
}

/// Identity forwarded by the upstream auth gateway.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let id = header(ACTOR_ID_HEADER).ok_or_else(|| unauthorized("missing x-actor-id header"))?;
        let role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| unauthorized("missing x-actor-role header"))?
            .parse::<Role>()
            .map_err(|err| unauthorized(&err.to_string()))?;

        Ok(Actor { id, role })
    }
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

/// Full record plus the edges reachable from its current status.
#[derive(Debug, Serialize)]
struct ApplicationDetailView {
    #[serde(flatten)]
    record: ApplicationRecord,
    next_statuses: Vec<ApplicationStatus>,
}

impl From<ApplicationRecord> for ApplicationDetailView {
    fn from(record: ApplicationRecord) -> Self {
        let next_statuses = next_statuses(record.status);
        Self {
            record,
            next_statuses,
        }
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    actor: Actor,
    Json(submission): Json<ApplicationSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.submit(&actor, submission).await {
        Ok(record) => (StatusCode::CREATED, Json(record.summary_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn validate_step_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
    Path(step): Path<WizardStep>,
    Json(submission): Json<ApplicationSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.validate_step(step, &submission) {
        Ok(()) => (StatusCode::OK, Json(json!({ "step": step, "valid": true }))).into_response(),
        Err(violation) => {
            let payload = json!({
                "step": step,
                "valid": false,
                "error": violation.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn queue_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    actor: Actor,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.queue(&actor).await {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(ApplicationRecord::summary_view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn pipeline_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.pipeline().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&ApplicationId(application_id)).await {
        Ok(record) => (StatusCode::OK, Json(ApplicationDetailView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reference_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
    Path(reference): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get_by_reference(&ReferenceNumber(reference)).await {
        Ok(record) => (StatusCode::OK, Json(ApplicationDetailView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(command): Json<TransitionCommand>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.transition(&actor, &id, command).await {
        Ok(record) => (StatusCode::OK, Json(ApplicationDetailView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.history(&ApplicationId(application_id)).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn document_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(document): Json<DocumentDescriptor>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.attach_document(&actor, &id, document).await {
        Ok(record) => (StatusCode::CREATED, Json(record.documents)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decide_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(submission): Json<DecisionSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.decide(&actor, &id, submission).await {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decision_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.decision(&ApplicationId(application_id)).await {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn vote_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(submission): Json<VoteSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.vote(&actor, &id, submission).await {
        Ok(vote) => (StatusCode::OK, Json(vote)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn votes_handler<R, N>(
    State(service): State<Arc<LoanApplicationService<R, N>>>,
    _actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.votes(&ApplicationId(application_id)).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(error: LoanServiceError) -> Response {
    let status = match &error {
        LoanServiceError::Intake(_) | LoanServiceError::RationaleRequired => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LoanServiceError::Transition(
            TransitionError::Forbidden { .. } | TransitionError::NotAssigned { .. },
        )
        | LoanServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        LoanServiceError::Transition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LoanServiceError::Repository(
            RepositoryError::Conflict { .. }
            | RepositoryError::ReviewerChanged { .. }
            | RepositoryError::Closed { .. }
            | RepositoryError::Duplicate,
        )
        | LoanServiceError::Closed { .. }
        | LoanServiceError::VotingClosed { .. } => StatusCode::CONFLICT,
        LoanServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        LoanServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %error, "loan application request failed");
    }

    let mut payload = json!({ "error": error.to_string() });
    if let LoanServiceError::Repository(RepositoryError::Conflict { expected, actual }) = &error {
        payload["expected_status"] = json!(expected);
        payload["current_status"] = json!(actual);
    }

    (status, Json(payload)).into_response()
}
