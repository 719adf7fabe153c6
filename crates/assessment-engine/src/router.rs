use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::assembly::{AssemblyBlueprint, JobFitPlan};
use crate::domain::{QuestionId, TestSession};
use crate::error::AppError;
use crate::service::{AssessmentService, ServiceError, SubmittedAnswer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub session: TestSession,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyResponse {
    pub kind: String,
    pub question_ids: Vec<QuestionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<JobFitPlan>,
}

/// Router builder exposing scoring, consistency, assembly and item endpoints.
pub fn assessment_router(service: Arc<AssessmentService>) -> Router {
    Router::new()
        .route("/api/v1/sessions/score", post(score_handler))
        .route("/api/v1/sessions/consistency", post(consistency_handler))
        .route("/api/v1/assembly", post(assembly_handler))
        .route(
            "/api/v1/items/:question_id/eligibility",
            get(eligibility_handler),
        )
        .with_state(service)
}

pub(crate) async fn score_handler(
    State(service): State<Arc<AssessmentService>>,
    Json(request): Json<ScoreRequest>,
) -> Response {
    match service.prepare_answers(request.answers) {
        Ok(answers) => {
            let report = service.complete_session(&request.session, &answers);
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn consistency_handler(
    State(service): State<Arc<AssessmentService>>,
    Json(request): Json<ConsistencyRequest>,
) -> Response {
    match service.prepare_answers(request.answers) {
        Ok(answers) => (StatusCode::OK, Json(service.analyze(&answers))).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn assembly_handler(
    State(service): State<Arc<AssessmentService>>,
    Json(blueprint): Json<AssemblyBlueprint>,
) -> Response {
    match assembly_response(&service, &blueprint) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

/// Assemble a blueprint, attaching the gap-analysis plan for job-fit requests.
pub fn assembly_response(
    service: &AssessmentService,
    blueprint: &AssemblyBlueprint,
) -> Result<AssemblyResponse, ServiceError> {
    let kind = blueprint.kind().to_string();
    match blueprint {
        AssemblyBlueprint::JobFit(job_fit) => {
            let plan = service.plan_job_fit(job_fit)?;
            Ok(AssemblyResponse {
                kind,
                question_ids: plan.question_ids.clone(),
                plan: Some(plan),
            })
        }
        AssemblyBlueprint::Standard(_) => Ok(AssemblyResponse {
            kind,
            question_ids: service.assemble(blueprint)?,
            plan: None,
        }),
    }
}

pub(crate) async fn eligibility_handler(
    State(service): State<Arc<AssessmentService>>,
    Path(question_id): Path<String>,
) -> Response {
    match service.eligibility(&QuestionId::new(question_id)) {
        Ok(eligibility) => (StatusCode::OK, Json(eligibility)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}
