use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use procure_engine::feed;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/orgs/{org_id}/feed", get(ranked_feed))
		.route("/v1/orgs/{org_id}/alerts", get(unread_alerts))
		.route("/v1/orgs/{org_id}/track", post(set_tracked))
		.route("/v1/alerts/{alert_id}/read", post(mark_alert_read))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
	limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct FeedEntry {
	ocid: String,
	score: f32,
	score_semantic: f32,
	score_domain: f32,
	score_theme: f32,
	score_geo: f32,
	verdict: String,
	viability_warning: Option<String>,
	risk_flags: serde_json::Value,
	checklist: serde_json::Value,
	recommendation_reasons: Vec<String>,
	tracked: bool,
	tier2_verdict: Option<String>,
	tier2_rationale: Option<String>,
}

impl From<procure_storage::models::NoticeMatchRow> for FeedEntry {
	fn from(row: procure_storage::models::NoticeMatchRow) -> Self {
		Self {
			ocid: row.ocid,
			score: row.score,
			score_semantic: row.score_semantic,
			score_domain: row.score_domain,
			score_theme: row.score_theme,
			score_geo: row.score_geo,
			verdict: row.verdict,
			viability_warning: row.viability_warning,
			risk_flags: row.risk_flags,
			checklist: row.checklist,
			recommendation_reasons: row.recommendation_reasons,
			tracked: row.tracked,
			tier2_verdict: row.tier2_verdict,
			tier2_rationale: row.tier2_rationale,
		}
	}
}

const DEFAULT_FEED_LIMIT: i64 = 50;

async fn ranked_feed(
	State(state): State<AppState>,
	Path(org_id): Path<Uuid>,
	Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
	let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);
	let rows = feed::ranked_feed(&state.engine.db, org_id, limit).await?;

	Ok(Json(rows.into_iter().map(FeedEntry::from).collect()))
}

#[derive(Debug, Serialize)]
struct AlertEntry {
	alert_id: Uuid,
	ocid: String,
	r#type: String,
	severity: String,
	message: String,
	details: serde_json::Value,
}

impl From<procure_storage::models::AlertRow> for AlertEntry {
	fn from(row: procure_storage::models::AlertRow) -> Self {
		Self {
			alert_id: row.alert_id,
			ocid: row.ocid,
			r#type: row.r#type,
			severity: row.severity,
			message: row.message,
			details: row.details,
		}
	}
}

async fn unread_alerts(
	State(state): State<AppState>,
	Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<AlertEntry>>, ApiError> {
	let rows = feed::unread_alerts(&state.engine.db, org_id).await?;

	Ok(Json(rows.into_iter().map(AlertEntry::from).collect()))
}

#[derive(Debug, Deserialize)]
struct SetTrackedRequest {
	ocid: String,
	tracked: bool,
}

async fn set_tracked(
	State(state): State<AppState>,
	Path(org_id): Path<Uuid>,
	Json(payload): Json<SetTrackedRequest>,
) -> Result<StatusCode, ApiError> {
	feed::set_tracked(&state.engine.db, org_id, &payload.ocid, payload.tracked).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn mark_alert_read(
	State(state): State<AppState>,
	Path(alert_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
	feed::mark_alert_read(&state.engine.db, alert_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl From<procure_engine::Error> for ApiError {
	fn from(err: procure_engine::Error) -> Self {
		use procure_engine::Error;

		let (status, error_code) = match &err {
			Error::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			Error::InvalidRequest { .. } | Error::Validation { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			Error::InvariantViolation { .. } => (StatusCode::CONFLICT, "invariant_violation"),
			Error::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
			Error::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
			Error::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
		};

		Self { status, error_code: error_code.to_string(), message: err.to_string() }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };
		(self.status, Json(body)).into_response()
	}
}
