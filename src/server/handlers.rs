//! Commit collection handlers.
//!
//! GET    /commits                      simplified summaries
//! GET    /commits/authors              per-author totals
//! GET    /commits/search/author?name=  case-insensitive author regex, empty matches all
//! GET    /commits/date-range?start=&end=
//! GET    /commits/stats/daily
//! GET    /commits/stats/hourly
//! GET    /commits/stats/patterns
//! GET    /commits/top-contributors?n=
//! GET    /commits/files-by-author
//! GET    /commits/stats/developers             ?repository= on every insight route
//! GET    /commits/stats/developer-patterns?n=
//! GET    /commits/stats/heatmap
//! GET    /commits/collaboration
//! GET    /commits/ownership
//! GET    /commits/:id
//! PUT    /commits/:id                  full replace
//! PATCH  /commits/:id                  merge patch
//! DELETE /commits/:id

use super::error::ApiError;
use super::AppState;
use crate::aggregate::{self, DEFAULT_TOP_N};
use crate::error::MetricsError;
use crate::insights::{
    self, Collaboration, DeveloperPatterns, DeveloperStats, HeatmapRow, Ownership, DEFAULT_PATTERN_LIMIT,
};
use crate::model::{
    AuthorFiles, AuthorTotals, CommitMetric, CommitSummary, Contributor, DailyBucket, HourlyBucket,
    StoredCommit, WorkPatterns,
};
use crate::util::resolve_range;
use axum::extract::{Path, Query, State};
use axum::Json;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub repository: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub n: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsightQuery {
    pub repository: Option<String>,
    pub n: Option<String>,
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| MetricsError::Validation(format!("invalid commit id '{raw}'")).into())
}

/// `n` falls back to `default` when missing, unparseable or not positive.
fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(default)
}

pub fn parse_top_n(raw: Option<&str>) -> usize {
    parse_limit(raw, DEFAULT_TOP_N)
}

fn scoped(state: &AppState, repository: Option<&str>) -> Result<Vec<StoredCommit>, ApiError> {
    let store = state.store()?;
    let commits = match repository {
        Some(repository) => store.by_repository(repository)?,
        None => store.all()?,
    };
    Ok(commits)
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let count = state.store()?.count()?;
    Ok(Json(json!({ "status": "ok", "commits": count })))
}

pub async fn list_commits(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<CommitSummary>> {
    let commits = scoped(&state, query.repository.as_deref())?;
    Ok(Json(commits.iter().map(CommitSummary::from).collect()))
}

pub async fn author_totals(State(state): State<AppState>) -> ApiResult<IndexMap<String, AuthorTotals>> {
    let commits = state.store()?.all()?;
    Ok(Json(aggregate::author_totals(&commits)))
}

pub async fn search_author(
    State(state): State<AppState>,
    Query(query): Query<AuthorQuery>,
) -> ApiResult<Vec<StoredCommit>> {
    let name = query.name.unwrap_or_default();
    Ok(Json(state.store()?.find_by_author(&name)?))
}

pub async fn date_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Vec<StoredCommit>> {
    let range = resolve_range(query.start.as_deref(), query.end.as_deref())?;
    Ok(Json(state.store()?.find_by_date_range(&range)?))
}

pub async fn daily_stats(State(state): State<AppState>) -> ApiResult<Vec<DailyBucket>> {
    let commits = state.store()?.all()?;
    Ok(Json(aggregate::daily_histogram(&commits)))
}

pub async fn hourly_stats(State(state): State<AppState>) -> ApiResult<Vec<HourlyBucket>> {
    let commits = state.store()?.all()?;
    Ok(Json(aggregate::hourly_histogram(&commits)))
}

pub async fn work_patterns(State(state): State<AppState>) -> ApiResult<WorkPatterns> {
    let commits = state.store()?.all()?;
    Ok(Json(aggregate::work_patterns(&commits)))
}

pub async fn top_contributors(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ApiResult<Vec<Contributor>> {
    let n = parse_top_n(query.n.as_deref());
    let commits = state.store()?.all()?;
    Ok(Json(aggregate::top_contributors(&commits, n)))
}

pub async fn files_by_author(State(state): State<AppState>) -> ApiResult<Vec<AuthorFiles>> {
    let commits = state.store()?.all()?;
    Ok(Json(aggregate::files_by_author(&commits)))
}

pub async fn developer_stats(
    State(state): State<AppState>,
    Query(query): Query<InsightQuery>,
) -> ApiResult<Vec<DeveloperStats>> {
    let commits = scoped(&state, query.repository.as_deref())?;
    Ok(Json(insights::developer_stats(&commits)))
}

pub async fn developer_patterns(
    State(state): State<AppState>,
    Query(query): Query<InsightQuery>,
) -> ApiResult<Vec<DeveloperPatterns>> {
    let limit = parse_limit(query.n.as_deref(), DEFAULT_PATTERN_LIMIT);
    let commits = scoped(&state, query.repository.as_deref())?;
    Ok(Json(insights::developer_patterns(&commits, limit)))
}

pub async fn activity_heatmap(
    State(state): State<AppState>,
    Query(query): Query<InsightQuery>,
) -> ApiResult<Vec<HeatmapRow>> {
    let commits = scoped(&state, query.repository.as_deref())?;
    Ok(Json(insights::activity_heatmap(&commits)))
}

pub async fn collaboration(
    State(state): State<AppState>,
    Query(query): Query<InsightQuery>,
) -> ApiResult<Collaboration> {
    let commits = scoped(&state, query.repository.as_deref())?;
    Ok(Json(insights::file_collaboration(&commits)))
}

pub async fn ownership(
    State(state): State<AppState>,
    Query(query): Query<InsightQuery>,
) -> ApiResult<Ownership> {
    let commits = scoped(&state, query.repository.as_deref())?;
    Ok(Json(insights::file_ownership(&commits)))
}

pub async fn get_commit(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StoredCommit> {
    let id = parse_id(&id)?;
    let commit = state.store()?.get(id)?.ok_or(MetricsError::NotFound(id))?;
    Ok(Json(commit))
}

pub async fn replace_commit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let metric: CommitMetric = serde_json::from_value(body)
        .map_err(|e| MetricsError::Validation(format!("invalid commit body: {e}")))?;
    let stored = state.store()?.replace(id, &metric)?;
    Ok(Json(json!({
        "message": "Commit replaced",
        "matchedCount": 1,
        "commit": stored,
    })))
}

pub async fn patch_commit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let fields = body
        .as_object()
        .ok_or_else(|| MetricsError::Validation("patch body must be a JSON object".to_string()))?;
    let stored = state.store()?.patch(id, fields)?;
    Ok(Json(json!({
        "message": "Commit updated",
        "matchedCount": 1,
        "commit": stored,
    })))
}

pub async fn delete_commit(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let deleted = state.store()?.delete(id)?;
    Ok(Json(json!({ "message": "Commit deleted", "deletedCount": deleted })))
}
