//! Scheduling service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{PermissionGrant, PermissionGrantView, PermissionType},
    permissions::{AuthorityTarget, OrgDirectory},
    timekeeping::{self, ClockPair, TimeEntryDisplay},
};

/// Query parameters for an authority check
#[derive(Deserialize)]
pub struct AuthorityCheckQuery {
    pub user_id: Uuid,
    pub permission_type: PermissionType,
    pub target_id: Uuid,
}

/// Response for an authority check
#[derive(Serialize)]
pub struct AuthorityCheckResponse {
    pub authorized: bool,
}

/// Request for granting a permission
#[derive(Deserialize)]
pub struct GrantPermissionRequest {
    pub user_id: Uuid,
    pub permission_type: PermissionType,
    pub target_id: Uuid,
    pub granted_by: Uuid,
}

/// Request for revoking a permission
#[derive(Deserialize)]
pub struct RevokePermissionRequest {
    pub user_id: Uuid,
    pub permission_type: PermissionType,
    pub target_id: Uuid,
}

/// Response for a revoke, reporting how many grants were touched
#[derive(Serialize)]
pub struct RevokePermissionResponse {
    pub revoked: u64,
}

/// Query parameters for the active grant listing
#[derive(Deserialize)]
pub struct PermissionListQuery {
    pub permission_type: PermissionType,
    pub target_id: Uuid,
}

/// One worker's rounded time entries on a shift
#[derive(Serialize)]
pub struct WorkerTimesheet {
    pub user_id: Uuid,
    pub entries: Vec<TimesheetEntry>,
    pub total_hours: String,
}

/// One rounded time entry in a timesheet
#[derive(Serialize)]
pub struct TimesheetEntry {
    pub entry_number: i32,
    #[serde(flatten)]
    pub display: TimeEntryDisplay,
}

/// Response for the shift timesheet view
#[derive(Serialize)]
pub struct TimesheetResponse {
    pub shift_id: Uuid,
    pub shift_date: String,
    pub workers: Vec<WorkerTimesheet>,
    pub total_hours: String,
}

/// Create the router for the scheduling service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/authority/check", get(check_authority))
        .route("/permissions", get(list_permissions).post(grant_permission))
        .route("/permissions/revoke", post(revoke_permission))
        .route("/shifts/:id/timesheet", get(shift_timesheet))
        .route(
            "/shifts/:id/workers/:user_id/timesheet",
            get(worker_timesheet),
        )
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "scheduling-service"
    }))
}

/// Check whether a user holds crew chief authority over a target
///
/// A missing user or target is a 404, distinct from a plain
/// `{"authorized": false}` denial.
pub async fn check_authority(
    State(state): State<AppState>,
    Query(query): Query<AuthorityCheckQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = AuthorityTarget::from_type(query.permission_type, query.target_id);
    let authorized = state.permissions.check_authority(query.user_id, target).await?;

    Ok(Json(AuthorityCheckResponse { authorized }))
}

/// Grant crew chief permission over a target to a user
pub async fn grant_permission(
    State(state): State<AppState>,
    Json(payload): Json<GrantPermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "Grant request: {} on {} for user {}",
        payload.permission_type, payload.target_id, payload.user_id
    );

    let grant: PermissionGrant = state
        .permissions
        .grant_permission(
            payload.user_id,
            payload.permission_type,
            payload.target_id,
            payload.granted_by,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Revoke all active grants for a user/type/target tuple
///
/// Revoking an absent or already-revoked grant is a success with
/// `revoked: 0`.
pub async fn revoke_permission(
    State(state): State<AppState>,
    Json(payload): Json<RevokePermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .permissions
        .revoke_permission(payload.user_id, payload.permission_type, payload.target_id)
        .await?;

    Ok(Json(RevokePermissionResponse { revoked }))
}

/// List the active grants for a target, enriched for admin display
pub async fn list_permissions(
    State(state): State<AppState>,
    Query(query): Query<PermissionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let grants: Vec<PermissionGrantView> = state
        .permissions
        .list_permissions(query.permission_type, query.target_id)
        .await?;

    Ok(Json(grants))
}

/// Rounded timesheet for every worker on a shift
///
/// Each entry's displayed times and its hours come out of the same
/// rounding pass, so the table always matches the payable total.
pub async fn shift_timesheet(
    State(state): State<AppState>,
    Path(shift_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let shift = state
        .directory
        .find_shift(shift_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up shift {}: {}", shift_id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound(format!("shift {} not found", shift_id)))?;

    let entries = state.time_entries.list_for_shift(shift_id).await.map_err(|e| {
        tracing::error!("Failed to load time entries for shift {}: {}", shift_id, e);
        ApiError::InternalServerError
    })?;

    let mut workers: Vec<WorkerTimesheet> = Vec::new();
    let mut all_pairs: Vec<ClockPair> = Vec::new();
    for entry in entries {
        let pair = entry.clock_pair();
        let display = timekeeping::time_entry_display(
            pair.clock_in.as_deref(),
            pair.clock_out.as_deref(),
        );
        all_pairs.push(pair);

        let row = TimesheetEntry {
            entry_number: entry.entry_number,
            display,
        };
        // Entries arrive ordered by worker, so grouping is a matter of
        // comparing against the last bucket.
        match workers.last_mut() {
            Some(worker) if worker.user_id == entry.user_id => worker.entries.push(row),
            _ => workers.push(WorkerTimesheet {
                user_id: entry.user_id,
                entries: vec![row],
                total_hours: String::new(),
            }),
        }
    }

    for worker in &mut workers {
        let pairs: Vec<ClockPair> = worker
            .entries
            .iter()
            .map(|e| ClockPair {
                clock_in: e.display.rounded_clock_in.clone(),
                clock_out: e.display.rounded_clock_out.clone(),
            })
            .collect();
        worker.total_hours = timekeeping::calculate_total_rounded_hours(&pairs);
    }

    let shift_date = timekeeping::format_date(&shift.starts_at.to_rfc3339());

    Ok(Json(TimesheetResponse {
        shift_id,
        shift_date,
        total_hours: timekeeping::calculate_total_rounded_hours(&all_pairs),
        workers,
    }))
}

/// Rounded timesheet for one worker on a shift
pub async fn worker_timesheet(
    State(state): State<AppState>,
    Path((shift_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .directory
        .find_shift(shift_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up shift {}: {}", shift_id, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound(format!("shift {} not found", shift_id)))?;

    let entries = state
        .time_entries
        .list_for_worker(shift_id, user_id)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to load time entries for worker {} on shift {}: {}",
                user_id,
                shift_id,
                e
            );
            ApiError::InternalServerError
        })?;

    let mut pairs: Vec<ClockPair> = Vec::new();
    let mut rows: Vec<TimesheetEntry> = Vec::new();
    for entry in entries {
        let pair = entry.clock_pair();
        rows.push(TimesheetEntry {
            entry_number: entry.entry_number,
            display: timekeeping::time_entry_display(
                pair.clock_in.as_deref(),
                pair.clock_out.as_deref(),
            ),
        });
        pairs.push(pair);
    }

    Ok(Json(WorkerTimesheet {
        user_id,
        total_hours: timekeeping::calculate_total_rounded_hours(&pairs),
        entries: rows,
    }))
}
