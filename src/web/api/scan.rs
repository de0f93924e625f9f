use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::channel::ChannelBoard;
use crate::scan::{ScanCommand, ScanMode, ScanReport};
use crate::tracker::{Track, TrackId};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{AppState, Control, Operator, View};

#[derive(Debug, Deserialize, ToSchema)]
pub struct HorizontalRequest {
    pub points: usize,
    pub elevation: i32,
    pub passes: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionRequest {
    pub start: i32,
    pub end: i32,
    pub points: usize,
    pub elevation: i32,
    pub passes: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefineRequest {
    pub track_id: TrackId,
    pub radius: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ThresholdRequest {
    /// Fixed threshold in dB. Omit to return to the adaptive estimate.
    pub threshold_db: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommandAccepted {
    pub command: ScanCommand,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub mode: ScanMode,
    pub last_error: Option<String>,
    pub track_count: usize,
}

type Accepted = (StatusCode, Json<CommandAccepted>);

fn submit(state: &AppState, user: &Operator<Control>, command: ScanCommand) -> ApiResult<Accepted> {
    log::info!("{} requested {}", user.name, command);
    state.engine.submit(command.clone())?;
    Ok((StatusCode::ACCEPTED, Json(CommandAccepted { command })))
}

fn check_sweep(state: &AppState, points: usize, elevation: i32) -> ApiResult<()> {
    if points == 0 {
        return Err(ApiError::Validation("points must be at least 1".into()));
    }
    let window = state.config.motion.limits.elevation_safety;
    if !window.contains(elevation) {
        return Err(ApiError::Validation(format!(
            "elevation {} outside {}..={}",
            elevation, window.min, window.max
        )));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/scan/full",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Full-area sweep queued", body = CommandAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn full(State(state): State<AppState>, user: Operator<Control>) -> ApiResult<Accepted> {
    submit(&state, &user, ScanCommand::FullSweep)
}

#[utoipa::path(
    post,
    path = "/api/scan/horizontal",
    request_body = HorizontalRequest,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Horizontal sweep queued", body = CommandAccepted),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn horizontal(
    State(state): State<AppState>,
    user: Operator<Control>,
    Json(request): Json<HorizontalRequest>,
) -> ApiResult<Accepted> {
    check_sweep(&state, request.points, request.elevation)?;
    submit(
        &state,
        &user,
        ScanCommand::HorizontalSweep {
            points: request.points,
            elevation: request.elevation,
            passes: request.passes,
        },
    )
}

#[utoipa::path(
    post,
    path = "/api/scan/section",
    request_body = SectionRequest,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Section sweep queued", body = CommandAccepted),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn section(
    State(state): State<AppState>,
    user: Operator<Control>,
    Json(request): Json<SectionRequest>,
) -> ApiResult<Accepted> {
    check_sweep(&state, request.points, request.elevation)?;
    if request.start >= request.end {
        return Err(ApiError::Validation("start must be below end".into()));
    }
    submit(
        &state,
        &user,
        ScanCommand::SectionSweep {
            start: request.start,
            end: request.end,
            points: request.points,
            elevation: request.elevation,
            passes: request.passes,
        },
    )
}

#[utoipa::path(
    post,
    path = "/api/scan/single",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Single measurement queued", body = CommandAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn single(State(state): State<AppState>, user: Operator<Control>) -> ApiResult<Accepted> {
    submit(&state, &user, ScanCommand::SingleScan)
}

#[utoipa::path(
    post,
    path = "/api/scan/stop",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Stop requested", body = CommandAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn stop(State(state): State<AppState>, user: Operator<Control>) -> ApiResult<Accepted> {
    submit(&state, &user, ScanCommand::Stop)
}

#[utoipa::path(
    post,
    path = "/api/scan/forward",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Move to forward position queued", body = CommandAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn forward(State(state): State<AppState>, user: Operator<Control>) -> ApiResult<Accepted> {
    submit(&state, &user, ScanCommand::Forward)
}

#[utoipa::path(
    post,
    path = "/api/scan/refine",
    request_body = RefineRequest,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Refinement queued", body = CommandAccepted),
        (status = 404, description = "Unknown track", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn refine(
    State(state): State<AppState>,
    user: Operator<Control>,
    Json(request): Json<RefineRequest>,
) -> ApiResult<Accepted> {
    let known = state
        .status
        .status()
        .tracks
        .iter()
        .any(|t| t.id == request.track_id);
    if !known {
        return Err(ApiError::UnknownTrack(request.track_id));
    }
    submit(
        &state,
        &user,
        ScanCommand::RefineTrack {
            track_id: request.track_id,
            radius: request.radius,
        },
    )
}

#[utoipa::path(
    post,
    path = "/api/scan/clear",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Track list reset queued", body = CommandAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn clear(State(state): State<AppState>, user: Operator<Control>) -> ApiResult<Accepted> {
    submit(&state, &user, ScanCommand::ClearTracks)
}

#[utoipa::path(
    post,
    path = "/api/scan/threshold",
    request_body = ThresholdRequest,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Threshold change queued", body = CommandAccepted),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn threshold(
    State(state): State<AppState>,
    user: Operator<Control>,
    Json(request): Json<ThresholdRequest>,
) -> ApiResult<Accepted> {
    if let Some(db) = request.threshold_db {
        if !db.is_finite() {
            return Err(ApiError::Validation("threshold_db must be finite".into()));
        }
    }
    submit(
        &state,
        &user,
        ScanCommand::SetThreshold {
            threshold_db: request.threshold_db,
        },
    )
}

#[utoipa::path(
    post,
    path = "/api/scan/calibrate",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Calibration queued", body = CommandAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn calibrate(
    State(state): State<AppState>,
    user: Operator<Control>,
) -> ApiResult<Accepted> {
    submit(&state, &user, ScanCommand::Calibrate)
}

#[utoipa::path(
    get,
    path = "/api/scan/status",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Engine mode", body = StatusResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn status(
    State(state): State<AppState>,
    _user: Operator<View>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.status.status();
    Ok(Json(StatusResponse {
        mode: status.mode,
        last_error: status.last_error,
        track_count: status.tracks.len(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/scan/report",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Latest measurement", body = Option<ScanReport>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn report(
    State(state): State<AppState>,
    _user: Operator<View>,
) -> ApiResult<Json<Option<ScanReport>>> {
    Ok(Json(state.status.status().last_report))
}

#[utoipa::path(
    get,
    path = "/api/scan/tracks",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Active tracks", body = Vec<Track>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn tracks(
    State(state): State<AppState>,
    _user: Operator<View>,
) -> ApiResult<Json<Vec<Track>>> {
    Ok(Json(state.status.status().tracks))
}

#[utoipa::path(
    get,
    path = "/api/scan/channels",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Strongest track per channel", body = ChannelBoard),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn channels(
    State(state): State<AppState>,
    _user: Operator<View>,
) -> ApiResult<Json<ChannelBoard>> {
    let tracks = state.status.status().tracks;
    Ok(Json(ChannelBoard::from_tracks(
        &tracks,
        &state.config.motion.limits,
    )))
}
