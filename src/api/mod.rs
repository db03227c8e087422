// HTTP API routes (league, match and player CRUD plus statistics).

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::db::Database;
use crate::metrics;
use crate::stats;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateLeagueRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLeagueRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct MatchRequest {
    pub player1: String,
    pub player2: String,
    pub player1_score: i64,
    pub player2_score: i64,
}

#[derive(Deserialize)]
pub struct CreatePlayerRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

// ── Validation ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("player names must not be empty")]
    EmptyPlayerName,
    #[error("a match needs two distinct players")]
    SamePlayers,
    #[error("scores must be non-negative")]
    NegativeScore,
}

fn validate_match(req: &MatchRequest) -> Result<(), ValidationError> {
    if req.player1.trim().is_empty() || req.player2.trim().is_empty() {
        return Err(ValidationError::EmptyPlayerName);
    }
    if req.player1 == req.player2 {
        return Err(ValidationError::SamePlayers);
    }
    if req.player1_score < 0 || req.player2_score < 0 {
        return Err(ValidationError::NegativeScore);
    }
    Ok(())
}

// ── Error helpers ─────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn internal_error(e: sqlx::Error) -> impl IntoResponse {
    tracing::error!("Database error: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn success_message(msg: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": msg })),
    )
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(db: Arc<Database>) -> Router {
    let state = AppState { db };

    Router::new()
        // Leagues
        .route("/api/leagues", get(list_leagues).post(create_league))
        .route(
            "/api/leagues/{id}",
            get(get_league).put(update_league).delete(delete_league),
        )
        // Matches
        .route(
            "/api/leagues/{id}/matches",
            get(list_matches).post(create_match),
        )
        .route("/api/matches/{id}", put(update_match).delete(delete_match))
        // Players
        .route(
            "/api/leagues/{id}/players",
            get(list_players).post(create_player),
        )
        .route(
            "/api/leagues/{id}/players/{name}",
            get(get_player_stats).delete(delete_player),
        )
        // Statistics
        .route("/api/leagues/{id}/player-stats", get(get_league_rankings))
        .route("/api/leagues/{id}/rankings", get(get_league_rankings))
        .route(
            "/api/leagues/{id}/head-to-head/{player1}/{player2}",
            get(get_head_to_head),
        )
        .route("/api/leagues/{id}/recent", get(get_recent_matches))
        .route("/api/leagues/{id}/stats", get(get_league_stats))
        .with_state(state)
}

// ── League handlers ───────────────────────────────────────────────────

async fn list_leagues(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.list_leagues().await {
        Ok(leagues) => (StatusCode::OK, Json(json!(leagues))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn create_league(
    State(state): State<AppState>,
    Json(req): Json<CreateLeagueRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "name is required").into_response();
    }
    match state.db.create_league(&req.name, req.description.as_deref()).await {
        Ok(league) => {
            metrics::LEAGUES_CREATED_TOTAL.inc();
            (StatusCode::CREATED, Json(json!(league))).into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_league(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.db.get_league(&id).await {
        Ok(Some(league)) => (StatusCode::OK, Json(json!(league))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn update_league(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLeagueRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "name is required").into_response();
    }
    // A missing description means "leave it as it is", not "clear it".
    match state
        .db
        .update_league(&id, &req.name, req.description.as_deref())
        .await
    {
        Ok(Some(league)) => (StatusCode::OK, Json(json!(league))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_league(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.db.delete_league(&id).await {
        Ok(true) => success_message("League deleted successfully").into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

// ── Match handlers ────────────────────────────────────────────────────

async fn create_match(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
    Json(req): Json<MatchRequest>,
) -> impl IntoResponse {
    match state.db.get_league(&league_id).await {
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
        Ok(Some(_)) => {}
    }
    if let Err(e) = validate_match(&req) {
        return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response();
    }
    let winner = stats::decide_winner(
        &req.player1,
        &req.player2,
        req.player1_score,
        req.player2_score,
    )
    .to_string();
    match state
        .db
        .create_match(
            &league_id,
            &req.player1,
            &req.player2,
            req.player1_score,
            req.player2_score,
            &winner,
        )
        .await
    {
        Ok(m) => {
            metrics::MATCHES_RECORDED_TOTAL.inc();
            (StatusCode::CREATED, Json(json!(m))).into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn list_matches(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);
    match state.db.list_matches(&league_id, limit, offset).await {
        Ok(matches) => (StatusCode::OK, Json(json!(matches))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn update_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MatchRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_match(&req) {
        return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response();
    }
    let winner = stats::decide_winner(
        &req.player1,
        &req.player2,
        req.player1_score,
        req.player2_score,
    )
    .to_string();
    match state
        .db
        .update_match(
            &id,
            &req.player1,
            &req.player2,
            req.player1_score,
            req.player2_score,
            &winner,
        )
        .await
    {
        Ok(Some(m)) => (StatusCode::OK, Json(json!(m))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Match not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_match(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.db.delete_match(&id).await {
        Ok(true) => success_message("Match deleted successfully").into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Match not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

// ── Player handlers ───────────────────────────────────────────────────

async fn list_players(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
) -> impl IntoResponse {
    match state.db.get_league(&league_id).await {
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
        Ok(Some(_)) => {}
    }
    match state.db.list_players(&league_id).await {
        Ok(players) => (StatusCode::OK, Json(json!(players))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn create_player(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
    Json(req): Json<CreatePlayerRequest>,
) -> impl IntoResponse {
    match state.db.get_league(&league_id).await {
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
        Ok(Some(_)) => {}
    }
    if req.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "name is required").into_response();
    }
    // A name is taken if it is on the roster or already appears in match rows.
    let on_roster = match state.db.get_player(&league_id, &req.name).await {
        Ok(p) => p.is_some(),
        Err(e) => return internal_error(e).into_response(),
    };
    let in_matches = match state.db.player_has_matches(&league_id, &req.name).await {
        Ok(b) => b,
        Err(e) => return internal_error(e).into_response(),
    };
    if on_roster || in_matches {
        return json_error(
            StatusCode::BAD_REQUEST,
            "Player already exists in this league",
        )
        .into_response();
    }
    match state.db.create_player(&league_id, &req.name).await {
        Ok(player) => {
            metrics::PLAYERS_CREATED_TOTAL.inc();
            (StatusCode::CREATED, Json(json!(player))).into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn delete_player(
    State(state): State<AppState>,
    Path((league_id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.db.get_league(&league_id).await {
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
        Ok(Some(_)) => {}
    }
    match state.db.player_has_matches(&league_id, &name).await {
        Ok(true) => {
            return json_error(
                StatusCode::CONFLICT,
                "Cannot delete player because they have match records. Delete all matches first.",
            )
            .into_response()
        }
        Err(e) => return internal_error(e).into_response(),
        Ok(false) => {}
    }
    match state.db.delete_player(&league_id, &name).await {
        Ok(true) => success_message("Player deleted successfully").into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Player not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

// ── Statistics handlers ───────────────────────────────────────────────

async fn league_rankings(
    state: &AppState,
    league_id: &str,
) -> Result<Vec<stats::PlayerStats>, sqlx::Error> {
    let matches = state.db.list_matches_chronological(league_id).await?;
    let roster: Vec<String> = state
        .db
        .list_players(league_id)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    Ok(stats::compute_rankings(&matches, &roster))
}

/// Serves both `/player-stats` and `/rankings`; the payloads are identical.
async fn get_league_rankings(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
) -> impl IntoResponse {
    match state.db.get_league(&league_id).await {
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "League not found").into_response(),
        Err(e) => return internal_error(e).into_response(),
        Ok(Some(_)) => {}
    }
    match league_rankings(&state, &league_id).await {
        Ok(rankings) => (StatusCode::OK, Json(json!(rankings))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_player_stats(
    State(state): State<AppState>,
    Path((league_id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let matches = match state.db.list_matches_for_player(&league_id, &name).await {
        Ok(m) => m,
        Err(e) => return internal_error(e).into_response(),
    };
    if let Some(stats) = stats::player_stats(&matches, &name) {
        return (StatusCode::OK, Json(json!(stats))).into_response();
    }
    // No matches yet: roster players still get a zeroed stats row.
    match state.db.get_player(&league_id, &name).await {
        Ok(Some(_)) => (
            StatusCode::OK,
            Json(json!(stats::PlayerStats::new(&name))),
        )
            .into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Player not found").into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_head_to_head(
    State(state): State<AppState>,
    Path((league_id, player1, player2)): Path<(String, String, String)>,
) -> impl IntoResponse {
    match state
        .db
        .list_matches_between(&league_id, &player1, &player2)
        .await
    {
        Ok(matches) => (
            StatusCode::OK,
            Json(stats::head_to_head(&matches, &player1, &player2)),
        )
            .into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_recent_matches(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
    Query(params): Query<RecentParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    match state.db.list_matches(&league_id, limit, 0).await {
        Ok(matches) => (StatusCode::OK, Json(json!(matches))).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn get_league_stats(
    State(state): State<AppState>,
    Path(league_id): Path<String>,
) -> impl IntoResponse {
    let matches = match state.db.list_matches_chronological(&league_id).await {
        Ok(m) => m,
        Err(e) => return internal_error(e).into_response(),
    };
    let roster: Vec<String> = match state.db.list_players(&league_id).await {
        Ok(players) => players.into_iter().map(|p| p.name).collect(),
        Err(e) => return internal_error(e).into_response(),
    };
    let summary = stats::league_summary(&matches, &roster);
    (StatusCode::OK, Json(json!(summary))).into_response()
}
