use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthorityUser,
    buses::{
        dto::{
            BusDetailsResponse, BusListResponse, BusResponse, CreateBusRequest,
            CreateScheduleRequest, ListBusesQuery, ScheduleResponse,
        },
        services,
    },
    error::{ApiJson, ApiPath, ApiQuery, AppError},
    state::AppState,
};

pub fn bus_routes() -> Router<AppState> {
    Router::new()
        .route("/buses", get(list_buses).post(create_bus))
        .route("/buses/:id", get(get_bus))
        .route("/buses/:id/schedules", post(add_schedule))
}

#[instrument(skip(state))]
pub async fn list_buses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListBusesQuery>,
) -> Result<Json<BusListResponse>, AppError> {
    let buses = services::list_buses(&state, query).await?;
    Ok(Json(BusListResponse { buses }))
}

#[instrument(skip(state))]
pub async fn get_bus(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<BusDetailsResponse>, AppError> {
    let bus = services::get_bus(&state, id).await?;
    Ok(Json(BusDetailsResponse { bus }))
}

#[instrument(skip(state, claims, payload), fields(user_id = claims.id))]
pub async fn create_bus(
    State(state): State<AppState>,
    AuthorityUser(claims): AuthorityUser,
    ApiJson(payload): ApiJson<CreateBusRequest>,
) -> Result<Json<BusResponse>, AppError> {
    let bus = services::create_bus(&state, payload).await?;
    Ok(Json(BusResponse { bus }))
}

#[instrument(skip(state, claims, payload), fields(user_id = claims.id))]
pub async fn add_schedule(
    State(state): State<AppState>,
    AuthorityUser(claims): AuthorityUser,
    ApiPath(bus_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CreateScheduleRequest>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let schedule = services::add_schedule(&state, bus_id, payload).await?;
    Ok(Json(ScheduleResponse { schedule }))
}
