//! HTTP surface of the gateway.
//!
//! Public routes: health and the doctor directory. Everything else sits
//! behind the identity middleware and receives a verified [`Principal`] as
//! a request extension. Handlers translate between HTTP and the core's
//! operations and do nothing else; every rule lives in `clinic-core`.

use crate::domain::error::ApiError;
use crate::middleware::identity::require_identity;
use crate::ws;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Json, Router};
use clinic_core::{
    AppointmentService, AppointmentView, BookingRequest, ChatMessageView, ClinicStore, EntityId,
    Principal, RoomBroker, TransitionRequest, UserView,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClinicStore>,
    pub service: Arc<AppointmentService>,
    pub broker: Arc<RoomBroker>,
    pub auth_secret: Arc<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        auth_secret: impl Into<String>,
        room_capacity: usize,
    ) -> Self {
        Self {
            service: Arc::new(AppointmentService::new(store.clone())),
            broker: Arc::new(RoomBroker::with_capacity(store.clone(), room_capacity)),
            store,
            auth_secret: Arc::new(auth_secret.into()),
        }
    }
}

/// Build the full route tree.
pub fn router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/appointments", post(book))
        .route("/appointments/mine", get(my_appointments))
        .route("/appointments/:id/status", patch(update_status))
        .route("/chat/:appointment_id", get(chat_history).post(chat_post))
        .route("/chat/:appointment_id/ws", get(ws::room_ws))
        .route("/admin/users", get(admin_users))
        .route("/admin/appointments", get(admin_appointments))
        .route("/admin/users/:id", delete(admin_delete_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/doctors", get(doctors))
        .merge(authed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": clinic_core::VERSION,
    }))
}

async fn doctors(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(state.service.list_doctors().await?))
}

async fn book(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<AppointmentView>), ApiError> {
    let view = state.service.book(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn my_appointments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<AppointmentView>>, ApiError> {
    Ok(Json(state.service.my_appointments(&principal).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EntityId>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<AppointmentView>, ApiError> {
    Ok(Json(state.service.transition(&principal, id, request).await?))
}

async fn chat_history(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<EntityId>,
) -> Result<Json<Vec<ChatMessageView>>, ApiError> {
    Ok(Json(state.broker.history(&principal, appointment_id).await?))
}

#[derive(Debug, Deserialize)]
struct PostMessageRequest {
    message: String,
}

async fn chat_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<EntityId>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessageView>), ApiError> {
    let view = state
        .broker
        .post(&principal, appointment_id, &request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn admin_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(state.service.admin_list_users(&principal).await?))
}

async fn admin_appointments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<AppointmentView>>, ApiError> {
    Ok(Json(state.service.admin_list_appointments(&principal).await?))
}

async fn admin_delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
    state.service.admin_delete_user(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
