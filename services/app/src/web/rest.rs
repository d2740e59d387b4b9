//! services/app/src/web/rest.rs
//!
//! Contains the Axum handlers for the raffle REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, LoginRequest, SignupRequest},
    protocol::{RaffleNumbersPayload, RafflePayload, TicketPayload},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::NaiveDate;
use raffle_core::domain::{NewRaffle, Role, Session, TicketStatus};
use raffle_core::ports::PortError;
use raffle_core::role::RoleResolver;
use raffle_core::views::RaffleNumbers;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        list_raffles_handler,
        create_raffle_handler,
        delete_raffle_handler,
        raffle_numbers_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            CreateRaffleRequest,
            RafflePayload,
            RaffleNumbersPayload,
            TicketPayload
        )
    ),
    tags(
        (name = "Raffle API", description = "Auth and raffle management endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateRaffleRequest {
    pub name: String,
    pub total_tickets: u32,
    pub unit_price: u64,
    pub draw_date: NaiveDate,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Conflict(message) => (StatusCode::CONFLICT, message),
        PortError::Unauthorized | PortError::InvalidCredentials(_) => {
            (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
        }
        PortError::Unexpected(message) => {
            error!("Raffle store error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Resolves the caller's role and rejects anyone but an administrator.
async fn require_admin(state: &AppState, session: &Session) -> Result<(), (StatusCode, String)> {
    let role = RoleResolver::new(state.users.clone())
        .resolve(session.user_id())
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    match role {
        Role::Administrator => Ok(()),
        Role::Customer => {
            warn!("User {} attempted an administrator action", session.user.email);
            Err((
                StatusCode::FORBIDDEN,
                "Only administrators can manage raffles".to_string(),
            ))
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every raffle.
#[utoipa::path(
    get,
    path = "/raffles",
    responses(
        (status = 200, description = "All raffles", body = Vec<RafflePayload>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_raffles_handler(
    State(state): State<Arc<AppState>>,
    Extension(_session): Extension<Session>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let raffles = state.raffles.list_raffles().await.map_err(port_error_response)?;
    let payload: Vec<RafflePayload> = raffles.iter().map(RafflePayload::from).collect();
    Ok(Json(payload))
}

/// Create a raffle. Administrators only.
#[utoipa::path(
    post,
    path = "/raffles",
    request_body = CreateRaffleRequest,
    responses(
        (status = 201, description = "Raffle created", body = RafflePayload),
        (status = 400, description = "Invalid raffle"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn create_raffle_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateRaffleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&state, &session).await?;

    let raffle = NewRaffle {
        name: req.name.trim().to_string(),
        total_tickets: req.total_tickets,
        unit_price: req.unit_price,
        draw_date: req.draw_date,
    };
    raffle
        .validate()
        .map_err(|reason| (StatusCode::BAD_REQUEST, reason))?;

    let created = state
        .raffles
        .create_raffle(raffle)
        .await
        .map_err(port_error_response)?;
    info!("{} created raffle {}", session.user.email, created.id);
    Ok((StatusCode::CREATED, Json(RafflePayload::from(&created))))
}

/// Delete a raffle and its tickets. Administrators only.
#[utoipa::path(
    delete,
    path = "/raffles/{id}",
    params(("id" = Uuid, Path, description = "The raffle to delete.")),
    responses(
        (status = 204, description = "Raffle deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "No such raffle")
    )
)]
pub async fn delete_raffle_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(raffle_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&state, &session).await?;
    state
        .raffles
        .delete_raffle(raffle_id)
        .await
        .map_err(port_error_response)?;
    info!("{} deleted raffle {}", session.user.email, raffle_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Every number of a raffle with its status. Administrators only.
#[utoipa::path(
    get,
    path = "/raffles/{id}/numbers",
    params(("id" = Uuid, Path, description = "The raffle to inspect.")),
    responses(
        (status = 200, description = "Numbers with status", body = RaffleNumbersPayload),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "No such raffle")
    )
)]
pub async fn raffle_numbers_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(raffle_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_admin(&state, &session).await?;
    let raffle = state
        .raffles
        .get_raffle(raffle_id)
        .await
        .map_err(port_error_response)?;
    let numbers = state
        .raffles
        .list_ticket_numbers(raffle_id)
        .await
        .map_err(port_error_response)?;

    let numbers = RaffleNumbers { raffle, numbers };
    info!(
        "Raffle {}: {} sold, {} reserved",
        raffle_id,
        numbers.count(TicketStatus::Sold),
        numbers.count(TicketStatus::Reserved)
    );
    Ok(Json(RaffleNumbersPayload::from(&numbers)))
}
