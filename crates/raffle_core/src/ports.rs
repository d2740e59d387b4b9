//! crates/raffle_core/src/ports.rs
//!
//! Defines the service contracts (traits) the application core talks to.
//! These traits form the boundary of the hexagonal architecture: the auth
//! gateway, the user-record store and the raffle store all live outside the
//! core and are reached only through these ports.

use crate::domain::{Credentials, NewRaffle, Raffle, Session, TicketNumber, UserRecord};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Every change of the current session, `None` meaning signed out.
pub type SessionChanges = Pin<Box<dyn Stream<Item = Option<Session>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The hosted identity service, as seen by one client.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Signs in and, on success, notifies subscribers with the new session.
    async fn sign_in(&self, credentials: &Credentials) -> PortResult<Session>;

    /// Ends the current session and notifies subscribers with `None`.
    async fn sign_out(&self) -> PortResult<()>;

    /// The live session, if any.
    async fn current_session(&self) -> PortResult<Option<Session>>;

    /// Session changes occurring after this call, for as long as the stream is held.
    fn subscribe(&self) -> SessionChanges;
}

#[async_trait]
pub trait UserRecordStore: Send + Sync {
    /// Looks up the single record keyed by `user_id`.
    async fn find_user_record(&self, user_id: Uuid) -> PortResult<Option<UserRecord>>;
}

#[async_trait]
pub trait RaffleStore: Send + Sync {
    async fn list_raffles(&self) -> PortResult<Vec<Raffle>>;

    async fn get_raffle(&self, raffle_id: Uuid) -> PortResult<Raffle>;

    async fn create_raffle(&self, raffle: NewRaffle) -> PortResult<Raffle>;

    async fn delete_raffle(&self, raffle_id: Uuid) -> PortResult<()>;

    /// Every number `1..=total_tickets` of the raffle with its current status.
    async fn list_ticket_numbers(&self, raffle_id: Uuid) -> PortResult<Vec<TicketNumber>>;
}
