//! services/app/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `UserRecordStore` and `RaffleStore` ports from the core crate. It also
//! owns the credential and auth-session tables used by the auth adapter. All
//! interactions with PostgreSQL go through `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use raffle_core::domain::{
    AuthUser, NewRaffle, Raffle, Session, TicketNumber, TicketStatus, UserRecord,
};
use raffle_core::ports::{PortError, PortResult, RaffleStore, UserRecordStore};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts `raffles` when the raffle table is empty. Returns how many were inserted.
    pub async fn seed_raffles(&self, raffles: Vec<NewRaffle>) -> PortResult<usize> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raffles")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        if existing > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for raffle in raffles {
            self.create_raffle(raffle).await?;
            inserted += 1;
        }
        info!("Seeded {} sample raffles", inserted);
        Ok(inserted)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRoleRecord {
    user_id: Uuid,
    role: Option<String>,
}
impl UserRoleRecord {
    fn to_domain(self) -> UserRecord {
        UserRecord {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Only used internally for login/signup - contains sensitive data.
#[derive(FromRow)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    email: String,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> Session {
        Session {
            access_token: self.id,
            user: AuthUser {
                user_id: self.user_id,
                email: self.email,
            },
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct RaffleRecord {
    id: Uuid,
    name: String,
    total_tickets: i32,
    unit_price: i64,
    draw_date: NaiveDate,
}
impl RaffleRecord {
    fn to_domain(self) -> Raffle {
        Raffle {
            id: self.id,
            name: self.name,
            total_tickets: self.total_tickets as u32,
            unit_price: self.unit_price as u64,
            draw_date: self.draw_date,
        }
    }
}

#[derive(FromRow)]
struct TicketRecord {
    number: i32,
    status: String,
}
impl TicketRecord {
    fn status(&self) -> TicketStatus {
        match self.status.as_str() {
            "sold" => TicketStatus::Sold,
            "reserved" => TicketStatus::Reserved,
            _ => TicketStatus::Available,
        }
    }
}

//=========================================================================================
// Credentials & Auth Sessions
//=========================================================================================

impl DbAdapter {
    pub async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<AuthUser> {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("Email {} is already registered", email))
                }
                _ => unexpected(e),
            })?;
        Ok(AuthUser {
            user_id,
            email: email.to_string(),
        })
    }

    pub async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))
    }

    pub async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    /// The unexpired session with this id, joined with its user.
    pub async fn find_auth_session(&self, session_id: &str) -> PortResult<Session> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT s.id, s.user_id, u.email, s.expires_at \
             FROM auth_sessions s JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "Auth session not found".to_string()))?;
        Ok(record.to_domain())
    }

    pub async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `UserRecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRecordStore for DbAdapter {
    async fn find_user_record(&self, user_id: Uuid) -> PortResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRoleRecord>(
            "SELECT user_id, role FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(UserRoleRecord::to_domain))
    }
}

//=========================================================================================
// `RaffleStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RaffleStore for DbAdapter {
    async fn list_raffles(&self) -> PortResult<Vec<Raffle>> {
        let records = sqlx::query_as::<_, RaffleRecord>(
            "SELECT id, name, total_tickets, unit_price, draw_date FROM raffles \
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_raffle(&self, raffle_id: Uuid) -> PortResult<Raffle> {
        let record = sqlx::query_as::<_, RaffleRecord>(
            "SELECT id, name, total_tickets, unit_price, draw_date FROM raffles WHERE id = $1",
        )
        .bind(raffle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Raffle {} not found", raffle_id)))?;
        Ok(record.to_domain())
    }

    async fn create_raffle(&self, raffle: NewRaffle) -> PortResult<Raffle> {
        let total_tickets = i32::try_from(raffle.total_tickets)
            .map_err(|_| PortError::Unexpected("total tickets out of range".to_string()))?;
        let unit_price = i64::try_from(raffle.unit_price)
            .map_err(|_| PortError::Unexpected("unit price out of range".to_string()))?;

        let record = sqlx::query_as::<_, RaffleRecord>(
            "INSERT INTO raffles (id, name, total_tickets, unit_price, draw_date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, total_tickets, unit_price, draw_date",
        )
        .bind(Uuid::new_v4())
        .bind(&raffle.name)
        .bind(total_tickets)
        .bind(unit_price)
        .bind(raffle.draw_date)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_raffle(&self, raffle_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM raffles WHERE id = $1")
            .bind(raffle_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Raffle {} not found", raffle_id)));
        }
        Ok(())
    }

    async fn list_ticket_numbers(&self, raffle_id: Uuid) -> PortResult<Vec<TicketNumber>> {
        let raffle = self.get_raffle(raffle_id).await?;
        let records = sqlx::query_as::<_, TicketRecord>(
            "SELECT number, status FROM tickets WHERE raffle_id = $1",
        )
        .bind(raffle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let taken: HashMap<u32, TicketStatus> = records
            .iter()
            .map(|r| (r.number as u32, r.status()))
            .collect();
        Ok((1..=raffle.total_tickets)
            .map(|n| {
                let status = taken.get(&n).copied().unwrap_or(TicketStatus::Available);
                TicketNumber::new(n, status)
            })
            .collect())
    }
}
