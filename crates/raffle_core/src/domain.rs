//! crates/raffle_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Number of cells in the customer ticket grid.
pub const TICKET_GRID_SIZE: u32 = 100;

/// Upper bound accepted when an administrator creates a raffle.
pub const MAX_TICKETS_PER_RAFFLE: u32 = 10_000;

/// Largest ticket price accepted, so that every ticket of the largest raffle
/// can be priced without leaving the store's signed 64-bit range.
pub const MAX_UNIT_PRICE: u64 = i64::MAX as u64 / MAX_TICKETS_PER_RAFFLE as u64;

//=========================================================================================
// Identity & Sessions
//=========================================================================================

/// The user identity embedded in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Proof of authenticated identity issued by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Email/password pair submitted from the login form.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Surrounding whitespace is stripped from the email so sign-up and
    /// sign-in agree on the stored address.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

//=========================================================================================
// Roles
//=========================================================================================

/// Authorization class of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Customer,
}

impl Role {
    /// Interprets the raw role field of a user record.
    ///
    /// Only an explicit `admin`/`administrator` value grants the administrator
    /// role; a missing or unrecognised value is a customer.
    pub fn from_record_field(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v)
                if v.eq_ignore_ascii_case("admin") || v.eq_ignore_ascii_case("administrator") =>
            {
                Role::Administrator
            }
            _ => Role::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Customer => "customer",
        }
    }
}

/// A row of the user-record store, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub role: Option<String>,
}

//=========================================================================================
// Raffles & Tickets
//=========================================================================================

/// A sellable pool of numbered tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raffle {
    pub id: Uuid,
    pub name: String,
    pub total_tickets: u32,
    /// Price of one ticket, in whole currency units.
    pub unit_price: u64,
    pub draw_date: NaiveDate,
}

/// The fields an administrator supplies when creating a raffle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRaffle {
    pub name: String,
    pub total_tickets: u32,
    pub unit_price: u64,
    pub draw_date: NaiveDate,
}

impl NewRaffle {
    /// Checks the submitted fields, returning a human readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("raffle name must not be empty".to_string());
        }
        if self.total_tickets == 0 || self.total_tickets > MAX_TICKETS_PER_RAFFLE {
            return Err(format!(
                "total tickets must be between 1 and {}",
                MAX_TICKETS_PER_RAFFLE
            ));
        }
        if self.unit_price > MAX_UNIT_PRICE {
            return Err(format!("unit price must not exceed {}", MAX_UNIT_PRICE));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Available,
    Reserved,
    Sold,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Available => "available",
            TicketStatus::Reserved => "reserved",
            TicketStatus::Sold => "sold",
        }
    }
}

/// A single numbered ticket of a raffle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketNumber {
    pub id: u32,
    pub label: String,
    pub status: TicketStatus,
}

impl TicketNumber {
    pub fn new(id: u32, status: TicketStatus) -> Self {
        Self {
            id,
            label: ticket_label(id),
            status,
        }
    }

    pub fn available(id: u32) -> Self {
        Self::new(id, TicketStatus::Available)
    }
}

/// Zero-padded, at least three digits: `7` becomes `"007"`.
pub fn ticket_label(id: u32) -> String {
    format!("{:03}", id)
}

/// The deterministic sequence `1..=count`, every number available.
pub fn ticket_sequence(count: u32) -> Vec<TicketNumber> {
    (1..=count).map(TicketNumber::available).collect()
}

//=========================================================================================
// Selection Set
//=========================================================================================

/// Ticket numbers chosen by a customer in the current view session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(BTreeSet<u32>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the id if present, adds it otherwise.
    /// Returns `true` when the id is selected after the call.
    pub fn toggle(&mut self, ticket_id: u32) -> bool {
        if self.0.remove(&ticket_id) {
            false
        } else {
            self.0.insert(ticket_id);
            true
        }
    }

    pub fn contains(&self, ticket_id: u32) -> bool {
        self.0.contains(&ticket_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Selected ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}
