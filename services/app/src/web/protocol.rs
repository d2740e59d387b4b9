//! services/app/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! server-side view router, and the payloads shared with the REST API.

use chrono::{DateTime, NaiveDate, Utc};
use raffle_core::app::Screen;
use raffle_core::domain::{Raffle, TicketNumber, TicketStatus};
use raffle_core::views::RaffleNumbers;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Mounts the view router. This must be the first message sent on the connection.
    /// A previously issued access token restores that session.
    Init { access_token: Option<String> },

    SignIn { email: String, password: String },
    SignOut,

    /// Asks for another role lookup after a failed one.
    RetryRoleLookup,

    /// Reloads the raffle list shown by the administrator or customer view.
    RefreshRaffles,

    // --- Customer view ---
    OpenRaffle { raffle_id: Uuid },
    ToggleTicket { ticket_id: u32 },
    Pay,

    // --- Administrator view ---
    CreateRaffle {
        name: String,
        total_tickets: u32,
        unit_price: u64,
        draw_date: NaiveDate,
    },
    DeleteRaffle { raffle_id: Uuid },
    ViewNumbers { raffle_id: Uuid },
    CloseNumbers,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The screen to display. Only sent when it differs from the previous one.
    Render { screen: ScreenPayload },

    /// A sign-in succeeded; the client should keep the token to restore the session.
    SessionIssued {
        access_token: String,
        expires_at: DateTime<Utc>,
    },

    /// The client should forget its stored token.
    SessionEnded,

    /// Informational message produced by background work.
    Notice { message: String },

    /// A command was rejected. The connection stays open.
    Error { message: String },
}

//=========================================================================================
// Screen Payloads
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ScreenPayload {
    Login {
        email: String,
        error: Option<String>,
    },
    Loading,
    RoleLookupFailed {
        reason: String,
    },
    Administrator {
        email: String,
        raffles: Vec<RafflePayload>,
        numbers: Option<RaffleNumbersPayload>,
    },
    Customer {
        email: String,
        catalog: Vec<RafflePayload>,
        raffle: Option<RafflePayload>,
        tickets: Vec<TicketPayload>,
        selected: Vec<String>,
        total: u64,
    },
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RafflePayload {
    pub id: Uuid,
    pub name: String,
    pub total_tickets: u32,
    pub unit_price: u64,
    pub draw_date: NaiveDate,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct TicketPayload {
    pub id: u32,
    pub label: String,
    pub status: String,
    pub selected: bool,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RaffleNumbersPayload {
    pub raffle: RafflePayload,
    pub sold: usize,
    pub reserved: usize,
    pub numbers: Vec<TicketPayload>,
}

impl From<&Raffle> for RafflePayload {
    fn from(raffle: &Raffle) -> Self {
        Self {
            id: raffle.id,
            name: raffle.name.clone(),
            total_tickets: raffle.total_tickets,
            unit_price: raffle.unit_price,
            draw_date: raffle.draw_date,
        }
    }
}

impl TicketPayload {
    fn new(ticket: &TicketNumber, selected: bool) -> Self {
        Self {
            id: ticket.id,
            label: ticket.label.clone(),
            status: ticket.status.as_str().to_string(),
            selected,
        }
    }
}

impl From<&RaffleNumbers> for RaffleNumbersPayload {
    fn from(numbers: &RaffleNumbers) -> Self {
        Self {
            raffle: RafflePayload::from(&numbers.raffle),
            sold: numbers.count(TicketStatus::Sold),
            reserved: numbers.count(TicketStatus::Reserved),
            numbers: numbers
                .numbers
                .iter()
                .map(|n| TicketPayload::new(n, false))
                .collect(),
        }
    }
}

impl From<Screen<'_>> for ScreenPayload {
    fn from(screen: Screen<'_>) -> Self {
        match screen {
            Screen::Login { form } => ScreenPayload::Login {
                email: form.email().to_string(),
                error: form.error().map(str::to_string),
            },
            Screen::Loading => ScreenPayload::Loading,
            Screen::RoleLookupFailed { reason } => ScreenPayload::RoleLookupFailed { reason },
            Screen::Administrator { user, view } => ScreenPayload::Administrator {
                email: user.email.clone(),
                raffles: view
                    .map(|v| v.raffles().iter().map(RafflePayload::from).collect())
                    .unwrap_or_default(),
                numbers: view.and_then(|v| v.numbers()).map(RaffleNumbersPayload::from),
            },
            Screen::Customer {
                user,
                catalog,
                view,
            } => ScreenPayload::Customer {
                email: user.email.clone(),
                catalog: catalog.iter().map(RafflePayload::from).collect(),
                raffle: view.map(|v| RafflePayload::from(v.raffle())),
                tickets: view
                    .map(|v| {
                        v.tickets()
                            .iter()
                            .map(|t| TicketPayload::new(t, v.selection().contains(t.id)))
                            .collect()
                    })
                    .unwrap_or_default(),
                selected: view.map(|v| v.selected_labels()).unwrap_or_default(),
                total: view.map(|v| v.total()).unwrap_or(0),
            },
        }
    }
}
