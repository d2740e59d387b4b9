//! In-memory doubles for the core's ports.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures::channel::mpsc;
use raffle_core::app::{AppEvent, AppPorts, RaffleApp};
use raffle_core::domain::{
    AuthUser, Credentials, NewRaffle, Raffle, Session, TicketNumber, TicketStatus, UserRecord,
};
use raffle_core::ports::{
    AuthGateway, PortError, PortResult, RaffleStore, SessionChanges, UserRecordStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

// =============================================================================
// Auth Gateway
// =============================================================================

#[derive(Default)]
pub struct FakeAuth {
    accounts: Mutex<HashMap<String, (String, AuthUser)>>,
    current: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Option<Session>>>>,
}

impl FakeAuth {
    pub fn add_account(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// Installs a session without notifying, as if restored from storage.
    pub fn restore(&self, user: &AuthUser) -> Session {
        let session = session_for(user);
        *self.current.lock().unwrap() = Some(session.clone());
        session
    }

    /// Changes the session and notifies every subscriber.
    pub fn emit(&self, session: Option<Session>) {
        *self.current.lock().unwrap() = session.clone();
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.unbounded_send(session.clone()).is_ok());
    }
}

pub fn session_for(user: &AuthUser) -> Session {
    Session {
        access_token: Uuid::new_v4().to_string(),
        user: user.clone(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

#[async_trait]
impl AuthGateway for FakeAuth {
    async fn sign_in(&self, credentials: &Credentials) -> PortResult<Session> {
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(&credentials.email) {
                Some((password, user)) if *password == credentials.password => user.clone(),
                _ => {
                    return Err(PortError::InvalidCredentials(
                        "Invalid email or password".to_string(),
                    ))
                }
            }
        };
        let session = session_for(&user);
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> PortResult<()> {
        let signed_in = self.current.lock().unwrap().is_some();
        if signed_in {
            self.emit(None);
        }
        Ok(())
    }

    async fn current_session(&self) -> PortResult<Option<Session>> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn subscribe(&self) -> SessionChanges {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.lock().unwrap().push(tx);
        Box::pin(rx)
    }
}

// =============================================================================
// User-Record Store
// =============================================================================

#[derive(Default)]
pub struct FakeUsers {
    records: Mutex<HashMap<Uuid, UserRecord>>,
    gates: Mutex<HashMap<Uuid, Arc<Notify>>>,
    failing: AtomicBool,
}

impl FakeUsers {
    pub fn set_role(&self, user_id: Uuid, role: Option<&str>) {
        self.records.lock().unwrap().insert(
            user_id,
            UserRecord {
                user_id,
                role: role.map(str::to_string),
            },
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Lookups for `user_id` block until the returned handle is notified.
    pub fn gate(&self, user_id: Uuid) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(user_id, gate.clone());
        gate
    }
}

#[async_trait]
impl UserRecordStore for FakeUsers {
    async fn find_user_record(&self, user_id: Uuid) -> PortResult<Option<UserRecord>> {
        let gate = self.gates.lock().unwrap().get(&user_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }
}

// =============================================================================
// Raffle Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryRaffles {
    raffles: Mutex<Vec<Raffle>>,
    statuses: Mutex<HashMap<Uuid, HashMap<u32, TicketStatus>>>,
}

impl InMemoryRaffles {
    pub fn insert(&self, name: &str, total_tickets: u32, unit_price: u64) -> Raffle {
        let raffle = Raffle {
            id: Uuid::new_v4(),
            name: name.to_string(),
            total_tickets,
            unit_price,
            draw_date: NaiveDate::from_ymd_opt(2024, 12, 24).unwrap(),
        };
        self.raffles.lock().unwrap().push(raffle.clone());
        raffle
    }

    pub fn mark(&self, raffle_id: Uuid, number: u32, status: TicketStatus) {
        self.statuses
            .lock()
            .unwrap()
            .entry(raffle_id)
            .or_default()
            .insert(number, status);
    }

    pub fn len(&self) -> usize {
        self.raffles.lock().unwrap().len()
    }
}

#[async_trait]
impl RaffleStore for InMemoryRaffles {
    async fn list_raffles(&self) -> PortResult<Vec<Raffle>> {
        Ok(self.raffles.lock().unwrap().clone())
    }

    async fn get_raffle(&self, raffle_id: Uuid) -> PortResult<Raffle> {
        self.raffles
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == raffle_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Raffle {} not found", raffle_id)))
    }

    async fn create_raffle(&self, raffle: NewRaffle) -> PortResult<Raffle> {
        let created = Raffle {
            id: Uuid::new_v4(),
            name: raffle.name,
            total_tickets: raffle.total_tickets,
            unit_price: raffle.unit_price,
            draw_date: raffle.draw_date,
        };
        self.raffles.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_raffle(&self, raffle_id: Uuid) -> PortResult<()> {
        let mut raffles = self.raffles.lock().unwrap();
        let before = raffles.len();
        raffles.retain(|r| r.id != raffle_id);
        if raffles.len() == before {
            return Err(PortError::NotFound(format!("Raffle {} not found", raffle_id)));
        }
        Ok(())
    }

    async fn list_ticket_numbers(&self, raffle_id: Uuid) -> PortResult<Vec<TicketNumber>> {
        let raffle = self.get_raffle(raffle_id).await?;
        let statuses = self.statuses.lock().unwrap();
        let marked = statuses.get(&raffle_id);
        Ok((1..=raffle.total_tickets)
            .map(|n| {
                let status = marked
                    .and_then(|m| m.get(&n).copied())
                    .unwrap_or(TicketStatus::Available);
                TicketNumber::new(n, status)
            })
            .collect())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub auth: Arc<FakeAuth>,
    pub users: Arc<FakeUsers>,
    pub raffles: Arc<InMemoryRaffles>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            auth: Arc::new(FakeAuth::default()),
            users: Arc::new(FakeUsers::default()),
            raffles: Arc::new(InMemoryRaffles::default()),
        }
    }

    pub fn ports(&self) -> AppPorts {
        AppPorts {
            auth: self.auth.clone(),
            users: self.users.clone(),
            raffles: self.raffles.clone(),
        }
    }

    pub async fn mount(&self) -> RaffleApp {
        RaffleApp::mount(self.ports()).await
    }
}

/// The next event, or `None` if nothing arrives shortly.
pub async fn next_event(app: &mut RaffleApp) -> Option<AppEvent> {
    tokio::time::timeout(std::time::Duration::from_millis(50), app.next_event())
        .await
        .ok()
}

/// Handles events until the app goes quiet.
pub async fn settle(app: &mut RaffleApp) {
    while let Some(event) = next_event(app).await {
        app.handle_event(event).await;
    }
}
