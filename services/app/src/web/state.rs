//! services/app/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{DbAdapter, PgAuthClient};
use crate::config::Config;
use raffle_core::app::AppPorts;
use raffle_core::ports::{RaffleStore, UserRecordStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbAdapter>,
    pub users: Arc<dyn UserRecordStore>,
    pub raffles: Arc<dyn RaffleStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Arc<DbAdapter>, config: Arc<Config>) -> Self {
        Self {
            users: db.clone(),
            raffles: db.clone(),
            db,
            config,
        }
    }

    /// An auth client with no session, for one-off requests.
    pub fn auth_client(&self) -> PgAuthClient {
        PgAuthClient::new(self.db.clone(), self.config.session_ttl)
    }

    /// Wires a connected client's auth gateway to the shared stores.
    pub fn client_ports(&self, auth: Arc<PgAuthClient>) -> AppPorts {
        AppPorts {
            auth,
            users: self.users.clone(),
            raffles: self.raffles.clone(),
        }
    }
}
