//! crates/raffle_core/src/views/admin.rs
//!
//! The administrator's raffle list and its create / view numbers / delete
//! actions, all backed by the raffle store.

use crate::domain::{NewRaffle, Raffle, TicketNumber, TicketStatus};
use crate::ports::{PortError, PortResult, RaffleStore};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Invalid raffle: {0}")]
    InvalidRaffle(String),
    #[error("Only administrators can manage raffles")]
    NotPermitted,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// The numbers of one raffle, as shown by "view numbers".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleNumbers {
    pub raffle: Raffle,
    pub numbers: Vec<TicketNumber>,
}

impl RaffleNumbers {
    pub fn count(&self, status: TicketStatus) -> usize {
        self.numbers.iter().filter(|n| n.status == status).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminView {
    raffles: Vec<Raffle>,
    numbers: Option<RaffleNumbers>,
}

impl AdminView {
    pub async fn load(store: &dyn RaffleStore) -> PortResult<Self> {
        let raffles = store.list_raffles().await?;
        Ok(Self {
            raffles,
            numbers: None,
        })
    }

    pub fn raffles(&self) -> &[Raffle] {
        &self.raffles
    }

    pub fn numbers(&self) -> Option<&RaffleNumbers> {
        self.numbers.as_ref()
    }

    pub async fn refresh(&mut self, store: &dyn RaffleStore) -> PortResult<()> {
        self.raffles = store.list_raffles().await?;
        Ok(())
    }

    pub async fn create_raffle(
        &mut self,
        store: &dyn RaffleStore,
        raffle: NewRaffle,
    ) -> Result<Raffle, AdminError> {
        raffle.validate().map_err(AdminError::InvalidRaffle)?;
        let created = store.create_raffle(raffle).await?;
        info!("Created raffle {} ({})", created.name, created.id);
        self.raffles.push(created.clone());
        Ok(created)
    }

    pub async fn delete_raffle(
        &mut self,
        store: &dyn RaffleStore,
        raffle_id: Uuid,
    ) -> Result<(), AdminError> {
        store.delete_raffle(raffle_id).await?;
        info!("Deleted raffle {}", raffle_id);
        self.raffles.retain(|r| r.id != raffle_id);
        if self.numbers.as_ref().is_some_and(|n| n.raffle.id == raffle_id) {
            self.numbers = None;
        }
        Ok(())
    }

    pub async fn view_numbers(
        &mut self,
        store: &dyn RaffleStore,
        raffle_id: Uuid,
    ) -> Result<&RaffleNumbers, AdminError> {
        let raffle = store.get_raffle(raffle_id).await?;
        let numbers = store.list_ticket_numbers(raffle_id).await?;
        Ok(self.numbers.insert(RaffleNumbers { raffle, numbers }))
    }

    pub fn close_numbers(&mut self) {
        self.numbers = None;
    }
}
