//! crates/raffle_core/src/views/customer.rs
//!
//! The customer's ticket grid for one raffle, the selection made on it and the
//! running total.

use crate::domain::{ticket_sequence, Raffle, SelectionSet, TicketNumber, TICKET_GRID_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerError {
    #[error("Ticket number {0} is not part of this raffle")]
    UnknownTicket(u32),
    #[error("Select at least one ticket number before paying")]
    EmptySelection,
    /// Reservation and payment are owned by an external service that is not wired in.
    #[error("Checkout is not available yet")]
    CheckoutNotImplemented,
    #[error("No raffle is open")]
    NoActiveRaffle,
    #[error("The customer view is not active")]
    NotActive,
    #[error("Raffle store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerView {
    raffle: Raffle,
    tickets: Vec<TicketNumber>,
    selection: SelectionSet,
}

impl CustomerView {
    /// Builds the grid for `raffle` with an empty selection. The grid holds
    /// the raffle's numbers, never more than [`TICKET_GRID_SIZE`].
    pub fn mount(raffle: Raffle) -> Self {
        let cells = raffle.total_tickets.min(TICKET_GRID_SIZE);
        Self {
            raffle,
            tickets: ticket_sequence(cells),
            selection: SelectionSet::new(),
        }
    }

    pub fn raffle(&self) -> &Raffle {
        &self.raffle
    }

    pub fn tickets(&self) -> &[TicketNumber] {
        &self.tickets
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Returns whether the ticket is selected after the toggle.
    pub fn toggle(&mut self, ticket_id: u32) -> Result<bool, CustomerError> {
        if !self.tickets.iter().any(|t| t.id == ticket_id) {
            return Err(CustomerError::UnknownTicket(ticket_id));
        }
        Ok(self.selection.toggle(ticket_id))
    }

    /// Selected count times unit price, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        (self.selection.len() as u64).saturating_mul(self.raffle.unit_price)
    }

    /// Labels of the selected numbers, ascending.
    pub fn selected_labels(&self) -> Vec<String> {
        self.tickets
            .iter()
            .filter(|t| self.selection.contains(t.id))
            .map(|t| t.label.clone())
            .collect()
    }

    /// Checkout entry point. The selection is left untouched on every outcome.
    pub fn pay(&self) -> Result<(), CustomerError> {
        if self.selection.is_empty() {
            return Err(CustomerError::EmptySelection);
        }
        // TODO: reserve the selection against the raffle store once its
        // reservation/expiry semantics are decided, then hand off to payment.
        Err(CustomerError::CheckoutNotImplemented)
    }
}
