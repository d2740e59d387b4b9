pub mod app;
pub mod domain;
pub mod ports;
pub mod role;
pub mod sample;
pub mod state;
pub mod views;

pub use app::{AppEvent, AppPorts, RaffleApp, Screen};
pub use domain::{
    AuthUser, Credentials, NewRaffle, Raffle, Role, SelectionSet, Session, TicketNumber,
    TicketStatus, UserRecord,
};
pub use ports::{AuthGateway, PortError, PortResult, RaffleStore, SessionChanges, UserRecordStore};
pub use role::{RoleLookupError, RoleResolver};
pub use state::{route, AppState, RoleState, View};
