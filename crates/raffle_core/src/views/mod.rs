pub mod admin;
pub mod customer;
pub mod login;

pub use admin::{AdminError, AdminView, RaffleNumbers};
pub use customer::{CustomerError, CustomerView};
pub use login::{LoginError, LoginForm};
