pub mod auth;
pub mod db;

pub use auth::PgAuthClient;
pub use db::DbAdapter;
