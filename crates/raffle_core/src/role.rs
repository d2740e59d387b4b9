//! crates/raffle_core/src/role.rs
//!
//! Resolves the role of an authenticated user from the user-record store.

use crate::domain::Role;
use crate::ports::{PortError, UserRecordStore};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// The store could not be reached or answered with an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Role lookup failed: {reason}")]
pub struct RoleLookupError {
    pub reason: String,
}

#[derive(Clone)]
pub struct RoleResolver {
    users: Arc<dyn UserRecordStore>,
}

impl RoleResolver {
    pub fn new(users: Arc<dyn UserRecordStore>) -> Self {
        Self { users }
    }

    /// Reads the role field of the user's record.
    ///
    /// A missing record or missing field resolves to [`Role::Customer`];
    /// store failures are reported instead of being defaulted.
    pub async fn resolve(&self, user_id: Uuid) -> Result<Role, RoleLookupError> {
        match self.users.find_user_record(user_id).await {
            Ok(Some(record)) => {
                let role = Role::from_record_field(record.role.as_deref());
                debug!("Resolved role {} for user {}", role.as_str(), user_id);
                Ok(role)
            }
            Ok(None) | Err(PortError::NotFound(_)) => {
                debug!("No user record for {}, defaulting to customer", user_id);
                Ok(Role::Customer)
            }
            Err(e) => {
                warn!("Role lookup for user {} failed: {}", user_id, e);
                Err(RoleLookupError {
                    reason: e.to_string(),
                })
            }
        }
    }
}
