//! crates/raffle_core/src/state.rs
//!
//! The view router's state: the current session, the role resolved for it,
//! and the reducer that moves between them. Rendering is a pure function of
//! this state (see [`route`]).

use crate::domain::{Role, Session};
use uuid::Uuid;

//=========================================================================================
// State
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RoleState {
    /// No session, or nothing requested yet.
    #[default]
    Unknown,
    Resolving,
    Resolved(Role),
    LookupFailed { reason: String },
}

/// Identifies the session event that spawned a role lookup.
///
/// Completions carrying a tag other than the current one are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupTag(u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    session: Option<Session>,
    role: RoleState,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SessionAcquired(Session),
    SessionCleared,
    RoleResolved { tag: LookupTag, role: Role },
    RoleLookupFailed { tag: LookupTag, reason: String },
    RoleLookupRetried,
}

/// Work the reducer asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ResolveRole { tag: LookupTag, user_id: Uuid },
}

impl AppState {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The role state, only meaningful while a session is live.
    pub fn role(&self) -> &RoleState {
        &self.role
    }

    pub fn current_tag(&self) -> LookupTag {
        LookupTag(self.generation)
    }

    /// Produces the next state; the current one is left untouched.
    pub fn reduce(&self, action: Action) -> (AppState, Option<Effect>) {
        match action {
            Action::SessionAcquired(session) => {
                let generation = self.generation + 1;
                let effect = Effect::ResolveRole {
                    tag: LookupTag(generation),
                    user_id: session.user_id(),
                };
                let next = AppState {
                    session: Some(session),
                    role: RoleState::Resolving,
                    generation,
                };
                (next, Some(effect))
            }
            Action::SessionCleared => {
                // Bumping the generation orphans any lookup still in flight.
                let next = AppState {
                    session: None,
                    role: RoleState::Unknown,
                    generation: self.generation + 1,
                };
                (next, None)
            }
            Action::RoleResolved { tag, role } => {
                if !self.accepts(tag) {
                    return (self.clone(), None);
                }
                let next = AppState {
                    role: RoleState::Resolved(role),
                    ..self.clone()
                };
                (next, None)
            }
            Action::RoleLookupFailed { tag, reason } => {
                if !self.accepts(tag) {
                    return (self.clone(), None);
                }
                let next = AppState {
                    role: RoleState::LookupFailed { reason },
                    ..self.clone()
                };
                (next, None)
            }
            Action::RoleLookupRetried => match (&self.session, &self.role) {
                (Some(session), RoleState::LookupFailed { .. }) => {
                    let generation = self.generation + 1;
                    let effect = Effect::ResolveRole {
                        tag: LookupTag(generation),
                        user_id: session.user_id(),
                    };
                    let next = AppState {
                        session: self.session.clone(),
                        role: RoleState::Resolving,
                        generation,
                    };
                    (next, Some(effect))
                }
                _ => (self.clone(), None),
            },
        }
    }

    fn accepts(&self, tag: LookupTag) -> bool {
        self.session.is_some() && tag == self.current_tag() && self.role == RoleState::Resolving
    }
}

//=========================================================================================
// Routing
//=========================================================================================

/// The one view rendered for a given state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    Loading,
    RoleLookupFailed { reason: String },
    Administrator,
    Customer,
}

pub fn route(state: &AppState) -> View {
    match (&state.session, &state.role) {
        (None, _) => View::Login,
        (Some(_), RoleState::Unknown | RoleState::Resolving) => View::Loading,
        (Some(_), RoleState::Resolved(Role::Administrator)) => View::Administrator,
        (Some(_), RoleState::Resolved(Role::Customer)) => View::Customer,
        (Some(_), RoleState::LookupFailed { reason }) => View::RoleLookupFailed {
            reason: reason.clone(),
        },
    }
}
