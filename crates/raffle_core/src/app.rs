//! crates/raffle_core/src/app.rs
//!
//! The view router for one client. It owns the session/role state, listens to
//! the auth gateway's session changes, runs role lookups, and keeps the
//! view-specific state (login form, administrator list, customer grid) in step
//! with the routed view.
//!
//! The driver is a single cooperative loop: await [`RaffleApp::next_event`]
//! alongside client input, then feed the result to [`RaffleApp::handle_event`]
//! or the matching command method.

use crate::domain::{AuthUser, Credentials, NewRaffle, Raffle, Role, Session};
use crate::ports::{AuthGateway, PortResult, RaffleStore, SessionChanges, UserRecordStore};
use crate::role::{RoleLookupError, RoleResolver};
use crate::state::{route, Action, AppState, Effect, LookupTag, View};
use crate::views::{
    AdminError, AdminView, CustomerError, CustomerView, LoginError, LoginForm, RaffleNumbers,
};
use futures::future::{self, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::task::Poll;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The external collaborators a client is wired to.
#[derive(Clone)]
pub struct AppPorts {
    pub auth: Arc<dyn AuthGateway>,
    pub users: Arc<dyn UserRecordStore>,
    pub raffles: Arc<dyn RaffleStore>,
}

/// Asynchronous completions the router reacts to.
#[derive(Debug)]
pub enum AppEvent {
    SessionChanged(Option<Session>),
    RoleLookupFinished {
        tag: LookupTag,
        result: Result<Role, RoleLookupError>,
    },
}

/// What the client should display right now.
#[derive(Debug)]
pub enum Screen<'a> {
    Login {
        form: &'a LoginForm,
    },
    Loading,
    RoleLookupFailed {
        reason: String,
    },
    Administrator {
        user: &'a AuthUser,
        view: Option<&'a AdminView>,
    },
    Customer {
        user: &'a AuthUser,
        catalog: &'a [Raffle],
        view: Option<&'a CustomerView>,
    },
}

pub struct RaffleApp {
    auth: Arc<dyn AuthGateway>,
    raffles: Arc<dyn RaffleStore>,
    resolver: RoleResolver,
    state: AppState,
    session_changes: Option<SessionChanges>,
    lookups: FuturesUnordered<BoxFuture<'static, AppEvent>>,
    login: LoginForm,
    admin: Option<AdminView>,
    catalog: Option<Vec<Raffle>>,
    customer: Option<CustomerView>,
    notice: Option<String>,
}

impl RaffleApp {
    /// Subscribes to session changes, then restores the existing session, if any.
    pub async fn mount(ports: AppPorts) -> Self {
        let session_changes = ports.auth.subscribe();
        let mut app = Self {
            resolver: RoleResolver::new(ports.users),
            auth: ports.auth,
            raffles: ports.raffles,
            state: AppState::default(),
            session_changes: Some(session_changes),
            lookups: FuturesUnordered::new(),
            login: LoginForm::default(),
            admin: None,
            catalog: None,
            customer: None,
            notice: None,
        };

        match app.auth.current_session().await {
            Ok(Some(session)) => {
                info!("Restored session for {}", session.user.email);
                app.dispatch(Action::SessionAcquired(session)).await;
            }
            Ok(None) => debug!("No existing session"),
            Err(e) => {
                warn!("Failed to restore session: {}", e);
                app.notice = Some("Could not restore your previous session.".to_string());
            }
        }
        app
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> View {
        route(&self.state)
    }

    /// A one-shot message for the user produced by background work.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    //=====================================================================================
    // Event Loop
    //=====================================================================================

    /// Waits for the next session change or role-lookup completion.
    ///
    /// Cancel safe: dropping the future loses no event. Pends forever once the
    /// session stream has ended and no lookup is in flight.
    pub async fn next_event(&mut self) -> AppEvent {
        let lookups = &mut self.lookups;
        let changes = &mut self.session_changes;
        future::poll_fn(|cx| {
            if let Poll::Ready(Some(event)) = lookups.poll_next_unpin(cx) {
                return Poll::Ready(event);
            }
            if let Some(stream) = changes.as_mut() {
                match stream.poll_next_unpin(cx) {
                    Poll::Ready(Some(session)) => {
                        return Poll::Ready(AppEvent::SessionChanged(session))
                    }
                    Poll::Ready(None) => {
                        warn!("Session change stream ended");
                        *changes = None;
                    }
                    Poll::Pending => {}
                }
            }
            Poll::Pending
        })
        .await
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        let action = match event {
            AppEvent::SessionChanged(Some(session)) => Action::SessionAcquired(session),
            AppEvent::SessionChanged(None) => Action::SessionCleared,
            AppEvent::RoleLookupFinished { tag, result } => match result {
                Ok(role) => Action::RoleResolved { tag, role },
                Err(e) => Action::RoleLookupFailed {
                    tag,
                    reason: e.reason,
                },
            },
        };
        self.dispatch(action).await;
    }

    async fn dispatch(&mut self, action: Action) {
        let (state, effect) = self.state.reduce(action);
        self.state = state;
        if let Some(effect) = effect {
            self.run(effect);
        }
        self.sync_views().await;
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::ResolveRole { tag, user_id } => {
                debug!("Resolving role for user {} ({:?})", user_id, tag);
                let resolver = self.resolver.clone();
                self.lookups.push(Box::pin(async move {
                    AppEvent::RoleLookupFinished {
                        tag,
                        result: resolver.resolve(user_id).await,
                    }
                }));
            }
        }
    }

    /// Builds the state of the routed view and drops the state of the others.
    async fn sync_views(&mut self) {
        match route(&self.state) {
            View::Login => {
                self.admin = None;
                self.catalog = None;
                self.customer = None;
            }
            View::Loading | View::RoleLookupFailed { .. } => {
                self.login.reset();
                self.admin = None;
                self.catalog = None;
                self.customer = None;
            }
            View::Administrator => {
                self.catalog = None;
                self.customer = None;
                if self.admin.is_none() {
                    match AdminView::load(&*self.raffles).await {
                        Ok(view) => self.admin = Some(view),
                        Err(e) => {
                            warn!("Failed to load raffles for administrator: {}", e);
                            self.notice = Some(format!("Could not load raffles: {}", e));
                        }
                    }
                }
            }
            View::Customer => {
                self.admin = None;
                if self.catalog.is_none() {
                    match self.raffles.list_raffles().await {
                        Ok(catalog) => {
                            self.customer = catalog.first().cloned().map(CustomerView::mount);
                            self.catalog = Some(catalog);
                        }
                        Err(e) => {
                            warn!("Failed to load raffle catalog: {}", e);
                            self.notice = Some(format!("Could not load raffles: {}", e));
                        }
                    }
                }
            }
        }
    }

    pub fn render(&self) -> Screen<'_> {
        match (route(&self.state), self.state.session()) {
            (View::Loading, Some(_)) => Screen::Loading,
            (View::RoleLookupFailed { reason }, Some(_)) => Screen::RoleLookupFailed { reason },
            (View::Administrator, Some(session)) => Screen::Administrator {
                user: &session.user,
                view: self.admin.as_ref(),
            },
            (View::Customer, Some(session)) => Screen::Customer {
                user: &session.user,
                catalog: self.catalog.as_deref().unwrap_or_default(),
                view: self.customer.as_ref(),
            },
            _ => Screen::Login { form: &self.login },
        }
    }

    //=====================================================================================
    // Session Commands
    //=====================================================================================

    /// Only accepted from the login view.
    pub async fn sign_in(&mut self, credentials: Credentials) -> Result<Session, LoginError> {
        if route(&self.state) != View::Login {
            return Err(LoginError::AlreadySignedIn);
        }
        self.login.submit(&*self.auth, credentials).await
    }

    /// The resulting session-change notification routes back to the login view.
    pub async fn sign_out(&mut self) -> PortResult<()> {
        self.auth.sign_out().await
    }

    pub async fn retry_role_lookup(&mut self) {
        self.dispatch(Action::RoleLookupRetried).await;
    }

    /// Reloads the raffles of the routed view so changes made by other clients
    /// show up. The customer keeps the open raffle and its selection while that
    /// raffle still exists. A no-op outside the administrator and customer views.
    pub async fn refresh_raffles(&mut self) -> PortResult<()> {
        match route(&self.state) {
            View::Administrator => match self.admin.as_mut() {
                Some(view) => view.refresh(&*self.raffles).await,
                None => {
                    self.admin = Some(AdminView::load(&*self.raffles).await?);
                    Ok(())
                }
            },
            View::Customer => {
                let catalog = self.raffles.list_raffles().await?;
                let open = self.customer.as_ref().map(|v| v.raffle().id);
                if !open.is_some_and(|id| catalog.iter().any(|r| r.id == id)) {
                    self.customer = catalog.first().cloned().map(CustomerView::mount);
                }
                self.catalog = Some(catalog);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    //=====================================================================================
    // Administrator Commands
    //=====================================================================================

    async fn admin_view(&mut self) -> Result<&mut AdminView, AdminError> {
        if route(&self.state) != View::Administrator {
            return Err(AdminError::NotPermitted);
        }
        if self.admin.is_none() {
            self.admin = Some(AdminView::load(&*self.raffles).await?);
        }
        Ok(self.admin.get_or_insert_with(AdminView::default))
    }


    pub async fn create_raffle(&mut self, raffle: NewRaffle) -> Result<Raffle, AdminError> {
        let store = self.raffles.clone();
        self.admin_view().await?.create_raffle(&*store, raffle).await
    }

    pub async fn delete_raffle(&mut self, raffle_id: Uuid) -> Result<(), AdminError> {
        let store = self.raffles.clone();
        self.admin_view().await?.delete_raffle(&*store, raffle_id).await
    }

    pub async fn view_numbers(&mut self, raffle_id: Uuid) -> Result<&RaffleNumbers, AdminError> {
        let store = self.raffles.clone();
        self.admin_view().await?.view_numbers(&*store, raffle_id).await
    }

    pub async fn close_numbers(&mut self) -> Result<(), AdminError> {
        self.admin_view().await?.close_numbers();
        Ok(())
    }

    //=====================================================================================
    // Customer Commands
    //=====================================================================================

    fn customer_view(&mut self) -> Result<&mut CustomerView, CustomerError> {
        if route(&self.state) != View::Customer {
            return Err(CustomerError::NotActive);
        }
        self.customer.as_mut().ok_or(CustomerError::NoActiveRaffle)
    }

    /// Switches the grid to another raffle; the selection starts over.
    pub async fn open_raffle(&mut self, raffle_id: Uuid) -> Result<(), CustomerError> {
        if route(&self.state) != View::Customer {
            return Err(CustomerError::NotActive);
        }
        let raffle = self
            .raffles
            .get_raffle(raffle_id)
            .await
            .map_err(|e| CustomerError::Store(e.to_string()))?;
        self.customer = Some(CustomerView::mount(raffle));
        Ok(())
    }

    pub fn toggle_ticket(&mut self, ticket_id: u32) -> Result<bool, CustomerError> {
        self.customer_view()?.toggle(ticket_id)
    }

    pub fn pay(&mut self) -> Result<(), CustomerError> {
        self.customer_view()?.pay()
    }
}
