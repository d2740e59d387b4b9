//! services/app/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection mounts one view router and drives it from a single loop:
//! client commands, session changes, role-lookup completions and the periodic
//! session re-validation all arrive here, one at a time.

use crate::{
    adapters::PgAuthClient,
    error::ApiError,
    web::{
        protocol::{ClientMessage, ScreenPayload, ServerMessage},
        state::AppState,
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use raffle_core::app::{AppEvent, RaffleApp};
use raffle_core::domain::{Credentials, NewRaffle};
use raffle_core::ports::AuthGateway;
use raffle_core::views::LoginError;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type WsSender = SplitSink<WebSocket, Message>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

enum Input {
    App(AppEvent),
    Client(Option<Result<Message, axum::Error>>),
    SessionCheck,
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");
    let (mut sender, mut receiver) = socket.split();

    // --- 1. Initialization Phase ---
    let access_token = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
                Ok(ClientMessage::Init { access_token }) => access_token,
                _ => {
                    error!("First message was not a valid Init message.");
                    let err_msg = ServerMessage::Error {
                        message: "The first message must be an init message.".to_string(),
                    };
                    let _ = send(&mut sender, &err_msg).await;
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let auth = Arc::new(
        PgAuthClient::restore(
            app_state.db.clone(),
            app_state.config.session_ttl,
            access_token.as_deref(),
        )
        .await,
    );
    let mut app = RaffleApp::mount(app_state.client_ports(auth.clone())).await;
    let mut last_screen: Option<ScreenPayload> = None;
    if let Err(e) = flush(&mut sender, &mut app, &mut last_screen).await {
        error!("Failed to send initial screen: {}", e);
        return;
    }

    let mut session_check = tokio::time::interval(app_state.config.session_check_interval);
    // The first tick completes immediately; the session was just validated.
    session_check.tick().await;

    // --- 2. Main Event Loop ---
    loop {
        let input = tokio::select! {
            event = app.next_event() => Input::App(event),
            msg = receiver.next() => Input::Client(msg),
            _ = session_check.tick() => Input::SessionCheck,
        };

        let outcome = match input {
            Input::App(event) => {
                app.handle_event(event).await;
                Ok(())
            }
            Input::Client(Some(Ok(Message::Text(text)))) => {
                handle_text_message(text.as_str(), &mut app, &mut sender).await
            }
            Input::Client(Some(Ok(Message::Close(_)))) => {
                info!("Client sent close message.");
                break;
            }
            Input::Client(Some(Ok(_))) => Ok(()),
            Input::Client(Some(Err(e))) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
            Input::Client(None) => {
                info!("Client disconnected.");
                break;
            }
            Input::SessionCheck => {
                // An expired or revoked session is cleared and announced by the gateway.
                if let Err(e) = auth.current_session().await {
                    warn!("Session re-validation failed: {}", e);
                }
                Ok(())
            }
        };

        if let Err(e) = outcome {
            error!("Failed to answer client: {}", e);
            break;
        }
        if let Err(e) = flush(&mut sender, &mut app, &mut last_screen).await {
            error!("Failed to send screen: {}", e);
            break;
        }
    }

    info!("WebSocket connection closed.");
}

async fn send(sender: &mut WsSender, message: &ServerMessage) -> Result<(), ApiError> {
    let json = serde_json::to_string(message)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Sends pending notices, then the current screen if it changed.
async fn flush(
    sender: &mut WsSender,
    app: &mut RaffleApp,
    last_screen: &mut Option<ScreenPayload>,
) -> Result<(), ApiError> {
    if let Some(message) = app.take_notice() {
        send(sender, &ServerMessage::Notice { message }).await?;
    }
    let screen = ScreenPayload::from(app.render());
    if last_screen.as_ref() != Some(&screen) {
        send(
            sender,
            &ServerMessage::Render {
                screen: screen.clone(),
            },
        )
        .await?;
        *last_screen = Some(screen);
    }
    Ok(())
}

/// Reports a rejected command to the client without closing the connection.
async fn reply<E: Display>(sender: &mut WsSender, result: Result<(), E>) -> Result<(), ApiError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("Command rejected: {}", e);
            send(
                sender,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await
        }
    }
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app: &mut RaffleApp,
    sender: &mut WsSender,
) -> Result<(), ApiError> {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let err_msg = ServerMessage::Error {
                message: "Unrecognised message.".to_string(),
            };
            return send(sender, &err_msg).await;
        }
    };

    match client_msg {
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
            Ok(())
        }
        ClientMessage::SignIn { email, password } => {
            // Credential failures are shown on the login screen itself.
            match app.sign_in(Credentials::new(email, password)).await {
                Ok(session) => {
                    let issued = ServerMessage::SessionIssued {
                        access_token: session.access_token,
                        expires_at: session.expires_at,
                    };
                    send(sender, &issued).await
                }
                Err(e @ LoginError::AlreadySignedIn) => reply(sender, Err(e)).await,
                Err(_) => Ok(()),
            }
        }
        ClientMessage::SignOut => match app.sign_out().await {
            Ok(()) => send(sender, &ServerMessage::SessionEnded).await,
            Err(e) => {
                error!("Sign-out failed: {}", e);
                reply(sender, Err(format!("Sign-out failed: {}", e))).await
            }
        },
        ClientMessage::RetryRoleLookup => {
            app.retry_role_lookup().await;
            Ok(())
        }
        ClientMessage::RefreshRaffles => {
            let result = app.refresh_raffles().await;
            reply(sender, result).await
        }
        ClientMessage::OpenRaffle { raffle_id } => {
            let result = app.open_raffle(raffle_id).await;
            reply(sender, result).await
        }
        ClientMessage::ToggleTicket { ticket_id } => {
            let result = app.toggle_ticket(ticket_id).map(|_| ());
            reply(sender, result).await
        }
        ClientMessage::Pay => {
            let result = app.pay();
            reply(sender, result).await
        }
        ClientMessage::CreateRaffle {
            name,
            total_tickets,
            unit_price,
            draw_date,
        } => {
            let raffle = NewRaffle {
                name: name.trim().to_string(),
                total_tickets,
                unit_price,
                draw_date,
            };
            let result = app.create_raffle(raffle).await.map(|_| ());
            reply(sender, result).await
        }
        ClientMessage::DeleteRaffle { raffle_id } => {
            let result = app.delete_raffle(raffle_id).await;
            reply(sender, result).await
        }
        ClientMessage::ViewNumbers { raffle_id } => {
            let result = app.view_numbers(raffle_id).await.map(|_| ());
            reply(sender, result).await
        }
        ClientMessage::CloseNumbers => {
            let result = app.close_numbers().await;
            reply(sender, result).await
        }
    }
}
