//! # View Router Tests
//!
//! Drives `RaffleApp` through session changes, role lookups and user commands
//! against in-memory ports.

mod common;

use chrono::NaiveDate;
use common::{next_event, session_for, settle, Harness};
use raffle_core::app::Screen;
use raffle_core::domain::{Credentials, NewRaffle, Role, TicketStatus};
use raffle_core::ports::RaffleStore;
use raffle_core::state::{RoleState, View};
use raffle_core::views::{AdminError, CustomerError, LoginError};

// =============================================================================
// Test Helpers
// =============================================================================

const ADMIN_EMAIL: &str = "admin@example.com";
const BUYER_EMAIL: &str = "buyer@example.com";
const PASSWORD: &str = "correct horse";

fn harness_with_accounts() -> Harness {
    let harness = Harness::new();
    let admin = harness.auth.add_account(ADMIN_EMAIL, PASSWORD);
    harness.users.set_role(admin.user_id, Some("admin"));
    let buyer = harness.auth.add_account(BUYER_EMAIL, PASSWORD);
    harness.users.set_role(buyer.user_id, Some("customer"));
    harness.raffles.insert("iPhone 15 Pro Max", 100, 5);
    harness
}

// =============================================================================
// Session & Role Flow
// =============================================================================

#[tokio::test]
async fn test_mount_without_session_renders_login() {
    let harness = harness_with_accounts();
    let app = harness.mount().await;
    assert_eq!(app.view(), View::Login);
    assert!(matches!(app.render(), Screen::Login { form } if form.error().is_none()));
}

#[tokio::test]
async fn test_admin_sign_in_renders_raffle_list() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;

    app.sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD))
        .await
        .expect("valid credentials");

    // The notification arrives first; the role is still being resolved.
    let event = next_event(&mut app).await.expect("session change");
    app.handle_event(event).await;
    assert_eq!(app.view(), View::Loading);

    settle(&mut app).await;
    assert_eq!(app.state().role(), &RoleState::Resolved(Role::Administrator));
    match app.render() {
        Screen::Administrator { user, view } => {
            assert_eq!(user.email, ADMIN_EMAIL);
            let raffles = view.expect("raffle list loaded").raffles();
            assert_eq!(raffles.len(), 1);
            assert_eq!(raffles[0].name, "iPhone 15 Pro Max");
            assert_eq!(raffles[0].total_tickets, 100);
            assert_eq!(raffles[0].unit_price, 5);
        }
        other => panic!("expected administrator view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sign_in_failure_keeps_login_with_error() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;

    let err = app
        .sign_in(Credentials::new(ADMIN_EMAIL, "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AuthenticationFailure(_)));

    settle(&mut app).await;
    assert!(app.state().session().is_none());
    match app.render() {
        Screen::Login { form } => {
            assert_eq!(form.email(), ADMIN_EMAIL);
            assert_eq!(form.error(), Some("Invalid email or password"));
        }
        other => panic!("expected login view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sign_out_from_admin_returns_to_login_and_clears_role() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;
    assert_eq!(app.view(), View::Administrator);

    app.sign_out().await.unwrap();
    settle(&mut app).await;

    assert_eq!(app.view(), View::Login);
    assert!(app.state().session().is_none());
    assert_eq!(app.state().role(), &RoleState::Unknown);
}

#[tokio::test]
async fn test_sign_in_is_rejected_while_signed_in() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;
    assert_eq!(app.view(), View::Customer);

    let err = app
        .sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(err, LoginError::AlreadySignedIn);

    settle(&mut app).await;
    assert_eq!(app.view(), View::Customer);
    assert_eq!(
        app.state().session().map(|s| s.user.email.as_str()),
        Some(BUYER_EMAIL)
    );
}

#[tokio::test]
async fn test_padded_email_signs_in() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(format!("  {} ", BUYER_EMAIL), PASSWORD))
        .await
        .unwrap();
    settle(&mut app).await;
    assert_eq!(app.view(), View::Customer);
}

#[tokio::test]
async fn test_restored_session_is_resolved_on_mount() {
    let harness = harness_with_accounts();
    let buyer = harness.auth.add_account("returning@example.com", PASSWORD);
    harness.auth.restore(&buyer);

    let mut app = harness.mount().await;
    assert_eq!(app.view(), View::Loading);

    settle(&mut app).await;
    assert_eq!(app.view(), View::Customer);
}

#[tokio::test]
async fn test_user_without_record_is_a_customer() {
    let harness = harness_with_accounts();
    harness.auth.add_account("new@example.com", PASSWORD);

    let mut app = harness.mount().await;
    app.sign_in(Credentials::new("new@example.com", PASSWORD)).await.unwrap();
    settle(&mut app).await;

    assert_eq!(app.state().role(), &RoleState::Resolved(Role::Customer));
    assert_eq!(app.view(), View::Customer);
}

#[tokio::test]
async fn test_pending_admin_lookup_never_shows_customer_view() {
    let harness = harness_with_accounts();
    let admin = harness.auth.add_account("slow-admin@example.com", PASSWORD);
    harness.users.set_role(admin.user_id, Some("admin"));
    let gate = harness.users.gate(admin.user_id);

    let mut app = harness.mount().await;
    app.sign_in(Credentials::new("slow-admin@example.com", PASSWORD)).await.unwrap();
    settle(&mut app).await;
    assert_eq!(app.view(), View::Loading);

    gate.notify_one();
    settle(&mut app).await;
    assert_eq!(app.view(), View::Administrator);
}

#[tokio::test]
async fn test_stale_lookup_is_discarded_after_newer_session() {
    let harness = harness_with_accounts();
    let admin = harness.auth.add_account("slow-admin@example.com", PASSWORD);
    harness.users.set_role(admin.user_id, Some("admin"));
    let gate = harness.users.gate(admin.user_id);

    let mut app = harness.mount().await;
    app.sign_in(Credentials::new("slow-admin@example.com", PASSWORD)).await.unwrap();
    settle(&mut app).await;

    // Another tab signs a different user in before the admin lookup returns.
    let buyer = harness.auth.add_account("other-buyer@example.com", PASSWORD);
    harness.auth.emit(Some(session_for(&buyer)));
    settle(&mut app).await;
    assert_eq!(app.view(), View::Customer);

    gate.notify_one();
    settle(&mut app).await;
    assert_eq!(app.view(), View::Customer);
    assert_eq!(
        app.state().session().map(|s| s.user.email.as_str()),
        Some("other-buyer@example.com")
    );
}

#[tokio::test]
async fn test_role_lookup_failure_is_retryable() {
    let harness = harness_with_accounts();
    harness.users.set_failing(true);

    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;
    assert!(matches!(app.view(), View::RoleLookupFailed { .. }));
    assert!(matches!(
        app.render(),
        Screen::RoleLookupFailed { reason } if reason.contains("connection refused")
    ));

    harness.users.set_failing(false);
    app.retry_role_lookup().await;
    assert_eq!(app.view(), View::Loading);

    settle(&mut app).await;
    assert_eq!(app.view(), View::Administrator);
}

// =============================================================================
// Customer View
// =============================================================================

#[tokio::test]
async fn test_customer_selection_and_running_total() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;

    app.toggle_ticket(1).unwrap();
    app.toggle_ticket(7).unwrap();
    match app.render() {
        Screen::Customer { view: Some(view), .. } => assert_eq!(view.total(), 10),
        other => panic!("expected customer grid, got {:?}", other),
    }

    assert!(!app.toggle_ticket(1).unwrap());
    match app.render() {
        Screen::Customer { view: Some(view), catalog, .. } => {
            assert_eq!(catalog.len(), 1);
            assert_eq!(view.tickets().len(), 100);
            assert_eq!(view.total(), 5);
            assert_eq!(view.selected_labels(), vec!["007".to_string()]);
        }
        other => panic!("expected customer grid, got {:?}", other),
    }

    assert_eq!(app.pay(), Err(CustomerError::CheckoutNotImplemented));
}

#[tokio::test]
async fn test_selection_is_cleared_on_navigation_away() {
    let harness = harness_with_accounts();
    let other = harness.raffles.insert("PlayStation 5", 100, 3);
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;

    app.toggle_ticket(12).unwrap();
    app.open_raffle(other.id).await.unwrap();
    match app.render() {
        Screen::Customer { view: Some(view), .. } => {
            assert_eq!(view.raffle().name, "PlayStation 5");
            assert!(view.selection().is_empty());
        }
        other => panic!("expected customer grid, got {:?}", other),
    }

    app.toggle_ticket(3).unwrap();
    app.sign_out().await.unwrap();
    settle(&mut app).await;
    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;
    match app.render() {
        Screen::Customer { view: Some(view), .. } => assert!(view.selection().is_empty()),
        other => panic!("expected customer grid, got {:?}", other),
    }
}

#[tokio::test]
async fn test_customer_without_raffles_sees_empty_catalog() {
    let harness = Harness::new();
    harness.auth.add_account(BUYER_EMAIL, PASSWORD);
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;

    assert!(matches!(
        app.render(),
        Screen::Customer { view: None, catalog, .. } if catalog.is_empty()
    ));
    assert_eq!(app.toggle_ticket(1), Err(CustomerError::NoActiveRaffle));
}

#[tokio::test]
async fn test_commands_are_scoped_to_the_routed_view() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    assert_eq!(app.toggle_ticket(1), Err(CustomerError::NotActive));

    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;
    let attempt = app
        .create_raffle(NewRaffle {
            name: "Sneaky".to_string(),
            total_tickets: 10,
            unit_price: 1,
            draw_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        })
        .await;
    assert!(matches!(attempt, Err(AdminError::NotPermitted)));
    assert_eq!(harness.raffles.len(), 1);
}

// =============================================================================
// Administrator View
// =============================================================================

#[tokio::test]
async fn test_admin_manages_raffles() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;

    let created = app
        .create_raffle(NewRaffle {
            name: "Mountain Bike".to_string(),
            total_tickets: 50,
            unit_price: 2,
            draw_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(harness.raffles.len(), 2);

    harness.raffles.mark(created.id, 7, TicketStatus::Sold);
    harness.raffles.mark(created.id, 8, TicketStatus::Reserved);
    let numbers = app.view_numbers(created.id).await.unwrap();
    assert_eq!(numbers.numbers.len(), 50);
    assert_eq!(numbers.count(TicketStatus::Sold), 1);
    assert_eq!(numbers.count(TicketStatus::Reserved), 1);
    assert_eq!(numbers.numbers[6].label, "007");

    app.delete_raffle(created.id).await.unwrap();
    assert_eq!(harness.raffles.len(), 1);
    match app.render() {
        Screen::Administrator { view: Some(view), .. } => {
            assert_eq!(view.raffles().len(), 1);
            assert!(view.numbers().is_none());
        }
        other => panic!("expected administrator view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_raffle_is_rejected_before_the_store() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;

    let result = app
        .create_raffle(NewRaffle {
            name: String::new(),
            total_tickets: 100,
            unit_price: 5,
            draw_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        })
        .await;
    assert!(matches!(result, Err(AdminError::InvalidRaffle(_))));
    assert_eq!(harness.raffles.len(), 1);
}

#[tokio::test]
async fn test_admin_refresh_picks_up_raffles_created_elsewhere() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(ADMIN_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;

    harness.raffles.insert("PlayStation 5", 100, 3);
    match app.render() {
        Screen::Administrator { view: Some(view), .. } => assert_eq!(view.raffles().len(), 1),
        other => panic!("expected administrator view, got {:?}", other),
    }

    app.refresh_raffles().await.unwrap();
    match app.render() {
        Screen::Administrator { view: Some(view), .. } => {
            let names: Vec<&str> = view.raffles().iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["iPhone 15 Pro Max", "PlayStation 5"]);
        }
        other => panic!("expected administrator view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_customer_refresh_keeps_selection_until_raffle_is_gone() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    app.sign_in(Credentials::new(BUYER_EMAIL, PASSWORD)).await.unwrap();
    settle(&mut app).await;
    app.toggle_ticket(4).unwrap();

    let bike = harness.raffles.insert("Mountain Bike", 100, 2);
    app.refresh_raffles().await.unwrap();
    match app.render() {
        Screen::Customer { view: Some(view), catalog, .. } => {
            assert_eq!(catalog.len(), 2);
            assert_eq!(view.raffle().name, "iPhone 15 Pro Max");
            assert!(view.selection().contains(4));
        }
        other => panic!("expected customer grid, got {:?}", other),
    }

    let open = harness.raffles.list_raffles().await.unwrap()[0].id;
    harness.raffles.delete_raffle(open).await.unwrap();
    app.refresh_raffles().await.unwrap();
    match app.render() {
        Screen::Customer { view: Some(view), catalog, .. } => {
            assert_eq!(catalog.len(), 1);
            assert_eq!(view.raffle().id, bike.id);
            assert!(view.selection().is_empty());
        }
        other => panic!("expected customer grid, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_outside_raffle_views_is_a_no_op() {
    let harness = harness_with_accounts();
    let mut app = harness.mount().await;
    assert!(app.refresh_raffles().await.is_ok());
    assert_eq!(app.view(), View::Login);
}
