//! End-to-end engine tests against in-memory SQLite.
//!
//! Lifecycle timing that needs exact instants is covered by the pure unit
//! tests in arcadia-core; here, sessions are backdated by direct row edits
//! so billing outcomes stay deterministic against the real store.

use chrono::{Duration, Utc};

use arcadia_core::types::{ConsoleStatus, GamingMode, PaymentMethod, SessionStatus};
use arcadia_core::CoreError;
use arcadia_db::{Database, DbConfig, NewConsole, NewProduct};
use arcadia_engine::{
    BillingPolicy, CartLine, CheckoutEngine, CheckoutRequest, EngineError, SessionEngine,
};

// =============================================================================
// Helpers
// =============================================================================

async fn setup() -> (Database, SessionEngine, CheckoutEngine) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    (
        db.clone(),
        SessionEngine::new(db.clone()),
        CheckoutEngine::new(db),
    )
}

async fn seed_console(db: &Database, rate_1v1: i64, rate_2v2: Option<i64>) -> String {
    db.consoles()
        .insert(NewConsole {
            name: "Station 1".to_string(),
            console_type: "PS5".to_string(),
            rate_1v1_cents: rate_1v1,
            rate_2v2_cents: rate_2v2,
        })
        .await
        .unwrap()
        .id
}

async fn seed_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> String {
    db.products()
        .insert(NewProduct {
            sku: sku.to_string(),
            name: format!("{sku} item"),
            price_cents,
            current_stock: stock,
        })
        .await
        .unwrap()
        .id
}

/// Backdates a session's start so end/preview see a known elapsed time.
async fn backdate_start(db: &Database, session_id: &str, minutes: i64) {
    sqlx::query("UPDATE sessions SET start_time = ?1 WHERE id = ?2")
        .bind(Utc::now() - Duration::minutes(minutes))
        .bind(session_id)
        .execute(db.pool())
        .await
        .unwrap();
}

/// Backdates both start and the open pause marker.
async fn backdate_pause(db: &Database, session_id: &str, start_min: i64, paused_min: i64) {
    sqlx::query("UPDATE sessions SET start_time = ?1, paused_at = ?2 WHERE id = ?3")
        .bind(Utc::now() - Duration::minutes(start_min))
        .bind(Utc::now() - Duration::minutes(paused_min))
        .bind(session_id)
        .execute(db.pool())
        .await
        .unwrap();
}

async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .current_stock
}

fn core_err(err: EngineError) -> CoreError {
    match err {
        EngineError::Core(e) => e,
        EngineError::Db(e) => panic!("expected domain error, got storage error: {e}"),
    }
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[tokio::test]
async fn start_claims_console_and_end_releases_it() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;

    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    let console = db.consoles().get_by_id(&console_id).await.unwrap().unwrap();
    assert_eq!(console.status, ConsoleStatus::InUse);

    let ended = sessions.end(&session.id).await.unwrap();
    assert_eq!(ended.status, SessionStatus::Ended);
    assert!(ended.end_time.is_some());
    let console = db.consoles().get_by_id(&console_id).await.unwrap().unwrap();
    assert_eq!(console.status, ConsoleStatus::Available);

    // Console is free again: a fresh session may start
    sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();
}

#[tokio::test]
async fn start_fails_on_busy_console_regardless_of_mode() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    for mode in [GamingMode::OneVsOne, GamingMode::TwoVsTwo] {
        let err = core_err(sessions.start(&console_id, mode).await.unwrap_err());
        assert!(matches!(err, CoreError::ConsoleUnavailable { .. }));
    }
}

#[tokio::test]
async fn start_fails_on_maintenance_reserved_and_missing_consoles() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;

    for status in [ConsoleStatus::Maintenance, ConsoleStatus::Reserved] {
        db.consoles().set_status(&console_id, status).await.unwrap();
        let err = core_err(
            sessions
                .start(&console_id, GamingMode::OneVsOne)
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, CoreError::ConsoleUnavailable { .. }));
    }

    let err = core_err(
        sessions
            .start("no-such-console", GamingMode::OneVsOne)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::ConsoleUnavailable { .. }));
}

#[tokio::test]
async fn start_rejects_mode_without_positive_rate() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, Some(0)).await;

    let err = core_err(
        sessions
            .start(&console_id, GamingMode::TwoVsTwo)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::UnsupportedMode { .. }));

    // The console stays available after the rejected start
    let console = db.consoles().get_by_id(&console_id).await.unwrap().unwrap();
    assert_eq!(console.status, ConsoleStatus::Available);
}

#[tokio::test]
async fn pause_resume_round_trip_accumulates_paused_time() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    let paused = sessions.pause(&session.id).await.unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert!(paused.paused_at.is_some());

    // Backdate the open pause so the resume folds in a known interval
    backdate_pause(&db, &session.id, 60, 15).await;

    let resumed = sessions.resume(&session.id).await.unwrap();
    assert_eq!(resumed.status, SessionStatus::Active);
    assert!(resumed.paused_at.is_none());
    // 15 minutes, within a 6-second test-execution tolerance
    let fifteen_min = 15 * 60 * 1000;
    assert!((resumed.total_paused_ms - fifteen_min).abs() < 6_000);
}

#[tokio::test]
async fn wrong_state_transitions_are_rejected() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    // resume while active
    let err = core_err(sessions.resume(&session.id).await.unwrap_err());
    assert!(matches!(err, CoreError::InvalidTransition { .. }));

    // pause twice
    sessions.pause(&session.id).await.unwrap();
    let err = core_err(sessions.pause(&session.id).await.unwrap_err());
    assert!(matches!(err, CoreError::InvalidTransition { .. }));

    // everything after end
    sessions.end(&session.id).await.unwrap();
    let err = core_err(sessions.end(&session.id).await.unwrap_err());
    assert!(matches!(err, CoreError::AlreadyEnded(_)));
    let err = core_err(sessions.pause(&session.id).await.unwrap_err());
    assert!(matches!(err, CoreError::InvalidTransition { .. }));

    // unknown session
    let err = core_err(sessions.pause("no-such-session").await.unwrap_err());
    assert!(matches!(err, CoreError::SessionNotFound(_)));
}

#[tokio::test]
async fn end_bills_active_duration_at_current_mode_rate() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 600, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    // 90 minutes at $6.00/hour = $9.00
    backdate_start(&db, &session.id, 90).await;
    let ended = sessions.end(&session.id).await.unwrap();
    assert_eq!(ended.final_cost_cents, Some(900));
}

#[tokio::test]
async fn end_while_paused_does_not_bill_open_pause() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 600, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();
    sessions.pause(&session.id).await.unwrap();

    // Started 120 minutes ago, paused for the last 60: bill exactly 1 hour.
    // Both terms use the same measurement instant, so there is no drift.
    backdate_pause(&db, &session.id, 120, 60).await;

    let ended = sessions.end(&session.id).await.unwrap();
    assert_eq!(ended.final_cost_cents, Some(600));
    assert_eq!(ended.status, SessionStatus::Ended);
}

#[tokio::test]
async fn mode_change_bills_whole_session_at_end_time_rate() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, Some(1200)).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    backdate_start(&db, &session.id, 60).await;
    sessions
        .change_gaming_mode(&session.id, GamingMode::TwoVsTwo)
        .await
        .unwrap();

    // The whole hour bills at the 2v2 rate; no pro-rating
    let ended = sessions.end(&session.id).await.unwrap();
    assert_eq!(ended.final_cost_cents, Some(1200));
}

#[tokio::test]
async fn mode_change_validates_rate_like_start() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, Some(0)).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    let err = core_err(
        sessions
            .change_gaming_mode(&session.id, GamingMode::TwoVsTwo)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::UnsupportedMode { .. }));

    sessions.end(&session.id).await.unwrap();
    let err = core_err(
        sessions
            .change_gaming_mode(&session.id, GamingMode::OneVsOne)
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn cost_preview_reports_both_rates_without_mutating() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, Some(1200)).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    backdate_start(&db, &session.id, 30).await;
    let preview = sessions.cost_preview(&session.id).await.unwrap();
    assert_eq!(preview.cost_1v1.cents(), 400);
    assert_eq!(preview.cost_2v2.cents(), 600);

    let after = sessions.get(&session.id).await.unwrap();
    assert_eq!(after.status, SessionStatus::Active);
    assert!(after.final_cost_cents.is_none());

    sessions.end(&session.id).await.unwrap();
    let err = core_err(sessions.cost_preview(&session.id).await.unwrap_err());
    assert!(matches!(err, CoreError::AlreadyEnded(_)));
}

// =============================================================================
// Running Tab
// =============================================================================

#[tokio::test]
async fn add_item_decrements_stock_and_captures_price() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let product_id = seed_product(&db, "COLA-330", 250, 45).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    let item = sessions.add_item(&session.id, &product_id, 3).await.unwrap();
    assert_eq!(item.unit_price_cents, 250);
    assert_eq!(item.line_total_cents, 750);
    assert_eq!(stock_of(&db, &product_id).await, 42);

    let tab = sessions.tab(&session.id).await.unwrap();
    assert_eq!(tab.len(), 1);
    assert_eq!(tab[0].line_total_cents, 750);
}

#[tokio::test]
async fn add_item_rejects_bad_quantity_missing_product_and_thin_stock() {
    let (db, sessions, _) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let product_id = seed_product(&db, "CHIPS-SALT", 350, 2).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    let err = core_err(sessions.add_item(&session.id, &product_id, 0).await.unwrap_err());
    assert!(matches!(err, CoreError::Validation(_)));

    let err = core_err(sessions.add_item(&session.id, "missing", 1).await.unwrap_err());
    assert!(matches!(err, CoreError::ProductNotFound(_)));

    let err = core_err(sessions.add_item(&session.id, &product_id, 3).await.unwrap_err());
    match err {
        CoreError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("expected InsufficientStock, got {other}"),
    }
    // The failed add touched nothing
    assert_eq!(stock_of(&db, &product_id).await, 2);

    sessions.end(&session.id).await.unwrap();
    let err = core_err(sessions.add_item(&session.id, &product_id, 1).await.unwrap_err());
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn checkout_with_manual_override_records_both_costs() {
    let (db, sessions, checkout) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    // One hour at $8.00/hour → calculated 8.00; charge 5.00 instead
    backdate_start(&db, &session.id, 60).await;
    sessions.end(&session.id).await.unwrap();

    let receipt = checkout
        .checkout(CheckoutRequest {
            session_id: Some(session.id.clone()),
            cart_items: Vec::new(),
            payment_method: PaymentMethod::Cash,
            manual_override_cents: Some(500),
        })
        .await
        .unwrap();

    let usage = receipt.console_usage.as_ref().unwrap();
    assert_eq!(usage.calculated_cost_cents, 800);
    assert_eq!(usage.charged_cost_cents, 500);
    assert_eq!(usage.duration_minutes, 60);
    assert_eq!(usage.rate_used_cents, 800);
    assert_eq!(receipt.subtotal_cents, 500);
    assert_eq!(receipt.tax_cents, 0);
    assert_eq!(receipt.total_cents, 500);

    // Round trip through the store
    let fetched = checkout.get(&receipt.id).await.unwrap();
    assert_eq!(fetched.total_cents, 500);
    assert_eq!(
        fetched.console_usage.unwrap().calculated_cost_cents,
        800
    );
}

#[tokio::test]
async fn checkout_rejects_negative_override_and_open_sessions() {
    let (db, sessions, checkout) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    // Not ended yet
    let err = core_err(
        checkout
            .checkout(CheckoutRequest {
                session_id: Some(session.id.clone()),
                cart_items: Vec::new(),
                payment_method: PaymentMethod::Cash,
                manual_override_cents: None,
            })
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::SessionNotEnded(_)));

    sessions.end(&session.id).await.unwrap();
    let err = core_err(
        checkout
            .checkout(CheckoutRequest {
                session_id: Some(session.id.clone()),
                cart_items: Vec::new(),
                payment_method: PaymentMethod::Cash,
                manual_override_cents: Some(-100),
            })
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::NegativePrice(-100)));
}

#[tokio::test]
async fn second_checkout_fails_and_mutates_no_stock() {
    let (db, sessions, checkout) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let product_id = seed_product(&db, "CHOC-BAR", 200, 10).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();
    sessions.end(&session.id).await.unwrap();

    checkout
        .checkout(CheckoutRequest {
            session_id: Some(session.id.clone()),
            cart_items: Vec::new(),
            payment_method: PaymentMethod::Cash,
            manual_override_cents: None,
        })
        .await
        .unwrap();

    // The second attempt carries cart items; none of them may land
    let err = core_err(
        checkout
            .checkout(CheckoutRequest {
                session_id: Some(session.id.clone()),
                cart_items: vec![CartLine {
                    product_id: product_id.clone(),
                    quantity: 4,
                }],
                payment_method: PaymentMethod::Card,
                manual_override_cents: None,
            })
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::DuplicateCheckout(_)));
    assert_eq!(stock_of(&db, &product_id).await, 10);
}

#[tokio::test]
async fn failed_cart_line_rolls_back_earlier_decrements() {
    let (db, _, checkout) = setup().await;
    let plenty = seed_product(&db, "WATER-500", 150, 10).await;
    let scarce = seed_product(&db, "ENERGY-250", 400, 3).await;

    let err = core_err(
        checkout
            .checkout(CheckoutRequest {
                session_id: None,
                cart_items: vec![
                    CartLine {
                        product_id: plenty.clone(),
                        quantity: 2,
                    },
                    CartLine {
                        product_id: scarce.clone(),
                        quantity: 5,
                    },
                ],
                payment_method: PaymentMethod::Cash,
                manual_override_cents: None,
            })
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::InsufficientStock { .. }));

    // The first line's decrement was rolled back with the transaction
    assert_eq!(stock_of(&db, &plenty).await, 10);
    assert_eq!(stock_of(&db, &scarce).await, 3);
}

#[tokio::test]
async fn pure_retail_checkout_needs_no_session() {
    let (db, _, checkout) = setup().await;
    let cola = seed_product(&db, "COLA-330", 250, 48).await;
    let chips = seed_product(&db, "CHIPS-PAPR", 350, 40).await;

    let receipt = checkout
        .checkout(CheckoutRequest {
            session_id: None,
            cart_items: vec![
                CartLine {
                    product_id: cola.clone(),
                    quantity: 2,
                },
                CartLine {
                    product_id: chips.clone(),
                    quantity: 1,
                },
            ],
            payment_method: PaymentMethod::Card,
            manual_override_cents: None,
        })
        .await
        .unwrap();

    assert!(receipt.session_id.is_none());
    assert!(receipt.console_usage.is_none());
    assert_eq!(receipt.items.len(), 2);
    assert_eq!(receipt.subtotal_cents, 850);
    assert_eq!(receipt.total_cents, 850);
    assert_eq!(stock_of(&db, &cola).await, 46);
    assert_eq!(stock_of(&db, &chips).await, 39);
}

#[tokio::test]
async fn empty_checkout_without_session_is_rejected() {
    let (_db, _sessions, checkout) = setup().await;

    let err = core_err(
        checkout
            .checkout(CheckoutRequest {
                session_id: None,
                cart_items: Vec::new(),
                payment_method: PaymentMethod::Cash,
                manual_override_cents: None,
            })
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn tab_lines_fold_into_the_receipt_without_restocking() {
    let (db, sessions, checkout) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let cola = seed_product(&db, "COLA-330", 250, 45).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();

    sessions.add_item(&session.id, &cola, 2).await.unwrap();
    assert_eq!(stock_of(&db, &cola).await, 43);

    backdate_start(&db, &session.id, 60).await;
    sessions.end(&session.id).await.unwrap();

    let receipt = checkout
        .checkout(CheckoutRequest {
            session_id: Some(session.id.clone()),
            cart_items: Vec::new(),
            payment_method: PaymentMethod::Cash,
            manual_override_cents: None,
        })
        .await
        .unwrap();

    // 60 min at $8.00 + two colas at their captured price
    assert_eq!(receipt.subtotal_cents, 800 + 500);
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].product_id, cola);
    assert_eq!(receipt.items[0].line_total_cents, 500);
    // Tab stock was settled at add time; checkout does not touch it again
    assert_eq!(stock_of(&db, &cola).await, 43);
}

#[tokio::test]
async fn tax_policy_applies_to_the_subtotal() {
    let (db, _, _) = setup().await;
    let cola = seed_product(&db, "COLA-330", 250, 48).await;

    let taxed = CheckoutEngine::with_policy(
        db.clone(),
        BillingPolicy {
            tax_rate: arcadia_core::types::TaxRate::from_bps(1000),
        },
    );

    let receipt = taxed
        .checkout(CheckoutRequest {
            session_id: None,
            cart_items: vec![CartLine {
                product_id: cola,
                quantity: 4,
            }],
            payment_method: PaymentMethod::Cash,
            manual_override_cents: None,
        })
        .await
        .unwrap();

    // $10.00 subtotal at 10% tax
    assert_eq!(receipt.subtotal_cents, 1000);
    assert_eq!(receipt.tax_cents, 100);
    assert_eq!(receipt.total_cents, 1100);
}

#[tokio::test]
async fn override_equal_to_zero_is_allowed() {
    let (db, sessions, checkout) = setup().await;
    let console_id = seed_console(&db, 800, None).await;
    let session = sessions.start(&console_id, GamingMode::OneVsOne).await.unwrap();
    backdate_start(&db, &session.id, 60).await;
    sessions.end(&session.id).await.unwrap();

    // Comped session: charge nothing, keep the calculated figure on record
    let receipt = checkout
        .checkout(CheckoutRequest {
            session_id: Some(session.id.clone()),
            cart_items: Vec::new(),
            payment_method: PaymentMethod::Cash,
            manual_override_cents: Some(0),
        })
        .await
        .unwrap();

    let usage = receipt.console_usage.unwrap();
    assert_eq!(usage.calculated_cost_cents, 800);
    assert_eq!(usage.charged_cost_cents, 0);
    assert_eq!(receipt.total_cents, 0);
}

#[tokio::test]
async fn session_with_2v2_mode_checks_out_at_2v2_rate() {
    let (db, sessions, checkout) = setup().await;
    let console_id = seed_console(&db, 800, Some(1200)).await;
    let session = sessions.start(&console_id, GamingMode::TwoVsTwo).await.unwrap();
    backdate_start(&db, &session.id, 60).await;
    sessions.end(&session.id).await.unwrap();

    let receipt = checkout
        .checkout(CheckoutRequest {
            session_id: Some(session.id.clone()),
            cart_items: Vec::new(),
            payment_method: PaymentMethod::Card,
            manual_override_cents: None,
        })
        .await
        .unwrap();

    let usage = receipt.console_usage.unwrap();
    assert_eq!(usage.gaming_mode, GamingMode::TwoVsTwo);
    assert_eq!(usage.rate_1v1_cents, 800);
    assert_eq!(usage.rate_2v2_cents, 1200);
    assert_eq!(usage.rate_used_cents, 1200);
    assert_eq!(usage.calculated_cost_cents, 1200);
    assert_eq!(receipt.total_cents, 1200);
}
