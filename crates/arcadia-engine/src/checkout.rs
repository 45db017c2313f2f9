//! # Checkout Engine
//!
//! Finalizes a sale: the session charge (with optional manual override),
//! the session's running tab, and any additional cart items become one
//! immutable receipt.
//!
//! ## All-Or-Nothing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Checkout Is One Atomic Transaction                     │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── session given?                                                  │
//! │    │     ├── must be ended          → SessionNotEnded                  │
//! │    │     ├── no receipt yet (check  → DuplicateCheckout                │
//! │    │     │   inside THIS txn)                                          │
//! │    │     ├── final cost present     → CostNotCalculated                │
//! │    │     ├── override ?? calculated → NegativePrice if < 0             │
//! │    │     └── fold tab lines into the receipt (stock already settled)   │
//! │    │                                                                    │
//! │    ├── each cart item:                                                 │
//! │    │     ├── load product           → ProductNotFound                  │
//! │    │     ├── guarded stock decrement→ InsufficientStock                │
//! │    │     └── snapshot name + price into a receipt line                 │
//! │    │                                                                    │
//! │    ├── tax = subtotal × policy rate; total = subtotal + tax            │
//! │    │                                                                    │
//! │    └── insert receipt + lines (unique index on session_id is the       │
//! │        authority against concurrent double-checkout)                   │
//! │    │                                                                    │
//! │  COMMIT ← everything lands, or ANY failure rolls ALL of it back,       │
//! │           including stock decrements made earlier in this call         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use arcadia_core::billing::billed_minutes;
use arcadia_core::types::{
    ConsoleUsage, PaymentMethod, Receipt, ReceiptItem, TaxRate,
};
use arcadia_core::validation::validate_quantity;
use arcadia_core::{CoreError, Money, ValidationError, MAX_CART_ITEMS};
use arcadia_db::{
    ConsoleRepository, Database, DbError, ProductRepository, ReceiptRepository,
    SessionRepository,
};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Policy & Request Types
// =============================================================================

/// Checkout policy knobs.
///
/// The tax rate is a fixed policy constant for the store, applied to the
/// receipt subtotal. Default: zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingPolicy {
    pub tax_rate: TaxRate,
}

/// One requested cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

/// A checkout request.
///
/// `session_id` settles an ended session; `manual_override_cents` replaces
/// the calculated session cost (recorded beside it for audit). A request
/// with neither a session nor cart items is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub session_id: Option<String>,
    pub cart_items: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    pub manual_override_cents: Option<i64>,
}

// =============================================================================
// Checkout Engine
// =============================================================================

/// The checkout/billing engine.
///
/// Reads the terminal session record read-only: it never re-derives a
/// different calculated cost than what the session engine froze at end
/// time.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    db: Database,
    policy: BillingPolicy,
}

impl CheckoutEngine {
    /// Creates a checkout engine with the default policy (tax rate 0).
    pub fn new(db: Database) -> Self {
        CheckoutEngine {
            db,
            policy: BillingPolicy::default(),
        }
    }

    /// Creates a checkout engine with an explicit policy.
    pub fn with_policy(db: Database, policy: BillingPolicy) -> Self {
        CheckoutEngine { db, policy }
    }

    /// Performs an atomic checkout and returns the composed receipt.
    ///
    /// See the module docs for the full algorithm. Steps run inside one
    /// storage transaction; any failure rolls back every mutation made
    /// earlier in the same call.
    pub async fn checkout(&self, request: CheckoutRequest) -> EngineResult<Receipt> {
        debug!(
            session_id = ?request.session_id,
            cart_lines = request.cart_items.len(),
            method = %request.payment_method,
            "checkout"
        );

        self.validate_request(&request)?;

        let receipt_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut subtotal = Money::zero();
        let mut items: Vec<ReceiptItem> = Vec::new();
        let mut console_usage: Option<ConsoleUsage> = None;

        // --- Step 1: the session charge and its tab --------------------------
        if let Some(session_id) = &request.session_id {
            let session = SessionRepository::get_tx(&mut tx, session_id)
                .await?
                .ok_or_else(|| CoreError::SessionNotFound(session_id.clone()))?;

            if !session.is_ended() {
                return Err(CoreError::SessionNotEnded(session_id.clone()).into());
            }
            if ReceiptRepository::exists_for_session_tx(&mut tx, session_id).await? {
                return Err(CoreError::DuplicateCheckout(session_id.clone()).into());
            }
            let calculated = session
                .final_cost()
                .ok_or_else(|| CoreError::CostNotCalculated(session_id.clone()))?;

            let charged_cents = request.manual_override_cents.unwrap_or(calculated.cents());
            if charged_cents < 0 {
                return Err(CoreError::NegativePrice(charged_cents).into());
            }

            let console = ConsoleRepository::get_tx(&mut tx, &session.console_id)
                .await?
                .ok_or_else(|| CoreError::ConsoleNotFound(session.console_id.clone()))?;

            console_usage = Some(ConsoleUsage {
                gaming_mode: session.gaming_mode,
                duration_minutes: billed_minutes(session.active_duration_ms(now)),
                rate_1v1_cents: console.rate_1v1_cents,
                rate_2v2_cents: console.rate_2v2_cents,
                rate_used_cents: console.rate_for(session.gaming_mode).cents(),
                calculated_cost_cents: calculated.cents(),
                charged_cost_cents: charged_cents,
            });
            subtotal += Money::from_cents(charged_cents);

            // Tab lines were stock-settled at add time; they fold into the
            // receipt as-is, at their captured prices.
            for tab_line in SessionRepository::items_tx(&mut tx, session_id).await? {
                subtotal += tab_line.line_total();
                items.push(ReceiptItem {
                    id: Uuid::new_v4().to_string(),
                    receipt_id: receipt_id.clone(),
                    product_id: tab_line.product_id,
                    name_snapshot: tab_line.name_snapshot,
                    quantity: tab_line.quantity,
                    unit_price_cents: tab_line.unit_price_cents,
                    line_total_cents: tab_line.line_total_cents,
                });
            }
        }

        // --- Step 2: additional cart items -----------------------------------
        for line in &request.cart_items {
            let product = ProductRepository::get_tx(&mut tx, &line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if !ProductRepository::decrement_stock(&mut tx, &line.product_id, line.quantity)
                .await?
            {
                // Rolls back every decrement made earlier in this call
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available: product.current_stock,
                    requested: line.quantity,
                }
                .into());
            }

            let line_total = product.price().multiply_quantity(line.quantity);
            subtotal += line_total;
            items.push(ReceiptItem {
                id: Uuid::new_v4().to_string(),
                receipt_id: receipt_id.clone(),
                product_id: product.id,
                name_snapshot: product.name,
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                line_total_cents: line_total.cents(),
            });
        }

        // --- Step 3: totals ---------------------------------------------------
        let tax = subtotal.calculate_tax(self.policy.tax_rate);
        let total = subtotal + tax;

        // --- Step 4: persist --------------------------------------------------
        let receipt = Receipt {
            id: receipt_id,
            session_id: request.session_id.clone(),
            console_usage,
            items,
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
            payment_method: request.payment_method,
            created_at: now,
        };

        ReceiptRepository::insert_tx(&mut tx, &receipt)
            .await
            .map_err(|e| Self::translate_insert_error(e, request.session_id.as_deref()))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            receipt_id = %receipt.id,
            session_id = ?receipt.session_id,
            subtotal = %Money::from_cents(receipt.subtotal_cents),
            total = %Money::from_cents(receipt.total_cents),
            "Checkout complete"
        );
        Ok(receipt)
    }

    /// Gets a receipt with its item lines.
    pub async fn get(&self, receipt_id: &str) -> EngineResult<Receipt> {
        self.db
            .receipts()
            .get_by_id(receipt_id)
            .await?
            .ok_or_else(|| CoreError::ReceiptNotFound(receipt_id.to_string()).into())
    }

    /// Checks whether a session has already been checked out.
    pub async fn exists_for_session(&self, session_id: &str) -> EngineResult<bool> {
        Ok(self.db.receipts().exists_for_session(session_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Pre-transaction input validation. The transaction remains the
    /// authoritative enforcement for everything touching shared state.
    fn validate_request(&self, request: &CheckoutRequest) -> EngineResult<()> {
        if request.session_id.is_none() && request.cart_items.is_empty() {
            return Err(ValidationError::Required {
                field: "cart items".to_string(),
            }
            .into());
        }

        if request.cart_items.len() > MAX_CART_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "cart items".to_string(),
                min: 0,
                max: MAX_CART_ITEMS as i64,
            }
            .into());
        }

        for line in &request.cart_items {
            validate_quantity(line.quantity).map_err(CoreError::from)?;
        }

        Ok(())
    }

    /// The unique index on receipts(session_id) is the authority against
    /// the two-concurrent-checkouts race; translate its violation back to
    /// the domain error the in-transaction check would have produced.
    fn translate_insert_error(err: DbError, session_id: Option<&str>) -> EngineError {
        match (&err, session_id) {
            (DbError::UniqueViolation { field, .. }, Some(sid))
                if field.contains("receipts.session_id") =>
            {
                CoreError::DuplicateCheckout(sid.to_string()).into()
            }
            _ => err.into(),
        }
    }
}
