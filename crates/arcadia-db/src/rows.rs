//! # Row Structs
//!
//! Storage-shaped mirror structs for `sqlx::query_as` and the single
//! boundary mapping into domain types.
//!
//! Closed enumerations are TEXT in the database and typed enums in the
//! domain; the `TryFrom` impls here are the ONLY place that conversion
//! happens. A row that fails the mapping surfaces as `DbError::CorruptRow`
//! rather than panicking or leaking stringly-typed state upward.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use arcadia_core::types::{
    Console, ConsoleUsage, Product, Receipt, ReceiptItem, SessionItem,
};
use arcadia_core::Session;

use crate::error::{DbError, DbResult};

// =============================================================================
// Console
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ConsoleRow {
    pub id: String,
    pub name: String,
    pub console_type: String,
    pub status: String,
    pub rate_1v1_cents: i64,
    pub rate_2v2_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ConsoleRow> for Console {
    type Error = DbError;

    fn try_from(row: ConsoleRow) -> DbResult<Console> {
        Ok(Console {
            id: row.id,
            name: row.name,
            console_type: row.console_type,
            status: row
                .status
                .parse()
                .map_err(|e| DbError::corrupt_row("consoles", e))?,
            rate_1v1_cents: row.rate_1v1_cents,
            rate_2v2_cents: row.rate_2v2_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub current_stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Product {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            price_cents: row.price_cents,
            current_stock: row.current_stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub console_id: String,
    pub status: String,
    pub gaming_mode: String,
    pub start_time: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_ms: i64,
    pub end_time: Option<DateTime<Utc>>,
    pub final_cost_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = DbError;

    fn try_from(row: SessionRow) -> DbResult<Session> {
        Ok(Session {
            id: row.id,
            console_id: row.console_id,
            status: row
                .status
                .parse()
                .map_err(|e| DbError::corrupt_row("sessions", e))?,
            gaming_mode: row
                .gaming_mode
                .parse()
                .map_err(|e| DbError::corrupt_row("sessions", e))?,
            start_time: row.start_time,
            paused_at: row.paused_at,
            total_paused_ms: row.total_paused_ms,
            end_time: row.end_time,
            final_cost_cents: row.final_cost_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Session Item
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct SessionItemRow {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<SessionItemRow> for SessionItem {
    fn from(row: SessionItemRow) -> SessionItem {
        SessionItem {
            id: row.id,
            session_id: row.session_id,
            product_id: row.product_id,
            name_snapshot: row.name_snapshot,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_total_cents: row.line_total_cents,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct ReceiptRow {
    pub id: String,
    pub session_id: Option<String>,
    pub gaming_mode: Option<String>,
    pub duration_minutes: Option<i64>,
    pub rate_1v1_cents: Option<i64>,
    pub rate_2v2_cents: Option<i64>,
    pub rate_used_cents: Option<i64>,
    pub calculated_cost_cents: Option<i64>,
    pub charged_cost_cents: Option<i64>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReceiptItemRow {
    pub id: String,
    pub receipt_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<ReceiptItemRow> for ReceiptItem {
    fn from(row: ReceiptItemRow) -> ReceiptItem {
        ReceiptItem {
            id: row.id,
            receipt_id: row.receipt_id,
            product_id: row.product_id,
            name_snapshot: row.name_snapshot,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_total_cents: row.line_total_cents,
        }
    }
}

impl ReceiptRow {
    /// Assembles a domain receipt from this row and its item rows.
    ///
    /// The console-usage snapshot is all-or-nothing: a session-linked
    /// receipt missing any usage column is a corrupt row, not a partial
    /// snapshot.
    pub fn into_domain(self, items: Vec<ReceiptItemRow>) -> DbResult<Receipt> {
        let console_usage = match &self.session_id {
            None => None,
            Some(_) => {
                let (Some(mode), Some(minutes), Some(r1), Some(r2), Some(used), Some(calc), Some(charged)) = (
                    self.gaming_mode.as_deref(),
                    self.duration_minutes,
                    self.rate_1v1_cents,
                    self.rate_2v2_cents,
                    self.rate_used_cents,
                    self.calculated_cost_cents,
                    self.charged_cost_cents,
                ) else {
                    return Err(DbError::corrupt_row(
                        "receipts",
                        format!("receipt {} is session-linked but missing usage columns", self.id),
                    ));
                };
                Some(ConsoleUsage {
                    gaming_mode: mode
                        .parse()
                        .map_err(|e| DbError::corrupt_row("receipts", e))?,
                    duration_minutes: minutes,
                    rate_1v1_cents: r1,
                    rate_2v2_cents: r2,
                    rate_used_cents: used,
                    calculated_cost_cents: calc,
                    charged_cost_cents: charged,
                })
            }
        };

        Ok(Receipt {
            id: self.id,
            session_id: self.session_id,
            console_usage,
            items: items.into_iter().map(ReceiptItem::from).collect(),
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            payment_method: self
                .payment_method
                .parse()
                .map_err(|e| DbError::corrupt_row("receipts", e))?,
            created_at: self.created_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use arcadia_core::types::{ConsoleStatus, GamingMode, PaymentMethod};

    fn console_row(status: &str) -> ConsoleRow {
        ConsoleRow {
            id: "c1".to_string(),
            name: "Station 1".to_string(),
            console_type: "PS5".to_string(),
            status: status.to_string(),
            rate_1v1_cents: 800,
            rate_2v2_cents: 1200,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_console_row_maps_status() {
        let console: Console = console_row("in_use").try_into().unwrap();
        assert_eq!(console.status, ConsoleStatus::InUse);
    }

    #[test]
    fn test_console_row_rejects_unknown_status() {
        let err = Console::try_from(console_row("exploded")).unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));
    }

    #[test]
    fn test_receipt_row_without_session_has_no_usage() {
        let row = ReceiptRow {
            id: "r1".to_string(),
            session_id: None,
            gaming_mode: None,
            duration_minutes: None,
            rate_1v1_cents: None,
            rate_2v2_cents: None,
            rate_used_cents: None,
            calculated_cost_cents: None,
            charged_cost_cents: None,
            subtotal_cents: 500,
            tax_cents: 0,
            total_cents: 500,
            payment_method: "cash".to_string(),
            created_at: Utc::now(),
        };
        let receipt = row.into_domain(Vec::new()).unwrap();
        assert!(receipt.console_usage.is_none());
        assert_eq!(receipt.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_receipt_row_with_session_requires_full_snapshot() {
        let mut row = ReceiptRow {
            id: "r1".to_string(),
            session_id: Some("s1".to_string()),
            gaming_mode: Some("2v2".to_string()),
            duration_minutes: Some(60),
            rate_1v1_cents: Some(800),
            rate_2v2_cents: Some(1200),
            rate_used_cents: Some(1200),
            calculated_cost_cents: Some(1200),
            charged_cost_cents: Some(1000),
            subtotal_cents: 1000,
            tax_cents: 0,
            total_cents: 1000,
            payment_method: "card".to_string(),
            created_at: Utc::now(),
        };

        let usage = row
            .clone()
            .into_domain(Vec::new())
            .unwrap()
            .console_usage
            .unwrap();
        assert_eq!(usage.gaming_mode, GamingMode::TwoVsTwo);
        assert_eq!(usage.charged_cost_cents, 1000);

        row.rate_used_cents = None;
        assert!(matches!(
            row.into_domain(Vec::new()).unwrap_err(),
            DbError::CorruptRow { .. }
        ));
    }
}
