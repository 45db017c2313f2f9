//! # Domain Types
//!
//! Core domain types used throughout Arcadia POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Console      │   │    Product      │   │    Receipt      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  status         │   │  sku            │   │  session_id?    │       │
//! │  │  rate_1v1_cents │   │  price_cents    │   │  console_usage? │       │
//! │  │  rate_2v2_cents │   │  current_stock  │   │  total_cents    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Closed enumerations: ConsoleStatus, SessionStatus, GamingMode,        │
//! │  PaymentMethod. Each has one canonical TEXT form (`as_str`) used by    │
//! │  the storage boundary; no dual-format field mirrors exist anywhere.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25%. The default checkout policy is 0 bps (no tax).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Gaming Mode
// =============================================================================

/// Billing tier selector for a rental session.
///
/// A closed two-valued enumeration: it determines which of the console's two
/// hourly rates applies. The mode may change while a session is open; the
/// mode in effect at end time prices the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamingMode {
    /// Single-player tier, billed at the console's base hourly rate.
    #[serde(rename = "1v1")]
    OneVsOne,
    /// Two-versus-two tier, billed at the console's secondary hourly rate.
    #[serde(rename = "2v2")]
    TwoVsTwo,
}

impl GamingMode {
    /// Canonical TEXT form, used by the storage boundary and the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            GamingMode::OneVsOne => "1v1",
            GamingMode::TwoVsTwo => "2v2",
        }
    }
}

impl Default for GamingMode {
    fn default() -> Self {
        GamingMode::OneVsOne
    }
}

impl fmt::Display for GamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1v1" => Ok(GamingMode::OneVsOne),
            "2v2" => Ok(GamingMode::TwoVsTwo),
            other => Err(ValidationError::InvalidFormat {
                field: "gaming_mode".to_string(),
                reason: format!("'{}' is not a gaming mode (expected 1v1 or 2v2)", other),
            }),
        }
    }
}

// =============================================================================
// Console Status
// =============================================================================

/// The availability status of a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleStatus {
    /// Ready to back a new session.
    Available,
    /// Currently backing an open session.
    InUse,
    /// Taken offline for repair; cannot start sessions.
    Maintenance,
    /// Held for a future booking; cannot start sessions.
    Reserved,
}

impl ConsoleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConsoleStatus::Available => "available",
            ConsoleStatus::InUse => "in_use",
            ConsoleStatus::Maintenance => "maintenance",
            ConsoleStatus::Reserved => "reserved",
        }
    }
}

impl fmt::Display for ConsoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ConsoleStatus::Available),
            "in_use" => Ok(ConsoleStatus::InUse),
            "maintenance" => Ok(ConsoleStatus::Maintenance),
            "reserved" => Ok(ConsoleStatus::Reserved),
            other => Err(ValidationError::InvalidFormat {
                field: "console_status".to_string(),
                reason: format!("'{}' is not a console status", other),
            }),
        }
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// The status of a rental session. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Clock is running; time accrues toward the bill.
    Active,
    /// Clock is stopped; the open pause interval is excluded from billing.
    Paused,
    /// Finalized. Duration and cost are frozen; only checkout may follow.
    Ended,
}

impl SessionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "paused" => Ok(SessionStatus::Paused),
            "ended" => Ok(SessionStatus::Ended),
            other => Err(ValidationError::InvalidFormat {
                field: "session_status".to_string(),
                reason: format!("'{}' is not a session status", other),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("'{}' is not a payment method", other),
            }),
        }
    }
}

// =============================================================================
// Console
// =============================================================================

/// A rentable console in the lounge.
///
/// Both hourly rates are persisted at creation time. The 2v2 rate defaults
/// to 1.5× the base rate when unset at creation and is never recomputed at
/// read time, so stored and displayed rates cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Console {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on the floor plan (e.g. "Station 4").
    pub name: String,

    /// Hardware kind (e.g. "PS5", "XBOX", "PC").
    pub console_type: String,

    /// Availability status.
    pub status: ConsoleStatus,

    /// Base hourly rate in cents (1v1 mode).
    pub rate_1v1_cents: i64,

    /// Secondary hourly rate in cents (2v2 mode).
    pub rate_2v2_cents: i64,

    /// When the console was registered.
    pub created_at: DateTime<Utc>,

    /// When the console was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Console {
    /// Returns the hourly rate for the given gaming mode.
    #[inline]
    pub fn rate_for(&self, mode: GamingMode) -> Money {
        match mode {
            GamingMode::OneVsOne => Money::from_cents(self.rate_1v1_cents),
            GamingMode::TwoVsTwo => Money::from_cents(self.rate_2v2_cents),
        }
    }

    /// Checks whether the given mode can be billed on this console.
    ///
    /// A mode is supported iff its persisted rate is strictly positive.
    #[inline]
    pub fn supports(&self, mode: GamingMode) -> bool {
        self.rate_for(mode).is_positive()
    }

    /// Checks whether a new session may start on this console.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.status == ConsoleStatus::Available
    }
}

// =============================================================================
// Product
// =============================================================================

/// A retail product (snack, drink, accessory) available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown on tabs and receipts.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Current stock level.
    pub current_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if the requested quantity can be sold from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.current_stock >= quantity
    }
}

// =============================================================================
// Session Item (running tab line)
// =============================================================================

/// A retail line attached to a running session.
///
/// Uses the snapshot pattern: the unit price is frozen at add time and is
/// decoupled from later catalog price edits. Lines are never mutated; they
/// disappear only if the whole session is deleted (cascade).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionItem {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    /// Product name at time of adding (frozen).
    pub name_snapshot: String,
    /// Quantity added.
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SessionItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Snapshot of the console-time charge on a receipt.
///
/// Present iff the receipt settles a session. Records both rates, the rate
/// actually used, and the calculated cost next to the charged cost so a
/// manual override stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleUsage {
    /// Mode in effect when the session ended.
    pub gaming_mode: GamingMode,
    /// Billable duration, rounded to the nearest minute for display.
    pub duration_minutes: i64,
    /// Base hourly rate at checkout time.
    pub rate_1v1_cents: i64,
    /// Secondary hourly rate at checkout time.
    pub rate_2v2_cents: i64,
    /// The rate the cost was computed with.
    pub rate_used_cents: i64,
    /// Cost computed by the session engine at end time. Never recomputed.
    pub calculated_cost_cents: i64,
    /// What was actually charged (manual override, or the calculated cost).
    pub charged_cost_cents: i64,
}

/// A line item on a receipt. Same snapshot pattern as [`SessionItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: String,
    pub receipt_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
}

/// An immutable checkout artifact.
///
/// Created exactly once per checkout call. At most one receipt may ever
/// reference a given session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    /// Session being settled, if any. None for pure retail checkouts.
    pub session_id: Option<String>,
    /// Console-time charge snapshot. Present iff `session_id` is set.
    pub console_usage: Option<ConsoleUsage>,
    /// Retail lines: the session tab (if any) plus checkout cart items.
    pub items: Vec<ReceiptItem>,
    /// Session charge + all line totals, before tax.
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    /// subtotal + tax. What the customer pays.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_default_is_zero() {
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_enum_text_round_trips() {
        for mode in [GamingMode::OneVsOne, GamingMode::TwoVsTwo] {
            assert_eq!(mode.as_str().parse::<GamingMode>().unwrap(), mode);
        }
        for status in [
            ConsoleStatus::Available,
            ConsoleStatus::InUse,
            ConsoleStatus::Maintenance,
            ConsoleStatus::Reserved,
        ] {
            assert_eq!(status.as_str().parse::<ConsoleStatus>().unwrap(), status);
        }
        for status in [
            SessionStatus::Active,
            SessionStatus::Paused,
            SessionStatus::Ended,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        for method in [PaymentMethod::Cash, PaymentMethod::Card] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_enum_parse_rejects_unknown() {
        assert!("3v3".parse::<GamingMode>().is_err());
        assert!("broken".parse::<ConsoleStatus>().is_err());
        assert!("open".parse::<SessionStatus>().is_err());
        assert!("iou".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_gaming_mode_serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&GamingMode::TwoVsTwo).unwrap(),
            "\"2v2\""
        );
        let parsed: GamingMode = serde_json::from_str("\"1v1\"").unwrap();
        assert_eq!(parsed, GamingMode::OneVsOne);
    }

    fn test_console(rate_1v1: i64, rate_2v2: i64) -> Console {
        Console {
            id: "c1".to_string(),
            name: "Station 1".to_string(),
            console_type: "PS5".to_string(),
            status: ConsoleStatus::Available,
            rate_1v1_cents: rate_1v1,
            rate_2v2_cents: rate_2v2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_console_rate_for_mode() {
        let console = test_console(800, 1200);
        assert_eq!(console.rate_for(GamingMode::OneVsOne).cents(), 800);
        assert_eq!(console.rate_for(GamingMode::TwoVsTwo).cents(), 1200);
    }

    #[test]
    fn test_console_supports_requires_positive_rate() {
        let console = test_console(800, 0);
        assert!(console.supports(GamingMode::OneVsOne));
        assert!(!console.supports(GamingMode::TwoVsTwo));
    }

    #[test]
    fn test_product_can_sell() {
        let product = Product {
            id: "p1".to_string(),
            sku: "COLA-330".to_string(),
            name: "Cola 330ml".to_string(),
            price_cents: 250,
            current_stock: 3,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(product.can_sell(3));
        assert!(!product.can_sell(4));
    }
}
