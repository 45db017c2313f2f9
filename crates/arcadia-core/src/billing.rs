//! # Billing Module
//!
//! Duration netting and hourly cost math for rental sessions.
//!
//! ## The Time-Accounting Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Active Duration Netting                             │
//! │                                                                         │
//! │  start          pause      resume          pause          end          │
//! │    │──────────────│           │───────────────│            │           │
//! │    │   billable   │  excluded │   billable    │  excluded  │           │
//! │                                                                         │
//! │  active_ms = (end - start) - total_paused_ms - open_pause_interval     │
//! │                                                                         │
//! │  The open pause interval matters: a session ended WHILE paused must    │
//! │  not be billed for the pause that was still running.                   │
//! │                                                                         │
//! │  cost = round_to_cents(active_ms × hourly_rate / 3,600,000)            │
//! │                                                                         │
//! │  Rounding happens exactly once, at the cents boundary. Intermediate    │
//! │  duration math stays in integer milliseconds.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Milliseconds per billable hour.
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Milliseconds per minute, for receipt display rounding.
pub const MS_PER_MINUTE: i64 = 60_000;

// =============================================================================
// Duration Netting
// =============================================================================

/// Computes the billable duration of a session as of `now`.
///
/// ## Arguments
/// * `start_time` - When the session started
/// * `total_paused_ms` - Accumulated closed pause intervals
/// * `paused_at` - Start of the open pause interval, if currently paused
/// * `now` - The instant to measure against (end time, or "as of now")
///
/// ## Guarantees
/// - The open pause interval is excluded, so ending a paused session does
///   not bill the pause that was still running
/// - The result is clamped to ≥ 0 (a clock skew or inconsistent row can
///   never produce a negative bill)
pub fn active_duration_ms(
    start_time: DateTime<Utc>,
    total_paused_ms: i64,
    paused_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let wall_clock_ms = (now - start_time).num_milliseconds();

    let mut paused_ms = total_paused_ms;
    if let Some(pause_start) = paused_at {
        paused_ms += (now - pause_start).num_milliseconds().max(0);
    }

    (wall_clock_ms - paused_ms).max(0)
}

// =============================================================================
// Cost Math
// =============================================================================

/// Computes the cost of `active_ms` milliseconds at an hourly rate.
///
/// ## Implementation
/// Integer math over i128 with half-up rounding at the cents boundary:
/// `(active_ms × rate_cents + 1,800,000) / 3,600,000`. No floats anywhere.
///
/// ## Example
/// ```rust
/// use arcadia_core::billing::{session_cost, MS_PER_HOUR};
/// use arcadia_core::money::Money;
///
/// // 90 minutes at $8.00/hour = $12.00
/// let cost = session_cost(Money::from_cents(800), MS_PER_HOUR * 3 / 2);
/// assert_eq!(cost.cents(), 1200);
/// ```
pub fn session_cost(hourly_rate: Money, active_ms: i64) -> Money {
    let cents =
        (active_ms as i128 * hourly_rate.cents() as i128 + (MS_PER_HOUR as i128 / 2))
            / MS_PER_HOUR as i128;
    Money::from_cents(cents as i64)
}

/// Rounds a millisecond duration to whole minutes for receipt display.
///
/// The stored millisecond figure stays exact; this is display-only.
pub fn billed_minutes(active_ms: i64) -> i64 {
    (active_ms + MS_PER_MINUTE / 2) / MS_PER_MINUTE
}

/// The default secondary (2v2) hourly rate: 1.5× the base rate.
///
/// Applied at exactly one point, console creation, and persisted there.
/// Reads never recompute this fallback.
pub fn default_rate_2v2(rate_1v1: Money) -> Money {
    Money::from_cents(rate_1v1.cents() * 3 / 2)
}

// =============================================================================
// Cost Preview
// =============================================================================

/// As-of-now cost projection for an open session, under both rates.
///
/// Produced by the non-mutating preview operation for UI display. Nothing
/// about the session or the console changes when one is computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostPreview {
    /// Billable milliseconds accrued so far.
    pub active_ms: i64,
    /// Billable duration rounded to whole minutes.
    pub active_minutes: i64,
    /// What the session would cost right now in 1v1 mode.
    pub cost_1v1: Money,
    /// What the session would cost right now in 2v2 mode.
    pub cost_2v2: Money,
}

impl CostPreview {
    /// Builds a preview from an accrued duration and the console's rates.
    pub fn compute(active_ms: i64, rate_1v1: Money, rate_2v2: Money) -> Self {
        CostPreview {
            active_ms,
            active_minutes: billed_minutes(active_ms),
            cost_1v1: session_cost(rate_1v1, active_ms),
            cost_2v2: session_cost(rate_2v2, active_ms),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
