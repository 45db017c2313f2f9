//! # Session State Machine
//!
//! The pure lifecycle of a console rental session.
//!
//! ## States and Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Lifecycle                                   │
//! │                                                                         │
//! │   start(console, mode)                                                 │
//! │         │                                                               │
//! │         ▼                pause                                          │
//! │   ┌──────────┐  ───────────────────►  ┌──────────┐                     │
//! │   │  ACTIVE  │                        │  PAUSED  │                     │
//! │   └──────────┘  ◄───────────────────  └──────────┘                     │
//! │         │                resume              │                          │
//! │         │                                    │                          │
//! │         │   end              end             │                          │
//! │         └─────────►  ┌──────────┐  ◄─────────┘                         │
//! │                      │  ENDED   │   (terminal)                         │
//! │                      └──────────┘                                      │
//! │                                                                         │
//! │  Invariants:                                                           │
//! │  • paused_at is Some iff status = Paused                               │
//! │  • total_paused_ms only ever increases                                 │
//! │  • final_cost is None until Ended, and never recomputed after          │
//! │  • mode changes never retroactively reprice elapsed time               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition takes `now: DateTime<Utc>` explicitly. The crate never
//! reads the wall clock; the engine layer supplies real instants and the
//! tests supply exact ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::{self, CostPreview};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{GamingMode, SessionStatus};

// =============================================================================
// Session
// =============================================================================

/// A console rental session.
///
/// Owned by the session engine for its active lifetime: created on start,
/// mutated on pause/resume/end/mode-change, immutable after end except for
/// the one-time receipt linkage performed by checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The console this session occupies.
    pub console_id: String,

    /// Lifecycle status. `Ended` is terminal.
    pub status: SessionStatus,

    /// Billing tier. Mutable while not ended; the value at end time prices
    /// the whole session.
    pub gaming_mode: GamingMode,

    /// When the session started.
    pub start_time: DateTime<Utc>,

    /// Start of the open pause interval. Some iff status = Paused.
    pub paused_at: Option<DateTime<Utc>>,

    /// Accumulated closed pause intervals, in milliseconds. Only increases.
    pub total_paused_ms: i64,

    /// When the session ended. Set once.
    pub end_time: Option<DateTime<Utc>>,

    /// Cost calculated at end time, in cents. Never recomputed afterward;
    /// a checkout override is recorded beside it, not over it.
    pub final_cost_cents: Option<i64>,

    /// Record timestamps.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new active session starting at `now`.
    ///
    /// Availability and rate checks against the console are the engine's
    /// job; this constructor only builds the record.
    pub fn start(
        id: impl Into<String>,
        console_id: impl Into<String>,
        gaming_mode: GamingMode,
        now: DateTime<Utc>,
    ) -> Self {
        Session {
            id: id.into(),
            console_id: console_id.into(),
            status: SessionStatus::Active,
            gaming_mode,
            start_time: now,
            paused_at: None,
            total_paused_ms: 0,
            end_time: None,
            final_cost_cents: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pauses the clock. Active → Paused.
    ///
    /// ## Errors
    /// `InvalidTransition` if the session is not currently active (covers
    /// both paused-again and ended cases).
    pub fn pause(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != SessionStatus::Active {
            return Err(CoreError::InvalidTransition {
                session_id: self.id.clone(),
                current: self.status,
                operation: "pause",
            });
        }

        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Restarts the clock. Paused → Active.
    ///
    /// Closes the open pause interval into `total_paused_ms`. The interval
    /// is clamped to ≥ 0 so a skewed clock cannot shrink the accumulator.
    ///
    /// ## Errors
    /// `InvalidTransition` if the session is not currently paused.
    pub fn resume(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        let Some(pause_start) = self.paused_at else {
            return Err(CoreError::InvalidTransition {
                session_id: self.id.clone(),
                current: self.status,
                operation: "resume",
            });
        };
        if self.status != SessionStatus::Paused {
            return Err(CoreError::InvalidTransition {
                session_id: self.id.clone(),
                current: self.status,
                operation: "resume",
            });
        }

        self.total_paused_ms += (now - pause_start).num_milliseconds().max(0);
        self.paused_at = None;
        self.status = SessionStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    /// Switches the billing tier while the session is open.
    ///
    /// Elapsed time is NOT re-segmented: the mode in effect at end time
    /// prices the entire session. Rate support on the console is validated
    /// by the engine before this is applied.
    ///
    /// ## Errors
    /// `InvalidTransition` if the session has ended.
    pub fn change_mode(&mut self, mode: GamingMode, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status == SessionStatus::Ended {
            return Err(CoreError::InvalidTransition {
                session_id: self.id.clone(),
                current: self.status,
                operation: "change gaming mode",
            });
        }

        self.gaming_mode = mode;
        self.updated_at = now;
        Ok(())
    }

    /// Ends the session and freezes its cost. Any non-ended state → Ended.
    ///
    /// ## What This Does
    /// 1. Nets out all paused time, including an open pause interval if the
    ///    session is ended while paused
    /// 2. Clamps the billable duration to ≥ 0
    /// 3. Prices the whole duration at `rate_used` (the rate for the mode
    ///    in effect right now), rounding once at the cents boundary
    /// 4. Freezes end_time and final_cost
    ///
    /// ## Errors
    /// `AlreadyEnded` if the session has already ended.
    pub fn end(&mut self, now: DateTime<Utc>, rate_used: Money) -> CoreResult<Money> {
        if self.status == SessionStatus::Ended {
            return Err(CoreError::AlreadyEnded(self.id.clone()));
        }

        let active_ms = self.active_duration_ms(now);
        let cost = billing::session_cost(rate_used, active_ms);

        // Fold the open pause interval into the accumulator so the stored
        // row stays self-consistent after the paused_at marker clears.
        if let Some(pause_start) = self.paused_at.take() {
            self.total_paused_ms += (now - pause_start).num_milliseconds().max(0);
        }

        self.status = SessionStatus::Ended;
        self.end_time = Some(now);
        self.final_cost_cents = Some(cost.cents());
        self.updated_at = now;
        Ok(cost)
    }

    /// Billable milliseconds accrued as of `now` (or as of end, if ended).
    pub fn active_duration_ms(&self, now: DateTime<Utc>) -> i64 {
        let measure_at = self.end_time.unwrap_or(now);
        billing::active_duration_ms(
            self.start_time,
            self.total_paused_ms,
            self.paused_at,
            measure_at,
        )
    }

    /// Non-mutating as-of-now cost projection under both of the console's
    /// rates, for UI display.
    pub fn preview(
        &self,
        now: DateTime<Utc>,
        rate_1v1: Money,
        rate_2v2: Money,
    ) -> CostPreview {
        CostPreview::compute(self.active_duration_ms(now), rate_1v1, rate_2v2)
    }

    /// Whether the session has reached its terminal state.
    #[inline]
    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    /// The frozen cost, if the session has ended.
    #[inline]
    pub fn final_cost(&self) -> Option<Money> {
        self.final_cost_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{MS_PER_HOUR, MS_PER_MINUTE};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 0, 0).unwrap()
    }

    fn rate(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn test_start_is_active_with_zeroed_accounting() {
        let s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.total_paused_ms, 0);
        assert!(s.paused_at.is_none());
        assert!(s.final_cost_cents.is_none());
        assert!(s.end_time.is_none());
    }

    #[test]
    fn test_end_never_paused_bills_wall_clock() {
        // Started at T0, never paused, ended at T0+1h at $8.00/hour
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        let cost = s.end(t0() + Duration::hours(1), rate(800)).unwrap();

        assert_eq!(cost.cents(), 800);
        assert_eq!(s.status, SessionStatus::Ended);
        assert_eq!(s.final_cost_cents, Some(800));
        assert_eq!(s.end_time, Some(t0() + Duration::hours(1)));
    }

    #[test]
    fn test_pause_resume_nets_out_paused_interval() {
        // The reference scenario: rate 8.00, start T0, pause T0+30m,
        // resume T0+45m, end T0+75m → 60 billable minutes → $8.00
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());

        s.pause(t0() + Duration::minutes(30)).unwrap();
        s.resume(t0() + Duration::minutes(45)).unwrap();
        assert_eq!(s.total_paused_ms, 15 * MS_PER_MINUTE);

        let cost = s.end(t0() + Duration::minutes(75), rate(800)).unwrap();
        assert_eq!(cost.cents(), 800);
        assert_eq!(s.active_duration_ms(t0() + Duration::hours(9)), MS_PER_HOUR);
    }

    #[test]
    fn test_end_while_paused_excludes_open_interval() {
        // Paused at minute 30 and never resumed; ended at minute 90.
        // Only the first 30 minutes are billable.
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.pause(t0() + Duration::minutes(30)).unwrap();

        let cost = s.end(t0() + Duration::minutes(90), rate(800)).unwrap();
        assert_eq!(cost.cents(), 400);
        // The open interval was folded into the accumulator at end
        assert_eq!(s.total_paused_ms, 60 * MS_PER_MINUTE);
        assert!(s.paused_at.is_none());
    }

    #[test]
    fn test_total_paused_ms_is_monotonic() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        let mut last = s.total_paused_ms;

        for i in 0..5 {
            let base = t0() + Duration::minutes(10 * (i + 1));
            s.pause(base).unwrap();
            s.resume(base + Duration::minutes(3)).unwrap();
            assert!(s.total_paused_ms >= last);
            last = s.total_paused_ms;
        }
        assert_eq!(last, 15 * MS_PER_MINUTE);
    }

    #[test]
    fn test_cost_is_never_negative() {
        // A row with paused time exceeding wall clock still bills zero
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.total_paused_ms = 2 * MS_PER_HOUR;

        let cost = s.end(t0() + Duration::minutes(10), rate(800)).unwrap();
        assert_eq!(cost.cents(), 0);
    }

    #[test]
    fn test_pause_requires_active() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.pause(t0() + Duration::minutes(1)).unwrap();

        let err = s.pause(t0() + Duration::minutes(2)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        let err = s.resume(t0() + Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_lifecycle_calls_after_end_fail() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.end(t0() + Duration::minutes(5), rate(800)).unwrap();

        assert!(matches!(
            s.end(t0() + Duration::minutes(6), rate(800)).unwrap_err(),
            CoreError::AlreadyEnded(_)
        ));
        assert!(matches!(
            s.pause(t0() + Duration::minutes(6)).unwrap_err(),
            CoreError::InvalidTransition { .. }
        ));
        assert!(matches!(
            s.change_mode(GamingMode::TwoVsTwo, t0() + Duration::minutes(6))
                .unwrap_err(),
            CoreError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn test_mode_change_prices_whole_session_at_end_rate() {
        // Switch to 2v2 at minute 59 of a 60-minute session: the entire
        // hour bills at the 2v2 rate. Known, intentional simplification.
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.change_mode(GamingMode::TwoVsTwo, t0() + Duration::minutes(59))
            .unwrap();

        let rate_used = match s.gaming_mode {
            GamingMode::OneVsOne => rate(800),
            GamingMode::TwoVsTwo => rate(1200),
        };
        let cost = s.end(t0() + Duration::minutes(60), rate_used).unwrap();
        assert_eq!(cost.cents(), 1200);
    }

    #[test]
    fn test_mode_change_allowed_while_paused() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.pause(t0() + Duration::minutes(10)).unwrap();
        s.change_mode(GamingMode::TwoVsTwo, t0() + Duration::minutes(11))
            .unwrap();
        assert_eq!(s.gaming_mode, GamingMode::TwoVsTwo);
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.pause(t0() + Duration::minutes(30)).unwrap();
        let before = s.clone();

        let preview = s.preview(t0() + Duration::minutes(45), rate(800), rate(1200));

        // 30 billable minutes: half of each hourly rate
        assert_eq!(preview.cost_1v1.cents(), 400);
        assert_eq!(preview.cost_2v2.cents(), 600);
        assert_eq!(s.status, before.status);
        assert_eq!(s.total_paused_ms, before.total_paused_ms);
        assert_eq!(s.paused_at, before.paused_at);
        assert!(s.final_cost_cents.is_none());
    }

    #[test]
    fn test_active_duration_frozen_after_end() {
        let mut s = Session::start("s1", "c1", GamingMode::OneVsOne, t0());
        s.end(t0() + Duration::minutes(30), rate(800)).unwrap();

        // Measuring hours later still reports the frozen duration
        assert_eq!(
            s.active_duration_ms(t0() + Duration::hours(5)),
            30 * MS_PER_MINUTE
        );
    }
}
