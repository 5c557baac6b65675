//! Per-instrument lifecycle state and the bar transition function.
//!
//! Precedence per bar:
//! 1. Flat and cooling down: decrement cooldown, no entry evaluation.
//! 2. Flat: persistence-gated entry evaluation.
//! 3. In a position: extremum update, then trailing stop.
//! 4. In a position: hysteresis exit, honored only after the minimum hold.
//!
//! Entry and exit never happen on the same bar, so a reversal always passes
//! through at least one flat bar.

use crate::domain::{Bar, Position, Side};
use crate::emit::LifecycleEvent;

use super::config::LifecycleParams;

/// Mutable state for one instrument. Owned by exactly one fold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentState {
    pub position: Position,
    /// Direction currently accumulating persistence.
    pub pending_direction: Option<Side>,
    pub persistence_count: usize,
    /// Highest high since a long entry, lowest low since a short entry.
    pub entry_extremum: Option<f64>,
    /// Bars held before the current bar.
    pub holding_age: usize,
    pub cooldown_remaining: usize,
}

impl InstrumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trailing stop level for the open position at the given ATR.
    ///
    /// `None` when flat or when the ATR is not finite and non-negative.
    pub fn stop_level(&self, atr: f64, multiple: f64) -> Option<f64> {
        let side = self.position.side()?;
        let extremum = self.entry_extremum?;
        if !(atr.is_finite() && atr >= 0.0) {
            return None;
        }
        let distance = multiple * atr;
        Some(match side {
            Side::Long => extremum - distance,
            Side::Short => extremum + distance,
        })
    }

    /// Apply one bar. `gated_score` is zero for gated-out or incomplete bars.
    pub fn advance(
        &mut self,
        params: &LifecycleParams,
        bar: &Bar,
        gated_score: f64,
    ) -> Option<LifecycleEvent> {
        match self.position.side() {
            None => self.advance_flat(params, bar, gated_score),
            Some(side) => self.advance_open(params, bar, gated_score, side),
        }
    }

    fn advance_flat(
        &mut self,
        params: &LifecycleParams,
        bar: &Bar,
        gated_score: f64,
    ) -> Option<LifecycleEvent> {
        if self.cooldown_remaining > 0 {
            self.cooldown_remaining -= 1;
            return Some(LifecycleEvent::CoolingDown);
        }

        let direction = if gated_score.abs() >= params.entry_threshold {
            Side::from_score(gated_score)
        } else {
            None
        };

        let Some(side) = direction else {
            self.pending_direction = None;
            self.persistence_count = 0;
            return None;
        };

        if self.pending_direction == Some(side) {
            self.persistence_count += 1;
        } else {
            self.pending_direction = Some(side);
            self.persistence_count = 1;
        }

        if self.persistence_count >= params.required_persistence() {
            self.open(side, bar);
            Some(LifecycleEvent::Entered(side))
        } else {
            None
        }
    }

    fn advance_open(
        &mut self,
        params: &LifecycleParams,
        bar: &Bar,
        gated_score: f64,
        side: Side,
    ) -> Option<LifecycleEvent> {
        self.update_extremum(side, bar);

        if params.enable_trailing_stop && self.stop_breached(side, bar, params.chandelier_multiple)
        {
            self.close(params);
            return Some(LifecycleEvent::TrailingStop(side));
        }

        if self.holding_age >= params.min_holding_bars
            && score_exit(side, gated_score, params.exit_threshold)
        {
            self.close(params);
            return Some(LifecycleEvent::HysteresisExit(side));
        }

        self.holding_age += 1;
        None
    }

    fn open(&mut self, side: Side, bar: &Bar) {
        self.position = side.into();
        self.entry_extremum = Some(match side {
            Side::Long => bar.high,
            Side::Short => bar.low,
        });
        self.holding_age = 0;
        self.pending_direction = None;
        self.persistence_count = 0;
    }

    fn close(&mut self, params: &LifecycleParams) {
        self.position = Position::Flat;
        self.cooldown_remaining = params.cooldown_bars;
        self.entry_extremum = None;
        self.holding_age = 0;
        self.pending_direction = None;
        self.persistence_count = 0;
    }

    fn update_extremum(&mut self, side: Side, bar: &Bar) {
        let Some(extremum) = self.entry_extremum.as_mut() else {
            return;
        };
        match side {
            Side::Long if bar.high.is_finite() && bar.high > *extremum => *extremum = bar.high,
            Side::Short if bar.low.is_finite() && bar.low < *extremum => *extremum = bar.low,
            _ => {}
        }
    }

    fn stop_breached(&self, side: Side, bar: &Bar, multiple: f64) -> bool {
        let Some(stop) = self.stop_level(bar.atr, multiple) else {
            return false;
        };
        if !bar.close.is_finite() {
            return false;
        }
        match side {
            Side::Long => bar.close < stop,
            Side::Short => bar.close > stop,
        }
    }
}

/// Score-based exit: magnitude below the exit band, or the sign flipped.
fn score_exit(side: Side, gated_score: f64, exit_threshold: f64) -> bool {
    gated_score.abs() < exit_threshold || Side::from_score(gated_score) == Some(side.opposite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::LifecycleConfig;
    use crate::gate::RegimeGate;
    use chrono::{TimeZone, Utc};

    fn params(persistence: i64, min_hold: i64, cooldown: i64) -> LifecycleParams {
        LifecycleConfig {
            entry_threshold: 0.75,
            exit_threshold: 0.25,
            persistence_bars: persistence,
            min_holding_bars: min_hold,
            cooldown_bars: cooldown,
            chandelier_multiple: 1.0,
            enable_trailing_stop: true,
            ..LifecycleConfig::default()
        }
        .validate()
        .unwrap()
    }

    fn bar(high: f64, low: f64, close: f64, atr: f64) -> Bar {
        Bar {
            symbol: "ETH-USDT".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            score: 0.0,
            high,
            low,
            close,
            atr,
            regime_gate: Some(RegimeGate::Flag(true)),
            channel: None,
        }
    }

    #[test]
    fn opens_long_with_high_as_extremum() {
        let p = params(1, 0, 0);
        let mut s = InstrumentState::new();
        let ev = s.advance(&p, &bar(101.0, 99.0, 100.0, 1.0), 0.9);
        assert_eq!(ev, Some(LifecycleEvent::Entered(Side::Long)));
        assert_eq!(s.position, Position::Long);
        assert_eq!(s.entry_extremum, Some(101.0));
        assert_eq!(s.holding_age, 0);
        assert_eq!(s.pending_direction, None);
    }

    #[test]
    fn opens_short_with_low_as_extremum() {
        let p = params(1, 0, 0);
        let mut s = InstrumentState::new();
        s.advance(&p, &bar(101.0, 99.0, 100.0, 1.0), -0.9);
        assert_eq!(s.position, Position::Short);
        assert_eq!(s.entry_extremum, Some(99.0));
    }

    #[test]
    fn persistence_accumulates_then_opens() {
        let p = params(3, 0, 0);
        let mut s = InstrumentState::new();
        let b = bar(101.0, 99.0, 100.0, 1.0);
        assert_eq!(s.advance(&p, &b, 0.8), None);
        assert_eq!(s.persistence_count, 1);
        assert_eq!(s.advance(&p, &b, 0.8), None);
        assert_eq!(s.persistence_count, 2);
        assert_eq!(s.advance(&p, &b, 0.8), Some(LifecycleEvent::Entered(Side::Long)));
    }

    #[test]
    fn direction_change_restarts_persistence() {
        let p = params(2, 0, 0);
        let mut s = InstrumentState::new();
        let b = bar(101.0, 99.0, 100.0, 1.0);
        s.advance(&p, &b, 0.8);
        s.advance(&p, &b, -0.8);
        assert_eq!(s.pending_direction, Some(Side::Short));
        assert_eq!(s.persistence_count, 1);
        assert!(s.position.is_flat());
    }

    #[test]
    fn weak_score_resets_persistence() {
        let p = params(2, 0, 0);
        let mut s = InstrumentState::new();
        let b = bar(101.0, 99.0, 100.0, 1.0);
        s.advance(&p, &b, 0.8);
        s.advance(&p, &b, 0.5);
        assert_eq!(s.pending_direction, None);
        assert_eq!(s.persistence_count, 0);
    }

    #[test]
    fn extremum_only_moves_in_favor() {
        let p = params(1, 10, 0);
        let mut s = InstrumentState::new();
        s.advance(&p, &bar(100.0, 98.0, 99.0, 5.0), 0.9);
        s.advance(&p, &bar(104.0, 101.0, 103.0, 5.0), 0.9);
        assert_eq!(s.entry_extremum, Some(104.0));
        s.advance(&p, &bar(103.9, 103.5, 103.8, 5.0), 0.9);
        assert_eq!(s.entry_extremum, Some(104.0));
        s.advance(&p, &bar(f64::NAN, 103.5, 103.8, 5.0), 0.9);
        assert_eq!(s.entry_extremum, Some(104.0));
    }

    #[test]
    fn trailing_stop_overrides_min_hold() {
        let p = params(1, 5, 2);
        let mut s = InstrumentState::new();
        s.advance(&p, &bar(100.0, 98.0, 99.0, 2.0), 0.9);
        // Stop = 100 - 1.0 * 2 = 98; close 97 breaches.
        let ev = s.advance(&p, &bar(99.0, 96.0, 97.0, 2.0), 0.9);
        assert_eq!(ev, Some(LifecycleEvent::TrailingStop(Side::Long)));
        assert!(s.position.is_flat());
        assert_eq!(s.cooldown_remaining, 2);
        assert_eq!(s.entry_extremum, None);
    }

    #[test]
    fn short_trailing_stop() {
        let p = params(1, 0, 0);
        let mut s = InstrumentState::new();
        s.advance(&p, &bar(52.0, 50.0, 51.0, 1.0), -0.9);
        // Stop = 50 + 1 = 51; close 51.5 breaches.
        let ev = s.advance(&p, &bar(52.0, 50.5, 51.5, 1.0), -0.9);
        assert_eq!(ev, Some(LifecycleEvent::TrailingStop(Side::Short)));
    }

    #[test]
    fn nan_atr_never_fires_stop() {
        let p = params(1, 0, 0);
        let mut s = InstrumentState::new();
        s.advance(&p, &bar(100.0, 98.0, 99.0, 2.0), 0.9);
        let ev = s.advance(&p, &bar(99.0, 50.0, 50.0, f64::NAN), 0.9);
        assert_eq!(ev, None);
        assert_eq!(s.position, Position::Long);
    }

    #[test]
    fn negative_atr_never_fires_stop() {
        let p = params(1, 0, 0);
        let mut s = InstrumentState::new();
        s.advance(&p, &bar(100.0, 98.0, 99.0, 2.0), 0.9);
        assert_eq!(s.stop_level(-5.0, 1.0), None);
        let ev = s.advance(&p, &bar(100.5, 99.0, 99.5, -5.0), 0.9);
        assert_eq!(ev, None);
        assert_eq!(s.position, Position::Long);
    }

    #[test]
    fn opposing_sign_exits_even_above_exit_band() {
        let p = params(1, 0, 0);
        let mut s = InstrumentState::new();
        let b = bar(100.0, 98.0, 99.0, 5.0);
        s.advance(&p, &b, 0.9);
        let ev = s.advance(&p, &b, -0.5);
        assert_eq!(ev, Some(LifecycleEvent::HysteresisExit(Side::Long)));
        // Exit bar is flat; the opposite entry is not evaluated on the same bar.
        assert!(s.position.is_flat());
        assert_eq!(s.pending_direction, None);
    }

    #[test]
    fn cooldown_blocks_entries_and_decrements() {
        let p = params(1, 0, 2);
        let mut s = InstrumentState::new();
        let b = bar(100.0, 98.0, 99.0, 5.0);
        s.advance(&p, &b, 0.9);
        s.advance(&p, &b, 0.0);
        assert_eq!(s.cooldown_remaining, 2);
        assert_eq!(s.advance(&p, &b, 0.9), Some(LifecycleEvent::CoolingDown));
        assert_eq!(s.cooldown_remaining, 1);
        assert_eq!(s.persistence_count, 0);
        assert_eq!(s.advance(&p, &b, 0.9), Some(LifecycleEvent::CoolingDown));
        assert_eq!(s.cooldown_remaining, 0);
        assert_eq!(s.advance(&p, &b, 0.9), Some(LifecycleEvent::Entered(Side::Long)));
    }

    #[test]
    fn stop_level_requires_position() {
        let s = InstrumentState::new();
        assert_eq!(s.stop_level(2.0, 1.0), None);
    }
}
