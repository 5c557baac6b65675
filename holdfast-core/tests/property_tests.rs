//! Property tests for lifecycle invariants.
//!
//! Uses proptest to verify:
//! 1. Alignment: one record per bar, same symbol and timestamp
//! 2. Flat transition: labels never jump between +1 and -1
//! 3. Persistence: every entry is preceded by k qualifying same-sign bars
//! 4. Minimum hold: hysteresis exits never come before the hold has elapsed
//! 5. Cooldown: no entry within `cooldown_bars` bars of an exit
//! 6. Extremum monotonicity while a position is open
//! 7. Regime gate: closed gates produce all-flat output
//! 8. Parallel and sequential runs agree

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use holdfast_core::domain::Position;
use holdfast_core::{Bar, Engine, LifecycleConfig, LifecycleEvent, RegimeGate};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_config() -> impl Strategy<Value = LifecycleConfig> {
    (
        0.3..1.0_f64,
        0.0..1.0_f64,
        0..5_i64,
        0..6_i64,
        0..5_i64,
        0.5..4.0_f64,
        any::<bool>(),
    )
        .prop_map(
            |(entry, exit_frac, persistence, min_hold, cooldown, multiple, trailing)| {
                LifecycleConfig {
                    entry_threshold: entry,
                    exit_threshold: entry * exit_frac * 0.99,
                    persistence_bars: persistence,
                    min_holding_bars: min_hold,
                    cooldown_bars: cooldown,
                    chandelier_multiple: multiple,
                    enable_trailing_stop: trailing,
                    ..LifecycleConfig::default()
                }
            },
        )
}

/// (score, return, range, atr, gate) per bar.
fn arb_steps(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64, f64, bool)>> {
    prop::collection::vec(
        (
            -1.0..1.0_f64,
            -0.03..0.03_f64,
            0.001..0.02_f64,
            0.2..3.0_f64,
            prop::bool::weighted(0.85),
        ),
        0..max_len,
    )
}

fn build_bars(symbol: &str, steps: &[(f64, f64, f64, f64, bool)]) -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = 100.0_f64;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(score, ret, range, atr, gate))| {
            let open = price;
            price *= 1.0 + ret;
            Bar {
                symbol: symbol.to_string(),
                timestamp: t0 + Duration::hours(i as i64),
                score,
                high: open.max(price) * (1.0 + range),
                low: open.min(price) * (1.0 - range),
                close: price,
                atr,
                regime_gate: Some(RegimeGate::Flag(gate)),
                channel: None,
            }
        })
        .collect()
}

fn entries(events: &[Option<LifecycleEvent>]) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Some(LifecycleEvent::Entered(_))))
        .map(|(i, _)| i)
        .collect()
}

// ── 1-2. Alignment and flat transitions ──────────────────────────────

proptest! {
    #[test]
    fn output_aligned_and_never_reverses_directly(
        config in arb_config(),
        steps in arb_steps(200),
    ) {
        let bars = build_bars("BTC-USDT", &steps);
        let out = Engine::new(&config).unwrap().run(&bars).unwrap();

        prop_assert_eq!(out.len(), bars.len());
        for (bar, rec) in bars.iter().zip(out.records()) {
            prop_assert_eq!(&bar.symbol, &rec.symbol);
            prop_assert_eq!(bar.timestamp, rec.timestamp);
        }

        let labels = out.labels();
        for w in labels.windows(2) {
            prop_assert!(w[0] * w[1] != -1, "direct reversal in {:?}", labels);
        }
    }
}

// ── 3. Persistence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn entries_follow_k_qualifying_bars(
        config in arb_config(),
        steps in arb_steps(200),
    ) {
        let bars = build_bars("ETH-USDT", &steps);
        let out = Engine::new(&config).unwrap().run(&bars).unwrap();
        let events: Vec<_> = out.records().iter().map(|r| r.event).collect();
        let k = config.persistence_bars.max(1) as usize;

        for t in entries(&events) {
            prop_assert!(t + 1 >= k);
            let sign = out.records()[t].gated_score.signum();
            for rec in &out.records()[t + 1 - k..=t] {
                prop_assert!(rec.gated_score.abs() >= config.entry_threshold);
                prop_assert_eq!(rec.gated_score.signum(), sign);
            }
        }
    }
}

// ── 4-5. Minimum hold and cooldown ───────────────────────────────────

proptest! {
    #[test]
    fn min_hold_and_cooldown_respected(
        config in arb_config(),
        steps in arb_steps(200),
    ) {
        let bars = build_bars("SOL-USDT", &steps);
        let out = Engine::new(&config).unwrap().run(&bars).unwrap();
        let events: Vec<_> = out.records().iter().map(|r| r.event).collect();
        let min_hold = config.min_holding_bars as usize;
        let cooldown = config.cooldown_bars as usize;

        let mut last_entry: Option<usize> = None;
        let mut last_exit: Option<usize> = None;
        for (i, event) in events.iter().enumerate() {
            match event {
                Some(LifecycleEvent::Entered(_)) => {
                    if let Some(exit) = last_exit {
                        prop_assert!(i > exit + cooldown, "entry {} too soon after exit {}", i, exit);
                    }
                    last_entry = Some(i);
                }
                Some(LifecycleEvent::HysteresisExit(_)) => {
                    let entry = last_entry.unwrap();
                    prop_assert!(i > entry + min_hold, "exit {} before hold from {}", i, entry);
                    last_exit = Some(i);
                }
                Some(LifecycleEvent::TrailingStop(_)) => {
                    let entry = last_entry.unwrap();
                    prop_assert!(i > entry);
                    last_exit = Some(i);
                }
                _ => {}
            }
        }
    }
}

// ── 6. Extremum monotonicity ─────────────────────────────────────────

proptest! {
    #[test]
    fn extremum_moves_only_in_favor(
        config in arb_config(),
        steps in arb_steps(150),
    ) {
        let bars = build_bars("ADA-USDT", &steps);
        let engine = Engine::new(&config).unwrap();
        let mut tracker = engine.tracker();
        let mut prev: Option<(Position, f64)> = None;

        for bar in &bars {
            let rec = tracker.step(bar).unwrap();
            let state = tracker.state();
            match (rec.position, state.entry_extremum) {
                (Position::Flat, ext) => {
                    prop_assert!(ext.is_none());
                    prev = None;
                }
                (pos, Some(ext)) => {
                    if let (Some((prev_pos, prev_ext)), false) =
                        (prev, matches!(rec.event, Some(LifecycleEvent::Entered(_))))
                    {
                        prop_assert_eq!(prev_pos, pos);
                        match pos {
                            Position::Long => prop_assert!(ext >= prev_ext),
                            Position::Short => prop_assert!(ext <= prev_ext),
                            Position::Flat => unreachable!(),
                        }
                    }
                    prev = Some((pos, ext));
                }
                (_, None) => prop_assert!(false, "open position without extremum"),
            }
        }
    }
}

// ── 7. Regime gate ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn closed_gate_is_all_flat(
        config in arb_config(),
        steps in arb_steps(100),
    ) {
        let mut bars = build_bars("DOT-USDT", &steps);
        for b in &mut bars {
            b.regime_gate = Some(RegimeGate::Flag(false));
        }
        let out = Engine::new(&config).unwrap().run(&bars).unwrap();
        prop_assert!(out.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn sub_threshold_scores_stay_flat(
        config in arb_config(),
        steps in arb_steps(100),
    ) {
        let mut bars = build_bars("XRP-USDT", &steps);
        for b in &mut bars {
            b.score *= config.entry_threshold * 0.99;
        }
        let out = Engine::new(&config).unwrap().run(&bars).unwrap();
        prop_assert!(out.labels().iter().all(|&l| l == 0));
    }
}

// ── 8. Parallel fold ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn parallel_equals_sequential(
        config in arb_config(),
        a in arb_steps(80),
        b in arb_steps(80),
        c in arb_steps(80),
    ) {
        let mut bars = build_bars("A", &a);
        bars.extend(build_bars("B", &b));
        bars.extend(build_bars("C", &c));
        let engine = Engine::new(&config).unwrap();
        prop_assert_eq!(engine.run(&bars).unwrap(), engine.run_sequential(&bars).unwrap());
    }

    #[test]
    fn exit_threshold_at_or_above_entry_fails(
        entry in 0.01..1.0_f64,
        excess in 0.0..1.0_f64,
    ) {
        let config = LifecycleConfig {
            entry_threshold: entry,
            exit_threshold: entry + excess,
            ..LifecycleConfig::default()
        };
        prop_assert!(Engine::new(&config).is_err());
    }
}
