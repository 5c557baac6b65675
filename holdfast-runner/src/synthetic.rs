//! Synthetic feature generation for testing and development.
//!
//! Produces deterministic hourly feature rows from a random walk. Each
//! symbol's stream is seeded from BLAKE3(seed, symbol), so output does not
//! depend on the order symbols are listed in.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use holdfast_core::gate::regime_gate;
use holdfast_core::{FeatureRow, RegimeGate, RegimeThresholds};

/// Channel lookback and momentum window, in bars.
const CHANNEL_BARS: usize = 20;
/// ATR smoothing length (Wilder).
const ATR_BARS: f64 = 14.0;

fn rng_for(symbol: &str, seed: u64) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

/// Generate `bars` hourly rows per symbol, grouped by symbol.
///
/// On the first bar there is no prior close, so `atr` is the bar's own range.
pub fn generate_synthetic_rows(symbols: &[String], bars: usize, seed: u64) -> Vec<FeatureRow> {
    let thresholds = RegimeThresholds::default();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
    let Some(t0) = t0 else {
        return Vec::new();
    };

    let mut rows = Vec::with_capacity(symbols.len() * bars);
    for symbol in symbols {
        let mut rng = rng_for(symbol, seed);
        let mut close = 100.0_f64;
        let mut atr: Option<f64> = None;
        let mut closes: Vec<f64> = Vec::with_capacity(bars);
        let mut highs: Vec<f64> = Vec::with_capacity(bars);
        let mut lows: Vec<f64> = Vec::with_capacity(bars);
        // Slowly drifting trend strength drives both the walk and the regime columns.
        let mut trend = 0.0_f64;

        for i in 0..bars {
            trend = (trend * 0.98 + rng.gen_range(-0.1..0.1)).clamp(-1.0, 1.0);
            let open = close;
            close = open * (1.0 + trend * 0.004 + rng.gen_range(-0.01..0.01));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));

            let true_range = (high - low)
                .max((high - open).abs())
                .max((low - open).abs());
            let next_atr = match atr {
                None => true_range,
                Some(prev) => prev + (true_range - prev) / ATR_BARS,
            };
            atr = Some(next_atr);

            closes.push(close);
            highs.push(high);
            lows.push(low);

            let start = i.saturating_sub(CHANNEL_BARS - 1);
            let channel_high = highs[start..].iter().copied().fold(f64::MIN, f64::max);
            let channel_low = lows[start..].iter().copied().fold(f64::MAX, f64::min);
            let momentum = (close - closes[start]) / (next_atr * (CHANNEL_BARS as f64).sqrt());

            let strength = trend.abs();
            let chop = (65.0 - strength * 40.0 + rng.gen_range(-5.0..5.0)).clamp(0.0, 100.0);
            let adx = (15.0 + strength * 35.0 + rng.gen_range(-3.0..3.0)).clamp(0.0, 100.0);

            let mut row = FeatureRow::empty(symbol.clone(), t0 + Duration::hours(i as i64));
            row.score = Some(momentum.tanh());
            row.high = Some(high);
            row.low = Some(low);
            row.close = Some(close);
            row.atr = Some(next_atr);
            row.channel_high = Some(channel_high);
            row.channel_low = Some(channel_low);
            row.channel_mid = Some((channel_high + channel_low) / 2.0);
            row.chop = Some(chop);
            row.adx = Some(adx);
            row.regime_gate = Some(regime_gate(chop, adx, &thresholds));
            rows.push(row);
        }
    }
    rows
}

/// Write feature rows as CSV in the layout the feature loader reads.
pub fn write_feature_csv<W: Write>(rows: &[FeatureRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "symbol",
        "timestamp",
        "score",
        "high",
        "low",
        "close",
        "atr",
        "regime_gate",
        "channel_high",
        "channel_low",
        "channel_mid",
        "chop",
        "adx",
    ])?;

    let num = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for r in rows {
        let gate = match r.regime_gate {
            Some(RegimeGate::Flag(b)) => b.to_string(),
            Some(RegimeGate::Level(w)) => w.to_string(),
            None => String::new(),
        };
        wtr.write_record([
            r.symbol.clone(),
            r.timestamp.to_rfc3339(),
            num(r.score),
            num(r.high),
            num(r.low),
            num(r.close),
            num(r.atr),
            gate,
            num(r.channel_high),
            num(r.channel_low),
            num(r.channel_mid),
            num(r.chop),
            num(r.adx),
        ])?;
    }
    wtr.flush().context("failed to flush CSV writer")?;
    Ok(())
}

/// Generate synthetic rows and write them to `path`.
pub fn save_synthetic_csv(path: &Path, symbols: &[String], bars: usize, seed: u64) -> Result<usize> {
    let rows = generate_synthetic_rows(symbols, bars, seed);
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_feature_csv(&rows, file)?;
    Ok(rows.len())
}
