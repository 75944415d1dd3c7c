//! Bar-by-bar replay loop.
//!
//! Each pushed bar goes through, in order:
//! 1. Validation: finite positive prices, strictly increasing timestamp
//! 2. Session routing: out-of-window bars close the session; the first
//!    in-window bar of a new calendar day starts one
//! 3. Position management: mark, ratchet the stop, exit on `close <= stop`
//! 4. Entry: if flat and under the daily cap, evaluate the signal and open
//!
//! A position still open when its session ends is settled at the close of
//! the session's last in-window bar.

use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::components::signal::{MomentumSignal, SignalGenerator};
use crate::components::trailing::TieredTrailingStop;
use crate::config::StrategyConfig;
use crate::domain::{Bar, ExitReason, OpenPosition, TradeLedger, TradeRecord};

use super::error::EngineError;
use super::session::{SessionPhase, SessionState};

/// Counters collected during a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub bars: usize,
    pub in_session_bars: usize,
    pub sessions: usize,
    pub entries: usize,
    /// Sessions that hit the daily stop-loss cap.
    pub lockouts: usize,
}

/// Ledger plus counters from a completed replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub ledger: TradeLedger,
    pub stats: RunStats,
}

/// Streaming replay engine.
///
/// Owns every piece of mutable state for one run. Feed bars in timestamp
/// order with `push`, then call `finish` to settle any open position and take
/// the ledger.
pub struct Simulator {
    config: StrategyConfig,
    signal: Box<dyn SignalGenerator>,
    window: VecDeque<Bar>,
    session: SessionState,
    ledger: TradeLedger,
    stats: RunStats,
    last_timestamp: Option<DateTime<FixedOffset>>,
    /// Timestamp and underlying close of the latest in-window bar.
    last_in_session: Option<(DateTime<FixedOffset>, f64)>,
}

impl Simulator {
    pub fn new(config: StrategyConfig) -> Self {
        let signal = Box::new(MomentumSignal::from_config(&config));
        Self::with_signal(config, signal)
    }

    /// Replay with a custom entry signal instead of the momentum rule.
    pub fn with_signal(config: StrategyConfig, signal: Box<dyn SignalGenerator>) -> Self {
        let lookback = signal.lookback().max(1);
        Self {
            config,
            signal,
            window: VecDeque::with_capacity(lookback),
            session: SessionState::new(),
            ledger: TradeLedger::new(),
            stats: RunStats::default(),
            last_timestamp: None,
            last_in_session: None,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Process one bar. Returns the trade closed on this bar, if any.
    ///
    /// On error the bar is not applied and the simulator should be discarded.
    pub fn push(&mut self, bar: &Bar) -> Result<Option<TradeRecord>, EngineError> {
        let index = self.stats.bars;
        bar.validate().map_err(|reason| EngineError::InvalidBar {
            index,
            timestamp: bar.timestamp,
            reason,
        })?;
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(EngineError::InputOrdering {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        self.stats.bars += 1;
        self.last_timestamp = Some(bar.timestamp);
        self.remember(bar);

        if !self.config.in_session(bar.time_of_day()) {
            let settled = self.flatten(ExitReason::SessionClose);
            if self.session.phase().is_in_session() {
                trace!(timestamp = %bar.timestamp, "session window closed");
            }
            self.session.close();
            return Ok(settled);
        }

        self.stats.in_session_bars += 1;
        let date = bar.session_date();
        if self.session.is_new_session(date) {
            let settled = self.flatten(ExitReason::SessionClose);
            self.session.begin(date);
            self.stats.sessions += 1;
            trace!(%date, "session started");
            self.last_in_session = Some((bar.timestamp, bar.close));
            self.try_enter(bar);
            return Ok(settled);
        }
        self.last_in_session = Some((bar.timestamp, bar.close));

        match self.session.phase() {
            SessionPhase::InSessionPositioned => Ok(self.manage_position(bar)),
            SessionPhase::InSessionFlat => {
                self.try_enter(bar);
                Ok(None)
            }
            SessionPhase::SessionLockedOut
            | SessionPhase::SessionClosed
            | SessionPhase::AwaitingSessionStart => Ok(None),
        }
    }

    /// Settle any open position at the last in-window bar and return the ledger.
    pub fn finish(self) -> TradeLedger {
        self.finish_with_stats().ledger
    }

    pub fn finish_with_stats(mut self) -> RunResult {
        self.flatten(ExitReason::EndOfData);
        RunResult {
            ledger: self.ledger,
            stats: self.stats,
        }
    }

    fn remember(&mut self, bar: &Bar) {
        let lookback = self.signal.lookback().max(1);
        while self.window.len() >= lookback {
            self.window.pop_front();
        }
        self.window.push_back(bar.clone());
    }

    fn try_enter(&mut self, bar: &Bar) {
        let was_locked = self.session.phase() == SessionPhase::SessionLockedOut;
        if !self.session.entries_allowed(self.config.max_daily_stop_losses()) {
            if !was_locked && self.session.phase() == SessionPhase::SessionLockedOut {
                self.stats.lockouts += 1;
                debug!(
                    timestamp = %bar.timestamp,
                    stop_losses = self.session.daily_stop_loss_count,
                    "daily stop-loss cap reached, entries locked out"
                );
            }
            return;
        }

        let signal = self.signal.evaluate(self.window.make_contiguous());
        let Some(direction) = signal.direction.filter(|_| signal.enter) else {
            return;
        };

        let price = self.config.price_proxy().entry_price(bar.close);
        let position = OpenPosition::open(
            bar.timestamp,
            price,
            bar.close,
            direction,
            self.config.lot_quantity(),
        );
        debug!(
            timestamp = %bar.timestamp,
            %direction,
            price,
            reason = %signal.reason,
            "entry"
        );
        self.session.open(position);
        self.stats.entries += 1;
    }

    fn manage_position(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let proxy = self.config.price_proxy();
        let stops = TieredTrailingStop::from_config(&self.config);
        let position = self.session.position.as_mut()?;

        let price = proxy.price(position.direction, position.entry_spot, bar.close);
        position.observe(price);
        let level = stops.level(position.entry_price, position.high_water_mark);
        let stop = position.ratchet_stop(level.price);
        trace!(
            timestamp = %bar.timestamp,
            price,
            high_water_mark = position.high_water_mark,
            stop,
            "mark"
        );
        if price > stop {
            return None;
        }

        let reason = if level.is_trailing() {
            ExitReason::TrailingStop
        } else {
            ExitReason::StopLoss
        };
        let position = self.session.take_position()?;
        Some(self.settle(position, bar.timestamp, price, reason))
    }

    /// Close any open position at the latest in-window bar.
    fn flatten(&mut self, reason: ExitReason) -> Option<TradeRecord> {
        let position = self.session.take_position()?;
        let (timestamp, spot) = self
            .last_in_session
            .unwrap_or((position.entry_timestamp, position.entry_spot));
        let price = self
            .config
            .price_proxy()
            .price(position.direction, position.entry_spot, spot);
        Some(self.settle(position, timestamp, price, reason))
    }

    fn settle(
        &mut self,
        position: OpenPosition,
        exit_timestamp: DateTime<FixedOffset>,
        exit_price: f64,
        reason: ExitReason,
    ) -> TradeRecord {
        let pnl_per_unit = exit_price - position.entry_price;
        let counts = reason.is_stop()
            && self
                .config
                .stop_counting()
                .counts(pnl_per_unit, self.config.stop_loss_per_unit());
        let before = self.session.daily_stop_loss_count;
        let count = self
            .session
            .record_exit(counts, self.config.max_daily_stop_losses());
        if counts && self.session.phase() == SessionPhase::SessionLockedOut {
            self.stats.lockouts += 1;
            debug!(
                timestamp = %exit_timestamp,
                stop_losses = count,
                "daily stop-loss cap reached, entries locked out"
            );
        }

        let record = TradeRecord {
            entry_timestamp: position.entry_timestamp,
            entry_price: position.entry_price,
            exit_timestamp,
            exit_price,
            exit_reason: reason,
            direction: position.direction,
            quantity: position.quantity,
            pnl: pnl_per_unit * f64::from(position.quantity),
            daily_stop_loss_count_at_exit: before,
            counted_stop_loss: counts,
        };
        debug!(
            timestamp = %exit_timestamp,
            direction = %record.direction,
            exit_price,
            pnl = record.pnl,
            %reason,
            stop_losses = count,
            "exit"
        );
        self.ledger.append(record.clone());
        record
    }
}

/// Replay `bars` under `config` in a single pass.
///
/// Fails fast on the first invalid or out-of-order bar; no ledger is returned
/// in that case.
pub fn run(bars: &[Bar], config: &StrategyConfig) -> Result<TradeLedger, EngineError> {
    run_with_stats(bars, config).map(|result| result.ledger)
}

/// Same as `run`, also returning replay counters.
pub fn run_with_stats(bars: &[Bar], config: &StrategyConfig) -> Result<RunResult, EngineError> {
    let mut simulator = Simulator::new(config.clone());
    for bar in bars {
        simulator.push(bar)?;
    }
    let result = simulator.finish_with_stats();
    debug!(
        bars = result.stats.bars,
        trades = result.ledger.len(),
        pnl = result.ledger.total_pnl(),
        "replay complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyParams;
    use crate::domain::Direction;
    use chrono::TimeZone;

    fn at(day: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2024, 3, day, h, m, 0)
            .unwrap()
    }

    fn bar(ts: DateTime<FixedOffset>, open: f64, close: f64) -> Bar {
        Bar::new(ts, open, open.max(close) + 1.0, open.min(close) - 1.0, close)
    }

    #[test]
    fn empty_input_gives_empty_ledger() {
        let ledger = run(&[], &StrategyConfig::default()).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn entry_then_trailing_exit() {
        let bars = vec![
            bar(at(4, 9, 15), 84.0, 100.0),
            bar(at(4, 9, 20), 100.0, 106.0),
            bar(at(4, 9, 25), 106.0, 85.0),
        ];
        let ledger = run(&bars, &StrategyConfig::default()).unwrap();
        assert_eq!(ledger.len(), 1);
        let trade = &ledger.records()[0];
        assert_eq!(trade.direction, Direction::Call);
        assert_eq!(trade.entry_price, 100.0);
        assert_eq!(trade.exit_price, 85.0);
        assert_eq!(trade.pnl, -1125.0);
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert_eq!(trade.daily_stop_loss_count_at_exit, 0);
        assert!(trade.counted_stop_loss);
        assert_eq!(sim_count_after(&bars), 1);
    }

    fn sim_count_after(bars: &[Bar]) -> u32 {
        let mut sim = Simulator::new(StrategyConfig::default());
        for b in bars {
            sim.push(b).unwrap();
        }
        sim.session().daily_stop_loss_count
    }

    #[test]
    fn entry_bar_does_not_exit_on_same_bar() {
        let mut sim = Simulator::new(StrategyConfig::default());
        assert_eq!(sim.push(&bar(at(4, 9, 15), 84.0, 100.0)).unwrap(), None);
        assert_eq!(sim.phase(), SessionPhase::InSessionPositioned);
    }

    #[test]
    fn out_of_window_bars_are_ignored() {
        let bars = vec![
            bar(at(4, 9, 0), 84.0, 100.0),
            bar(at(4, 15, 20), 184.0, 200.0),
        ];
        let result = run_with_stats(&bars, &StrategyConfig::default()).unwrap();
        assert!(result.ledger.is_empty());
        assert_eq!(result.stats.in_session_bars, 0);
        assert_eq!(result.stats.entries, 0);
    }

    #[test]
    fn open_position_flattened_at_session_close() {
        let bars = vec![
            bar(at(4, 15, 5), 84.0, 100.0),
            bar(at(4, 15, 10), 100.0, 103.0),
            bar(at(4, 15, 15), 103.0, 104.0),
            bar(at(4, 15, 20), 104.0, 90.0),
        ];
        let mut sim = Simulator::new(StrategyConfig::default());
        let mut closed = Vec::new();
        for b in &bars {
            if let Some(t) = sim.push(b).unwrap() {
                closed.push(t);
            }
        }
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].exit_reason, ExitReason::SessionClose);
        assert_eq!(closed[0].exit_timestamp, at(4, 15, 15));
        assert_eq!(closed[0].exit_price, 104.0);
        assert_eq!(closed[0].daily_stop_loss_count_at_exit, 0);
        assert!(!closed[0].counted_stop_loss);
        assert_eq!(sim.phase(), SessionPhase::SessionClosed);
    }

    #[test]
    fn open_position_flattened_at_end_of_data() {
        let bars = vec![bar(at(4, 10, 0), 84.0, 100.0), bar(at(4, 10, 5), 100.0, 102.0)];
        let ledger = run(&bars, &StrategyConfig::default()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(ledger.records()[0].pnl, 150.0);
    }

    #[test]
    fn unordered_input_fails() {
        let bars = vec![bar(at(4, 10, 5), 100.0, 101.0), bar(at(4, 10, 0), 100.0, 101.0)];
        let err = run(&bars, &StrategyConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::InputOrdering { index: 1, .. }));
    }

    #[test]
    fn duplicate_timestamp_fails() {
        let bars = vec![bar(at(4, 10, 5), 100.0, 101.0), bar(at(4, 10, 5), 100.0, 101.0)];
        assert!(matches!(
            run(&bars, &StrategyConfig::default()),
            Err(EngineError::InputOrdering { .. })
        ));
    }

    #[test]
    fn invalid_bar_aborts_whole_run() {
        let mut bars = vec![
            bar(at(4, 9, 15), 84.0, 100.0),
            bar(at(4, 9, 20), 100.0, 70.0),
            bar(at(4, 9, 25), 84.0, 100.0),
        ];
        bars[2].close = f64::NAN;
        let err = run(&bars, &StrategyConfig::default()).unwrap_err();
        assert_eq!(err.index(), 2);
        assert!(matches!(err, EngineError::InvalidBar { .. }));
    }

    #[test]
    fn full_stop_counting_ignores_partial_losses() {
        let config = StrategyParams {
            stop_counting: crate::config::StopCounting::FullStop,
            ..Default::default()
        }
        .build()
        .unwrap();
        let bars = vec![
            bar(at(4, 9, 15), 84.0, 100.0),
            bar(at(4, 9, 20), 100.0, 106.0),
            bar(at(4, 9, 25), 106.0, 85.0),
        ];
        let ledger = run(&bars, &config).unwrap();
        assert_eq!(ledger.records()[0].daily_stop_loss_count_at_exit, 0);
        assert!(!ledger.records()[0].counted_stop_loss);
    }

    #[test]
    fn profitable_trailing_exit_is_not_counted() {
        let bars = vec![
            bar(at(4, 9, 15), 84.0, 100.0),
            bar(at(4, 9, 20), 100.0, 121.0),
            bar(at(4, 9, 25), 121.0, 109.0),
        ];
        let ledger = run(&bars, &StrategyConfig::default()).unwrap();
        let trade = &ledger.records()[0];
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert_eq!(trade.pnl, 9.0 * 75.0);
        assert_eq!(trade.daily_stop_loss_count_at_exit, 0);
        assert!(!trade.counted_stop_loss);
    }

    #[test]
    fn custom_signal_can_be_injected() {
        struct Never;
        impl SignalGenerator for Never {
            fn name(&self) -> &str {
                "never"
            }
            fn lookback(&self) -> usize {
                1
            }
            fn evaluate(&self, _window: &[Bar]) -> crate::components::Signal {
                crate::components::Signal::hold()
            }
        }
        let mut sim = Simulator::with_signal(StrategyConfig::default(), Box::new(Never));
        sim.push(&bar(at(4, 9, 15), 50.0, 100.0)).unwrap();
        assert_eq!(sim.phase(), SessionPhase::InSessionFlat);
        assert!(sim.finish().is_empty());
    }
}
