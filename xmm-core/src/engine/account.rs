//! Account queries, instrument resolution and session status

use super::Engine;
use crate::config::Instrument;
use crate::core::{Condition, LegId};
use crate::data::{Balance, CorrelationTag, ExchangeError, PositionReport, SessionStatus, SubscriptionStatus};
use crate::execution::journal::{BalanceRow, JournalRecord, PositionRow};
use crate::execution::types::Request;
use tracing::{debug, info, warn};

impl Engine {
    pub(super) fn on_balances(
        &mut self,
        tag: CorrelationTag,
        result: Result<Vec<Balance>, ExchangeError>,
    ) {
        let leg = tag.leg;
        let balances = match result {
            Ok(balances) => balances,
            Err(e) => return self.response_failed(tag, e),
        };

        for balance in balances {
            if !self.legs[leg].set_balance(&balance.asset, balance.quantity) {
                debug!("{}: ignoring balance of untraded asset {}", leg, balance.asset);
            }
        }
        let state = &self.legs[leg];
        let top = state.live_top();
        debug!("{}: balances base={} quote={}", leg, state.base_balance, state.quote_balance);
        let row = BalanceRow {
            time_us: self.now_us,
            leg,
            base_balance: state.base_balance,
            quote_balance: state.quote_balance,
            best_bid: top.bid_price,
            best_ask: top.ask_price,
        };
        self.sink.record(&JournalRecord::Balance(row));

        self.check_drawdown();
    }

    pub(super) fn on_positions(
        &mut self,
        tag: CorrelationTag,
        result: Result<Vec<PositionReport>, ExchangeError>,
    ) {
        let leg = tag.leg;
        let reports = match result {
            Ok(reports) => reports,
            Err(e) => return self.response_failed(tag, e),
        };

        for report in reports {
            if report.instrument != self.config.legs[leg].instrument {
                continue;
            }
            self.legs[leg].position = report.quantity;
            let top = self.legs[leg].live_top();
            self.sink.record(&JournalRecord::Position(PositionRow {
                time_us: self.now_us,
                leg,
                quantity: report.quantity,
                best_bid: top.bid_price,
                best_ask: top.ask_price,
            }));
        }
    }

    /// Resolve instrument metadata; configured overrides win
    pub(super) fn on_instrument(
        &mut self,
        tag: CorrelationTag,
        result: Result<Instrument, ExchangeError>,
    ) {
        let leg = tag.leg;
        let reported = match result {
            Ok(instrument) => instrument,
            Err(e) => return self.response_failed(tag, e),
        };

        let cfg = &self.config.legs[leg];
        let instrument = Instrument {
            base_asset: cfg.base_asset.clone().unwrap_or(reported.base_asset),
            quote_asset: cfg.quote_asset.clone().unwrap_or(reported.quote_asset),
            price_increment: cfg.price_increment.unwrap_or(reported.price_increment),
            quantity_increment: cfg.quantity_increment.unwrap_or(reported.quantity_increment),
        };
        info!(
            "{}: {} resolved as {}/{} tick {} lot {}",
            leg,
            cfg.instrument,
            instrument.base_asset,
            instrument.quote_asset,
            instrument.price_increment,
            instrument.quantity_increment
        );
        self.legs[leg].set_instrument(instrument);
    }

    pub(super) fn on_session_status(&mut self, status: SessionStatus) {
        if status.connected {
            info!("Session up {}", status.detail);
        } else {
            warn!("Session down: {}", status.detail);
        }
    }

    pub(super) fn on_subscription_status(&mut self, status: SubscriptionStatus) {
        if status.subscribed {
            info!("Subscribed to {}", status.channel);
        } else {
            warn!("Subscription to {} lost", status.channel);
        }
    }

    /// Periodic balance and position queries
    pub(super) fn maybe_refresh_account(&mut self) {
        let interval = self.config.dispatcher.account_refresh_interval_us;
        if interval == 0 || self.now_us.saturating_sub(self.last_refresh_us) < interval {
            return;
        }
        self.last_refresh_us = self.now_us;
        debug!("Refreshing account state");

        let requests = LegId::ALL
            .iter()
            .flat_map(|&leg| {
                [
                    Request::GetAccountBalances { leg },
                    Request::GetAccountPositions { leg },
                ]
            })
            .collect();
        self.submit(requests);
    }

    fn response_failed(&mut self, tag: CorrelationTag, error: ExchangeError) {
        self.raise(Condition::ExchangeResponseError {
            leg: tag.leg,
            action: tag.action.to_string(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TradingMode;
    use crate::data::{Action, Event, EventPayload};
    use crate::engine::ManualClock;
    use crate::execution::journal::MemorySink;
    use crate::testing::helpers::{balances, depth, tag, test_config};
    use rust_decimal_macros::dec;

    fn live_engine() -> (Engine, MemorySink, ManualClock) {
        let mut cfg = test_config();
        cfg.mode = TradingMode::Live;
        cfg.dispatcher.account_refresh_interval_us = 5_000;
        let sink = MemorySink::new();
        let clock = ManualClock::new(0);
        let engine = Engine::new(cfg)
            .unwrap()
            .with_clock(clock.clone())
            .with_sink(sink.clone());
        (engine, sink, clock)
    }

    #[test]
    fn test_balances_update_leg_and_journal() {
        let (mut engine, sink, _) = live_engine();
        engine.process_event(depth(0, LegId::B, dec!(50), dec!(51)));
        engine.process_event(balances(
            0,
            LegId::B,
            &[("BTC", dec!(0.25)), ("USD", dec!(-12.5)), ("ETH", dec!(3))],
        ));

        assert_eq!(engine.leg(LegId::B).base_balance, dec!(0.25));
        assert_eq!(engine.leg(LegId::B).quote_balance, dec!(-12.5));
        assert_eq!(sink.len(), 1, "one row per response");
        assert_eq!(
            sink.records()[0],
            JournalRecord::Balance(BalanceRow {
                time_us: 0,
                leg: LegId::B,
                base_balance: dec!(0.25),
                quote_balance: dec!(-12.5),
                best_bid: Some(dec!(50)),
                best_ask: Some(dec!(51)),
            })
        );
    }

    #[test]
    fn test_positions_match_configured_instrument() {
        let (mut engine, sink, _) = live_engine();
        let event = Event::tagged(
            0,
            tag(Action::GetAccountPositions, LegId::A),
            EventPayload::GetAccountPositionsResponse(Ok(vec![
                PositionReport {
                    instrument: "ETHUSDT".to_string(),
                    quantity: dec!(4),
                },
                PositionReport {
                    instrument: "BTCUSDT".to_string(),
                    quantity: dec!(-0.5),
                },
            ])),
        );
        engine.process_event(event);

        assert_eq!(engine.leg(LegId::A).position, dec!(-0.5));
        assert_eq!(sink.len(), 1);
        match &sink.records()[0] {
            JournalRecord::Position(row) => {
                assert_eq!(row.quantity, dec!(-0.5));
                assert_eq!((row.best_bid, row.best_ask), (None, None));
            }
            other => panic!("expected position row, got {:?}", other),
        }
    }

    #[test]
    fn test_instrument_overrides_win() {
        let mut cfg = test_config();
        cfg.mode = TradingMode::Live;
        cfg.legs.a.price_increment = None;
        let mut engine = Engine::new(cfg).unwrap();

        let event = Event::tagged(
            0,
            tag(Action::GetInstrument, LegId::A),
            EventPayload::GetInstrumentResponse(Ok(Instrument {
                base_asset: "XBT".to_string(),
                quote_asset: "USDT".to_string(),
                price_increment: dec!(0.1),
                quantity_increment: dec!(1),
            })),
        );
        engine.process_event(event);

        let instrument = engine.leg(LegId::A).instrument().unwrap();
        assert_eq!(instrument.base_asset, "BTC");
        assert_eq!(instrument.price_increment, dec!(0.1));
        assert_eq!(instrument.quantity_increment, dec!(0.001));
    }

    #[test]
    fn test_failed_query_raises_condition() {
        let (mut engine, _, _) = live_engine();
        let event = Event::tagged(
            0,
            tag(Action::GetAccountBalances, LegId::A),
            EventPayload::GetAccountBalancesResponse(Err(ExchangeError::new(-1022, "signature"))),
        );
        engine.process_event(event);
        assert_eq!(engine.stats().conditions.exchange_response_error, 1);
    }

    #[test]
    fn test_periodic_account_refresh() {
        let (mut engine, _, clock) = live_engine();
        engine.start(0);

        clock.set(4_999);
        let requests = engine.process_event(balances(0, LegId::A, &[]));
        assert!(requests.is_empty());

        clock.set(5_000);
        let requests = engine.process_event(balances(0, LegId::A, &[]));
        assert_eq!(requests.len(), 4);
        assert!(requests
            .iter()
            .all(|r| matches!(r.request, Request::GetAccountBalances { .. } | Request::GetAccountPositions { .. })));
    }
}
