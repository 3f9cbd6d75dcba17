//! End-to-end dispatcher scenarios
//!
//! Leg A is a linear BTCUSDT perpetual, leg B an inverse swap in 1 USD
//! contracts with BTC fees. `s = t = (1, -1)`, margin 2, stepback 1, so a
//! flat book of A 100/101 and B 50/51 puts the theoretical price at 50.

use approx::assert_relative_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use xmm_core::config::{EngineConfig, RateLimitConfig};
use xmm_core::engine::ManualClock;
use xmm_core::execution::{JournalRecord, MemorySink};
use xmm_core::testing::{
    balances, cancel_ack, create_ack, depth, maker_fill, test_config,
};
use xmm_core::{Channel, Engine, LegId, OrderId, OrderPurpose, Request, Side, TradingMode};

fn new_engine(mut cfg: EngineConfig, mode: TradingMode) -> (Engine, MemorySink, ManualClock) {
    cfg.mode = mode;
    let sink = MemorySink::new();
    let clock = ManualClock::new(0);
    let engine = Engine::new(cfg)
        .unwrap()
        .with_clock(clock.clone())
        .with_sink(sink.clone());
    (engine, sink, clock)
}

fn flat_books(engine: &mut Engine) {
    engine.process_event(depth(1_000, LegId::A, dec!(100), dec!(101)));
    engine.process_event(depth(2_000, LegId::B, dec!(50), dec!(51)));
}

fn resting_prices(engine: &Engine, leg: LegId) -> Vec<(Side, Decimal)> {
    let mut prices: Vec<_> = engine
        .simulator()
        .unwrap()
        .resting(leg)
        .iter()
        .map(|o| (o.side, o.price))
        .collect();
    prices.sort_by_key(|(side, _)| *side == Side::Sell);
    prices
}

// ============================================================================
// Crossing and requote
// ============================================================================

#[test]
fn test_initial_quotes_around_theoretical_price() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Backtest);
    engine.start(0);
    flat_books(&mut engine);

    assert_relative_eq!(engine.quoter().theoretical_price(), 50.0);
    assert_eq!(engine.quoter().relative_position(), 0);
    assert_eq!(engine.quoter().order_size(LegId::A), dec!(0.995));
    assert_eq!(engine.quoter().order_size(LegId::B), dec!(100));

    assert_eq!(
        resting_prices(&engine, LegId::A),
        vec![(Side::Buy, dec!(98)), (Side::Sell, dec!(103))]
    );
    assert_eq!(
        resting_prices(&engine, LegId::B),
        vec![(Side::Buy, dec!(48)), (Side::Sell, dec!(53))]
    );
    assert_eq!(
        engine.leg(LegId::B).open_order(Side::Sell).unwrap().quantity,
        dec!(100)
    );
}

#[test]
fn test_upward_crossing_requotes_only_moved_leg() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Backtest);
    engine.start(0);
    flat_books(&mut engine);

    // upper = 101 - 47 = 54 crosses 50 + 2; three steps of 1
    let requests = engine.process_event(depth(3_000, LegId::B, dec!(47), dec!(48)));

    assert_relative_eq!(engine.quoter().theoretical_price(), 53.0);
    assert_eq!(engine.quoter().relative_position(), -1);
    assert_eq!(engine.stats().crossings, 1);

    assert!(requests
        .iter()
        .all(|r| r.channel == Channel::Simulated && r.request.leg() == LegId::B));
    assert!(matches!(
        requests[0].request,
        Request::CancelAllOpenOrders { leg: LegId::B }
    ));
    assert_eq!(requests.len(), 3);

    assert_eq!(
        resting_prices(&engine, LegId::A),
        vec![(Side::Buy, dec!(98)), (Side::Sell, dec!(103))]
    );
    assert_eq!(
        resting_prices(&engine, LegId::B),
        vec![(Side::Buy, dec!(45)), (Side::Sell, dec!(50))]
    );
}

#[test]
fn test_leg_a_ask_lift_crosses_upward_and_requotes_both_legs() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Backtest);
    engine.start(0);
    flat_books(&mut engine);

    // upper = 103 - 50 = 53 reaches 50 + 2; two steps of 1
    let requests = engine.process_event(depth(3_000, LegId::A, dec!(100), dec!(103)));

    assert_relative_eq!(engine.quoter().theoretical_price(), 52.0);
    assert_eq!(engine.quoter().relative_position(), -1);
    assert_eq!(engine.stats().crossings, 1);

    assert!(matches!(
        requests[0].request,
        Request::CancelAllOpenOrders { leg: LegId::A }
    ));
    assert!(matches!(
        requests[1].request,
        Request::CancelAllOpenOrders { leg: LegId::B }
    ));
    assert_eq!(requests.len(), 6);

    assert_eq!(
        resting_prices(&engine, LegId::A),
        vec![(Side::Buy, dec!(100)), (Side::Sell, dec!(105))]
    );
    assert_eq!(
        resting_prices(&engine, LegId::B),
        vec![(Side::Buy, dec!(46)), (Side::Sell, dec!(53))]
    );
}

#[test]
fn test_unchanged_top_runs_no_cycle() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Backtest);
    engine.start(0);
    flat_books(&mut engine);
    let cycles = engine.stats().quote_cycles;

    let requests = engine.process_event(depth(3_000, LegId::A, dec!(100), dec!(101)));

    assert!(requests.is_empty());
    assert_eq!(engine.stats().quote_cycles, cycles);
}

// ============================================================================
// Inverse fees and the hedge
// ============================================================================

#[test]
fn test_inverse_maker_fill_charges_base_fee_and_hedges() {
    let (mut engine, sink, _) = new_engine(test_config(), TradingMode::Live);
    flat_books(&mut engine);

    engine.process_event(create_ack(3_000, LegId::B, Side::Sell, "b1", dec!(53), dec!(100)));
    let requests = engine.process_event(maker_fill(4_000, LegId::B, Side::Sell, "b1", dec!(53), dec!(100)));

    // 100 contracts of 1 USD at 53
    let base_amount = dec!(100) / dec!(53);
    let fee = base_amount * dec!(0.0002);
    let leg_b = engine.leg(LegId::B);
    assert_eq!(leg_b.base_balance, -base_amount - fee);
    assert_eq!(leg_b.quote_balance, dec!(100));
    assert_eq!(leg_b.position, dec!(-100));
    assert_eq!(leg_b.totals().base_fees, fee);
    assert_eq!(leg_b.totals().quote_fees, Decimal::ZERO);
    assert!(leg_b.open_order(Side::Sell).is_none());

    let trade = sink
        .records()
        .into_iter()
        .find_map(|r| match r {
            JournalRecord::PrivateTrade(row) => Some(row),
            _ => None,
        })
        .unwrap();
    assert_eq!(trade.fee_asset.as_deref(), Some("BTC"));
    assert_eq!(trade.purpose, OrderPurpose::Quote);

    // Opposed trading vector: a sell on B is hedged by a buy on A
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].channel, Channel::Rest);
    match &requests[0].request {
        Request::CreateOrder {
            leg,
            side,
            price,
            quantity,
            post_only,
            purpose,
            ..
        } => {
            assert_eq!(*leg, LegId::A);
            assert_eq!(*side, Side::Buy);
            assert_eq!(*price, dec!(102));
            assert_eq!(*quantity, dec!(0.995));
            assert!(!post_only);
            assert_eq!(*purpose, OrderPurpose::Hedge);
        }
        other => panic!("expected hedge create, got {:?}", other),
    }
    assert_eq!(engine.stats().hedges, 1);
}

#[test]
fn test_partial_fill_hedges_proportionally() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Live);
    flat_books(&mut engine);

    engine.process_event(create_ack(3_000, LegId::B, Side::Buy, "b1", dec!(48), dec!(100)));
    let requests = engine.process_event(maker_fill(4_000, LegId::B, Side::Buy, "b1", dec!(48), dec!(50)));

    assert_eq!(requests.len(), 1);
    match &requests[0].request {
        Request::CreateOrder {
            side,
            price,
            quantity,
            ..
        } => {
            assert_eq!(*side, Side::Sell);
            assert_eq!(*price, dec!(99));
            // half of 0.995, rounded down to 0.001
            assert_eq!(*quantity, dec!(0.497));
        }
        other => panic!("expected hedge create, got {:?}", other),
    }
}

// ============================================================================
// Stale acknowledgements
// ============================================================================

#[test]
fn test_stale_cancel_ack_leaves_new_order_tracked() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Live);

    engine.process_event(create_ack(1, LegId::A, Side::Buy, "a1", dec!(98), dec!(1)));
    engine.process_event(cancel_ack(2, LegId::A, Side::Buy, "a1"));
    engine.process_event(create_ack(3, LegId::A, Side::Buy, "a2", dec!(97.5), dec!(1)));
    assert_eq!(engine.stats().conditions.stale_acknowledgment, 0);

    engine.process_event(cancel_ack(4, LegId::A, Side::Buy, "a1"));
    engine.process_event(cancel_ack(5, LegId::A, Side::Buy, "a1"));

    let open = engine.leg(LegId::A).open_order(Side::Buy).unwrap();
    assert_eq!(open.id, OrderId::from("a2"));
    assert_eq!(open.remaining(), dec!(1));
    assert_eq!(engine.stats().conditions.stale_acknowledgment, 2);
}

#[test]
fn test_stale_fill_is_not_applied() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Live);
    flat_books(&mut engine);

    engine.process_event(create_ack(3_000, LegId::A, Side::Buy, "a1", dec!(98), dec!(1)));
    engine.process_event(create_ack(3_001, LegId::A, Side::Buy, "a2", dec!(97.5), dec!(1)));
    let requests = engine.process_event(maker_fill(3_002, LegId::A, Side::Buy, "a1", dec!(98), dec!(1)));

    assert!(requests.is_empty(), "no hedge for a rejected fill");
    assert_eq!(engine.leg(LegId::A).base_balance, Decimal::ZERO);
    assert_eq!(engine.stats().fills, 0);
    assert_eq!(engine.stats().conditions.stale_acknowledgment, 1);
}

// ============================================================================
// Drawdown kill switch
// ============================================================================

fn funded(engine: &mut Engine) {
    flat_books(engine);
    engine.process_event(balances(3_000, LegId::B, &[("USD", dec!(300)), ("BTC", dec!(-6))]));
    engine.process_event(balances(4_000, LegId::A, &[("BTC", dec!(1)), ("USDT", dec!(902.5))]));
}

#[test]
fn test_drawdown_liquidates_and_halts() {
    let (mut engine, sink, _) = new_engine(test_config(), TradingMode::Live);
    funded(&mut engine);
    assert_eq!(engine.risk().kill_switch().peak(), Some(dec!(1000)));
    assert!(!engine.is_halted());

    // 940 is 60 below the peak of 1000
    let requests = engine.process_event(balances(5_000, LegId::A, &[("USDT", dec!(842.5))]));

    assert!(engine.is_halted());
    assert_eq!(engine.stats().liquidations, 1);
    assert_eq!(engine.stats().conditions.drawdown_kill_switch, 1);
    assert_eq!(requests.len(), 4);

    assert_eq!(requests[0].channel, Channel::Rest);
    assert!(matches!(
        requests[0].request,
        Request::CancelAllOpenOrders { leg: LegId::A }
    ));
    assert_eq!(requests[1].channel, Channel::Websocket);
    assert!(matches!(
        requests[1].request,
        Request::CancelAllOpenOrders { leg: LegId::B }
    ));

    // Linear: -base * mid = -100.5, sold at bid - spread
    assert!(matches!(
        &requests[2].request,
        Request::CreateOrder {
            leg: LegId::A,
            side: Side::Sell,
            price,
            quantity,
            post_only: false,
            purpose: OrderPurpose::Liquidation,
            ..
        } if *price == dec!(99) && *quantity == dec!(1)
    ));
    // Inverse: quote balance 300 bought back as 300 contracts at ask + spread
    assert_eq!(requests[3].channel, Channel::Websocket);
    assert!(matches!(
        &requests[3].request,
        Request::CreateOrder {
            leg: LegId::B,
            side: Side::Buy,
            price,
            quantity,
            post_only: false,
            purpose: OrderPurpose::Liquidation,
            ..
        } if *price == dec!(52) && *quantity == dec!(300)
    ));

    let ignored = engine.process_event(depth(6_000, LegId::A, dec!(90), dec!(91)));
    assert!(ignored.is_empty());
    assert_eq!(engine.stats().events_ignored, 1);

    let summary = engine.finish();
    assert!(summary.shutdown_reason.is_some());
    assert_eq!(summary.peak_balance, Some(dec!(1000)));
    assert!(matches!(sink.records().last(), Some(JournalRecord::Summary(_))));
}

#[test]
fn test_small_drawdown_keeps_trading() {
    let (mut engine, _, _) = new_engine(test_config(), TradingMode::Live);
    funded(&mut engine);

    let requests = engine.process_event(balances(5_000, LegId::A, &[("USDT", dec!(862.5))]));

    assert!(requests.is_empty());
    assert!(!engine.is_halted());
    assert_eq!(engine.stats().liquidations, 0);
}

#[test]
fn test_manual_liquidation_waits_for_rate_limit() {
    let mut cfg = test_config();
    cfg.rate_limit = RateLimitConfig {
        short_window_us: 1_000_000,
        short_limit: 2,
        long_window_us: 60_000_000,
        long_limit: 100,
    };
    let (mut engine, _, clock) = new_engine(cfg, TradingMode::Live);

    // Four account queries fill the short window
    assert_eq!(engine.start(0).len(), 4);
    assert!(engine.rate_limiter().is_breached());

    assert!(engine.trigger_liquidation("operator request").is_empty());
    assert!(!engine.is_halted());

    clock.set(1_000_000);
    let requests = engine.process_event(depth(0, LegId::A, dec!(100), dec!(101)));

    assert!(engine.is_halted());
    assert_eq!(engine.stats().liquidations, 1);
    assert_eq!(requests.len(), 2, "flat legs only cancel");
    assert!(requests
        .iter()
        .all(|r| matches!(r.request, Request::CancelAllOpenOrders { .. })));
    assert_eq!(
        engine.risk().kill_switch().shutdown_reason(),
        Some("operator request")
    );
}
