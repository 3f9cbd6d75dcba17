//! Event Dispatcher
//!
//! The engine owns both legs, the crossing model, the risk manager and the
//! rate limiter, and is driven one event at a time through
//! [`Engine::process_event`].
//!
//! ## Flow
//!
//! ```text
//! process_event ──▶ queue ──▶ dispatch ──▶ leg state / quoting / risk
//!                     ▲                         │
//!                     │                      requests
//!                     │                         ▼
//!                     │                  rate limiter gate
//!                     │                         │
//!                     └── simulator output ◀────┤ PAPER / BACKTEST
//!                         hedge instructions    │
//!                                               ▼
//!                                        routed requests (returned)
//! ```
//!
//! Simulator answers and hedge instructions go to the back of the same queue,
//! so one external event is fully processed, depth first, before the call
//! returns. At most one quoting cycle runs per external event.
//!
//! Once the kill switch fires the engine is halted: the queue is discarded
//! and every later event is ignored.

mod account;
mod clock;
mod liquidation;
mod market;
mod orders;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use stats::{ConditionCounts, EngineStats};

use crate::config::EngineConfig;
use crate::core::{Condition, ConditionKind, LegId, PerLeg, Side, TradingMode};
use crate::data::{Event, EventPayload};
use crate::execution::journal::{JournalRecord, LegSummary, NullSink, RecordSink, SummaryRow};
use crate::execution::simulated::{MatchingSimulator, SimulationOutput};
use crate::execution::types::{Channel, Request, RoutedRequest};
use crate::leg::LegState;
use crate::risk::{RateLimiter, RiskManager};
use crate::strategy::QuoterState;
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Taker order owed on the other leg after a quote fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HedgeInstruction {
    filled_leg: LegId,
    side: Side,
    absorbed: Decimal,
    order_quantity: Decimal,
}

#[derive(Debug)]
enum Queued {
    Event(Event),
    Hedge(HedgeInstruction),
}

/// Dual-leg market making engine
pub struct Engine {
    config: EngineConfig,
    legs: PerLeg<LegState>,
    quoter: QuoterState,
    risk: RiskManager,
    limiter: RateLimiter,
    simulator: Option<MatchingSimulator>,
    clock: Box<dyn Clock>,
    sink: Box<dyn RecordSink>,

    queue: VecDeque<Queued>,
    outbox: Vec<RoutedRequest>,
    stats: EngineStats,

    now_us: u64,
    last_sample_us: u64,
    last_refresh_us: u64,
    cycle_ran: bool,
    next_client_id: u64,
    pending_liquidation: Option<String>,
    halted: bool,
}

impl Engine {
    /// Build an engine from a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let legs = PerLeg::from_fn(|leg| LegState::new(leg, config.legs[leg].clone()));
        let quoter = QuoterState::new(&config.strategy);
        let risk = RiskManager::new(&config.risk, &config.strategy);
        let limiter = RateLimiter::new(config.rate_limit, 0);
        let simulator = config.mode.is_simulated().then(MatchingSimulator::new);

        info!(
            "Initializing engine in {} mode: A={}@{} B={}@{}",
            config.mode,
            config.legs.a.instrument,
            config.legs.a.venue,
            config.legs.b.instrument,
            config.legs.b.venue
        );

        Ok(Self {
            config,
            legs,
            quoter,
            risk,
            limiter,
            simulator,
            clock: Box::new(SystemClock),
            sink: Box::new(NullSink),
            queue: VecDeque::new(),
            outbox: Vec::new(),
            stats: EngineStats::default(),
            now_us: 0,
            last_sample_us: 0,
            last_refresh_us: 0,
            cycle_ran: false,
            next_client_id: 0,
            pending_liquidation: None,
            halted: false,
        })
    }

    /// Replace the wall clock used in LIVE and PAPER
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the destination of persisted rows
    pub fn with_sink(mut self, sink: impl RecordSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Initial queries: instruments without overrides, balances and positions
    pub fn start(&mut self, now_us: u64) -> Vec<RoutedRequest> {
        self.now_us = now_us;
        self.limiter.roll(now_us);
        self.last_refresh_us = now_us;

        let mut requests = Vec::new();
        for leg in LegId::ALL {
            if self.legs[leg].instrument().is_none() {
                requests.push(Request::GetInstrument { leg });
            }
        }
        for leg in LegId::ALL {
            requests.push(Request::GetAccountBalances { leg });
            requests.push(Request::GetAccountPositions { leg });
        }
        info!("Starting engine, {} initial requests", requests.len());

        self.submit(requests);
        self.drain();
        std::mem::take(&mut self.outbox)
    }

    /// Process one external event and return the requests it produced
    ///
    /// Never fails: every problem is logged and counted as a condition.
    pub fn process_event(&mut self, event: Event) -> Vec<RoutedRequest> {
        if self.halted {
            self.stats.events_ignored += 1;
            debug!("Engine halted, ignoring {} event", event.payload.kind());
            return Vec::new();
        }
        self.cycle_ran = false;
        self.queue.push_back(Queued::Event(event));
        self.drain();
        std::mem::take(&mut self.outbox)
    }

    /// Run the liquidation sequence now
    ///
    /// Deferred to the next event while the rate limiter is breached.
    pub fn trigger_liquidation(&mut self, reason: impl Into<String>) -> Vec<RoutedRequest> {
        if self.halted {
            warn!("Liquidation requested but engine already halted");
            return Vec::new();
        }
        let reason = reason.into();
        if self.limiter.is_breached() {
            warn!("Rate limit breached, liquidation deferred: {}", reason);
            self.pending_liquidation = Some(reason);
        } else {
            self.liquidate(reason);
        }
        self.drain();
        std::mem::take(&mut self.outbox)
    }

    /// Emit and return the end-of-run summary
    pub fn finish(&mut self) -> SummaryRow {
        let legs = LegId::ALL
            .iter()
            .map(|&leg| {
                let state = &self.legs[leg];
                LegSummary {
                    leg,
                    venue: state.config().venue.clone(),
                    instrument: state.config().instrument.clone(),
                    base_balance: state.base_balance,
                    quote_balance: state.quote_balance,
                    position: state.position,
                    totals: state.totals(),
                }
            })
            .collect();

        let summary = SummaryRow {
            time_us: self.now_us,
            mode: self.config.mode,
            theoretical_price: self.quoter.theoretical_price(),
            relative_position: self.quoter.relative_position(),
            total_balance: RiskManager::total_balance(&self.legs),
            peak_balance: self.risk.kill_switch().peak(),
            shutdown_reason: self.risk.kill_switch().shutdown_reason().map(str::to_string),
            legs,
            stats: self.stats,
        };

        info!(
            "Engine finished: {} events, {} cycles, {} fills, {} conditions",
            self.stats.events_processed,
            self.stats.quote_cycles,
            self.stats.fills,
            self.stats.conditions.total()
        );
        self.sink.record(&JournalRecord::Summary(summary.clone()));
        self.sink.flush();
        summary
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn mode(&self) -> TradingMode {
        self.config.mode
    }

    pub fn leg(&self, leg: LegId) -> &LegState {
        &self.legs[leg]
    }

    pub fn legs(&self) -> &PerLeg<LegState> {
        &self.legs
    }

    pub fn quoter(&self) -> &QuoterState {
        &self.quoter
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn simulator(&self) -> Option<&MatchingSimulator> {
        self.simulator.as_ref()
    }

    #[inline]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn drain(&mut self) {
        while let Some(item) = self.queue.pop_front() {
            if self.halted {
                debug!("Engine halted, discarding {} queued items", self.queue.len() + 1);
                self.queue.clear();
                break;
            }
            match item {
                Queued::Event(event) => self.dispatch(event),
                Queued::Hedge(hedge) => self.hedge(hedge),
            }
        }
    }

    fn dispatch(&mut self, event: Event) {
        self.now_us = match self.config.mode {
            TradingMode::Backtest => event.time_us,
            TradingMode::Live | TradingMode::Paper => self.clock.now_us(),
        };
        self.limiter.roll(self.now_us);
        self.stats.events_processed += 1;

        if let Some(reason) = self.pending_liquidation.take() {
            if self.limiter.is_breached() {
                self.pending_liquidation = Some(reason);
            } else {
                self.liquidate(reason);
                return;
            }
        }
        self.maybe_refresh_account();

        let Event { tag, payload, .. } = event;
        match (payload, tag) {
            (EventPayload::SessionStatus(status), _) => self.on_session_status(status),
            (EventPayload::SubscriptionStatus(status), _) => self.on_subscription_status(status),
            (payload, None) => {
                self.stats.untagged_events += 1;
                warn!("Dropping {} event without correlation tag", payload.kind());
            }
            (EventPayload::MarketDepth { bids, asks }, Some(tag)) => {
                self.on_depth(tag.leg, &bids, &asks)
            }
            (EventPayload::PublicTrade(trade) | EventPayload::AggTrade(trade), Some(tag)) => {
                self.on_public_trade(tag.leg, trade)
            }
            (EventPayload::PrivateTrade(trade), Some(tag)) => self.on_private_trade(tag.leg, trade),
            (EventPayload::OrderUpdate(update), Some(tag)) => self.on_order_update(tag.leg, update),
            (EventPayload::CreateOrderResponse(result), Some(tag)) => {
                self.on_create_response(tag, result)
            }
            (EventPayload::CancelOrderResponse(result), Some(tag)) => {
                self.on_cancel_response(tag, result)
            }
            (EventPayload::CancelOpenOrdersResponse(result), Some(tag)) => {
                self.on_cancel_all_response(tag, result)
            }
            (EventPayload::GetAccountBalancesResponse(result), Some(tag)) => {
                self.on_balances(tag, result)
            }
            (EventPayload::GetAccountPositionsResponse(result), Some(tag)) => {
                self.on_positions(tag, result)
            }
            (EventPayload::GetInstrumentResponse(result), Some(tag)) => {
                self.on_instrument(tag, result)
            }
        }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Admit a batch through the rate limiter and route it
    ///
    /// The breach flag is read once per batch. While breached, order actions
    /// are dropped; queries still go out. Everything admitted is counted.
    fn submit(&mut self, requests: Vec<Request>) {
        if requests.is_empty() {
            return;
        }

        let breached = self.limiter.is_breached();
        let mut admitted = Vec::with_capacity(requests.len());
        for request in requests {
            if breached && request.is_order_action() {
                self.stats.requests_dropped += 1;
                self.limiter.record_dropped(1);
                self.raise(Condition::RateLimitBreach {
                    leg: request.leg(),
                    suppressed: "order action",
                });
                continue;
            }
            admitted.push(request);
        }

        self.limiter.record(admitted.len() as u64);
        for request in admitted {
            self.note_admitted(&request);
            self.stats.requests_admitted += 1;
            self.route(request);
        }
    }

    /// In-flight bookkeeping for an admitted request
    fn note_admitted(&mut self, request: &Request) {
        match request {
            Request::CreateOrder {
                leg, side, purpose, ..
            } if purpose.is_resting() => self.legs[*leg].mark_create_sent(*side),
            Request::CancelOrder { leg, side, .. } => self.legs[*leg].mark_cancel_sent(*side),
            Request::CancelAllOpenOrders { leg } => {
                let cleared = self.legs[*leg].begin_cancel_all();
                debug!("{}: cancel-all clears {} open references", leg, cleared.len());
            }
            _ => {}
        }
    }

    fn route(&mut self, request: Request) {
        let leg = request.leg();
        let simulated = match self.simulator.as_mut() {
            Some(simulator) => Some(simulator.submit(&request, self.now_us, &self.legs[leg])),
            None => None,
        };

        let channel = match simulated {
            Some(output) => {
                self.absorb(output);
                Channel::Simulated
            }
            None if request.is_order_action() && self.config.legs[leg].websocket_execution => {
                Channel::Websocket
            }
            None => Channel::Rest,
        };

        debug!("{} via {}", request.tag(), channel);
        self.outbox.push(RoutedRequest { channel, request });
    }

    /// Queue simulator output behind everything already pending
    fn absorb(&mut self, output: SimulationOutput) {
        for condition in output.conditions {
            self.raise(condition);
        }
        self.queue.extend(output.events.into_iter().map(Queued::Event));
    }

    fn next_client_id(&mut self, leg: LegId) -> String {
        self.next_client_id += 1;
        format!("xmm-{}-{}", leg, self.next_client_id)
    }

    /// Log and count a condition
    fn raise(&mut self, condition: Condition) {
        self.stats.conditions.bump(condition.kind());
        match condition.kind() {
            ConditionKind::DrawdownKillSwitch => error!("{}", condition),
            _ => warn!("{}", condition),
        }
    }
}
