use super::constants::*;
use crate::core::{InstrumentType, Liquidity, PerLeg, Side, TradingMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: TradingMode,
    pub legs: PerLeg<LegConfig>,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Static description of one leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegConfig {
    /// Venue identifier, e.g. "okx"
    pub venue: String,

    /// Instrument symbol on that venue
    pub instrument: String,

    pub instrument_type: InstrumentType,

    /// Order quantities are contracts; multiply by the quantity increment for underlying units
    #[serde(default)]
    pub contract_denominated: bool,

    /// Overrides for instrument metadata; when absent they come from an instrument query
    #[serde(default)]
    pub base_asset: Option<String>,
    #[serde(default)]
    pub quote_asset: Option<String>,
    #[serde(default)]
    pub price_increment: Option<Decimal>,
    #[serde(default)]
    pub quantity_increment: Option<Decimal>,

    #[serde(default)]
    pub fees: FeeSchedule,

    #[serde(default)]
    pub initial_base_balance: Decimal,
    #[serde(default)]
    pub initial_quote_balance: Decimal,

    /// Route live order actions over the websocket execution channel
    #[serde(default)]
    pub websocket_execution: bool,
}

impl LegConfig {
    /// Instrument metadata when every override is configured
    pub fn instrument_override(&self) -> Option<Instrument> {
        Some(Instrument {
            base_asset: self.base_asset.clone()?,
            quote_asset: self.quote_asset.clone()?,
            price_increment: self.price_increment?,
            quantity_increment: self.quantity_increment?,
        })
    }
}

/// Resolved instrument metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub base_asset: String,
    pub quote_asset: String,
    pub price_increment: Decimal,
    pub quantity_increment: Decimal,
}

/// Maker/taker fee rates and the asset each kind of fee is charged in
///
/// A missing fee asset means the fee is charged in the quote asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub maker_rate: Decimal,
    #[serde(default)]
    pub taker_rate: Decimal,
    #[serde(default)]
    pub maker_buyer_fee_asset: Option<String>,
    #[serde(default)]
    pub maker_seller_fee_asset: Option<String>,
    #[serde(default)]
    pub taker_buyer_fee_asset: Option<String>,
    #[serde(default)]
    pub taker_seller_fee_asset: Option<String>,
}

impl FeeSchedule {
    pub fn rate(&self, liquidity: Liquidity) -> Decimal {
        match liquidity {
            Liquidity::Maker => self.maker_rate,
            Liquidity::Taker => self.taker_rate,
        }
    }

    pub fn fee_asset(&self, liquidity: Liquidity, side: Side) -> Option<&str> {
        let asset = match (liquidity, side) {
            (Liquidity::Maker, Side::Buy) => &self.maker_buyer_fee_asset,
            (Liquidity::Maker, Side::Sell) => &self.maker_seller_fee_asset,
            (Liquidity::Taker, Side::Buy) => &self.taker_buyer_fee_asset,
            (Liquidity::Taker, Side::Sell) => &self.taker_seller_fee_asset,
        };
        asset.as_deref()
    }
}

/// Crossing model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Normalized signal vector (leg A, leg B)
    pub signal_vector: [f64; 2],

    /// Normalized trading vector (leg A, leg B)
    pub trading_vector: [f64; 2],

    /// Half-width of the no-trade band around the theoretical price
    pub margin: f64,

    /// Theoretical price step quantum on a crossing
    pub stepback: f64,

    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Order size in quote (USD) terms before per-leg conversion
    pub typical_order_size: Decimal,

    /// Bound on the relative position counter and inventory limit multiplier
    pub nc2l: u32,

    #[serde(default = "default_order_ttl")]
    pub order_ttl: i64,

    #[serde(default)]
    pub hedge: HedgeConfig,
}

/// Spread-capture hedge on the opposite leg after a quote fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_hedge_offset")]
    pub spread_offset: Decimal,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spread_offset: DEFAULT_HEDGE_SPREAD_OFFSET,
        }
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Absolute drop from the peak total balance that triggers liquidation
    pub max_drawdown: Decimal,

    #[serde(default = "default_liquidation_offset")]
    pub liquidation_spread_offset: Decimal,
}

/// Request admission windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub short_window_us: u64,
    pub short_limit: u64,
    pub long_window_us: u64,
    pub long_limit: u64,
}

impl RateLimitConfig {
    /// Conservative limits for production
    pub fn conservative() -> Self {
        Self {
            short_window_us: 1_000_000,
            short_limit: 5,
            long_window_us: 60_000_000,
            long_limit: 120,
        }
    }

    /// Standard limits
    pub fn standard() -> Self {
        Self {
            short_window_us: DEFAULT_SHORT_WINDOW_US,
            short_limit: DEFAULT_SHORT_WINDOW_LIMIT,
            long_window_us: DEFAULT_LONG_WINDOW_US,
            long_limit: DEFAULT_LONG_WINDOW_LIMIT,
        }
    }

    /// Effectively unlimited; for backtests that only study the strategy
    pub fn unlimited() -> Self {
        Self {
            short_window_us: DEFAULT_SHORT_WINDOW_US,
            short_limit: u64::MAX,
            long_window_us: DEFAULT_LONG_WINDOW_US,
            long_limit: u64::MAX,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Dispatcher cadence settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval_us: u64,

    #[serde(default = "default_account_refresh")]
    pub account_refresh_interval_us: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sampling_interval_us: DEFAULT_SAMPLING_INTERVAL_US,
            account_refresh_interval_us: DEFAULT_ACCOUNT_REFRESH_INTERVAL_US,
        }
    }
}

// Default value functions
fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_order_ttl() -> i64 {
    DEFAULT_ORDER_TTL
}

fn default_true() -> bool {
    true
}

fn default_hedge_offset() -> Decimal {
    DEFAULT_HEDGE_SPREAD_OFFSET
}

fn default_liquidation_offset() -> Decimal {
    DEFAULT_LIQUIDATION_SPREAD_OFFSET
}

fn default_sampling_interval() -> u64 {
    DEFAULT_SAMPLING_INTERVAL_US
}

fn default_account_refresh() -> u64 {
    DEFAULT_ACCOUNT_REFRESH_INTERVAL_US
}
