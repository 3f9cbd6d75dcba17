//! Engine configuration
//!
//! Plain serde structures. Sourcing (files, environment, CLI) belongs to the
//! embedding process; [`EngineConfig::load`] and [`EngineConfig::from_json_str`]
//! cover the common JSON case.

pub mod constants;
pub mod types;

pub use types::*;

use crate::core::LegId;
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::path::Path;

impl EngineConfig {
    /// Load and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: EngineConfig =
            serde_json::from_str(raw).context("Failed to deserialize configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for leg in LegId::ALL {
            self.validate_leg(leg)?;
        }

        let s = &self.strategy;
        if !(s.margin > 0.0) {
            bail!("strategy.margin must be positive, got {}", s.margin);
        }
        if !(s.stepback > 0.0) {
            bail!("strategy.stepback must be positive, got {}", s.stepback);
        }
        if !(s.epsilon >= 0.0 && s.epsilon < 1.0) {
            bail!("strategy.epsilon must be in [0, 1), got {}", s.epsilon);
        }
        if s.signal_vector[0] == 0.0 || s.signal_vector[1] == 0.0 {
            bail!("strategy.signal_vector components must be non-zero");
        }
        if s.signal_vector.iter().chain(s.trading_vector.iter()).any(|c| !c.is_finite()) {
            bail!("strategy vectors must be finite");
        }
        if s.typical_order_size <= Decimal::ZERO {
            bail!("strategy.typical_order_size must be positive");
        }
        if s.nc2l == 0 {
            bail!("strategy.nc2l must be at least 1");
        }
        if s.hedge.spread_offset < Decimal::ZERO {
            bail!("strategy.hedge.spread_offset cannot be negative");
        }

        if self.risk.max_drawdown <= Decimal::ZERO {
            bail!("risk.max_drawdown must be positive");
        }
        if self.risk.liquidation_spread_offset < Decimal::ZERO {
            bail!("risk.liquidation_spread_offset cannot be negative");
        }

        let rl = &self.rate_limit;
        if rl.short_window_us == 0 || rl.long_window_us == 0 {
            bail!("rate_limit window durations must be positive");
        }
        if rl.short_limit == 0 || rl.long_limit == 0 {
            bail!("rate_limit limits must be positive");
        }

        Ok(())
    }

    fn validate_leg(&self, leg: LegId) -> Result<()> {
        let cfg = &self.legs[leg];
        if cfg.instrument.is_empty() {
            bail!("legs.{}: instrument must be set", leg);
        }
        if let Some(inc) = cfg.price_increment {
            if inc <= Decimal::ZERO {
                bail!("legs.{}: price_increment must be positive", leg);
            }
        }
        if let Some(inc) = cfg.quantity_increment {
            if inc <= Decimal::ZERO {
                bail!("legs.{}: quantity_increment must be positive", leg);
            }
        }
        if cfg.fees.maker_rate.abs() >= Decimal::ONE || cfg.fees.taker_rate.abs() >= Decimal::ONE {
            bail!("legs.{}: fee rates must be fractions", leg);
        }
        // The simulator cannot answer instrument queries
        if self.mode.is_simulated() && cfg.instrument_override().is_none() {
            bail!(
                "legs.{}: {} mode needs base/quote assets and increments configured",
                leg,
                self.mode
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstrumentType, TradingMode};

    const SAMPLE: &str = r#"{
        "mode": "PAPER",
        "legs": {
            "a": {
                "venue": "binance-usds-futures",
                "instrument": "BTCUSDT",
                "instrument_type": "LINEAR",
                "base_asset": "BTC",
                "quote_asset": "USDT",
                "price_increment": "0.1",
                "quantity_increment": "0.001",
                "fees": { "maker_rate": "0.0002", "taker_rate": "0.0004" }
            },
            "b": {
                "venue": "okx",
                "instrument": "BTC-USD-SWAP",
                "instrument_type": "INVERSE",
                "contract_denominated": true,
                "base_asset": "BTC",
                "quote_asset": "USD",
                "price_increment": "0.1",
                "quantity_increment": "100",
                "fees": { "taker_rate": "0.0005", "taker_buyer_fee_asset": "BTC" },
                "websocket_execution": true
            }
        },
        "strategy": {
            "signal_vector": [0.7071, -0.7071],
            "trading_vector": [0.7071, -0.7071],
            "margin": 5.0,
            "stepback": 1.0,
            "typical_order_size": "1000",
            "nc2l": 3
        },
        "risk": { "max_drawdown": "250" }
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let cfg = EngineConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(cfg.mode, TradingMode::Paper);
        assert_eq!(cfg.legs.b.instrument_type, InstrumentType::Inverse);
        assert!(cfg.legs.b.contract_denominated);
        assert_eq!(cfg.strategy.epsilon, constants::DEFAULT_EPSILON);
        assert!(cfg.strategy.hedge.enabled);
        assert_eq!(cfg.rate_limit, RateLimitConfig::standard());
        assert_eq!(
            cfg.legs.b.fees.fee_asset(crate::core::Liquidity::Taker, crate::core::Side::Buy),
            Some("BTC")
        );
    }

    #[test]
    fn test_rejects_non_positive_margin() {
        let raw = SAMPLE.replace("\"margin\": 5.0", "\"margin\": 0.0");
        let err = EngineConfig::from_json_str(&raw).unwrap_err();
        assert!(err.to_string().contains("margin"));
    }

    #[test]
    fn test_simulated_mode_needs_instrument_overrides() {
        let raw = SAMPLE.replace("\"quantity_increment\": \"0.001\",", "");
        let err = EngineConfig::from_json_str(&raw).unwrap_err();
        assert!(err.to_string().contains("legs.prodA"));
    }
}
