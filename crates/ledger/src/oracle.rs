//! Price oracle surface.
//!
//! Prices are quoted as reference units per collateral unit in 8-decimal
//! fixed point. Freshness and aggregation are the oracle's responsibility;
//! the engine only reads the latest answer.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

/// Oracle price decimals.
pub const PRICE_DECIMALS: u8 = 8;

/// Oracle errors.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no price oracle registered for manager {0}")]
    MissingOracle(Address),
    #[error("oracle reported a zero price")]
    ZeroPrice,
}

/// A single price observation.
#[derive(Debug, Clone, Copy)]
pub struct PriceData {
    /// Reference units per collateral unit, [`PRICE_DECIMALS`] fixed point.
    pub price: U256,
    /// Unix timestamp of the observation.
    pub updated_at: u64,
}

/// Exchange-rate source for one collateral asset.
#[async_trait]
pub trait PriceOracle: Send + Sync + Debug {
    /// Price decimals (8 unless the implementation states otherwise).
    fn decimals(&self) -> u8 {
        PRICE_DECIMALS
    }

    /// Latest price. A zero answer is an error, never a valid price.
    async fn current_price(&self) -> Result<PriceData, OracleError>;
}

/// Fixed-feed oracle with an updatable answer.
///
/// Stands in for an on-chain aggregator in the simulation and in tests:
/// harnesses move the market by calling [`StaticOracle::update_answer`].
#[derive(Debug)]
pub struct StaticOracle {
    answer: RwLock<PriceData>,
}

impl StaticOracle {
    pub fn new(price: U256) -> Self {
        Self {
            answer: RwLock::new(PriceData {
                price,
                updated_at: unix_now(),
            }),
        }
    }

    /// Replace the current answer.
    pub fn update_answer(&self, price: U256) {
        let mut answer = self.answer.write();
        debug!(old = %answer.price, new = %price, "oracle answer updated");
        *answer = PriceData {
            price,
            updated_at: unix_now(),
        };
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn current_price(&self) -> Result<PriceData, OracleError> {
        let data = *self.answer.read();
        if data.price.is_zero() {
            return Err(OracleError::ZeroPrice);
        }
        Ok(data)
    }
}

/// Manager-keyed oracle lookup.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    oracles: DashMap<Address, Arc<dyn PriceOracle>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the price source for a manager's collateral asset.
    pub fn register(&self, manager: Address, oracle: Arc<dyn PriceOracle>) {
        self.oracles.insert(manager, oracle);
    }

    /// Oracle for `manager`, if one is registered.
    pub fn get(&self, manager: Address) -> Result<Arc<dyn PriceOracle>, OracleError> {
        self.oracles
            .get(&manager)
            .map(|oracle| Arc::clone(oracle.value()))
            .ok_or(OracleError::MissingOracle(manager))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
