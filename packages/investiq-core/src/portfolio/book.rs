//! Simulated positions and their persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::summary::{holding_period_return, PortfolioSummary};
use crate::store::{load_json, save_json, KeyValueStore};
use crate::types::{AssetKind, PricePoint};
use crate::{record_id, Error, Result};

/// Storage key of the position list.
pub const PORTFOLIO_KEY: &str = "investiq_portfolio";

/// A simulated holding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimPosition {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    pub quantity: f64,
    pub buy_price: f64,
    pub buy_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss_percent: Option<f64>,
}

impl SimPosition {
    /// Quantity times buy price.
    pub fn cost(&self) -> f64 {
        self.quantity * self.buy_price
    }

    /// Quantity times the current price, or the buy price if never revalued.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price.unwrap_or(self.buy_price)
    }

    /// Revalue at `price`. A zero cost basis gives 0%.
    pub fn revalue(&mut self, price: f64) {
        let cost = self.cost();
        let value = self.quantity * price;
        self.current_price = Some(price);
        self.profit_loss = Some(value - cost);
        self.profit_loss_percent = Some(holding_period_return(cost, value));
    }
}

/// Fields supplied when opening a position.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    pub quantity: f64,
    pub buy_price: f64,
    /// Defaults to now
    pub buy_date: Option<DateTime<Utc>>,
}

/// Simulated portfolio backed by a key-value store.
pub struct PortfolioBook {
    store: Arc<dyn KeyValueStore>,
    positions: Vec<SimPosition>,
}

impl PortfolioBook {
    /// Load positions, starting empty if the stored value is missing or unreadable.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let positions = match load_json::<Vec<SimPosition>>(store.as_ref(), PORTFOLIO_KEY) {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load portfolio: {}", e);
                Vec::new()
            }
        };

        Self { store, positions }
    }

    pub fn positions(&self) -> &[SimPosition] {
        &self.positions
    }

    /// Open a position valued at its buy price.
    pub fn add_position(&mut self, new: NewPosition) -> Result<SimPosition> {
        if !new.quantity.is_finite() || new.quantity <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "quantity must be positive, got {}",
                new.quantity
            )));
        }
        if !new.buy_price.is_finite() || new.buy_price < 0.0 {
            return Err(Error::InvalidInput(format!(
                "buy price must not be negative, got {}",
                new.buy_price
            )));
        }

        let position = SimPosition {
            id: record_id("pos"),
            symbol: new.symbol,
            name: new.name,
            kind: new.kind,
            quantity: new.quantity,
            buy_price: new.buy_price,
            buy_date: new.buy_date.unwrap_or_else(Utc::now),
            current_price: Some(new.buy_price),
            profit_loss: Some(0.0),
            profit_loss_percent: Some(0.0),
        };

        let mut next = self.positions.clone();
        next.push(position.clone());
        self.commit(next)?;
        Ok(position)
    }

    /// Remove a position by id. Returns it if found.
    pub fn remove_position(&mut self, id: &str) -> Result<SimPosition> {
        let idx = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("position {}", id)))?;

        let mut next = self.positions.clone();
        let removed = next.remove(idx);
        self.commit(next)?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    /// Revalue positions whose symbol has a price. Saves whenever any position exists.
    pub fn update_prices(&mut self, prices: &[PricePoint]) -> Result<usize> {
        if self.positions.is_empty() {
            return Ok(0);
        }

        let mut next = self.positions.clone();
        let mut updated = 0;
        for position in next.iter_mut() {
            if let Some(point) = prices
                .iter()
                .find(|p| p.symbol.eq_ignore_ascii_case(&position.symbol))
            {
                position.revalue(point.price);
                updated += 1;
            }
        }

        self.commit(next)?;
        Ok(updated)
    }

    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary::from_positions(&self.positions)
    }

    fn commit(&mut self, next: Vec<SimPosition>) -> Result<()> {
        save_json(self.store.as_ref(), PORTFOLIO_KEY, &next)?;
        self.positions = next;
        Ok(())
    }
}
