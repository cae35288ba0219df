//! Price alerts that fire once when a target is crossed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::store::{load_json, save_json, KeyValueStore};
use crate::types::{AssetKind, PricePoint};
use crate::{record_id, Error, Result};

/// Storage key of the alert list.
pub const ALERTS_KEY: &str = "investiq_alerts";

/// Direction of the price crossing that fires an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    /// Fires when price >= target
    Above,
    /// Fires when price <= target
    Below,
}

impl AlertCondition {
    pub fn is_met(&self, price: f64, target: f64) -> bool {
        match self {
            AlertCondition::Above => price >= target,
            AlertCondition::Below => price <= target,
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCondition::Above => write!(f, "above"),
            AlertCondition::Below => write!(f, "below"),
        }
    }
}

impl FromStr for AlertCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "above" | ">" | ">=" => Ok(AlertCondition::Above),
            "below" | "<" | "<=" => Ok(AlertCondition::Below),
            other => Err(Error::InvalidInput(format!("unknown condition: {}", other))),
        }
    }
}

/// A stored price alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    pub target_price: f64,
    pub condition: AlertCondition,
    /// Last price seen by [`AlertBook::check`]
    pub current_price: f64,
    pub created_at: DateTime<Utc>,
    pub triggered: bool,
    pub notified: bool,
}

/// Fields supplied when creating an alert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub current_price: f64,
}

/// Message emitted when an alert fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertNotification {
    pub alert_id: String,
    pub title: String,
    pub body: String,
}

impl AlertNotification {
    fn for_alert(alert: &PriceAlert, price: f64) -> Self {
        Self {
            alert_id: alert.id.clone(),
            title: format!("Price Alert: {}", alert.name),
            body: format!(
                "{} is now {} ${}. Current: ${:.2}",
                alert.symbol, alert.condition, alert.target_price, price
            ),
        }
    }
}

/// Alerts backed by a key-value store.
pub struct AlertBook {
    store: Arc<dyn KeyValueStore>,
    alerts: Vec<PriceAlert>,
}

impl AlertBook {
    /// Load alerts, starting empty if the stored value is missing or unreadable.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let alerts = match load_json::<Vec<PriceAlert>>(store.as_ref(), ALERTS_KEY) {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load alerts: {}", e);
                Vec::new()
            }
        };

        Self { store, alerts }
    }

    pub fn alerts(&self) -> &[PriceAlert] {
        &self.alerts
    }

    /// Create an alert and persist it.
    pub fn add(&mut self, new: NewAlert) -> Result<PriceAlert> {
        if !new.target_price.is_finite() || new.target_price <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "target price must be positive, got {}",
                new.target_price
            )));
        }
        if new.symbol.trim().is_empty() {
            return Err(Error::InvalidInput("symbol is required".to_string()));
        }

        let alert = PriceAlert {
            id: record_id("alert"),
            symbol: new.symbol,
            name: new.name,
            kind: new.kind,
            target_price: new.target_price,
            condition: new.condition,
            current_price: new.current_price,
            created_at: Utc::now(),
            triggered: false,
            notified: false,
        };

        let mut next = self.alerts.clone();
        next.push(alert.clone());
        self.commit(next)?;
        Ok(alert)
    }

    /// Remove an alert by id. Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let next: Vec<PriceAlert> = self.alerts.iter().filter(|a| a.id != id).cloned().collect();
        let removed = next.len() != self.alerts.len();
        self.commit(next)?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    /// Update untriggered alerts with the latest prices and fire those whose
    /// condition is met. Each alert fires at most once.
    pub fn check(&mut self, prices: &[PricePoint]) -> Result<Vec<AlertNotification>> {
        let mut next = self.alerts.clone();
        let mut changed = false;
        let mut fired = Vec::new();

        for alert in next.iter_mut().filter(|a| !a.triggered) {
            let Some(point) = prices
                .iter()
                .find(|p| p.symbol.eq_ignore_ascii_case(&alert.symbol))
            else {
                continue;
            };

            if alert.current_price != point.price {
                alert.current_price = point.price;
                changed = true;
            }

            if alert.condition.is_met(point.price, alert.target_price) && !alert.notified {
                alert.triggered = true;
                alert.notified = true;
                changed = true;
                tracing::info!(
                    "Alert {} fired: {} {} {}",
                    alert.id,
                    alert.symbol,
                    alert.condition,
                    alert.target_price
                );
                fired.push(AlertNotification::for_alert(alert, point.price));
            }
        }

        if changed {
            self.commit(next)?;
        }
        Ok(fired)
    }

    fn commit(&mut self, next: Vec<PriceAlert>) -> Result<()> {
        save_json(self.store.as_ref(), ALERTS_KEY, &next)?;
        self.alerts = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use tempfile::tempdir;

    fn new_alert(symbol: &str, target: f64, condition: AlertCondition) -> NewAlert {
        NewAlert {
            symbol: symbol.to_string(),
            name: format!("{} Inc", symbol),
            kind: AssetKind::Stock,
            target_price: target,
            condition,
            current_price: 100.0,
        }
    }

    #[test]
    fn test_add_assigns_id_and_flags() {
        let mut book = AlertBook::load(Arc::new(MemoryStore::new()));
        let alert = book
            .add(new_alert("AAPL", 200.0, AlertCondition::Above))
            .unwrap();

        assert!(alert.id.starts_with("alert_"));
        assert!(!alert.triggered);
        assert!(!alert.notified);
        assert_eq!(book.alerts().len(), 1);
    }

    #[test]
    fn test_add_rejects_bad_target() {
        let mut book = AlertBook::load(Arc::new(MemoryStore::new()));
        assert!(book.add(new_alert("AAPL", 0.0, AlertCondition::Above)).is_err());
        assert!(book.add(new_alert("AAPL", f64::NAN, AlertCondition::Above)).is_err());
    }

    #[test]
    fn test_check_fires_once() {
        let mut book = AlertBook::load(Arc::new(MemoryStore::new()));
        book.add(new_alert("AAPL", 200.0, AlertCondition::Above))
            .unwrap();

        let fired = book.check(&[PricePoint::new("AAPL", 199.0)]).unwrap();
        assert!(fired.is_empty());
        assert_eq!(book.alerts()[0].current_price, 199.0);

        let fired = book.check(&[PricePoint::new("AAPL", 201.5)]).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].title, "Price Alert: AAPL Inc");
        assert_eq!(fired[0].body, "AAPL is now above $200. Current: $201.50");
        assert!(book.alerts()[0].triggered);

        let fired = book.check(&[PricePoint::new("AAPL", 250.0)]).unwrap();
        assert!(fired.is_empty());
        // Triggered alerts no longer track price
        assert_eq!(book.alerts()[0].current_price, 201.5);
    }

    #[test]
    fn test_below_condition_inclusive() {
        let mut book = AlertBook::load(Arc::new(MemoryStore::new()));
        book.add(new_alert("BTC", 60000.0, AlertCondition::Below))
            .unwrap();

        let fired = book.check(&[PricePoint::new("btc", 60000.0)]).unwrap();
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_unmatched_symbols_ignored() {
        let mut book = AlertBook::load(Arc::new(MemoryStore::new()));
        book.add(new_alert("MSFT", 10.0, AlertCondition::Above))
            .unwrap();

        let fired = book.check(&[PricePoint::new("AAPL", 500.0)]).unwrap();
        assert!(fired.is_empty());
        assert_eq!(book.alerts()[0].current_price, 100.0);
    }

    #[test]
    fn test_persisted_across_loads() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));

        let mut book = AlertBook::load(store.clone());
        let alert = book
            .add(new_alert("TCS", 4000.0, AlertCondition::Above))
            .unwrap();
        book.check(&[PricePoint::new("TCS", 4100.0)]).unwrap();

        let reloaded = AlertBook::load(store.clone());
        assert_eq!(reloaded.alerts().len(), 1);
        assert!(reloaded.alerts()[0].triggered);

        let mut reloaded = reloaded;
        assert!(reloaded.remove(&alert.id).unwrap());
        assert!(!reloaded.remove(&alert.id).unwrap());
        assert!(AlertBook::load(store).alerts().is_empty());
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!("Above".parse::<AlertCondition>().unwrap(), AlertCondition::Above);
        assert_eq!("<=".parse::<AlertCondition>().unwrap(), AlertCondition::Below);
        assert!("sideways".parse::<AlertCondition>().is_err());
    }
}
