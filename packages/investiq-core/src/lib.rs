//! InvestIQ Core - market data model and local bookkeeping.
//!
//! This crate holds everything InvestIQ does without touching the network:
//!
//! - **Data model**: quotes, stock and crypto rows, news items, the market snapshot
//! - **Technical indicators**: SMA, EMA, RSI, MACD, ADX, CMF, z-score
//! - **Scoring**: composite stock/crypto scores and recommendation labels
//! - **Bookkeeping**: favorites, price alerts and a simulated portfolio,
//!   persisted through a small key-value store
//!
//! # Example
//!
//! ```rust,no_run
//! use investiq_core::alerts::{AlertBook, AlertCondition, NewAlert};
//! use investiq_core::store::JsonFileStore;
//! use investiq_core::{AssetKind, PricePoint};
//! use std::sync::Arc;
//!
//! let store = Arc::new(JsonFileStore::with_default_dir());
//! let mut alerts = AlertBook::load(store);
//!
//! alerts
//!     .add(NewAlert {
//!         symbol: "AAPL".into(),
//!         name: "Apple".into(),
//!         kind: AssetKind::Stock,
//!         target_price: 200.0,
//!         condition: AlertCondition::Above,
//!         current_price: 190.0,
//!     })
//!     .unwrap();
//!
//! let fired = alerts.check(&[PricePoint::new("AAPL", 201.5)]).unwrap();
//! println!("{} alert(s) fired", fired.len());
//! ```

pub mod alerts;
pub mod analysis;
pub mod favorites;
pub mod indicators;
pub mod portfolio;
pub mod ratings;
pub mod scoring;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use types::{
    ApiResponse, AssetKind, CryptoData, Fundamentals, HistoryPoint, Market, MarketSnapshot,
    NewsItem, PricePoint, Quote, StockData,
};

// Re-export main functionality
pub use analysis::{quote_signal, rsi_signal, Signal, TechnicalSummary};
pub use scoring::{
    crypto_recommendation, crypto_score, institutional_crypto_score, score_breakdown,
    stock_composite_score, CryptoRating, CryptoSignals, Recommendation, Trend,
};

/// Error types for investiq-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for investiq-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Generate a record id of the form `<prefix>_<unix millis>_<9 base36 chars>`.
pub(crate) fn record_id(prefix: &str) -> String {
    use rand::Rng;

    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    format!(
        "{}_{}_{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_shape() {
        let id = record_id("alert");
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "alert");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_record_ids_differ() {
        assert_ne!(record_id("pos"), record_id("pos"));
    }
}
