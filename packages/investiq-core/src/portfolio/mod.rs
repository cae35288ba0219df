//! Simulated portfolio.
//!
//! Positions are opened at a buy price, revalued from market prices and
//! summarized into totals and weights. Nothing here places real orders.

mod book;
mod summary;

pub use book::{NewPosition, PortfolioBook, SimPosition, PORTFOLIO_KEY};
pub use summary::{holding_period_return, PortfolioSummary, PositionWeight};
