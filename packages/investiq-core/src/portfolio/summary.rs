//! Portfolio totals and weights.

use serde::{Deserialize, Serialize};

use super::book::SimPosition;

/// Totals across all simulated positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    /// Sum of quantity times buy price
    pub total_cost: f64,
    /// Sum of quantity times current price (buy price if never revalued)
    pub total_value: f64,
    pub total_profit_loss: f64,
    /// 0 when the cost is 0
    pub total_profit_loss_percent: f64,
    pub position_count: usize,
    pub positions_in_profit: usize,
    pub positions_in_loss: usize,
    /// Share of total value per position id
    pub weights: Vec<PositionWeight>,
}

/// Share of total value held in one position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionWeight {
    pub id: String,
    pub symbol: String,
    /// 0.0 - 1.0
    pub weight: f64,
}

impl PortfolioSummary {
    pub fn from_positions(positions: &[SimPosition]) -> Self {
        let total_cost: f64 = positions.iter().map(SimPosition::cost).sum();
        let total_value: f64 = positions.iter().map(SimPosition::market_value).sum();
        let total_profit_loss = total_value - total_cost;

        let positions_in_profit = positions
            .iter()
            .filter(|p| p.profit_loss.is_some_and(|pl| pl > 0.0))
            .count();
        let positions_in_loss = positions
            .iter()
            .filter(|p| p.profit_loss.is_some_and(|pl| pl < 0.0))
            .count();

        Self {
            total_cost,
            total_value,
            total_profit_loss,
            total_profit_loss_percent: holding_period_return(total_cost, total_value),
            position_count: positions.len(),
            positions_in_profit,
            positions_in_loss,
            weights: position_weights(positions, total_value),
        }
    }
}

fn position_weights(positions: &[SimPosition], total_value: f64) -> Vec<PositionWeight> {
    if total_value <= 0.0 {
        return Vec::new();
    }

    positions
        .iter()
        .map(|p| PositionWeight {
            id: p.id.clone(),
            symbol: p.symbol.clone(),
            weight: p.market_value() / total_value,
        })
        .collect()
}

/// Percent return from `initial_value` to `final_value`. Zero for a non-positive start.
pub fn holding_period_return(initial_value: f64, final_value: f64) -> f64 {
    if initial_value <= 0.0 {
        return 0.0;
    }
    ((final_value - initial_value) / initial_value) * 100.0
}
