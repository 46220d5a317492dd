//! Per-symbol holding with average-cost basis.

use serde::Serialize;

/// A holding exists only while its quantity is positive; the ledger removes
/// the entry outright when quantity reaches zero, discarding the cost basis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub quantity: f64,
    pub average_cost: f64,
    /// Running sum of purchase costs for the shares still held. Maintained
    /// incrementally, never recomputed from `quantity * average_cost`.
    pub total_cost_basis: f64,
}

impl Holding {
    pub fn open(quantity: f64, price: f64) -> Self {
        Holding {
            quantity,
            average_cost: price,
            total_cost_basis: quantity * price,
        }
    }

    /// Fold another purchase into the weighted average.
    pub fn add_lot(&mut self, quantity: f64, cost: f64) {
        let total_cost = self.total_cost_basis + cost;
        let total_quantity = self.quantity + quantity;
        self.quantity = total_quantity;
        self.average_cost = total_cost / total_quantity;
        self.total_cost_basis = total_cost;
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.market_value(price) - self.total_cost_basis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_sets_basis_from_price() {
        let holding = Holding::open(5.0, 650.0);
        assert!((holding.quantity - 5.0).abs() < f64::EPSILON);
        assert!((holding.average_cost - 650.0).abs() < f64::EPSILON);
        assert!((holding.total_cost_basis - 3250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn add_lot_recomputes_weighted_average() {
        let mut holding = Holding::open(5.0, 650.0);
        holding.add_lot(1.0, 750.0);

        assert!((holding.quantity - 6.0).abs() < f64::EPSILON);
        assert!((holding.total_cost_basis - 4000.0).abs() < f64::EPSILON);
        // (5*650 + 1*750) / 6 = 666.666...
        assert!((holding.average_cost - 4000.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_matches_closed_form() {
        let mut holding = Holding::open(3.0, 100.0);
        holding.add_lot(7.0, 7.0 * 120.0);
        let expected = (3.0 * 100.0 + 7.0 * 120.0) / 10.0;
        assert!((holding.average_cost - expected).abs() < 1e-9);
    }

    #[test]
    fn market_value_and_unrealized_pnl() {
        let holding = Holding::open(10.0, 50.0);
        assert!((holding.market_value(55.0) - 550.0).abs() < f64::EPSILON);
        assert!((holding.unrealized_pnl(55.0) - 50.0).abs() < 1e-9);
        assert!((holding.unrealized_pnl(45.0) - (-50.0)).abs() < 1e-9);
    }
}
