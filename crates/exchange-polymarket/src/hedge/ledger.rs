//! Cumulative position across both outcomes of one market.
//!
//! Averages are `None` while an outcome has no quantity, so an empty side can
//! never pass a "pair cost below threshold" comparison.
//!
//! ```
//! use algo_trade_polymarket::hedge::{Outcome, PositionLedger};
//! use rust_decimal_macros::dec;
//!
//! let mut ledger = PositionLedger::new();
//! ledger.update_after_fill(Outcome::Yes, dec!(0.45), dec!(100));
//! ledger.update_after_fill(Outcome::No, dec!(0.50), dec!(100));
//!
//! assert_eq!(ledger.pair_cost().total, Some(dec!(0.95)));
//! assert_eq!(ledger.locked_profit(), dec!(5));
//! ```

use super::types::Outcome;
use rust_decimal::Decimal;
use serde::Serialize;

/// Average cost of each side and their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairCost {
    pub total: Option<Decimal>,
    pub avg_yes: Option<Decimal>,
    pub avg_no: Option<Decimal>,
}

impl PairCost {
    /// True only when both sides hold shares and the sum is strictly below `threshold`.
    #[must_use]
    pub fn is_below(&self, threshold: Decimal) -> bool {
        self.total.is_some_and(|total| total < threshold)
    }
}

/// Filled quantity and cost per outcome. Only confirmed fills mutate it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionLedger {
    qty_yes: Decimal,
    qty_no: Decimal,
    cost_yes: Decimal,
    cost_no: Decimal,
}

impl PositionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn from_totals(
        qty_yes: Decimal,
        cost_yes: Decimal,
        qty_no: Decimal,
        cost_no: Decimal,
    ) -> Self {
        Self {
            qty_yes,
            qty_no,
            cost_yes,
            cost_no,
        }
    }

    #[must_use]
    pub fn qty(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Yes => self.qty_yes,
            Outcome::No => self.qty_no,
        }
    }

    #[must_use]
    pub fn cost(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Yes => self.cost_yes,
            Outcome::No => self.cost_no,
        }
    }

    #[must_use]
    pub fn qty_yes(&self) -> Decimal {
        self.qty_yes
    }

    #[must_use]
    pub fn qty_no(&self) -> Decimal {
        self.qty_no
    }

    #[must_use]
    pub fn cost_yes(&self) -> Decimal {
        self.cost_yes
    }

    #[must_use]
    pub fn cost_no(&self) -> Decimal {
        self.cost_no
    }

    /// Average entry price for one side, `None` without shares.
    #[must_use]
    pub fn avg_price(&self, outcome: Outcome) -> Option<Decimal> {
        let qty = self.qty(outcome);
        if qty.is_zero() {
            None
        } else {
            Some(self.cost(outcome) / qty)
        }
    }

    #[must_use]
    pub fn pair_cost(&self) -> PairCost {
        let avg_yes = self.avg_price(Outcome::Yes);
        let avg_no = self.avg_price(Outcome::No);
        PairCost {
            total: avg_yes.zip(avg_no).map(|(yes, no)| yes + no),
            avg_yes,
            avg_no,
        }
    }

    /// Ledger as it would be after buying `qty` of `outcome` at `price`.
    #[must_use]
    pub fn simulate_buy(&self, outcome: Outcome, price: Decimal, qty: Decimal) -> Self {
        let mut next = *self;
        let cost = price * qty;
        match outcome {
            Outcome::Yes => {
                next.qty_yes += qty;
                next.cost_yes += cost;
            }
            Outcome::No => {
                next.qty_no += qty;
                next.cost_no += cost;
            }
        }
        next
    }

    /// Books a confirmed fill.
    pub fn update_after_fill(&mut self, outcome: Outcome, price: Decimal, qty: Decimal) {
        *self = self.simulate_buy(outcome, price, qty);
    }

    /// Shares that pay out whichever outcome resolves true.
    #[must_use]
    pub fn guaranteed_payout(&self) -> Decimal {
        self.qty_yes.min(self.qty_no)
    }

    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        self.cost_yes + self.cost_no
    }

    #[must_use]
    pub fn locked_profit(&self) -> Decimal {
        self.guaranteed_payout() - self.total_cost()
    }

    /// |qty_yes - qty_no| / max(qty_yes, qty_no), zero for an empty ledger.
    #[must_use]
    pub fn imbalance_ratio(&self) -> Decimal {
        let max = self.qty_yes.max(self.qty_no);
        if max.is_zero() {
            return Decimal::ZERO;
        }
        (self.qty_yes - self.qty_no).abs() / max
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qty_yes.is_zero() && self.qty_no.is_zero()
    }
}
