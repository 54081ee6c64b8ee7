//! Trade admissibility rules and the profit-lock stop condition.

use super::ledger::PositionLedger;
use super::types::Outcome;
use algo_trade_core::HedgeConfig;
use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of evaluating a candidate buy, naming the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// Pair cost and imbalance are both within limits.
    Approved,
    /// Only one side would hold shares; always allowed so the pair can form.
    SeedFirstLeg,
    /// The candidate pair cost would reach the target.
    PairCostTooHigh { pair_cost: Decimal },
    /// The candidate imbalance ratio would exceed the slack.
    Imbalanced { ratio: Decimal },
}

impl Decision {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::SeedFirstLeg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionEngine {
    target_pair_cost: Decimal,
    balance_slack: Decimal,
}

impl DecisionEngine {
    #[must_use]
    pub fn new(target_pair_cost: Decimal, balance_slack: Decimal) -> Self {
        Self {
            target_pair_cost,
            balance_slack,
        }
    }

    #[must_use]
    pub fn from_config(config: &HedgeConfig) -> Self {
        Self::new(config.target_pair_cost, config.balance_slack)
    }

    #[must_use]
    pub fn target_pair_cost(&self) -> Decimal {
        self.target_pair_cost
    }

    #[must_use]
    pub fn balance_slack(&self) -> Decimal {
        self.balance_slack
    }

    /// Evaluates buying `qty` of `outcome` at `price` on top of `ledger`.
    ///
    /// Rules apply in order: a defined candidate pair cost at or above the
    /// target rejects; a one-sided candidate is allowed; otherwise the
    /// candidate imbalance ratio must not exceed the slack.
    #[must_use]
    pub fn evaluate(
        &self,
        outcome: Outcome,
        price: Decimal,
        qty: Decimal,
        ledger: &PositionLedger,
    ) -> Decision {
        let candidate = ledger.simulate_buy(outcome, price, qty);

        if let Some(pair_cost) = candidate.pair_cost().total {
            if pair_cost >= self.target_pair_cost {
                return Decision::PairCostTooHigh { pair_cost };
            }
        }

        let (qty_yes, qty_no) = (candidate.qty_yes(), candidate.qty_no());
        if qty_yes.is_zero() != qty_no.is_zero() {
            return Decision::SeedFirstLeg;
        }

        let ratio = candidate.imbalance_ratio();
        if ratio > self.balance_slack {
            return Decision::Imbalanced { ratio };
        }

        Decision::Approved
    }

    #[must_use]
    pub fn should_buy(
        &self,
        outcome: Outcome,
        price: Decimal,
        qty: Decimal,
        ledger: &PositionLedger,
    ) -> bool {
        self.evaluate(outcome, price, qty, ledger).is_approved()
    }

    /// True once both sides are held below a combined cost of 1 with positive locked profit.
    #[must_use]
    pub fn lock_condition(ledger: &PositionLedger) -> bool {
        ledger.pair_cost().is_below(Decimal::ONE) && ledger.locked_profit() > Decimal::ZERO
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::from_config(&HedgeConfig::default())
    }
}
