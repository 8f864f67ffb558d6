// The outcome of attempting a command.
//
// Every handler, every executor path and every completion callback deals in
// `CommandCost`: a success flag, a money delta, the ledger category the delta
// is booked under, and (on failure) the display-string id explaining why.
//
// A failed cost's money amount is meaningless and is never applied to a
// balance. When a high-level action issues several sub-commands, their
// results are folded with `accumulate`, which short-circuits on the first
// failure:
//
//   accumulate(A, B) = A          if A failed
//                    = B          if A succeeded and B failed
//                    = A.cost + B.cost (A's expense type) otherwise
//
// `CMD_ERROR` is the default failure sentinel: failed, no specific reason.

use crate::strings::{INVALID_STRING_ID, StringId};
use crate::types::{ExpensesType, Money};
use std::iter::Sum;

/// Failed, without a specific reason.
pub const CMD_ERROR: CommandCost = CommandCost::error(INVALID_STRING_ID);

/// Result of a command attempt: success with a cost, or failure with a reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandCost {
    expense: ExpensesType,
    cost: Money,
    message: StringId,
    success: bool,
}

impl CommandCost {
    /// Pure success with zero cost.
    pub const fn new() -> Self {
        Self {
            expense: ExpensesType::Other,
            cost: 0,
            message: INVALID_STRING_ID,
            success: true,
        }
    }

    /// Success costing `cost`, booked under `expense`.
    pub const fn with_cost(expense: ExpensesType, cost: Money) -> Self {
        Self {
            expense,
            cost,
            message: INVALID_STRING_ID,
            success: true,
        }
    }

    /// Failure with the given reason.
    pub const fn error(message: StringId) -> Self {
        Self {
            expense: ExpensesType::Other,
            cost: 0,
            message,
            success: false,
        }
    }

    pub const fn succeeded(&self) -> bool {
        self.success
    }

    pub const fn failed(&self) -> bool {
        !self.success
    }

    /// The money delta. Only meaningful when `succeeded()`.
    pub const fn cost(&self) -> Money {
        self.cost
    }

    pub const fn expense_type(&self) -> ExpensesType {
        self.expense
    }

    /// The failure reason, or `None` on success. A failure without a specific
    /// reason yields `Some(INVALID_STRING_ID)`, which renders as generic text.
    pub const fn error_message(&self) -> Option<StringId> {
        if self.success {
            None
        } else {
            Some(self.message)
        }
    }

    /// Add a plain amount to a successful cost. No-op on failures.
    pub fn add_cost(&mut self, amount: Money) {
        if self.success {
            self.cost = self.cost.saturating_add(amount);
        }
    }

    /// Scale a successful cost, e.g. per-tile price times tile count.
    pub fn multiply_cost(&mut self, factor: i64) {
        if self.success {
            self.cost = self.cost.saturating_mul(factor);
        }
    }

    /// Turn this value into a failure with the given reason.
    pub fn make_error(&mut self, message: StringId) {
        self.success = false;
        self.message = message;
    }

    /// Combine two results, short-circuiting on the first failure.
    #[must_use]
    pub fn accumulate(self, other: CommandCost) -> CommandCost {
        if self.failed() {
            return self;
        }
        if other.failed() {
            return other;
        }
        CommandCost {
            cost: self.cost.saturating_add(other.cost),
            ..self
        }
    }
}

impl Default for CommandCost {
    fn default() -> Self {
        Self::new()
    }
}

impl Sum for CommandCost {
    fn sum<I: Iterator<Item = CommandCost>>(iter: I) -> Self {
        let mut total = CommandCost::new();
        for item in iter {
            total = total.accumulate(item);
            if total.failed() {
                break;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::{ERROR_ALREADY_BUILT, ERROR_TOO_HIGH};
    use proptest::prelude::*;

    #[test]
    fn new_is_free_success() {
        let cost = CommandCost::new();
        assert!(cost.succeeded());
        assert_eq!(cost.cost(), 0);
        assert_eq!(cost.error_message(), None);
    }

    #[test]
    fn cmd_error_has_no_specific_reason() {
        assert!(CMD_ERROR.failed());
        assert_eq!(CMD_ERROR.error_message(), Some(INVALID_STRING_ID));
    }

    #[test]
    fn add_and_multiply() {
        let mut cost = CommandCost::with_cost(ExpensesType::Construction, 100);
        cost.add_cost(50);
        cost.multiply_cost(3);
        assert_eq!(cost.cost(), 450);
        assert_eq!(cost.expense_type(), ExpensesType::Construction);
    }

    #[test]
    fn failures_ignore_cost_changes() {
        let mut cost = CommandCost::error(ERROR_TOO_HIGH);
        cost.add_cost(1000);
        assert_eq!(cost.cost(), 0);
    }

    #[test]
    fn make_error_turns_success_into_failure() {
        let mut cost = CommandCost::with_cost(ExpensesType::Property, 10);
        cost.make_error(ERROR_ALREADY_BUILT);
        assert!(cost.failed());
        assert_eq!(cost.error_message(), Some(ERROR_ALREADY_BUILT));
    }

    #[test]
    fn sum_stops_at_first_failure() {
        let parts = [
            CommandCost::with_cost(ExpensesType::Construction, 10),
            CommandCost::error(ERROR_ALREADY_BUILT),
            CommandCost::error(ERROR_TOO_HIGH),
        ];
        let total: CommandCost = parts.into_iter().sum();
        assert_eq!(total.error_message(), Some(ERROR_ALREADY_BUILT));
    }

    fn arb_cost() -> impl Strategy<Value = CommandCost> {
        prop_oneof![
            (-1_000_000i64..1_000_000)
                .prop_map(|c| CommandCost::with_cost(ExpensesType::Construction, c)),
            (0u16..32).prop_map(|id| CommandCost::error(StringId(id))),
        ]
    }

    proptest! {
        #[test]
        fn accumulate_follows_short_circuit_law(a in arb_cost(), b in arb_cost()) {
            let combined = a.accumulate(b);
            if a.failed() {
                prop_assert_eq!(combined.error_message(), a.error_message());
            } else if b.failed() {
                prop_assert_eq!(combined.error_message(), b.error_message());
            } else {
                prop_assert!(combined.succeeded());
                prop_assert_eq!(combined.cost(), a.cost() + b.cost());
            }
        }
    }
}
