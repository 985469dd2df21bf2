//! Expense-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::{ExpenseId, GroupId, UserId};

/// Events related to shared expenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpenseEvent {
    /// A new expense was recorded and split.
    Added {
        /// The expense.
        expense_id: ExpenseId,
        /// Owning group.
        group_id: GroupId,
        /// Description.
        description: String,
        /// Total amount in minor units.
        amount_cents: i64,
        /// ISO currency code.
        currency: String,
        /// Member who paid.
        paid_by: UserId,
        /// Display name of the payer.
        paid_by_name: String,
        /// Members sharing the expense (may include the payer).
        participants: Vec<UserId>,
    },
    /// A participant paid their split back to the payer.
    SplitPaid {
        /// The expense.
        expense_id: ExpenseId,
        /// Owning group.
        group_id: GroupId,
        /// Description.
        description: String,
        /// Split amount in minor units.
        amount_cents: i64,
        /// ISO currency code.
        currency: String,
        /// Participant who paid their split.
        paid_by: UserId,
        /// Display name of that participant.
        paid_by_name: String,
        /// Member owed the money.
        creditor_id: UserId,
    },
    /// Every split of an expense has been paid.
    FullySettled {
        /// The expense.
        expense_id: ExpenseId,
        /// Owning group.
        group_id: GroupId,
        /// Description.
        description: String,
        /// Total amount in minor units.
        amount_cents: i64,
        /// ISO currency code.
        currency: String,
        /// Member who originally paid.
        creditor_id: UserId,
        /// Members who shared the expense.
        participants: Vec<UserId>,
    },
}

impl ExpenseEvent {
    /// The group owning the expense.
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::Added { group_id, .. }
            | Self::SplitPaid { group_id, .. }
            | Self::FullySettled { group_id, .. } => *group_id,
        }
    }
}

/// Render minor units as `12.34 EUR`.
pub fn format_amount(amount_cents: i64, currency: &str) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{sign}{}.{:02} {currency}", abs / 100, abs % 100)
}
