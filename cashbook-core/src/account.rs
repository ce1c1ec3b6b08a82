use std::fmt;

use rust_decimal::Decimal;
use typed_builder::TypedBuilder;

/// Account number in the chart of accounts, e.g. `1000` for the cash box.
pub type AccountNumber = u32;

/// The four account categories of the chart of accounts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AccountKind {
    Asset,
    Liability,
    Income,
    Expense,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountKind::Asset => "Asset",
            AccountKind::Liability => "Liability",
            AccountKind::Income => "Income",
            AccountKind::Expense => "Expense",
        };
        write!(f, "{}", name)
    }
}

/// One account of the chart of accounts, e.g. `1500 / office furniture`.
///
/// Accounts are immutable configuration; everything that changes during a
/// run (legs, balances) lives in the journal's per-account day records.
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
pub struct Account {
    pub number: AccountNumber,

    pub kind: AccountKind,

    /// Display text, e.g. "office furniture".
    pub text: String,

    /// Balance at the period start.
    #[builder(default)]
    pub opening_balance: Decimal,
}

impl Account {
    /// Asset or Liability: the account appears on the balance sheet.
    pub fn is_balance_sheet(&self) -> bool {
        matches!(self.kind, AccountKind::Asset | AccountKind::Liability)
    }

    /// Income or Expense: the account appears on the income statement.
    pub fn is_income_statement(&self) -> bool {
        matches!(self.kind, AccountKind::Income | AccountKind::Expense)
    }

    /// Normally a balance is debit minus credit.  For these accounts it is
    /// credit minus debit.
    pub fn is_credit_normal(&self) -> bool {
        matches!(self.kind, AccountKind::Income | AccountKind::Liability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountKind) -> Account {
        Account::builder()
            .number(1000u32)
            .kind(kind)
            .text("test".to_string())
            .build()
    }

    #[test]
    fn derived_flags() {
        assert!(account(AccountKind::Asset).is_balance_sheet());
        assert!(account(AccountKind::Liability).is_balance_sheet());
        assert!(!account(AccountKind::Income).is_balance_sheet());

        assert!(account(AccountKind::Income).is_income_statement());
        assert!(account(AccountKind::Expense).is_income_statement());
        assert!(!account(AccountKind::Asset).is_income_statement());

        assert!(account(AccountKind::Income).is_credit_normal());
        assert!(account(AccountKind::Liability).is_credit_normal());
        assert!(!account(AccountKind::Asset).is_credit_normal());
        assert!(!account(AccountKind::Expense).is_credit_normal());
    }
}
