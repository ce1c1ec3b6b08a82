use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::AccountKind;

/// Fatal configuration and input errors.
///
/// Everything in here aborts the run before any output is written.  Data
/// errors (an unparsable journal line, a bank amount that does not match,
/// a balance sheet that does not close) never show up as a `LedgerError`;
/// they are attached as diagnostics to the entry, day or account-day they
/// belong to and re-emitted with the regenerated journal.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account '{0}' is not defined in the chart of accounts")]
    UnknownAccount(u32),

    #[error("account '{0}' was already added to the chart of accounts")]
    DuplicateAccount(u32),

    #[error("posting template '{0}' is not defined")]
    UnknownTemplate(String),

    #[error("posting template '{0}' was already defined")]
    DuplicateTemplate(String),

    #[error(
        "template '{name}': only certain account combinations are allowed: \
         account {debit} is {debit_kind}, account {credit} is {credit_kind}"
    )]
    TemplateCombination {
        name: String,
        debit: u32,
        debit_kind: AccountKind,
        credit: u32,
        credit_kind: AccountKind,
    },

    #[error("VAT code '{0}' is not known")]
    UnknownVatCode(String),

    #[error("VAT code '{0}' was already defined")]
    DuplicateVatCode(String),

    #[error("proposal rule '{pattern}': instruction token '{token}' cannot be resolved")]
    UnresolvedRuleToken { pattern: String, token: String },

    #[error("VAT configuration is incomplete: '{0}' must be defined")]
    VatIncomplete(&'static str),

    #[error("account swap '{0}' was already defined")]
    DuplicateSwap(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid period: {end} ends before {start}")]
    InvalidPeriod { start: String, end: String },

    #[error("the date {date} is {days} days before the start of the accounting period")]
    BeforePeriod { date: String, days: i64 },

    #[error("the date {date} is {days} days after the end of the accounting period")]
    AfterPeriod { date: String, days: i64 },

    #[error("error parsing mapping line '{0}'")]
    MalformedMappingLine(String),

    #[error(
        "account '{account}': the opening balance in '{file}' is {found}, \
         but the configuration says {expected}"
    )]
    OpeningBalanceMismatch {
        account: u32,
        file: String,
        found: Decimal,
        expected: Decimal,
    },

    #[error("bank statement '{file}': transactions are not in ascending date order (record {line})")]
    UnorderedStatement { file: String, line: u32 },

    #[error("a fallback posting template must be configured for at least one account")]
    MissingFallback,

    #[error("a profit posting template must be configured")]
    MissingProfitTemplate,

    #[error("bank account '{name}': account {account} has no fallback posting templates")]
    BankFallbackMissing { name: String, account: u32 },

    #[error("io error")]
    Io(#[from] std::io::Error),
}
