//! Data model and engines for cashbook, a batch double-entry bookkeeping
//! tool over a hand-maintained plain-text journal.
//!
//! The crate owns the period-scoped value dates, the chart of accounts and
//! the static configuration, the journal entry/day model with attached
//! diagnostics, the bank reconciliation engine, the posting/VAT engine and
//! the closing validator.  Parsing the journal text lives in
//! `cashbook-parser`; rendering reports lives in `cashbook-render`.

pub use account::{Account, AccountKind, AccountNumber};
pub use bank::{BankSource, BankTransaction, Direction, MappingStore, Reconciliation};
pub use book::{AccountDay, Book, Leg, LegId, Relation};
pub use closing::ClosingReport;
pub use config::{Config, ConfigBuilder, PostingTemplate, TemplateId, VatRate, VatScheme};
pub use entry::{BankOrigin, Entry, EntryId, Verb};
pub use error::LedgerError;
pub use journal::{Journal, JournalDay, TopError};
pub use journal_file::JournalFile;
pub use valuta::{Days, Period, Valuta};

pub mod account;
pub mod bank;
pub mod book;
pub mod closing;
pub mod config;
pub mod entry;
pub mod error;
pub mod journal;
pub mod journal_file;
pub mod reference;
pub mod tags;
pub mod valuta;

#[cfg(test)]
pub(crate) mod testing {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::account::{Account, AccountKind};
    use crate::config::{ClosingSection, Config, ConfigBuilder, VatScheme};
    use crate::entry::{Entry, Verb};
    use crate::valuta::Period;

    /// The standard test chart: two assets, two liabilities, one income
    /// and two expense accounts, opening balances summing to zero.
    pub fn base_builder() -> ConfigBuilder {
        builder_with_openings(dec!(100.00), dec!(900.00), dec!(1000.00))
    }

    pub fn builder_with_openings(
        kasse: Decimal,
        bank: Decimal,
        privat: Decimal,
    ) -> ConfigBuilder {
        let period = Period::from_dates("2017-01-01", "2017-12-31").unwrap();
        let account = |number: u32, kind, text: &str, opening| {
            Account::builder()
                .number(number)
                .kind(kind)
                .text(text.to_string())
                .opening_balance(opening)
                .build()
        };
        Config::builder(period, VatScheme::Effective)
            .organisation("Muster GmbH", "2017")
            .account(account(1000, AccountKind::Asset, "Kasse", kasse))
            .account(account(1020, AccountKind::Asset, "Bankkonto", bank))
            .account(account(2000, AccountKind::Liability, "Privat", privat))
            .account(account(2200, AccountKind::Liability, "Geschuldete MWST", Decimal::ZERO))
            .account(account(3400, AccountKind::Income, "Dienstleistungen", Decimal::ZERO))
            .account(account(4400, AccountKind::Expense, "Aufwand Dritter", Decimal::ZERO))
            .account(account(6500, AccountKind::Expense, "Verbrauchsmaterial", Decimal::ZERO))
            .vat_rate("VSB77", dec!(7.7), 2200, "owed VAT 7.7%")
            .vat_exempt_code("ohneMwst")
            .template("einnahmen", 1020, 3400, None, "")
            .template("verbrauch", 6500, 1020, Some("VSB77"), "consumables")
            .template("bar", 1000, 1020, None, "cash withdrawal")
            .template("privat", 1020, 2000, None, "")
            .template("gewinn", 3400, 2000, None, "profit")
            .fallback(1020, "privat", "privat")
            .bank_link("Testbank", 1020, true, true)
            .profit_template("gewinn")
            .balance_structure(
                ClosingSection::new("Assets")
                    .heading("current assets")
                    .account(1000)
                    .account(1020),
                ClosingSection::new("Liabilities").account(2000).account(2200),
            )
            .income_structure(
                ClosingSection::new("Income").account(3400),
                ClosingSection::new("Expenses").account(4400).account(6500),
            )
    }

    pub fn config() -> Config {
        base_builder().build().unwrap()
    }

    /// A booking entry built from a reference of the form
    /// `<yyyy-MM-dd><suffix>` and an instruction chain.
    pub fn entry(config: &Config, reference: &str, amount: Decimal, instruction: &str) -> Entry {
        let valuta = config.period.parse_valuta(&reference[..10]).unwrap();
        Entry::from_instruction(
            config,
            Verb::Booking,
            reference.to_string(),
            valuta,
            amount,
            instruction,
            String::new(),
            format!("{} b {:.2} {}", reference, amount, instruction),
        )
    }
}
