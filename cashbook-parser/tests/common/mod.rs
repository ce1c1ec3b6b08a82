use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cashbook_core::account::{Account, AccountKind};
use cashbook_core::config::{ClosingSection, VatScheme};
use cashbook_core::{Config, Period};

/// Standard test chart: two assets, two liabilities, income and expense
/// accounts; opening balances sum to zero.
pub fn config() -> Config {
    let period = Period::from_dates("2017-01-01", "2017-12-31").unwrap();
    let account = |number: u32, kind, text: &str, opening: Decimal| {
        Account::builder()
            .number(number)
            .kind(kind)
            .text(text.to_string())
            .opening_balance(opening)
            .build()
    };
    Config::builder(period, VatScheme::Effective)
        .organisation("Muster GmbH", "2017")
        .account(account(1000, AccountKind::Asset, "Kasse", dec!(100.00)))
        .account(account(1020, AccountKind::Asset, "Bankkonto", dec!(900.00)))
        .account(account(2000, AccountKind::Liability, "Privat", dec!(1000.00)))
        .account(account(2200, AccountKind::Liability, "Geschuldete MWST", Decimal::ZERO))
        .account(account(3400, AccountKind::Income, "Dienstleistungen", Decimal::ZERO))
        .account(account(6500, AccountKind::Expense, "Verbrauchsmaterial", Decimal::ZERO))
        .vat_rate("VSB77", dec!(7.7), 2200, "owed VAT 7.7%")
        .vat_exempt_code("ohneMwst")
        .template("einnahmen", 1020, 3400, None, "")
        .template("verbrauch", 6500, 1020, Some("VSB77"), "consumables")
        .template("buch", 6500, 1000, None, "books")
        .template("privat", 1020, 2000, None, "")
        .template("gewinn", 3400, 2000, None, "profit")
        .fallback(1020, "privat", "privat")
        .bank_link("Testbank", 1020, true, true)
        .profit_template("gewinn")
        .balance_structure(
            ClosingSection::new("Assets").account(1000).account(1020),
            ClosingSection::new("Liabilities").account(2000).account(2200),
        )
        .income_structure(
            ClosingSection::new("Income").account(3400),
            ClosingSection::new("Expenses").account(6500),
        )
        .build()
        .unwrap()
}
