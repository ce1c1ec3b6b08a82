use log::debug;
use rust_decimal::Decimal;

use crate::book::Book;
use crate::config::{ClosingLine, ClosingSection, Config, Constraint};
use crate::error::LedgerError;
use crate::journal::Journal;

/// Which value a balance-sheet line shows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Column {
    Opening,
    Closing,
}

/// One rendered line of a closing section.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportItem {
    Heading(String),
    Line {
        account: u32,
        text: String,
        amount: Decimal,
    },
    Subtotal {
        title: String,
        amount: Decimal,
    },
}

/// One side of a closing statement with its grand total.
#[derive(Clone, Debug)]
pub struct SectionReport {
    pub title: String,
    pub items: Vec<ReportItem>,
    pub total: Decimal,
}

/// The closing: income statement plus opening and closing balance sheet,
/// pure data for the renderers.
#[derive(Clone, Debug)]
pub struct ClosingReport {
    pub income: (SectionReport, SectionReport),
    pub opening_balance: (SectionReport, SectionReport),
    pub closing_balance: (SectionReport, SectionReport),
}

impl ClosingReport {
    pub fn build(config: &Config, book: &Book) -> Result<ClosingReport, LedgerError> {
        Ok(ClosingReport {
            income: (
                section(config, book, &config.income_structure.first, Column::Closing)?,
                section(config, book, &config.income_structure.second, Column::Closing)?,
            ),
            opening_balance: (
                section(config, book, &config.balance_structure.first, Column::Opening)?,
                section(config, book, &config.balance_structure.second, Column::Opening)?,
            ),
            closing_balance: (
                section(config, book, &config.balance_structure.first, Column::Closing)?,
                section(config, book, &config.balance_structure.second, Column::Closing)?,
            ),
        })
    }

    /// `Σ(assets) − Σ(liabilities)` at the period start; must be zero.
    pub fn opening_difference(&self) -> Decimal {
        self.opening_balance.0.total - self.opening_balance.1.total
    }

    /// `Σ(assets) − Σ(liabilities)` at the period end; must be zero once
    /// the profit posting exists.
    pub fn closing_difference(&self) -> Decimal {
        self.closing_balance.0.total - self.closing_balance.1.total
    }

    /// `Σ(income) − Σ(expenses)`; must be zero once the profit posting
    /// exists.
    pub fn income_difference(&self) -> Decimal {
        self.income.0.total - self.income.1.total
    }
}

fn section(
    config: &Config,
    book: &Book,
    structure: &ClosingSection,
    column: Column,
) -> Result<SectionReport, LedgerError> {
    let mut items = Vec::new();
    let mut total = Decimal::ZERO;
    let mut subtotal: Option<(String, Decimal)> = None;

    for line in &structure.lines {
        match line {
            ClosingLine::Heading(title) => {
                if let Some((title, amount)) = subtotal.take() {
                    items.push(ReportItem::Subtotal { title, amount });
                }
                items.push(ReportItem::Heading(title.clone()));
                subtotal = Some((title.clone(), Decimal::ZERO));
            }
            ClosingLine::Account(number) => {
                let account = config.account(*number)?;
                let amount = match column {
                    Column::Opening => account.opening_balance,
                    Column::Closing => book.saldo(*number),
                };
                if amount != Decimal::ZERO {
                    // Accounts with a zero balance are skipped.
                    items.push(ReportItem::Line {
                        account: *number,
                        text: account.text.clone(),
                        amount,
                    });
                    total += amount;
                }
                if let Some((_, sum)) = &mut subtotal {
                    *sum += amount;
                }
            }
        }
    }
    if let Some((title, amount)) = subtotal.take() {
        items.push(ReportItem::Subtotal { title, amount });
    }

    Ok(SectionReport {
        title: structure.title.clone(),
        items,
        total,
    })
}

/// Validates the zero-sum invariants: the opening balance sheet on every
/// run; the closing balance sheet and the income statement once the
/// profit posting has been recorded.
pub fn validate(journal: &mut Journal, config: &Config, book: &Book) -> Result<(), LedgerError> {
    let report = ClosingReport::build(config, book)?;
    debug!(
        "closing: opening {:.2}, closing {:.2}, income {:.2}",
        report.opening_difference(),
        report.closing_difference(),
        report.income_difference()
    );
    check(journal, "opening balance sheet", report.opening_difference());
    if journal.profit_entry().is_some() {
        check(journal, "closing balance sheet", report.closing_difference());
        check(journal, "income statement", report.income_difference());
    }
    Ok(())
}

fn check(journal: &mut Journal, text: &str, balance: Decimal) {
    if balance != Decimal::ZERO {
        journal.push_top_error(format!(
            "the {} is off by {:.2}, but should be 0!",
            text, balance
        ));
    }
}

/// Applies the configured balance constraints after all balances settled.
pub fn apply_constraints(journal: &mut Journal, config: &Config, book: &Book) {
    for constraint in config.constraints() {
        match constraint {
            Constraint::ZeroBalanceEveryDay(account) => {
                let mut violations = Vec::new();
                if let Some(days) = journal.account_days(*account) {
                    for day in days.iter() {
                        if let Some(balance) = day.balance() {
                            if balance != Decimal::ZERO {
                                violations.push((day.valuta, balance));
                            }
                        }
                    }
                }
                for (valuta, balance) in violations {
                    if let Some(days) = journal.account_days_mut(*account) {
                        if let Ok(Some(day)) = days.get_mut(valuta) {
                            day.errors.push(format!(
                                "the balance of account {} is {:.2}, but should be 0.00!",
                                account, balance
                            ));
                        }
                    }
                }
            }
            Constraint::ZeroBalanceAtClosing(account) => {
                let profit_entry = match journal.profit_entry() {
                    Some(id) => id,
                    None => continue,
                };
                let valuta = journal.entry(profit_entry).valuta;
                let saldo = book.saldo_at(journal, *account, valuta);
                if saldo != Decimal::ZERO {
                    let text = config
                        .account(*account)
                        .map(|account| account.text.clone())
                        .unwrap_or_default();
                    journal.entry_mut(profit_entry).errors.push(format!(
                        "the profit was booked. The balance of account {} '{}' is {:.2}, \
                         but should be 0.00!",
                        account, text, saldo
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Book;
    use crate::testing;
    use rust_decimal_macros::dec;

    #[test]
    fn balanced_opening_passes() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        let book = Book::post(&mut journal, &config).unwrap();
        validate(&mut journal, &config, &book).unwrap();
        assert!(journal.top_errors().is_empty());
    }

    #[test]
    fn unbalanced_opening_is_flagged() {
        // Liability opens at 999 against 1000 of assets.
        let config = testing::builder_with_openings(dec!(100.00), dec!(900.00), dec!(999.00))
            .build()
            .unwrap();
        let mut journal = Journal::new(&config);
        let book = Book::post(&mut journal, &config).unwrap();
        validate(&mut journal, &config, &book).unwrap();
        assert_eq!(journal.top_errors().len(), 1);
        let mut out = String::new();
        journal.top_errors()[0].write(&mut out);
        assert!(out.contains("opening balance sheet"));
        assert!(out.contains("1.00"));
    }

    #[test]
    fn closing_checks_wait_for_the_profit_posting() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-06-01a", dec!(50.00), "einnahmen"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();
        validate(&mut journal, &config, &book).unwrap();
        // Assets grew by 50 with no closing posting, but without a profit
        // entry only the opening balance sheet is validated.
        assert!(journal.top_errors().is_empty());
    }

    #[test]
    fn correct_profit_posting_closes_to_zero() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-06-01a", dec!(50.00), "einnahmen"),
            )
            .unwrap();
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-12-31a", dec!(50.00), "gewinn"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();
        validate(&mut journal, &config, &book).unwrap();
        assert!(journal.top_errors().is_empty());
    }

    #[test]
    fn wrong_profit_posting_flags_both_statements() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-06-01a", dec!(50.00), "einnahmen"),
            )
            .unwrap();
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-12-31a", dec!(30.00), "gewinn"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();
        validate(&mut journal, &config, &book).unwrap();
        assert_eq!(journal.top_errors().len(), 2);
    }

    #[test]
    fn report_groups_accounts_under_headings() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        let book = Book::post(&mut journal, &config).unwrap();
        let report = ClosingReport::build(&config, &book).unwrap();

        let assets = &report.opening_balance.0;
        assert_eq!(assets.total, dec!(1000.00));
        assert_eq!(assets.items[0], ReportItem::Heading("current assets".to_string()));
        assert!(matches!(
            assets.items.last(),
            Some(ReportItem::Subtotal { amount, .. }) if *amount == dec!(1000.00)
        ));
    }

    #[test]
    fn zero_balance_every_day_constraint() {
        let config = testing::base_builder()
            .constraint(Constraint::ZeroBalanceEveryDay(1000))
            .build()
            .unwrap();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-03-01a", dec!(10.00), "bar"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();
        apply_constraints(&mut journal, &config, &book);

        let valuta = config.period.parse_valuta("2017-03-01").unwrap();
        let day = journal
            .account_days(1000)
            .unwrap()
            .get(valuta)
            .unwrap()
            .unwrap();
        assert_eq!(day.errors.len(), 1);
        assert!(day.errors[0].contains("should be 0.00"));
    }

    #[test]
    fn zero_balance_at_closing_constraint() {
        let config = testing::base_builder()
            .constraint(Constraint::ZeroBalanceAtClosing(1000))
            .build()
            .unwrap();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-03-01a", dec!(10.00), "bar"),
            )
            .unwrap();
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-12-31a", dec!(0.00), "gewinn"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();
        apply_constraints(&mut journal, &config, &book);

        let profit = journal.profit_entry().unwrap();
        assert_eq!(journal.entry(profit).errors.len(), 1);
        assert!(journal.entry(profit).errors[0].contains("profit was booked"));
    }
}
