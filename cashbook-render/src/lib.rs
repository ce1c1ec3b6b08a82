//! Plain-text presentation over the validated ledger: one account page
//! per account, the closing report, the template summary and the tag
//! export.  Rendering never mutates the ledger.

use std::{io, io::Write};

use thiserror::Error;

use cashbook_core::closing::{ClosingReport, ReportItem, SectionReport};
use cashbook_core::tags;
use cashbook_core::{Account, Book, Config, Journal, Relation};


#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct TextRenderer {}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Error, Debug)]
pub enum TextRendererError {
    #[error("an io error occurred")]
    Io(#[from] io::Error),
    #[error("could not assemble the closing report")]
    Closing(#[from] cashbook_core::LedgerError),
}

pub trait Renderer<T, W: Write> {
    type Error;
    fn render(&self, renderable: T, write: &mut W) -> Result<(), Self::Error>;
}

/// One ledger account-page: opening balance, one row per leg in
/// day/reference order, per-day balances, end-of-account balance.
pub struct AccountPage<'a> {
    pub config: &'a Config,
    pub journal: &'a Journal,
    pub book: &'a Book,
    pub account: &'a Account,
}

impl<'a, W: Write> Renderer<&'a AccountPage<'_>, W> for TextRenderer {
    type Error = TextRendererError;

    fn render(&self, page: &'a AccountPage<'_>, write: &mut W) -> Result<(), Self::Error> {
        let account = page.account;
        writeln!(write, "Account {}: {}", account.number, account.text)?;
        writeln!(write, "Opening balance: {:.2}", account.opening_balance)?;
        if let Some(days) = page.journal.account_days(account.number) {
            for day in days.iter() {
                for &leg_id in day.legs() {
                    let leg = page.book.leg(leg_id);
                    let entry = page.journal.entry(leg.entry);
                    let relation = match leg.relation {
                        Relation::Debit => "D",
                        Relation::Credit => "C",
                    };
                    let counter = leg
                        .opposing
                        .map(|id| page.book.leg(id).account.to_string())
                        .unwrap_or_default();
                    let template = &page.config.template(entry.template).name;
                    let vat_marker = if leg.is_vat { " VAT" } else { "" };
                    writeln!(
                        write,
                        "{}, {:.2} {}{}, counter {}, '{}' {}",
                        entry.reference, leg.amount, relation, vat_marker, counter, template,
                        entry.comment
                    )?;
                }
                if let Some(balance) = day.balance() {
                    if !day.legs().is_empty() {
                        writeln!(
                            write,
                            "  balance {}: {:.2}",
                            page.config.period.format(day.valuta),
                            balance
                        )?;
                    }
                }
            }
        }
        writeln!(write, "Balance: {:.2}", page.book.saldo(account.number))?;
        Ok(())
    }
}

impl<'a, W: Write> Renderer<&'a SectionReport, W> for TextRenderer {
    type Error = TextRendererError;

    fn render(&self, section: &'a SectionReport, write: &mut W) -> Result<(), Self::Error> {
        writeln!(write, "{}", section.title)?;
        for item in &section.items {
            match item {
                ReportItem::Heading(title) => writeln!(write, "  -- {}", title)?,
                ReportItem::Line {
                    account,
                    text,
                    amount,
                } => writeln!(write, "  {} {} {:.2}", account, text, amount)?,
                ReportItem::Subtotal { title, amount } => {
                    writeln!(write, "  subtotal {}: {:.2}", title, amount)?
                }
            }
        }
        writeln!(write, "Total {}: {:.2}", section.title, section.total)?;
        Ok(())
    }
}

/// The closing report with the period dates for the page titles.
pub struct ClosingView<'a> {
    pub config: &'a Config,
    pub report: &'a ClosingReport,
}

impl<'a, W: Write> Renderer<&'a ClosingView<'_>, W> for TextRenderer {
    type Error = TextRendererError;

    fn render(&self, view: &'a ClosingView<'_>, write: &mut W) -> Result<(), Self::Error> {
        let period = &view.config.period;
        let start = period.format(period.start());
        let end = period.format(period.end());

        writeln!(write, "Income statement {} to {}", start, end)?;
        self.render(&view.report.income.0, write)?;
        self.render(&view.report.income.1, write)?;

        writeln!(write, "Opening balance sheet as of {}", start)?;
        self.render(&view.report.opening_balance.0, write)?;
        self.render(&view.report.opening_balance.1, write)?;

        writeln!(write, "Closing balance sheet as of {}", end)?;
        self.render(&view.report.closing_balance.0, write)?;
        self.render(&view.report.closing_balance.1, write)?;
        Ok(())
    }
}

/// Usage counts per posting template.
pub struct TemplateSummary<'a> {
    pub config: &'a Config,
    pub journal: &'a Journal,
}

impl<'a, W: Write> Renderer<&'a TemplateSummary<'_>, W> for TextRenderer {
    type Error = TextRendererError;

    fn render(&self, summary: &'a TemplateSummary<'_>, write: &mut W) -> Result<(), Self::Error> {
        writeln!(write, "count template debit credit text")?;
        let statistics = summary.journal.template_statistics();
        let mut templates: Vec<_> = summary.config.templates().collect();
        templates.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        for (id, template) in templates {
            let count = statistics.get(&id).copied().unwrap_or(0);
            writeln!(
                write,
                "{} {} {} {} {}",
                count, template.name, template.debit, template.credit, template.text
            )?;
        }
        Ok(())
    }
}

/// Tab-separated tag export, one group per tag with a trailing sum row.
pub struct TagExport<'a> {
    pub config: &'a Config,
    pub journal: &'a Journal,
}

impl<'a, W: Write> Renderer<&'a TagExport<'_>, W> for TextRenderer {
    type Error = TextRendererError;

    fn render(&self, export: &'a TagExport<'_>, write: &mut W) -> Result<(), Self::Error> {
        writeln!(
            write,
            "tag\treference\tvaluta\tamount\tdebit\tcredit\ttemplate\tcomment\ttags\tbank"
        )?;
        for group in tags::tag_groups(export.journal, export.config) {
            for row in &group.rows {
                writeln!(
                    write,
                    "{}\t{}\t{}\t{:.2}\t{}\t{}\t{}\t{}\t{}\t{}",
                    group.tag,
                    row.reference,
                    row.valuta,
                    row.amount,
                    row.debit,
                    row.credit,
                    row.template,
                    row.comment,
                    row.all_tags,
                    row.bank_description
                )?;
            }
            writeln!(write, "sum\t\t\t{:.2}", group.sum)?;
        }
        Ok(())
    }
}

/// Renders one page per account that has legs.
pub fn render_book<W: Write>(
    write: &mut W,
    config: &Config,
    journal: &Journal,
    book: &Book,
) -> Result<(), TextRendererError> {
    let renderer = TextRenderer::default();
    for account in config.accounts() {
        let has_legs = journal
            .account_days(account.number)
            .map(|days| days.iter().any(|day| !day.legs().is_empty()))
            .unwrap_or(false);
        if !has_legs {
            continue;
        }
        let page = AccountPage {
            config,
            journal,
            book,
            account,
        };
        renderer.render(&page, write)?;
        writeln!(write)?;
    }
    Ok(())
}

/// Renders the full report set: closing, template summary, account pages.
pub fn render_reports<W: Write>(
    write: &mut W,
    config: &Config,
    journal: &Journal,
    book: &Book,
) -> Result<(), TextRendererError> {
    let renderer = TextRenderer::default();
    writeln!(write, "Bookkeeping {} {}", config.organisation, config.year_label)?;
    writeln!(write)?;
    let report = ClosingReport::build(config, book)?;
    renderer.render(&ClosingView { config, report: &report }, write)?;
    writeln!(write)?;
    renderer.render(&TemplateSummary { config, journal }, write)?;
    writeln!(write)?;
    render_book(write, config, journal, book)?;
    Ok(())
}
