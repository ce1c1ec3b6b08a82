use rust_decimal::Decimal;

use crate::account::AccountNumber;
use crate::bank::BankTransaction;
use crate::config::{is_whole_cents, Config, TemplateId};
use crate::valuta::Valuta;

/// Index into the journal's entry arena.
pub type EntryId = usize;

/// The verb of a journal line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verb {
    /// `2017-01-04a b 90.00 mitgliederbeitrag VCS` — a confirmed posting.
    Booking,
    /// `2017-01-04a vorschlag 90.00 ...` — an unconfirmed proposal,
    /// ignored on re-read.
    Proposal,
    /// `2017-01-04a f 90.00 ...` — materialized from a voucher filename.
    Voucher,
}

impl Verb {
    pub fn keyword(&self) -> &'static str {
        match self {
            Verb::Booking => "b",
            Verb::Proposal => "vorschlag",
            Verb::Voucher => "f",
        }
    }
}

/// Where a proposal or binding came from.
#[derive(Clone, Debug)]
pub struct BankOrigin {
    /// Name of the bank account, e.g. "ZKB Sparkonto".
    pub source: String,
    pub line_nr: u32,
    pub description: String,
}

/// A journal entry: one double-entry transaction before splitting.
///
/// Entries are never deleted; an invalid entry keeps its attached errors
/// and round-trips to the output.  The original input line is kept
/// verbatim so an unmodified entry re-serializes byte-identically.
#[derive(Clone, Debug)]
pub struct Entry {
    pub verb: Verb,
    pub reference: String,
    pub valuta: Valuta,
    pub amount: Decimal,
    pub debit: AccountNumber,
    pub credit: AccountNumber,
    pub vat: Option<String>,
    pub template: TemplateId,
    pub comment: String,
    pub tags: Vec<String>,
    pub todos: Vec<String>,
    pub errors: Vec<String>,
    pub comments: Vec<String>,
    /// Set once a bank transaction is bound to this entry (or produced it).
    pub bank_origin: Option<BankOrigin>,
    /// The journal line this entry (re-)serializes to.
    pub line: String,
}

impl Entry {
    /// Builds an entry from a parsed journal line or voucher filename.
    ///
    /// Unresolvable instruction tokens attach errors but never abort; the
    /// entry falls back to the configured default template so the line
    /// survives the round-trip.
    pub fn from_instruction(
        config: &Config,
        verb: Verb,
        reference: String,
        valuta: Valuta,
        amount: Decimal,
        instruction: &str,
        comment: String,
        line: String,
    ) -> Entry {
        let resolved = config.resolve_instruction(instruction);
        let mut entry = Entry {
            verb,
            reference,
            valuta,
            amount,
            debit: resolved.debit,
            credit: resolved.credit,
            vat: resolved.vat,
            template: resolved.template,
            comment,
            tags: resolved.tags,
            todos: Vec::new(),
            errors: resolved.errors,
            comments: Vec::new(),
            bank_origin: None,
            line,
        };
        entry.check_whole_cents();
        entry
    }

    /// Synthesizes a proposal for a bank transaction that matched no
    /// journal entry: the first search-text rule whose pattern occurs in
    /// the description wins, otherwise the bank account's fallback
    /// template for the transaction direction.
    pub fn proposal(
        config: &Config,
        bank_account: AccountNumber,
        txn: &BankTransaction,
        reference: String,
    ) -> Entry {
        let mut book_directly = false;
        let mut comment = String::new();
        let chain;
        let template_id;

        if let Some(rule) = config.find_proposal_rule(&txn.description) {
            book_directly = rule.book_directly;
            template_id = rule.template();
            comment = rule.comment.clone();
            chain = rule.instruction.clone();
        } else {
            let pair = config.account_fallbacks(bank_account);
            let fallback = if txn.is_credit() {
                &pair.credit
            } else {
                &pair.debit
            };
            template_id = fallback.template;
            chain = fallback.chain.clone();
            if config.template(template_id).text.is_empty() {
                // No fixed text configured: carry the bank's description.
                comment = txn.description.clone();
            }
        }

        let template = config.template(template_id);
        let mut debit = template.debit;
        let mut credit = template.credit;
        // A credit transaction must debit the bank account (and the other
        // way round); flip the template if it is oriented the wrong way.
        if (credit == bank_account) == txn.is_credit() {
            std::mem::swap(&mut debit, &mut credit);
        }

        let verb = if book_directly {
            Verb::Booking
        } else {
            Verb::Proposal
        };
        let mut line = format!(
            "{} {} {:.2} {} {} {}",
            reference,
            verb.keyword(),
            txn.amount,
            chain,
            template.text,
            comment
        );
        while line.contains("  ") {
            line = line.replace("  ", " ");
        }

        let mut entry = Entry {
            verb,
            reference,
            valuta: txn.valuta,
            amount: txn.amount,
            debit,
            credit,
            vat: template.vat.clone(),
            template: template_id,
            comment,
            tags: Vec::new(),
            todos: Vec::new(),
            errors: Vec::new(),
            comments: vec![format!("{}: {}", Verb::Proposal.keyword(), txn.comment)],
            bank_origin: Some(txn.origin()),
            line: line.trim_end().to_string(),
        };
        entry.check_whole_cents();
        entry
    }

    fn check_whole_cents(&mut self) {
        if !is_whole_cents(self.amount) {
            self.errors.push(format!(
                "the amount {} is not rounded to a whole cent!",
                self.amount
            ));
        }
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.todos.is_empty() || !self.errors.is_empty() || !self.comments.is_empty()
    }

    /// Serializes the attached diagnostics and the line itself.
    pub fn write(&self, out: &mut String) {
        for todo in &self.todos {
            out.push_str(&format!("todo next line: {}\n", todo));
        }
        for error in &self.errors {
            out.push_str(&format!("fehler next line: {}\n", error));
        }
        for comment in &self.comments {
            out.push_str(&format!("# {}\n", comment));
        }
        out.push_str(&self.line);
        out.push('\n');
    }
}
