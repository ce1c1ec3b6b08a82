use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::account::AccountNumber;
use crate::book::AccountDay;
use crate::config::{Config, TemplateId};
use crate::entry::{Entry, EntryId};
use crate::error::LedgerError;
use crate::reference;
use crate::valuta::{Days, Valuta};

/// One value date with at least one entry.
///
/// Owns the entries of the date, enforces reference uniqueness within the
/// date and accumulates day-level errors not tied to a single entry.
#[derive(Debug)]
pub struct JournalDay {
    pub valuta: Valuta,
    entry_ids: Vec<EntryId>,
    references: HashSet<String>,
    pub errors: Vec<String>,
}

impl JournalDay {
    fn new(valuta: Valuta) -> JournalDay {
        JournalDay {
            valuta,
            entry_ids: Vec::new(),
            references: HashSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn entry_ids(&self) -> &[EntryId] {
        &self.entry_ids
    }

    pub fn uses_reference(&self, reference: &str) -> bool {
        self.references.contains(reference)
    }
}

/// A line that could not be attributed to any entry or day: kept apart
/// and re-emitted at the top of the regenerated journal.
#[derive(Debug)]
pub enum TopError {
    Message(String),
    Line {
        line: String,
        error: String,
        comment_out: bool,
    },
}

impl TopError {
    pub fn write(&self, out: &mut String) {
        match self {
            TopError::Message(message) => {
                out.push_str(&format!("fehler {}\n", message));
            }
            TopError::Line {
                line,
                error,
                comment_out,
            } => {
                out.push_str(&format!("fehler next line: {}\n", error));
                if *comment_out {
                    out.push_str("# ");
                }
                out.push_str(line);
                out.push('\n');
            }
        }
    }
}

/// The journal: all entries of the period, indexed by day, plus the
/// per-account day records the engines write into.
#[derive(Debug)]
pub struct Journal {
    days: Days<JournalDay>,
    entries: Vec<Entry>,
    account_days: BTreeMap<AccountNumber, Days<AccountDay>>,
    profit_entry: Option<EntryId>,
    top_errors: Vec<TopError>,
}

impl Journal {
    pub fn new(config: &Config) -> Journal {
        let account_days = config
            .accounts()
            .map(|account| (account.number, Days::new(config.period)))
            .collect();
        Journal {
            days: Days::new(config.period),
            entries: Vec::new(),
            account_days,
            profit_entry: None,
            top_errors: Vec::new(),
        }
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id]
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.entries[id]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn profit_entry(&self) -> Option<EntryId> {
        self.profit_entry
    }

    pub fn top_errors(&self) -> &[TopError] {
        &self.top_errors
    }

    pub fn push_top_error(&mut self, message: String) {
        self.top_errors.push(TopError::Message(message));
    }

    pub fn push_error_line(&mut self, line: &str, error: String, comment_out: bool) {
        self.top_errors.push(TopError::Line {
            line: line.to_string(),
            error,
            comment_out,
        });
    }

    /// Adds an entry to its day.  A duplicate reference attaches an error
    /// to the entry; a date outside the period is fatal (the caller turns
    /// it into a top-level error line where recoverable).
    pub fn add_entry(&mut self, config: &Config, mut entry: Entry) -> Result<EntryId, LedgerError> {
        let id = self.entries.len();
        let day = self.days.get_or_create_with(entry.valuta, JournalDay::new)?;
        if !day.references.insert(entry.reference.clone()) {
            entry
                .errors
                .push(format!("'{}' is already used!", entry.reference));
        }
        day.entry_ids.push(id);
        if entry.template == config.profit_template() {
            self.profit_entry = Some(id);
        }
        self.entries.push(entry);
        Ok(id)
    }

    /// Scans the suffixes of the day from 0 upward and returns the first
    /// reference not already used.
    pub fn next_free_reference(
        &mut self,
        config: &Config,
        valuta: Valuta,
    ) -> Result<String, LedgerError> {
        let day = self.days.get_or_create_with(valuta, JournalDay::new)?;
        let mut number = 0;
        loop {
            let candidate = reference::format_reference(&config.period, valuta, number);
            if !day.references.contains(&candidate) {
                return Ok(candidate);
            }
            number += 1;
        }
    }

    pub fn day(&self, valuta: Valuta) -> Result<Option<&JournalDay>, LedgerError> {
        self.days.get(valuta)
    }

    pub fn day_or_create(&mut self, valuta: Valuta) -> Result<&mut JournalDay, LedgerError> {
        self.days.get_or_create_with(valuta, JournalDay::new)
    }

    /// Attaches a day-level error not tied to a single entry.
    pub fn push_day_error(&mut self, valuta: Valuta, message: String) -> Result<(), LedgerError> {
        self.day_or_create(valuta)?.errors.push(message);
        Ok(())
    }

    /// All days with at least one entry or error, in calendar order.
    pub fn days(&self) -> impl Iterator<Item = &JournalDay> {
        self.days.iter()
    }

    /// The day's entries in (length, lexical) reference order.
    pub fn ordered_entries(&self, day: &JournalDay) -> Vec<EntryId> {
        let mut ids = day.entry_ids.clone();
        ids.sort_by(|a, b| {
            reference::compare(&self.entries[*a].reference, &self.entries[*b].reference)
        });
        ids
    }

    /// Entries on the given day touching the account on either side, in
    /// reference order.
    pub fn entries_for_account_on_day(
        &self,
        account: AccountNumber,
        valuta: Valuta,
    ) -> Result<Vec<EntryId>, LedgerError> {
        let day = match self.days.get(valuta)? {
            Some(day) => day,
            None => return Ok(Vec::new()),
        };
        Ok(self
            .ordered_entries(day)
            .into_iter()
            .filter(|id| {
                let entry = &self.entries[*id];
                entry.debit == account || entry.credit == account
            })
            .collect())
    }

    pub fn last_entry_valuta(&self, config: &Config) -> Valuta {
        self.days
            .iter()
            .filter(|day| !day.entry_ids.is_empty())
            .last()
            .map(|day| day.valuta)
            .unwrap_or_else(|| config.period.start())
    }

    pub fn account_days(&self, account: AccountNumber) -> Option<&Days<AccountDay>> {
        self.account_days.get(&account)
    }

    pub fn account_days_mut(&mut self, account: AccountNumber) -> Option<&mut Days<AccountDay>> {
        self.account_days.get_mut(&account)
    }

    pub fn account_day_or_create(
        &mut self,
        account: AccountNumber,
        valuta: Valuta,
    ) -> Result<&mut AccountDay, LedgerError> {
        let days = self
            .account_days
            .get_mut(&account)
            .ok_or(LedgerError::UnknownAccount(account))?;
        days.get_or_create_with(valuta, AccountDay::new)
    }

    /// How often each posting template was used.
    pub fn template_statistics(&self) -> BTreeMap<TemplateId, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.template).or_insert(0) += 1;
        }
        counts
    }

    /// Checks the end-of-period closing entries: without a profit posting
    /// the last entry of the period-end day gets an error; with one, every
    /// configured closing template must have been used.
    pub fn require_closing_entries(&mut self, config: &Config) {
        match self.profit_entry {
            None => {
                let last_valuta = self.last_entry_valuta(config);
                if last_valuta != config.period.end() {
                    return;
                }
                let last_entry = self
                    .days
                    .get(last_valuta)
                    .ok()
                    .flatten()
                    .map(|day| self.ordered_entries(day))
                    .and_then(|ids| ids.last().copied());
                if let Some(id) = last_entry {
                    let profit = &config.template(config.profit_template()).name;
                    self.entries[id].errors.push(format!(
                        "a profit posting '{}' is expected at the end of the period!",
                        profit
                    ));
                }
            }
            Some(profit_entry) => {
                let mut missing: Vec<TemplateId> = config
                    .closing_templates()
                    .iter()
                    .copied()
                    .filter(|template| !self.entries.iter().any(|e| e.template == *template))
                    .collect();
                missing.sort_by(|a, b| config.template(*a).name.cmp(&config.template(*b).name));
                let profit_name = config.template(config.profit_template()).name.clone();
                for template in missing {
                    let text = config.template(template).text.clone();
                    self.entries[profit_entry].errors.push(format!(
                        "a profit posting '{}' was found, but the closing posting '{}' is missing!",
                        profit_name, text
                    ));
                }
            }
        }
    }

    /// Re-serializes the whole journal: top-level errors first, then per
    /// day the entries with their diagnostics, the account-day errors and
    /// the day errors.
    pub fn write_to_string(&self, config: &Config) -> String {
        let mut out = String::new();
        for error in &self.top_errors {
            error.write(&mut out);
        }
        for day in self.days.iter() {
            for id in self.ordered_entries(day) {
                self.entries[id].write(&mut out);
            }
            for account in config.accounts() {
                let errors = self
                    .account_days
                    .get(&account.number)
                    .and_then(|days| days.get(day.valuta).ok().flatten())
                    .map(|account_day| account_day.errors.as_slice())
                    .unwrap_or(&[]);
                for error in errors {
                    out.push_str(&format!(
                        "fehler account {} ({}): {}\n",
                        account.number, account.text, error
                    ));
                }
            }
            for error in &day.errors {
                out.push_str(&format!("fehler {}\n", error));
            }
        }
        debug!(
            "serialized journal: {} entries, {} top-level errors",
            self.entries.len(),
            self.top_errors.len()
        );
        out
    }
}
