use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use rust_decimal::Decimal;

use crate::config::{BankLink, Config};
use crate::entry::{BankOrigin, Entry};
use crate::error::LedgerError;
use crate::journal::Journal;
use crate::valuta::{Period, Valuta};

/// Credit is money coming in, debit money going out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Credit,
    Debit,
}

/// One record of a bank statement, independent of the wire format it was
/// read from.
#[derive(Clone, Debug)]
pub struct BankTransaction {
    pub valuta: Valuta,
    pub description: String,
    /// Magnitude; the direction carries the sign.
    pub amount: Decimal,
    pub direction: Direction,
    /// Line or record number in the statement file.
    pub line_nr: u32,
    /// Settlement reference code (e.g. VESR), when the format carries one.
    pub settlement_code: Option<String>,
    /// Printed as a comment on the matched journal entry.
    pub comment: String,
    source: String,
    seq_nr: u32,
    mapped_ref: Option<String>,
}

impl BankTransaction {
    pub fn new(
        line_nr: u32,
        valuta: Valuta,
        description: &str,
        amount: Decimal,
        direction: Direction,
        settlement_code: Option<&str>,
        source: &str,
    ) -> BankTransaction {
        let mut description = description.replace("\r\n", " ").replace('\n', " ");
        while description.contains("  ") {
            description = description.replace("  ", " ");
        }
        let description = description.trim().to_string();
        let comment = format!("{}: {}", source, description);
        BankTransaction {
            valuta,
            description,
            amount,
            direction,
            line_nr,
            settlement_code: settlement_code.map(str::to_string),
            comment,
            source: source.to_string(),
            seq_nr: 0,
            mapped_ref: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> BankTransaction {
        self.comment = comment.to_string();
        self
    }

    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }

    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }

    /// A journal entry may record the opposite sign of what the bank
    /// reports (that swaps debit and credit), so amounts compare
    /// sign-insensitively.
    pub fn amount_matches(&self, amount: Decimal) -> bool {
        amount == self.amount || -amount == self.amount
    }

    /// Per-day sequence number, assigned during ingestion.
    pub fn sequence_number(&self) -> u32 {
        self.seq_nr
    }

    pub fn mapped_reference(&self) -> Option<&str> {
        self.mapped_ref.as_deref()
    }

    /// Key in the mapping file: `<date>_<sequenceNumber>`.
    pub fn key(&self, period: &Period) -> String {
        format!("{}_{:03}", period.format(self.valuta), self.seq_nr)
    }

    pub fn origin(&self) -> BankOrigin {
        BankOrigin {
            source: self.source.clone(),
            line_nr: self.line_nr,
            description: self.description.clone(),
        }
    }
}

/// A bank statement source: the only thing the engine knows about wire
/// formats.  Implementations read MT940, ISO 20022, bank CSV dialects and
/// so on; the engine only sees the normalized transactions.
pub trait BankSource {
    fn transactions(&mut self) -> Result<Vec<BankTransaction>, LedgerError>;

    /// Authoritative opening balance, when the statement carries one.  It
    /// must agree with the configured opening balance or the run aborts.
    fn opening_balance(&self) -> Option<Decimal>;
}

/// Reads and writes the per-account mapping files that keep ambiguous
/// matches stable across runs.
#[derive(Debug)]
pub struct MappingStore {
    directory: PathBuf,
}

impl MappingStore {
    pub fn new(directory: impl Into<PathBuf>) -> MappingStore {
        MappingStore {
            directory: directory.into(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("mapping_{}.txt", name))
    }

    pub fn read(&self, name: &str) -> Result<Option<String>, LedgerError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    pub fn write(&self, name: &str, content: &str) -> Result<(), LedgerError> {
        fs::create_dir_all(&self.directory)?;
        fs::write(self.path(name), content)?;
        Ok(())
    }
}

/// The reconciliation of one bank account against the journal.
///
/// Construction filters the statement to the reporting period, assigns
/// per-day sequence numbers, accumulates the expected end-of-day balances
/// and checks the opening balance against the configuration.
#[derive(Debug)]
pub struct Reconciliation {
    link: BankLink,
    txns: Vec<BankTransaction>,
    proposals: Vec<usize>,
}

impl Reconciliation {
    pub fn new(
        config: &Config,
        journal: &mut Journal,
        link: &BankLink,
        transactions: Vec<BankTransaction>,
        opening_balance: Option<Decimal>,
    ) -> Result<Reconciliation, LedgerError> {
        let account = config.account(link.account)?;
        if let Some(found) = opening_balance {
            if found != account.opening_balance {
                return Err(LedgerError::OpeningBalanceMismatch {
                    account: link.account,
                    file: link.name.clone(),
                    found,
                    expected: account.opening_balance,
                });
            }
        }

        let mut kept = Vec::new();
        let mut last: Option<Valuta> = None;
        let mut started = false;
        for txn in transactions {
            if !started {
                if txn.valuta < config.period.start() {
                    continue;
                }
                started = true;
            }
            if txn.valuta > config.period.end() {
                break;
            }
            if let Some(previous) = last {
                if txn.valuta < previous {
                    return Err(LedgerError::UnorderedStatement {
                        file: link.name.clone(),
                        line: txn.line_nr,
                    });
                }
            }
            last = Some(txn.valuta);
            kept.push(txn);
        }

        let mut reconciliation = Reconciliation {
            link: link.clone(),
            txns: kept,
            proposals: Vec::new(),
        };
        reconciliation.assign_sequence_and_expected(config, journal)?;
        Ok(reconciliation)
    }

    pub fn link(&self) -> &BankLink {
        &self.link
    }

    pub fn transactions(&self) -> &[BankTransaction] {
        &self.txns
    }

    /// Walks the transactions in (date, record) order, numbers them per
    /// day and stores the running balance at each date boundary as the
    /// day's expected balance.
    fn assign_sequence_and_expected(
        &mut self,
        config: &Config,
        journal: &mut Journal,
    ) -> Result<(), LedgerError> {
        let mut saldo = config.account(self.link.account)?.opening_balance;
        let mut last: Option<Valuta> = None;
        let mut sequence = 1;
        for txn in &mut self.txns {
            if let Some(previous) = last {
                if previous != txn.valuta {
                    journal
                        .account_day_or_create(self.link.account, previous)?
                        .set_expected(saldo);
                    sequence = 1;
                }
            }
            last = Some(txn.valuta);
            txn.seq_nr = sequence;
            sequence += 1;
            saldo += txn.signed_amount();
        }
        if let Some(previous) = last {
            journal
                .account_day_or_create(self.link.account, previous)?
                .set_expected(saldo);
        }
        Ok(())
    }

    /// Replays a mapping file: transactions named in it are tentatively
    /// pre-bound to their journal reference.  A malformed line is a
    /// configuration error.
    pub fn apply_mapping(&mut self, config: &Config, content: &str) -> Result<(), LedgerError> {
        let keys: HashMap<String, usize> = self
            .txns
            .iter()
            .enumerate()
            .map(|(index, txn)| (txn.key(&config.period), index))
            .collect();
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(reference), None) => {
                    if let Some(&index) = keys.get(key) {
                        self.txns[index].mapped_ref = Some(reference.to_string());
                    }
                }
                _ => return Err(LedgerError::MalformedMappingLine(line.to_string())),
            }
        }
        Ok(())
    }

    /// Confirms the pre-bound matches, then binds the remaining
    /// transactions heuristically by (day, absolute amount).
    pub fn reconcile(&mut self, journal: &mut Journal, config: &Config) -> Result<(), LedgerError> {
        // Confirm what the mapping file claims; a stale claim falls back
        // to the heuristic below.
        for index in 0..self.txns.len() {
            let reference = match self.txns[index].mapped_ref.clone() {
                Some(reference) => reference,
                None => continue,
            };
            let candidates =
                journal.entries_for_account_on_day(self.link.account, self.txns[index].valuta)?;
            let found = candidates.into_iter().find(|&id| {
                let entry = journal.entry(id);
                entry.reference == reference && entry.bank_origin.is_none()
            });
            match found {
                Some(id) => {
                    let txn = &self.txns[index];
                    let entry = journal.entry_mut(id);
                    entry.bank_origin = Some(txn.origin());
                    if !txn.amount_matches(entry.amount) {
                        entry.errors.push(format!(
                            "the amount {:.2} is wrong. The bank statement '{}', account {}, \
                             says {:.2}! Please correct the amount.",
                            entry.amount, self.link.name, self.link.account, txn.amount
                        ));
                    }
                    if entry.valuta != txn.valuta {
                        entry.errors.push(format!(
                            "the date {} is wrong. The bank statement '{}', account {}, \
                             says {}! Please correct the date.",
                            config.period.format(entry.valuta),
                            self.link.name,
                            self.link.account,
                            config.period.format(txn.valuta)
                        ));
                    }
                }
                None => self.txns[index].mapped_ref = None,
            }
        }

        // First unbound entry on the same day with the same absolute
        // amount wins.
        for index in 0..self.txns.len() {
            if self.txns[index].mapped_ref.is_some() {
                continue;
            }
            let candidates =
                journal.entries_for_account_on_day(self.link.account, self.txns[index].valuta)?;
            let found = candidates.into_iter().find(|&id| {
                let entry = journal.entry(id);
                entry.bank_origin.is_none() && self.txns[index].amount_matches(entry.amount)
            });
            match found {
                Some(id) => {
                    let comment = self.txns[index].comment.clone();
                    let origin = self.txns[index].origin();
                    let entry = journal.entry_mut(id);
                    entry.comments.push(comment);
                    entry.bank_origin = Some(origin);
                    self.txns[index].mapped_ref = Some(entry.reference.clone());
                }
                None => self.proposals.push(index),
            }
        }

        debug!(
            "bank '{}': {} transactions, {} unmatched",
            self.link.name,
            self.txns.len(),
            self.proposals.len()
        );
        Ok(())
    }

    /// The mapping-file content to persist: only bindings for dates where
    /// more than one transaction shares the same amount — the minimum
    /// needed to keep ambiguous matches stable across runs.
    pub fn mapping_content(&self, config: &Config) -> String {
        let mut groups: BTreeMap<(Valuta, Decimal), Vec<usize>> = BTreeMap::new();
        for (index, txn) in self.txns.iter().enumerate() {
            groups.entry((txn.valuta, txn.amount)).or_default().push(index);
        }
        let mut out = String::new();
        let mut written: HashSet<&str> = HashSet::new();
        for indices in groups.values() {
            if indices.len() < 2 {
                continue;
            }
            for &index in indices {
                let txn = &self.txns[index];
                if let Some(reference) = txn.mapped_ref.as_deref() {
                    if !written.insert(reference) {
                        // Never claim the same journal reference twice.
                        continue;
                    }
                    out.push_str(&format!("{} {}\n", txn.key(&config.period), reference));
                }
            }
        }
        out
    }

    /// Synthesizes proposal entries for the transactions still unbound,
    /// when the account is configured for it.
    pub fn add_proposals(&self, journal: &mut Journal, config: &Config) -> Result<(), LedgerError> {
        if !self.link.auto_propose {
            return Ok(());
        }
        for &index in &self.proposals {
            let reference = journal.next_free_reference(config, self.txns[index].valuta)?;
            let entry = Entry::proposal(config, self.link.account, &self.txns[index], reference);
            journal.add_entry(config, entry)?;
        }
        info!(
            "bank '{}': {} proposals synthesized",
            self.link.name,
            self.proposals.len()
        );
        Ok(())
    }

    /// Every journal entry on this account that ends the run without a
    /// bound bank transaction gets an error.
    pub fn flag_orphans(&self, journal: &mut Journal) {
        let mut orphans = Vec::new();
        for day in journal.days() {
            for id in journal.ordered_entries(day) {
                let entry = journal.entry(id);
                let touches = entry.debit == self.link.account || entry.credit == self.link.account;
                if touches && entry.bank_origin.is_none() {
                    orphans.push(id);
                }
            }
        }
        for id in orphans {
            journal.entry_mut(id).errors.push(format!(
                "no matching record was found in the bank statement '{}', account {}!",
                self.link.name, self.link.account
            ));
        }
    }

    /// Compares the settled against the expected balance of every day
    /// that has both.  The half discrepancy in the message is a debugging
    /// aid: a single debit/credit mix-up doubles the error.
    pub fn validate_balances(&self, journal: &mut Journal) {
        if !self.link.check_balance {
            return;
        }
        let days = match journal.account_days_mut(self.link.account) {
            Some(days) => days,
            None => return,
        };
        for day in days.iter_mut() {
            let (expected, balance) = match (day.expected(), day.balance()) {
                (Some(expected), Some(balance)) => (expected, balance),
                _ => continue,
            };
            if expected != balance {
                let missing = expected - balance;
                day.errors.push(format!(
                    "the balance should be {:.2} but is {:.2}! discrepancy {:.2} ({:.2})!",
                    expected,
                    balance,
                    missing,
                    missing / Decimal::TWO
                ));
            }
        }
    }
}

/// Reconciles every configured bank account, strictly in configuration
/// order: matching and mapping files first for all accounts, proposals
/// and orphan flagging second, so proposals inserted by earlier accounts
/// are visible to balance computation.
pub fn reconcile_all(
    journal: &mut Journal,
    config: &Config,
    sources: &mut [Box<dyn BankSource>],
    store: &MappingStore,
) -> Result<Vec<Reconciliation>, LedgerError> {
    let mut reconciliations = Vec::new();
    for (link, source) in config.bank_links().iter().zip(sources.iter_mut()) {
        let transactions = source.transactions()?;
        let mut reconciliation =
            Reconciliation::new(config, journal, link, transactions, source.opening_balance())?;
        if let Some(content) = store.read(&link.name)? {
            reconciliation.apply_mapping(config, &content)?;
        }
        reconciliation.reconcile(journal, config)?;
        store.write(&link.name, &reconciliation.mapping_content(config))?;
        reconciliations.push(reconciliation);
    }
    for reconciliation in &reconciliations {
        reconciliation.add_proposals(journal, config)?;
        reconciliation.flag_orphans(journal);
    }
    Ok(reconciliations)
}
