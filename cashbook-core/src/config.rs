use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::account::{Account, AccountNumber};
use crate::error::LedgerError;
use crate::valuta::Period;

/// Index into [`Config::templates`].
pub type TemplateId = usize;

pub fn round_to_cent(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

pub fn round_to_five_cents(amount: Decimal) -> Decimal {
    (amount * Decimal::TWO).round_dp(1) / Decimal::TWO
}

pub fn is_whole_cents(amount: Decimal) -> bool {
    round_to_cent(amount) == amount
}

/// How the VAT share of a gross amount is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VatScheme {
    /// `gross * rate / (100 + rate)`, rounded to the cent.
    ///
    /// Gross 216.00 at 8% gives VAT 16.00 and net 200.00.
    Effective,

    /// Flat-rate scheme: `gross * rate / 100`, rounded to five cents.
    ///
    /// Gross 300.00 at 2% gives VAT 6.00 and net 294.00.
    Flat,
}

impl VatScheme {
    pub fn vat_amount(&self, gross: Decimal, rate: Decimal) -> Decimal {
        match self {
            VatScheme::Effective => round_to_cent(gross * rate / (Decimal::ONE_HUNDRED + rate)),
            VatScheme::Flat => round_to_five_cents(gross * rate / Decimal::ONE_HUNDRED),
        }
    }
}

/// A VAT rate, e.g. `VSB80` at 7.7% posting to account 2200.
#[derive(Clone, Debug, PartialEq)]
pub struct VatRate {
    pub code: String,
    /// Percentage, e.g. `7.7`.
    pub rate: Decimal,
    /// The account the VAT leg is posted to.
    pub account: AccountNumber,
    pub text: String,
}

/// A named posting rule: debit account, credit account, optional VAT code
/// and a fixed posting text.
#[derive(Clone, Debug, PartialEq)]
pub struct PostingTemplate {
    pub name: String,
    pub debit: AccountNumber,
    pub credit: AccountNumber,
    pub vat: Option<String>,
    pub text: String,
}

/// A tag that substitutes one of a template's accounts, e.g.
/// `privat-revolut_hans` switching the private account.
#[derive(Clone, Debug)]
pub struct AccountSwap {
    pub tag: String,
    pub account: AccountNumber,
    pub replaces: Vec<AccountNumber>,
}

impl AccountSwap {
    pub fn replaces(&self, account: AccountNumber) -> bool {
        self.replaces.contains(&account)
    }
}

/// A search-text rule for unmatched bank transactions: when `pattern`
/// occurs in the bank description, a proposal with `instruction` is
/// synthesized.
#[derive(Clone, Debug)]
pub struct ProposalRule {
    pub pattern: String,
    /// The full instruction chain written into the journal line,
    /// e.g. `auto-FAHRZEUG`.
    pub instruction: String,
    pub comment: String,
    /// `true` books the proposal directly as a confirmed posting; `false`
    /// writes a `vorschlag` line that a human has to confirm.
    pub book_directly: bool,
    template: TemplateId,
}

impl ProposalRule {
    pub fn template(&self) -> TemplateId {
        self.template
    }
}

/// Wiring of one bank statement source to an account of the chart.
#[derive(Clone, Debug)]
pub struct BankLink {
    /// Display name, e.g. "ZKB Sparkonto".
    pub name: String,
    pub account: AccountNumber,
    /// Compare settled against expected day balances.
    pub check_balance: bool,
    /// Synthesize proposals for unmatched transactions.
    pub auto_propose: bool,
}

/// Fallback posting template used when a bank transaction matches no rule.
#[derive(Clone, Debug)]
pub struct Fallback {
    pub template: TemplateId,
    /// Instruction chain for the synthesized journal line (the template
    /// name, possibly with an account-swap tag appended).
    pub chain: String,
}

#[derive(Clone, Debug)]
pub struct FallbackPair {
    pub credit: Fallback,
    pub debit: Fallback,
}

/// One line of a closing section: a sub-total heading or an account.
#[derive(Clone, Debug)]
pub enum ClosingLine {
    Heading(String),
    Account(AccountNumber),
}

/// An ordered run of closing lines, e.g. the assets side of the balance
/// sheet.
#[derive(Clone, Debug, Default)]
pub struct ClosingSection {
    pub title: String,
    pub lines: Vec<ClosingLine>,
}

impl ClosingSection {
    pub fn new(title: &str) -> ClosingSection {
        ClosingSection {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn heading(mut self, title: &str) -> ClosingSection {
        self.lines.push(ClosingLine::Heading(title.to_string()));
        self
    }

    pub fn account(mut self, number: AccountNumber) -> ClosingSection {
        self.lines.push(ClosingLine::Account(number));
        self
    }
}

/// The two sides of a closing statement: assets/liabilities for the
/// balance sheet, income/expenses for the income statement.
#[derive(Clone, Debug, Default)]
pub struct ClosingStructure {
    pub first: ClosingSection,
    pub second: ClosingSection,
}

/// Pluggable balance checks applied after all balances settle.
#[derive(Clone, Copy, Debug)]
pub enum Constraint {
    /// The account must settle to zero on every day it is touched.
    ZeroBalanceEveryDay(AccountNumber),
    /// The account must be zero on the profit-posting date.
    ZeroBalanceAtClosing(AccountNumber),
}

/// Result of resolving an instruction chain like `auto-ohneMwst-FAHRZEUG`
/// against the configuration.
#[derive(Clone, Debug)]
pub struct ResolvedInstruction {
    pub template: TemplateId,
    pub debit: AccountNumber,
    pub credit: AccountNumber,
    pub vat: Option<String>,
    pub tags: Vec<String>,
    pub errors: Vec<String>,
}

/// The static configuration of a run: chart of accounts, posting
/// templates, VAT rates, proposal rules, bank wiring and closing layout.
///
/// Built once by [`ConfigBuilder`] and treated as immutable input by all
/// engines.
#[derive(Debug)]
pub struct Config {
    pub period: Period,
    pub organisation: String,
    pub year_label: String,
    pub vat_scheme: VatScheme,
    pub balance_structure: ClosingStructure,
    pub income_structure: ClosingStructure,
    /// Marker substring that makes a voucher filename to be ignored.
    pub skip_marker: String,
    accounts: BTreeMap<AccountNumber, Account>,
    templates: Vec<PostingTemplate>,
    template_ids: BTreeMap<String, TemplateId>,
    vat_codes: BTreeMap<String, Option<VatRate>>,
    tags: Vec<String>,
    swaps: BTreeMap<String, AccountSwap>,
    proposal_rules: Vec<ProposalRule>,
    bank_links: Vec<BankLink>,
    fallbacks: BTreeMap<AccountNumber, FallbackPair>,
    global_fallback: FallbackPair,
    closing_templates: Vec<TemplateId>,
    profit_template: TemplateId,
    constraints: Vec<Constraint>,
}

impl Config {
    pub fn builder(period: Period, vat_scheme: VatScheme) -> ConfigBuilder {
        ConfigBuilder::new(period, vat_scheme)
    }

    pub fn account(&self, number: AccountNumber) -> Result<&Account, LedgerError> {
        self.accounts
            .get(&number)
            .ok_or(LedgerError::UnknownAccount(number))
    }

    /// Accounts in ascending number order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn template(&self, id: TemplateId) -> &PostingTemplate {
        &self.templates[id]
    }

    pub fn templates(&self) -> impl Iterator<Item = (TemplateId, &PostingTemplate)> {
        self.templates.iter().enumerate()
    }

    pub fn template_id(&self, name: &str) -> Option<TemplateId> {
        self.template_ids.get(name).copied()
    }

    /// The rate behind a VAT code; `None` for codes registered without a
    /// rate (explicit "no VAT").
    pub fn vat_rate(&self, code: &str) -> Option<&VatRate> {
        self.vat_codes.get(code).and_then(|rate| rate.as_ref())
    }

    pub fn is_tag(&self, token: &str) -> bool {
        self.tags.iter().any(|tag| tag == token)
    }

    pub fn swap(&self, tag: &str) -> Option<&AccountSwap> {
        self.swaps.get(tag)
    }

    pub fn bank_links(&self) -> &[BankLink] {
        &self.bank_links
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn profit_template(&self) -> TemplateId {
        self.profit_template
    }

    pub fn closing_templates(&self) -> &[TemplateId] {
        &self.closing_templates
    }

    pub fn account_fallbacks(&self, account: AccountNumber) -> &FallbackPair {
        self.fallbacks.get(&account).unwrap_or(&self.global_fallback)
    }

    pub fn global_fallback(&self) -> &FallbackPair {
        &self.global_fallback
    }

    /// First rule whose pattern occurs in the bank description, in
    /// configuration order.
    pub fn find_proposal_rule(&self, description: &str) -> Option<&ProposalRule> {
        self.proposal_rules
            .iter()
            .find(|rule| description.contains(&rule.pattern))
    }

    /// Resolves an instruction chain: the first token must be a posting
    /// template, the remaining tokens are tags, account swaps or VAT
    /// codes.  Unresolvable tokens become recoverable errors; the entry
    /// still gets the fallback template so the line round-trips.
    pub fn resolve_instruction(&self, instruction: &str) -> ResolvedInstruction {
        let mut errors = Vec::new();
        let mut tags = Vec::new();
        let mut tokens = instruction.split('-');

        let first = tokens.next().unwrap_or("");
        let template = match self.template_id(first) {
            Some(id) => id,
            None => {
                errors.push(format!(
                    "in '{}': posting template '{}' not found!",
                    instruction, first
                ));
                self.global_fallback.debit.template
            }
        };
        let mut debit = self.templates[template].debit;
        let mut credit = self.templates[template].credit;
        let mut vat = self.templates[template].vat.clone();

        for token in tokens {
            if self.is_tag(token) {
                tags.push(token.to_string());
                continue;
            }
            if let Some(swap) = self.swap(token) {
                if swap.replaces(credit) {
                    credit = swap.account;
                } else if swap.replaces(debit) {
                    debit = swap.account;
                } else {
                    errors.push(format!(
                        "in '{}': '{}' can replace neither account {} nor account {}!",
                        instruction, token, credit, debit
                    ));
                }
                continue;
            }
            match self.vat_codes.get(token) {
                Some(Some(_)) => {
                    vat = Some(token.to_string());
                    continue;
                }
                Some(None) => {
                    vat = None;
                    continue;
                }
                None => {}
            }
            errors.push(format!("in '{}': '{}' not found!", instruction, token));
        }

        ResolvedInstruction {
            template,
            debit,
            credit,
            vat,
            tags,
            errors,
        }
    }
}

/// Assembles and validates a [`Config`].
///
/// All definition-time checks of the chart happen in [`ConfigBuilder::build`]:
/// template account combinations, VAT completeness, fallback templates for
/// every linked bank account, the profit template.
pub struct ConfigBuilder {
    period: Period,
    vat_scheme: VatScheme,
    organisation: String,
    year_label: String,
    skip_marker: String,
    accounts: Vec<Account>,
    templates: Vec<(String, AccountNumber, AccountNumber, Option<String>, String)>,
    vat_rates: Vec<VatRate>,
    vat_exempt_codes: Vec<String>,
    tags: Vec<String>,
    swaps: Vec<AccountSwap>,
    rules: Vec<(String, String, String, bool)>,
    bank_links: Vec<BankLink>,
    fallbacks: Vec<(AccountNumber, String, String, Option<String>)>,
    closing_templates: Vec<String>,
    profit_template: Option<String>,
    constraints: Vec<Constraint>,
    balance_structure: ClosingStructure,
    income_structure: ClosingStructure,
}

impl ConfigBuilder {
    pub fn new(period: Period, vat_scheme: VatScheme) -> ConfigBuilder {
        ConfigBuilder {
            period,
            vat_scheme,
            organisation: String::new(),
            year_label: String::new(),
            skip_marker: "SKIP".to_string(),
            accounts: Vec::new(),
            templates: Vec::new(),
            vat_rates: Vec::new(),
            vat_exempt_codes: Vec::new(),
            tags: Vec::new(),
            swaps: Vec::new(),
            rules: Vec::new(),
            bank_links: Vec::new(),
            fallbacks: Vec::new(),
            closing_templates: Vec::new(),
            profit_template: None,
            constraints: Vec::new(),
            balance_structure: ClosingStructure::default(),
            income_structure: ClosingStructure::default(),
        }
    }

    pub fn organisation(mut self, name: &str, year: &str) -> Self {
        self.organisation = name.to_string();
        self.year_label = year.to_string();
        self
    }

    pub fn account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn template(
        mut self,
        name: &str,
        debit: AccountNumber,
        credit: AccountNumber,
        vat: Option<&str>,
        text: &str,
    ) -> Self {
        self.templates.push((
            name.to_string(),
            debit,
            credit,
            vat.map(str::to_string),
            text.to_string(),
        ));
        self
    }

    pub fn vat_rate(mut self, code: &str, rate: Decimal, account: AccountNumber, text: &str) -> Self {
        self.vat_rates.push(VatRate {
            code: code.to_string(),
            rate,
            account,
            text: text.to_string(),
        });
        self
    }

    /// Registers a VAT code that clears the VAT of a template, e.g.
    /// `ohneMwst`.
    pub fn vat_exempt_code(mut self, code: &str) -> Self {
        self.vat_exempt_codes.push(code.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn swap(mut self, tag: &str, account: AccountNumber, replaces: &[AccountNumber]) -> Self {
        self.swaps.push(AccountSwap {
            tag: tag.to_string(),
            account,
            replaces: replaces.to_vec(),
        });
        self
    }

    pub fn proposal_rule(
        mut self,
        pattern: &str,
        instruction: &str,
        comment: &str,
        book_directly: bool,
    ) -> Self {
        self.rules.push((
            pattern.to_string(),
            instruction.to_string(),
            comment.to_string(),
            book_directly,
        ));
        self
    }

    pub fn bank_link(
        mut self,
        name: &str,
        account: AccountNumber,
        check_balance: bool,
        auto_propose: bool,
    ) -> Self {
        self.bank_links.push(BankLink {
            name: name.to_string(),
            account,
            check_balance,
            auto_propose,
        });
        self
    }

    /// Fallback templates for bank transactions on `account` that match
    /// no proposal rule: one for incoming (credit), one for outgoing
    /// (debit) money.
    pub fn fallback(mut self, account: AccountNumber, credit: &str, debit: &str) -> Self {
        self.fallbacks
            .push((account, credit.to_string(), debit.to_string(), None));
        self
    }

    /// Like [`ConfigBuilder::fallback`], with an account-swap tag appended
    /// to the synthesized instruction chain.
    pub fn fallback_with_swap(
        mut self,
        account: AccountNumber,
        credit: &str,
        debit: &str,
        swap_tag: &str,
    ) -> Self {
        self.fallbacks.push((
            account,
            credit.to_string(),
            debit.to_string(),
            Some(swap_tag.to_string()),
        ));
        self
    }

    pub fn closing_template(mut self, name: &str) -> Self {
        self.closing_templates.push(name.to_string());
        self
    }

    pub fn profit_template(mut self, name: &str) -> Self {
        self.profit_template = Some(name.to_string());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn balance_structure(mut self, assets: ClosingSection, liabilities: ClosingSection) -> Self {
        self.balance_structure = ClosingStructure {
            first: assets,
            second: liabilities,
        };
        self
    }

    pub fn income_structure(mut self, income: ClosingSection, expenses: ClosingSection) -> Self {
        self.income_structure = ClosingStructure {
            first: income,
            second: expenses,
        };
        self
    }

    pub fn skip_marker(mut self, marker: &str) -> Self {
        self.skip_marker = marker.to_string();
        self
    }

    pub fn build(self) -> Result<Config, LedgerError> {
        let mut accounts = BTreeMap::new();
        for account in self.accounts {
            let number = account.number;
            if accounts.insert(number, account).is_some() {
                return Err(LedgerError::DuplicateAccount(number));
            }
        }

        let mut vat_codes: BTreeMap<String, Option<VatRate>> = BTreeMap::new();
        for rate in self.vat_rates {
            if !accounts.contains_key(&rate.account) {
                return Err(LedgerError::UnknownAccount(rate.account));
            }
            let code = rate.code.clone();
            if vat_codes.insert(code.clone(), Some(rate)).is_some() {
                return Err(LedgerError::DuplicateVatCode(code));
            }
        }
        for code in self.vat_exempt_codes {
            if vat_codes.insert(code.clone(), None).is_some() {
                return Err(LedgerError::DuplicateVatCode(code));
            }
        }

        let mut templates = Vec::new();
        let mut template_ids = BTreeMap::new();
        for (name, debit, credit, vat, text) in self.templates {
            let debit_account = accounts
                .get(&debit)
                .ok_or(LedgerError::UnknownAccount(debit))?;
            let credit_account = accounts
                .get(&credit)
                .ok_or(LedgerError::UnknownAccount(credit))?;
            validate_combination(&name, debit_account, credit_account)?;
            if let Some(code) = &vat {
                if !vat_codes.contains_key(code) {
                    return Err(LedgerError::UnknownVatCode(code.clone()));
                }
            }
            if template_ids.contains_key(&name) {
                return Err(LedgerError::DuplicateTemplate(name));
            }
            template_ids.insert(name.clone(), templates.len());
            templates.push(PostingTemplate {
                name,
                debit,
                credit,
                vat,
                text,
            });
        }

        let mut swaps = BTreeMap::new();
        for swap in self.swaps {
            if !accounts.contains_key(&swap.account) {
                return Err(LedgerError::UnknownAccount(swap.account));
            }
            for replaced in &swap.replaces {
                if !accounts.contains_key(replaced) {
                    return Err(LedgerError::UnknownAccount(*replaced));
                }
            }
            let tag = swap.tag.clone();
            if swaps.insert(tag.clone(), swap).is_some() {
                return Err(LedgerError::DuplicateSwap(tag));
            }
        }

        let lookup = |name: &str| -> Result<TemplateId, LedgerError> {
            template_ids
                .get(name)
                .copied()
                .ok_or_else(|| LedgerError::UnknownTemplate(name.to_string()))
        };

        let mut fallbacks = BTreeMap::new();
        let mut global_fallback = None;
        for (account, credit, debit, swap_tag) in self.fallbacks {
            if !accounts.contains_key(&account) {
                return Err(LedgerError::UnknownAccount(account));
            }
            let chain = |name: &str| match &swap_tag {
                Some(tag) => format!("{}-{}", name, tag),
                None => name.to_string(),
            };
            let pair = FallbackPair {
                credit: Fallback {
                    template: lookup(&credit)?,
                    chain: chain(&credit),
                },
                debit: Fallback {
                    template: lookup(&debit)?,
                    chain: chain(&debit),
                },
            };
            if global_fallback.is_none() {
                global_fallback = Some(pair.clone());
            }
            fallbacks.insert(account, pair);
        }
        let global_fallback = global_fallback.ok_or(LedgerError::MissingFallback)?;

        let mut proposal_rules = Vec::new();
        for (pattern, instruction, comment, book_directly) in self.rules {
            let mut tokens = instruction.split('-');
            let first = tokens.next().unwrap_or("");
            let template = lookup(first)?;
            for token in tokens {
                let known = self.tags.iter().any(|tag| tag == token)
                    || swaps.contains_key(token)
                    || vat_codes.contains_key(token);
                if !known {
                    return Err(LedgerError::UnresolvedRuleToken {
                        pattern,
                        token: token.to_string(),
                    });
                }
            }
            proposal_rules.push(ProposalRule {
                pattern,
                instruction,
                comment,
                book_directly,
                template,
            });
        }

        for link in &self.bank_links {
            if !accounts.contains_key(&link.account) {
                return Err(LedgerError::UnknownAccount(link.account));
            }
            if !fallbacks.contains_key(&link.account) {
                return Err(LedgerError::BankFallbackMissing {
                    name: link.name.clone(),
                    account: link.account,
                });
            }
        }

        let profit_template = match self.profit_template {
            Some(name) => lookup(&name)?,
            None => return Err(LedgerError::MissingProfitTemplate),
        };
        let closing_templates = self
            .closing_templates
            .iter()
            .map(|name| lookup(name))
            .collect::<Result<Vec<_>, _>>()?;

        for constraint in &self.constraints {
            let account = match constraint {
                Constraint::ZeroBalanceEveryDay(account) => *account,
                Constraint::ZeroBalanceAtClosing(account) => *account,
            };
            if !accounts.contains_key(&account) {
                return Err(LedgerError::UnknownAccount(account));
            }
        }

        for section in [
            &self.balance_structure.first,
            &self.balance_structure.second,
            &self.income_structure.first,
            &self.income_structure.second,
        ] {
            for line in &section.lines {
                if let ClosingLine::Account(number) = line {
                    if !accounts.contains_key(number) {
                        return Err(LedgerError::UnknownAccount(*number));
                    }
                }
            }
        }

        Ok(Config {
            period: self.period,
            organisation: self.organisation,
            year_label: self.year_label,
            vat_scheme: self.vat_scheme,
            balance_structure: self.balance_structure,
            income_structure: self.income_structure,
            skip_marker: self.skip_marker,
            accounts,
            templates,
            template_ids,
            vat_codes,
            tags: self.tags,
            swaps,
            proposal_rules,
            bank_links: self.bank_links,
            fallbacks,
            global_fallback,
            closing_templates,
            profit_template,
            constraints: self.constraints,
        })
    }
}

/// An Asset/Asset pair is always allowed (inter-bank transfer); otherwise
/// exactly one side must be a balance-sheet account and the other an
/// income-statement account, or the VAT side would be undefined.
fn validate_combination(
    name: &str,
    debit: &Account,
    credit: &Account,
) -> Result<(), LedgerError> {
    if credit.is_balance_sheet() && debit.is_balance_sheet() {
        return Ok(());
    }
    if credit.is_balance_sheet() == debit.is_income_statement() {
        return Ok(());
    }
    Err(LedgerError::TemplateCombination {
        name: name.to_string(),
        debit: debit.number,
        debit_kind: debit.kind,
        credit: credit.number,
        credit_kind: credit.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use rust_decimal_macros::dec;

    fn period() -> Period {
        Period::from_dates("2017-01-01", "2017-12-31").unwrap()
    }

    fn account(number: AccountNumber, kind: AccountKind) -> Account {
        Account::builder()
            .number(number)
            .kind(kind)
            .text(format!("account {}", number))
            .build()
    }

    fn base_builder() -> ConfigBuilder {
        Config::builder(period(), VatScheme::Effective)
            .account(account(1000, AccountKind::Asset))
            .account(account(1100, AccountKind::Asset))
            .account(account(2000, AccountKind::Liability))
            .account(account(2200, AccountKind::Liability))
            .account(account(3400, AccountKind::Income))
            .account(account(6500, AccountKind::Expense))
            .vat_rate("VSB80", dec!(7.7), 2200, "owed VAT")
            .vat_exempt_code("ohneMwst")
            .template("einnahmen", 1000, 3400, None, "earnings")
            .template("verbrauch", 6500, 1000, Some("VSB80"), "consumables")
            .template("privat", 1000, 2000, None, "private")
            .template("gewinn", 3400, 2000, None, "profit")
            .fallback(1000, "privat", "privat")
            .profit_template("gewinn")
    }

    #[test]
    fn builds_a_valid_configuration() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.template_id("einnahmen"), Some(0));
        assert!(config.vat_rate("VSB80").is_some());
        assert!(config.vat_rate("ohneMwst").is_none());
        assert_eq!(config.account(1000).unwrap().kind, AccountKind::Asset);
    }

    #[test]
    fn asset_to_asset_templates_are_allowed() {
        base_builder()
            .template("uebertrag", 1000, 1100, None, "transfer")
            .build()
            .unwrap();
    }

    #[test]
    fn income_to_expense_templates_are_rejected() {
        let result = base_builder()
            .template("broken", 6500, 3400, None, "broken")
            .build();
        assert!(matches!(
            result,
            Err(LedgerError::TemplateCombination { .. })
        ));
    }

    #[test]
    fn unknown_vat_code_is_rejected() {
        let result = base_builder()
            .template("broken", 6500, 1000, Some("VSXXX"), "broken")
            .build();
        assert!(matches!(result, Err(LedgerError::UnknownVatCode(_))));
    }

    #[test]
    fn bank_link_requires_fallbacks() {
        let result = base_builder().bank_link("Bank", 1100, true, true).build();
        assert!(matches!(
            result,
            Err(LedgerError::BankFallbackMissing { .. })
        ));
    }

    #[test]
    fn missing_profit_template_is_fatal() {
        let result = Config::builder(period(), VatScheme::Effective)
            .account(account(1000, AccountKind::Asset))
            .account(account(2000, AccountKind::Liability))
            .template("privat", 1000, 2000, None, "private")
            .fallback(1000, "privat", "privat")
            .build();
        assert!(matches!(result, Err(LedgerError::MissingProfitTemplate)));
    }

    #[test]
    fn effective_vat_amount() {
        let scheme = VatScheme::Effective;
        assert_eq!(scheme.vat_amount(dec!(216.00), dec!(8.0)), dec!(16.00));
        assert_eq!(scheme.vat_amount(dec!(107.70), dec!(7.7)), dec!(7.70));
    }

    #[test]
    fn flat_vat_amount_rounds_to_five_cents() {
        let scheme = VatScheme::Flat;
        assert_eq!(scheme.vat_amount(dec!(300.00), dec!(2.0)), dec!(6.00));
        assert_eq!(scheme.vat_amount(dec!(333.33), dec!(3.7)), dec!(12.35));
    }

    #[test]
    fn resolve_instruction_with_tag_and_vat() {
        let config = base_builder().tag("FAHRZEUG").build().unwrap();
        let resolved = config.resolve_instruction("verbrauch-ohneMwst-FAHRZEUG");
        assert_eq!(resolved.template, config.template_id("verbrauch").unwrap());
        assert_eq!(resolved.vat, None);
        assert_eq!(resolved.tags, vec!["FAHRZEUG".to_string()]);
        assert!(resolved.errors.is_empty());
    }

    #[test]
    fn resolve_instruction_applies_account_swap() {
        let config = base_builder()
            .swap("revolut_hans", 2000, &[1000])
            .build()
            .unwrap();
        let resolved = config.resolve_instruction("einnahmen-revolut_hans");
        // "einnahmen" debits 1000; the swap replaces it.
        assert_eq!(resolved.debit, 2000);
        assert_eq!(resolved.credit, 3400);
        assert!(resolved.errors.is_empty());
    }

    #[test]
    fn unknown_template_falls_back_and_reports() {
        let config = base_builder().build().unwrap();
        let resolved = config.resolve_instruction("doesnotexist");
        assert_eq!(resolved.template, config.global_fallback().debit.template);
        assert_eq!(resolved.errors.len(), 1);
        assert!(resolved.errors[0].contains("doesnotexist"));
    }

    #[test]
    fn unknown_chain_token_reports_but_keeps_template() {
        let config = base_builder().build().unwrap();
        let resolved = config.resolve_instruction("einnahmen-unknowntoken");
        assert_eq!(resolved.template, config.template_id("einnahmen").unwrap());
        assert_eq!(resolved.errors.len(), 1);
    }
}
