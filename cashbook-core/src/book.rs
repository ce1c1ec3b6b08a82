use std::collections::BTreeMap;

use log::debug;
use rust_decimal::Decimal;

use crate::account::AccountNumber;
use crate::config::{is_whole_cents, round_to_cent, Config};
use crate::entry::EntryId;
use crate::error::LedgerError;
use crate::journal::Journal;
use crate::valuta::Valuta;

/// Which side of a posting a leg belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relation {
    Debit,
    Credit,
}

/// Index into [`Book::legs`].
pub type LegId = usize;

/// One side of a split posting as applied to a specific account.
///
/// Links between legs are indexes into the leg arena, not shared
/// pointers: every leg knows its opposing leg, and the net/gross legs of
/// a VAT posting know their VAT leg.
#[derive(Clone, Debug)]
pub struct Leg {
    pub entry: EntryId,
    pub account: AccountNumber,
    pub relation: Relation,
    pub amount: Decimal,
    pub is_vat: bool,
    pub opposing: Option<LegId>,
    pub vat_leg: Option<LegId>,
}

/// One (account, value date) pair with at least one leg or an expected
/// balance from a bank statement.
///
/// Both balances are write-once: the settled balance after all legs of
/// the day are known, the expected balance when a bank statement supplies
/// it.
#[derive(Debug)]
pub struct AccountDay {
    pub valuta: Valuta,
    legs: Vec<LegId>,
    balance: Option<Decimal>,
    expected: Option<Decimal>,
    pub errors: Vec<String>,
}

impl AccountDay {
    pub(crate) fn new(valuta: Valuta) -> AccountDay {
        AccountDay {
            valuta,
            legs: Vec::new(),
            balance: None,
            expected: None,
            errors: Vec::new(),
        }
    }

    pub fn legs(&self) -> &[LegId] {
        &self.legs
    }

    pub fn balance(&self) -> Option<Decimal> {
        self.balance
    }

    pub fn expected(&self) -> Option<Decimal> {
        self.expected
    }

    pub(crate) fn set_balance(&mut self, balance: Decimal) {
        assert!(self.balance.is_none(), "the settled balance may only be set once");
        self.balance = Some(balance);
    }

    pub(crate) fn set_expected(&mut self, expected: Decimal) {
        assert!(self.expected.is_none(), "the expected balance may only be set once");
        self.expected = Some(expected);
    }
}

/// All accounts with all their legs, generated by replaying the journal.
#[derive(Debug)]
pub struct Book {
    legs: Vec<Leg>,
    saldi: BTreeMap<AccountNumber, Decimal>,
}

impl Book {
    /// Splits every journal entry into legs (applying the VAT scheme) and
    /// settles the running balance of every account day.
    pub fn post(journal: &mut Journal, config: &Config) -> Result<Book, LedgerError> {
        let mut book = Book {
            legs: Vec::new(),
            saldi: BTreeMap::new(),
        };
        let ordered: Vec<EntryId> = journal
            .days()
            .flat_map(|day| journal.ordered_entries(day))
            .collect();
        for id in ordered {
            book.split(journal, config, id)?;
        }
        book.settle(journal, config);
        debug!("posted {} legs for {} entries", book.legs.len(), journal.entries().len());
        Ok(book)
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn leg(&self, id: LegId) -> &Leg {
        &self.legs[id]
    }

    /// The account's balance at the end of the period.
    pub fn saldo(&self, account: AccountNumber) -> Decimal {
        self.saldi.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    /// The settled balance on the last day at or before `valuta`.
    pub fn saldo_at(&self, journal: &Journal, account: AccountNumber, valuta: Valuta) -> Decimal {
        let mut saldo = Decimal::ZERO;
        if let Some(days) = journal.account_days(account) {
            for day in days.iter() {
                if day.valuta > valuta {
                    break;
                }
                if let Some(balance) = day.balance() {
                    saldo = balance;
                }
            }
        }
        saldo
    }

    fn split(&mut self, journal: &mut Journal, config: &Config, id: EntryId) -> Result<(), LedgerError> {
        let (mut amount, mut debit, mut credit, vat_code, valuta) = {
            let entry = journal.entry(id);
            (
                entry.amount,
                entry.debit,
                entry.credit,
                entry.vat.clone(),
                entry.valuta,
            )
        };
        // A negative amount swaps debit and credit; legs are always
        // non-negative.
        if amount < Decimal::ZERO {
            amount = -amount;
            std::mem::swap(&mut debit, &mut credit);
        }

        let mut rate = vat_code
            .as_deref()
            .and_then(|code| config.vat_rate(code))
            .cloned();
        if rate.is_some() && debit == credit {
            journal.entry_mut(id).errors.push(
                "the debit and the credit account are the same, so no VAT arises. \
                 Please drop the VAT code!"
                    .to_string(),
            );
            rate = None;
        }

        let rate = match rate {
            Some(rate) => rate,
            None => {
                self.plain_split(journal, id, valuta, amount, debit, credit)?;
                return Ok(());
            }
        };

        let debit_account = config.account(debit)?;
        let credit_account = config.account(credit)?;
        let mut debit_bears = debit_account.is_income_statement();
        let mut credit_bears = credit_account.is_income_statement();
        if debit_bears == credit_bears {
            if debit_account.is_balance_sheet() && credit_account.is_balance_sheet() {
                // Both sides on the balance sheet (e.g. buying into the
                // inventory): the lower account number bears the VAT.
                debit_bears = debit < credit;
                credit_bears = !debit_bears;
            } else {
                journal.entry_mut(id).errors.push(format!(
                    "to settle VAT exactly one account must be on the income statement! \
                     debit: {} {} ({}), credit: {} {} ({})",
                    debit_account.kind,
                    debit_account.number,
                    debit_account.text,
                    credit_account.kind,
                    credit_account.number,
                    credit_account.text,
                ));
                self.plain_split(journal, id, valuta, amount, debit, credit)?;
                return Ok(());
            }
        }

        let vat_amount = round_to_cent(config.vat_scheme.vat_amount(amount, rate.rate));
        let net = amount - vat_amount;

        let credit_id = self.add_leg(
            journal,
            valuta,
            Leg {
                entry: id,
                account: credit,
                relation: Relation::Credit,
                amount: if debit_bears { amount } else { net },
                is_vat: false,
                opposing: None,
                vat_leg: None,
            },
        )?;
        let debit_id = self.add_leg(
            journal,
            valuta,
            Leg {
                entry: id,
                account: debit,
                relation: Relation::Debit,
                amount: if debit_bears { net } else { amount },
                is_vat: false,
                opposing: None,
                vat_leg: None,
            },
        )?;
        let vat_id = self.add_leg(
            journal,
            valuta,
            Leg {
                entry: id,
                account: rate.account,
                relation: if debit_bears {
                    Relation::Debit
                } else {
                    Relation::Credit
                },
                amount: vat_amount,
                is_vat: true,
                opposing: None,
                vat_leg: None,
            },
        )?;

        self.legs[credit_id].opposing = Some(debit_id);
        self.legs[credit_id].vat_leg = Some(vat_id);
        self.legs[debit_id].opposing = Some(credit_id);
        self.legs[debit_id].vat_leg = Some(vat_id);
        // The VAT leg opposes the full-gross side.
        self.legs[vat_id].opposing = Some(if debit_bears { credit_id } else { debit_id });
        Ok(())
    }

    fn plain_split(
        &mut self,
        journal: &mut Journal,
        id: EntryId,
        valuta: Valuta,
        amount: Decimal,
        debit: AccountNumber,
        credit: AccountNumber,
    ) -> Result<(), LedgerError> {
        let credit_id = self.add_leg(
            journal,
            valuta,
            Leg {
                entry: id,
                account: credit,
                relation: Relation::Credit,
                amount,
                is_vat: false,
                opposing: None,
                vat_leg: None,
            },
        )?;
        let debit_id = self.add_leg(
            journal,
            valuta,
            Leg {
                entry: id,
                account: debit,
                relation: Relation::Debit,
                amount,
                is_vat: false,
                opposing: None,
                vat_leg: None,
            },
        )?;
        self.legs[credit_id].opposing = Some(debit_id);
        self.legs[debit_id].opposing = Some(credit_id);
        Ok(())
    }

    fn add_leg(&mut self, journal: &mut Journal, valuta: Valuta, leg: Leg) -> Result<LegId, LedgerError> {
        debug_assert!(is_whole_cents(leg.amount));
        let id = self.legs.len();
        let day = journal.account_day_or_create(leg.account, valuta)?;
        day.legs.push(id);
        self.legs.push(leg);
        Ok(id)
    }

    /// Replays every account's legs in day order, seeding at the opening
    /// balance, and records one settled balance per day.
    fn settle(&mut self, journal: &mut Journal, config: &Config) {
        for account in config.accounts() {
            let mut saldo = account.opening_balance;
            if let Some(days) = journal.account_days_mut(account.number) {
                for day in days.iter_mut() {
                    for &leg_id in &day.legs {
                        let leg = &self.legs[leg_id];
                        let mut sign = match leg.relation {
                            Relation::Debit => Decimal::ONE,
                            Relation::Credit => -Decimal::ONE,
                        };
                        if account.is_credit_normal() {
                            sign = -sign;
                        }
                        saldo += sign * leg.amount;
                    }
                    day.set_balance(saldo);
                }
            }
            self.saldi.insert(account.number, saldo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VatScheme;
    use crate::testing;
    use rust_decimal_macros::dec;

    #[test]
    fn plain_entries_yield_two_cross_linked_legs() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-01-04a", dec!(50.00), "einnahmen"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        assert_eq!(book.legs().len(), 2);
        let credit = &book.legs()[0];
        let debit = &book.legs()[1];
        assert_eq!(credit.relation, Relation::Credit);
        assert_eq!(credit.account, 3400);
        assert_eq!(debit.relation, Relation::Debit);
        assert_eq!(debit.account, 1020);
        assert_eq!(credit.amount, dec!(50.00));
        assert_eq!(debit.amount, dec!(50.00));
        assert_eq!(credit.opposing, Some(1));
        assert_eq!(debit.opposing, Some(0));
        assert!(credit.vat_leg.is_none());
    }

    #[test]
    fn vat_posting_splits_the_income_statement_side() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        // "verbrauch" debits expense account 6500 at 7.7% effective.
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-01-04a", dec!(107.70), "verbrauch"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        assert_eq!(book.legs().len(), 3);
        let credit = &book.legs()[0];
        let debit = &book.legs()[1];
        let vat = &book.legs()[2];
        // The expense side bears the VAT: net debit plus a debit VAT leg.
        assert_eq!(credit.amount, dec!(107.70));
        assert_eq!(debit.amount, dec!(100.00));
        assert_eq!(vat.amount, dec!(7.70));
        assert_eq!(vat.relation, Relation::Debit);
        assert_eq!(vat.account, 2200);
        assert!(vat.is_vat);
        assert_eq!(debit.amount + vat.amount, credit.amount);
        assert_eq!(debit.vat_leg, Some(2));
        assert_eq!(credit.vat_leg, Some(2));
        assert_eq!(vat.opposing, Some(0));
        assert!(journal.entry(0).errors.is_empty());
    }

    #[test]
    fn vat_split_has_no_rounding_drift() {
        for (scheme, rate) in [
            (VatScheme::Effective, dec!(7.7)),
            (VatScheme::Effective, dec!(2.5)),
            (VatScheme::Effective, dec!(3.7)),
            (VatScheme::Flat, dec!(7.7)),
            (VatScheme::Flat, dec!(2.5)),
            (VatScheme::Flat, dec!(3.7)),
        ] {
            for gross in [dec!(0.05), dec!(1.00), dec!(33.35), dec!(107.70), dec!(9999.95)] {
                let vat = round_to_cent(scheme.vat_amount(gross, rate));
                let net = gross - vat;
                assert_eq!(net + vat, gross);
                assert!(is_whole_cents(vat));
                assert!(is_whole_cents(net));
            }
        }
    }

    #[test]
    fn vat_between_two_assets_charges_the_lower_account() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        // "bar" moves between the asset accounts 1000 and 1020.
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-01-04a", dec!(107.70), "bar-VSB77"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        assert_eq!(book.legs().len(), 3);
        // "bar" debits 1000 and credits 1020; 1000 is lower and bears.
        let debit = &book.legs()[1];
        let vat = &book.legs()[2];
        assert_eq!(debit.account, 1000);
        assert_eq!(debit.amount, dec!(100.00));
        assert_eq!(vat.relation, Relation::Debit);
    }

    #[test]
    fn vat_between_two_income_statement_accounts_is_an_error() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        let mut entry = testing::entry(&config, "2017-01-04a", dec!(100.00), "einnahmen");
        entry.debit = 3400;
        entry.credit = 4400;
        entry.vat = Some("VSB77".to_string());
        journal.add_entry(&config, entry).unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        assert_eq!(book.legs().len(), 2);
        assert_eq!(journal.entry(0).errors.len(), 1);
        assert!(journal.entry(0).errors[0].contains("income statement"));
    }

    #[test]
    fn vat_with_identical_accounts_is_an_error() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        let mut entry = testing::entry(&config, "2017-01-04a", dec!(100.00), "einnahmen");
        entry.debit = 1020;
        entry.credit = 1020;
        entry.vat = Some("VSB77".to_string());
        journal.add_entry(&config, entry).unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        assert_eq!(book.legs().len(), 2);
        assert!(journal.entry(0).errors[0].contains("drop the VAT code"));
    }

    #[test]
    fn negative_amounts_swap_debit_and_credit() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-01-05a", dec!(-42.00), "einnahmen"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        // "einnahmen" normally debits 1020; the negative amount flips it.
        let credit = &book.legs()[0];
        let debit = &book.legs()[1];
        assert_eq!(credit.account, 1020);
        assert_eq!(debit.account, 3400);
        assert_eq!(credit.amount, dec!(42.00));
    }

    #[test]
    fn balances_replay_with_credit_normal_sign() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-01-04a", dec!(50.00), "einnahmen"),
            )
            .unwrap();
        let book = Book::post(&mut journal, &config).unwrap();

        // 1020 opens at 900.00 and is debited 50.00.
        assert_eq!(book.saldo(1020), dec!(950.00));
        // 3400 is credit-normal: the credit increases it.
        assert_eq!(book.saldo(3400), dec!(50.00));
        let valuta = config.period.parse_valuta("2017-01-04").unwrap();
        let day = journal
            .account_days(1020)
            .unwrap()
            .get(valuta)
            .unwrap()
            .unwrap();
        assert_eq!(day.balance(), Some(dec!(950.00)));
    }

    #[test]
    fn untouched_accounts_keep_their_opening_balance() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        let book = Book::post(&mut journal, &config).unwrap();
        assert_eq!(book.saldo(1000), dec!(100.00));
        assert_eq!(book.saldo(2000), dec!(1000.00));
    }
}
